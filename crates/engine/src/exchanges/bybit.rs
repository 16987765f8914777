use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use common::{Candle, CandleSource, Error, Result, Ticker};

use super::{get_json, usdt_symbol, Number};

const NAME: &str = "bybit";
const BASE_URL: &str = "https://api.bybit.com";

/// Bybit v5 linear-perpetual public market data.
pub struct BybitSource {
    http: Client,
    base_url: String,
}

impl BybitSource {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

/// Bybit uses minutes for intraday intervals and letters for day/week.
fn interval(timeframe: &str) -> String {
    match timeframe {
        "1m" => "1",
        "5m" => "5",
        "15m" => "15",
        "30m" => "30",
        "1h" => "60",
        "4h" => "240",
        "1d" | "1D" => "D",
        "1w" | "1W" => "W",
        other => other,
    }
    .to_string()
}

#[async_trait]
impl CandleSource for BybitSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let resp: BybitResponse<KlineResult> = get_json(
            &self.http,
            NAME,
            &format!("{}/v5/market/kline", self.base_url),
            &[
                ("category", "linear".to_string()),
                ("symbol", usdt_symbol(symbol)),
                ("interval", interval(timeframe)),
                ("limit", limit.to_string()),
            ],
        )
        .await?;
        parse_klines(resp.into_result()?)
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let resp: BybitResponse<TickerResult> = get_json(
            &self.http,
            NAME,
            &format!("{}/v5/market/tickers", self.base_url),
            &[("category", "linear".to_string()), ("symbol", usdt_symbol(symbol))],
        )
        .await?;
        parse_ticker(symbol, resp.into_result()?)
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BybitResponse<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: Option<T>,
}

impl<T> BybitResponse<T> {
    /// `retCode != 0` is an API-level failure even on HTTP 200.
    fn into_result(self) -> Result<T> {
        if self.ret_code != 0 {
            return Err(Error::fetch(
                NAME,
                format!("retCode {}: {}", self.ret_code, self.ret_msg),
            ));
        }
        self.result
            .ok_or_else(|| Error::fetch(NAME, "response has no result"))
    }
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<Number>>,
}

#[derive(Debug, Deserialize)]
struct TickerResult {
    #[serde(default)]
    list: Vec<HashMap<String, Number>>,
}

/// Rows are `[start, open, high, low, close, volume, turnover]`, newest first.
fn parse_klines(result: KlineResult) -> Result<Vec<Candle>> {
    let mut candles = result
        .list
        .iter()
        .map(|row| -> Result<Candle> {
            let field = |i: usize| {
                row.get(i)
                    .ok_or_else(|| Error::fetch(NAME, format!("kline row has {} fields", row.len())))
            };
            Ok(Candle {
                timestamp: field(0)?.as_millis(NAME)?,
                open: field(1)?.as_f64(NAME)?,
                high: field(2)?.as_f64(NAME)?,
                low: field(3)?.as_f64(NAME)?,
                close: field(4)?.as_f64(NAME)?,
                volume: field(5)?.as_f64(NAME)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    candles.sort_by_key(|c| c.timestamp);
    Ok(candles)
}

fn parse_ticker(symbol: &str, result: TickerResult) -> Result<Ticker> {
    let entry = result
        .list
        .first()
        .ok_or_else(|| Error::fetch(NAME, format!("no ticker for {symbol}")))?;
    let num = |key: &str| -> Result<f64> {
        entry.get(key).map_or(Ok(0.0), |v| v.as_f64(NAME))
    };
    Ok(Ticker {
        symbol: symbol.to_string(),
        last: num("lastPrice")?,
        bid: num("bid1Price")?,
        ask: num("ask1Price")?,
        volume_24h: num("volume24h")?,
        // Bybit reports a fraction, not a percentage.
        change_24h: num("price24hPcnt")? * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::decode;

    #[test]
    fn klines_are_resorted_oldest_first() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"category":"linear","symbol":"BTCUSDT","list":[
            ["1730818800000","94300","94400","94250","94380","12.5","1179000"],
            ["1730815200000","94100","94350","94050","94300","10","943000"]
        ]}}"#;
        let resp: BybitResponse<KlineResult> = decode(NAME, body).unwrap();
        let candles = parse_klines(resp.into_result().unwrap()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 94_300.0);
        assert_eq!(candles[1].close, 94_380.0);
    }

    #[test]
    fn nonzero_ret_code_is_fetch_error() {
        let body = r#"{"retCode":10001,"retMsg":"params error: symbol invalid","result":{}}"#;
        let resp: BybitResponse<KlineResult> = decode(NAME, body).unwrap();
        let err = resp.into_result().unwrap_err();
        assert!(err.to_string().contains("symbol invalid"));
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[test]
    fn ticker_change_is_scaled_to_percent() {
        let body = r#"{"retCode":0,"retMsg":"OK","result":{"list":[{"symbol":"BTCUSDT",
            "lastPrice":"94350.5","bid1Price":"94350.4","ask1Price":"94350.6",
            "volume24h":"5000","price24hPcnt":"0.0123"}]}}"#;
        let resp: BybitResponse<TickerResult> = decode(NAME, body).unwrap();
        let ticker = parse_ticker("BTCUSD-PERP", resp.into_result().unwrap()).unwrap();
        assert_eq!(ticker.last, 94_350.5);
        assert!((ticker.change_24h - 1.23).abs() < 1e-9);
    }

    #[test]
    fn empty_ticker_list_is_fetch_error() {
        let err = parse_ticker("X", TickerResult { list: Vec::new() }).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[test]
    fn interval_map() {
        assert_eq!(interval("1h"), "60");
        assert_eq!(interval("4h"), "240");
        assert_eq!(interval("1d"), "D");
        assert_eq!(interval("1w"), "W");
    }
}
