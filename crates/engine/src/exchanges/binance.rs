use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use common::{Candle, CandleSource, Result, Ticker};

use super::{decode, get_json, usdt_symbol, Number};

const NAME: &str = "binance";
const BASE_URL: &str = "https://api.binance.com";

/// Binance spot public market data.
pub struct BinanceSource {
    http: Client,
    base_url: String,
}

impl BinanceSource {
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

fn interval(timeframe: &str) -> String {
    match timeframe {
        "1D" => "1d".to_string(),
        "1W" => "1w".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl CandleSource for BinanceSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let rows: Vec<Vec<Number>> = get_json(
            &self.http,
            NAME,
            &format!("{}/api/v3/klines", self.base_url),
            &[
                ("symbol", usdt_symbol(symbol)),
                ("interval", interval(timeframe)),
                ("limit", limit.to_string()),
            ],
        )
        .await?;
        parse_klines(rows)
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let raw: Ticker24h = get_json(
            &self.http,
            NAME,
            &format!("{}/api/v3/ticker/24hr", self.base_url),
            &[("symbol", usdt_symbol(symbol))],
        )
        .await?;
        raw.into_ticker(symbol)
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

/// Kline rows are `[open_time, open, high, low, close, volume, close_time, ...]`.
fn parse_klines(rows: Vec<Vec<Number>>) -> Result<Vec<Candle>> {
    let mut candles = rows
        .iter()
        .map(|row| -> Result<Candle> {
            let field = |i: usize| {
                row.get(i)
                    .ok_or_else(|| common::Error::fetch(NAME, format!("kline row has {} fields", row.len())))
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: Number,
    bid_price: Number,
    ask_price: Number,
    volume: Number,
    price_change_percent: Number,
}

impl Ticker24h {
    fn into_ticker(self, symbol: &str) -> Result<Ticker> {
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: self.last_price.as_f64(NAME)?,
            bid: self.bid_price.as_f64(NAME)?,
            ask: self.ask_price.as_f64(NAME)?,
            volume_24h: self.volume.as_f64(NAME)?,
            change_24h: self.price_change_percent.as_f64(NAME)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Error;

    const KLINES: &str = r#"[
        [1730818800000, "94300.00", "94400.00", "94250.00", "94380.00", "12.5", 1730822399999, "0", 10, "0", "0", "0"],
        [1730815200000, "94100.00", "94350.00", "94050.00", "94300.00", "10.0", 1730818799999, "0", 10, "0", "0", "0"]
    ]"#;

    #[test]
    fn parses_klines_oldest_first() {
        let candles = parse_klines(decode(NAME, KLINES).unwrap()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, 94_100.0);
        assert_eq!(candles[1].close, 94_380.0);
        assert_eq!(candles[1].volume, 12.5);
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn short_row_is_fetch_error() {
        let rows = decode(NAME, r#"[[1730815200000, "1", "2"]]"#).unwrap();
        assert!(matches!(parse_klines(rows), Err(Error::Fetch { .. })));
    }

    #[test]
    fn parses_ticker() {
        let body = r#"{"symbol":"BTCUSDT","lastPrice":"94350.10","bidPrice":"94350.00",
            "askPrice":"94350.20","volume":"1234.5","priceChangePercent":"-1.25","count":10}"#;
        let ticker = decode::<Ticker24h>(NAME, body)
            .unwrap()
            .into_ticker("BTCUSD-PERP")
            .unwrap();
        assert_eq!(ticker.symbol, "BTCUSD-PERP");
        assert_eq!(ticker.last, 94_350.10);
        assert_eq!(ticker.ask, 94_350.20);
        assert_eq!(ticker.change_24h, -1.25);
    }

    #[test]
    fn uppercase_day_interval_is_lowered() {
        assert_eq!(interval("1D"), "1d");
        assert_eq!(interval("4h"), "4h");
    }
}
