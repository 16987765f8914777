use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use common::{Candle, CandleSource, Error, Result, Ticker};

use super::{get_json, Number};

const NAME: &str = "cryptocom";
const BASE_URL: &str = "https://api.crypto.com/exchange/v1";

/// Crypto.com Exchange v1 public market data. Instrument names are passed
/// through unchanged (`BTCUSD-PERP` is native here).
pub struct CryptoComSource {
    http: Client,
    base_url: String,
}

impl CryptoComSource {
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

fn timeframe_code(timeframe: &str) -> String {
    match timeframe {
        "1d" => "1D".to_string(),
        "1w" => "1W".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl CandleSource for CryptoComSource {
    fn name(&self) -> &str {
        NAME
    }

    async fn get_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>> {
        let resp: Envelope<CandleItem> = get_json(
            &self.http,
            NAME,
            &format!("{}/public/get-candlestick", self.base_url),
            &[
                ("instrument_name", symbol.to_string()),
                ("timeframe", timeframe_code(timeframe)),
                ("count", limit.to_string()),
            ],
        )
        .await?;
        parse_candles(resp.into_data()?, limit)
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let resp: Envelope<TickerItem> = get_json(
            &self.http,
            NAME,
            &format!("{}/public/get-ticker", self.base_url),
            &[("instrument_name", symbol.to_string())],
        )
        .await?;
        let item = resp
            .into_data()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::fetch(NAME, format!("no ticker for {symbol}")))?;
        item.into_ticker(symbol)
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    result: Option<DataList<T>>,
}

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Vec<T>> {
        if self.code != 0 {
            return Err(Error::fetch(
                NAME,
                format!("code {}: {}", self.code, self.message.unwrap_or_default()),
            ));
        }
        Ok(self.result.map(|r| r.data).unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct CandleItem {
    #[serde(alias = "timestamp")]
    t: Number,
    #[serde(alias = "open")]
    o: Number,
    #[serde(alias = "high")]
    h: Number,
    #[serde(alias = "low")]
    l: Number,
    #[serde(alias = "close")]
    c: Number,
    #[serde(alias = "volume")]
    v: Option<Number>,
}

/// Keeps the newest `limit` candles, oldest first.
fn parse_candles(items: Vec<CandleItem>, limit: usize) -> Result<Vec<Candle>> {
    let mut candles = items
        .iter()
        .map(|item| -> Result<Candle> {
            Ok(Candle {
                timestamp: item.t.as_millis(NAME)?,
                open: item.o.as_f64(NAME)?,
                high: item.h.as_f64(NAME)?,
                low: item.l.as_f64(NAME)?,
                close: item.c.as_f64(NAME)?,
                volume: item.v.as_ref().map_or(Ok(0.0), |v| v.as_f64(NAME))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    candles.sort_by_key(|c| c.timestamp);
    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    Ok(candles)
}

/// `a` last trade, `b` best bid, `k` best ask, `v` 24h volume, `c` 24h change.
#[derive(Debug, Deserialize)]
struct TickerItem {
    a: Option<Number>,
    b: Option<Number>,
    k: Option<Number>,
    v: Option<Number>,
    c: Option<Number>,
}

impl TickerItem {
    fn into_ticker(self, symbol: &str) -> Result<Ticker> {
        let num = |n: Option<Number>| n.map_or(Ok(0.0), |n| n.as_f64(NAME));
        Ok(Ticker {
            symbol: symbol.to_string(),
            last: num(self.a)?,
            bid: num(self.b)?,
            ask: num(self.k)?,
            volume_24h: num(self.v)?,
            change_24h: num(self.c)?,
        })
    }
}
