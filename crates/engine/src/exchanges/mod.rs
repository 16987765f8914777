//! Public market-data adapters behind the [`CandleSource`] trait.

pub mod binance;
pub mod bybit;
pub mod cryptocom;

pub use binance::BinanceSource;
pub use bybit::BybitSource;
pub use cryptocom::CryptoComSource;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use common::{CandleSource, Error, Result};

/// Timeout applied to every market-data request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// The shared HTTP client used by every source.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .use_rustls_tls()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

type SourceFactory = Box<dyn Fn(Client) -> Arc<dyn CandleSource> + Send + Sync>;

/// Looks candle sources up by case-insensitive name.
pub struct SourceRegistry {
    client: Client,
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            factories: BTreeMap::new(),
        }
    }

    /// Binance, Bybit and Crypto.com (also reachable as `crypto.com`).
    pub fn with_defaults(client: Client) -> Self {
        let mut registry = Self::new(client);
        registry
            .register("binance", |c| Arc::new(BinanceSource::new(c)))
            .register("bybit", |c| Arc::new(BybitSource::new(c)))
            .register("cryptocom", |c| Arc::new(CryptoComSource::new(c)))
            .register("crypto.com", |c| Arc::new(CryptoComSource::new(c)));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(Client) -> Arc<dyn CandleSource> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.to_ascii_lowercase(), Box::new(factory));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Unknown names are a configuration error.
    pub fn create(&self, name: &str) -> Result<Arc<dyn CandleSource>> {
        let factory = self.factories.get(&name.to_ascii_lowercase()).ok_or_else(|| {
            Error::Config(format!(
                "unsupported exchange '{name}', expected one of: {}",
                self.names().join(", ")
            ))
        })?;
        Ok(factory(self.client.clone()))
    }
}

// ─── Shared request helpers ───────────────────────────────────────────────────

/// GET `url` and decode the JSON body. Transport, status and parse failures
/// all become `Error::Fetch` tagged with `exchange`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    exchange: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    debug!(exchange, url, "GET");
    let resp = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| Error::fetch(exchange, e))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::fetch(exchange, e))?;
    if !status.is_success() {
        let snippet: String = body.chars().take(200).collect();
        return Err(Error::fetch(exchange, format!("HTTP {status}: {snippet}")));
    }
    decode(exchange, &body)
}

pub(crate) fn decode<T: DeserializeOwned>(exchange: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::fetch(exchange, format!("invalid response: {e}")))
}

/// Venues mix quoted and bare numbers; accept both.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Number {
    pub(crate) fn as_f64(&self, exchange: &str) -> Result<f64> {
        match self {
            Number::Float(v) => Ok(*v),
            Number::Int(v) => Ok(*v as f64),
            Number::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::fetch(exchange, format!("not a number: '{s}'"))),
        }
    }

    pub(crate) fn as_millis(&self, exchange: &str) -> Result<DateTime<Utc>> {
        let millis = match self {
            Number::Int(v) => *v,
            Number::Float(v) => *v as i64,
            Number::Text(s) => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(s.trim()) {
                    return Ok(ts.with_timezone(&Utc));
                }
                s.trim()
                    .parse()
                    .map_err(|_| Error::fetch(exchange, format!("bad timestamp: '{s}'")))?
            }
        };
        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| Error::fetch(exchange, format!("timestamp out of range: {millis}")))
    }
}

/// Perpetual-style names used in the config mapped to spot/linear tickers.
pub(crate) fn usdt_symbol(symbol: &str) -> String {
    match symbol.to_ascii_uppercase().as_str() {
        "BTCUSD-PERP" => "BTCUSDT".to_string(),
        "ETHUSD-PERP" => "ETHUSDT".to_string(),
        other => other.to_string(),
    }
}
