use async_trait::async_trait;

use crate::{Candle, Result, Ticker};

/// Abstraction over a market-data venue.
///
/// Implementations live in `crates/engine/src/exchanges` and are looked up by
/// name through `SourceRegistry`. Transport and parse failures must surface as
/// `Error::Fetch` so the monitor can retry or skip the cycle; only bad setup
/// (unknown venue, unusable client) is an `Error::Config`.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Registry name of this venue, e.g. "binance".
    fn name(&self) -> &str;

    /// Fetch up to `limit` candles, oldest first.
    async fn get_candles(&self, symbol: &str, timeframe: &str, limit: usize) -> Result<Vec<Candle>>;

    /// Fetch the current ticker for a symbol.
    async fn get_ticker(&self, symbol: &str) -> Result<Ticker>;
}
