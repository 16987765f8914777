use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Pattern;

/// Runtime summary of one monitor, refreshed after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: String,
    pub cycles: u64,
    pub last_price: Option<f64>,
    pub last_pattern: Option<Pattern>,
    pub last_confidence: Option<u8>,
    pub last_conditions: Vec<String>,
    pub last_signal_at: Option<DateTime<Utc>>,
    pub signals_sent: u64,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonitorSnapshot {
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            timeframe: timeframe.into(),
            cycles: 0,
            last_price: None,
            last_pattern: None,
            last_confidence: None,
            last_conditions: Vec::new(),
            last_signal_at: None,
            signals_sent: 0,
            last_error: None,
            updated_at: None,
        }
    }

    /// Board key: `exchange:symbol`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.exchange, self.symbol)
    }
}

/// Shared, read-mostly view of every monitor's latest state.
///
/// Written only by the owning monitor task; read by the Telegram bot and the
/// status API.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<RwLock<BTreeMap<String, MonitorSnapshot>>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, snapshot: MonitorSnapshot) {
        self.inner.write().await.insert(snapshot.key(), snapshot);
    }

    pub async fn get(&self, key: &str) -> Option<MonitorSnapshot> {
        self.inner.read().await.get(key).cloned()
    }

    /// All snapshots, ordered by key.
    pub async fn snapshots(&self) -> Vec<MonitorSnapshot> {
        self.inner.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_replaces_by_key() {
        let board = StatusBoard::new();
        let mut snap = MonitorSnapshot::new("BTCUSDT", "binance", "1h");
        board.publish(snap.clone()).await;

        snap.cycles = 3;
        board.publish(snap).await;

        assert_eq!(board.len().await, 1);
        assert_eq!(board.get("binance:BTCUSDT").await.unwrap().cycles, 3);
    }

    #[tokio::test]
    async fn snapshots_are_ordered_by_key() {
        let board = StatusBoard::new();
        board.publish(MonitorSnapshot::new("ETHUSDT", "bybit", "1h")).await;
        board.publish(MonitorSnapshot::new("BTCUSDT", "binance", "1h")).await;

        let keys: Vec<String> = board.snapshots().await.iter().map(|s| s.key()).collect();
        assert_eq!(keys, vec!["binance:BTCUSDT", "bybit:ETHUSDT"]);
    }
}
