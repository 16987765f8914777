use serde::Serialize;

use common::Candle;

/// Retracement ratios measured down from the swing high.
pub const FIB_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// One retracement level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Fibonacci retracement of a swing, ordered by ratio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibLevels {
    pub high: f64,
    pub low: f64,
    pub levels: Vec<FibLevel>,
}

impl FibLevels {
    /// Levels at `high − ratio × (high − low)` for every ratio in [`FIB_RATIOS`].
    pub fn from_range(high: f64, low: f64) -> Self {
        let diff = high - low;
        let levels = FIB_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: high - ratio * diff,
            })
            .collect();
        Self { high, low, levels }
    }

    /// Swing high/low over the trailing `lookback` candles (or all of them if fewer).
    /// Returns `None` for an empty slice.
    pub fn from_candles(candles: &[Candle], lookback: usize) -> Option<Self> {
        let window = &candles[candles.len().saturating_sub(lookback)..];
        if window.is_empty() {
            return None;
        }
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        Some(Self::from_range(high, low))
    }

    /// Price at `ratio`, if it is one of the computed ratios.
    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|l| (l.ratio - ratio).abs() < 1e-9)
            .map(|l| l.price)
    }
}
