pub mod atr;
pub mod fibonacci;
pub mod rsi;
pub mod sma;

pub use atr::atr;
pub use fibonacci::{FibLevel, FibLevels, FIB_RATIOS};
pub use rsi::RsiIndicator;
pub use sma::sma;

use serde::Serialize;

use common::{CandleSeries, Error, Result};

/// Everything the condition checks need, derived from one candle window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub sma_fast: f64,
    pub sma_slow: f64,
    pub rsi: f64,
    pub fib_levels: FibLevels,
    /// `None` when the window is too short for a full ATR.
    pub atr: Option<f64>,
    /// Mean volume of the candles preceding the current one.
    pub avg_volume: f64,
    pub current_volume: f64,
}

/// Computes an [`IndicatorSet`] from a [`CandleSeries`]. Stateless: the same
/// series always yields the same set.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi: RsiIndicator,
    pub fib_lookback: usize,
    pub atr_period: usize,
    pub volume_lookback: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            fast_period: 7,
            slow_period: 21,
            rsi: RsiIndicator::default(),
            fib_lookback: 50,
            atr_period: 14,
            volume_lookback: 20,
        }
    }
}

impl IndicatorEngine {
    /// Minimum number of candles for a full indicator set.
    pub fn required_candles(&self) -> usize {
        self.slow_period.max(self.fast_period).max(self.rsi.period + 1)
    }

    pub fn compute(&self, series: &CandleSeries) -> Result<IndicatorSet> {
        let required = self.required_candles();
        let insufficient = || Error::InsufficientHistory {
            required,
            available: series.len(),
        };
        if series.len() < required {
            return Err(insufficient());
        }

        let closes = series.closes();
        let candles = series.as_slice();

        let sma_fast = sma(&closes, self.fast_period).ok_or_else(insufficient)?;
        let sma_slow = sma(&closes, self.slow_period).ok_or_else(insufficient)?;
        let rsi = self.rsi.compute(&closes).ok_or_else(insufficient)?;
        let fib_levels =
            FibLevels::from_candles(candles, self.fib_lookback).ok_or_else(insufficient)?;

        let (current, history) = candles.split_last().ok_or_else(insufficient)?;
        let preceding = &history[history.len().saturating_sub(self.volume_lookback)..];
        let avg_volume = if preceding.is_empty() {
            0.0
        } else {
            preceding.iter().map(|c| c.volume).sum::<f64>() / preceding.len() as f64
        };

        Ok(IndicatorSet {
            sma_fast,
            sma_slow,
            rsi,
            fib_levels,
            atr: atr(candles, self.atr_period),
            avg_volume,
            current_volume: current.volume,
        })
    }
}
