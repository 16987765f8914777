pub mod detectors;
pub mod registry;

pub use detectors::{BullishEngulfingDetector, DojiDetector, HammerDetector, PinbarDetector};
pub use registry::PatternRegistry;

use common::{Candle, CandleSeries, Pattern};

/// All candle pattern detectors must satisfy this trait.
pub trait PatternDetector: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// The pattern this detector reports when it matches.
    fn pattern(&self) -> Pattern;

    /// Shape test over an oldest-first candle slice. Only the tail matters.
    fn matches(&self, candles: &[Candle]) -> bool;

    fn detect(&self, series: &CandleSeries) -> Option<Pattern> {
        self.matches(series.as_slice()).then(|| self.pattern())
    }
}
