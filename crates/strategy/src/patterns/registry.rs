use tracing::debug;

use common::{CandleSeries, Pattern};

use super::{BullishEngulfingDetector, DojiDetector, HammerDetector, PatternDetector, PinbarDetector};

/// Holds the active pattern detectors and picks one pattern per candle window.
#[derive(Default)]
pub struct PatternRegistry {
    detectors: Vec<Box<dyn PatternDetector>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in detectors, strongest first.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(BullishEngulfingDetector))
            .register(Box::new(HammerDetector::default()))
            .register(Box::new(PinbarDetector::default()))
            .register(Box::new(DojiDetector::default()));
        registry
    }

    pub fn register(&mut self, detector: Box<dyn PatternDetector>) -> &mut Self {
        debug!(name = %detector.name(), pattern = %detector.pattern(), "Registered pattern detector");
        self.detectors.push(detector);
        self
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Highest-weight match wins; on equal weight the earlier registration wins.
    /// `Pattern::None` when nothing matches.
    pub fn detect(&self, series: &CandleSeries) -> Pattern {
        let mut best = Pattern::None;
        for detector in &self.detectors {
            if let Some(found) = detector.detect(series) {
                if best.is_none() || found.weight() > best.weight() {
                    best = found;
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use common::Candle;

    fn series(bars: &[(f64, f64, f64, f64)]) -> CandleSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CandleSeries::new(
            bars.iter()
                .enumerate()
                .map(|(i, &(open, high, low, close))| Candle {
                    open,
                    high,
                    low,
                    close,
                    volume: 1.0,
                    timestamp: start + Duration::hours(i as i64),
                })
                .collect(),
        )
    }

    struct Always(Pattern, &'static str);

    impl PatternDetector for Always {
        fn name(&self) -> &str {
            self.1
        }
        fn pattern(&self) -> Pattern {
            self.0
        }
        fn matches(&self, _candles: &[common::Candle]) -> bool {
            true
        }
    }

    #[test]
    fn engulfing_beats_hammer_on_same_candle() {
        // Bearish 100 -> 99.5, then a bullish candle that engulfs it and has a
        // hammer shape (lower wick 1.9, body 0.8, body bottom in upper third).
        let s = series(&[(100.0, 100.1, 99.4, 99.5), (99.4, 100.3, 97.5, 100.2)]);
        let registry = PatternRegistry::with_defaults();

        assert!(BullishEngulfingDetector.detect(&s).is_some());
        assert!(HammerDetector::default().detect(&s).is_some());
        assert_eq!(registry.detect(&s), Pattern::BullishEngulfing);
    }

    #[test]
    fn hammer_wins_tie_with_pinbar() {
        let s = series(&[(99.0, 100.5, 95.0, 100.0)]);
        assert_eq!(PatternRegistry::with_defaults().detect(&s), Pattern::Hammer);
    }

    #[test]
    fn no_match_is_none() {
        // Plain bullish marubozu
        let s = series(&[(100.0, 110.0, 100.0, 110.0)]);
        assert_eq!(PatternRegistry::with_defaults().detect(&s), Pattern::None);
        assert_eq!(PatternRegistry::new().detect(&s), Pattern::None);
    }

    #[test]
    fn equal_weight_goes_to_first_registered() {
        let mut registry = PatternRegistry::new();
        registry
            .register(Box::new(Always(Pattern::PinbarBullish, "first")))
            .register(Box::new(Always(Pattern::Hammer, "second")));
        let s = series(&[(1.0, 2.0, 0.5, 1.5)]);
        assert_eq!(registry.detect(&s), Pattern::PinbarBullish);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn custom_detector_without_touching_registry() {
        let mut registry = PatternRegistry::with_defaults();
        registry.register(Box::new(Always(Pattern::Doji, "always_doji")));
        let s = series(&[(100.0, 110.0, 100.0, 110.0)]);
        assert_eq!(registry.detect(&s), Pattern::Doji);
    }
}
