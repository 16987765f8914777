//! Built-in bullish candle pattern detectors.
//!
//! Every detector looks at the most recent candle; the engulfing detector also
//! needs the one before it.

use common::{Candle, Pattern};

use super::PatternDetector;

/// Current candle is bullish, the previous one bearish, and the current body
/// fully contains the previous body.
#[derive(Debug, Clone, Copy, Default)]
pub struct BullishEngulfingDetector;

impl PatternDetector for BullishEngulfingDetector {
    fn name(&self) -> &str {
        "bullish_engulfing"
    }

    fn pattern(&self) -> Pattern {
        Pattern::BullishEngulfing
    }

    fn matches(&self, candles: &[Candle]) -> bool {
        let [.., previous, current] = candles else {
            return false;
        };
        previous.is_bearish()
            && current.is_bullish()
            && current.open < previous.close
            && current.close > previous.open
    }
}

/// Long lower wick (at least `min_wick_to_body` bodies) with the body sitting
/// in the upper third of the range.
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub min_wick_to_body: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            min_wick_to_body: 2.0,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &str {
        "hammer"
    }

    fn pattern(&self) -> Pattern {
        Pattern::Hammer
    }

    fn matches(&self, candles: &[Candle]) -> bool {
        let Some(c) = candles.last() else {
            return false;
        };
        let body = c.body();
        let range = c.range();
        if body <= 0.0 || range <= 0.0 {
            return false;
        }
        let body_bottom = c.open.min(c.close);
        c.lower_wick() >= self.min_wick_to_body * body && body_bottom >= c.low + range * 2.0 / 3.0
    }
}

/// Lower wick covering at least `min_wick_share` of the candle's range.
#[derive(Debug, Clone, Copy)]
pub struct PinbarDetector {
    pub min_wick_share: f64,
}

impl Default for PinbarDetector {
    fn default() -> Self {
        Self {
            min_wick_share: 0.6,
        }
    }
}

impl PatternDetector for PinbarDetector {
    fn name(&self) -> &str {
        "pinbar_bullish"
    }

    fn pattern(&self) -> Pattern {
        Pattern::PinbarBullish
    }

    fn matches(&self, candles: &[Candle]) -> bool {
        let Some(c) = candles.last() else {
            return false;
        };
        let range = c.range();
        range > 0.0 && c.lower_wick() / range >= self.min_wick_share
    }
}

/// Body smaller than `max_body_share` of the range.
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_share: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_share: 0.1,
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &str {
        "doji"
    }

    fn pattern(&self) -> Pattern {
        Pattern::Doji
    }

    fn matches(&self, candles: &[Candle]) -> bool {
        let Some(c) = candles.last() else {
            return false;
        };
        let range = c.range();
        range > 0.0 && c.body() / range < self.max_body_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ohlc(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open,
            high,
            low,
            close,
            volume: 1.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn engulfing_requires_bearish_then_containing_bullish() {
        let prev = ohlc(101.0, 101.5, 99.5, 100.0);
        let cur = ohlc(99.8, 102.0, 99.5, 101.5);
        assert!(BullishEngulfingDetector.matches(&[prev, cur]));

        // Previous bullish: no engulfing
        let prev_up = ohlc(100.0, 101.5, 99.5, 101.0);
        assert!(!BullishEngulfingDetector.matches(&[prev_up, cur]));

        // Current body does not reach above previous open
        let short = ohlc(99.8, 101.0, 99.5, 100.9);
        assert!(!BullishEngulfingDetector.matches(&[prev, short]));
    }

    #[test]
    fn engulfing_needs_two_candles() {
        assert!(!BullishEngulfingDetector.matches(&[ohlc(1.0, 2.0, 0.5, 1.5)]));
        assert!(!BullishEngulfingDetector.matches(&[]));
    }

    #[test]
    fn hammer_shape() {
        // body 1 (99..100), lower wick 4, range 5.5, body bottom 99 >= 94.5 + 3.67
        assert!(HammerDetector::default().matches(&[ohlc(99.0, 100.5, 95.0, 100.0)]));
        // body in the lower half
        assert!(!HammerDetector::default().matches(&[ohlc(96.0, 100.0, 95.0, 96.5)]));
        // lower wick shorter than 2x body
        assert!(!HammerDetector::default().matches(&[ohlc(98.0, 100.0, 97.0, 99.9)]));
    }

    #[test]
    fn hammer_rejects_zero_body() {
        assert!(!HammerDetector::default().matches(&[ohlc(100.0, 100.0, 95.0, 100.0)]));
    }

    #[test]
    fn pinbar_wick_share() {
        // lower wick 6 of range 10
        assert!(PinbarDetector::default().matches(&[ohlc(97.0, 100.0, 90.0, 96.0)]));
        // lower wick 5 of range 10
        assert!(!PinbarDetector::default().matches(&[ohlc(95.0, 100.0, 90.0, 98.0)]));
        // flat candle
        assert!(!PinbarDetector::default().matches(&[ohlc(1.0, 1.0, 1.0, 1.0)]));
    }

    #[test]
    fn doji_body_share() {
        assert!(DojiDetector::default().matches(&[ohlc(100.0, 105.0, 95.0, 100.5)]));
        assert!(!DojiDetector::default().matches(&[ohlc(100.0, 105.0, 95.0, 101.0)]));
        assert!(!DojiDetector::default().matches(&[ohlc(1.0, 1.0, 1.0, 1.0)]));
    }
}
