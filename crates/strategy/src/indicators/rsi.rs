/// RSI (Relative Strength Index) indicator.
///
/// Uses plain averages of the gains and losses over the trailing `period`
/// one-step close changes (no Wilder smoothing), so the value depends only on
/// the last `period + 1` closes.
/// Returns `None` until at least `period + 1` closed price values are available.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
}

impl RsiIndicator {
    pub const DEFAULT_PERIOD: usize = 14;

    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self { period }
    }

    /// Compute RSI from a slice of close prices (oldest first).
    /// Returns `None` if there are fewer than `period + 1` values.
    /// The result is always within `[0, 100]`.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        if closes.len() < self.period + 1 {
            return None;
        }

        let window = &closes[closes.len() - (self.period + 1)..];
        let (gains, losses) = window
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold((0.0, 0.0), |(g, l), change| {
                if change > 0.0 {
                    (g + change, l)
                } else {
                    (g, l - change)
                }
            });

        let avg_gain = gains / self.period as f64;
        let avg_loss = losses / self.period as f64;

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        Some((100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0))
    }
}

impl Default for RsiIndicator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let rsi = RsiIndicator::new(14);
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert!(rsi.compute(&prices).is_none());
    }

    #[test]
    fn rsi_returns_some_with_sufficient_data() {
        let rsi = RsiIndicator::new(14);
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert!(rsi.compute(&prices).is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_flat_prices_returns_100() {
        // No losses at all, including no gains.
        let rsi = RsiIndicator::new(14);
        let value = rsi.compute(&[50.0; 20]).unwrap();
        assert_eq!(value, 100.0);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = RsiIndicator::new(3);
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_equal_gains_and_losses_is_50() {
        let rsi = RsiIndicator::new(4);
        let prices = vec![10.0, 12.0, 10.0, 12.0, 10.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 50.0).abs() < 1e-9, "Expected 50, got {value}");
    }

    #[test]
    fn rsi_only_uses_trailing_window() {
        let rsi = RsiIndicator::new(3);
        // A big drop long before the window must not matter.
        let with_history = vec![100.0, 10.0, 11.0, 12.0, 13.0];
        let without = vec![10.0, 11.0, 12.0, 13.0];
        assert_eq!(rsi.compute(&with_history), rsi.compute(&without));
    }

    #[test]
    fn rsi_known_value() {
        // gains 2+1 = 3, losses 1 over 3 changes: rs = 3, rsi = 75
        let rsi = RsiIndicator::new(3);
        let value = rsi.compute(&[10.0, 12.0, 11.0, 12.0]).unwrap();
        assert!((value - 75.0).abs() < 1e-9, "Expected 75, got {value}");
    }
}
