use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The trade plan a monitor watches for. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeConfig {
    pub entry_zone_min: f64,
    pub entry_zone_max: f64,
    pub stop_loss: f64,
    pub tp1: f64,
    pub tp2: Option<f64>,
    pub tp3: Option<f64>,
    /// Number of satisfied conditions required before an alert (0..=6).
    pub min_conditions: usize,
    /// Confidence score required before an alert (0..=100).
    pub min_confidence: u8,
    pub signal_cooldown_secs: u64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            entry_zone_min: 94_200.0,
            entry_zone_max: 94_500.0,
            stop_loss: 93_000.0,
            tp1: 95_800.0,
            tp2: Some(97_000.0),
            tp3: Some(98_500.0),
            min_conditions: 4,
            min_confidence: 60,
            signal_cooldown_secs: 3_600,
        }
    }
}

impl TradeConfig {
    pub fn entry_mid(&self) -> f64 {
        (self.entry_zone_min + self.entry_zone_max) / 2.0
    }

    /// Reward to TP1 over risk to the stop, measured from the entry-zone midpoint.
    /// Zero when the stop is not below the midpoint. Rounded to two decimals.
    pub fn risk_reward_ratio(&self) -> f64 {
        let mid = self.entry_mid();
        let risk = mid - self.stop_loss;
        if risk <= 0.0 {
            return 0.0;
        }
        let reward = self.tp1 - mid;
        ((reward / risk) * 100.0).round() / 100.0
    }

    pub fn validate(&self) -> Result<(), Error> {
        let fail = |msg: String| Err(Error::Config(msg));
        if self.entry_zone_min > self.entry_zone_max {
            return fail(format!(
                "entry_zone_min ({}) must not exceed entry_zone_max ({})",
                self.entry_zone_min, self.entry_zone_max
            ));
        }
        if self.stop_loss >= self.entry_zone_min {
            return fail(format!(
                "stop_loss ({}) must be below entry_zone_min ({})",
                self.stop_loss, self.entry_zone_min
            ));
        }
        if self.tp1 <= self.entry_zone_max {
            return fail(format!(
                "tp1 ({}) must be above entry_zone_max ({})",
                self.tp1, self.entry_zone_max
            ));
        }
        if self.min_conditions > 6 {
            return fail(format!(
                "min_conditions must be between 0 and 6, got {}",
                self.min_conditions
            ));
        }
        if self.min_confidence > 100 {
            return fail(format!(
                "min_confidence must be between 0 and 100, got {}",
                self.min_confidence
            ));
        }
        Ok(())
    }
}

/// Named trade-plan bundles. Resolved once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingPreset {
    Conservative,
    Moderate,
    Aggressive,
    Scalp,
}

impl TradingPreset {
    /// Overwrite the plan's price levels and thresholds with this preset's bundle.
    /// The cooldown is left untouched.
    pub fn apply(&self, trade: &mut TradeConfig) {
        let (zone_min, zone_max, stop, tp1, tp2, tp3, min_conditions, min_confidence) = match self {
            TradingPreset::Conservative => {
                (94_200.0, 94_500.0, 93_000.0, 95_500.0, None, None, 5, 75)
            }
            TradingPreset::Moderate => {
                (94_200.0, 94_500.0, 93_000.0, 95_800.0, Some(97_000.0), None, 4, 60)
            }
            TradingPreset::Aggressive => (
                94_000.0,
                94_800.0,
                92_500.0,
                96_500.0,
                Some(98_000.0),
                Some(100_000.0),
                3,
                50,
            ),
            TradingPreset::Scalp => (95_100.0, 95_300.0, 94_700.0, 96_200.0, None, None, 3, 50),
        };

        trade.entry_zone_min = zone_min;
        trade.entry_zone_max = zone_max;
        trade.stop_loss = stop;
        trade.tp1 = tp1;
        trade.tp2 = tp2;
        trade.tp3 = tp3;
        trade.min_conditions = min_conditions;
        trade.min_confidence = min_confidence;
    }
}

impl FromStr for TradingPreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(TradingPreset::Conservative),
            "moderate" => Ok(TradingPreset::Moderate),
            "aggressive" => Ok(TradingPreset::Aggressive),
            "scalp" => Ok(TradingPreset::Scalp),
            other => Err(Error::Config(format!(
                "unknown trading preset '{other}' (expected conservative, moderate, aggressive or scalp)"
            ))),
        }
    }
}

impl std::fmt::Display for TradingPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingPreset::Conservative => write!(f, "conservative"),
            TradingPreset::Moderate => write!(f, "moderate"),
            TradingPreset::Aggressive => write!(f, "aggressive"),
            TradingPreset::Scalp => write!(f, "scalp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_valid() {
        TradeConfig::default().validate().unwrap();
    }

    #[test]
    fn every_preset_yields_a_valid_plan() {
        for preset in [
            TradingPreset::Conservative,
            TradingPreset::Moderate,
            TradingPreset::Aggressive,
            TradingPreset::Scalp,
        ] {
            let mut trade = TradeConfig::default();
            preset.apply(&mut trade);
            trade
                .validate()
                .unwrap_or_else(|e| panic!("preset {preset} invalid: {e}"));
        }
    }

    #[test]
    fn conservative_preset_bundle() {
        let mut trade = TradeConfig {
            signal_cooldown_secs: 120,
            ..TradeConfig::default()
        };
        TradingPreset::Conservative.apply(&mut trade);
        assert_eq!(trade.tp1, 95_500.0);
        assert_eq!(trade.tp2, None);
        assert_eq!(trade.tp3, None);
        assert_eq!(trade.min_conditions, 5);
        assert_eq!(trade.min_confidence, 75);
        assert_eq!(trade.signal_cooldown_secs, 120, "preset must not touch cooldown");
    }

    #[test]
    fn preset_parsing_is_case_insensitive() {
        assert_eq!("Scalp".parse::<TradingPreset>().unwrap(), TradingPreset::Scalp);
        assert!("yolo".parse::<TradingPreset>().is_err());
    }

    #[test]
    fn risk_reward_from_midpoint() {
        // mid 94350, risk 1350, reward 1450
        let rr = TradeConfig::default().risk_reward_ratio();
        assert!((rr - 1.07).abs() < 1e-9, "got {rr}");
    }

    #[test]
    fn risk_reward_zero_when_stop_above_mid() {
        let trade = TradeConfig {
            stop_loss: 95_000.0,
            ..TradeConfig::default()
        };
        assert_eq!(trade.risk_reward_ratio(), 0.0);
    }

    #[test]
    fn inverted_zone_rejected() {
        let trade = TradeConfig {
            entry_zone_min: 95_000.0,
            entry_zone_max: 94_000.0,
            ..TradeConfig::default()
        };
        assert!(matches!(trade.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn too_many_conditions_rejected() {
        let trade = TradeConfig {
            min_conditions: 7,
            ..TradeConfig::default()
        };
        assert!(trade.validate().is_err());
    }
}
