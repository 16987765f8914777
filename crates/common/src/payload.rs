use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::format_price;
use crate::{Pattern, SignalEvaluation, SignalType, TradeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeProfits {
    pub tp1: f64,
    pub tp2: Option<f64>,
    pub tp3: Option<f64>,
}

/// The structured record sent to every notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    pub signal_type: SignalType,
    pub symbol: String,
    pub entry_zone: EntryZone,
    pub stop_loss: f64,
    pub take_profits: TakeProfits,
    pub pattern: Pattern,
    pub confidence_score: u8,
    pub conditions_met: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub risk_reward_ratio: f64,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub notes: String,
}

impl SignalPayload {
    pub fn new(
        evaluation: &SignalEvaluation,
        trade: &TradeConfig,
        timeframe: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            signal_type: SignalType::Long,
            symbol: evaluation.symbol.clone(),
            entry_zone: EntryZone {
                min: trade.entry_zone_min,
                max: trade.entry_zone_max,
            },
            stop_loss: trade.stop_loss,
            take_profits: TakeProfits {
                tp1: trade.tp1,
                tp2: trade.tp2,
                tp3: trade.tp3,
            },
            pattern: evaluation.pattern,
            confidence_score: evaluation.confidence_score,
            conditions_met: evaluation.conditions_met.clone(),
            timestamp: evaluation.timestamp,
            current_price: evaluation.current_price,
            risk_reward_ratio: trade.risk_reward_ratio(),
            timeframe: timeframe.into(),
            notes: notes.into(),
        }
    }

    /// Recover the evaluation this payload was built from.
    pub fn evaluation(&self) -> SignalEvaluation {
        SignalEvaluation {
            symbol: self.symbol.clone(),
            current_price: self.current_price,
            pattern: self.pattern,
            conditions_met: self.conditions_met.clone(),
            confidence_score: self.confidence_score,
            timestamp: self.timestamp,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Plain-text rendering for chat channels.
    pub fn to_message(&self) -> String {
        let mut targets = format!("TP1: {}", format_price(self.take_profits.tp1));
        if let Some(tp2) = self.take_profits.tp2 {
            targets.push_str(&format!(" | TP2: {}", format_price(tp2)));
        }
        if let Some(tp3) = self.take_profits.tp3 {
            targets.push_str(&format!(" | TP3: {}", format_price(tp3)));
        }

        let conditions = self
            .conditions_met
            .iter()
            .map(|c| format!("  \u{2705} {c}"))
            .collect::<Vec<_>>()
            .join("\n");

        let mut text = format!(
            "\u{1F6A8} TRADING SIGNAL DETECTED \u{1F6A8}\n\
             \n\
             {signal} {symbol}\n\
             Timeframe: {timeframe}\n\
             Current price: {price}\n\
             \n\
             ENTRY: {zone_min} - {zone_max}\n\
             STOP LOSS: {stop}\n\
             TAKE PROFITS: {targets}\n\
             \n\
             R:R ratio: {rr:.2}\n\
             Confidence: {score}%\n\
             Pattern: {pattern}\n\
             \n\
             Conditions met:\n\
             {conditions}\n",
            signal = self.signal_type,
            symbol = self.symbol,
            timeframe = self.timeframe,
            price = format_price(self.current_price),
            zone_min = format_price(self.entry_zone.min),
            zone_max = format_price(self.entry_zone.max),
            stop = format_price(self.stop_loss),
            rr = self.risk_reward_ratio,
            score = self.confidence_score,
            pattern = self.pattern,
        );

        if !self.notes.is_empty() {
            text.push_str(&format!("\n{}\n", self.notes));
        }
        text.push_str(&format!("\n{}", self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn evaluation() -> SignalEvaluation {
        SignalEvaluation {
            symbol: "BTCUSDT".into(),
            current_price: 94_321.57,
            pattern: Pattern::Hammer,
            conditions_met: vec![
                "Price in entry zone ($94,200.00 - $94,500.00)".into(),
                "Reversal pattern detected: HAMMER".into(),
                "RSI in support zone (41.2)".into(),
                "Volume above average (1.8x)".into(),
            ],
            confidence_score: 65,
            timestamp: Utc.with_ymd_and_hms(2024, 11, 5, 14, 0, 0).unwrap(),
        }
    }

    #[test]
    fn payload_round_trip_preserves_fields() {
        let eval = evaluation();
        let payload = SignalPayload::new(&eval, &TradeConfig::default(), "1h", "");
        let json = payload.to_json().unwrap();
        let back = SignalPayload::from_json(&json).unwrap();

        assert_eq!(back, payload);
        assert_eq!(back.evaluation(), eval);
    }

    #[test]
    fn price_keeps_every_bit_through_json() {
        let eval = SignalEvaluation {
            current_price: 92_123.842_989_085_97,
            ..evaluation()
        };
        let payload = SignalPayload::new(&eval, &TradeConfig::default(), "1h", "");
        let back = SignalPayload::from_json(&payload.to_json().unwrap()).unwrap();
        assert_eq!(back.current_price.to_bits(), eval.current_price.to_bits());
    }

    #[test]
    fn payload_wire_shape() {
        let trade = TradeConfig {
            tp3: None,
            ..TradeConfig::default()
        };
        let payload = SignalPayload::new(&evaluation(), &trade, "4h", "notes");
        let value: serde_json::Value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["signal_type"], "LONG");
        assert_eq!(value["entry_zone"]["min"], 94_200.0);
        assert_eq!(value["entry_zone"]["max"], 94_500.0);
        assert_eq!(value["take_profits"]["tp2"], 97_000.0);
        assert!(value["take_profits"]["tp3"].is_null());
        assert_eq!(value["pattern"], "HAMMER");
        assert_eq!(value["confidence_score"], 65);
        assert_eq!(value["conditions_met"].as_array().unwrap().len(), 4);
        assert_eq!(value["timestamp"], "2024-11-05T14:00:00Z");
        assert_eq!(value["risk_reward_ratio"], 1.07);
    }

    #[test]
    fn message_lists_targets_and_conditions() {
        let payload = SignalPayload::new(&evaluation(), &TradeConfig::default(), "1h", "Pullback");
        let text = payload.to_message();
        assert!(text.contains("LONG BTCUSDT"));
        assert!(text.contains("TP3: $98,500.00"));
        assert!(text.contains("RSI in support zone (41.2)"));
        assert!(text.contains("Pullback"));
        assert!(text.contains("2024-11-05 14:00:00 UTC"));
    }
}
