use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use common::{SignalEvaluation, TradeConfig};

use crate::cooldown::CooldownGate;

/// Outcome of offering an evaluation to the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Accepted,
    BelowThreshold { conditions: usize, confidence: u8 },
    CoolingDown { remaining: Duration },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Enough conditions and enough confidence for the trade plan.
pub fn meets_thresholds(evaluation: &SignalEvaluation, trade: &TradeConfig) -> bool {
    evaluation.conditions_met.len() >= trade.min_conditions
        && evaluation.confidence_score >= trade.min_confidence
}

/// The only path from an evaluation to dispatch: thresholds, then cooldown.
#[derive(Debug, Clone)]
pub struct SignalGate {
    trade: TradeConfig,
    cooldown: CooldownGate,
}

impl SignalGate {
    pub fn new(trade: TradeConfig) -> Self {
        let cooldown = CooldownGate::new(trade.signal_cooldown_secs);
        Self { trade, cooldown }
    }

    pub fn trade(&self) -> &TradeConfig {
        &self.trade
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    pub fn admit(&mut self, evaluation: &SignalEvaluation, now: DateTime<Utc>) -> Admission {
        if !meets_thresholds(evaluation, &self.trade) {
            debug!(
                symbol = %evaluation.symbol,
                conditions = evaluation.conditions_met.len(),
                min_conditions = self.trade.min_conditions,
                confidence = evaluation.confidence_score,
                min_confidence = self.trade.min_confidence,
                "Below alert thresholds"
            );
            return Admission::BelowThreshold {
                conditions: evaluation.conditions_met.len(),
                confidence: evaluation.confidence_score,
            };
        }

        if !self.cooldown.allows(&evaluation.symbol, now) {
            let remaining = self.cooldown.remaining(&evaluation.symbol, now);
            info!(
                symbol = %evaluation.symbol,
                remaining_secs = remaining.num_seconds(),
                "Signal suppressed by cooldown"
            );
            return Admission::CoolingDown { remaining };
        }

        Admission::Accepted
    }

    /// Start the cooldown for an accepted evaluation.
    pub fn record_fire(&mut self, symbol: &str, now: DateTime<Utc>) {
        self.cooldown.record_fire(symbol, now);
    }
}
