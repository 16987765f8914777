pub mod conditions;
pub mod indicators;
pub mod patterns;
pub mod scoring;

pub use conditions::ConditionEvaluator;
pub use indicators::{IndicatorEngine, IndicatorSet};
pub use patterns::{PatternDetector, PatternRegistry};
pub use scoring::ConfidenceScorer;

use chrono::{DateTime, Utc};
use tracing::debug;

use common::{format_price, CandleSeries, Condition, Pattern, Result, SignalEvaluation, TradeConfig};

/// Everything one cycle derived from its candle window.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub indicators: IndicatorSet,
    pub pattern: Pattern,
    /// Satisfied conditions only, in evaluation order.
    pub conditions: Vec<Condition>,
    pub evaluation: SignalEvaluation,
}

impl Analysis {
    /// Free-text context attached to an outgoing alert.
    pub fn notes(&self) -> String {
        match self.indicators.atr {
            Some(atr) => format!("Pullback into Fibonacci golden zone. ATR: {}", format_price(atr)),
            None => "Pullback into Fibonacci golden zone.".to_string(),
        }
    }
}

/// Indicators, pattern detection, conditions and scoring wired into one call.
pub struct SignalEngine {
    indicators: IndicatorEngine,
    patterns: PatternRegistry,
    conditions: ConditionEvaluator,
    scorer: ConfidenceScorer,
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(IndicatorEngine::default(), PatternRegistry::with_defaults())
    }
}

impl SignalEngine {
    pub fn new(indicators: IndicatorEngine, patterns: PatternRegistry) -> Self {
        Self {
            indicators,
            patterns,
            conditions: ConditionEvaluator,
            scorer: ConfidenceScorer,
        }
    }

    /// Candles a fetch must return for a full analysis.
    pub fn required_candles(&self) -> usize {
        self.indicators.required_candles()
    }

    /// Fails only with `InsufficientHistory` when the window is too short.
    pub fn analyze(
        &self,
        symbol: &str,
        series: &CandleSeries,
        price: f64,
        trade: &TradeConfig,
        now: DateTime<Utc>,
    ) -> Result<Analysis> {
        let indicators = self.indicators.compute(series)?;
        let pattern = self.patterns.detect(series);
        let conditions = self.conditions.evaluate(price, &indicators, pattern, trade);
        let confidence_score = self.scorer.score(&conditions);

        debug!(
            symbol,
            price,
            %pattern,
            rsi = indicators.rsi,
            sma_fast = indicators.sma_fast,
            sma_slow = indicators.sma_slow,
            conditions = conditions.len(),
            confidence = confidence_score,
            "Evaluated candle window"
        );

        let evaluation = SignalEvaluation {
            symbol: symbol.to_string(),
            current_price: price,
            pattern,
            conditions_met: conditions.iter().map(|c| c.description.clone()).collect(),
            confidence_score,
            timestamp: now,
        };

        Ok(Analysis {
            indicators,
            pattern,
            conditions,
            evaluation,
        })
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        series: &CandleSeries,
        price: f64,
        trade: &TradeConfig,
        now: DateTime<Utc>,
    ) -> Result<SignalEvaluation> {
        Ok(self.analyze(symbol, series, price, trade, now)?.evaluation)
    }
}
