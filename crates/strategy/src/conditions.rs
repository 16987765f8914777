use common::{format_price, Condition, ConditionId, Pattern, TradeConfig};

use crate::indicators::IndicatorSet;

/// Inclusive RSI band treated as a pullback into support.
pub const RSI_ZONE: (f64, f64) = (30.0, 50.0);

/// Applies the six trade-setup checks, in fixed order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Fixed weight of a check. `PatternPresent` carries the pattern's own weight.
    pub fn weight(id: ConditionId, pattern: Pattern) -> u8 {
        match id {
            ConditionId::EntryZone => 20,
            ConditionId::PatternPresent => pattern.weight(),
            ConditionId::SmaCross => 15,
            ConditionId::PriceAboveSmaSlow => 10,
            ConditionId::RsiZone => 15,
            ConditionId::VolumeAboveAverage => 10,
        }
    }

    /// Every check with its outcome, satisfied or not.
    pub fn check_all(
        &self,
        price: f64,
        indicators: &IndicatorSet,
        pattern: Pattern,
        trade: &TradeConfig,
    ) -> Vec<Condition> {
        ConditionId::ALL
            .iter()
            .map(|&id| {
                let (satisfied, description) = check(id, price, indicators, pattern, trade);
                Condition {
                    id,
                    description,
                    satisfied,
                    weight: Self::weight(id, pattern),
                }
            })
            .collect()
    }

    /// Only the satisfied checks, in evaluation order.
    pub fn evaluate(
        &self,
        price: f64,
        indicators: &IndicatorSet,
        pattern: Pattern,
        trade: &TradeConfig,
    ) -> Vec<Condition> {
        self.check_all(price, indicators, pattern, trade)
            .into_iter()
            .filter(|c| c.satisfied)
            .collect()
    }
}

fn check(
    id: ConditionId,
    price: f64,
    ind: &IndicatorSet,
    pattern: Pattern,
    trade: &TradeConfig,
) -> (bool, String) {
    match id {
        ConditionId::EntryZone => (
            trade.entry_zone_min <= price && price <= trade.entry_zone_max,
            format!(
                "Price in entry zone ({} - {})",
                format_price(trade.entry_zone_min),
                format_price(trade.entry_zone_max)
            ),
        ),
        ConditionId::PatternPresent => (!pattern.is_none(), format!("Pattern: {pattern}")),
        ConditionId::SmaCross => (
            ind.sma_fast > ind.sma_slow,
            format!("SMA 7 above SMA 21 ({:.2} > {:.2})", ind.sma_fast, ind.sma_slow),
        ),
        ConditionId::PriceAboveSmaSlow => (
            price > ind.sma_slow,
            format!("Price above SMA 21 ({})", format_price(ind.sma_slow)),
        ),
        ConditionId::RsiZone => (
            RSI_ZONE.0 <= ind.rsi && ind.rsi <= RSI_ZONE.1,
            format!("RSI in support zone ({:.1})", ind.rsi),
        ),
        ConditionId::VolumeAboveAverage => (
            ind.avg_volume > 0.0 && ind.current_volume > ind.avg_volume,
            format!(
                "Volume above average ({:.2} vs {:.2})",
                ind.current_volume, ind.avg_volume
            ),
        ),
    }
}
