use common::{Condition, ConditionId};

pub const MAX_SCORE: u8 = 100;

/// Sum of satisfied weights, capped at [`MAX_SCORE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn score(&self, conditions: &[Condition]) -> u8 {
        score(conditions)
    }
}

pub fn score(conditions: &[Condition]) -> u8 {
    let total: u32 = conditions
        .iter()
        .filter(|c| c.satisfied)
        .map(|c| u32::from(c.weight))
        .sum();
    total.min(u32::from(MAX_SCORE)) as u8
}

/// Score contribution of one condition id within a list, 0 if absent.
pub fn contribution(conditions: &[Condition], id: ConditionId) -> u8 {
    conditions
        .iter()
        .find(|c| c.id == id && c.satisfied)
        .map_or(0, |c| c.weight)
}
