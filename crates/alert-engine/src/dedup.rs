//! Evidence deduplication
//!
//! Upstream delivery is at-least-once, so the same data point can be
//! evaluated more than once. Two evaluations are the same evidence when they
//! agree on everything but the instant they were produced.

use crate::condition_eval::ConditionEval;

/// Whether `a` and `b` carry the same evidence
///
/// Compares condition, payload, match flag, data timestamp and context.
/// `eval_timestamp` is ignored so a replay re-evaluated later still counts as
/// a duplicate.
pub fn is_duplicate(a: &ConditionEval, b: &ConditionEval) -> bool {
    a.is_match() == b.is_match()
        && a.data_timestamp() == b.data_timestamp()
        && a.context() == b.context()
        && a.detail() == b.detail()
}

/// Evidence of a trigger's most recent firing
#[derive(Debug, Clone, Default)]
pub struct FiredEvidence {
    evidence: Vec<ConditionEval>,
    generation: u64,
}

impl FiredEvidence {
    pub fn record(&mut self, evidence: &[ConditionEval], generation: u64) {
        self.evidence = evidence.to_vec();
        self.generation = generation;
    }

    pub fn clear(&mut self) {
        self.evidence.clear();
    }

    /// Whether `eval` duplicates the fired evidence at its own position
    pub fn contains(&self, eval: &ConditionEval) -> bool {
        self.evidence
            .get(eval.condition_set_index())
            .is_some_and(|fired| is_duplicate(fired, eval))
    }

    /// Generation that fired, if any firing is recorded
    pub fn generation(&self) -> Option<u64> {
        (!self.evidence.is_empty()).then_some(self.generation)
    }
}
