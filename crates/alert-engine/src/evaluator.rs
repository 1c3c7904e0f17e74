//! Evaluation entry point
//!
//! Dispatches a [`Condition`] to its concrete evaluator and stamps the result
//! with the engine clock. Evaluation has no side effects besides logging and
//! the optional metrics counters.

use shared::models::{Condition, ConditionSpec, Data};
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::condition_eval::ConditionEval;
use crate::evaluators::{
    AvailabilityConditionEval, CompareConditionEval, RangeConditionEval, RateConditionEval,
    StringConditionEval, ThresholdConditionEval,
};

/// Stateless evaluator bound to an engine clock
#[derive(Clone)]
pub struct Evaluator {
    clock: Arc<dyn Clock>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Evaluator stamping results with wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Evaluate a single-point condition
    ///
    /// RATE and COMPARE conditions need a related point and must go through
    /// [`Evaluator::evaluate_with`].
    ///
    /// # Errors
    ///
    /// - `UnboundCondition` if the condition has no identity
    /// - `InvalidData` if the value does not fit the condition kind, or the
    ///   condition needs a related point
    pub fn evaluate(&self, condition: &Condition, data: &Data) -> Result<ConditionEval> {
        self.evaluate_with(condition, data, None)
    }

    /// Evaluate a condition, with `related` as the previous point of the same
    /// series (RATE) or the latest point of the second series (COMPARE)
    ///
    /// `related` is ignored by the single-point kinds.
    pub fn evaluate_with(
        &self,
        condition: &Condition,
        data: &Data,
        related: Option<&Data>,
    ) -> Result<ConditionEval> {
        let eval_timestamp = self.clock.now_millis();

        let result = match condition {
            Condition::Threshold(c) => ThresholdConditionEval::evaluate(c, data, eval_timestamp),
            Condition::Range(c) => RangeConditionEval::evaluate(c, data, eval_timestamp),
            Condition::String(c) => StringConditionEval::evaluate(c, data, eval_timestamp),
            Condition::Availability(c) => {
                AvailabilityConditionEval::evaluate(c, data, eval_timestamp)
            }
            Condition::Rate(c) => {
                let previous = related.ok_or_else(|| {
                    Error::invalid_data(&data.id, "rate condition needs the previous point")
                })?;
                RateConditionEval::evaluate(c, data, previous, eval_timestamp)
            }
            Condition::Compare(c) => {
                let data2 = related.ok_or_else(|| {
                    Error::invalid_data(
                        &data.id,
                        format!("compare condition needs a point of {}", c.data2_id),
                    )
                })?;
                CompareConditionEval::evaluate(c, data, data2, eval_timestamp)
            }
        };

        record(condition, &result);
        result
    }
}

fn record(condition: &Condition, result: &Result<ConditionEval>) {
    match result {
        Ok(eval) => {
            trace!(
                condition_id = %condition.condition_id(),
                matched = eval.is_match(),
                "{}",
                eval.log()
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "alert_engine.evaluations",
                "kind" => condition.kind().to_string(),
                "match" => eval.is_match().to_string()
            )
            .increment(1);
        }
        Err(e) => {
            debug!(
                condition_id = %condition.condition_id(),
                error = %e,
                "Evaluation rejected"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "alert_engine.evaluations",
                "kind" => condition.kind().to_string(),
                "match" => "error"
            )
            .increment(1);
        }
    }
}
