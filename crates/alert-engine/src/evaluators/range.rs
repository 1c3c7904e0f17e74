//! Range evaluator

use serde::{Deserialize, Serialize};
use shared::models::{Data, ThresholdRangeCondition};
use shared::Result;

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeConditionEval {
    condition: ThresholdRangeCondition,
    value: f64,
}

impl RangeConditionEval {
    /// # Errors
    ///
    /// `UnboundCondition`, `Validation` for an inverted range, `InvalidData`
    /// for a non-numeric value.
    pub fn evaluate(
        condition: &ThresholdRangeCondition,
        data: &Data,
        eval_timestamp: i64,
    ) -> Result<ConditionEval> {
        check_condition(condition)?;
        let value = data.numeric_value()?;
        let matched = condition.matches(value);

        Ok(ConditionEval::new(
            matched,
            eval_timestamp,
            data,
            EvalDetail::Range(Self {
                condition: condition.clone(),
                value,
            }),
        ))
    }

    pub fn condition(&self) -> &ThresholdRangeCondition {
        &self.condition
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(self.value)
    }
}
