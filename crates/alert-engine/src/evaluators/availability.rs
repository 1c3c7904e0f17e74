//! Availability evaluator

use serde::{Deserialize, Serialize};
use shared::models::{AvailabilityCondition, AvailabilityType, Data};
use shared::Result;

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityConditionEval {
    condition: AvailabilityCondition,
    value: AvailabilityType,
}

impl AvailabilityConditionEval {
    /// # Errors
    ///
    /// `UnboundCondition`, or `InvalidData` unless the value is UP, DOWN or
    /// UNAVAILABLE.
    pub fn evaluate(
        condition: &AvailabilityCondition,
        data: &Data,
        eval_timestamp: i64,
    ) -> Result<ConditionEval> {
        check_condition(condition)?;
        let value = data.availability_value()?;
        let matched = condition.matches(value);

        Ok(ConditionEval::new(
            matched,
            eval_timestamp,
            data,
            EvalDetail::Availability(Self {
                condition: condition.clone(),
                value,
            }),
        ))
    }

    pub fn condition(&self) -> &AvailabilityCondition {
        &self.condition
    }

    pub fn value(&self) -> AvailabilityType {
        self.value
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(self.value)
    }
}
