//! Compare evaluator
//!
//! The evaluation is anchored on the first series: its timestamp and context
//! become the evaluation's, the second series' context is kept as `context2`.

use serde::{Deserialize, Serialize};
use shared::models::{CompareCondition, Data};
use shared::{Error, Result};
use std::collections::BTreeMap;

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareConditionEval {
    condition: CompareCondition,
    value1: f64,
    value2: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    context2: BTreeMap<String, String>,
}

impl CompareConditionEval {
    /// Evaluate `data1` (series `data_id`) against `data2` (series `data2_id`)
    ///
    /// # Errors
    ///
    /// `UnboundCondition`, or `InvalidData` if either value is not numeric or
    /// either point belongs to the wrong series.
    pub fn evaluate(
        condition: &CompareCondition,
        data1: &Data,
        data2: &Data,
        eval_timestamp: i64,
    ) -> Result<ConditionEval> {
        check_condition(condition)?;

        if data1.id != condition.data_id {
            return Err(Error::invalid_data(
                &data1.id,
                format!("expected a point of series {}", condition.data_id),
            ));
        }
        if data2.id != condition.data2_id {
            return Err(Error::invalid_data(
                &data2.id,
                format!("expected a point of series {}", condition.data2_id),
            ));
        }

        let value1 = data1.numeric_value()?;
        let value2 = data2.numeric_value()?;
        let matched = condition.matches(value1, value2);

        Ok(ConditionEval::new(
            matched,
            eval_timestamp,
            data1,
            EvalDetail::Compare(Self {
                condition: condition.clone(),
                value1,
                value2,
                context2: data2.context.clone(),
            }),
        ))
    }

    pub fn condition(&self) -> &CompareCondition {
        &self.condition
    }

    pub fn value1(&self) -> f64 {
        self.value1
    }

    pub fn value2(&self) -> f64 {
        self.value2
    }

    pub fn context2(&self) -> &BTreeMap<String, String> {
        &self.context2
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(self.value1, self.value2)
    }
}
