//! String evaluator

use serde::{Deserialize, Serialize};
use shared::models::{Data, StringCondition};
use shared::Result;

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringConditionEval {
    condition: StringCondition,
    value: String,
}

impl StringConditionEval {
    /// # Errors
    ///
    /// `UnboundCondition`, or `Validation` for an invalid `MATCH` pattern.
    pub fn evaluate(
        condition: &StringCondition,
        data: &Data,
        eval_timestamp: i64,
    ) -> Result<ConditionEval> {
        check_condition(condition)?;
        let matched = condition.matches(&data.value)?;

        Ok(ConditionEval::new(
            matched,
            eval_timestamp,
            data,
            EvalDetail::String(Self {
                condition: condition.clone(),
                value: data.value.clone(),
            }),
        ))
    }

    pub fn condition(&self) -> &StringCondition {
        &self.condition
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ConditionIdentity, StringOperator};

    #[test]
    fn test_string_match_keeps_raw_value() {
        let c = StringCondition::new(
            ConditionIdentity::firing("acme", "T", 1, 0),
            "status",
            StringOperator::Contains,
            "timeout",
            true,
        );

        let data = Data::new("status", 5, "Gateway TIMEOUT");
        let eval = StringConditionEval::evaluate(&c, &data, 1).unwrap();

        assert!(eval.is_match());
        match eval.detail() {
            EvalDetail::String(s) => assert_eq!(s.value(), "Gateway TIMEOUT"),
            other => panic!("unexpected detail: {:?}", other),
        }
    }
}
