//! Threshold evaluator

use serde::{Deserialize, Serialize};
use shared::models::{Data, ThresholdCondition};
use shared::Result;

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

/// Threshold condition bound to the value it was compared with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdConditionEval {
    condition: ThresholdCondition,
    value: f64,
}

impl ThresholdConditionEval {
    /// Evaluate `data` against `condition`
    ///
    /// # Errors
    ///
    /// - `UnboundCondition` if the condition has no tenant/trigger identity
    /// - `InvalidData` if the value is not a finite number
    pub fn evaluate(
        condition: &ThresholdCondition,
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
            EvalDetail::Threshold(Self {
                condition: condition.clone(),
                value,
            }),
        ))
    }

    pub fn condition(&self) -> &ThresholdCondition {
        &self.condition
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ConditionIdentity, ThresholdOperator};
    use shared::Error;

    fn condition(identity: ConditionIdentity) -> ThresholdCondition {
        ThresholdCondition::new(identity, "cpu", ThresholdOperator::Gt, 90.0)
    }

    #[test]
    fn test_match_above_threshold() {
        let c = condition(ConditionIdentity::firing("acme", "T", 1, 0));
        let data = Data::numeric("cpu", 100, 95.0);
        let eval = ThresholdConditionEval::evaluate(&c, &data, 1).unwrap();

        assert!(eval.is_match());
        assert_eq!(eval.data_timestamp(), 100);
        match eval.detail() {
            EvalDetail::Threshold(t) => {
                assert_eq!(t.value(), 95.0);
                assert_eq!(t.condition(), &c);
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_no_match_below_threshold() {
        let c = condition(ConditionIdentity::firing("acme", "T", 1, 0));
        let data = Data::numeric("cpu", 100, 42.0);
        let eval = ThresholdConditionEval::evaluate(&c, &data, 1).unwrap();
        assert!(!eval.is_match());
    }

    #[test]
    fn test_non_numeric_is_invalid_data() {
        let c = condition(ConditionIdentity::firing("acme", "T", 1, 0));
        let data = Data::new("cpu", 100, "high");
        let err = ThresholdConditionEval::evaluate(&c, &data, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn test_missing_tenant_is_unbound() {
        let c = condition(ConditionIdentity::firing("", "T", 1, 0));
        // Identity is checked before the value
        let data = Data::new("cpu", 100, "high");
        let err = ThresholdConditionEval::evaluate(&c, &data, 1).unwrap_err();
        assert!(matches!(err, Error::UnboundCondition(_)));
    }

    #[test]
    fn test_nan_threshold_is_rejected() {
        let mut c = condition(ConditionIdentity::firing("acme", "T", 1, 0));
        c.threshold = f64::NAN;
        let data = Data::numeric("cpu", 100, 1.0);
        let err = ThresholdConditionEval::evaluate(&c, &data, 1).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
