//! Two-series compare condition

use serde::{Deserialize, Serialize};

use super::condition::{ensure_finite, ConditionIdentity, ConditionKind, ConditionSpec};
use super::ThresholdOperator;
use crate::error::Result;

/// `value1 <operator> value2 * data2_multiplier`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub operator: ThresholdOperator,
    pub data2_id: String,
    pub data2_multiplier: f64,
}

impl CompareCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        operator: ThresholdOperator,
        data2_id: impl Into<String>,
        data2_multiplier: f64,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            operator,
            data2_id: data2_id.into(),
            data2_multiplier,
        }
    }

    pub fn matches(&self, value1: f64, value2: f64) -> bool {
        self.operator.apply(value1, value2 * self.data2_multiplier)
    }

    pub fn log(&self, value1: f64, value2: f64) -> String {
        format!(
            "Compare: {}[{}] {} {}*{}[{}]",
            self.data_id, value1, self.operator, self.data2_multiplier, self.data2_id, value2
        )
    }
}

impl ConditionSpec for CompareCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::Compare
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str(), self.data2_id.as_str()]
    }

    fn validate(&self) -> Result<()> {
        ensure_finite("data2Multiplier", self.data2_multiplier, &self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(operator: ThresholdOperator, multiplier: f64) -> CompareCondition {
        CompareCondition::new(
            ConditionIdentity::firing("acme", "t1", 1, 0),
            "heap.used",
            operator,
            "heap.max",
            multiplier,
        )
    }

    #[test]
    fn test_compare_with_multiplier() {
        let c = compare(ThresholdOperator::Gt, 0.8);
        assert!(c.matches(900.0, 1000.0));
        assert!(!c.matches(700.0, 1000.0));
    }

    #[test]
    fn test_reads_both_series() {
        let c = compare(ThresholdOperator::Lt, 1.0);
        assert_eq!(c.data_ids(), vec!["heap.used", "heap.max"]);
    }

    #[test]
    fn test_log_line() {
        let c = compare(ThresholdOperator::Gt, 0.8);
        assert_eq!(
            c.log(900.0, 1000.0),
            "Compare: heap.used[900] > 0.8*heap.max[1000]"
        );
    }
}
