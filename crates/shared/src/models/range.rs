//! Numeric range condition

use serde::{Deserialize, Serialize};

use super::condition::{ensure_finite, ConditionIdentity, ConditionKind, ConditionSpec};
use crate::error::{Error, Result};

/// Whether a range bound includes its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RangeOperator {
    Inclusive,
    Exclusive,
}

/// Value inside (or outside, when `in_range` is false) `[low, high]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRangeCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub operator_low: RangeOperator,
    pub operator_high: RangeOperator,
    pub threshold_low: f64,
    pub threshold_high: f64,
    pub in_range: bool,
}

impl ThresholdRangeCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        operator_low: RangeOperator,
        operator_high: RangeOperator,
        threshold_low: f64,
        threshold_high: f64,
        in_range: bool,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            operator_low,
            operator_high,
            threshold_low,
            threshold_high,
            in_range,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        let above_low = match self.operator_low {
            RangeOperator::Inclusive => value >= self.threshold_low,
            RangeOperator::Exclusive => value > self.threshold_low,
        };
        let below_high = match self.operator_high {
            RangeOperator::Inclusive => value <= self.threshold_high,
            RangeOperator::Exclusive => value < self.threshold_high,
        };

        (above_low && below_high) == self.in_range
    }

    pub fn log(&self, value: f64) -> String {
        let open = match self.operator_low {
            RangeOperator::Inclusive => "[",
            RangeOperator::Exclusive => "(",
        };
        let close = match self.operator_high {
            RangeOperator::Inclusive => "]",
            RangeOperator::Exclusive => ")",
        };
        format!(
            "Range: {}[{}] {} {}{}, {}{}",
            self.data_id,
            value,
            if self.in_range { "in" } else { "not in" },
            open,
            self.threshold_low,
            self.threshold_high,
            close
        )
    }
}

impl ConditionSpec for ThresholdRangeCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::Range
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str()]
    }

    fn validate(&self) -> Result<()> {
        ensure_finite("thresholdLow", self.threshold_low, &self.identity)?;
        ensure_finite("thresholdHigh", self.threshold_high, &self.identity)?;
        if self.threshold_low > self.threshold_high {
            return Err(Error::validation(format!(
                "condition {} has thresholdLow {} above thresholdHigh {}",
                self.identity.condition_id(),
                self.threshold_low,
                self.threshold_high
            )));
        }
        Ok(())
    }
}
