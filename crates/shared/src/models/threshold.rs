//! Numeric threshold condition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::condition::{ensure_finite, ConditionIdentity, ConditionKind, ConditionSpec};
use crate::error::Result;

/// Comparison operator for numeric conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThresholdOperator {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl ThresholdOperator {
    /// Apply `lhs <op> rhs`
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            ThresholdOperator::Lt => lhs < rhs,
            ThresholdOperator::Lte => lhs <= rhs,
            ThresholdOperator::Gt => lhs > rhs,
            ThresholdOperator::Gte => lhs >= rhs,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ThresholdOperator::Lt => "<",
            ThresholdOperator::Lte => "<=",
            ThresholdOperator::Gt => ">",
            ThresholdOperator::Gte => ">=",
        }
    }
}

impl fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for ThresholdOperator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "<" | "LT" => Ok(ThresholdOperator::Lt),
            "<=" | "LTE" => Ok(ThresholdOperator::Lte),
            ">" | "GT" => Ok(ThresholdOperator::Gt),
            ">=" | "GTE" => Ok(ThresholdOperator::Gte),
            _ => anyhow::bail!("Invalid threshold operator: {}", s),
        }
    }
}

/// `value <operator> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub operator: ThresholdOperator,
    pub threshold: f64,
}

impl ThresholdCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        operator: ThresholdOperator,
        threshold: f64,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            operator,
            threshold,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        self.operator.apply(value, self.threshold)
    }

    /// Audit description of this condition applied to `value`
    pub fn log(&self, value: f64) -> String {
        format!(
            "Threshold: {}[{}] {} {}",
            self.data_id, value, self.operator, self.threshold
        )
    }
}

impl ConditionSpec for ThresholdCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::Threshold
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str()]
    }

    fn validate(&self) -> Result<()> {
        ensure_finite("threshold", self.threshold, &self.identity)
    }
}
