//! Condition evaluation results
//!
//! A `ConditionEval` records the outcome of matching one data point against
//! one condition. The kind-specific part lives in [`EvalDetail`], a tagged
//! variant over the concrete evaluators, while match flag, timestamps and
//! context are shared by every kind.
//!
//! # Serialized Form
//!
//! ```json
//! {
//!   "match": true,
//!   "evalTimestamp": 1700000000123,
//!   "dataTimestamp": 100,
//!   "context": { "host": "db-1" },
//!   "type": "THRESHOLD",
//!   "condition": { "tenantId": "acme", "triggerId": "cpu-high", ... },
//!   "value": 95.0
//! }
//! ```
//!
//! Empty or absent fields are omitted. Deserialization is the only way to
//! build an evaluation other than running an evaluator; there are no setters.

use serde::{Deserialize, Serialize};
use shared::models::{
    Condition, ConditionIdentity, ConditionKind, ConditionSpec, Data, TriggerMode,
};
use std::collections::BTreeMap;
use std::fmt;

use crate::evaluators::{
    AvailabilityConditionEval, CompareConditionEval, RangeConditionEval, RateConditionEval,
    StringConditionEval, ThresholdConditionEval,
};

/// Kind-specific payload of an evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvalDetail {
    Threshold(ThresholdConditionEval),
    Range(RangeConditionEval),
    Rate(RateConditionEval),
    String(StringConditionEval),
    Availability(AvailabilityConditionEval),
    Compare(CompareConditionEval),
}

impl EvalDetail {
    pub fn kind(&self) -> ConditionKind {
        match self {
            EvalDetail::Threshold(_) => ConditionKind::Threshold,
            EvalDetail::Range(_) => ConditionKind::Range,
            EvalDetail::Rate(_) => ConditionKind::Rate,
            EvalDetail::String(_) => ConditionKind::String,
            EvalDetail::Availability(_) => ConditionKind::Availability,
            EvalDetail::Compare(_) => ConditionKind::Compare,
        }
    }

    /// Identity of the evaluated condition
    pub fn identity(&self) -> &ConditionIdentity {
        match self {
            EvalDetail::Threshold(e) => e.condition().identity(),
            EvalDetail::Range(e) => e.condition().identity(),
            EvalDetail::Rate(e) => e.condition().identity(),
            EvalDetail::String(e) => e.condition().identity(),
            EvalDetail::Availability(e) => e.condition().identity(),
            EvalDetail::Compare(e) => e.condition().identity(),
        }
    }

    /// Whether this evaluation was produced by exactly `condition`
    pub fn evaluated(&self, condition: &Condition) -> bool {
        match (self, condition) {
            (EvalDetail::Threshold(e), Condition::Threshold(c)) => e.condition() == c,
            (EvalDetail::Range(e), Condition::Range(c)) => e.condition() == c,
            (EvalDetail::Rate(e), Condition::Rate(c)) => e.condition() == c,
            (EvalDetail::String(e), Condition::String(c)) => e.condition() == c,
            (EvalDetail::Availability(e), Condition::Availability(c)) => e.condition() == c,
            (EvalDetail::Compare(e), Condition::Compare(c)) => e.condition() == c,
            _ => false,
        }
    }

    /// Condition description with the compared value
    pub fn describe(&self) -> String {
        match self {
            EvalDetail::Threshold(e) => e.describe(),
            EvalDetail::Range(e) => e.describe(),
            EvalDetail::Rate(e) => e.describe(),
            EvalDetail::String(e) => e.describe(),
            EvalDetail::Availability(e) => e.describe(),
            EvalDetail::Compare(e) => e.describe(),
        }
    }
}

/// Outcome of one condition against one data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEval {
    #[serde(rename = "match")]
    matched: bool,
    eval_timestamp: i64,
    data_timestamp: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    context: BTreeMap<String, String>,
    #[serde(flatten)]
    detail: EvalDetail,
}

impl ConditionEval {
    pub(crate) fn new(matched: bool, eval_timestamp: i64, data: &Data, detail: EvalDetail) -> Self {
        Self {
            matched,
            eval_timestamp,
            data_timestamp: data.timestamp,
            context: data.context.clone(),
            detail,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    pub fn eval_timestamp(&self) -> i64 {
        self.eval_timestamp
    }

    pub fn data_timestamp(&self) -> i64 {
        self.data_timestamp
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn detail(&self) -> &EvalDetail {
        &self.detail
    }

    pub fn kind(&self) -> ConditionKind {
        self.detail.kind()
    }

    pub fn condition_identity(&self) -> &ConditionIdentity {
        self.detail.identity()
    }

    pub fn tenant_id(&self) -> &str {
        &self.condition_identity().tenant_id
    }

    pub fn trigger_id(&self) -> &str {
        &self.condition_identity().trigger_id
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        self.condition_identity().trigger_mode
    }

    pub fn condition_set_size(&self) -> usize {
        self.condition_identity().condition_set_size
    }

    pub fn condition_set_index(&self) -> usize {
        self.condition_identity().condition_set_index
    }

    pub fn condition_id(&self) -> String {
        self.condition_identity().condition_id()
    }

    /// Audit line: description, compared value, outcome and both timestamps
    pub fn log(&self) -> String {
        format!(
            "{}, match={}, evalTimestamp={}, dataTimestamp={}",
            self.detail.describe(),
            self.matched,
            self.eval_timestamp,
            self.data_timestamp
        )
    }
}

impl fmt::Display for ConditionEval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log())
    }
}
