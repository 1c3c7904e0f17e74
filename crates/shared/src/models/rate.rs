//! Rate-of-change condition
//!
//! Compares the change between two consecutive data points of the same series,
//! normalised to a period, against a threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::condition::{ensure_finite, ConditionIdentity, ConditionKind, ConditionSpec};
use super::ThresholdOperator;
use crate::error::Result;

/// Direction of change the condition watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateDirection {
    Decreasing,
    Increasing,
    /// Signed change, no direction filter
    Na,
}

impl fmt::Display for RateDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDirection::Decreasing => write!(f, "decreasing"),
            RateDirection::Increasing => write!(f, "increasing"),
            RateDirection::Na => write!(f, "changing"),
        }
    }
}

/// Period the rate is normalised to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RatePeriod {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl RatePeriod {
    pub fn millis(&self) -> i64 {
        match self {
            RatePeriod::Second => 1_000,
            RatePeriod::Minute => 60_000,
            RatePeriod::Hour => 3_600_000,
            RatePeriod::Day => 86_400_000,
            RatePeriod::Week => 604_800_000,
        }
    }
}

impl fmt::Display for RatePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RatePeriod::Second => "second",
            RatePeriod::Minute => "minute",
            RatePeriod::Hour => "hour",
            RatePeriod::Day => "day",
            RatePeriod::Week => "week",
        };
        write!(f, "{}", s)
    }
}

/// `rate(previous, current) <operator> threshold`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub direction: RateDirection,
    pub period: RatePeriod,
    pub operator: ThresholdOperator,
    pub threshold: f64,
}

impl RateCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        direction: RateDirection,
        period: RatePeriod,
        operator: ThresholdOperator,
        threshold: f64,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            direction,
            period,
            operator,
            threshold,
        }
    }

    /// Change per period between two points; `time` must be after `previous_time`
    ///
    /// Returns `None` when the time span overflows or the rate is not finite.
    pub fn rate(
        &self,
        previous_time: i64,
        previous_value: f64,
        time: i64,
        value: f64,
    ) -> Option<f64> {
        let delta_time = time.checked_sub(previous_time)? as f64;
        let delta_value = match self.direction {
            RateDirection::Decreasing => previous_value - value,
            RateDirection::Increasing | RateDirection::Na => value - previous_value,
        };

        let rate = delta_value / delta_time * self.period.millis() as f64;
        rate.is_finite().then_some(rate)
    }

    /// A directional rate below zero is movement the other way and never matches
    pub fn matches(&self, rate: f64) -> bool {
        if self.direction != RateDirection::Na && rate < 0.0 {
            return false;
        }
        self.operator.apply(rate, self.threshold)
    }

    pub fn log(&self, rate: f64) -> String {
        format!(
            "Rate: {}[{}] {} per {} {} {}",
            self.data_id, rate, self.direction, self.period, self.operator, self.threshold
        )
    }
}

impl ConditionSpec for RateCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::Rate
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str()]
    }

    fn validate(&self) -> Result<()> {
        ensure_finite("threshold", self.threshold, &self.identity)
    }
}
