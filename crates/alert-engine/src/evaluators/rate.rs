//! Rate-of-change evaluator
//!
//! Needs the previous point of the same series. The engine facade keeps the
//! latest point per data id; callers driving the evaluator directly supply it.

use serde::{Deserialize, Serialize};
use shared::models::{Data, RateCondition};
use shared::{Error, Result};

use super::check_condition;
use crate::condition_eval::{ConditionEval, EvalDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateConditionEval {
    condition: RateCondition,
    time: i64,
    value: f64,
    previous_time: i64,
    previous_value: f64,
    rate: f64,
}

impl RateConditionEval {
    /// Evaluate the change from `previous` to `data`
    ///
    /// # Errors
    ///
    /// - `UnboundCondition` if the condition has no identity
    /// - `InvalidData` if either value is not numeric, `previous` belongs to
    ///   another series, `previous` is not strictly older than `data`, or
    ///   the resulting rate is not a finite number
    pub fn evaluate(
        condition: &RateCondition,
        data: &Data,
        previous: &Data,
        eval_timestamp: i64,
    ) -> Result<ConditionEval> {
        check_condition(condition)?;

        if previous.id != data.id {
            return Err(Error::invalid_data(
                &data.id,
                format!("previous point belongs to series {}", previous.id),
            ));
        }
        if previous.timestamp >= data.timestamp {
            return Err(Error::invalid_data(
                &data.id,
                format!(
                    "previous point at {} is not before point at {}",
                    previous.timestamp, data.timestamp
                ),
            ));
        }

        let value = data.numeric_value()?;
        let previous_value = previous.numeric_value()?;
        let rate = condition
            .rate(previous.timestamp, previous_value, data.timestamp, value)
            .ok_or_else(|| {
                Error::invalid_data(
                    &data.id,
                    format!(
                        "rate from {} at {} to {} at {} is not a finite number",
                        previous_value, previous.timestamp, value, data.timestamp
                    ),
                )
            })?;
        let matched = condition.matches(rate);

        Ok(ConditionEval::new(
            matched,
            eval_timestamp,
            data,
            EvalDetail::Rate(Self {
                condition: condition.clone(),
                time: data.timestamp,
                value,
                previous_time: previous.timestamp,
                previous_value,
                rate,
            }),
        ))
    }

    pub fn condition(&self) -> &RateCondition {
        &self.condition
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn previous_time(&self) -> i64 {
        self.previous_time
    }

    pub fn previous_value(&self) -> f64 {
        self.previous_value
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub(crate) fn describe(&self) -> String {
        self.condition.log(self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ConditionIdentity, RateDirection, RatePeriod, ThresholdOperator};

    fn condition() -> RateCondition {
        RateCondition::new(
            ConditionIdentity::firing("acme", "T", 1, 0),
            "requests",
            RateDirection::Increasing,
            RatePeriod::Second,
            ThresholdOperator::Gte,
            10.0,
        )
    }

    #[test]
    fn test_rate_match() {
        let previous = Data::numeric("requests", 1_000, 100.0);
        let current = Data::numeric("requests", 3_000, 130.0);

        let eval = RateConditionEval::evaluate(&condition(), &current, &previous, 7).unwrap();

        assert!(eval.is_match());
        assert_eq!(eval.data_timestamp(), 3_000);
        match eval.detail() {
            EvalDetail::Rate(r) => {
                assert_eq!(r.rate(), 15.0);
                assert_eq!(r.previous_time(), 1_000);
                assert_eq!(r.previous_value(), 100.0);
                assert_eq!(r.time(), 3_000);
                assert_eq!(r.value(), 130.0);
            }
            other => panic!("unexpected detail: {:?}", other),
        }
    }

    #[test]
    fn test_previous_must_be_older() {
        let previous = Data::numeric("requests", 3_000, 100.0);
        let current = Data::numeric("requests", 3_000, 130.0);

        let err = RateConditionEval::evaluate(&condition(), &current, &previous, 7).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn test_unbounded_rate_is_invalid_data() {
        let c = RateCondition::new(
            ConditionIdentity::firing("acme", "T", 1, 0),
            "requests",
            RateDirection::Na,
            RatePeriod::Week,
            ThresholdOperator::Gt,
            0.0,
        );
        let previous = Data::numeric("requests", 0, -1e308);
        let current = Data::numeric("requests", 1, 1e308);

        let err = RateConditionEval::evaluate(&c, &current, &previous, 7).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
    }

    #[test]
    fn test_evaluation_round_trips_through_json() {
        let previous = Data::numeric("requests", 1_000, 100.0);
        let current = Data::numeric("requests", 3_000, 130.0);
        let eval = RateConditionEval::evaluate(&condition(), &current, &previous, 7).unwrap();

        let json = serde_json::to_string(&eval).unwrap();
        let back: ConditionEval = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eval);
    }

    #[test]
    fn test_previous_must_be_same_series() {
        let previous = Data::numeric("errors", 1_000, 100.0);
        let current = Data::numeric("requests", 3_000, 130.0);

        assert!(RateConditionEval::evaluate(&condition(), &current, &previous, 7).is_err());
    }
}
