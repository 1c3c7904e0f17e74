//! Concrete condition evaluators
//!
//! One evaluator per condition kind. Each binds a condition definition to the
//! data it was evaluated against and produces a [`ConditionEval`]:
//! - Threshold: numeric value against a threshold
//! - Range: numeric value inside/outside a range
//! - Rate: change per period between consecutive points
//! - String: string comparison or regular expression
//! - Availability: UP / DOWN / UNAVAILABLE
//! - Compare: two numeric series against each other
//!
//! [`ConditionEval`]: crate::ConditionEval

pub mod availability;
pub mod compare;
pub mod range;
pub mod rate;
pub mod string;
pub mod threshold;

pub use availability::AvailabilityConditionEval;
pub use compare::CompareConditionEval;
pub use range::RangeConditionEval;
pub use rate::RateConditionEval;
pub use string::StringConditionEval;
pub use threshold::ThresholdConditionEval;

use shared::models::ConditionSpec;
use shared::Result;

/// Reject conditions without identity or with invalid parameters
///
/// Identity is checked first so an unbound condition is always reported as such.
pub(crate) fn check_condition(condition: &impl ConditionSpec) -> Result<()> {
    condition.identity().validate()?;
    condition.validate()
}
