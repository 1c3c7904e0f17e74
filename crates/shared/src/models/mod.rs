//! Condition definitions and data points consumed by the engine
//!
//! Definitions are authored and stored elsewhere; the engine only needs their
//! identity, their comparison rule and their audit rendering.

pub mod availability;
pub mod compare;
pub mod condition;
pub mod data;
pub mod range;
pub mod rate;
pub mod string;
pub mod threshold;

pub use availability::{AvailabilityCondition, AvailabilityOperator, AvailabilityType};
pub use compare::CompareCondition;
pub use condition::{Condition, ConditionIdentity, ConditionKind, ConditionSpec, TriggerMode};
pub use data::Data;
pub use range::{RangeOperator, ThresholdRangeCondition};
pub use rate::{RateCondition, RateDirection, RatePeriod};
pub use string::{StringCondition, StringOperator};
pub use threshold::{ThresholdCondition, ThresholdOperator};
