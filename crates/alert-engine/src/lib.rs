//! Alert engine library
//!
//! Condition evaluation and condition-set correlation for the alerting engine:
//! - [`Evaluator`] turns a condition and a data point into a [`ConditionEval`]
//! - [`Correlator`] combines a trigger's evaluations into a [`Verdict`]
//! - [`AlertsEngine`] routes data points to registered triggers
//!
//! # Features
//!
//! - `metrics`: emit evaluation, verdict, duplicate and stale evidence counters

pub mod clock;
pub mod condition_eval;
pub mod correlator;
pub mod dedup;
pub mod engine;
pub mod evaluator;
pub mod evaluators;
pub mod sweeper;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition_eval::{ConditionEval, EvalDetail};
pub use correlator::{CorrelationSnapshot, Correlator, TriggerKey, Verdict};
pub use engine::{AlertsEngine, DataOutcome, Rejection};
pub use evaluator::Evaluator;
pub use sweeper::spawn_sweeper;
