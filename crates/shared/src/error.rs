//! Error types for the alerting engine

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Debug, Error)]
pub enum Error {
    /// Data point value incompatible with the condition kind
    #[error("Invalid data for {data_id}: {reason}")]
    InvalidData { data_id: String, reason: String },

    /// Condition definition missing tenant/trigger identity or set position
    #[error("Unbound condition: {0}")]
    UnboundCondition(String),

    /// Evidence produced before its trigger's correlation state was invalidated
    #[error("Stale evidence for trigger {trigger_id}: {reason}")]
    StaleEvidence { trigger_id: String, reason: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an InvalidData error
    pub fn invalid_data(data_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            data_id: data_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnboundCondition error
    pub fn unbound(msg: impl Into<String>) -> Self {
        Self::UnboundCondition(msg.into())
    }

    /// Create a StaleEvidence error
    pub fn stale(trigger_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StaleEvidence {
            trigger_id: trigger_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a Validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a Config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
