//! Shared library for the alerting engine
//!
//! This crate provides common functionality used by the engine components:
//! - Condition definitions and data point models
//! - Error handling types
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{parse_duration, Config, EngineConfig};
pub use error::{Error, Result};

/// Initialize tracing subscriber for structured logging
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shared=debug,alert_engine=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
