//! Configuration management using environment variables
//!
//! Environment variables:
//! - `ALERTS_CORRELATION_WINDOW`: default correlation window for triggers
//!   without an explicit window (default: `5m`)
//! - `ALERTS_SWEEP_INTERVAL`: interval between active expiry sweeps (default: `30s`)
//! - `ALERTS_DEDUP_ENABLED`: discard duplicate evidence (default: `true`)
//!
//! Durations use the `10s` / `5m` / `1h` / `7d` format.

use crate::error::{Error, Result};
use chrono::Duration;
use std::env;

/// Default correlation window
const DEFAULT_CORRELATION_WINDOW: &str = "5m";

/// Default interval between expiry sweeps
const DEFAULT_SWEEP_INTERVAL: &str = "30s";

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Engine configuration
    pub engine: EngineConfig,
}

/// Condition evaluation and correlation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Correlation window applied to triggers without their own window
    pub correlation_window: Duration,

    /// Interval between active expiry sweeps
    pub sweep_interval: Duration,

    /// Whether duplicate evidence is discarded
    pub dedup_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            correlation_window: Duration::minutes(5),
            sweep_interval: Duration::seconds(30),
            dedup_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Sweep interval as a std duration, for tokio timers
    pub fn sweep_interval_std(&self) -> std::time::Duration {
        self.sweep_interval
            .to_std()
            .unwrap_or_else(|_| std::time::Duration::from_secs(30))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let correlation_window = lookup("ALERTS_CORRELATION_WINDOW")
            .unwrap_or_else(|| DEFAULT_CORRELATION_WINDOW.to_string());
        let correlation_window = parse_duration(&correlation_window)
            .map_err(|e| Error::config(format!("Invalid ALERTS_CORRELATION_WINDOW: {}", e)))?;

        let sweep_interval = lookup("ALERTS_SWEEP_INTERVAL")
            .unwrap_or_else(|| DEFAULT_SWEEP_INTERVAL.to_string());
        let sweep_interval = parse_duration(&sweep_interval)
            .map_err(|e| Error::config(format!("Invalid ALERTS_SWEEP_INTERVAL: {}", e)))?;

        let dedup_enabled = lookup("ALERTS_DEDUP_ENABLED")
            .unwrap_or_else(|| "true".to_string())
            .parse()
            .map_err(|e| Error::config(format!("Invalid ALERTS_DEDUP_ENABLED: {}", e)))?;

        tracing::debug!(
            correlation_window_secs = correlation_window.num_seconds(),
            sweep_interval_secs = sweep_interval.num_seconds(),
            dedup_enabled = dedup_enabled,
            "Loaded engine configuration"
        );

        Ok(Self {
            engine: EngineConfig {
                correlation_window,
                sweep_interval,
                dedup_enabled,
            },
        })
    }
}

/// Parse duration string into chrono::Duration
///
/// Supported formats:
/// - "10s" - 10 seconds
/// - "5m" - 5 minutes
/// - "1h" - 1 hour
/// - "7d" - 7 days
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::validation("Duration string is empty"));
    }

    let unit_len = s.chars().last().map_or(0, char::len_utf8);
    let (num_str, unit) = s.split_at(s.len() - unit_len);
    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::validation(format!("Invalid number in duration: {}", num_str)))?;

    if num <= 0 {
        return Err(Error::validation("Duration must be positive"));
    }

    let duration = match unit {
        "s" => Duration::try_seconds(num),
        "m" => Duration::try_minutes(num),
        "h" => Duration::try_hours(num),
        "d" => Duration::try_days(num),
        _ => {
            return Err(Error::validation(format!(
                "Invalid time unit: {} (expected s, m, h, d)",
                unit
            )))
        }
    };

    duration.ok_or_else(|| Error::validation(format!("Duration out of range: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    // ========================================================================
    // parse_duration tests
    // ========================================================================

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration("30s").unwrap().num_seconds(), 30);
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration("15m").unwrap().num_minutes(), 15);
    }

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("2h").unwrap().num_hours(), 2);
    }

    #[test]
    fn test_parse_duration_days() {
        assert_eq!(parse_duration("7d").unwrap().num_days(), 7);
    }

    #[test]
    fn test_parse_duration_invalid_unit() {
        let result = parse_duration("10x");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid time unit"));
    }

    #[test]
    fn test_parse_duration_zero() {
        let result = parse_duration("0s");
        assert!(result.unwrap_err().to_string().contains("positive"));
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        let result = parse_duration("9999999999999999d");
        assert!(result.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5m").is_err());
    }

    // ========================================================================
    // Config loading tests
    // ========================================================================

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("ALERTS_CORRELATION_WINDOW", "10s"),
            ("ALERTS_SWEEP_INTERVAL", "1m"),
            ("ALERTS_DEDUP_ENABLED", "false"),
        ]))
        .unwrap();

        assert_eq!(config.engine.correlation_window, Duration::seconds(10));
        assert_eq!(config.engine.sweep_interval, Duration::minutes(1));
        assert!(!config.engine.dedup_enabled);
        assert_eq!(
            config.engine.sweep_interval_std(),
            std::time::Duration::from_secs(60)
        );
    }

    #[test]
    fn test_invalid_window_is_config_error() {
        let err = Config::from_lookup(lookup_from(&[("ALERTS_CORRELATION_WINDOW", "soon")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("ALERTS_CORRELATION_WINDOW"));
    }

    #[test]
    fn test_out_of_range_window_is_config_error() {
        let err = Config::from_lookup(lookup_from(&[(
            "ALERTS_CORRELATION_WINDOW",
            "9999999999999999d",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_dedup_flag_is_config_error() {
        let err =
            Config::from_lookup(lookup_from(&[("ALERTS_DEDUP_ENABLED", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
