//! Timestamped data points fed to the engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AvailabilityType;
use crate::error::{Error, Result};

/// One observation of a data series
///
/// `timestamp` is epoch milliseconds. The value is kept as delivered and
/// coerced per condition kind at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub id: String,
    pub timestamp: i64,
    pub value: String,
    /// Opaque audit context, carried into evaluations untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Data {
    pub fn new(id: impl Into<String>, timestamp: i64, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            value: value.into(),
            context: BTreeMap::new(),
        }
    }

    /// Numeric data point
    pub fn numeric(id: impl Into<String>, timestamp: i64, value: f64) -> Self {
        Self::new(id, timestamp, value.to_string())
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Value as a finite number
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the value does not parse or is NaN/infinite.
    pub fn numeric_value(&self) -> Result<f64> {
        let value: f64 = self.value.trim().parse().map_err(|_| {
            Error::invalid_data(&self.id, format!("value '{}' is not numeric", self.value))
        })?;

        if !value.is_finite() {
            return Err(Error::invalid_data(
                &self.id,
                format!("value '{}' is not a finite number", self.value),
            ));
        }

        Ok(value)
    }

    /// Value as an availability
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` unless the value is UP, DOWN or UNAVAILABLE.
    pub fn availability_value(&self) -> Result<AvailabilityType> {
        self.value.parse().map_err(|_| {
            Error::invalid_data(
                &self.id,
                format!("value '{}' is not an availability", self.value),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_value() {
        assert_eq!(Data::new("cpu", 1, " 95.5 ").numeric_value().unwrap(), 95.5);
        assert_eq!(Data::numeric("cpu", 1, 95.0).numeric_value().unwrap(), 95.0);
    }

    #[test]
    fn test_non_numeric_value_is_invalid_data() {
        let err = Data::new("cpu", 1, "high").numeric_value().unwrap_err();
        assert!(matches!(err, Error::InvalidData { ref data_id, .. } if data_id == "cpu"));
    }

    #[test]
    fn test_nan_is_invalid_data() {
        assert!(Data::new("cpu", 1, "NaN").numeric_value().is_err());
        assert!(Data::new("cpu", 1, "inf").numeric_value().is_err());
    }

    #[test]
    fn test_availability_value() {
        assert_eq!(
            Data::new("web", 1, "up").availability_value().unwrap(),
            AvailabilityType::Up
        );
        assert!(Data::new("web", 1, "1").availability_value().is_err());
    }

    #[test]
    fn test_empty_context_is_omitted() {
        let json = serde_json::to_value(Data::new("cpu", 1, "1")).unwrap();
        assert!(json.get("context").is_none());

        let with_context = Data::new("cpu", 1, "1").with_context("host", "db-1");
        let json = serde_json::to_value(&with_context).unwrap();
        assert_eq!(json["context"]["host"], "db-1");
    }
}
