//! Availability condition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::condition::{ConditionIdentity, ConditionKind, ConditionSpec};

/// Availability reported by a data point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AvailabilityType {
    Up,
    Down,
    Unavailable,
}

impl fmt::Display for AvailabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityType::Up => write!(f, "UP"),
            AvailabilityType::Down => write!(f, "DOWN"),
            AvailabilityType::Unavailable => write!(f, "UNAVAILABLE"),
        }
    }
}

impl FromStr for AvailabilityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "UP" => Ok(AvailabilityType::Up),
            "DOWN" => Ok(AvailabilityType::Down),
            "UNAVAILABLE" => Ok(AvailabilityType::Unavailable),
            _ => anyhow::bail!("Invalid availability: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityOperator {
    Down,
    NotUp,
    Up,
}

impl fmt::Display for AvailabilityOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityOperator::Down => write!(f, "DOWN"),
            AvailabilityOperator::NotUp => write!(f, "NOT_UP"),
            AvailabilityOperator::Up => write!(f, "UP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityCondition {
    #[serde(flatten)]
    pub identity: ConditionIdentity,
    pub data_id: String,
    pub operator: AvailabilityOperator,
}

impl AvailabilityCondition {
    pub fn new(
        identity: ConditionIdentity,
        data_id: impl Into<String>,
        operator: AvailabilityOperator,
    ) -> Self {
        Self {
            identity,
            data_id: data_id.into(),
            operator,
        }
    }

    pub fn matches(&self, value: AvailabilityType) -> bool {
        match self.operator {
            AvailabilityOperator::Down => value == AvailabilityType::Down,
            AvailabilityOperator::NotUp => value != AvailabilityType::Up,
            AvailabilityOperator::Up => value == AvailabilityType::Up,
        }
    }

    pub fn log(&self, value: AvailabilityType) -> String {
        format!("Availability: {}[{}] is {}", self.data_id, value, self.operator)
    }
}

impl ConditionSpec for AvailabilityCondition {
    fn identity(&self) -> &ConditionIdentity {
        &self.identity
    }

    fn kind(&self) -> ConditionKind {
        ConditionKind::Availability
    }

    fn data_ids(&self) -> Vec<&str> {
        vec![self.data_id.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn availability(operator: AvailabilityOperator) -> AvailabilityCondition {
        AvailabilityCondition::new(ConditionIdentity::firing("acme", "t1", 1, 0), "web", operator)
    }

    #[test]
    fn test_down() {
        let c = availability(AvailabilityOperator::Down);
        assert!(c.matches(AvailabilityType::Down));
        assert!(!c.matches(AvailabilityType::Unavailable));
    }

    #[test]
    fn test_not_up_covers_unavailable() {
        let c = availability(AvailabilityOperator::NotUp);
        assert!(c.matches(AvailabilityType::Down));
        assert!(c.matches(AvailabilityType::Unavailable));
        assert!(!c.matches(AvailabilityType::Up));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("down".parse::<AvailabilityType>().unwrap(), AvailabilityType::Down);
        assert!("sideways".parse::<AvailabilityType>().is_err());
    }

    #[test]
    fn test_log_line() {
        let c = availability(AvailabilityOperator::NotUp);
        assert_eq!(c.log(AvailabilityType::Down), "Availability: web[DOWN] is NOT_UP");
    }
}
