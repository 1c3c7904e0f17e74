//! Condition identity, kinds and the polymorphic condition definition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{
    AvailabilityCondition, CompareCondition, RateCondition, StringCondition, ThresholdCondition,
    ThresholdRangeCondition,
};
use crate::error::{Error, Result};

/// Supported condition kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    Threshold,
    Range,
    Rate,
    String,
    Availability,
    Compare,
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionKind::Threshold => "THRESHOLD",
            ConditionKind::Range => "RANGE",
            ConditionKind::Rate => "RATE",
            ConditionKind::String => "STRING",
            ConditionKind::Availability => "AVAILABILITY",
            ConditionKind::Compare => "COMPARE",
        };
        write!(f, "{}", s)
    }
}

/// Which of a trigger's condition sets a condition belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerMode {
    /// Conditions that fire the trigger
    #[default]
    #[serde(rename = "FIRING")]
    Firing,
    /// Conditions that resolve a fired trigger
    #[serde(rename = "AUTORESOLVE")]
    AutoResolve,
}

impl TriggerMode {
    pub const ALL: [TriggerMode; 2] = [TriggerMode::Firing, TriggerMode::AutoResolve];
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Firing => write!(f, "FIRING"),
            TriggerMode::AutoResolve => write!(f, "AUTORESOLVE"),
        }
    }
}

impl FromStr for TriggerMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FIRING" => Ok(TriggerMode::Firing),
            "AUTORESOLVE" | "AUTO_RESOLVE" => Ok(TriggerMode::AutoResolve),
            _ => anyhow::bail!("Invalid trigger mode: {}", s),
        }
    }
}

/// Owning trigger and fixed position of a condition within its condition set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionIdentity {
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub trigger_mode: TriggerMode,
    pub condition_set_size: usize,
    pub condition_set_index: usize,
}

impl ConditionIdentity {
    pub fn new(
        tenant_id: impl Into<String>,
        trigger_id: impl Into<String>,
        trigger_mode: TriggerMode,
        condition_set_size: usize,
        condition_set_index: usize,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            trigger_id: trigger_id.into(),
            trigger_mode,
            condition_set_size,
            condition_set_index,
        }
    }

    /// Identity of a firing-mode condition
    pub fn firing(
        tenant_id: impl Into<String>,
        trigger_id: impl Into<String>,
        condition_set_size: usize,
        condition_set_index: usize,
    ) -> Self {
        Self::new(
            tenant_id,
            trigger_id,
            TriggerMode::Firing,
            condition_set_size,
            condition_set_index,
        )
    }

    /// Stable id of the condition: `tenant-trigger-mode-size-index`
    pub fn condition_id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.tenant_id,
            self.trigger_id,
            self.trigger_mode,
            self.condition_set_size,
            self.condition_set_index
        )
    }

    /// Check that the condition is bound to a trigger and a valid set position
    ///
    /// # Errors
    ///
    /// Returns `UnboundCondition` if tenant or trigger id is blank, the set is
    /// empty, or the index lies outside the set.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.trim().is_empty() {
            return Err(Error::unbound(format!(
                "condition for trigger '{}' has no tenant id",
                self.trigger_id
            )));
        }
        if self.trigger_id.trim().is_empty() {
            return Err(Error::unbound(format!(
                "condition for tenant '{}' has no trigger id",
                self.tenant_id
            )));
        }
        if self.condition_set_size == 0 {
            return Err(Error::unbound(format!(
                "condition set of trigger '{}' is empty",
                self.trigger_id
            )));
        }
        if self.condition_set_index >= self.condition_set_size {
            return Err(Error::unbound(format!(
                "condition set index {} outside set of size {} for trigger '{}'",
                self.condition_set_index, self.condition_set_size, self.trigger_id
            )));
        }
        Ok(())
    }
}

/// Capabilities every condition definition exposes to the engine
pub trait ConditionSpec {
    /// Owning trigger and set position
    fn identity(&self) -> &ConditionIdentity;

    /// Kind of the condition
    fn kind(&self) -> ConditionKind;

    /// Data ids this condition reads
    fn data_ids(&self) -> Vec<&str>;

    /// Check kind-specific parameters
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn tenant_id(&self) -> &str {
        &self.identity().tenant_id
    }

    fn trigger_id(&self) -> &str {
        &self.identity().trigger_id
    }

    fn trigger_mode(&self) -> TriggerMode {
        self.identity().trigger_mode
    }

    fn condition_set_size(&self) -> usize {
        self.identity().condition_set_size
    }

    fn condition_set_index(&self) -> usize {
        self.identity().condition_set_index
    }

    fn condition_id(&self) -> String {
        self.identity().condition_id()
    }
}

/// Any supported condition definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Threshold(ThresholdCondition),
    Range(ThresholdRangeCondition),
    Rate(RateCondition),
    String(StringCondition),
    Availability(AvailabilityCondition),
    Compare(CompareCondition),
}

impl Condition {
    fn spec(&self) -> &dyn ConditionSpec {
        match self {
            Condition::Threshold(c) => c,
            Condition::Range(c) => c,
            Condition::Rate(c) => c,
            Condition::String(c) => c,
            Condition::Availability(c) => c,
            Condition::Compare(c) => c,
        }
    }
}

impl ConditionSpec for Condition {
    fn identity(&self) -> &ConditionIdentity {
        self.spec().identity()
    }

    fn kind(&self) -> ConditionKind {
        self.spec().kind()
    }

    fn data_ids(&self) -> Vec<&str> {
        self.spec().data_ids()
    }

    fn validate(&self) -> Result<()> {
        self.spec().validate()
    }
}

impl From<ThresholdCondition> for Condition {
    fn from(c: ThresholdCondition) -> Self {
        Condition::Threshold(c)
    }
}

impl From<ThresholdRangeCondition> for Condition {
    fn from(c: ThresholdRangeCondition) -> Self {
        Condition::Range(c)
    }
}

impl From<RateCondition> for Condition {
    fn from(c: RateCondition) -> Self {
        Condition::Rate(c)
    }
}

impl From<StringCondition> for Condition {
    fn from(c: StringCondition) -> Self {
        Condition::String(c)
    }
}

impl From<AvailabilityCondition> for Condition {
    fn from(c: AvailabilityCondition) -> Self {
        Condition::Availability(c)
    }
}

impl From<CompareCondition> for Condition {
    fn from(c: CompareCondition) -> Self {
        Condition::Compare(c)
    }
}

/// Reject non-finite numeric parameters
pub(crate) fn ensure_finite(field: &str, value: f64, identity: &ConditionIdentity) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "condition {} has non-finite {}: {}",
            identity.condition_id(),
            field,
            value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThresholdOperator;

    #[test]
    fn test_condition_id_format() {
        let identity = ConditionIdentity::firing("acme", "cpu-high", 2, 1);
        assert_eq!(identity.condition_id(), "acme-cpu-high-FIRING-2-1");
    }

    #[test]
    fn test_validate_accepts_bound_identity() {
        assert!(ConditionIdentity::firing("acme", "t1", 1, 0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_tenant() {
        let err = ConditionIdentity::firing("", "t1", 1, 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::UnboundCondition(_)));
    }

    #[test]
    fn test_validate_rejects_missing_trigger() {
        let err = ConditionIdentity::firing("acme", "  ", 1, 0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::UnboundCondition(_)));
    }

    #[test]
    fn test_validate_rejects_index_outside_set() {
        let err = ConditionIdentity::firing("acme", "t1", 2, 2)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("outside set of size 2"));
        assert!(ConditionIdentity::firing("acme", "t1", 0, 0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_trigger_mode_from_str() {
        assert_eq!(
            "autoresolve".parse::<TriggerMode>().unwrap(),
            TriggerMode::AutoResolve
        );
        assert_eq!("FIRING".parse::<TriggerMode>().unwrap(), TriggerMode::Firing);
        assert!("sometimes".parse::<TriggerMode>().is_err());
    }

    #[test]
    fn test_condition_serializes_with_type_tag() {
        let condition: Condition = ThresholdCondition::new(
            ConditionIdentity::firing("acme", "t1", 1, 0),
            "cpu",
            ThresholdOperator::Gt,
            90.0,
        )
        .into();

        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "THRESHOLD");
        assert_eq!(json["tenantId"], "acme");
        assert_eq!(json["triggerMode"], "FIRING");
        assert_eq!(json["conditionSetIndex"], 0);
        assert_eq!(json["operator"], "GT");

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, condition);
        assert_eq!(back.kind(), ConditionKind::Threshold);
        assert_eq!(back.data_ids(), vec!["cpu"]);
    }
}
