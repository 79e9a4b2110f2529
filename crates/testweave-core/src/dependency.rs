use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::candidates::Provenance;
use crate::error::{CoreError, Result};
use crate::ids::new_id;

/// Kind of relationship between two data elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    /// Target holds a reference to the source.
    Reference,
    /// Source must exist before the target is generated.
    Prerequisite,
    /// Target is validated against the source.
    Validation,
    /// Target is derived from the source.
    Transformation,
}

impl DependencyType {
    /// Canonical upper-case name, used for resolution ordering.
    pub fn name(self) -> &'static str {
        match self {
            DependencyType::Reference => "REFERENCE",
            DependencyType::Prerequisite => "PREREQUISITE",
            DependencyType::Validation => "VALIDATION",
            DependencyType::Transformation => "TRANSFORMATION",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "REFERENCE" => Some(DependencyType::Reference),
            "PREREQUISITE" => Some(DependencyType::Prerequisite),
            "VALIDATION" => Some(DependencyType::Validation),
            "TRANSFORMATION" => Some(DependencyType::Transformation),
            _ => None,
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strength of a dependency on a 1-5 scale; level 5 is critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStrength {
    Weak,
    MediumLow,
    Medium,
    MediumHigh,
    #[serde(alias = "strong")]
    Critical,
}

impl DependencyStrength {
    pub fn level(self) -> u8 {
        match self {
            DependencyStrength::Weak => 1,
            DependencyStrength::MediumLow => 2,
            DependencyStrength::Medium => 3,
            DependencyStrength::MediumHigh => 4,
            DependencyStrength::Critical => 5,
        }
    }

    pub fn from_level(level: u8) -> Result<Self> {
        match level {
            1 => Ok(DependencyStrength::Weak),
            2 => Ok(DependencyStrength::MediumLow),
            3 => Ok(DependencyStrength::Medium),
            4 => Ok(DependencyStrength::MediumHigh),
            5 => Ok(DependencyStrength::Critical),
            other => Err(CoreError::InvalidStrength(other)),
        }
    }

    /// Parse a strength label; unknown labels fall back to `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "weak" => DependencyStrength::Weak,
            "medium_low" => DependencyStrength::MediumLow,
            "medium_high" => DependencyStrength::MediumHigh,
            "strong" | "critical" => DependencyStrength::Critical,
            _ => DependencyStrength::Medium,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DependencyStrength::Weak => "weak",
            DependencyStrength::MediumLow => "medium_low",
            DependencyStrength::Medium => "medium",
            DependencyStrength::MediumHigh => "medium_high",
            DependencyStrength::Critical => "critical",
        }
    }

    pub fn is_critical(self) -> bool {
        self.level() == 5
    }

    pub fn is_strong(self) -> bool {
        self.level() >= 4
    }

    pub fn is_weak(self) -> bool {
        self.level() <= 2
    }
}

impl fmt::Display for DependencyStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (level {})", self.label(), self.level())
    }
}

/// Resolution state of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyStatus {
    Active,
    Resolved,
    Broken,
}

/// Typed edge between two named fields of a generation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDependency {
    pub dependency_id: String,
    pub name: String,
    pub source_field: String,
    pub target_field: String,
    pub dependency_type: DependencyType,
    pub strength: DependencyStrength,
    pub status: DependencyStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl DataDependency {
    pub fn new(
        source_field: impl Into<String>,
        target_field: impl Into<String>,
        dependency_type: DependencyType,
        strength: DependencyStrength,
    ) -> Result<Self> {
        let source_field = source_field.into();
        let target_field = target_field.into();
        if source_field.trim().is_empty() || target_field.trim().is_empty() {
            return Err(CoreError::InvalidDependency(format!(
                "dependency endpoints must be non-empty: '{source_field}' -> '{target_field}'"
            )));
        }

        Ok(Self {
            dependency_id: new_id("dep"),
            name: format!("{source_field} -> {target_field}"),
            source_field,
            target_field,
            dependency_type,
            strength,
            status: DependencyStatus::Active,
            created_at: Utc::now(),
            provenance: None,
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `source -> target` label used in reports.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source_field, self.target_field)
    }

    /// Ordering used by dependency resolution: critical edges first, then
    /// dependency-type name ascending.
    pub fn resolution_cmp(&self, other: &Self) -> Ordering {
        match (self.strength.is_critical(), other.strength.is_critical()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self
                .dependency_type
                .name()
                .cmp(other.dependency_type.name()),
        }
    }
}

/// Deterministic resolution order. The sort is stable, so edges that compare
/// equal keep their insertion order.
pub fn resolution_order(dependencies: &[DataDependency]) -> Vec<DataDependency> {
    let mut ordered = dependencies.to_vec();
    ordered.sort_by(|a, b| a.resolution_cmp(b));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(source: &str, kind: DependencyType, strength: DependencyStrength) -> DataDependency {
        DataDependency::new(source, "target", kind, strength).expect("valid dependency")
    }

    #[test]
    fn critical_edges_sort_before_others() {
        let deps = vec![
            dep("a", DependencyType::Prerequisite, DependencyStrength::Weak),
            dep("b", DependencyType::Validation, DependencyStrength::Critical),
            dep("c", DependencyType::Reference, DependencyStrength::MediumHigh),
            dep("d", DependencyType::Reference, DependencyStrength::Critical),
        ];

        let order: Vec<String> = resolution_order(&deps)
            .into_iter()
            .map(|d| d.source_field)
            .collect();
        assert_eq!(order, vec!["d", "b", "a", "c"]);
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let deps = vec![
            dep("first", DependencyType::Transformation, DependencyStrength::Medium),
            dep("second", DependencyType::Transformation, DependencyStrength::Weak),
            dep("third", DependencyType::Transformation, DependencyStrength::MediumLow),
        ];

        let order: Vec<String> = resolution_order(&deps)
            .into_iter()
            .map(|d| d.source_field)
            .collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn strength_labels_parse_with_medium_fallback() {
        assert_eq!(DependencyStrength::from_label("STRONG"), DependencyStrength::Critical);
        assert_eq!(DependencyStrength::from_label("critical"), DependencyStrength::Critical);
        assert_eq!(DependencyStrength::from_label("weak"), DependencyStrength::Weak);
        assert_eq!(DependencyStrength::from_label("whatever"), DependencyStrength::Medium);
        assert!(DependencyStrength::from_level(0).is_err());
        assert!(DependencyStrength::Critical.is_critical());
        assert!(!DependencyStrength::MediumHigh.is_critical());
        assert!(DependencyStrength::MediumHigh.is_strong());
    }

    #[test]
    fn empty_endpoints_are_rejected() {
        let err = DataDependency::new(
            "",
            "orderId",
            DependencyType::Reference,
            DependencyStrength::Medium,
        );
        assert!(err.is_err());
    }

    #[test]
    fn serde_uses_platform_names() {
        let value = serde_json::to_value(dep(
            "userId",
            DependencyType::Prerequisite,
            DependencyStrength::Critical,
        ))
        .expect("serialize dependency");
        assert_eq!(value["dependencyType"], "PREREQUISITE");
        assert_eq!(value["strength"], "critical");
        assert_eq!(value["status"], "ACTIVE");

        let parsed: DependencyStrength =
            serde_json::from_value(serde_json::json!("strong")).expect("strong alias");
        assert_eq!(parsed, DependencyStrength::Critical);
    }
}
