use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use testweave_core::{DataDependency, GeneratedDataResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContextStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Archived,
}

/// Required fields, generated results and dependency edges of one
/// test-data generation task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationContext {
    pub context_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub status: ContextStatus,
    /// Required field name to expected-shape placeholder.
    pub required_data: BTreeMap<String, Value>,
    pub generated_data: BTreeMap<String, GeneratedDataResult>,
    pub dependencies: Vec<DataDependency>,
    pub metadata: BTreeMap<String, Value>,
}

impl GenerationContext {
    pub fn known_fields(&self) -> std::collections::BTreeSet<String> {
        self.required_data
            .keys()
            .chain(self.generated_data.keys())
            .cloned()
            .collect()
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Readiness verdict for a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextValidationResult {
    pub context_id: String,
    pub validated_at: DateTime<Utc>,
    pub valid: bool,
    pub validation_score: f64,
    pub missing_required_data: Vec<String>,
    pub broken_dependencies: Vec<String>,
    /// Structural problems that do not affect the score.
    pub warnings: Vec<String>,
}

/// Read-only projection of a context for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextExport {
    pub context_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub generated_data: BTreeMap<String, GeneratedDataResult>,
    pub dependencies: Vec<DataDependency>,
    pub metadata: BTreeMap<String, Value>,
}

impl From<&GenerationContext> for ContextExport {
    fn from(context: &GenerationContext) -> Self {
        Self {
            context_id: context.context_id.clone(),
            name: context.name.clone(),
            created_at: context.created_at,
            generated_data: context.generated_data.clone(),
            dependencies: context.dependencies.clone(),
            metadata: context.metadata.clone(),
        }
    }
}
