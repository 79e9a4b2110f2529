use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use testweave_context::{ContextError, ContextExport, ContextStore, ContextValidationResult};
use testweave_core::{
    CandidateEdge, DependencyStrength, DependencyType, GenerationRequest, GenerationScope,
};
use testweave_generate::GenerationOrchestrator;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// A generation task described in JSON: the fields it needs, the edges
/// between them and the fields to generate, in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub required_data: BTreeMap<String, Value>,
    #[serde(default)]
    pub dependencies: Vec<ScenarioDependency>,
    /// Typed API/BPMN/business-rule edges, tagged by `provenance`.
    #[serde(default)]
    pub candidates: Vec<CandidateEdge>,
    #[serde(default)]
    pub generate: Vec<ScenarioGeneration>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDependency {
    pub source_field: String,
    pub target_field: String,
    pub dependency_type: String,
    /// Strength label; unknown labels read as `medium`.
    #[serde(default)]
    pub strength: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioGeneration {
    pub field: String,
    /// Defaults to the field name.
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub record_count: Option<usize>,
    #[serde(default)]
    pub quality_level: Option<String>,
    #[serde(default)]
    pub generation_scope: Option<GenerationScope>,
}

impl ScenarioGeneration {
    fn request(&self) -> GenerationRequest {
        let mut request = GenerationRequest::new(self.data_type.as_deref().unwrap_or(&self.field))
            .with_scope(self.generation_scope.unwrap_or(GenerationScope::Scenario));
        if let Some(record_count) = self.record_count {
            request = request.with_record_count(record_count);
        }
        if let Some(quality_level) = &self.quality_level {
            request = request.with_quality_level(quality_level.clone());
        }
        request
    }
}

/// Export projection and readiness verdict of a resolved scenario.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub export: ContextExport,
    pub validation: ContextValidationResult,
}

pub fn read_scenario(path: &Path) -> Result<Scenario, ScenarioError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Build a context from `scenario`, generate its fields in order, then
/// resolve and validate the dependency edges.
pub async fn run_scenario(
    scenario: &Scenario,
    store: &ContextStore,
    orchestrator: &GenerationOrchestrator,
) -> Result<ScenarioOutcome, ScenarioError> {
    let context = store.create_context(&scenario.name, scenario.required_data.clone())?;
    let context_id = context.context_id;

    for dependency in &scenario.dependencies {
        let dependency_type = DependencyType::parse(&dependency.dependency_type).ok_or_else(|| {
            ScenarioError::Invalid(format!(
                "unknown dependency type '{}' for {} -> {}",
                dependency.dependency_type, dependency.source_field, dependency.target_field
            ))
        })?;
        let strength = dependency
            .strength
            .as_deref()
            .map(DependencyStrength::from_label)
            .unwrap_or(DependencyStrength::Medium);
        store.add_dependency(
            &context_id,
            &dependency.source_field,
            &dependency.target_field,
            dependency_type,
            strength,
        )?;
    }

    if !scenario.candidates.is_empty() {
        store.import_candidates(&context_id, &scenario.candidates)?;
    }

    for generation in &scenario.generate {
        store
            .generate_dependent_data(&context_id, &generation.field, generation.request(), orchestrator)
            .await?;
    }

    store.resolve_dependencies(&context_id)?;
    let validation = store.validate_context(&context_id)?;
    let export = store.export_context_data(&context_id)?;

    info!(
        context_id = %context_id,
        scenario = %scenario.name,
        generated = export.generated_data.len(),
        valid = validation.valid,
        "scenario resolved"
    );
    Ok(ScenarioOutcome { export, validation })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use testweave_core::DependencyStatus;
    use testweave_generate::{OrchestratorConfig, SampleDataGenerator};

    use super::*;

    fn orchestrator() -> GenerationOrchestrator {
        GenerationOrchestrator::new(
            Arc::new(SampleDataGenerator::default()),
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn scenario_generates_in_order_and_resolves() {
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "checkout",
            "requiredData": { "user": "object", "order": "object" },
            "dependencies": [
                { "sourceField": "user", "targetField": "order",
                  "dependencyType": "prerequisite", "strength": "strong" }
            ],
            "generate": [
                { "field": "user", "recordCount": 2 },
                { "field": "order", "dataType": "order", "recordCount": 3 }
            ]
        }))
        .expect("scenario");

        let store = ContextStore::new();
        let outcome = run_scenario(&scenario, &store, &orchestrator())
            .await
            .expect("outcome");

        assert!(outcome.validation.valid);
        assert_eq!(outcome.validation.validation_score, 100.0);
        assert_eq!(outcome.export.generated_data.len(), 2);
        assert_eq!(outcome.export.generated_data["order"].data_records.len(), 3);

        let dependency = &outcome.export.dependencies[0];
        assert_eq!(dependency.status, DependencyStatus::Resolved);
        assert_eq!(dependency.strength, DependencyStrength::Critical);
        assert_eq!(outcome.export.metadata["resolvedDependencies"], json!(1));
        assert_eq!(outcome.export.metadata["lastGeneration"], json!("order"));
    }

    #[tokio::test]
    async fn missing_generation_leaves_the_context_invalid() {
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "partial",
            "requiredData": { "user": "object", "invoice": "object" },
            "dependencies": [
                { "sourceField": "user", "targetField": "invoice", "dependencyType": "REFERENCE" }
            ],
            "generate": [{ "field": "user", "recordCount": 1 }]
        }))
        .expect("scenario");

        let outcome = run_scenario(&scenario, &ContextStore::new(), &orchestrator())
            .await
            .expect("outcome");

        assert!(!outcome.validation.valid);
        assert_eq!(outcome.validation.missing_required_data, vec!["invoice".to_string()]);
        assert_eq!(outcome.validation.broken_dependencies.len(), 1);
        assert!((outcome.validation.validation_score - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.export.dependencies[0].strength, DependencyStrength::Medium);
    }

    #[tokio::test]
    async fn unknown_dependency_types_are_rejected() {
        let scenario: Scenario = serde_json::from_value(json!({
            "name": "bad",
            "dependencies": [
                { "sourceField": "a", "targetField": "b", "dependencyType": "ownership" }
            ]
        }))
        .expect("scenario");

        let err = run_scenario(&scenario, &ContextStore::new(), &orchestrator())
            .await
            .expect_err("invalid type");
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }
}
