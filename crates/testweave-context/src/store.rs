use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use testweave_core::{
    CandidateEdge, DataDependency, DependencyStatus, DependencyStrength, DependencyType,
    GeneratedDataResult, GenerationRequest, check_dependency_endpoints, new_id, resolution_order,
};
use testweave_generate::GenerationOrchestrator;

use crate::errors::{ContextError, Result};
use crate::model::{ContextExport, ContextStatus, ContextValidationResult, GenerationContext};
use crate::resolve::{build_dependency_context, is_dependency_satisfied, validation_score};

/// Thread-safe store of generation contexts.
///
/// Besides the contexts themselves, the store keeps a flat index of generated
/// results keyed by field name and a global index of dependencies keyed by id.
/// Clones share the same maps.
#[derive(Clone, Default)]
pub struct ContextStore {
    contexts: Arc<DashMap<String, GenerationContext>>,
    dependencies: Arc<DashMap<String, DataDependency>>,
    generated_data: Arc<DashMap<String, GeneratedDataResult>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_context(
        &self,
        name: &str,
        required_data: BTreeMap<String, Value>,
    ) -> Result<GenerationContext> {
        if name.trim().is_empty() {
            return Err(ContextError::InvalidName(name.to_string()));
        }

        let now = Utc::now();
        let context = GenerationContext {
            context_id: new_id("ctx"),
            name: name.to_string(),
            created_at: now,
            last_updated: now,
            status: ContextStatus::Active,
            required_data,
            generated_data: BTreeMap::new(),
            dependencies: Vec::new(),
            metadata: BTreeMap::new(),
        };
        self.contexts
            .insert(context.context_id.clone(), context.clone());

        info!(
            context_id = %context.context_id,
            name = %context.name,
            required_fields = context.required_data.len(),
            "context created"
        );
        Ok(context)
    }

    pub fn get_context(&self, context_id: &str) -> Result<GenerationContext> {
        self.contexts
            .get(context_id)
            .map(|context| context.value().clone())
            .ok_or_else(|| ContextError::ContextNotFound(context_id.to_string()))
    }

    /// All contexts, oldest first.
    pub fn list_contexts(&self) -> Vec<GenerationContext> {
        let mut contexts: Vec<GenerationContext> = self
            .contexts
            .iter()
            .map(|context| context.value().clone())
            .collect();
        contexts.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.context_id.cmp(&b.context_id))
        });
        contexts
    }

    pub fn set_status(&self, context_id: &str, status: ContextStatus) -> Result<()> {
        self.with_context(context_id, |context| {
            context.status = status;
            context.touch();
        })?;
        info!(context_id = %context_id, status = ?status, "context status updated");
        Ok(())
    }

    /// Store a result for `field_name`, replacing any previous result for that
    /// field (last write wins).
    pub fn add_data_to_context(
        &self,
        context_id: &str,
        field_name: &str,
        result: GeneratedDataResult,
    ) -> Result<()> {
        let generation_id = result.generation_id.clone();
        self.with_context(context_id, |context| {
            context
                .generated_data
                .insert(field_name.to_string(), result.clone());
            context.touch();
        })?;
        self.generated_data.insert(field_name.to_string(), result);

        debug!(
            context_id = %context_id,
            field = %field_name,
            generation_id = %generation_id,
            "data added to context"
        );
        Ok(())
    }

    pub fn add_dependency(
        &self,
        context_id: &str,
        source_field: &str,
        target_field: &str,
        dependency_type: DependencyType,
        strength: DependencyStrength,
    ) -> Result<DataDependency> {
        let dependency =
            DataDependency::new(source_field, target_field, dependency_type, strength)?;
        self.register_dependency(context_id, dependency.clone())?;

        info!(
            context_id = %context_id,
            source = %source_field,
            target = %target_field,
            dependency_type = %dependency_type,
            strength = %strength,
            "dependency added"
        );
        Ok(dependency)
    }

    /// Register typed candidate edges from API, BPMN or business-rule
    /// analyzers as dependencies of the context.
    pub fn import_candidates(
        &self,
        context_id: &str,
        candidates: &[CandidateEdge],
    ) -> Result<Vec<DataDependency>> {
        // Fail before converting anything when the context is unknown.
        self.ensure_exists(context_id)?;

        let mut converted = Vec::new();
        for candidate in candidates {
            converted.extend(candidate.to_candidates()?);
        }
        for dependency in &converted {
            self.register_dependency(context_id, dependency.clone())?;
        }

        info!(
            context_id = %context_id,
            candidates = candidates.len(),
            dependencies = converted.len(),
            "candidate dependencies imported"
        );
        Ok(converted)
    }

    /// Dependencies in resolution order without touching their status.
    pub fn resolution_order(&self, context_id: &str) -> Result<Vec<DataDependency>> {
        let context = self.get_context(context_id)?;
        Ok(resolution_order(&context.dependencies))
    }

    /// Check every dependency in resolution order, marking each `Resolved` or
    /// `Broken`. Unresolved edges are logged and do not stop the pass.
    pub fn resolve_dependencies(&self, context_id: &str) -> Result<GenerationContext> {
        info!(context_id = %context_id, "resolving dependencies");

        let mut updated = Vec::new();
        let mut resolved_count = 0usize;
        let context = self.with_context(context_id, |context| {
            let ordered = resolution_order(&context.dependencies);
            let mut outcomes = BTreeMap::new();

            for dependency in &ordered {
                let satisfied = is_dependency_satisfied(context, dependency);
                if satisfied {
                    resolved_count += 1;
                } else {
                    warn!(
                        context_id = %context.context_id,
                        dependency = %dependency.label(),
                        dependency_type = %dependency.dependency_type,
                        "dependency unresolved"
                    );
                }
                let status = if satisfied {
                    DependencyStatus::Resolved
                } else {
                    DependencyStatus::Broken
                };
                outcomes.insert(dependency.dependency_id.clone(), status);
            }

            for dependency in &mut context.dependencies {
                if let Some(status) = outcomes.get(&dependency.dependency_id) {
                    dependency.status = *status;
                    updated.push(dependency.clone());
                }
            }

            let order: Vec<&str> = ordered
                .iter()
                .map(|dependency| dependency.dependency_id.as_str())
                .collect();
            context
                .metadata
                .insert("resolvedDependencies".to_string(), json!(resolved_count));
            context.metadata.insert(
                "totalDependencies".to_string(),
                json!(context.dependencies.len()),
            );
            context
                .metadata
                .insert("resolutionOrder".to_string(), json!(order));
            context.touch();
            context.clone()
        })?;

        for dependency in updated {
            self.dependencies
                .insert(dependency.dependency_id.clone(), dependency);
        }

        info!(
            context_id = %context_id,
            resolved = resolved_count,
            total = context.dependencies.len(),
            "dependencies resolved"
        );
        Ok(context)
    }

    /// Score how ready a context is. Does not mutate the context.
    pub fn validate_context(&self, context_id: &str) -> Result<ContextValidationResult> {
        let context = self.get_context(context_id)?;

        let missing_required_data: Vec<String> = context
            .required_data
            .keys()
            .filter(|field| !context.generated_data.contains_key(*field))
            .cloned()
            .collect();

        let broken_dependencies: Vec<String> = context
            .dependencies
            .iter()
            .filter(|dependency| !is_dependency_satisfied(&context, dependency))
            .map(DataDependency::label)
            .collect();

        let warnings: Vec<String> =
            check_dependency_endpoints(&context.known_fields(), &context.dependencies)
                .into_iter()
                .map(|issue| issue.message)
                .collect();

        let validation_score = validation_score(
            context.required_data.len(),
            context.dependencies.len(),
            missing_required_data.len(),
            broken_dependencies.len(),
        );
        let valid = missing_required_data.is_empty() && broken_dependencies.is_empty();

        info!(
            context_id = %context_id,
            valid,
            score = %format!("{validation_score:.1}"),
            "context validated"
        );

        Ok(ContextValidationResult {
            context_id: context_id.to_string(),
            validated_at: Utc::now(),
            valid,
            validation_score,
            missing_required_data,
            broken_dependencies,
            warnings,
        })
    }

    pub fn export_context_data(&self, context_id: &str) -> Result<ContextExport> {
        let context = self.get_context(context_id)?;
        Ok(ContextExport::from(&context))
    }

    /// Remove a context and its entries in the shared indices.
    ///
    /// A field's entry in the generated-data index is only removed while it
    /// still holds this context's result.
    pub fn delete_context(&self, context_id: &str) -> Result<GenerationContext> {
        let (_, context) = self
            .contexts
            .remove(context_id)
            .ok_or_else(|| ContextError::ContextNotFound(context_id.to_string()))?;

        for (field, result) in &context.generated_data {
            self.generated_data.remove_if(field, |_, stored| {
                stored.generation_id == result.generation_id
            });
        }
        for dependency in &context.dependencies {
            self.dependencies.remove(&dependency.dependency_id);
        }

        info!(context_id = %context_id, "context deleted");
        Ok(context)
    }

    /// Generate data for `field_name` with the context's dependency data
    /// attached to the request, then store the result on the context. Failed
    /// generations are stored too; the result carries `successful = false`.
    pub async fn generate_dependent_data(
        &self,
        context_id: &str,
        field_name: &str,
        mut request: GenerationRequest,
        orchestrator: &GenerationOrchestrator,
    ) -> Result<GenerationContext> {
        let snapshot = self.get_context(context_id)?;
        let dependency_context = build_dependency_context(&snapshot, field_name);
        request
            .context
            .insert("dependencyContext".to_string(), dependency_context);

        let result = orchestrator.generate_test_data(request).await;
        let records = result.record_count();
        let successful = result.successful;
        self.add_data_to_context(context_id, field_name, result)?;

        let context = self.with_context(context_id, |context| {
            context
                .metadata
                .insert("lastGeneration".to_string(), json!(field_name));
            context.metadata.insert(
                "generationTime".to_string(),
                json!(Utc::now().to_rfc3339()),
            );
            context.touch();
            context.clone()
        })?;

        info!(
            context_id = %context_id,
            field = %field_name,
            records,
            successful,
            "dependent data generated"
        );
        Ok(context)
    }

    /// Generated result currently indexed for a field, across contexts.
    pub fn generated_data_for(&self, field_name: &str) -> Option<GeneratedDataResult> {
        self.generated_data
            .get(field_name)
            .map(|result| result.value().clone())
    }

    pub fn dependency(&self, dependency_id: &str) -> Option<DataDependency> {
        self.dependencies
            .get(dependency_id)
            .map(|dependency| dependency.value().clone())
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    fn register_dependency(&self, context_id: &str, dependency: DataDependency) -> Result<()> {
        self.with_context(context_id, |context| {
            context.dependencies.push(dependency.clone());
            context.touch();
        })?;
        self.dependencies
            .insert(dependency.dependency_id.clone(), dependency);
        Ok(())
    }

    fn ensure_exists(&self, context_id: &str) -> Result<()> {
        if self.contexts.contains_key(context_id) {
            Ok(())
        } else {
            Err(ContextError::ContextNotFound(context_id.to_string()))
        }
    }

    // The shard lock is held only for the duration of `f`.
    fn with_context<T>(
        &self,
        context_id: &str,
        f: impl FnOnce(&mut GenerationContext) -> T,
    ) -> Result<T> {
        let mut entry = self
            .contexts
            .get_mut(context_id)
            .ok_or_else(|| ContextError::ContextNotFound(context_id.to_string()))?;
        Ok(f(entry.value_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testweave_core::DataRecord;

    fn required(fields: &[&str]) -> BTreeMap<String, Value> {
        fields
            .iter()
            .map(|field| (field.to_string(), json!("string")))
            .collect()
    }

    fn result(id: &str) -> GeneratedDataResult {
        let mut record = DataRecord::new();
        record.insert("id".to_string(), json!(id));
        GeneratedDataResult::success("req", vec![record])
    }

    #[test]
    fn blank_names_are_rejected() {
        let store = ContextStore::new();
        assert!(matches!(
            store.create_context("  ", BTreeMap::new()),
            Err(ContextError::InvalidName(_))
        ));
    }

    #[test]
    fn unknown_context_fails_fast() {
        let store = ContextStore::new();
        let err = store
            .add_data_to_context("ctx_missing", "userId", result("u1"))
            .expect_err("unknown context");
        assert!(matches!(err, ContextError::ContextNotFound(id) if id == "ctx_missing"));
        assert!(store.generated_data_for("userId").is_none());
        assert!(store.validate_context("ctx_missing").is_err());
        assert!(store.resolve_dependencies("ctx_missing").is_err());
        assert!(store.delete_context("ctx_missing").is_err());
    }

    #[test]
    fn missing_required_field_halves_score() {
        let store = ContextStore::new();
        let ctx = store
            .create_context("checkout", required(&["userId", "orderId"]))
            .expect("context");
        store
            .add_data_to_context(&ctx.context_id, "userId", result("u1"))
            .expect("add data");

        let validation = store.validate_context(&ctx.context_id).expect("validate");
        assert_eq!(validation.missing_required_data, vec!["orderId"]);
        assert!(!validation.valid);
        assert_eq!(validation.validation_score, 50.0);
    }

    #[test]
    fn duplicate_field_writes_overwrite() {
        let store = ContextStore::new();
        let ctx = store.create_context("c", BTreeMap::new()).expect("context");
        store
            .add_data_to_context(&ctx.context_id, "userId", result("first"))
            .expect("add");
        let second = result("second");
        let second_id = second.generation_id.clone();
        store
            .add_data_to_context(&ctx.context_id, "userId", second)
            .expect("add");

        let context = store.get_context(&ctx.context_id).expect("context");
        assert_eq!(context.generated_data["userId"].generation_id, second_id);
        assert_eq!(
            store
                .generated_data_for("userId")
                .map(|r| r.generation_id),
            Some(second_id)
        );
    }
}
