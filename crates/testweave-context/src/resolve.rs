use serde_json::{Map, Value, json};

use testweave_core::{DataDependency, DependencyType, GeneratedDataResult};

use crate::model::GenerationContext;

/// A dependency is satisfied when both endpoints have generated data and the
/// type-specific check passes.
pub fn is_dependency_satisfied(context: &GenerationContext, dependency: &DataDependency) -> bool {
    let Some(source) = context.generated_data.get(&dependency.source_field) else {
        return false;
    };
    let Some(target) = context.generated_data.get(&dependency.target_field) else {
        return false;
    };

    match dependency.dependency_type {
        DependencyType::Reference => check_reference(source, target),
        DependencyType::Prerequisite => check_prerequisite(source, target),
        DependencyType::Validation => check_validation(source, target),
        DependencyType::Transformation => check_transformation(source, target),
    }
}

fn check_reference(_source: &GeneratedDataResult, _target: &GeneratedDataResult) -> bool {
    true
}

fn check_prerequisite(_source: &GeneratedDataResult, _target: &GeneratedDataResult) -> bool {
    true
}

// Target data explicitly marked invalid fails the edge.
fn check_validation(_source: &GeneratedDataResult, target: &GeneratedDataResult) -> bool {
    target.passes_validation()
}

fn check_transformation(_source: &GeneratedDataResult, _target: &GeneratedDataResult) -> bool {
    true
}

/// `100 * (checks - missing - broken) / checks`, or 100 with no checks.
pub fn validation_score(required: usize, dependencies: usize, missing: usize, broken: usize) -> f64 {
    let total = required + dependencies;
    if total == 0 {
        return 100.0;
    }
    let valid = total.saturating_sub(missing + broken);
    valid as f64 / total as f64 * 100.0
}

/// Dependency context handed to the generator for `target_field`: records
/// already generated per field, the required-data map, the target and the
/// edges that point at it.
pub fn build_dependency_context(context: &GenerationContext, target_field: &str) -> Value {
    let mut generated = Map::new();
    for (field, result) in &context.generated_data {
        generated.insert(
            field.clone(),
            Value::Array(
                result
                    .data_records
                    .iter()
                    .cloned()
                    .map(Value::Object)
                    .collect(),
            ),
        );
    }

    let incoming: Vec<&DataDependency> = context
        .dependencies
        .iter()
        .filter(|dep| dep.target_field == target_field)
        .collect();
    let source_fields: Vec<&str> = incoming.iter().map(|dep| dep.source_field.as_str()).collect();
    let dependency_types: Vec<&str> = incoming
        .iter()
        .map(|dep| dep.dependency_type.name())
        .collect();

    json!({
        "generatedData": generated,
        "requiredData": context.required_data,
        "targetField": target_field,
        "targetContext": context.name,
        "sourceFields": source_fields,
        "dependencyTypes": dependency_types,
    })
}
