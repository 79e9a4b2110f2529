use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dependency::DataDependency;

/// Structural problem with a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyIssue {
    pub dependency_id: String,
    pub code: String,
    pub message: String,
}

/// Check dependency edges against the fields a context knows about.
///
/// This reports:
/// - endpoints that are neither required nor generated
/// - self-referencing edges
/// - duplicate (source, target, type) edges
pub fn check_dependency_endpoints(
    known_fields: &BTreeSet<String>,
    dependencies: &[DataDependency],
) -> Vec<DependencyIssue> {
    let mut issues = Vec::new();
    let mut seen = BTreeSet::new();

    for dependency in dependencies {
        for (role, field) in [
            ("source", &dependency.source_field),
            ("target", &dependency.target_field),
        ] {
            if !known_fields.contains(field) {
                issues.push(DependencyIssue {
                    dependency_id: dependency.dependency_id.clone(),
                    code: format!("unknown_{role}"),
                    message: format!(
                        "dependency {} references unknown {role} field '{field}'",
                        dependency.label()
                    ),
                });
            }
        }

        if dependency.source_field == dependency.target_field {
            issues.push(DependencyIssue {
                dependency_id: dependency.dependency_id.clone(),
                code: "self_reference".to_string(),
                message: format!(
                    "dependency {} points at its own source",
                    dependency.label()
                ),
            });
        }

        let key = (
            dependency.source_field.clone(),
            dependency.target_field.clone(),
            dependency.dependency_type.name(),
        );
        if !seen.insert(key) {
            issues.push(DependencyIssue {
                dependency_id: dependency.dependency_id.clone(),
                code: "duplicate".to_string(),
                message: format!(
                    "duplicate {} dependency {}",
                    dependency.dependency_type,
                    dependency.label()
                ),
            });
        }
    }

    issues
}
