use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::new_id;

/// One generated record: field name to value.
pub type DataRecord = Map<String, Value>;

/// Quality analysis attached to a generation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub overall_score: f64,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Rule validation attached to a generation result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub valid: bool,
    pub score: f64,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub applied_rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDataResult {
    pub generation_id: String,
    pub request_id: String,
    pub successful: bool,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub data_records: Vec<DataRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_report: Option<QualityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub generation_time_ms: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub cache_hit: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl GeneratedDataResult {
    pub fn success(request_id: impl Into<String>, data_records: Vec<DataRecord>) -> Self {
        Self {
            generation_id: new_id("gen"),
            request_id: request_id.into(),
            successful: true,
            generated_at: Utc::now(),
            data_records,
            quality_report: None,
            validation_result: None,
            error_message: None,
            provider: String::new(),
            model: String::new(),
            generation_time_ms: 0,
            warnings: Vec::new(),
            cache_hit: false,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            successful: false,
            error_message: Some(message.into()),
            ..Self::success(request_id, Vec::new())
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn record_count(&self) -> usize {
        self.data_records.len()
    }

    /// False only when a validation outcome is attached and marks the data invalid.
    pub fn passes_validation(&self) -> bool {
        self.validation_result
            .as_ref()
            .map(|outcome| outcome.valid)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_message_and_no_records() {
        let result = GeneratedDataResult::failure("req_1", "Generation failed: boom");
        assert!(!result.successful);
        assert_eq!(result.error_message.as_deref(), Some("Generation failed: boom"));
        assert_eq!(result.record_count(), 0);
        assert!(result.generation_id.starts_with("gen_"));
    }

    #[test]
    fn explicit_invalid_outcome_fails_validation() {
        let mut result = GeneratedDataResult::success("req_1", vec![DataRecord::new()]);
        assert!(result.passes_validation());
        result.validation_result = Some(ValidationOutcome {
            valid: false,
            ..ValidationOutcome::default()
        });
        assert!(!result.passes_validation());
    }
}
