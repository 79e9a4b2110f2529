use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::new_id;

/// Breadth at which a generated dataset is meant to be reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationScope {
    #[default]
    Global,
    Project,
    Module,
    Component,
    Scenario,
    TestCase,
    Session,
}

impl GenerationScope {
    pub fn name(self) -> &'static str {
        match self {
            GenerationScope::Global => "GLOBAL",
            GenerationScope::Project => "PROJECT",
            GenerationScope::Module => "MODULE",
            GenerationScope::Component => "COMPONENT",
            GenerationScope::Scenario => "SCENARIO",
            GenerationScope::TestCase => "TEST_CASE",
            GenerationScope::Session => "SESSION",
        }
    }
}

impl fmt::Display for GenerationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const DEFAULT_RECORD_COUNT: usize = 10;
pub const DEFAULT_QUALITY_LEVEL: &str = "standard";

/// Request handed to a generation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub request_id: String,
    pub data_type: String,
    #[serde(default)]
    pub generation_scope: GenerationScope,
    #[serde(default = "default_record_count")]
    pub record_count: usize,
    #[serde(default = "default_quality_level")]
    pub quality_level: String,
    #[serde(default)]
    pub context: Map<String, Value>,
    #[serde(default)]
    pub enable_validation: bool,
    #[serde(default)]
    pub validation_rules: Vec<String>,
}

fn default_record_count() -> usize {
    DEFAULT_RECORD_COUNT
}

fn default_quality_level() -> String {
    DEFAULT_QUALITY_LEVEL.to_string()
}

impl GenerationRequest {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            request_id: new_id("req"),
            data_type: data_type.into(),
            generation_scope: GenerationScope::default(),
            record_count: DEFAULT_RECORD_COUNT,
            quality_level: default_quality_level(),
            context: Map::new(),
            enable_validation: false,
            validation_rules: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: GenerationScope) -> Self {
        self.generation_scope = scope;
        self
    }

    pub fn with_record_count(mut self, record_count: usize) -> Self {
        self.record_count = record_count;
        self
    }

    pub fn with_quality_level(mut self, quality_level: impl Into<String>) -> Self {
        self.quality_level = quality_level.into();
        self
    }

    pub fn with_context_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_validation(mut self, rules: Vec<String>) -> Self {
        self.enable_validation = true;
        self.validation_rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_missing() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "requestId": "req_1",
            "dataType": "user"
        }))
        .expect("parse request");
        assert_eq!(request.generation_scope, GenerationScope::Global);
        assert_eq!(request.record_count, 10);
        assert_eq!(request.quality_level, "standard");
        assert!(!request.enable_validation);
    }

    #[test]
    fn builder_sets_fields() {
        let request = GenerationRequest::new("order")
            .with_scope(GenerationScope::TestCase)
            .with_record_count(3)
            .with_context_value("userId", "u-1")
            .with_validation(vec!["not_null".to_string()]);
        assert!(request.request_id.starts_with("req_"));
        assert_eq!(request.generation_scope.name(), "TEST_CASE");
        assert_eq!(request.record_count, 3);
        assert_eq!(request.context["userId"], "u-1");
        assert!(request.enable_validation);
    }
}
