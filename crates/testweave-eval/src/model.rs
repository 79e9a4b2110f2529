use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use testweave_core::DataFlowGraph;
use testweave_rules::ValidationRule;

use crate::errors::{EvalError, Result};

/// Overall score at or above which a data set is compliant.
pub const COMPLIANCE_THRESHOLD: f64 = 80.0;

/// Options for the validation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Date ages are computed against in consistency checks.
    pub reference_date: NaiveDate,
    pub compliance_threshold: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reference_date: Utc::now().date_naive(),
            compliance_threshold: COMPLIANCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationType {
    BpmnCompliance,
    ApiCompliance,
    BusinessRules,
    DataConsistency,
    DataFlow,
    Contextual,
}

impl ValidationType {
    pub fn name(self) -> &'static str {
        match self {
            ValidationType::BpmnCompliance => "BPMN_COMPLIANCE",
            ValidationType::ApiCompliance => "API_COMPLIANCE",
            ValidationType::BusinessRules => "BUSINESS_RULES",
            ValidationType::DataConsistency => "DATA_CONSISTENCY",
            ValidationType::DataFlow => "DATA_FLOW",
            ValidationType::Contextual => "CONTEXTUAL",
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub compliance_score: f64,
    pub applied_rules: usize,
}

/// Rule verdicts for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordValidation {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Value>,
    pub valid: bool,
    pub validation_errors: Vec<String>,
    /// Rules that could not be evaluated; they never fail the record.
    pub validation_warnings: Vec<String>,
}

/// Uniform result of the BPMN, API and business-rule validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub validation_id: String,
    pub validation_type: ValidationType,
    /// Diagram or spec id the rules were loaded for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub summary: ComplianceSummary,
    pub details: Vec<RecordValidation>,
    pub generated_at: DateTime<Utc>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencySummary {
    pub total_records: usize,
    pub internal_consistency_score: f64,
    pub inter_record_consistency_score: f64,
    pub consistency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordConsistency {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Value>,
    pub consistency_score: f64,
    pub consistency_issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub validation_id: String,
    pub validation_type: ValidationType,
    pub summary: ConsistencySummary,
    pub details: Vec<RecordConsistency>,
    pub inter_record_issues: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub success: bool,
}

/// Cross-system consistency of a data-flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConsistencyReport {
    pub nodes: usize,
    pub edges: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
    pub dangling_connections: Vec<String>,
    pub issues: Vec<String>,
    pub consistency_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualComplianceReport {
    pub validation_id: String,
    pub validation_type: ValidationType,
    pub validated_at: DateTime<Utc>,
    pub total_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpmn_validation: Option<ComplianceReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_validation: Option<ComplianceReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_rules_validation: Option<ComplianceReport>,
    pub consistency_validation: ConsistencyReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_flow_validation: Option<FlowConsistencyReport>,
    pub overall_compliance_score: f64,
    pub is_compliant: bool,
}

impl ContextualComplianceReport {
    /// Compliance reports that were computed, in pipeline order.
    pub fn compliance_reports(&self) -> impl Iterator<Item = &ComplianceReport> {
        [
            self.bpmn_validation.as_ref(),
            self.api_validation.as_ref(),
            self.business_rules_validation.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Rules supplied for one BPMN diagram or API spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRules {
    pub source_id: String,
    /// Caller rules merged after the built-in ones. Empty reuses the cached set.
    pub rules: Vec<ValidationRule>,
}

/// Which validators run in a contextual validation, and with what rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationContext {
    pub bpmn: Option<SourceRules>,
    pub api: Option<SourceRules>,
    pub business_rules: Option<Vec<ValidationRule>>,
    pub data_flow_graph: Option<DataFlowGraph>,
}

impl ValidationContext {
    pub fn with_bpmn(mut self, diagram_id: impl Into<String>, rules: Vec<ValidationRule>) -> Self {
        self.bpmn = Some(SourceRules {
            source_id: diagram_id.into(),
            rules,
        });
        self
    }

    pub fn with_api(mut self, spec_id: impl Into<String>, rules: Vec<ValidationRule>) -> Self {
        self.api = Some(SourceRules {
            source_id: spec_id.into(),
            rules,
        });
        self
    }

    pub fn with_business_rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.business_rules = Some(rules);
        self
    }

    pub fn with_data_flow_graph(mut self, graph: DataFlowGraph) -> Self {
        self.data_flow_graph = Some(graph);
        self
    }

    /// Build a context from the platform's loose map form.
    ///
    /// `bpmnContext` enables BPMN validation with `diagramId`/`bpmnRules`,
    /// `apiContext` enables API validation with `specId`/`apiRules`,
    /// `businessRules` and `dataFlowGraph` are taken as-is.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut context = ValidationContext::default();
        if map.contains_key("bpmnContext") {
            context.bpmn = Some(SourceRules {
                source_id: string_or_default(map, "diagramId"),
                rules: rules_at(map, "bpmnRules")?,
            });
        }
        if map.contains_key("apiContext") {
            context.api = Some(SourceRules {
                source_id: string_or_default(map, "specId"),
                rules: rules_at(map, "apiRules")?,
            });
        }
        if map.contains_key("businessRules") {
            context.business_rules = Some(rules_at(map, "businessRules")?);
        }
        if let Some(graph) = map.get("dataFlowGraph").filter(|value| !value.is_null()) {
            let graph = serde_json::from_value(graph.clone())
                .map_err(|err| EvalError::InvalidContext(format!("dataFlowGraph: {err}")))?;
            context.data_flow_graph = Some(graph);
        }
        Ok(context)
    }
}

fn string_or_default(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or("default")
        .to_string()
}

fn rules_at(map: &Map<String, Value>, key: &str) -> Result<Vec<ValidationRule>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| EvalError::InvalidContext(format!("{key}: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testweave_rules::RuleType;

    use super::*;

    #[test]
    fn context_map_enables_present_sections() {
        let value = json!({
            "bpmnContext": true,
            "diagramId": "order-process",
            "bpmnRules": [
                { "fieldName": "channel", "ruleType": "ENUM", "ruleValue": "WEB,STORE" }
            ],
            "businessRules": [
                { "ruleName": "discount", "ruleType": "CONDITIONAL",
                  "ruleExpression": "IF tier = 'gold' THEN discount >= 10" }
            ]
        });
        let map = value.as_object().expect("object");
        let context = ValidationContext::from_map(map).expect("context");

        let bpmn = context.bpmn.expect("bpmn section");
        assert_eq!(bpmn.source_id, "order-process");
        assert_eq!(bpmn.rules[0].rule_type, RuleType::Enum);
        assert!(context.api.is_none());
        assert_eq!(context.business_rules.map(|rules| rules.len()), Some(1));
        assert!(context.data_flow_graph.is_none());
    }

    #[test]
    fn malformed_rules_are_reported_with_their_key() {
        let value = json!({ "apiContext": {}, "apiRules": [{ "ruleType": "UUID" }] });
        let err = ValidationContext::from_map(value.as_object().expect("object"))
            .expect_err("missing fieldName");
        assert!(err.to_string().contains("apiRules"));
    }
}
