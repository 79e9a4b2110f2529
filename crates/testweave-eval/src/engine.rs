use chrono::Utc;
use dashmap::DashMap;
use tracing::{info, warn};

use testweave_core::{DataFlowGraph, DataRecord, new_id};
use testweave_rules::{ValidationRule, builtin_api_rules, builtin_bpmn_rules};

use crate::consistency::{check_inter_record_consistency, check_record_consistency, summarize};
use crate::expression::CheckOutcome;
use crate::flow::validate_data_flow;
use crate::model::{
    ComplianceReport, ComplianceSummary, ConsistencyReport, ContextualComplianceReport,
    FlowConsistencyReport, PipelineOptions, RecordValidation, ValidationContext, ValidationType,
};
use crate::rules::{check_api_rule, check_rule, failure_message};

/// Runs BPMN, API, business-rule, consistency and data-flow validation over
/// generated records.
///
/// Merged BPMN and API rule sets are cached per diagram/spec id
/// (`bpmn:<id>`, `api:<id>`).
#[derive(Debug, Default)]
pub struct ComplianceValidator {
    options: PipelineOptions,
    rule_cache: DashMap<String, Vec<ValidationRule>>,
}

impl ComplianceValidator {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            rule_cache: DashMap::new(),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn validate_bpmn_compliance(
        &self,
        records: &[DataRecord],
        diagram_id: &str,
        process_rules: &[ValidationRule],
    ) -> ComplianceReport {
        let rules = self.load_rules(&format!("bpmn:{diagram_id}"), builtin_bpmn_rules, process_rules);
        let report = build_report(
            ValidationType::BpmnCompliance,
            Some(diagram_id),
            records,
            &rules,
        );
        info!(
            diagram_id = %diagram_id,
            valid = report.summary.valid_records,
            invalid = report.summary.invalid_records,
            "bpmn compliance validated"
        );
        report
    }

    pub fn validate_api_compliance(
        &self,
        records: &[DataRecord],
        spec_id: &str,
        api_rules: &[ValidationRule],
    ) -> ComplianceReport {
        let rules = self.load_rules(&format!("api:{spec_id}"), builtin_api_rules, api_rules);
        let report = build_report(ValidationType::ApiCompliance, Some(spec_id), records, &rules);
        info!(
            spec_id = %spec_id,
            valid = report.summary.valid_records,
            invalid = report.summary.invalid_records,
            "api compliance validated"
        );
        report
    }

    pub fn validate_business_rules(
        &self,
        records: &[DataRecord],
        business_rules: &[ValidationRule],
    ) -> ComplianceReport {
        let report = build_report(ValidationType::BusinessRules, None, records, business_rules);
        info!(
            rules = business_rules.len(),
            valid = report.summary.valid_records,
            invalid = report.summary.invalid_records,
            "business rules validated"
        );
        report
    }

    pub fn validate_data_consistency(&self, records: &[DataRecord]) -> ConsistencyReport {
        let details: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                check_record_consistency(index, record, self.options.reference_date)
            })
            .collect();
        let (inter_record_score, inter_record_issues) = check_inter_record_consistency(records);
        let summary = summarize(&details, inter_record_score);
        info!(
            records = records.len(),
            score = summary.consistency_score,
            "data consistency validated"
        );

        ConsistencyReport {
            validation_id: new_id("val"),
            validation_type: ValidationType::DataConsistency,
            summary,
            details,
            inter_record_issues,
            generated_at: Utc::now(),
            success: true,
        }
    }

    pub fn validate_data_flow(&self, graph: &DataFlowGraph) -> FlowConsistencyReport {
        let report = validate_data_flow(graph);
        info!(
            nodes = report.nodes,
            edges = report.edges,
            score = report.consistency_score,
            "data flow validated"
        );
        report
    }

    /// Run every validator the context enables plus data consistency, and
    /// average the resulting scores.
    pub fn validate_contextual_compliance(
        &self,
        records: &[DataRecord],
        context: &ValidationContext,
    ) -> ContextualComplianceReport {
        let bpmn_validation = context.bpmn.as_ref().map(|bpmn| {
            self.validate_bpmn_compliance(records, &bpmn.source_id, &bpmn.rules)
        });
        let api_validation = context
            .api
            .as_ref()
            .map(|api| self.validate_api_compliance(records, &api.source_id, &api.rules));
        let business_rules_validation = context
            .business_rules
            .as_ref()
            .map(|rules| self.validate_business_rules(records, rules));
        let consistency_validation = self.validate_data_consistency(records);
        let data_flow_validation = context
            .data_flow_graph
            .as_ref()
            .map(|graph| self.validate_data_flow(graph));

        let mut scores: Vec<f64> = [&bpmn_validation, &api_validation, &business_rules_validation]
            .into_iter()
            .flatten()
            .map(|report| report.summary.compliance_score)
            .collect();
        scores.push(consistency_validation.summary.consistency_score);
        if let Some(flow) = &data_flow_validation {
            scores.push(flow.consistency_score);
        }
        let overall = scores.iter().sum::<f64>() / scores.len() as f64;
        let is_compliant = overall >= self.options.compliance_threshold;

        if is_compliant {
            info!(records = records.len(), score = overall, "contextual validation passed");
        } else {
            warn!(
                records = records.len(),
                score = overall,
                threshold = self.options.compliance_threshold,
                "contextual validation below threshold"
            );
        }

        ContextualComplianceReport {
            validation_id: new_id("val"),
            validation_type: ValidationType::Contextual,
            validated_at: Utc::now(),
            total_records: records.len(),
            bpmn_validation,
            api_validation,
            business_rules_validation,
            consistency_validation,
            data_flow_validation,
            overall_compliance_score: overall,
            is_compliant,
        }
    }

    pub fn cached_rules(&self, key: &str) -> Option<Vec<ValidationRule>> {
        self.rule_cache.get(key).map(|entry| entry.value().clone())
    }

    pub fn clear_cache(&self) {
        self.rule_cache.clear();
        info!("validator rule cache cleared");
    }

    // Custom rules rebuild the cached entry; without them the entry is reused.
    fn load_rules(
        &self,
        key: &str,
        builtin: fn() -> Vec<ValidationRule>,
        custom: &[ValidationRule],
    ) -> Vec<ValidationRule> {
        if custom.is_empty()
            && let Some(cached) = self.rule_cache.get(key)
        {
            return cached.value().clone();
        }
        let mut rules = builtin();
        rules.extend(custom.iter().cloned());
        self.rule_cache.insert(key.to_string(), rules.clone());
        rules
    }
}

fn build_report(
    validation_type: ValidationType,
    source_id: Option<&str>,
    records: &[DataRecord],
    rules: &[ValidationRule],
) -> ComplianceReport {
    let details: Vec<RecordValidation> = records
        .iter()
        .enumerate()
        .map(|(index, record)| validate_record(index, record, rules, validation_type))
        .collect();
    let valid_records = details.iter().filter(|detail| detail.valid).count();
    let total_records = details.len();
    let compliance_score = if total_records == 0 {
        100.0
    } else {
        valid_records as f64 * 100.0 / total_records as f64
    };

    ComplianceReport {
        validation_id: new_id("val"),
        validation_type,
        source_id: source_id.map(str::to_string),
        summary: ComplianceSummary {
            total_records,
            valid_records,
            invalid_records: total_records - valid_records,
            compliance_score,
            applied_rules: rules.len(),
        },
        details,
        generated_at: Utc::now(),
        success: true,
    }
}

fn validate_record(
    record_index: usize,
    record: &DataRecord,
    rules: &[ValidationRule],
    validation_type: ValidationType,
) -> RecordValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let check = if validation_type == ValidationType::ApiCompliance {
        check_api_rule
    } else {
        check_rule
    };
    for rule in rules {
        match check(rule, record) {
            CheckOutcome::Passed => {}
            CheckOutcome::Failed if validation_type == ValidationType::BusinessRules => {
                errors.push(format!("Business rule violation: {}", rule.field_name));
            }
            CheckOutcome::Failed => errors.push(failure_message(rule)),
            CheckOutcome::Unsupported => warnings.push(unsupported_message(rule)),
        }
    }

    RecordValidation {
        record_index,
        record_id: record.get("id").filter(|id| !id.is_null()).cloned(),
        valid: errors.is_empty(),
        validation_errors: errors,
        validation_warnings: warnings,
    }
}

fn unsupported_message(rule: &ValidationRule) -> String {
    if rule.rule_type.is_expression() {
        format!(
            "{}: unsupported {} expression '{}'",
            rule.field_name, rule.rule_type, rule.rule_value
        )
    } else {
        format!("{}: rule could not be evaluated", rule.field_name)
    }
}
