use crate::model::{ComplianceReport, ContextualComplianceReport, ValidationType};

/// Render a deterministic markdown report for a contextual validation.
pub fn render_report(report: &ContextualComplianceReport, max_examples: usize) -> String {
    let mut lines = Vec::new();

    lines.push("# Testweave Compliance Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- validation_id: {}", report.validation_id));
    lines.push(format!("- records: {}", report.total_records));
    lines.push(format!(
        "- overall_compliance_score: {:.2}",
        report.overall_compliance_score
    ));
    lines.push(format!(
        "- compliant: {}",
        if report.is_compliant { "yes" } else { "no" }
    ));
    lines.push(String::new());

    lines.push("## Category scores".to_string());
    lines.push("| category | source | valid | invalid | rules | score |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for category in report.compliance_reports() {
        push_category_row(&mut lines, category);
    }
    let consistency = &report.consistency_validation.summary;
    lines.push(format!(
        "| consistency | - | - | - | - | {:.2} |",
        consistency.consistency_score
    ));
    if let Some(flow) = &report.data_flow_validation {
        lines.push(format!(
            "| data_flow | {} nodes / {} edges | - | - | - | {:.2} |",
            flow.nodes, flow.edges, flow.consistency_score
        ));
    }
    lines.push(String::new());

    let warnings: Vec<String> = report
        .compliance_reports()
        .flat_map(|category| {
            category.details.iter().flat_map(move |detail| {
                detail.validation_warnings.iter().map(move |warning| {
                    format!(
                        "- {} record {}: {}",
                        category.validation_type, detail.record_index, warning
                    )
                })
            })
        })
        .collect();
    if !warnings.is_empty() {
        lines.push("## Warnings".to_string());
        lines.extend(warnings.into_iter().take(max_examples));
        lines.push(String::new());
    }

    let errors = top_errors(report);
    if !errors.is_empty() {
        lines.push("## Top record errors".to_string());
        lines.extend(errors.into_iter().take(max_examples));
        lines.push(String::new());
    }

    let flow_issues = report
        .data_flow_validation
        .as_ref()
        .map(|flow| flow.issues.as_slice())
        .unwrap_or_default();
    if !report.consistency_validation.inter_record_issues.is_empty() || !flow_issues.is_empty() {
        lines.push("## Cross-record issues".to_string());
        for issue in report
            .consistency_validation
            .inter_record_issues
            .iter()
            .chain(flow_issues)
        {
            lines.push(format!("- {issue}"));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report));
    lines.join("\n")
}

fn push_category_row(lines: &mut Vec<String>, category: &ComplianceReport) {
    let name = match category.validation_type {
        ValidationType::BpmnCompliance => "bpmn",
        ValidationType::ApiCompliance => "api",
        ValidationType::BusinessRules => "business_rules",
        _ => "other",
    };
    lines.push(format!(
        "| {} | {} | {} | {} | {} | {:.2} |",
        name,
        category.source_id.as_deref().unwrap_or("-"),
        category.summary.valid_records,
        category.summary.invalid_records,
        category.summary.applied_rules,
        category.summary.compliance_score
    ));
}

fn top_errors(report: &ContextualComplianceReport) -> Vec<String> {
    let mut errors = Vec::new();
    for category in report.compliance_reports() {
        for detail in &category.details {
            let id = detail
                .record_id
                .as_ref()
                .map(|id| format!(" (id={id})"))
                .unwrap_or_default();
            for error in &detail.validation_errors {
                errors.push(format!(
                    "- {} record {}{}: {}",
                    category.validation_type, detail.record_index, id, error
                ));
            }
        }
    }
    for detail in &report.consistency_validation.details {
        for issue in &detail.consistency_issues {
            errors.push(format!(
                "- {} record {}: {}",
                ValidationType::DataConsistency,
                detail.record_index,
                issue
            ));
        }
    }
    errors
}

fn recommendations(report: &ContextualComplianceReport) -> Vec<String> {
    let mut lines = Vec::new();
    let invalid = |category: &Option<ComplianceReport>| {
        category
            .as_ref()
            .is_some_and(|category| category.summary.invalid_records > 0)
    };
    if invalid(&report.bpmn_validation) {
        lines.push("- fill required process fields and keep status/priority within allowed values.".to_string());
    }
    if invalid(&report.api_validation) {
        lines.push("- regenerate fields with malformed uuid, email, phone, url or datetime values.".to_string());
    }
    if invalid(&report.business_rules_validation) {
        lines.push("- align generator constraints with the failing business rules.".to_string());
    }
    let consistency = &report.consistency_validation;
    if !consistency.inter_record_issues.is_empty()
        || consistency
            .details
            .iter()
            .any(|detail| !detail.consistency_issues.is_empty())
    {
        lines.push("- deduplicate record ids and keep derived fields such as age consistent.".to_string());
    }
    if report
        .data_flow_validation
        .as_ref()
        .is_some_and(|flow| !flow.issues.is_empty())
    {
        lines.push("- break data-flow cycles and register every referenced node.".to_string());
    }
    if report
        .compliance_reports()
        .any(|category| category.details.iter().any(|detail| !detail.validation_warnings.is_empty()))
    {
        lines.push("- rewrite unsupported rule expressions in the supported grammar.".to_string());
    }
    if lines.is_empty() {
        lines.push("- no issues detected; compare scores across runs for drift.".to_string());
    }
    lines
}
