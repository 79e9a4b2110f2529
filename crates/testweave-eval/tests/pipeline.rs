use serde_json::{Value, json};
use testweave_core::{BpmnDependency, BpmnDependencyKind, DataFlowGraph, DataRecord};
use testweave_eval::{
    ComplianceValidator, PipelineOptions, ValidationContext, ValidationType, render_report,
};
use testweave_rules::{RuleType, ValidationRule};

fn records(value: Value) -> Vec<DataRecord> {
    value
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item.as_object().cloned().expect("object"))
        .collect()
}

fn order_records() -> Vec<DataRecord> {
    records(json!([
        {
            "id": "3f2b8c9e-4d1a-4b7c-9e2f-1a2b3c4d5e6f",
            "processId": "p1",
            "assignedTo": "ana",
            "status": "ACTIVE",
            "priority": 2,
            "email": "ana@example.com",
            "phone": "+15551234567",
            "url": "https://example.com/orders/1",
            "createdAt": "2024-05-01T10:15:30",
            "tier": "gold",
            "discount": 15
        },
        {
            "id": "9a8b7c6d-1e2f-4a3b-8c4d-5e6f7a8b9c0d",
            "processId": "p2",
            "assignedTo": "bia",
            "status": "DONE",
            "priority": 3,
            "email": "bia@example.com",
            "phone": "+15551234567",
            "url": "https://example.com/orders/1",
            "createdAt": "2024-05-01T10:15:30",
            "tier": "gold",
            "discount": 5
        }
    ]))
}

#[test]
fn bpmn_range_rule_splits_records() {
    let validator = ComplianceValidator::default();
    let data = records(json!([
        { "processId": "p1", "assignedTo": "ana", "status": "ACTIVE", "priority": 6 },
        { "processId": "p2", "assignedTo": "bia", "status": "PENDING", "priority": 3 }
    ]));

    let report = validator.validate_bpmn_compliance(&data, "order-process", &[]);

    assert_eq!(report.validation_type, ValidationType::BpmnCompliance);
    assert_eq!(report.source_id.as_deref(), Some("order-process"));
    assert_eq!(report.summary.total_records, 2);
    assert_eq!(report.summary.valid_records, 1);
    assert_eq!(report.summary.invalid_records, 1);
    assert_eq!(report.summary.compliance_score, 50.0);
    assert_eq!(report.summary.applied_rules, 4);
    assert_eq!(
        report.details[0].validation_errors,
        vec!["priority: Priority must be between 1 and 5".to_string()]
    );
    assert!(report.details[1].valid);

    let value = serde_json::to_value(&report).expect("serialize");
    assert_eq!(value["summary"]["complianceScore"], 50.0);
    assert_eq!(value["validationType"], "BPMN_COMPLIANCE");
}

#[test]
fn duplicate_ids_and_bad_email_lower_consistency() {
    let validator = ComplianceValidator::default();
    let data = records(json!([
        { "id": "1", "email": "a@b.com" },
        { "id": "1", "email": "bad-email" }
    ]));

    let report = validator.validate_data_consistency(&data);

    assert_eq!(
        report.inter_record_issues,
        vec!["Duplicate IDs found: [1]".to_string()]
    );
    assert!(report.details[0].consistency_issues.is_empty());
    assert_eq!(
        report.details[1].consistency_issues,
        vec!["Invalid email format".to_string()]
    );
    assert_eq!(report.summary.internal_consistency_score, 95.0);
    assert_eq!(report.summary.inter_record_consistency_score, 75.0);
    assert_eq!(report.summary.consistency_score, 85.0);
    assert!(report.summary.consistency_score < 100.0);
}

#[test]
fn rule_cache_reuses_and_rebuilds_entries() {
    let validator = ComplianceValidator::default();
    let data = records(json!([{ "processId": "p1", "assignedTo": "ana", "channel": "FAX" }]));
    let channel = ValidationRule::new("channel", RuleType::Enum, "WEB,STORE", "Unknown channel");

    let first = validator.validate_bpmn_compliance(&data, "d1", std::slice::from_ref(&channel));
    assert_eq!(first.summary.applied_rules, 5);
    assert_eq!(first.summary.invalid_records, 1);
    assert_eq!(validator.cached_rules("bpmn:d1").map(|rules| rules.len()), Some(5));

    let reused = validator.validate_bpmn_compliance(&data, "d1", &[]);
    assert_eq!(reused.summary.applied_rules, 5);
    assert_eq!(reused.summary.invalid_records, 1);

    let widened = ValidationRule::new("channel", RuleType::Enum, "WEB,STORE,FAX", "Unknown channel");
    let rebuilt = validator.validate_bpmn_compliance(&data, "d1", &[widened]);
    assert_eq!(rebuilt.summary.valid_records, 1);

    let other = validator.validate_bpmn_compliance(&data, "d2", &[]);
    assert_eq!(other.summary.applied_rules, 4);
    assert!(validator.cached_rules("api:d1").is_none());

    validator.clear_cache();
    assert!(validator.cached_rules("bpmn:d1").is_none());
}

#[test]
fn unsupported_business_rules_warn_without_failing() {
    let validator = ComplianceValidator::default();
    let rules: Vec<ValidationRule> = serde_json::from_value(json!([
        { "ruleName": "name-pattern", "ruleType": "CONDITIONAL", "ruleExpression": "name LIKE 'A%'" },
        { "ruleName": "coupon-needs-discount", "ruleType": "RELATIONSHIP", "ruleExpression": "coupon REQUIRES discount" },
        { "ruleName": "checksum", "ruleType": "CHECKSUM", "ruleExpression": "luhn(card)" }
    ]))
    .expect("rules");
    let data = records(json!([
        { "name": "Ana", "coupon": "X1", "discount": 5 },
        { "name": "Bia", "coupon": "X2" }
    ]));

    let report = validator.validate_business_rules(&data, &rules);

    assert_eq!(report.summary.applied_rules, 3);
    assert!(report.details[0].valid);
    assert_eq!(
        report.details[0].validation_warnings,
        vec!["name-pattern: unsupported CONDITIONAL expression 'name LIKE 'A%''".to_string()]
    );
    assert!(!report.details[1].valid);
    assert_eq!(
        report.details[1].validation_errors,
        vec!["Business rule violation: coupon-needs-discount".to_string()]
    );
    assert_eq!(report.summary.compliance_score, 50.0);
}

#[test]
fn contextual_validation_averages_present_scores() {
    let context = json!({
        "bpmnContext": {},
        "diagramId": "order-process",
        "apiContext": {},
        "specId": "orders-api",
        "businessRules": [
            { "ruleName": "gold-discount", "ruleType": "CONDITIONAL",
              "ruleExpression": "IF tier = 'gold' THEN discount >= 10" }
        ]
    });
    let context = ValidationContext::from_map(context.as_object().expect("object")).expect("context");
    let validator = ComplianceValidator::default();
    let data = order_records();

    let report = validator.validate_contextual_compliance(&data, &context);

    assert_eq!(report.validation_type, ValidationType::Contextual);
    assert_eq!(report.total_records, 2);
    let bpmn = report.bpmn_validation.as_ref().expect("bpmn");
    let api = report.api_validation.as_ref().expect("api");
    let business = report.business_rules_validation.as_ref().expect("business");
    assert_eq!(bpmn.summary.compliance_score, 50.0);
    assert_eq!(api.summary.compliance_score, 100.0);
    assert_eq!(business.summary.compliance_score, 50.0);
    assert_eq!(report.consistency_validation.summary.consistency_score, 97.5);
    assert!(report.data_flow_validation.is_none());
    assert_eq!(report.overall_compliance_score, 74.375);
    assert!(!report.is_compliant);

    let lenient = ComplianceValidator::new(PipelineOptions {
        compliance_threshold: 70.0,
        ..PipelineOptions::default()
    });
    assert!(lenient.validate_contextual_compliance(&data, &context).is_compliant);

    let markdown = render_report(&report, 10);
    assert!(markdown.starts_with("# Testweave Compliance Report"));
    assert!(markdown.contains("- compliant: no"));
    assert!(markdown.contains("| bpmn | order-process | 1 | 1 | 4 | 50.00 |"));
    assert!(markdown.contains("| consistency | - | - | - | - | 97.50 |"));
    assert!(markdown.contains("Business rule violation: gold-discount"));
    assert!(markdown.contains("## Recommendations"));
    assert!(markdown.contains("- align generator constraints with the failing business rules."));
}

#[test]
fn data_flow_graph_joins_the_mean() {
    let mut graph = DataFlowGraph::new();
    graph.add_bpmn_dependency(&BpmnDependency {
        process_id: "order".to_string(),
        source_task: "create".to_string(),
        target_task: "approve".to_string(),
        kind: BpmnDependencyKind::TaskToTask,
        strength: None,
        gateway_condition: None,
        created_data: vec!["orderId".to_string()],
        consumed_data: vec!["orderId".to_string()],
    });
    graph.add_connection("approve", "ship");

    let context = json!({
        "bpmnContext": {},
        "diagramId": "order-process",
        "apiContext": {},
        "specId": "orders-api",
        "businessRules": [
            { "ruleName": "gold-discount", "ruleType": "CONDITIONAL",
              "ruleExpression": "IF tier = 'gold' THEN discount >= 10" }
        ],
        "dataFlowGraph": serde_json::to_value(&graph).expect("graph json")
    });
    let context = ValidationContext::from_map(context.as_object().expect("object")).expect("context");
    let report = ComplianceValidator::default().validate_contextual_compliance(&order_records(), &context);

    let flow = report.data_flow_validation.as_ref().expect("flow report");
    assert_eq!(flow.consistency_score, 95.0);
    assert_eq!(flow.dangling_connections, vec!["approve -> ship".to_string()]);
    assert_eq!(report.overall_compliance_score, 78.5);

    let markdown = render_report(&report, 5);
    assert!(markdown.contains("## Cross-record issues"));
    assert!(markdown.contains("Connection approve -> ship references an unregistered node"));
}

#[test]
fn api_format_rules_reject_missing_fields() {
    let validator = ComplianceValidator::default();
    let data = records(json!([{ "id": "3f2b8c9e-4d1a-4b7c-9e2f-1a2b3c4d5e6f" }]));

    let report = validator.validate_api_compliance(&data, "orders-api", &[]);
    assert_eq!(report.summary.valid_records, 0);
    assert_eq!(report.summary.compliance_score, 0.0);
    let errors = &report.details[0].validation_errors;
    assert_eq!(errors.len(), 4);
    for field in ["email", "phone", "url", "createdAt"] {
        assert!(
            errors.iter().any(|error| error.starts_with(&format!("{field}: "))),
            "{field} missing from {errors:?}"
        );
    }

    let bpmn = validator.validate_bpmn_compliance(
        &records(json!([{ "processId": "p1", "assignedTo": "ana" }])),
        "order-process",
        &[],
    );
    assert_eq!(bpmn.summary.compliance_score, 100.0);
}

#[test]
fn empty_record_sets_are_fully_compliant() {
    let validator = ComplianceValidator::default();
    let context = ValidationContext::default().with_bpmn("d", Vec::new());
    let report = validator.validate_contextual_compliance(&[], &context);
    let bpmn = report.bpmn_validation.as_ref().expect("bpmn");
    assert_eq!(bpmn.summary.compliance_score, 100.0);
    assert_eq!(report.overall_compliance_score, (100.0 + 97.5) / 2.0);
    assert!(report.is_compliant);
}
