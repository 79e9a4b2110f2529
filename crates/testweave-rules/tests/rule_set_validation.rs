use serde_json::json;
use testweave_rules::{RuleType, load_rule_set, rule_set_json_schema, validate_rule_set_json};

fn schema_json() -> serde_json::Value {
    serde_json::to_value(rule_set_json_schema()).expect("serialize rule schema")
}

#[test]
fn well_formed_rule_document_loads() {
    let rules = json!({
        "version": "1.0",
        "bpmnRules": [
            { "fieldName": "priority", "ruleType": "RANGE", "ruleValue": "1-3" }
        ],
        "apiRules": [
            { "fieldName": "email", "ruleType": "EMAIL", "description": "contact email" }
        ],
        "businessRules": [
            {
                "fieldName": "discount",
                "ruleType": "CONDITIONAL",
                "ruleValue": "IF tier = 'gold' THEN discount >= 10"
            }
        ]
    });

    let validated = load_rule_set(&rules, &schema_json()).expect("rule set should load");
    assert!(validated.warnings.is_empty(), "unexpected warnings");
    assert_eq!(validated.rule_set.bpmn_rules[0].rule_type, RuleType::Range);
    assert_eq!(validated.rule_set.business_rules.len(), 1);
}

#[test]
fn structural_errors_point_at_the_offending_rule() {
    let rules = json!({
        "apiRules": [
            { "ruleType": "EMAIL" }
        ]
    });

    let report = validate_rule_set_json(&rules, &schema_json()).expect("compile schema");
    assert!(!report.is_ok());
    assert_eq!(report.errors[0].path, "/apiRules/0");
    assert_eq!(report.errors[0].code, "schema_violation");
}

#[test]
fn semantic_errors_reject_the_document() {
    let rules = json!({
        "bpmnRules": [
            { "fieldName": "priority", "ruleType": "RANGE", "ruleValue": "9-1" }
        ]
    });

    let report = load_rule_set(&rules, &schema_json()).expect_err("bad range must fail");
    assert_eq!(report.errors[0].code, "range_invalid");
}
