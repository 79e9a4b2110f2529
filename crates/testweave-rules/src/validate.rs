use std::collections::HashSet;

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{IssueSeverity, RulesError, ValidationIssue, ValidationReport};
use crate::model::{RuleCategory, RuleSet, RuleType, ValidationRule, parse_enum_values, parse_range};

/// Validated rule set with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedRuleSet {
    pub rule_set: RuleSet,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a rule document against the rule-set JSON Schema.
pub fn validate_rule_set_json(
    rules_json: &Value,
    rules_schema: &Value,
) -> Result<ValidationReport, RulesError> {
    let compiled =
        JSONSchema::compile(rules_schema).map_err(|err| RulesError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(rules_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Check the rules of a parsed rule set for values the evaluator cannot use.
pub fn validate_rule_set(rule_set: &RuleSet) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (category, key) in [
        (RuleCategory::Bpmn, "bpmnRules"),
        (RuleCategory::Api, "apiRules"),
        (RuleCategory::Business, "businessRules"),
    ] {
        validate_rules(category, key, rule_set.rules(category), &mut report);
    }

    report
}

/// Validate a rule document end-to-end, returning structured issues on failure.
pub fn load_rule_set(
    rules_json: &Value,
    rules_schema: &Value,
) -> Result<ValidatedRuleSet, ValidationReport> {
    let structural = match validate_rule_set_json(rules_json, rules_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "schema_validation_error",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let rule_set: RuleSet = match serde_json::from_value(rules_json.clone()) {
        Ok(rule_set) => rule_set,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "invalid_rules_json",
                "/",
                err.to_string(),
                None,
            ));
            return Err(report);
        }
    };

    let semantic = validate_rule_set(&rule_set);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedRuleSet {
        rule_set,
        warnings: semantic.warnings,
    })
}

fn validate_rules(
    category: RuleCategory,
    key: &str,
    rules: &[ValidationRule],
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::new();

    for (idx, rule) in rules.iter().enumerate() {
        let path = format!("/{key}/{idx}");

        if rule.field_name.trim().is_empty() {
            report.push_error(ValidationIssue::new(
                IssueSeverity::Error,
                "field_name_empty",
                format!("{path}/fieldName"),
                "rule has an empty field name".to_string(),
                Some("set fieldName (or ruleName for business rules)".to_string()),
            ));
        }

        match rule.rule_type {
            RuleType::Range => {
                if parse_range(&rule.rule_value).is_none() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "range_invalid",
                        format!("{path}/ruleValue"),
                        format!("range '{}' is not a 'min-max' pair", rule.rule_value),
                        Some("use an inclusive numeric range such as 1-5".to_string()),
                    ));
                }
            }
            RuleType::Enum => {
                if parse_enum_values(&rule.rule_value).is_empty() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "enum_empty",
                        format!("{path}/ruleValue"),
                        "enum rule lists no allowed values".to_string(),
                        Some("list allowed values separated by commas".to_string()),
                    ));
                }
            }
            RuleType::Conditional | RuleType::Calculation | RuleType::Relationship => {
                if rule.rule_value.trim().is_empty() {
                    report.push_error(ValidationIssue::new(
                        IssueSeverity::Error,
                        "expression_empty",
                        format!("{path}/ruleValue"),
                        format!("{} rule has no expression", rule.rule_type),
                        None,
                    ));
                }
                if category != RuleCategory::Business {
                    report.push_warning(ValidationIssue::new(
                        IssueSeverity::Warning,
                        "expression_outside_business_rules",
                        format!("{path}/ruleType"),
                        format!(
                            "{} rules are only evaluated in businessRules",
                            rule.rule_type
                        ),
                        None,
                    ));
                }
            }
            RuleType::Unknown => {
                report.push_warning(ValidationIssue::new(
                    IssueSeverity::Warning,
                    "rule_type_unsupported",
                    format!("{path}/ruleType"),
                    format!("rule '{}' has an unsupported type and is skipped", rule.field_name),
                    None,
                ));
            }
            RuleType::Required
            | RuleType::Uuid
            | RuleType::Email
            | RuleType::Phone
            | RuleType::Url
            | RuleType::Datetime => {}
        }

        if !seen.insert((rule.field_name.clone(), rule.rule_type)) {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "rule_duplicate",
                path,
                format!("duplicate rule {}", rule.label()),
                None,
            ));
        }
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
