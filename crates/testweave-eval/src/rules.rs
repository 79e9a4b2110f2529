use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

use testweave_core::DataRecord;
use testweave_rules::{RuleType, ValidationRule, parse_enum_values, parse_range};

use crate::expression::{CheckOutcome, as_number, evaluate_rule, is_match, value_text};

pub(crate) static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").ok()
});
static PHONE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").ok());
static UUID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$").ok()
});
static URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^https?://[\w.-]+\.[a-zA-Z]{2,}(?:/\S*)?$").ok());

/// Evaluate one rule against one record.
///
/// Field rules skip absent or null values unless the rule is `REQUIRED`;
/// expression rules read whatever fields their expression names.
pub fn check_rule(rule: &ValidationRule, record: &DataRecord) -> CheckOutcome {
    if rule.rule_type.is_expression() {
        return evaluate_rule(rule.rule_type, &rule.rule_value, record);
    }

    let Some(value) = record.get(&rule.field_name).filter(|value| !value.is_null()) else {
        return CheckOutcome::from_bool(rule.rule_type != RuleType::Required);
    };

    match rule.rule_type {
        RuleType::Enum => check_enum(value, &rule.rule_value),
        RuleType::Range => check_range(value, &rule.rule_value),
        RuleType::Uuid => check_format(&UUID, value),
        RuleType::Email => check_format(&EMAIL, value),
        RuleType::Phone => check_format(&PHONE, value),
        RuleType::Url => check_format(&URL, value),
        RuleType::Datetime => CheckOutcome::from_bool(value.as_str().is_some_and(is_iso_datetime)),
        _ => CheckOutcome::Passed,
    }
}

/// Evaluate one API-contract rule against one record.
///
/// Same as [`check_rule`], except that format rules (`UUID`, `EMAIL`,
/// `PHONE`, `URL`, `DATETIME`) fail when the field is absent or null.
pub fn check_api_rule(rule: &ValidationRule, record: &DataRecord) -> CheckOutcome {
    let missing = record.get(&rule.field_name).is_none_or(Value::is_null);
    if rule.rule_type.is_format() && missing {
        return CheckOutcome::Failed;
    }
    check_rule(rule, record)
}

/// Message recorded when a field rule fails.
pub(crate) fn failure_message(rule: &ValidationRule) -> String {
    if rule.description.trim().is_empty() {
        format!("{}: failed {} check", rule.field_name, rule.rule_type)
    } else {
        format!("{}: {}", rule.field_name, rule.description)
    }
}

fn check_enum(value: &Value, allowed: &str) -> CheckOutcome {
    let text = value_text(value);
    CheckOutcome::from_bool(parse_enum_values(allowed).iter().any(|item| *item == text))
}

// A range that does not parse fails every value.
fn check_range(value: &Value, range: &str) -> CheckOutcome {
    match (as_number(value), parse_range(range)) {
        (Some(number), Some((min, max))) => CheckOutcome::from_bool(number >= min && number <= max),
        _ => CheckOutcome::Failed,
    }
}

fn check_format(pattern: &LazyLock<Option<Regex>>, value: &Value) -> CheckOutcome {
    CheckOutcome::from_bool(value.as_str().is_some_and(|text| is_match(pattern, text)))
}

/// ISO-8601 date-time, with or without an offset.
pub(crate) fn is_iso_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M").is_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testweave_rules::{builtin_api_rules, builtin_bpmn_rules};

    use super::*;

    fn record(value: Value) -> DataRecord {
        value.as_object().cloned().expect("object record")
    }

    fn rule(field: &str, rule_type: RuleType, value: &str) -> ValidationRule {
        ValidationRule::new(field, rule_type, value, "")
    }

    #[test]
    fn range_one_to_five() {
        let range = rule("priority", RuleType::Range, "1-5");
        assert_eq!(check_rule(&range, &record(json!({ "priority": 6 }))), CheckOutcome::Failed);
        assert_eq!(check_rule(&range, &record(json!({ "priority": 3 }))), CheckOutcome::Passed);
        assert_eq!(check_rule(&range, &record(json!({ "priority": 5 }))), CheckOutcome::Passed);
        assert_eq!(check_rule(&range, &record(json!({ "priority": "2" }))), CheckOutcome::Passed);
        assert_eq!(check_rule(&range, &record(json!({ "priority": "high" }))), CheckOutcome::Failed);
        assert_eq!(
            check_rule(&rule("priority", RuleType::Range, "five"), &record(json!({ "priority": 3 }))),
            CheckOutcome::Failed
        );
    }

    #[test]
    fn null_values_fail_only_required_rules() {
        let row = record(json!({ "processId": null }));
        for rule in builtin_bpmn_rules() {
            let expected = if rule.rule_type == RuleType::Required {
                CheckOutcome::Failed
            } else {
                CheckOutcome::Passed
            };
            assert_eq!(check_rule(&rule, &row), expected, "{}", rule.label());
        }
        for rule in builtin_api_rules() {
            assert_eq!(check_rule(&rule, &row), CheckOutcome::Passed, "{}", rule.label());
        }
    }

    #[test]
    fn api_format_rules_fail_on_missing_values() {
        let row = record(json!({ "email": null }));
        for rule in builtin_api_rules() {
            let expected = if rule.rule_type.is_format() {
                CheckOutcome::Failed
            } else {
                CheckOutcome::Passed
            };
            assert_eq!(check_api_rule(&rule, &row), expected, "{}", rule.label());
        }

        let status = rule("status", RuleType::Enum, "ACTIVE,INACTIVE");
        assert_eq!(check_api_rule(&status, &row), CheckOutcome::Passed);
        assert_eq!(
            check_api_rule(&rule("email", RuleType::Required, ""), &row),
            CheckOutcome::Failed
        );
    }

    #[test]
    fn enum_matches_whole_members() {
        let status = rule("status", RuleType::Enum, "ACTIVE,INACTIVE,PENDING");
        assert_eq!(check_rule(&status, &record(json!({ "status": "ACTIVE" }))), CheckOutcome::Passed);
        assert_eq!(check_rule(&status, &record(json!({ "status": "ACT" }))), CheckOutcome::Failed);
        assert_eq!(check_rule(&status, &record(json!({ "status": "active" }))), CheckOutcome::Failed);
    }

    #[test]
    fn format_rules() {
        let row = record(json!({
            "id": "3f2b8c9e-4d1a-4b7c-9e2f-1a2b3c4d5e6f",
            "email": "ana@example.com",
            "phone": "+5511999990000",
            "url": "https://example.com/orders/1",
            "createdAt": "2024-05-01T10:15:30",
            "age": 30
        }));
        for rule in builtin_api_rules() {
            assert_eq!(check_rule(&rule, &row), CheckOutcome::Passed, "{}", rule.label());
        }

        let bad = record(json!({
            "id": "3F2B8C9E-4D1A-4B7C-9E2F-1A2B3C4D5E6F",
            "email": "bad-email",
            "phone": "0123",
            "url": "ftp://example.com",
            "createdAt": "yesterday",
            "age": 12
        }));
        for rule in builtin_api_rules() {
            assert_eq!(check_rule(&rule, &bad), CheckOutcome::Failed, "{}", rule.label());
        }
    }

    #[test]
    fn datetimes_accept_offsets_and_fractions() {
        assert!(is_iso_datetime("2024-05-01T10:15:30Z"));
        assert!(is_iso_datetime("2024-05-01T10:15:30.123+02:00"));
        assert!(is_iso_datetime("2024-05-01T10:15:30.5"));
        assert!(is_iso_datetime("2024-05-01T10:15"));
        assert!(!is_iso_datetime("2024-05-01"));
    }

    #[test]
    fn messages_fall_back_to_rule_type() {
        assert_eq!(
            failure_message(&rule("age", RuleType::Range, "18-120")),
            "age: failed RANGE check"
        );
        assert_eq!(
            failure_message(&ValidationRule::new("id", RuleType::Uuid, "", "ID must be a valid UUID")),
            "id: ID must be a valid UUID"
        );
    }
}
