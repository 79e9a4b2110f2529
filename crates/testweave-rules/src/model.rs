use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a rule value is interpreted against a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// Field must be present and non-null.
    Required,
    /// Field must equal one of the comma-separated values.
    Enum,
    /// Numeric field within an inclusive `min-max` range.
    Range,
    Uuid,
    Email,
    Phone,
    Url,
    /// ISO-8601 date-time.
    Datetime,
    /// `IF <condition> THEN <condition>` or a bare condition.
    Conditional,
    /// `field = <arithmetic>`.
    Calculation,
    /// `a REQUIRES b`, `a EXCLUDES b` or a field-to-field condition.
    Relationship,
    /// Any rule type this engine does not evaluate.
    #[serde(other)]
    Unknown,
}

impl RuleType {
    pub fn name(self) -> &'static str {
        match self {
            RuleType::Required => "REQUIRED",
            RuleType::Enum => "ENUM",
            RuleType::Range => "RANGE",
            RuleType::Uuid => "UUID",
            RuleType::Email => "EMAIL",
            RuleType::Phone => "PHONE",
            RuleType::Url => "URL",
            RuleType::Datetime => "DATETIME",
            RuleType::Conditional => "CONDITIONAL",
            RuleType::Calculation => "CALCULATION",
            RuleType::Relationship => "RELATIONSHIP",
            RuleType::Unknown => "UNKNOWN",
        }
    }

    /// Format rules check the textual shape of a single value.
    pub fn is_format(self) -> bool {
        matches!(
            self,
            RuleType::Uuid | RuleType::Email | RuleType::Phone | RuleType::Url | RuleType::Datetime
        )
    }

    /// Expression rules evaluate a whole record.
    pub fn is_expression(self) -> bool {
        matches!(
            self,
            RuleType::Conditional | RuleType::Calculation | RuleType::Relationship
        )
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    Builtin,
    #[default]
    Custom,
}

/// Validation category a rule set feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Bpmn,
    Api,
    Business,
}

/// A single validation rule.
///
/// Business rules are usually written as `{ruleName, ruleType, ruleExpression}`;
/// those names are accepted as aliases of `fieldName` and `ruleValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    /// Field the rule applies to, or the rule name for expression rules.
    #[serde(alias = "ruleName")]
    pub field_name: String,
    /// Rule type; unrecognized names are accepted and skipped by evaluation.
    #[schemars(with = "String")]
    pub rule_type: RuleType,
    /// Type-specific value: enum list, range, or rule expression.
    #[serde(default, alias = "ruleExpression")]
    pub rule_value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: RuleSource,
}

impl ValidationRule {
    pub fn new(
        field_name: impl Into<String>,
        rule_type: RuleType,
        rule_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            rule_type,
            rule_value: rule_value.into(),
            description: description.into(),
            source: RuleSource::Custom,
        }
    }

    pub(crate) fn builtin(mut self) -> Self {
        self.source = RuleSource::Builtin;
        self
    }

    /// `field:TYPE` label used in applied-rule listings.
    pub fn label(&self) -> String {
        format!("{}:{}", self.field_name, self.rule_type)
    }
}

/// Rule document grouping rules per validation category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Rule document contract version.
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub bpmn_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub api_rules: Vec<ValidationRule>,
    #[serde(default)]
    pub business_rules: Vec<ValidationRule>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl RuleSet {
    pub fn rules(&self, category: RuleCategory) -> &[ValidationRule] {
        match category {
            RuleCategory::Bpmn => &self.bpmn_rules,
            RuleCategory::Api => &self.api_rules,
            RuleCategory::Business => &self.business_rules,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bpmn_rules.is_empty() && self.api_rules.is_empty() && self.business_rules.is_empty()
    }
}

/// Parse an inclusive `min-max` range. The separator is the first `-` after
/// the leading character, so negative minimums parse.
pub fn parse_range(value: &str) -> Option<(f64, f64)> {
    let value = value.trim();
    let mut chars = value.char_indices();
    chars.next()?;
    let split = chars.find(|(_, c)| *c == '-').map(|(idx, _)| idx)?;
    let min = value[..split].trim().parse::<f64>().ok()?;
    let max = value[split + 1..].trim().parse::<f64>().ok()?;
    if min > max {
        return None;
    }
    Some((min, max))
}

/// Split a comma-separated enum value into trimmed, non-empty members.
pub fn parse_enum_values(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_parse_with_negative_minimum() {
        assert_eq!(parse_range("1-5"), Some((1.0, 5.0)));
        assert_eq!(parse_range(" 18 - 120 "), Some((18.0, 120.0)));
        assert_eq!(parse_range("-5-10"), Some((-5.0, 10.0)));
        assert_eq!(parse_range("0.5-1.5"), Some((0.5, 1.5)));
        assert_eq!(parse_range("5-1"), None);
        assert_eq!(parse_range("five"), None);
        assert_eq!(parse_range(""), None);
    }

    #[test]
    fn enum_values_are_trimmed() {
        assert_eq!(
            parse_enum_values("ACTIVE, INACTIVE,,PENDING"),
            vec!["ACTIVE", "INACTIVE", "PENDING"]
        );
    }

    #[test]
    fn business_rule_aliases_and_unknown_types_parse() {
        let rule: ValidationRule = serde_json::from_value(serde_json::json!({
            "ruleName": "discount",
            "ruleType": "CONDITIONAL",
            "ruleExpression": "IF tier = 'gold' THEN discount >= 10"
        }))
        .expect("parse business rule");
        assert_eq!(rule.field_name, "discount");
        assert_eq!(rule.rule_type, RuleType::Conditional);
        assert!(rule.rule_value.starts_with("IF"));
        assert_eq!(rule.source, RuleSource::Custom);

        let unknown: ValidationRule = serde_json::from_value(serde_json::json!({
            "fieldName": "x",
            "ruleType": "CHECKSUM"
        }))
        .expect("parse unknown rule");
        assert_eq!(unknown.rule_type, RuleType::Unknown);
    }
}
