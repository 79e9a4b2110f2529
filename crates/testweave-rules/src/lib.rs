//! Rule-set contracts for compliance validation.
//!
//! Rule providers (static config, BPMN/OpenAPI analyzers, databases) hand the
//! validation pipeline lists of `{fieldName, ruleType, ruleValue, description}`
//! rules. This crate owns that contract, the built-in rule sets, the JSON
//! Schema for rule documents and their structural validation.

pub mod builtin;
pub mod errors;
pub mod model;
pub mod schema;
pub mod validate;

pub use builtin::{builtin_api_rules, builtin_bpmn_rules};
pub use errors::{IssueSeverity, Result, RulesError, ValidationIssue, ValidationReport};
pub use model::{RuleCategory, RuleSet, RuleSource, RuleType, ValidationRule, parse_enum_values, parse_range};
pub use schema::rule_set_json_schema;
pub use validate::{ValidatedRuleSet, load_rule_set, validate_rule_set, validate_rule_set_json};
