//! Validation pipeline for generated test data.
//!
//! Records are checked against BPMN process rules, API format rules and
//! business-rule expressions, then for intra- and inter-record consistency.
//! A contextual validation runs whichever validators its context enables and
//! averages their scores into one compliance verdict.

pub mod consistency;
pub mod engine;
pub mod errors;
pub mod expression;
pub mod flow;
pub mod input;
pub mod model;
pub mod report;
pub mod rules;

pub use engine::ComplianceValidator;
pub use errors::{EvalError, Result};
pub use expression::{CheckOutcome, NUMERIC_TOLERANCE, evaluate_condition, evaluate_rule};
pub use flow::validate_data_flow;
pub use input::{read_context, read_records, records_from_value};
pub use model::{
    COMPLIANCE_THRESHOLD, ComplianceReport, ComplianceSummary, ConsistencyReport,
    ConsistencySummary, ContextualComplianceReport, FlowConsistencyReport, PipelineOptions,
    RecordConsistency, RecordValidation, SourceRules, ValidationContext, ValidationType,
};
pub use report::render_report;
pub use rules::{check_api_rule, check_rule};
