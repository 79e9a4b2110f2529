//! Core contracts shared across testweave crates.
//!
//! This crate defines the dependency graph model (typed edges between data
//! elements), the data-flow graph built from API/BPMN/business-rule candidates,
//! and the generation request/result types exchanged by the orchestrator,
//! the context store and the validation pipeline.

pub mod candidates;
pub mod dependency;
pub mod error;
pub mod flow;
pub mod ids;
pub mod request;
pub mod result;
pub mod validation;

pub use candidates::{
    ApiDependency, ApiDependencyKind, BpmnDependency, BpmnDependencyKind, BusinessRuleDependency,
    CandidateEdge, Provenance, RuleScope, count_by_provenance,
};
pub use dependency::{
    DataDependency, DependencyStatus, DependencyStrength, DependencyType, resolution_order,
};
pub use error::{CoreError, Result};
pub use flow::{DataFlowGraph, DataFlowNode, FlowGraphReport, FlowGraphSummary};
pub use ids::new_id;
pub use request::{
    DEFAULT_QUALITY_LEVEL, DEFAULT_RECORD_COUNT, GenerationRequest, GenerationScope,
};
pub use result::{DataRecord, GeneratedDataResult, QualityReport, ValidationOutcome};
pub use validation::{DependencyIssue, check_dependency_endpoints};
