//! Typed dependency candidates inferred by external analyzers.
//!
//! API, BPMN and business-rule analyzers describe relationships in their own
//! vocabulary. Each candidate converts into a plain [`DataDependency`] so it
//! can be registered on a generation context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dependency::{DataDependency, DependencyStrength, DependencyType};
use crate::error::Result;

/// Source system that inferred a candidate edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Api,
    Bpmn,
    BusinessRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiDependencyKind {
    DirectResponse,
    ForeignKey,
    ParentChild,
    Sequence,
    Authentication,
    QueryParam,
    PathParam,
    MasterData,
    LookupTable,
    ContextSharing,
}

impl ApiDependencyKind {
    fn dependency_type(self) -> DependencyType {
        match self {
            ApiDependencyKind::ForeignKey
            | ApiDependencyKind::ParentChild
            | ApiDependencyKind::MasterData
            | ApiDependencyKind::LookupTable => DependencyType::Reference,
            ApiDependencyKind::Sequence | ApiDependencyKind::Authentication => {
                DependencyType::Prerequisite
            }
            ApiDependencyKind::DirectResponse
            | ApiDependencyKind::QueryParam
            | ApiDependencyKind::PathParam
            | ApiDependencyKind::ContextSharing => DependencyType::Transformation,
        }
    }

    fn default_strength(self) -> DependencyStrength {
        match self {
            ApiDependencyKind::Authentication => DependencyStrength::Critical,
            ApiDependencyKind::ForeignKey | ApiDependencyKind::ParentChild => {
                DependencyStrength::MediumHigh
            }
            ApiDependencyKind::LookupTable | ApiDependencyKind::ContextSharing => {
                DependencyStrength::MediumLow
            }
            _ => DependencyStrength::Medium,
        }
    }
}

/// Relationship between two API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDependency {
    pub source_endpoint: String,
    pub source_method: String,
    pub target_endpoint: String,
    pub target_method: String,
    pub kind: ApiDependencyKind,
    #[serde(default)]
    pub strength: Option<DependencyStrength>,
    #[serde(default)]
    pub shared_fields: Vec<String>,
    #[serde(default)]
    pub created_fields: Vec<String>,
    #[serde(default)]
    pub consumed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ApiDependency {
    pub fn source_key(&self) -> String {
        format!("{} {}", self.source_method.to_uppercase(), self.source_endpoint)
    }

    pub fn target_key(&self) -> String {
        format!("{} {}", self.target_method.to_uppercase(), self.target_endpoint)
    }

    /// Foreign keys, parent/child links, master data and lookup tables become
    /// `Reference`; sequences and authentication become `Prerequisite`; the
    /// remaining kinds pass data through and become `Transformation`.
    /// Authentication is critical unless an explicit strength is given.
    pub fn to_candidate(&self) -> Result<DataDependency> {
        let strength = self
            .strength
            .unwrap_or_else(|| self.kind.default_strength());
        let dependency = DataDependency::new(
            self.source_key(),
            self.target_key(),
            self.kind.dependency_type(),
            strength,
        )?
        .with_provenance(Provenance::Api)
        .with_metadata("apiDependencyKind", enum_label(&self.kind))
        .with_metadata("sharedFields", self.shared_fields.clone());
        Ok(dependency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BpmnDependencyKind {
    TaskToTask,
    GatewayData,
    EventData,
    SubprocessData,
    CallActivityData,
    SequenceData,
    MessageData,
    ProcessVariable,
    DataObject,
    UserJourney,
    StateTransition,
    ExceptionHandling,
}

impl BpmnDependencyKind {
    fn dependency_type(self) -> DependencyType {
        match self {
            BpmnDependencyKind::TaskToTask
            | BpmnDependencyKind::SequenceData
            | BpmnDependencyKind::UserJourney
            | BpmnDependencyKind::StateTransition => DependencyType::Prerequisite,
            BpmnDependencyKind::GatewayData | BpmnDependencyKind::ExceptionHandling => {
                DependencyType::Validation
            }
            BpmnDependencyKind::ProcessVariable | BpmnDependencyKind::DataObject => {
                DependencyType::Reference
            }
            BpmnDependencyKind::EventData
            | BpmnDependencyKind::SubprocessData
            | BpmnDependencyKind::CallActivityData
            | BpmnDependencyKind::MessageData => DependencyType::Transformation,
        }
    }
}

/// Data flowing between two BPMN elements of one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmnDependency {
    pub process_id: String,
    pub source_task: String,
    pub target_task: String,
    pub kind: BpmnDependencyKind,
    #[serde(default)]
    pub strength: Option<DependencyStrength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_condition: Option<String>,
    #[serde(default)]
    pub created_data: Vec<String>,
    #[serde(default)]
    pub consumed_data: Vec<String>,
}

impl BpmnDependency {
    /// Gateway dependencies carrying a condition default to `MediumHigh`,
    /// everything else to `Medium`.
    pub fn to_candidate(&self) -> Result<DataDependency> {
        let strength = self.strength.unwrap_or(match (&self.kind, &self.gateway_condition) {
            (BpmnDependencyKind::GatewayData, Some(_)) => DependencyStrength::MediumHigh,
            _ => DependencyStrength::Medium,
        });
        let mut dependency = DataDependency::new(
            self.source_task.clone(),
            self.target_task.clone(),
            self.kind.dependency_type(),
            strength,
        )?
        .with_provenance(Provenance::Bpmn)
        .with_metadata("processId", self.process_id.clone())
        .with_metadata("bpmnDependencyKind", enum_label(&self.kind));
        if let Some(condition) = &self.gateway_condition {
            dependency = dependency.with_metadata("gatewayCondition", condition.clone());
        }
        Ok(dependency)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleScope {
    FieldLevel,
    EntityLevel,
    ProcessLevel,
    SystemLevel,
    CrossSystem,
    ComplianceLevel,
}

/// Business rule that ties a set of affected fields to the fields it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRuleDependency {
    pub rule_id: String,
    pub rule_name: String,
    pub scope: RuleScope,
    #[serde(default)]
    pub affected_fields: Vec<String>,
    #[serde(default)]
    pub dependency_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_expression: Option<String>,
    #[serde(default)]
    pub strength: Option<DependencyStrength>,
}

impl BusinessRuleDependency {
    /// One `Validation` edge per (dependency field, affected field) pair.
    /// Compliance-level rules are critical by default.
    pub fn to_candidates(&self) -> Result<Vec<DataDependency>> {
        let strength = self.strength.unwrap_or(match self.scope {
            RuleScope::ComplianceLevel => DependencyStrength::Critical,
            RuleScope::CrossSystem | RuleScope::SystemLevel => DependencyStrength::MediumHigh,
            _ => DependencyStrength::Medium,
        });

        let mut candidates = Vec::new();
        for source in &self.dependency_fields {
            for target in &self.affected_fields {
                let mut dependency =
                    DataDependency::new(source, target, DependencyType::Validation, strength)?
                        .with_provenance(Provenance::BusinessRule)
                        .with_metadata("ruleId", self.rule_id.clone())
                        .with_metadata("ruleScope", enum_label(&self.scope));
                if let Some(expression) = &self.constraint_expression {
                    dependency = dependency.with_metadata("constraint", expression.clone());
                }
                candidates.push(dependency);
            }
        }
        Ok(candidates)
    }
}

/// Any typed candidate edge, as accepted by context import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provenance", rename_all = "snake_case")]
pub enum CandidateEdge {
    Api(ApiDependency),
    Bpmn(BpmnDependency),
    BusinessRule(BusinessRuleDependency),
}

impl CandidateEdge {
    pub fn provenance(&self) -> Provenance {
        match self {
            CandidateEdge::Api(_) => Provenance::Api,
            CandidateEdge::Bpmn(_) => Provenance::Bpmn,
            CandidateEdge::BusinessRule(_) => Provenance::BusinessRule,
        }
    }

    pub fn to_candidates(&self) -> Result<Vec<DataDependency>> {
        match self {
            CandidateEdge::Api(dep) => Ok(vec![dep.to_candidate()?]),
            CandidateEdge::Bpmn(dep) => Ok(vec![dep.to_candidate()?]),
            CandidateEdge::BusinessRule(dep) => dep.to_candidates(),
        }
    }
}

fn enum_label<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Counts candidates by provenance, used in import summaries.
pub fn count_by_provenance(candidates: &[CandidateEdge]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for candidate in candidates {
        let key = match candidate.provenance() {
            Provenance::Api => "api",
            Provenance::Bpmn => "bpmn",
            Provenance::BusinessRule => "business_rule",
        };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}
