use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::candidates::{ApiDependency, BpmnDependency, BusinessRuleDependency, Provenance};

/// A node of the cross-system data-flow view: an API operation, a BPMN
/// element or a business-rule field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowNode {
    pub node_id: String,
    pub node_type: String,
    #[serde(default)]
    pub input_data: BTreeSet<String>,
    #[serde(default)]
    pub output_data: BTreeSet<String>,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    #[serde(default)]
    pub dependents: BTreeSet<String>,
}

impl DataFlowNode {
    pub fn new(node_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            ..Self::default()
        }
    }
}

/// Summary of data-flow graph structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Deterministic ordering report for a data-flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGraphReport {
    pub summary: FlowGraphSummary,
    pub topo_order: Option<Vec<String>>,
    pub cycle: Option<Vec<String>>,
}

/// Joined view of API, BPMN and business-rule dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowGraph {
    #[serde(default)]
    pub nodes: BTreeMap<String, DataFlowNode>,
    #[serde(default)]
    pub node_connections: BTreeMap<String, BTreeSet<String>>,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: DataFlowNode) {
        self.nodes.entry(node.node_id.clone()).or_insert(node);
    }

    /// Records a directed connection. Endpoints do not have to be registered
    /// nodes; unregistered endpoints show up in [`Self::dangling_connections`].
    pub fn add_connection(&mut self, from: &str, to: &str) {
        self.node_connections
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependents.insert(to.to_string());
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.dependencies.insert(from.to_string());
        }
    }

    pub fn connected_nodes(&self, node_id: &str) -> BTreeSet<String> {
        self.node_connections
            .get(node_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn add_api_dependency(&mut self, dependency: &ApiDependency) {
        let source = dependency.source_key();
        let target = dependency.target_key();
        self.register(&source, Provenance::Api);
        self.register(&target, Provenance::Api);
        if let Some(node) = self.nodes.get_mut(&source) {
            node.output_data.extend(dependency.created_fields.iter().cloned());
        }
        if let Some(node) = self.nodes.get_mut(&target) {
            node.input_data.extend(dependency.consumed_fields.iter().cloned());
        }
        self.add_connection(&source, &target);
    }

    pub fn add_bpmn_dependency(&mut self, dependency: &BpmnDependency) {
        self.register(&dependency.source_task, Provenance::Bpmn);
        self.register(&dependency.target_task, Provenance::Bpmn);
        if let Some(node) = self.nodes.get_mut(&dependency.source_task) {
            node.output_data.extend(dependency.created_data.iter().cloned());
        }
        if let Some(node) = self.nodes.get_mut(&dependency.target_task) {
            node.input_data.extend(dependency.consumed_data.iter().cloned());
        }
        self.add_connection(&dependency.source_task, &dependency.target_task);
    }

    pub fn add_business_rule_dependency(&mut self, dependency: &BusinessRuleDependency) {
        for source in &dependency.dependency_fields {
            self.register(source, Provenance::BusinessRule);
            for target in &dependency.affected_fields {
                self.register(target, Provenance::BusinessRule);
                self.add_connection(source, target);
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.node_connections.values().map(BTreeSet::len).sum()
    }

    /// Connections whose source or target was never registered as a node.
    pub fn dangling_connections(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for (from, targets) in &self.node_connections {
            for to in targets {
                if !self.nodes.contains_key(from) || !self.nodes.contains_key(to) {
                    dangling.push((from.clone(), to.clone()));
                }
            }
        }
        dangling
    }

    pub fn report(&self) -> FlowGraphReport {
        let graph = self.adjacency();
        let summary = FlowGraphSummary {
            nodes: graph.len(),
            edges: self.edge_count(),
        };

        match toposort(&graph) {
            Ok(order) => FlowGraphReport {
                summary,
                topo_order: Some(order),
                cycle: None,
            },
            Err(cycle) => FlowGraphReport {
                summary,
                topo_order: None,
                cycle: Some(cycle),
            },
        }
    }

    fn register(&mut self, node_id: &str, provenance: Provenance) {
        let node_type = match provenance {
            Provenance::Api => "api_endpoint",
            Provenance::Bpmn => "bpmn_element",
            Provenance::BusinessRule => "business_field",
        };
        if !self.nodes.contains_key(node_id) {
            let mut node = DataFlowNode::new(node_id, node_type);
            for (from, targets) in &self.node_connections {
                if targets.contains(node_id) {
                    node.dependencies.insert(from.clone());
                }
            }
            if let Some(targets) = self.node_connections.get(node_id) {
                node.dependents.extend(targets.iter().cloned());
            }
            self.nodes.insert(node_id.to_string(), node);
        }
    }

    fn adjacency(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in self.nodes.keys() {
            graph.entry(node.clone()).or_default();
        }
        for (from, targets) in &self.node_connections {
            graph.entry(from.clone()).or_default().extend(targets.iter().cloned());
            for target in targets {
                graph.entry(target.clone()).or_default();
            }
        }
        graph
    }
}

fn toposort(graph: &BTreeMap<String, BTreeSet<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut indegree: BTreeMap<String, usize> = BTreeMap::new();

    for node in graph.keys() {
        indegree.entry(node.clone()).or_insert(0);
    }

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<String> = indegree
        .iter()
        .filter_map(|(node, count)| (*count == 0).then(|| node.clone()))
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.clone());

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let cycle_nodes: Vec<String> = indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then_some(node))
            .collect();
        Err(cycle_nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::{BpmnDependencyKind, RuleScope};

    fn bpmn(source: &str, target: &str) -> BpmnDependency {
        BpmnDependency {
            process_id: "p1".to_string(),
            source_task: source.to_string(),
            target_task: target.to_string(),
            kind: BpmnDependencyKind::TaskToTask,
            strength: None,
            gateway_condition: None,
            created_data: vec!["orderId".to_string()],
            consumed_data: vec!["orderId".to_string()],
        }
    }

    #[test]
    fn report_orders_acyclic_flow() {
        let mut graph = DataFlowGraph::new();
        graph.add_bpmn_dependency(&bpmn("receive", "approve"));
        graph.add_bpmn_dependency(&bpmn("approve", "ship"));
        graph.add_bpmn_dependency(&bpmn("receive", "ship"));

        let report = graph.report();
        assert_eq!(report.summary.nodes, 3);
        assert_eq!(report.summary.edges, 3);
        assert_eq!(
            report.topo_order,
            Some(vec![
                "receive".to_string(),
                "approve".to_string(),
                "ship".to_string()
            ])
        );
        assert!(report.cycle.is_none());
        assert!(graph.nodes["ship"].dependencies.contains("approve"));
        assert!(graph.nodes["receive"].output_data.contains("orderId"));
    }

    #[test]
    fn report_flags_cycle_nodes() {
        let mut graph = DataFlowGraph::new();
        graph.add_bpmn_dependency(&bpmn("a", "b"));
        graph.add_bpmn_dependency(&bpmn("b", "a"));
        graph.add_bpmn_dependency(&bpmn("start", "a"));

        let report = graph.report();
        assert!(report.topo_order.is_none());
        assert_eq!(report.cycle, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn raw_connections_to_unknown_nodes_are_dangling() {
        let mut graph = DataFlowGraph::new();
        graph.add_business_rule_dependency(&BusinessRuleDependency {
            rule_id: "r1".to_string(),
            rule_name: "total".to_string(),
            scope: RuleScope::FieldLevel,
            affected_fields: vec!["total".to_string()],
            dependency_fields: vec!["price".to_string()],
            constraint_expression: None,
            strength: None,
        });
        graph.add_connection("total", "invoice");

        assert_eq!(
            graph.connected_nodes("price"),
            BTreeSet::from(["total".to_string()])
        );
        assert_eq!(
            graph.dangling_connections(),
            vec![("total".to_string(), "invoice".to_string())]
        );
    }
}
