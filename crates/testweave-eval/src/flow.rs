use testweave_core::DataFlowGraph;

use crate::model::FlowConsistencyReport;

const CYCLE_PENALTY: f64 = 20.0;
const DANGLING_PENALTY: f64 = 5.0;

/// Cross-system consistency of a data-flow graph: cycles and connections to
/// nodes that were never registered cost points, floored at 0.
pub fn validate_data_flow(graph: &DataFlowGraph) -> FlowConsistencyReport {
    let report = graph.report();
    let mut score: f64 = 100.0;
    let mut issues = Vec::new();

    if let Some(cycle) = &report.cycle {
        issues.push(format!("Cycle detected between: {}", cycle.join(", ")));
        score -= CYCLE_PENALTY;
    }

    let dangling: Vec<String> = graph
        .dangling_connections()
        .into_iter()
        .map(|(from, to)| format!("{from} -> {to}"))
        .collect();
    for connection in &dangling {
        issues.push(format!("Connection {connection} references an unregistered node"));
        score -= DANGLING_PENALTY;
    }

    FlowConsistencyReport {
        nodes: report.summary.nodes,
        edges: report.summary.edges,
        cycle: report.cycle,
        dangling_connections: dangling,
        issues,
        consistency_score: score.max(0.0),
    }
}
