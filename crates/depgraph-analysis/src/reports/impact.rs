//! Dependency and impact analysis.

use depgraph_core::config::MetricsConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::traits::Deadline;
use depgraph_core::types::collections::FxHashSet;
use depgraph_core::types::{Direction, EdgeKind, NodeId, NodeKind, NodeSummary};
use serde::{Deserialize, Serialize};

use crate::graph::metrics;
use crate::graph::Traversal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactedNode {
    pub node: NodeSummary,
    pub depth: u32,
}

/// What breaks if `node_id` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub node_id: NodeId,
    pub max_depth: u32,
    /// Transitive dependents, sorted by (depth, id).
    pub affected: Vec<ImpactedNode>,
    /// Test cases covering the changed node or any affected node.
    pub affected_tests: Vec<NodeSummary>,
    /// Distinct placeholders referenced by the changed node or its
    /// dependents; each one is a dependency the report cannot see through.
    pub unresolved_count: usize,
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyResult {
    pub node_id: NodeId,
    pub direct_count: usize,
    pub transitive_count: usize,
    pub circular_count: usize,
    pub coupling: f64,
    pub complexity_score: f64,
    pub partial: bool,
}

pub fn analyze_impact(
    traversal: &Traversal,
    node_id: &NodeId,
    max_depth: u32,
    deadline: &Deadline,
) -> Result<ImpactReport, GraphError> {
    let root = traversal.require_node(node_id)?;
    let dependents = traversal.transitive_dependents(node_id, max_depth, deadline)?;

    let mut tests: Vec<NodeSummary> = Vec::new();
    let mut seen_tests = FxHashSet::default();
    let mut placeholders: FxHashSet<NodeId> = FxHashSet::default();
    let mut partial = dependents.partial;

    let subjects = std::iter::once(root.summary()).chain(dependents.reached.iter().map(|r| r.node.clone()));
    for subject in subjects {
        if deadline.expired() {
            partial = true;
            break;
        }
        if subject.kind == NodeKind::TestCase && seen_tests.insert(subject.id.clone()) {
            tests.push(subject.clone());
        }
        for test in traversal.related(&subject.id, EdgeKind::TestedBy, Direction::Outgoing)? {
            if seen_tests.insert(test.id.clone()) {
                tests.push(test);
            }
        }
        for dep in traversal.direct_dependencies(&subject.id)? {
            if dep.kind == NodeKind::Unknown {
                placeholders.insert(dep.id);
            }
        }
    }
    tests.sort_by(|a, b| a.id.cmp(&b.id));

    tracing::debug!(
        node = %node_id,
        affected = dependents.len(),
        tests = tests.len(),
        partial,
        "impact analyzed"
    );
    Ok(ImpactReport {
        node_id: node_id.clone(),
        max_depth,
        affected: dependents
            .reached
            .into_iter()
            .map(|r| ImpactedNode {
                node: r.node,
                depth: r.depth,
            })
            .collect(),
        affected_tests: tests,
        unresolved_count: placeholders.len(),
        partial,
    })
}

pub fn dependency_report(
    traversal: &Traversal,
    node_id: &NodeId,
    max_depth: u32,
    config: &MetricsConfig,
    deadline: &Deadline,
) -> Result<DependencyResult, GraphError> {
    traversal.require_node(node_id)?;
    let m = metrics::node_metrics(traversal, node_id, max_depth, config, deadline)?;
    Ok(DependencyResult {
        node_id: node_id.clone(),
        direct_count: m.direct_count,
        transitive_count: m.transitive_count,
        circular_count: m.cycle_count,
        coupling: m.coupling,
        complexity_score: m.complexity_score,
        partial: m.partial,
    })
}
