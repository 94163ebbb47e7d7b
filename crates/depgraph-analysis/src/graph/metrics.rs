//! Coupling, cohesion and complexity heuristics.
//!
//! These are tunable scores for ranking, not invariants. Weights come from
//! `MetricsConfig`.

use depgraph_core::config::MetricsConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::traits::Deadline;
use depgraph_core::types::collections::FxHashSet;
use depgraph_core::types::{Direction, EdgeKind, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

use super::traversal::Traversal;

/// `min(direct / normalization, 1.0)`.
pub fn coupling(direct_count: usize, normalization: f64) -> f64 {
    if normalization <= 0.0 {
        return 1.0;
    }
    (direct_count as f64 / normalization).min(1.0)
}

/// Weighted sum of direct and transitive fan-out, cycle count and coupling.
pub fn complexity_score(
    direct_count: usize,
    transitive_count: usize,
    cycle_count: usize,
    coupling: f64,
    config: &MetricsConfig,
) -> f64 {
    direct_count as f64 * config.effective_direct_weight()
        + transitive_count as f64 * config.effective_transitive_weight()
        + cycle_count as f64 * config.effective_cycle_weight()
        + coupling * config.effective_coupling_weight()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub direct_count: usize,
    pub transitive_count: usize,
    pub cycle_count: usize,
    pub coupling: f64,
    pub complexity_score: f64,
    pub partial: bool,
}

/// All dependency metrics of one node in a single pass.
pub fn node_metrics(
    traversal: &Traversal,
    id: &NodeId,
    max_depth: u32,
    config: &MetricsConfig,
    deadline: &Deadline,
) -> Result<NodeMetrics, GraphError> {
    let direct = traversal.direct_dependencies(id)?;
    let transitive = traversal.transitive_dependencies(id, max_depth, deadline)?;
    let cycles = traversal.find_cycles(id, deadline)?;
    let coupling = coupling(direct.len(), config.effective_coupling_normalization());
    let score = complexity_score(
        direct.len(),
        transitive.len(),
        cycles.cycles.len(),
        coupling,
        config,
    );
    Ok(NodeMetrics {
        direct_count: direct.len(),
        transitive_count: transitive.len(),
        cycle_count: cycles.cycles.len(),
        coupling,
        complexity_score: score,
        partial: transitive.partial || cycles.partial,
    })
}

/// Share of CALLS edges leaving a module's declarations that stay inside the
/// module. `None` when the declarations make no calls.
pub fn cohesion(traversal: &Traversal, module: &NodeId) -> Result<Option<f64>, GraphError> {
    let backend = traversal.backend();
    let members: FxHashSet<NodeId> = backend
        .neighbors(module, &[EdgeKind::Contains], Direction::Outgoing)?
        .into_iter()
        .filter(|n| n.node.kind.is_code() || n.node.kind == NodeKind::TestCase)
        .map(|n| n.node.id)
        .collect();

    let mut total = 0usize;
    let mut internal = 0usize;
    for member in &members {
        for call in backend.neighbors(member, &[EdgeKind::Calls], Direction::Outgoing)? {
            total += 1;
            if members.contains(&call.node.id) {
                internal += 1;
            }
        }
    }
    if total == 0 {
        return Ok(None);
    }
    Ok(Some(internal as f64 / total as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupling_saturates() {
        assert_eq!(coupling(5, 10.0), 0.5);
        assert_eq!(coupling(25, 10.0), 1.0);
        assert_eq!(coupling(0, 10.0), 0.0);
    }

    #[test]
    fn complexity_uses_default_weights() {
        let score = complexity_score(2, 5, 1, 0.2, &MetricsConfig::default());
        assert!((score - (0.6 + 1.0 + 10.0 + 0.1)).abs() < 1e-9);
    }
}
