//! Query interface consumed by the rest of the platform.
//!
//! Holds an explicit backend handle; every response is a serde record.

use std::sync::Arc;
use std::time::Duration;

use depgraph_core::config::DepgraphConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::traits::{Deadline, GraphBackend};
use depgraph_core::types::{Direction, EdgeKind, NodeFilter, NodeId, NodeKind, NodeSummary};

use crate::graph::{metrics, CycleReport, Traversal, TraversalResult};
use crate::reports::{self, CoverageReport, DependencyResult, ImpactReport, TraceabilityReport};

pub struct QueryService {
    traversal: Traversal,
    config: DepgraphConfig,
    /// Budget applied to report generation when the caller passes no deadline.
    report_timeout: Option<Duration>,
}

impl QueryService {
    pub fn new(backend: Arc<dyn GraphBackend>, config: DepgraphConfig) -> Self {
        Self {
            traversal: Traversal::new(backend, config.graph.clone()),
            config,
            report_timeout: None,
        }
    }

    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = Some(timeout);
        self
    }

    pub fn traversal(&self) -> &Traversal {
        &self.traversal
    }

    fn default_deadline(&self) -> Deadline {
        self.report_timeout.map(Deadline::after).unwrap_or_default()
    }

    /// Nodes whose name or id contains `query` (case-insensitive), sorted by id.
    pub fn find_nodes(
        &self,
        kind: Option<NodeKind>,
        query: &str,
    ) -> Result<Vec<NodeSummary>, GraphError> {
        let filter = if query.is_empty() {
            NodeFilter::any()
        } else {
            NodeFilter::name(query)
        };
        Ok(self
            .traversal
            .backend()
            .find_nodes(kind, &filter)?
            .iter()
            .map(|n| n.summary())
            .collect())
    }

    /// Neighbors in both directions, optionally restricted to one edge kind.
    /// A node reachable both ways appears once.
    pub fn get_neighbors(
        &self,
        node_id: &NodeId,
        edge_kind: Option<EdgeKind>,
    ) -> Result<Vec<NodeSummary>, GraphError> {
        let kinds: &[EdgeKind] = match edge_kind {
            Some(ref k) => std::slice::from_ref(k),
            None => &[],
        };
        let mut out: Vec<NodeSummary> = Vec::new();
        for n in self
            .traversal
            .backend()
            .neighbors(node_id, kinds, Direction::Both)?
        {
            let summary = n.node.summary();
            if !out.contains(&summary) {
                out.push(summary);
            }
        }
        Ok(out)
    }

    pub fn analyze_impact(&self, node_id: &NodeId, max_depth: u32) -> Result<ImpactReport, GraphError> {
        self.analyze_impact_until(node_id, max_depth, &self.default_deadline())
    }

    pub fn analyze_impact_until(
        &self,
        node_id: &NodeId,
        max_depth: u32,
        deadline: &Deadline,
    ) -> Result<ImpactReport, GraphError> {
        reports::analyze_impact(&self.traversal, node_id, max_depth, deadline)
    }

    pub fn dependency_report(&self, node_id: &NodeId) -> Result<DependencyResult, GraphError> {
        reports::dependency_report(
            &self.traversal,
            node_id,
            self.config.graph.effective_max_depth(),
            &self.config.metrics,
            &self.default_deadline(),
        )
    }

    pub fn coverage_report(&self, node_id: &NodeId) -> Result<CoverageReport, GraphError> {
        reports::coverage_report(&self.traversal, node_id, &self.config.coverage)
    }

    pub fn traceability_report(&self) -> Result<TraceabilityReport, GraphError> {
        reports::traceability_report(&self.traversal, &self.default_deadline())
    }

    pub fn transitive_dependencies(
        &self,
        node_id: &NodeId,
        max_depth: Option<u32>,
        deadline: &Deadline,
    ) -> Result<TraversalResult, GraphError> {
        let depth = max_depth.unwrap_or_else(|| self.traversal.default_max_depth());
        self.traversal.transitive_dependencies(node_id, depth, deadline)
    }

    pub fn find_cycles(&self, node_id: &NodeId, deadline: &Deadline) -> Result<CycleReport, GraphError> {
        self.traversal.find_cycles(node_id, deadline)
    }

    /// Share of a module's calls that stay inside it; `None` without calls.
    pub fn cohesion(&self, module_id: &NodeId) -> Result<Option<f64>, GraphError> {
        self.traversal.require_node(module_id)?;
        metrics::cohesion(&self.traversal, module_id)
    }
}
