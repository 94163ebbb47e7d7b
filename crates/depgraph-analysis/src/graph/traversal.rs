//! Multi-hop expansion and cycle detection over any `GraphBackend`.
//!
//! All walks follow the structural edge kinds (`CALLS`, `USES_METADATA`,
//! `DEPENDS_ON`) and terminate through a visited set or an explicit depth
//! bound. A caller-supplied `Deadline` stops a walk early; the result then
//! carries `partial: true`.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use depgraph_core::config::GraphConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::traits::{Deadline, GraphBackend};
use depgraph_core::types::collections::{FxHashMap, FxHashSet};
use depgraph_core::types::{Direction, EdgeKind, Node, NodeFilter, NodeId, NodeKind, NodeSummary};
use serde::{Deserialize, Serialize};

/// A node reached by an expansion, at the depth it was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reached {
    pub node: NodeSummary,
    pub depth: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalResult {
    /// Sorted by (depth, id).
    pub reached: Vec<Reached>,
    pub partial: bool,
}

impl TraversalResult {
    pub fn len(&self) -> usize {
        self.reached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reached.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.reached.iter().map(|r| &r.node.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Each cycle is the path slice from the repeated node to the node that
    /// closed it, inclusive.
    pub cycles: Vec<Vec<NodeId>>,
    /// Set when the depth bound, step budget or deadline cut the search short.
    pub partial: bool,
    pub steps: usize,
}

pub struct Traversal {
    backend: Arc<dyn GraphBackend>,
    config: GraphConfig,
}

struct Frame {
    node: NodeId,
    children: Vec<NodeId>,
    next: usize,
}

impl Traversal {
    pub fn new(backend: Arc<dyn GraphBackend>, config: GraphConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    pub fn default_max_depth(&self) -> u32 {
        self.config.effective_max_depth()
    }

    /// Distinct one-hop structural targets, sorted by id.
    pub fn direct_dependencies(&self, id: &NodeId) -> Result<Vec<NodeSummary>, GraphError> {
        self.one_hop(id, Direction::Outgoing)
    }

    /// Distinct one-hop structural sources, sorted by id.
    pub fn direct_dependents(&self, id: &NodeId) -> Result<Vec<NodeSummary>, GraphError> {
        self.one_hop(id, Direction::Incoming)
    }

    pub fn transitive_dependencies(
        &self,
        id: &NodeId,
        max_depth: u32,
        deadline: &Deadline,
    ) -> Result<TraversalResult, GraphError> {
        self.expand(id, Direction::Outgoing, EdgeKind::structural(), max_depth, deadline)
    }

    /// Reverse expansion: everything that transitively depends on `id`.
    pub fn transitive_dependents(
        &self,
        id: &NodeId,
        max_depth: u32,
        deadline: &Deadline,
    ) -> Result<TraversalResult, GraphError> {
        self.expand(id, Direction::Incoming, EdgeKind::structural(), max_depth, deadline)
    }

    /// Distinct nodes one `kind` edge away, sorted by id.
    pub fn related(
        &self,
        id: &NodeId,
        kind: EdgeKind,
        direction: Direction,
    ) -> Result<Vec<NodeSummary>, GraphError> {
        let mut seen = FxHashSet::default();
        let mut out: Vec<NodeSummary> = self
            .backend
            .neighbors(id, &[kind], direction)?
            .into_iter()
            .filter(|n| seen.insert(n.node.id.clone()))
            .map(|n| n.node.summary())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    /// Fetch a node, failing with `NodeNotFound` when it does not exist.
    pub fn require_node(&self, id: &NodeId) -> Result<Node, GraphError> {
        self.backend
            .get_node(id)?
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Result<Vec<Node>, GraphError> {
        self.backend.find_nodes(Some(kind), &NodeFilter::any())
    }

    fn one_hop(&self, id: &NodeId, direction: Direction) -> Result<Vec<NodeSummary>, GraphError> {
        let mut seen = FxHashSet::default();
        let mut out: Vec<NodeSummary> = self
            .backend
            .neighbors(id, EdgeKind::structural(), direction)?
            .into_iter()
            .filter(|n| seen.insert(n.node.id.clone()))
            .map(|n| n.node.summary())
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    /// Breadth-first expansion. The start node is never part of the result,
    /// even when a cycle leads back to it.
    pub fn expand(
        &self,
        start: &NodeId,
        direction: Direction,
        kinds: &[EdgeKind],
        max_depth: u32,
        deadline: &Deadline,
    ) -> Result<TraversalResult, GraphError> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<(NodeId, u32)> = VecDeque::new();
        let mut result = TraversalResult::default();

        visited.insert(start.clone());
        queue.push_back((start.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            if deadline.expired() {
                result.partial = true;
                break;
            }
            for neighbor in self.backend.neighbors(&current, kinds, direction)? {
                if visited.insert(neighbor.node.id.clone()) {
                    result.reached.push(Reached {
                        node: neighbor.node.summary(),
                        depth: depth + 1,
                    });
                    queue.push_back((neighbor.node.id, depth + 1));
                }
            }
        }

        result
            .reached
            .sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.node.id.cmp(&b.node.id)));
        Ok(result)
    }

    /// Depth-first search for cycles reachable from `start`, bounded by the
    /// configured depth and step budget.
    pub fn find_cycles(&self, start: &NodeId, deadline: &Deadline) -> Result<CycleReport, GraphError> {
        self.find_cycles_bounded(
            start,
            self.config.effective_max_depth(),
            self.config.effective_cycle_step_budget(),
            deadline,
        )
    }

    pub fn find_cycles_bounded(
        &self,
        start: &NodeId,
        max_depth: u32,
        step_budget: usize,
        deadline: &Deadline,
    ) -> Result<CycleReport, GraphError> {
        let mut report = CycleReport::default();
        let mut found: BTreeSet<Vec<NodeId>> = BTreeSet::new();
        let mut successors: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        let mut on_stack: FxHashMap<NodeId, usize> = FxHashMap::default();

        let children = self.successors(start, &mut successors)?;
        on_stack.insert(start.clone(), 0);
        let mut stack = vec![Frame {
            node: start.clone(),
            children,
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(child) = frame.children.get(frame.next).cloned() else {
                on_stack.remove(&frame.node);
                stack.pop();
                continue;
            };
            frame.next += 1;

            report.steps += 1;
            if report.steps > step_budget || deadline.expired() {
                tracing::debug!(start = %start, steps = report.steps, "cycle search truncated");
                report.partial = true;
                break;
            }

            if let Some(&pos) = on_stack.get(&child) {
                let cycle: Vec<NodeId> = stack[pos..].iter().map(|f| f.node.clone()).collect();
                if found.insert(cycle.clone()) {
                    report.cycles.push(cycle);
                }
                continue;
            }
            if stack.len() >= max_depth as usize {
                report.partial = true;
                continue;
            }
            let children = self.successors(&child, &mut successors)?;
            on_stack.insert(child.clone(), stack.len());
            stack.push(Frame {
                node: child,
                children,
                next: 0,
            });
        }

        Ok(report)
    }

    fn successors(
        &self,
        id: &NodeId,
        cache: &mut FxHashMap<NodeId, Vec<NodeId>>,
    ) -> Result<Vec<NodeId>, GraphError> {
        if let Some(hit) = cache.get(id) {
            return Ok(hit.clone());
        }
        let mut seen = FxHashSet::default();
        let mut ids: Vec<NodeId> = self
            .backend
            .neighbors(id, EdgeKind::structural(), Direction::Outgoing)?
            .into_iter()
            .map(|n| n.node.id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        ids.sort();
        cache.insert(id.clone(), ids.clone());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryBackend;
    use depgraph_core::types::{Edge, PropValue};

    fn func(id: &str) -> Node {
        Node::new(NodeId::new(id), NodeKind::Function, id)
            .with_prop("module", PropValue::from("M"))
            .with_prop("is_export", PropValue::Bool(false))
            .with_prop("loc", PropValue::Int(1))
    }

    fn graph(edges: &[(&str, &str)]) -> Traversal {
        let backend = InMemoryBackend::new();
        let mut ids: Vec<&str> = edges.iter().flat_map(|(a, b)| [*a, *b]).collect();
        ids.sort();
        ids.dedup();
        let nodes: Vec<Node> = ids.iter().map(|id| func(id)).collect();
        let edges: Vec<Edge> = edges
            .iter()
            .map(|(a, b)| Edge::new(NodeId::new(*a), NodeId::new(*b), EdgeKind::Calls))
            .collect();
        backend.upsert(&nodes, &edges).unwrap();
        Traversal::new(Arc::new(backend), GraphConfig::default())
    }

    #[test]
    fn triangle_has_exactly_one_cycle() {
        let t = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let report = t.find_cycles(&NodeId::new("A"), &Deadline::none()).unwrap();
        assert_eq!(
            report.cycles,
            vec![vec![NodeId::new("A"), NodeId::new("B"), NodeId::new("C")]]
        );
        assert!(!report.partial);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let t = graph(&[("A", "B"), ("B", "C"), ("A", "C")]);
        let report = t.find_cycles(&NodeId::new("A"), &Deadline::none()).unwrap();
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn step_budget_marks_partial() {
        let t = graph(&[("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")]);
        let report = t
            .find_cycles_bounded(&NodeId::new("A"), 10, 2, &Deadline::none())
            .unwrap();
        assert!(report.partial);
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn transitive_respects_depth_and_terminates() {
        let t = graph(&[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D")]);
        let r = t
            .transitive_dependencies(&NodeId::new("A"), 2, &Deadline::none())
            .unwrap();
        let ids: Vec<&str> = r.ids().map(NodeId::as_str).collect();
        assert_eq!(ids, vec!["B", "C"]);
        let all = t
            .transitive_dependencies(&NodeId::new("A"), 10, &Deadline::none())
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.reached[2].depth, 3);
    }

    #[test]
    fn expired_deadline_returns_partial() {
        let t = graph(&[("A", "B")]);
        let deadline = Deadline::at(std::time::Instant::now() - std::time::Duration::from_millis(1));
        let r = t
            .transitive_dependencies(&NodeId::new("A"), 5, &deadline)
            .unwrap();
        assert!(r.partial);
        assert!(r.is_empty());
    }

    #[test]
    fn dependents_walk_backwards() {
        let t = graph(&[("A", "C"), ("B", "C")]);
        let direct = t.direct_dependents(&NodeId::new("C")).unwrap();
        assert_eq!(direct.len(), 2);
        let deps = t.direct_dependencies(&NodeId::new("C")).unwrap();
        assert!(deps.is_empty());
    }
}
