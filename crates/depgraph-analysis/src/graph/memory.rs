//! In-memory `GraphBackend` over a petgraph `StableGraph`.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use depgraph_core::errors::GraphError;
use depgraph_core::traits::GraphBackend;
use depgraph_core::types::collections::{FxHashMap, FxHashSet};
use depgraph_core::types::edge::sort_neighbors;
use depgraph_core::types::{
    Direction, Edge, EdgeKey, EdgeKind, Neighbor, Node, NodeFilter, NodeId, NodeKind,
};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction as PgDirection;

#[derive(Default)]
struct Inner {
    graph: StableGraph<Node, Edge>,
    index: FxHashMap<NodeId, NodeIndex>,
}

impl Inner {
    fn find_edge(&self, key: &EdgeKey) -> Option<EdgeIndex> {
        let a = *self.index.get(&key.source_id)?;
        let b = *self.index.get(&key.target_id)?;
        self.graph
            .edges_directed(a, PgDirection::Outgoing)
            .find(|e| e.target() == b && e.weight().kind == key.kind)
            .map(|e| e.id())
    }
}

/// Deterministic adjacency-list backend for tests and small graphs.
#[derive(Default)]
pub struct InMemoryBackend {
    inner: RwLock<Inner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, GraphError> {
        self.inner
            .read()
            .map_err(|_| GraphError::unavailable("in-memory graph lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, GraphError> {
        self.inner
            .write()
            .map_err(|_| GraphError::unavailable("in-memory graph lock poisoned"))
    }
}

impl GraphBackend for InMemoryBackend {
    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, GraphError> {
        let inner = self.read()?;
        Ok(inner.index.get(id).map(|&idx| inner.graph[idx].clone()))
    }

    fn find_nodes(
        &self,
        kind: Option<NodeKind>,
        filter: &NodeFilter,
    ) -> Result<Vec<Node>, GraphError> {
        let inner = self.read()?;
        let mut nodes: Vec<Node> = inner
            .graph
            .node_weights()
            .filter(|n| kind.map_or(true, |k| n.kind == k) && filter.matches(n))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    fn neighbors(
        &self,
        id: &NodeId,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<Neighbor>, GraphError> {
        let inner = self.read()?;
        let Some(&idx) = inner.index.get(id) else {
            return Ok(Vec::new());
        };
        let wanted = |k: EdgeKind| edge_kinds.is_empty() || edge_kinds.contains(&k);

        let mut out = Vec::new();
        if direction.includes_outgoing() {
            for e in inner.graph.edges_directed(idx, PgDirection::Outgoing) {
                if wanted(e.weight().kind) {
                    out.push(Neighbor {
                        edge: e.weight().clone(),
                        node: inner.graph[e.target()].clone(),
                        direction: Direction::Outgoing,
                    });
                }
            }
        }
        if direction.includes_incoming() {
            for e in inner.graph.edges_directed(idx, PgDirection::Incoming) {
                if wanted(e.weight().kind) {
                    out.push(Neighbor {
                        edge: e.weight().clone(),
                        node: inner.graph[e.source()].clone(),
                        direction: Direction::Incoming,
                    });
                }
            }
        }
        sort_neighbors(&mut out);
        Ok(out)
    }

    fn upsert(&self, nodes: &[Node], edges: &[Edge]) -> Result<(), GraphError> {
        let mut inner = self.write()?;

        // Validate the whole call before touching the graph.
        let mut incoming: FxHashMap<&NodeId, NodeKind> = FxHashMap::default();
        for node in nodes {
            let existing = inner
                .index
                .get(&node.id)
                .map(|&idx| inner.graph[idx].kind)
                .or_else(|| incoming.get(&node.id).copied());
            if let Some(existing) = existing {
                if existing != node.kind {
                    return Err(GraphError::KindConflict {
                        id: node.id.to_string(),
                        existing: existing.to_string(),
                        requested: node.kind.to_string(),
                    });
                }
            }
            incoming.insert(&node.id, node.kind);
        }
        let exists = |id: &NodeId| inner.index.contains_key(id) || incoming.contains_key(id);
        for edge in edges {
            if !exists(&edge.source_id) || !exists(&edge.target_id) {
                return Err(GraphError::DanglingEdge {
                    source_id: edge.source_id.to_string(),
                    target_id: edge.target_id.to_string(),
                    kind: edge.kind.to_string(),
                });
            }
        }

        for node in nodes {
            match inner.index.get(&node.id).copied() {
                Some(idx) => inner.graph[idx] = node.clone(),
                None => {
                    let idx = inner.graph.add_node(node.clone());
                    inner.index.insert(node.id.clone(), idx);
                }
            }
        }
        for edge in edges {
            match inner.find_edge(&edge.key()) {
                Some(eidx) => inner.graph[eidx] = edge.clone(),
                None => {
                    let a = inner.index[&edge.source_id];
                    let b = inner.index[&edge.target_id];
                    inner.graph.add_edge(a, b, edge.clone());
                }
            }
        }
        Ok(())
    }

    fn delete(&self, ids: &[NodeId]) -> Result<(), GraphError> {
        let mut inner = self.write()?;
        let unique: FxHashSet<&NodeId> = ids.iter().collect();
        for id in unique {
            if let Some(idx) = inner.index.remove(id) {
                inner.graph.remove_node(idx);
            }
        }
        Ok(())
    }

    fn delete_edges(&self, keys: &[EdgeKey]) -> Result<(), GraphError> {
        let mut inner = self.write()?;
        for key in keys {
            if let Some(eidx) = inner.find_edge(key) {
                inner.graph.remove_edge(eidx);
            }
        }
        Ok(())
    }

    fn node_count(&self) -> Result<usize, GraphError> {
        Ok(self.read()?.graph.node_count())
    }

    fn edge_count(&self) -> Result<usize, GraphError> {
        Ok(self.read()?.graph.edge_count())
    }

    fn all_edges(&self) -> Result<Vec<Edge>, GraphError> {
        let inner = self.read()?;
        let mut edges: Vec<Edge> = inner.graph.edge_weights().cloned().collect();
        edges.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(edges)
    }
}
