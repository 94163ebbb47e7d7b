//! `GraphBackend` over SQLite.
//!
//! Every write call runs in one immediate transaction: the whole call is
//! validated (kind immutability, edge endpoints) before the first row is
//! touched, and any failure rolls the call back. Reads use the pool and
//! return rows in the same order as the in-memory backend.

use std::path::Path;
use std::sync::Arc;

use depgraph_core::errors::{GraphError, StorageError};
use depgraph_core::traits::GraphBackend;
use depgraph_core::types::collections::{FxHashMap, FxHashSet};
use depgraph_core::types::edge::sort_neighbors;
use depgraph_core::types::{
    Direction, Edge, EdgeKey, EdgeKind, Neighbor, Node, NodeFilter, NodeId, NodeKind,
};
use rusqlite::Connection;

use crate::connection::writer::with_immediate_transaction;
use crate::connection::DatabaseManager;
use crate::queries::{edges, nodes};

pub struct SqliteGraphBackend {
    db: Arc<DatabaseManager>,
}

impl SqliteGraphBackend {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open(path)?)))
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Arc::new(DatabaseManager::open_in_memory()?)))
    }

    /// Shared handle, e.g. for a parse cache store on the same file.
    pub fn database(&self) -> Arc<DatabaseManager> {
        Arc::clone(&self.db)
    }
}

/// Reject the call if it would change a node's kind or leave an edge
/// without an endpoint. Runs inside the write transaction.
fn validate_upsert(conn: &Connection, batch: &[Node], edges: &[Edge]) -> Result<(), GraphError> {
    let mut incoming: FxHashMap<&NodeId, NodeKind> = FxHashMap::default();
    for node in batch {
        let existing = match incoming.get(&node.id) {
            Some(kind) => Some(kind.to_string()),
            None => nodes::node_kind_tag(conn, &node.id)?,
        };
        if let Some(existing) = existing {
            if existing != node.kind.tag() {
                return Err(GraphError::KindConflict {
                    id: node.id.to_string(),
                    existing,
                    requested: node.kind.to_string(),
                });
            }
        }
        incoming.insert(&node.id, node.kind);
    }

    let mut known: FxHashSet<&NodeId> = incoming.keys().copied().collect();
    for edge in edges {
        for endpoint in [&edge.source_id, &edge.target_id] {
            if known.contains(endpoint) {
                continue;
            }
            if nodes::node_kind_tag(conn, endpoint)?.is_none() {
                return Err(GraphError::DanglingEdge {
                    source_id: edge.source_id.to_string(),
                    target_id: edge.target_id.to_string(),
                    kind: edge.kind.to_string(),
                });
            }
            known.insert(endpoint);
        }
    }
    Ok(())
}

impl GraphBackend for SqliteGraphBackend {
    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, GraphError> {
        self.db
            .with_reader(|conn| nodes::get_node(conn, id).map_err(GraphError::from))
    }

    fn find_nodes(
        &self,
        kind: Option<NodeKind>,
        filter: &NodeFilter,
    ) -> Result<Vec<Node>, GraphError> {
        let all = self
            .db
            .with_reader(|conn| nodes::list_nodes(conn, kind).map_err(GraphError::from))?;
        Ok(all.into_iter().filter(|n| filter.matches(n)).collect())
    }

    fn neighbors(
        &self,
        id: &NodeId,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<Neighbor>, GraphError> {
        let wanted = |k: EdgeKind| edge_kinds.is_empty() || edge_kinds.contains(&k);
        let mut out = Vec::new();
        self.db.with_reader(|conn| -> Result<(), GraphError> {
            if direction.includes_outgoing() {
                for (edge, node) in edges::outgoing(conn, id)? {
                    if wanted(edge.kind) {
                        out.push(Neighbor {
                            edge,
                            node,
                            direction: Direction::Outgoing,
                        });
                    }
                }
            }
            if direction.includes_incoming() {
                for (edge, node) in edges::incoming(conn, id)? {
                    if wanted(edge.kind) {
                        out.push(Neighbor {
                            edge,
                            node,
                            direction: Direction::Incoming,
                        });
                    }
                }
            }
            Ok(())
        })?;
        sort_neighbors(&mut out);
        Ok(out)
    }

    fn upsert(&self, batch: &[Node], edge_batch: &[Edge]) -> Result<(), GraphError> {
        if batch.is_empty() && edge_batch.is_empty() {
            return Ok(());
        }
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| -> Result<(), GraphError> {
                validate_upsert(tx, batch, edge_batch)?;
                for node in batch {
                    nodes::upsert_node(tx, node)?;
                }
                for edge in edge_batch {
                    edges::upsert_edge(tx, edge)?;
                }
                Ok(())
            })
        })?;
        tracing::debug!(nodes = batch.len(), edges = edge_batch.len(), "sqlite upsert");
        Ok(())
    }

    fn delete(&self, ids: &[NodeId]) -> Result<(), GraphError> {
        if ids.is_empty() {
            return Ok(());
        }
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| -> Result<(), GraphError> {
                for id in ids {
                    nodes::delete_node(tx, id)?;
                }
                Ok(())
            })
        })
    }

    fn delete_edges(&self, keys: &[EdgeKey]) -> Result<(), GraphError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.db.with_writer(|conn| {
            with_immediate_transaction(conn, |tx| -> Result<(), GraphError> {
                for key in keys {
                    edges::delete_edge(tx, key)?;
                }
                Ok(())
            })
        })
    }

    fn node_count(&self) -> Result<usize, GraphError> {
        self.db
            .with_reader(|conn| nodes::count_nodes(conn).map_err(GraphError::from))
    }

    fn edge_count(&self) -> Result<usize, GraphError> {
        self.db
            .with_reader(|conn| edges::count_edges(conn).map_err(GraphError::from))
    }

    fn all_edges(&self) -> Result<Vec<Edge>, GraphError> {
        let mut all = self
            .db
            .with_reader(|conn| edges::list_edges(conn).map_err(GraphError::from))?;
        all.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depgraph_core::types::PropValue;

    fn func(id: &str) -> Node {
        Node::new(NodeId::new(id), NodeKind::Function, id)
            .with_prop("module", PropValue::Text("M".into()))
    }

    #[test]
    fn replacing_a_node_keeps_its_edges() {
        let backend = SqliteGraphBackend::open_in_memory().unwrap();
        backend
            .upsert(
                &[func("a"), func("b")],
                &[Edge::new("a".into(), "b".into(), EdgeKind::Calls)],
            )
            .unwrap();
        backend
            .upsert(&[func("b").with_prop("loc", PropValue::Int(9))], &[])
            .unwrap();
        assert_eq!(backend.edge_count().unwrap(), 1);
        let b = backend.get_node(&"b".into()).unwrap().unwrap();
        assert_eq!(b.prop("loc"), Some(&PropValue::Int(9)));
    }

    #[test]
    fn kind_conflict_inside_one_call() {
        let backend = SqliteGraphBackend::open_in_memory().unwrap();
        let as_proc = Node::new("a".into(), NodeKind::Procedure, "a");
        let err = backend.upsert(&[func("a"), as_proc], &[]).unwrap_err();
        assert!(matches!(err, GraphError::KindConflict { .. }));
        assert_eq!(backend.node_count().unwrap(), 0);
    }
}
