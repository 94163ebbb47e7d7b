//! The storage/query contract every graph backend satisfies.

use crate::errors::GraphError;
use crate::types::{Direction, Edge, EdgeKey, EdgeKind, Neighbor, Node, NodeFilter, NodeId, NodeKind};

/// Property-graph storage and query abstraction.
///
/// Contract shared by all implementations:
/// - `upsert` inserts or replaces nodes (by id) and edges (by `(source, target, kind)`);
///   nodes are applied before edges, so one call may introduce both endpoints
///   and the edge between them.
/// - An edge whose endpoint is missing after the node phase fails with
///   `GraphError::DanglingEdge`; nothing from the call is applied.
/// - Re-upserting an id with a different kind fails with `GraphError::KindConflict`.
/// - `delete` removes nodes together with every incident edge; unknown ids are ignored.
/// - `find_nodes` results are sorted by id; `neighbors` results are sorted by
///   (edge kind, neighbor id, direction). An empty `edge_kinds` slice means all kinds.
/// - Backend failures map to `GraphError::BackendUnavailable`.
pub trait GraphBackend: Send + Sync {
    fn get_node(&self, id: &NodeId) -> Result<Option<Node>, GraphError>;

    fn find_nodes(
        &self,
        kind: Option<NodeKind>,
        filter: &NodeFilter,
    ) -> Result<Vec<Node>, GraphError>;

    fn neighbors(
        &self,
        id: &NodeId,
        edge_kinds: &[EdgeKind],
        direction: Direction,
    ) -> Result<Vec<Neighbor>, GraphError>;

    fn upsert(&self, nodes: &[Node], edges: &[Edge]) -> Result<(), GraphError>;

    fn delete(&self, ids: &[NodeId]) -> Result<(), GraphError>;

    /// Remove individual edges; unknown keys are ignored.
    fn delete_edges(&self, keys: &[EdgeKey]) -> Result<(), GraphError>;

    fn node_count(&self) -> Result<usize, GraphError>;

    fn edge_count(&self) -> Result<usize, GraphError>;

    /// Every edge in the graph, sorted by key. Used when resuming ingestion state.
    fn all_edges(&self) -> Result<Vec<Edge>, GraphError>;
}
