//! The change set produced by one ingestion call.

use serde::{Deserialize, Serialize};

use super::edge::{Edge, EdgeKey};
use super::node::{Node, NodeId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDelta {
    pub upserted_nodes: Vec<Node>,
    pub upserted_edges: Vec<Edge>,
    pub removed_ids: Vec<NodeId>,
    /// Edges removed while both endpoints survive.
    pub removed_edges: Vec<EdgeKey>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.upserted_nodes.is_empty()
            && self.upserted_edges.is_empty()
            && self.removed_ids.is_empty()
            && self.removed_edges.is_empty()
    }

    pub fn merge(&mut self, other: GraphDelta) {
        self.upserted_nodes.extend(other.upserted_nodes);
        self.upserted_edges.extend(other.upserted_edges);
        self.removed_ids.extend(other.removed_ids);
        self.removed_edges.extend(other.removed_edges);
    }

    /// Total number of changes in the delta.
    pub fn len(&self) -> usize {
        self.upserted_nodes.len()
            + self.upserted_edges.len()
            + self.removed_ids.len()
            + self.removed_edges.len()
    }
}
