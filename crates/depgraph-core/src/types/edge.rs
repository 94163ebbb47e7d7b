//! Edges, edge keys and neighbor views.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeId};
use super::props::{PropValue, Props};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Contains,
    Calls,
    UsesMetadata,
    DependsOn,
    Implements,
    TestedBy,
    TriggersIncident,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Calls => "CALLS",
            Self::UsesMetadata => "USES_METADATA",
            Self::DependsOn => "DEPENDS_ON",
            Self::Implements => "IMPLEMENTS",
            Self::TestedBy => "TESTED_BY",
            Self::TriggersIncident => "TRIGGERS_INCIDENT",
        }
    }

    pub fn all() -> &'static [EdgeKind] {
        &[
            Self::Contains,
            Self::Calls,
            Self::UsesMetadata,
            Self::DependsOn,
            Self::Implements,
            Self::TestedBy,
            Self::TriggersIncident,
        ]
    }

    /// Dependency-carrying kinds followed by the traversal engine.
    pub fn structural() -> &'static [EdgeKind] {
        &[Self::Calls, Self::UsesMetadata, Self::DependsOn]
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown edge kind: {s}"))
    }
}

/// Identity of an edge: at most one edge of a kind between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
    #[serde(default)]
    pub props: Props,
}

impl Edge {
    pub fn new(source_id: NodeId, target_id: NodeId, kind: EdgeKind) -> Self {
        Self {
            source_id,
            target_id,
            kind,
            props: Props::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: PropValue) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            source_id: self.source_id.clone(),
            target_id: self.target_id.clone(),
            kind: self.kind,
        }
    }

    /// Unit that owns this edge, if recorded.
    pub fn unit(&self) -> Option<&str> {
        self.props.get("unit").and_then(PropValue::as_text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    pub fn includes_outgoing(&self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }

    pub fn includes_incoming(&self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }
}

/// One hop away from a node: the connecting edge, the node on the other end,
/// and which way the edge points relative to the queried node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub edge: Edge,
    pub node: Node,
    pub direction: Direction,
}

/// Canonical ordering shared by all backends: edge kind, neighbor id, direction.
pub fn sort_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| {
        a.edge
            .kind
            .cmp(&b.edge.kind)
            .then_with(|| a.node.id.cmp(&b.node.id))
            .then_with(|| a.direction.cmp(&b.direction))
    });
}
