//! Graph data model shared by every crate in the workspace.

pub mod collections;
pub mod delta;
pub mod edge;
pub mod node;
pub mod props;

pub use delta::GraphDelta;
pub use edge::{Direction, Edge, EdgeKey, EdgeKind, Neighbor};
pub use node::{MetadataKind, Node, NodeFilter, NodeId, NodeKind, NodeSummary};
pub use props::{PropValue, Props};
