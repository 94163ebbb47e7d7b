//! Graph construction, the in-memory backend, traversal and metrics.

pub mod builder;
pub mod memory;
pub mod metrics;
pub mod traversal;

pub use builder::{GraphBuilder, IngestRecord, UnitMeta, UnresolvedRef};
pub use memory::InMemoryBackend;
pub use traversal::{CycleReport, Traversal, TraversalResult};
