//! Incremental parser with content-hash cached structural extraction.
//!
//! The fast path always produces a record; the deep path is an optional,
//! capability-gated enrichment that degrades instead of failing.

pub mod bsl;
pub mod cache;
pub mod deep;
pub mod manager;
pub mod metadata_xml;
pub mod types;

pub use cache::CacheStats;
pub use deep::{BlockStructureAnalyzer, DeepAnalyzer};
pub use manager::ParserManager;
pub use types::{
    CallRef, DeclKind, Declaration, DeepMetrics, DescriptorInfo, MetadataRef, ParseOutcome,
    RecordFlags, StructuralRecord,
};
