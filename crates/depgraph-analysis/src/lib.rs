//! depgraph-analysis turns an exported configuration tree into a typed
//! dependency graph and answers impact, coverage and traceability queries.
//!
//! Stages run leaf-first: `scanner` → `parsers` → `graph::builder` →
//! `graph::{traversal, metrics}` → `reports`, with `query` and `pipeline`
//! as the consumer-facing entry points.

pub mod graph;
pub mod parsers;
pub mod pipeline;
pub mod query;
pub mod reports;
pub mod scanner;

pub use graph::InMemoryBackend;
pub use pipeline::{IngestionPipeline, IngestionStatus};
pub use query::QueryService;
