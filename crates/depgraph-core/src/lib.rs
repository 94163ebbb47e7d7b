//! depgraph-core: graph data model, errors, configuration, events, and the
//! backend/cache contracts shared by the analysis and storage crates.

pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod traits;
pub mod types;
