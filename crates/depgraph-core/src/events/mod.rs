//! Ingestion lifecycle events.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::DepgraphEventHandler;
pub use types::*;
