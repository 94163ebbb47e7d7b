//! Graph backend and builder errors.

use super::error_code::{self, DepgraphErrorCode};
use super::StorageError;

/// Errors surfaced by a `GraphBackend` or the graph builder.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The backend cannot serve the call. Fatal for the call; retry with backoff.
    #[error("Graph backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Node {id} already exists with kind {existing}, refusing kind {requested}")]
    KindConflict {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("Edge {source_id} -[{kind}]-> {target_id} references a missing node")]
    DanglingEdge {
        source_id: String,
        target_id: String,
        kind: String,
    },

    #[error("Invalid properties for {id}: {message}")]
    InvalidProps { id: String, message: String },

    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

impl GraphError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// True for errors a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

impl From<StorageError> for GraphError {
    fn from(e: StorageError) -> Self {
        Self::BackendUnavailable {
            message: e.to_string(),
        }
    }
}

impl DepgraphErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BackendUnavailable { .. } => error_code::BACKEND_UNAVAILABLE,
            Self::KindConflict { .. } | Self::DanglingEdge { .. } | Self::InvalidProps { .. } => {
                error_code::GRAPH_INVARIANT
            }
            Self::NodeNotFound(_) => error_code::NODE_NOT_FOUND,
        }
    }
}
