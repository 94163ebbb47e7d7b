//! Source reader errors.

use std::path::PathBuf;

use super::error_code::{self, DepgraphErrorCode};

/// Errors raised while walking an exported configuration tree.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The ingestion root is missing or is not a directory. Fatal.
    #[error("Invalid ingestion root {path}: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// A single file could not be read. Non-fatal: the unit is skipped.
    #[error("Unreadable source {path}: {message}")]
    UnreadableSource { path: PathBuf, message: String },

    #[error("Walker error: {message}")]
    Walk { message: String },

    #[error("Scan cancelled")]
    Cancelled,
}

impl DepgraphErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRoot { .. } => error_code::INVALID_ROOT,
            Self::UnreadableSource { .. } => error_code::UNREADABLE_SOURCE,
            Self::Walk { .. } => error_code::SCAN_ERROR,
            Self::Cancelled => error_code::CANCELLED,
        }
    }
}
