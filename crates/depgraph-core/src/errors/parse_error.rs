//! Parser errors.

use super::error_code::{self, DepgraphErrorCode};

/// Errors that can occur while turning a unit into a structural record.
///
/// `Failure` and `DeepUnavailable` are degradations: the parser reports them
/// through record flags and only returns them from the strategy layer.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Parse failure in {unit}: {message}")]
    Failure { unit: String, message: String },

    #[error("Deep analysis unavailable for {unit}: {reason}")]
    DeepUnavailable { unit: String, reason: String },

    #[error("Deep analysis of {unit} timed out after {timeout_ms}ms")]
    DeepTimeout { unit: String, timeout_ms: u64 },

    #[error("Parse cache error: {message}")]
    Cache { message: String },

    #[error("Parser pool error: {message}")]
    Pool { message: String },
}

impl DepgraphErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Failure { .. } => error_code::PARSE_FAILURE,
            Self::DeepUnavailable { .. } | Self::DeepTimeout { .. } => {
                error_code::DEEP_PARSE_UNAVAILABLE
            }
            Self::Cache { .. } | Self::Pool { .. } => error_code::CACHE_ERROR,
        }
    }
}
