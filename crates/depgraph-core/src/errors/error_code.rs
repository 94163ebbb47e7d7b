//! Stable error codes surfaced to consumers of the query interface.

pub const SCAN_ERROR: &str = "SCAN_ERROR";
pub const INVALID_ROOT: &str = "INVALID_ROOT";
pub const UNREADABLE_SOURCE: &str = "UNREADABLE_SOURCE";
pub const PARSE_FAILURE: &str = "PARSE_FAILURE";
pub const DEEP_PARSE_UNAVAILABLE: &str = "DEEP_PARSE_UNAVAILABLE";
pub const CACHE_ERROR: &str = "CACHE_ERROR";
pub const BACKEND_UNAVAILABLE: &str = "BACKEND_UNAVAILABLE";
pub const GRAPH_INVARIANT: &str = "GRAPH_INVARIANT";
pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CANCELLED: &str = "CANCELLED";

/// Maps an error to a stable, machine-readable code.
pub trait DepgraphErrorCode {
    fn error_code(&self) -> &'static str;
}
