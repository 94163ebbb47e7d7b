//! Per-table query functions over a borrowed connection.

pub mod edges;
pub mod nodes;
pub mod parse_cache;

use depgraph_core::errors::StorageError;
use depgraph_core::types::Props;

pub(crate) fn encode_props(table: &str, props: &Props) -> Result<String, StorageError> {
    serde_json::to_string(props).map_err(|e| StorageError::CorruptRow {
        table: table.to_string(),
        message: format!("unserializable props: {e}"),
    })
}

pub(crate) fn decode_props(table: &str, json: &str) -> Result<Props, StorageError> {
    serde_json::from_str(json).map_err(|e| StorageError::CorruptRow {
        table: table.to_string(),
        message: format!("bad props json: {e}"),
    })
}
