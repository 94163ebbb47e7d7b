//! Event payload types.

use std::path::PathBuf;

/// Payload for `on_scan_started`.
#[derive(Debug, Clone)]
pub struct ScanStartedEvent {
    pub root: PathBuf,
}

/// Payload for `on_scan_complete`.
#[derive(Debug, Clone)]
pub struct ScanCompleteEvent {
    pub units: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

/// Payload for `on_unit_skipped`.
#[derive(Debug, Clone)]
pub struct UnitSkippedEvent {
    pub path: PathBuf,
    pub reason: String,
}

/// Payload for `on_parse_degraded`.
#[derive(Debug, Clone)]
pub struct ParseDegradedEvent {
    pub unit: String,
    pub reason: String,
}

/// Payload for `on_ingestion_complete`. Readers waiting for a consistent
/// snapshot may query once this fires.
#[derive(Debug, Clone)]
pub struct IngestionCompleteEvent {
    pub generation: u64,
    pub upserted_nodes: usize,
    pub upserted_edges: usize,
    pub removed: usize,
    pub unresolved: usize,
    pub duration_ms: u64,
}
