//! Event handler trait with no-op defaults.

use super::types::*;

pub trait DepgraphEventHandler: Send + Sync {
    fn on_scan_started(&self, _event: &ScanStartedEvent) {}

    fn on_scan_complete(&self, _event: &ScanCompleteEvent) {}

    fn on_unit_skipped(&self, _event: &UnitSkippedEvent) {}

    fn on_parse_degraded(&self, _event: &ParseDegradedEvent) {}

    fn on_ingestion_complete(&self, _event: &IngestionCompleteEvent) {}
}
