//! EventDispatcher: synchronous event dispatch, zero cost when empty.

use std::sync::Arc;

use super::handler::DepgraphEventHandler;
use super::types::*;

#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn DepgraphEventHandler>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event handler.
    pub fn register(&mut self, handler: Arc<dyn DepgraphEventHandler>) {
        self.handlers.push(handler);
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// A panicking handler is logged and does not stop later handlers.
    fn emit<F: Fn(&dyn DepgraphEventHandler)>(&self, f: F) {
        for handler in &self.handlers {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                f(handler.as_ref());
            }));
            if result.is_err() {
                tracing::error!("event handler panicked");
            }
        }
    }

    /// Emit `on_scan_started` to every handler.
    pub fn emit_scan_started(&self, event: &ScanStartedEvent) {
        self.emit(|h| h.on_scan_started(event));
    }

    /// Emit `on_scan_complete` to every handler.
    pub fn emit_scan_complete(&self, event: &ScanCompleteEvent) {
        self.emit(|h| h.on_scan_complete(event));
    }

    /// Emit `on_unit_skipped` to every handler.
    pub fn emit_unit_skipped(&self, event: &UnitSkippedEvent) {
        self.emit(|h| h.on_unit_skipped(event));
    }

    /// Emit `on_parse_degraded` to every handler.
    pub fn emit_parse_degraded(&self, event: &ParseDegradedEvent) {
        self.emit(|h| h.on_parse_degraded(event));
    }

    /// Emit `on_ingestion_complete` to every handler.
    pub fn emit_ingestion_complete(&self, event: &IngestionCompleteEvent) {
        self.emit(|h| h.on_ingestion_complete(event));
    }
}
