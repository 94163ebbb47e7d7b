//! Tests for the event dispatcher.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use depgraph_core::events::{
    DepgraphEventHandler, EventDispatcher, IngestionCompleteEvent, ParseDegradedEvent,
    ScanCompleteEvent, ScanStartedEvent, UnitSkippedEvent,
};

#[derive(Default)]
struct CountingHandler {
    scan_started: AtomicUsize,
    scan_complete: AtomicUsize,
    skipped: AtomicUsize,
    degraded: AtomicUsize,
    ingested: AtomicUsize,
}

impl DepgraphEventHandler for CountingHandler {
    fn on_scan_started(&self, _event: &ScanStartedEvent) {
        self.scan_started.fetch_add(1, Ordering::Relaxed);
    }

    fn on_scan_complete(&self, _event: &ScanCompleteEvent) {
        self.scan_complete.fetch_add(1, Ordering::Relaxed);
    }

    fn on_unit_skipped(&self, _event: &UnitSkippedEvent) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn on_parse_degraded(&self, _event: &ParseDegradedEvent) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    fn on_ingestion_complete(&self, _event: &IngestionCompleteEvent) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }
}

struct PanickingHandler;

impl DepgraphEventHandler for PanickingHandler {
    fn on_scan_started(&self, _event: &ScanStartedEvent) {
        panic!("handler failure");
    }
}

fn started() -> ScanStartedEvent {
    ScanStartedEvent {
        root: PathBuf::from("/export"),
    }
}

#[test]
fn empty_dispatcher_is_a_noop() {
    let dispatcher = EventDispatcher::new();
    assert_eq!(dispatcher.handler_count(), 0);
    dispatcher.emit_scan_started(&started());
}

#[test]
fn every_event_reaches_every_handler() {
    let a = Arc::new(CountingHandler::default());
    let b = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(a.clone());
    dispatcher.register(b.clone());

    dispatcher.emit_scan_started(&started());
    dispatcher.emit_scan_complete(&ScanCompleteEvent {
        units: 3,
        skipped: 1,
        duration_ms: 5,
    });
    dispatcher.emit_unit_skipped(&UnitSkippedEvent {
        path: PathBuf::from("bad.bsl"),
        reason: "not utf-8".into(),
    });
    dispatcher.emit_parse_degraded(&ParseDegradedEvent {
        unit: "m.bsl".into(),
        reason: "timeout".into(),
    });
    dispatcher.emit_ingestion_complete(&IngestionCompleteEvent {
        generation: 1,
        upserted_nodes: 4,
        upserted_edges: 2,
        removed: 0,
        unresolved: 0,
        duration_ms: 1,
    });

    for h in [&a, &b] {
        assert_eq!(h.scan_started.load(Ordering::Relaxed), 1);
        assert_eq!(h.scan_complete.load(Ordering::Relaxed), 1);
        assert_eq!(h.skipped.load(Ordering::Relaxed), 1);
        assert_eq!(h.degraded.load(Ordering::Relaxed), 1);
        assert_eq!(h.ingested.load(Ordering::Relaxed), 1);
    }
}

#[test]
fn panicking_handler_does_not_stop_later_handlers() {
    let counter = Arc::new(CountingHandler::default());
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(PanickingHandler));
    dispatcher.register(counter.clone());

    dispatcher.emit_scan_started(&started());
    assert_eq!(counter.scan_started.load(Ordering::Relaxed), 1);
}
