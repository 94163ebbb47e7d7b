//! Ingestion pipeline: scan → diff → parse → build, one run at a time.
//!
//! Parsing fans out over the parser pool; graph ingestion is serialized
//! through the builder mutex. Readers that need a consistent snapshot wait
//! on `IngestionStatus::wait_until_idle` or listen for
//! `IngestionCompleteEvent`.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use depgraph_core::config::DepgraphConfig;
use depgraph_core::errors::{GraphError, PipelineError, PipelineResult};
use depgraph_core::events::{
    EventDispatcher, IngestionCompleteEvent, ParseDegradedEvent, ScanCompleteEvent,
    ScanStartedEvent, UnitSkippedEvent,
};
use depgraph_core::traits::{Cancellable, CancellationToken, GraphBackend, ParseCacheStore};
use depgraph_core::types::collections::FxHashSet;
use depgraph_core::types::{GraphDelta, NodeId};
use serde::{Deserialize, Serialize};

use crate::graph::{GraphBuilder, IngestRecord, UnresolvedRef};
use crate::parsers::{CacheStats, DeepAnalyzer, ParserManager, StructuralRecord};
use crate::scanner::incremental::compute_diff;
use crate::scanner::{Scanner, SkippedUnit, SourceUnit};

#[derive(Debug, Default)]
struct StatusState {
    running: bool,
    generation: u64,
}

/// Shared ingestion-complete signal.
#[derive(Debug, Clone, Default)]
pub struct IngestionStatus {
    inner: Arc<(Mutex<StatusState>, Condvar)>,
}

impl IngestionStatus {
    fn lock(&self) -> MutexGuard<'_, StatusState> {
        self.inner.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_idle(&self) -> bool {
        !self.lock().running
    }

    /// Number of completed ingestion runs.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Block until no run is in progress. Returns false on timeout.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let result = self
            .inner
            .1
            .wait_timeout_while(guard, timeout, |s| s.running);
        match result {
            Ok((state, _)) => !state.running,
            Err(poisoned) => !poisoned.into_inner().0.running,
        }
    }

    fn begin(&self) -> RunGuard<'_> {
        self.lock().running = true;
        RunGuard { status: self }
    }
}

/// Marks the run finished even when ingestion bails out early.
struct RunGuard<'a> {
    status: &'a IngestionStatus,
}

impl RunGuard<'_> {
    /// Bump the generation; the run turns idle when the guard drops.
    fn finish(self) -> u64 {
        let mut state = self.status.lock();
        state.generation += 1;
        state.generation
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.status.lock().running = false;
        self.status.inner.1.notify_all();
    }
}

/// What one ingestion run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub generation: u64,
    pub units: usize,
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub cache_hits: usize,
    pub skipped_units: Vec<SkippedUnit>,
    pub degraded_units: Vec<String>,
    pub failed_units: Vec<String>,
    pub unresolved: Vec<UnresolvedRef>,
    pub upserted_nodes: usize,
    pub upserted_edges: usize,
    pub removed_ids: usize,
    pub duration_ms: u64,
}

pub struct IngestionPipeline {
    config: DepgraphConfig,
    parser: ParserManager,
    builder: Mutex<GraphBuilder>,
    dispatcher: Arc<EventDispatcher>,
    status: IngestionStatus,
    cancellation: CancellationToken,
}

impl IngestionPipeline {
    pub fn new(backend: Arc<dyn GraphBackend>, config: DepgraphConfig) -> Self {
        let builder = GraphBuilder::new(backend, config.graph.clone());
        Self::with_builder(builder, config)
    }

    /// Continue from a graph persisted by an earlier process.
    pub fn resume(backend: Arc<dyn GraphBackend>, config: DepgraphConfig) -> Result<Self, GraphError> {
        let builder = GraphBuilder::resume(backend, config.graph.clone())?;
        Ok(Self::with_builder(builder, config))
    }

    fn with_builder(builder: GraphBuilder, config: DepgraphConfig) -> Self {
        Self {
            parser: ParserManager::new(config.parser.clone()),
            builder: Mutex::new(builder),
            dispatcher: Arc::new(EventDispatcher::new()),
            status: IngestionStatus::default(),
            cancellation: CancellationToken::new(),
            config,
        }
    }

    pub fn with_cache_store(mut self, store: Arc<dyn ParseCacheStore>) -> Self {
        self.parser = self.parser.with_store(store);
        self
    }

    pub fn with_deep_analyzer(mut self, analyzer: Arc<dyn DeepAnalyzer>) -> Self {
        self.parser = self.parser.with_deep_analyzer(analyzer);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn status(&self) -> IngestionStatus {
        self.status.clone()
    }

    /// Token that cancels the run in progress. Each run starts uncancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.parser.cache_stats()
    }

    fn builder(&self) -> MutexGuard<'_, GraphBuilder> {
        self.builder.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancellation.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Ingest a whole export tree. Units that vanished since the previous
    /// run are removed from the graph.
    ///
    /// Cancellation is honored until the builder commits; after that the
    /// run completes so the graph never holds half of a run.
    pub fn ingest_tree(&self, root: &Path) -> Result<PipelineResult<IngestionSummary>, PipelineError> {
        let mut builder = self.builder();
        self.cancellation.reset();
        let run = self.status.begin();
        let started = Instant::now();
        tracing::info!(root = %root.display(), "ingestion started");

        self.dispatcher.emit_scan_started(&ScanStartedEvent {
            root: root.to_path_buf(),
        });
        let scanner = Scanner::new(self.config.scan.clone()).with_cancellation(self.cancellation.clone());
        let scan = scanner.scan(root)?;
        for skipped in &scan.skipped_units {
            self.dispatcher.emit_unit_skipped(&UnitSkippedEvent {
                path: root.join(&skipped.path),
                reason: skipped.reason.clone(),
            });
        }
        self.dispatcher.emit_scan_complete(&ScanCompleteEvent {
            units: scan.units.len(),
            skipped: scan.skipped_units.len(),
            duration_ms: scan.stats.duration_ms,
        });
        self.check_cancelled()?;

        let diff = compute_diff(&scan.units, &builder.unit_hashes());
        tracing::info!(
            added = diff.added.len(),
            modified = diff.modified.len(),
            unchanged = diff.unchanged.len(),
            removed = diff.removed.len(),
            "scan diff computed"
        );

        let wanted: FxHashSet<&str> = diff
            .added
            .iter()
            .chain(&diff.modified)
            .map(String::as_str)
            .collect();
        let changed: Vec<SourceUnit> = scan
            .units
            .iter()
            .filter(|u| wanted.contains(u.path.as_str()))
            .cloned()
            .collect();

        let mut result = PipelineResult::new(IngestionSummary {
            units: scan.units.len(),
            added: diff.added.len(),
            modified: diff.modified.len(),
            unchanged: diff.unchanged.len(),
            removed: diff.removed.len(),
            skipped_units: scan.skipped_units.clone(),
            ..IngestionSummary::default()
        });

        let mut delta = self.parse_and_ingest(&mut builder, &changed, &mut result)?;
        for path in &diff.removed {
            delta.merge(builder.remove_unit(path).map_err(PipelineError::from)?);
        }

        self.finish(&builder, run, delta, started, &mut result);
        Ok(result)
    }

    /// Ingest individual units without scanning; nothing is removed.
    pub fn ingest_units(&self, units: &[SourceUnit]) -> Result<PipelineResult<IngestionSummary>, PipelineError> {
        let mut builder = self.builder();
        self.cancellation.reset();
        let run = self.status.begin();
        let started = Instant::now();
        let mut result = PipelineResult::new(IngestionSummary {
            units: units.len(),
            ..IngestionSummary::default()
        });
        let delta = self.parse_and_ingest(&mut builder, units, &mut result)?;
        self.finish(&builder, run, delta, started, &mut result);
        Ok(result)
    }

    /// Remove a unit that disappeared from the source tree.
    pub fn remove_unit(&self, path: &str) -> Result<GraphDelta, PipelineError> {
        let mut builder = self.builder();
        let _run = self.status.begin();
        Ok(builder.remove_unit(path)?)
    }

    pub fn link_requirement(&self, key: &str, code: &NodeId) -> Result<GraphDelta, GraphError> {
        self.builder().link_requirement(key, code)
    }

    pub fn link_incident(&self, key: &str, code: &NodeId) -> Result<GraphDelta, GraphError> {
        self.builder().link_incident(key, code)
    }

    pub fn unresolved(&self) -> Vec<UnresolvedRef> {
        self.builder().unresolved()
    }

    fn parse_and_ingest(
        &self,
        builder: &mut GraphBuilder,
        units: &[SourceUnit],
        result: &mut PipelineResult<IngestionSummary>,
    ) -> Result<GraphDelta, PipelineError> {
        let outcomes = self
            .parser
            .parse_many(units, self.config.parser.effective_parallelism());
        self.check_cancelled()?;

        let mut records = Vec::with_capacity(units.len());
        for (unit, outcome) in units.iter().zip(outcomes) {
            if outcome.cache_hit {
                result.data.cache_hits += 1;
            }
            if let Some(reason) = outcome.degraded_reason {
                self.dispatcher.emit_parse_degraded(&ParseDegradedEvent {
                    unit: unit.path.clone(),
                    reason,
                });
                result.data.degraded_units.push(unit.path.clone());
            }
            let record = match outcome.result {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(path = %unit.path, error = %e, "parse failed, ingesting empty record");
                    result.add_error(PipelineError::Parse(e));
                    StructuralRecord::failed()
                }
            };
            if record.flags.parse_failed {
                result.data.failed_units.push(unit.path.clone());
            }
            tracing::debug!(
                path = %unit.path,
                declarations = record.declarations.len(),
                references = record.references.len(),
                "unit parsed"
            );
            records.push(IngestRecord::new(unit, record));
        }

        Ok(builder.ingest(&records)?)
    }

    fn finish(
        &self,
        builder: &GraphBuilder,
        run: RunGuard<'_>,
        delta: GraphDelta,
        started: Instant,
        result: &mut PipelineResult<IngestionSummary>,
    ) {
        let summary = &mut result.data;
        summary.unresolved = builder.unresolved();
        summary.upserted_nodes = delta.upserted_nodes.len();
        summary.upserted_edges = delta.upserted_edges.len();
        summary.removed_ids = delta.removed_ids.len();
        summary.duration_ms = started.elapsed().as_millis() as u64;
        summary.generation = run.finish();

        self.dispatcher.emit_ingestion_complete(&IngestionCompleteEvent {
            generation: summary.generation,
            upserted_nodes: summary.upserted_nodes,
            upserted_edges: summary.upserted_edges,
            removed: summary.removed_ids,
            unresolved: summary.unresolved.len(),
            duration_ms: summary.duration_ms,
        });
        tracing::info!(
            generation = summary.generation,
            units = summary.units,
            upserted_nodes = summary.upserted_nodes,
            upserted_edges = summary.upserted_edges,
            removed = summary.removed_ids,
            unresolved = summary.unresolved.len(),
            errors = result.errors.len(),
            duration_ms = summary.duration_ms,
            "ingestion complete"
        );
    }
}
