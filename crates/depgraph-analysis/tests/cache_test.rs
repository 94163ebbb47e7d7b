//! Parse cache: identical content never reaches the deep path twice.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use depgraph_analysis::parsers::{
    BlockStructureAnalyzer, DeepAnalyzer, DeepMetrics, Declaration, ParserManager,
};
use depgraph_analysis::scanner::{SourceUnit, UnitKind};
use depgraph_core::config::ParserConfig;
use depgraph_core::errors::ParseError;
use depgraph_core::traits::{Cancellable, CancellationToken, ParseCacheStore};
use depgraph_storage::SqliteParseCacheStore;

const SOURCE: &str = "\
Function Price(Item) Export
    If Item = Undefined Then
        Return 0;
    ElsIf Item.Free Then
        Return 0;
    EndIf;
    Return Item.Price;
EndFunction
";

/// Delegates to the block-structure analyzer and counts invocations.
#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

impl DeepAnalyzer for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn analyze(
        &self,
        source: &str,
        declarations: &[Declaration],
        cancel: &CancellationToken,
    ) -> Result<Vec<DeepMetrics>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BlockStructureAnalyzer.analyze(source, declarations, cancel)
    }
}

#[derive(Default)]
struct Failing {
    calls: AtomicUsize,
}

impl DeepAnalyzer for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn analyze(
        &self,
        _source: &str,
        _declarations: &[Declaration],
        _cancel: &CancellationToken,
    ) -> Result<Vec<DeepMetrics>, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ParseError::DeepUnavailable {
            unit: "m.bsl".into(),
            reason: "no engine".into(),
        })
    }
}

fn deep_config() -> ParserConfig {
    ParserConfig {
        deep_parse: Some(true),
        ..Default::default()
    }
}

fn unit() -> SourceUnit {
    SourceUnit::from_text("CommonModules/Pricing/Ext/Module.bsl", UnitKind::SourceModule, SOURCE)
}

#[test]
fn second_parse_skips_deep_path_and_matches_bytes() {
    let analyzer = Arc::new(Counting::default());
    let parser = ParserManager::new(deep_config()).with_deep_analyzer(analyzer.clone());

    let first = parser.parse_outcome(&unit());
    let second = parser.parse_outcome(&unit());
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

    let a = first.result.unwrap();
    let b = second.result.unwrap();
    assert!(a.flags.deep_applied);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn persistent_store_serves_a_fresh_parser() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteParseCacheStore::open(&dir.path().join("cache.db")).unwrap());
    let analyzer = Arc::new(Counting::default());

    let first = ParserManager::new(deep_config())
        .with_store(store.clone())
        .with_deep_analyzer(analyzer.clone())
        .parse(&unit())
        .unwrap();
    assert_eq!(store.len().unwrap(), 1);

    let restarted = ParserManager::new(deep_config())
        .with_store(store.clone())
        .with_deep_analyzer(analyzer.clone());
    let outcome = restarted.parse_outcome(&unit());
    assert!(outcome.cache_hit);
    assert_eq!(outcome.result.unwrap(), first);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn degraded_record_is_cached_like_any_other() {
    let analyzer = Arc::new(Failing::default());
    let parser = ParserManager::new(deep_config()).with_deep_analyzer(analyzer.clone());

    let first = parser.parse_outcome(&unit());
    assert!(first.degraded_reason.is_some());
    let second = parser.parse_outcome(&unit());
    assert!(second.cache_hit);
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);

    let a = first.result.unwrap();
    let b = second.result.unwrap();
    assert!(a.flags.deep_degraded);
    assert_eq!(a.declarations.len(), 1);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

/// Never finishes on its own; waits for cancellation.
#[derive(Default)]
struct Hung {
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl DeepAnalyzer for Hung {
    fn name(&self) -> &str {
        "hung"
    }

    fn analyze(
        &self,
        _source: &str,
        _declarations: &[Declaration],
        cancel: &CancellationToken,
    ) -> Result<Vec<DeepMetrics>, ParseError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let started = Instant::now();
        while !cancel.is_cancelled() && started.elapsed() < Duration::from_secs(30) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
        Err(ParseError::DeepUnavailable {
            unit: String::new(),
            reason: "cancelled".into(),
        })
    }
}

#[test]
fn hung_deep_analyzer_stays_within_its_workers() {
    let analyzer = Arc::new(Hung::default());
    let config = ParserConfig {
        deep_parse: Some(true),
        deep_timeout_ms: Some(5),
        deep_workers: Some(2),
        ..Default::default()
    };
    let parser = ParserManager::new(config).with_deep_analyzer(analyzer.clone());
    let units: Vec<SourceUnit> = (0..50)
        .map(|i| {
            SourceUnit::from_text(
                format!("src/M{i}.bsl"),
                UnitKind::SourceModule,
                format!("Procedure P{i}()\nEndProcedure\n"),
            )
        })
        .collect();

    let outcomes = parser.parse_many(&units, 4);
    assert!(outcomes.iter().all(|o| o.degraded_reason.is_some()));
    assert!(analyzer.peak.load(Ordering::SeqCst) <= 2);

    // Timed-out jobs were cancelled, so the workers drain.
    let waited = Instant::now();
    while analyzer.running.load(Ordering::SeqCst) > 0 && waited.elapsed() < Duration::from_secs(5) {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(analyzer.running.load(Ordering::SeqCst), 0);
}
