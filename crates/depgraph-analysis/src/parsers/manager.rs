//! ParserManager: cache lookup, then the fast path and the optional deep path.

use std::sync::Arc;
use std::time::Duration;

use depgraph_core::config::ParserConfig;
use depgraph_core::errors::ParseError;
use depgraph_core::traits::{CacheKey, ParseCacheStore};
use rayon::prelude::*;

use super::bsl::parse_module;
use super::cache::{CacheStats, ParseCache};
use super::deep::{DeepAnalyzer, DeepWorkerPool};
use super::metadata_xml::parse_descriptor;
use super::types::{ParseOutcome, StructuralRecord};
use crate::scanner::hasher::hash_content;
use crate::scanner::{SourceUnit, UnitKind};

/// Cache namespace for modules parsed with the deep path enabled, so
/// fast-only and deep records never shadow each other.
const DEEP_MODULE_TAG: &str = "source_module+deep";

pub struct ParserManager {
    config: ParserConfig,
    cache: ParseCache,
    deep: Option<(Arc<dyn DeepAnalyzer>, DeepWorkerPool)>,
}

impl ParserManager {
    pub fn new(config: ParserConfig) -> Self {
        let cache = ParseCache::new(config.effective_cache_capacity());
        Self {
            config,
            cache,
            deep: None,
        }
    }

    /// Layer a persistent store under the in-memory cache.
    pub fn with_store(mut self, store: Arc<dyn ParseCacheStore>) -> Self {
        self.cache = self.cache.with_store(store);
        self
    }

    /// Register the deep-path capability. It only runs when
    /// `ParserConfig::deep_parse` is also enabled.
    pub fn with_deep_analyzer(mut self, analyzer: Arc<dyn DeepAnalyzer>) -> Self {
        let pool = DeepWorkerPool::new(self.config.effective_deep_workers());
        self.deep = Some((analyzer, pool));
        self
    }

    pub fn deep_enabled(&self) -> bool {
        self.config.effective_deep_parse() && self.deep.is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn cache_key(&self, unit: &SourceUnit) -> CacheKey {
        let unit_kind = match unit.kind {
            UnitKind::SourceModule if self.deep_enabled() => DEEP_MODULE_TAG,
            kind => kind.tag(),
        };
        CacheKey {
            content_hash: hash_content(unit.content.as_bytes()),
            unit_kind,
        }
    }

    /// Parse one unit. Parse failures and deep-path problems degrade into
    /// record flags; the `Err` arm is reserved for infrastructure failures.
    pub fn parse(&self, unit: &SourceUnit) -> Result<StructuralRecord, ParseError> {
        self.parse_outcome(unit).result
    }

    pub fn parse_outcome(&self, unit: &SourceUnit) -> ParseOutcome {
        let key = self.cache_key(unit);
        if let Some(record) = self.cache.get(&key) {
            tracing::debug!(path = %unit.path, "parse cache hit");
            return ParseOutcome {
                path: unit.path.clone(),
                result: Ok(record.as_ref().clone()),
                cache_hit: true,
                degraded_reason: None,
            };
        }

        let mut record = match unit.kind {
            UnitKind::SourceModule => parse_module(&unit.content),
            UnitKind::ConfigurationRoot | UnitKind::MetadataDescriptor => {
                parse_descriptor(&unit.content)
            }
        };
        if record.flags.parse_failed {
            tracing::warn!(path = %unit.path, "parse failed, continuing with empty record");
        }

        let mut degraded_reason = None;
        if unit.kind == UnitKind::SourceModule && !record.declarations.is_empty() {
            if let Some((analyzer, pool)) = self.deep.as_ref().filter(|_| self.deep_enabled()) {
                let timeout = Duration::from_millis(self.config.effective_deep_timeout_ms());
                match pool.run(
                    analyzer,
                    &unit.path,
                    &unit.content,
                    &record.declarations,
                    timeout,
                ) {
                    Ok(metrics) => {
                        for (decl, m) in record.declarations.iter_mut().zip(metrics) {
                            decl.deep = Some(m);
                        }
                        record.flags.deep_applied = true;
                    }
                    Err(e) => {
                        tracing::warn!(path = %unit.path, error = %e, "deep analysis degraded to fast path");
                        record.flags.deep_degraded = true;
                        degraded_reason = Some(e.to_string());
                    }
                }
            }
        }

        // A degraded record is the fast-path result for this content and is
        // served as-is until the content changes.
        self.cache.put(key, Arc::new(record.clone()));

        ParseOutcome {
            path: unit.path.clone(),
            result: Ok(record),
            cache_hit: false,
            degraded_reason,
        }
    }

    /// Parse independent units on a bounded pool of `parallel_degree`
    /// workers. Output order matches input order.
    pub fn parse_many(&self, units: &[SourceUnit], parallel_degree: usize) -> Vec<ParseOutcome> {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(parallel_degree.max(1))
            .thread_name(|i| format!("depgraph-parse-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                let message = e.to_string();
                return units
                    .iter()
                    .map(|u| ParseOutcome {
                        path: u.path.clone(),
                        result: Err(ParseError::Pool {
                            message: message.clone(),
                        }),
                        cache_hit: false,
                        degraded_reason: None,
                    })
                    .collect();
            }
        };
        pool.install(|| units.par_iter().map(|u| self.parse_outcome(u)).collect())
    }

    /// `parse_many` with the configured parallelism.
    pub fn parse_all(&self, units: &[SourceUnit]) -> Vec<ParseOutcome> {
        self.parse_many(units, self.config.effective_parallelism())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::deep::BlockStructureAnalyzer;

    fn module(path: &str, body: &str) -> SourceUnit {
        SourceUnit::from_text(path, UnitKind::SourceModule, body)
    }

    #[test]
    fn second_parse_is_a_cache_hit() {
        let parser = ParserManager::new(ParserConfig::default());
        let unit = module("a.bsl", "Процедура А()\nКонецПроцедуры");
        let first = parser.parse_outcome(&unit);
        let second = parser.parse_outcome(&unit);
        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.result.unwrap(), second.result.unwrap());
    }

    #[test]
    fn identical_content_at_another_path_reuses_the_record() {
        let parser = ParserManager::new(ParserConfig::default());
        parser.parse(&module("a.bsl", "Procedure X()\nEndProcedure")).unwrap();
        let other = parser.parse_outcome(&module("b.bsl", "Procedure X()\nEndProcedure"));
        assert!(other.cache_hit);
    }

    #[test]
    fn deep_path_requires_flag_and_analyzer() {
        let unit = module("a.bsl", "Function F()\n If A Then\n EndIf;\nEndFunction");

        let off = ParserManager::new(ParserConfig::default())
            .with_deep_analyzer(Arc::new(BlockStructureAnalyzer));
        assert!(!off.parse(&unit).unwrap().flags.deep_applied);

        let config = ParserConfig {
            deep_parse: Some(true),
            ..Default::default()
        };
        let on = ParserManager::new(config).with_deep_analyzer(Arc::new(BlockStructureAnalyzer));
        let record = on.parse(&unit).unwrap();
        assert!(record.flags.deep_applied);
        assert_eq!(record.declarations[0].effective_complexity(), 2);
    }

    #[test]
    fn parse_many_preserves_order() {
        let parser = ParserManager::new(ParserConfig::default());
        let units: Vec<_> = (0..20)
            .map(|i| module(&format!("m{i}.bsl"), &format!("Procedure P{i}()\nEndProcedure")))
            .collect();
        let outcomes = parser.parse_many(&units, 4);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.path, format!("m{i}.bsl"));
            let record = outcome.result.as_ref().unwrap();
            assert_eq!(record.declarations[0].name, format!("P{i}"));
        }
    }
}
