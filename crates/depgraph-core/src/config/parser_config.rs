//! Incremental parser configuration.

use serde::{Deserialize, Serialize};

use super::scan_config::default_parallelism;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParserConfig {
    /// Worker pool size for `parse_many`. Default: available parallelism.
    pub parallelism: Option<usize>,
    /// Run the deep path when an analyzer is registered. Default: false.
    pub deep_parse: Option<bool>,
    /// Per-unit deep analysis budget. Default: 2000ms.
    pub deep_timeout_ms: Option<u64>,
    /// Threads reserved for the deep path. Default: min(parallelism, 4).
    pub deep_workers: Option<usize>,
    /// In-memory parse cache capacity (records). Default: 50_000.
    pub cache_capacity: Option<u64>,
}

impl ParserConfig {
    pub fn effective_parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(default_parallelism).max(1)
    }

    pub fn effective_deep_parse(&self) -> bool {
        self.deep_parse.unwrap_or(false)
    }

    pub fn effective_deep_timeout_ms(&self) -> u64 {
        self.deep_timeout_ms.unwrap_or(2000)
    }

    pub fn effective_deep_workers(&self) -> usize {
        self.deep_workers
            .unwrap_or_else(|| self.effective_parallelism().min(4))
            .max(1)
    }

    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity.unwrap_or(50_000)
    }

    pub(crate) fn merge_from(&mut self, other: &ParserConfig) {
        if other.parallelism.is_some() {
            self.parallelism = other.parallelism;
        }
        if other.deep_parse.is_some() {
            self.deep_parse = other.deep_parse;
        }
        if other.deep_timeout_ms.is_some() {
            self.deep_timeout_ms = other.deep_timeout_ms;
        }
        if other.deep_workers.is_some() {
            self.deep_workers = other.deep_workers;
        }
        if other.cache_capacity.is_some() {
            self.cache_capacity = other.cache_capacity;
        }
    }
}
