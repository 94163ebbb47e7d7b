//! Source reader configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScanConfig {
    /// Files larger than this are skipped. Default: 4 MiB.
    pub max_file_size: Option<u64>,
    /// Hashing threads. Default: available parallelism.
    pub threads: Option<usize>,
    /// Extra gitignore-style globs to exclude.
    pub extra_ignore: Vec<String>,
    /// Follow symlinks while walking. Default: false.
    pub follow_symlinks: Option<bool>,
}

impl ScanConfig {
    pub fn effective_max_file_size(&self) -> u64 {
        self.max_file_size.unwrap_or(4 * 1024 * 1024)
    }

    pub fn effective_threads(&self) -> usize {
        self.threads.unwrap_or_else(default_parallelism)
    }

    pub fn effective_follow_symlinks(&self) -> bool {
        self.follow_symlinks.unwrap_or(false)
    }

    pub(crate) fn merge_from(&mut self, other: &ScanConfig) {
        if other.max_file_size.is_some() {
            self.max_file_size = other.max_file_size;
        }
        if other.threads.is_some() {
            self.threads = other.threads;
        }
        if !other.extra_ignore.is_empty() {
            self.extra_ignore = other.extra_ignore.clone();
        }
        if other.follow_symlinks.is_some() {
            self.follow_symlinks = other.follow_symlinks;
        }
    }
}

pub(crate) fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
