//! Scanner: walks an export tree and hashes what it reads.

use std::path::Path;
use std::time::Instant;

use depgraph_core::config::ScanConfig;
use depgraph_core::errors::ScanError;
use depgraph_core::traits::{Cancellable, CancellationToken};
use rayon::prelude::*;

use super::hasher::hash_content;
use super::types::{ScanOutput, ScanStats, SkippedUnit, SourceUnit};
use super::walker::{walk, DiscoveredFile};

const UTF8_BOM: &str = "\u{feff}";

pub struct Scanner {
    config: ScanConfig,
    cancellation: CancellationToken,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Walk `root`, read every unit and compute its content hash.
    ///
    /// Only a missing or non-directory root is an error; per-file failures
    /// land in `ScanOutput::skipped_units`.
    pub fn scan(&self, root: &Path) -> Result<ScanOutput, ScanError> {
        let start = Instant::now();
        validate_root(root)?;

        let walked = walk(root, &self.config)?;
        if self.cancellation.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.effective_threads())
            .build()
            .map_err(|e| ScanError::Walk {
                message: format!("thread pool: {e}"),
            })?;

        let read: Vec<Result<SourceUnit, SkippedUnit>> = pool.install(|| {
            walked
                .files
                .par_iter()
                .map(|file| {
                    if self.cancellation.is_cancelled() {
                        return Err(SkippedUnit {
                            path: file.rel_path.clone(),
                            reason: "cancelled".to_string(),
                        });
                    }
                    read_unit(file)
                })
                .collect()
        });
        if self.cancellation.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let mut output = ScanOutput::default();
        for (path, reason) in walked.rejected {
            tracing::warn!(path = %path, reason = %reason, "skipping unit");
            output.skipped_units.push(SkippedUnit { path, reason });
        }
        for item in read {
            match item {
                Ok(unit) => output.units.push(unit),
                Err(skipped) => {
                    tracing::warn!(path = %skipped.path, reason = %skipped.reason, "skipping unreadable unit");
                    output.skipped_units.push(skipped);
                }
            }
        }
        output.skipped_units.sort_by(|a, b| a.path.cmp(&b.path));

        output.stats = ScanStats {
            discovered: walked.discovered,
            units: output.units.len(),
            ignored: walked.ignored,
            skipped: output.skipped_units.len(),
            total_bytes: output.units.iter().map(|u| u.content.len() as u64).sum(),
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            units = output.stats.units,
            skipped = output.stats.skipped,
            ignored = output.stats.ignored,
            "scan complete"
        );
        Ok(output)
    }
}

fn validate_root(root: &Path) -> Result<(), ScanError> {
    match std::fs::metadata(root) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(ScanError::InvalidRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn read_unit(file: &DiscoveredFile) -> Result<SourceUnit, SkippedUnit> {
    let bytes = std::fs::read(&file.abs_path).map_err(|e| SkippedUnit {
        path: file.rel_path.clone(),
        reason: e.to_string(),
    })?;
    let hash = hash_content(&bytes);
    let text = String::from_utf8(bytes).map_err(|_| SkippedUnit {
        path: file.rel_path.clone(),
        reason: "content is not valid UTF-8".to_string(),
    })?;
    let content = match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    };
    tracing::debug!(path = %file.rel_path, kind = file.kind.tag(), "read unit");
    Ok(SourceUnit {
        path: file.rel_path.clone(),
        kind: file.kind,
        content,
        hash,
    })
}
