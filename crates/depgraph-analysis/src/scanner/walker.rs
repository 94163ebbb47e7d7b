//! Directory walk using the `ignore` crate.

use std::path::{Path, PathBuf};

use depgraph_core::config::ScanConfig;
use depgraph_core::errors::ScanError;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use super::classify::classify;
use super::types::UnitKind;

/// A file the walker found and classified as a unit.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub abs_path: PathBuf,
    pub rel_path: String,
    pub kind: UnitKind,
    pub file_size: u64,
}

#[derive(Debug, Default)]
pub struct WalkResult {
    pub files: Vec<DiscoveredFile>,
    pub discovered: usize,
    pub ignored: usize,
    /// Units rejected before reading (oversized, unreadable metadata).
    pub rejected: Vec<(String, String)>,
}

/// Walk `root` and classify every regular file.
///
/// Exported trees are not git checkouts, so VCS ignore files are not honored;
/// only `ScanConfig::extra_ignore` globs exclude paths.
pub fn walk(root: &Path, config: &ScanConfig) -> Result<WalkResult, ScanError> {
    let mut overrides = OverrideBuilder::new(root);
    for glob in &config.extra_ignore {
        let pattern = if glob.starts_with('!') {
            glob.clone()
        } else {
            format!("!{glob}")
        };
        overrides.add(&pattern).map_err(|e| ScanError::Walk {
            message: format!("invalid ignore glob {glob}: {e}"),
        })?;
    }
    let overrides = overrides.build().map_err(|e| ScanError::Walk {
        message: e.to_string(),
    })?;

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .follow_links(config.effective_follow_symlinks())
        .overrides(overrides)
        .build();

    let max_size = config.effective_max_file_size();
    let mut result = WalkResult::default();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "walker error");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        result.discovered += 1;

        let Some(rel_path) = relative_path(root, entry.path()) else {
            result.ignored += 1;
            continue;
        };
        let Some(kind) = classify(&rel_path) else {
            result.ignored += 1;
            continue;
        };

        let file_size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                result.rejected.push((rel_path, e.to_string()));
                continue;
            }
        };
        if file_size > max_size {
            result
                .rejected
                .push((rel_path, format!("exceeds max file size ({file_size} > {max_size})")));
            continue;
        }

        result.files.push(DiscoveredFile {
            abs_path: entry.path().to_path_buf(),
            rel_path,
            kind,
            file_size,
        });
    }

    result.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(result)
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
