//! Scanner output types.

use serde::{Deserialize, Serialize};

/// What a discovered file is, as far as ingestion is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// `Configuration.xml` at the export root.
    ConfigurationRoot,
    /// `<Plural>/<Name>.xml`, e.g. `Catalogs/Products.xml`.
    MetadataDescriptor,
    /// Any `.bsl` source module.
    SourceModule,
}

impl UnitKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ConfigurationRoot => "configuration_root",
            Self::MetadataDescriptor => "metadata_descriptor",
            Self::SourceModule => "source_module",
        }
    }

    pub fn is_descriptor(&self) -> bool {
        matches!(self, Self::ConfigurationRoot | Self::MetadataDescriptor)
    }
}

/// One ingestible file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// Relative to the ingestion root, `/`-separated.
    pub path: String,
    pub kind: UnitKind,
    /// UTF-8 text with any leading byte-order mark removed.
    pub content: String,
    /// xxh3-64 of the raw file bytes.
    pub hash: u64,
}

impl SourceUnit {
    /// Build a unit from in-memory text (tests, pipelines fed without a walk).
    pub fn from_text(path: impl Into<String>, kind: UnitKind, content: impl Into<String>) -> Self {
        let content = content.into();
        let hash = super::hasher::hash_content(content.as_bytes());
        Self {
            path: path.into(),
            kind,
            content,
            hash,
        }
    }
}

/// A file that looked ingestible but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Regular files seen by the walker.
    pub discovered: usize,
    pub units: usize,
    /// Files that are not units (unknown extension or location).
    pub ignored: usize,
    pub skipped: usize,
    pub total_bytes: u64,
    pub duration_ms: u64,
}

/// Everything one walk produced. `units` is sorted by path.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub units: Vec<SourceUnit>,
    pub skipped_units: Vec<SkippedUnit>,
    pub stats: ScanStats,
}

/// Per-path change classification against a previous scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
}

impl ScanDiff {
    /// True when nothing was added, modified or removed.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }
}
