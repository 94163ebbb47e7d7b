//! Structural records produced by the parser and cached by content hash.

use depgraph_core::errors::ParseError;
use depgraph_core::types::MetadataKind;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Procedure,
    Function,
}

/// Per-declaration control-flow metrics from the deep path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepMetrics {
    pub cyclomatic: u32,
    pub blocks: u32,
    pub cf_edges: u32,
    pub max_nesting: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub is_export: bool,
    /// 1-based, inclusive.
    pub line_range: (u32, u32),
    /// Fast-path estimate, replaced by `deep.cyclomatic` when available.
    pub complexity: u32,
    pub params: SmallVec<[String; 4]>,
    pub region: Option<String>,
    pub directives: SmallVec<[String; 2]>,
    pub requirements: Vec<String>,
    pub incidents: Vec<String>,
    pub deep: Option<DeepMetrics>,
}

impl Declaration {
    pub fn loc(&self) -> u32 {
        self.line_range.1.saturating_sub(self.line_range.0) + 1
    }

    /// Complexity preferring the deep measurement.
    pub fn effective_complexity(&self) -> u32 {
        self.deep.map_or(self.complexity, |d| d.cyclomatic)
    }

    /// `Function Name(A, B) Export`.
    pub fn signature(&self) -> String {
        let keyword = match self.kind {
            DeclKind::Procedure => "Procedure",
            DeclKind::Function => "Function",
        };
        let export = if self.is_export { " Export" } else { "" };
        format!("{keyword} {}({}){export}", self.name, self.params.join(", "))
    }
}

/// A raw call expression. `from_decl` is `None` for module-body code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRef {
    pub from_decl: Option<String>,
    pub callee_name: String,
    /// `Utils` in `Utils.Calculate()`.
    pub qualifier: Option<String>,
    pub line: u32,
}

/// A reference to a metadata object, e.g. `Catalogs.Products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRef {
    pub from_decl: Option<String>,
    pub kind: MetadataKind,
    /// Object name without the kind prefix.
    pub name: String,
    pub line: u32,
}

impl MetadataRef {
    /// `Catalog.Products`.
    pub fn object_id(&self) -> String {
        format!("{}.{}", self.kind.name(), self.name)
    }
}

/// What an XML descriptor declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorInfo {
    /// `None` for the root `Configuration` descriptor.
    pub kind: Option<MetadataKind>,
    pub name: String,
    /// Object ids (`Catalog.Products`) listed under the root's `ChildObjects`.
    pub child_objects: Vec<String>,
    /// Object ids referenced through typed attributes, sorted and deduplicated.
    pub type_refs: Vec<String>,
    pub attribute_count: u32,
    /// Form names listed under `ChildObjects`.
    pub forms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFlags {
    pub parse_failed: bool,
    pub deep_applied: bool,
    pub deep_degraded: bool,
}

/// Path-independent parse result of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralRecord {
    pub declarations: Vec<Declaration>,
    pub references: Vec<CallRef>,
    pub metadata_refs: Vec<MetadataRef>,
    pub descriptor: Option<DescriptorInfo>,
    /// Non-blank lines.
    pub loc: u32,
    pub flags: RecordFlags,
}

impl StructuralRecord {
    pub fn failed() -> Self {
        Self {
            flags: RecordFlags {
                parse_failed: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        let needle = name.to_lowercase();
        self.declarations
            .iter()
            .find(|d| d.name.to_lowercase() == needle)
    }
}

/// Result of parsing one unit inside `parse_many`.
#[derive(Debug)]
pub struct ParseOutcome {
    pub path: String,
    pub result: Result<StructuralRecord, ParseError>,
    pub cache_hit: bool,
    /// Set when the deep path was requested but degraded.
    pub degraded_reason: Option<String>,
}
