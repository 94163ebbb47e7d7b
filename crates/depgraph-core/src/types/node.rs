//! Nodes: stable ids, tagged kinds, and the summaries returned to consumers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::props::{PropValue, Props};

/// Stable node identifier derived from the fully-qualified path and name.
///
/// Ids are compared case-sensitively; name resolution in the builder is the
/// only place that folds case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id of a declaration inside a module: `<module>::<name>`.
    pub fn declaration(module: &NodeId, name: &str) -> Self {
        Self(format!("{}::{}", module.0, name))
    }

    /// Id of the placeholder standing in for an unresolved name.
    pub fn placeholder(awaited_name: &str) -> Self {
        Self(format!("unknown::{}", awaited_name.to_lowercase()))
    }

    pub fn requirement(key: &str) -> Self {
        Self(format!("requirement::{key}"))
    }

    pub fn incident(key: &str) -> Self {
        Self(format!("incident::{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with("unknown::")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Metadata object categories of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetadataKind {
    Catalog,
    Document,
    InformationRegister,
    AccumulationRegister,
    AccountingRegister,
    CalculationRegister,
    Enum,
    Constant,
    Report,
    DataProcessor,
    CommonModule,
    ChartOfCharacteristicTypes,
    ChartOfAccounts,
    BusinessProcess,
    Task,
    ExchangePlan,
    DocumentJournal,
    Other,
}

impl MetadataKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Catalog => "Catalog",
            Self::Document => "Document",
            Self::InformationRegister => "InformationRegister",
            Self::AccumulationRegister => "AccumulationRegister",
            Self::AccountingRegister => "AccountingRegister",
            Self::CalculationRegister => "CalculationRegister",
            Self::Enum => "Enum",
            Self::Constant => "Constant",
            Self::Report => "Report",
            Self::DataProcessor => "DataProcessor",
            Self::CommonModule => "CommonModule",
            Self::ChartOfCharacteristicTypes => "ChartOfCharacteristicTypes",
            Self::ChartOfAccounts => "ChartOfAccounts",
            Self::BusinessProcess => "BusinessProcess",
            Self::Task => "Task",
            Self::ExchangePlan => "ExchangePlan",
            Self::DocumentJournal => "DocumentJournal",
            Self::Other => "Other",
        }
    }

    /// Export folder holding objects of this kind (`Catalogs/`, `Documents/`, ...).
    pub fn folder(&self) -> &'static str {
        match self {
            Self::Catalog => "Catalogs",
            Self::Document => "Documents",
            Self::InformationRegister => "InformationRegisters",
            Self::AccumulationRegister => "AccumulationRegisters",
            Self::AccountingRegister => "AccountingRegisters",
            Self::CalculationRegister => "CalculationRegisters",
            Self::Enum => "Enums",
            Self::Constant => "Constants",
            Self::Report => "Reports",
            Self::DataProcessor => "DataProcessors",
            Self::CommonModule => "CommonModules",
            Self::ChartOfCharacteristicTypes => "ChartsOfCharacteristicTypes",
            Self::ChartOfAccounts => "ChartsOfAccounts",
            Self::BusinessProcess => "BusinessProcesses",
            Self::Task => "Tasks",
            Self::ExchangePlan => "ExchangePlans",
            Self::DocumentJournal => "DocumentJournals",
            Self::Other => "",
        }
    }

    pub fn all() -> &'static [MetadataKind] {
        &[
            Self::Catalog,
            Self::Document,
            Self::InformationRegister,
            Self::AccumulationRegister,
            Self::AccountingRegister,
            Self::CalculationRegister,
            Self::Enum,
            Self::Constant,
            Self::Report,
            Self::DataProcessor,
            Self::CommonModule,
            Self::ChartOfCharacteristicTypes,
            Self::ChartOfAccounts,
            Self::BusinessProcess,
            Self::Task,
            Self::ExchangePlan,
            Self::DocumentJournal,
        ]
    }

    /// Parse a singular kind name (`Catalog`), case-insensitive.
    pub fn from_name(name: &str) -> Option<MetadataKind> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Parse an export folder name (`Catalogs`), case-insensitive.
    pub fn from_folder(folder: &str) -> Option<MetadataKind> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.folder().eq_ignore_ascii_case(folder))
    }

    /// Id of the metadata object `<Kind>.<Name>`.
    pub fn object_id(&self, name: &str) -> NodeId {
        NodeId(format!("{}.{}", self.name(), name))
    }
}

/// Tagged node kind. Immutable once a node is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Configuration,
    Module,
    Function,
    Procedure,
    MetadataObject(MetadataKind),
    TestCase,
    TestSuite,
    Requirement,
    Incident,
    /// Placeholder for a reference whose target has not been ingested.
    Unknown,
}

impl NodeKind {
    /// True for kinds that represent executable code declarations.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Function | Self::Procedure)
    }

    /// Storage tag used by persistent backends.
    pub fn tag(&self) -> String {
        match self {
            Self::Configuration => "configuration".to_string(),
            Self::Module => "module".to_string(),
            Self::Function => "function".to_string(),
            Self::Procedure => "procedure".to_string(),
            Self::MetadataObject(k) => format!("metadata:{}", k.name()),
            Self::TestCase => "test_case".to_string(),
            Self::TestSuite => "test_suite".to_string(),
            Self::Requirement => "requirement".to_string(),
            Self::Incident => "incident".to_string(),
            Self::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(meta) = s.strip_prefix("metadata:") {
            return match meta {
                "Other" => Ok(Self::MetadataObject(MetadataKind::Other)),
                other => MetadataKind::from_name(other)
                    .map(Self::MetadataObject)
                    .ok_or_else(|| format!("unknown metadata kind: {other}")),
            };
        }
        match s {
            "configuration" => Ok(Self::Configuration),
            "module" => Ok(Self::Module),
            "function" => Ok(Self::Function),
            "procedure" => Ok(Self::Procedure),
            "test_case" => Ok(Self::TestCase),
            "test_suite" => Ok(Self::TestSuite),
            "requirement" => Ok(Self::Requirement),
            "incident" => Ok(Self::Incident),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// A node of the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub display_name: String,
    #[serde(default)]
    pub props: Props,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, display_name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            display_name: display_name.into(),
            props: Props::new(),
        }
    }

    /// Placeholder node for an unresolved name.
    pub fn placeholder(awaited_name: &str) -> Self {
        Self::new(
            NodeId::placeholder(awaited_name),
            NodeKind::Unknown,
            format!("Unknown({awaited_name})"),
        )
        .with_prop("awaited_name", PropValue::Text(awaited_name.to_string()))
    }

    pub fn with_prop(mut self, key: &str, value: PropValue) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            kind: self.kind,
            display_name: self.display_name.clone(),
        }
    }
}

/// Compact node view returned by the query interface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub kind: NodeKind,
    pub display_name: String,
}

/// Filter for `find_nodes`: optional case-insensitive name fragment plus
/// property equality constraints (all must match).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFilter {
    pub name_contains: Option<String>,
    #[serde(default)]
    pub props: Props,
}

impl NodeFilter {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn name(fragment: impl Into<String>) -> Self {
        Self {
            name_contains: Some(fragment.into()),
            props: Props::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: PropValue) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        if let Some(ref fragment) = self.name_contains {
            let needle = fragment.to_lowercase();
            if !node.display_name.to_lowercase().contains(&needle)
                && !node.id.as_str().to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        self.props
            .iter()
            .all(|(k, v)| node.props.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tag_roundtrip() {
        for kind in [
            NodeKind::Configuration,
            NodeKind::Module,
            NodeKind::Function,
            NodeKind::MetadataObject(MetadataKind::InformationRegister),
            NodeKind::MetadataObject(MetadataKind::Other),
            NodeKind::Unknown,
        ] {
            assert_eq!(kind.tag().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn placeholder_ids_fold_case() {
        assert_eq!(NodeId::placeholder("DoWork"), NodeId::placeholder("dowork"));
        assert!(NodeId::placeholder("x").is_placeholder());
    }

    #[test]
    fn filter_matches_name_and_props() {
        let node = Node::new("M::Calc".into(), NodeKind::Function, "Расчет")
            .with_prop("is_export", PropValue::Bool(true));
        assert!(NodeFilter::name("расч").matches(&node));
        assert!(NodeFilter::any()
            .with_prop("is_export", PropValue::Bool(true))
            .matches(&node));
        assert!(!NodeFilter::any()
            .with_prop("is_export", PropValue::Bool(false))
            .matches(&node));
    }
}
