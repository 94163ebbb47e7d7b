//! Open property bag with per-kind validation at the ingestion boundary.
//!
//! Required properties by node kind:
//!
//! | kind | required |
//! |------|----------|
//! | Function / Procedure / TestCase | `module`, `is_export`, `loc` |
//! | Module / TestSuite | `unit`, `content_hash` |
//! | MetadataObject | `metadata_type` |
//! | Configuration | `unit`, `content_hash` |
//! | Unknown | `awaited_name` |
//! | Requirement / Incident | none |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeKind};
use crate::errors::GraphError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl PropValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Ordered so serialized forms are deterministic across backends.
pub type Props = BTreeMap<String, PropValue>;

enum Expect {
    Text,
    Int,
    Bool,
}

fn required(kind: NodeKind) -> &'static [(&'static str, Expect)] {
    match kind {
        NodeKind::Function | NodeKind::Procedure | NodeKind::TestCase => &[
            ("module", Expect::Text),
            ("is_export", Expect::Bool),
            ("loc", Expect::Int),
        ],
        NodeKind::Module | NodeKind::TestSuite | NodeKind::Configuration => {
            &[("unit", Expect::Text), ("content_hash", Expect::Text)]
        }
        NodeKind::MetadataObject(_) => &[("metadata_type", Expect::Text)],
        NodeKind::Unknown => &[("awaited_name", Expect::Text)],
        NodeKind::Requirement | NodeKind::Incident => &[],
    }
}

/// Validate a node's property bag against the documented schema of its kind.
pub fn validate(node: &Node) -> Result<(), GraphError> {
    for (key, expect) in required(node.kind) {
        let ok = match (node.props.get(*key), expect) {
            (Some(PropValue::Text(_)), Expect::Text) => true,
            (Some(PropValue::Int(_)), Expect::Int) => true,
            (Some(PropValue::Bool(_)), Expect::Bool) => true,
            _ => false,
        };
        if !ok {
            return Err(GraphError::InvalidProps {
                id: node.id.to_string(),
                message: format!("missing or mistyped property `{key}` for kind {}", node.kind),
            });
        }
    }
    if node.id.as_str().is_empty() {
        return Err(GraphError::InvalidProps {
            id: String::new(),
            message: "empty node id".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::node::NodeId;

    #[test]
    fn untagged_roundtrip_keeps_variants() {
        let mut props = Props::new();
        props.insert("a".into(), PropValue::Int(3));
        props.insert("b".into(), PropValue::Float(2.0));
        props.insert("c".into(), PropValue::List(vec!["x".into()]));
        let json = serde_json::to_string(&props).unwrap();
        let back: Props = serde_json::from_str(&json).unwrap();
        assert_eq!(props, back);
    }

    #[test]
    fn validate_rejects_missing_required() {
        let node = Node::new(NodeId::new("M::F"), NodeKind::Function, "F");
        assert!(matches!(validate(&node), Err(GraphError::InvalidProps { .. })));

        let ok = node
            .with_prop("module", "M".into())
            .with_prop("is_export", true.into())
            .with_prop("loc", 4i64.into());
        assert!(validate(&ok).is_ok());
    }

    #[test]
    fn placeholder_is_valid() {
        assert!(validate(&Node::placeholder("F2")).is_ok());
    }
}
