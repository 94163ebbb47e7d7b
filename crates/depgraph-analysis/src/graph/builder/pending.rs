//! Pending-reference queue: unresolved names waiting for their target.
//!
//! Every pending reference is materialized in the graph as an edge to the
//! placeholder node `unknown::<name>`. The queue maps each placeholder to
//! the references awaiting it; a placeholder with no references left is
//! deleted.

use std::collections::BTreeMap;

use depgraph_core::types::{Edge, EdgeKind, NodeId, NodeKind, PropValue};

/// How a reference turns into an edge once its target is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RefKind {
    /// `owner CALLS target`.
    Call,
    /// Call from a test case: `target TESTED_BY owner`, or `owner CALLS target`
    /// when the target is itself a test case.
    TestCall,
    /// `owner USES_METADATA target`.
    Metadata,
    /// `owner DEPENDS_ON target` (typed attribute of a metadata object).
    MetadataType,
    /// `target CONTAINS owner` (module inside an object's folder).
    Container,
    /// `owner CONTAINS target` (configuration lists a child object).
    Child,
}

impl RefKind {
    /// True when the awaited name is a declaration (resolved by name index).
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call | Self::TestCall)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRef {
    /// The endpoint that exists; the other endpoint is awaited.
    pub owner: NodeId,
    pub awaited: String,
    pub ref_kind: RefKind,
    /// Unit that owns the edge.
    pub unit: String,
    pub line: Option<u32>,
    /// Module of the owner, for same-module call resolution.
    pub context_module: Option<NodeId>,
}

impl PendingRef {
    pub fn placeholder_id(&self) -> NodeId {
        NodeId::placeholder(&self.awaited)
    }

    /// Build the edge between `owner` and `target`.
    pub fn edge_to(&self, target: &NodeId, target_kind: NodeKind) -> Edge {
        let (source, dest, kind) = match self.ref_kind {
            RefKind::Call => (self.owner.clone(), target.clone(), EdgeKind::Calls),
            RefKind::TestCall if target_kind == NodeKind::TestCase => {
                (self.owner.clone(), target.clone(), EdgeKind::Calls)
            }
            RefKind::TestCall => (target.clone(), self.owner.clone(), EdgeKind::TestedBy),
            RefKind::Metadata => (self.owner.clone(), target.clone(), EdgeKind::UsesMetadata),
            RefKind::MetadataType => (self.owner.clone(), target.clone(), EdgeKind::DependsOn),
            RefKind::Container => (target.clone(), self.owner.clone(), EdgeKind::Contains),
            RefKind::Child => (self.owner.clone(), target.clone(), EdgeKind::Contains),
        };
        let mut edge = Edge::new(source, dest, kind)
            .with_prop("unit", PropValue::Text(self.unit.clone()))
            .with_prop("callee", PropValue::Text(self.awaited.clone()));
        if let Some(line) = self.line {
            edge = edge.with_prop("line", PropValue::Int(i64::from(line)));
        }
        edge
    }

    pub fn placeholder_edge(&self) -> Edge {
        self.edge_to(&self.placeholder_id(), NodeKind::Unknown)
    }

    /// Recover the reference behind `edge` whose `gone` endpoint is missing
    /// (a placeholder, or a node being deleted).
    ///
    /// `owner_kind` is the kind of the surviving endpoint; `module_of` maps
    /// a declaration to its module.
    pub fn from_edge(
        edge: &Edge,
        gone: &NodeId,
        owner_kind: Option<NodeKind>,
        gone_display: &str,
        module_of: impl Fn(&NodeId) -> Option<NodeId>,
    ) -> Option<PendingRef> {
        let gone_is_source = &edge.source_id == gone;
        let (owner, ref_kind) = match (edge.kind, gone_is_source) {
            (EdgeKind::Calls, false) => {
                let kind = if owner_kind == Some(NodeKind::TestCase) {
                    RefKind::TestCall
                } else {
                    RefKind::Call
                };
                (edge.source_id.clone(), kind)
            }
            (EdgeKind::TestedBy, true) => (edge.target_id.clone(), RefKind::TestCall),
            (EdgeKind::UsesMetadata, false) => (edge.source_id.clone(), RefKind::Metadata),
            (EdgeKind::DependsOn, false) => (edge.source_id.clone(), RefKind::MetadataType),
            (EdgeKind::Contains, true) => (edge.target_id.clone(), RefKind::Container),
            (EdgeKind::Contains, false) => (edge.source_id.clone(), RefKind::Child),
            _ => return None,
        };
        let unit = edge.unit()?.to_string();
        let awaited = edge
            .props
            .get("callee")
            .and_then(PropValue::as_text)
            .map(str::to_string)
            .unwrap_or_else(|| gone_display.to_string());
        let line = edge
            .props
            .get("line")
            .and_then(PropValue::as_int)
            .and_then(|l| u32::try_from(l).ok());
        let context_module = if ref_kind.is_call() {
            module_of(&owner)
        } else {
            None
        };
        Some(PendingRef {
            owner,
            awaited,
            ref_kind,
            unit,
            line,
            context_module,
        })
    }
}

/// Placeholder id → (owner, ref kind) → reference.
#[derive(Debug, Default, Clone)]
pub struct PendingQueue {
    by_placeholder: BTreeMap<NodeId, BTreeMap<(NodeId, RefKind), PendingRef>>,
}

impl PendingQueue {
    /// Insert a reference. Returns true when its placeholder is new.
    pub fn insert(&mut self, r: PendingRef) -> bool {
        let ph = r.placeholder_id();
        let is_new = !self.by_placeholder.contains_key(&ph);
        self.by_placeholder
            .entry(ph)
            .or_default()
            .entry((r.owner.clone(), r.ref_kind))
            .or_insert(r);
        is_new
    }

    /// All queued references, in placeholder order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingRef> {
        self.by_placeholder.values().flat_map(|m| m.values())
    }

    /// Remove one reference. Returns the placeholder id when it became orphaned.
    pub fn remove(&mut self, r: &PendingRef) -> Option<NodeId> {
        let ph = r.placeholder_id();
        let refs = self.by_placeholder.get_mut(&ph)?;
        refs.remove(&(r.owner.clone(), r.ref_kind));
        if refs.is_empty() {
            self.by_placeholder.remove(&ph);
            Some(ph)
        } else {
            None
        }
    }

    /// Drop every reference owned by `unit`, pruning emptied placeholders.
    pub fn drain_unit(&mut self, unit: &str) -> Vec<PendingRef> {
        let mut drained = Vec::new();
        self.by_placeholder.retain(|_, refs| {
            refs.retain(|_, r| {
                if r.unit == unit {
                    drained.push(r.clone());
                    false
                } else {
                    true
                }
            });
            !refs.is_empty()
        });
        drained
    }

    pub fn placeholder_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.by_placeholder.keys()
    }

    /// Placeholder ids with their awaited name and reference count.
    pub fn placeholders(&self) -> impl Iterator<Item = (&NodeId, &str, usize)> {
        self.by_placeholder.iter().filter_map(|(id, refs)| {
            refs.values()
                .next()
                .map(|r| (id, r.awaited.as_str(), refs.len()))
        })
    }

    /// Number of queued references.
    pub fn len(&self) -> usize {
        self.by_placeholder.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_placeholder.is_empty()
    }
}
