//! Graph builder: folds parsed units into nodes and edges.
//!
//! Each ingestion call computes a plan against the builder's bookkeeping
//! (unit table, name index, pending-reference queue), commits it to the
//! backend in three steps (edge deletions, node deletions, one upsert), and
//! only then adopts the new bookkeeping. A failed commit leaves the builder
//! as it was, so retrying the same records converges.

pub mod fragment;
pub mod ids;
pub mod index;
pub mod pending;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use depgraph_core::config::GraphConfig;
use depgraph_core::errors::GraphError;
use depgraph_core::traits::{with_backoff, BackoffPolicy, GraphBackend};
use depgraph_core::types::collections::FxHashMap;
use depgraph_core::types::{
    props, Direction, Edge, EdgeKey, EdgeKind, GraphDelta, Node, NodeFilter, NodeId, NodeKind,
    PropValue,
};
use serde::{Deserialize, Serialize};

use crate::parsers::StructuralRecord;
use crate::scanner::SourceUnit;

use self::index::NameIndex;
use self::pending::{PendingQueue, PendingRef};

/// Identity of the unit a record was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMeta {
    pub path: String,
    pub kind: crate::scanner::UnitKind,
    pub hash: u64,
}

impl From<&SourceUnit> for UnitMeta {
    fn from(unit: &SourceUnit) -> Self {
        Self {
            path: unit.path.clone(),
            kind: unit.kind,
            hash: unit.hash,
        }
    }
}

/// One unit handed to the builder: where it came from and what it contains.
#[derive(Debug, Clone)]
pub struct IngestRecord {
    pub unit: UnitMeta,
    pub record: StructuralRecord,
}

impl IngestRecord {
    pub fn new(unit: &SourceUnit, record: StructuralRecord) -> Self {
        Self {
            unit: UnitMeta::from(unit),
            record,
        }
    }
}

/// A name still waiting for its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedRef {
    pub placeholder: NodeId,
    pub awaited_name: String,
    pub references: usize,
}

#[derive(Debug, Clone, Default)]
struct UnitState {
    hash: u64,
    nodes: BTreeSet<NodeId>,
    /// Edges derived from this unit, placeholder edges included.
    edges: BTreeSet<EdgeKey>,
}

#[derive(Debug, Clone, Default)]
struct BuilderState {
    units: BTreeMap<String, UnitState>,
    index: NameIndex,
    pending: PendingQueue,
    node_unit: FxHashMap<NodeId, String>,
}

enum Change<'a> {
    Upsert(&'a IngestRecord),
    Remove(&'a str),
}

impl Change<'_> {
    fn path(&self) -> &str {
        match self {
            Change::Upsert(r) => &r.unit.path,
            Change::Remove(p) => p,
        }
    }
}

#[derive(Debug, Default)]
struct Plan {
    upsert_nodes: BTreeMap<NodeId, Node>,
    upsert_edges: BTreeMap<EdgeKey, Edge>,
    delete_nodes: BTreeSet<NodeId>,
    delete_edges: BTreeSet<EdgeKey>,
}

impl Plan {
    fn put_node(&mut self, node: Node) {
        self.upsert_nodes.insert(node.id.clone(), node);
    }

    fn put_edge(&mut self, edge: Edge) {
        let key = edge.key();
        self.delete_edges.remove(&key);
        self.upsert_edges.entry(key).or_insert(edge);
    }

    fn drop_edge(&mut self, key: EdgeKey) {
        self.upsert_edges.remove(&key);
        self.delete_edges.insert(key);
    }

    fn into_delta(self) -> GraphDelta {
        let deleted = &self.delete_nodes;
        let touches_deleted =
            |k: &EdgeKey| deleted.contains(&k.source_id) || deleted.contains(&k.target_id);
        GraphDelta {
            removed_edges: self
                .delete_edges
                .iter()
                .filter(|k| !touches_deleted(k))
                .cloned()
                .collect(),
            removed_ids: self
                .delete_nodes
                .iter()
                .filter(|id| !self.upsert_nodes.contains_key(*id))
                .cloned()
                .collect(),
            upserted_nodes: self.upsert_nodes.into_values().collect(),
            upserted_edges: self.upsert_edges.into_values().collect(),
        }
    }
}

/// Folds structural records into the graph held by a backend.
///
/// Single writer: every mutating method takes `&mut self`.
pub struct GraphBuilder {
    backend: Arc<dyn GraphBackend>,
    config: GraphConfig,
    policy: BackoffPolicy,
    state: BuilderState,
}

impl GraphBuilder {
    pub fn new(backend: Arc<dyn GraphBackend>, config: GraphConfig) -> Self {
        Self {
            backend,
            config,
            policy: BackoffPolicy::default(),
            state: BuilderState::default(),
        }
    }

    pub fn with_backoff_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    /// Rebuild bookkeeping from a graph persisted by an earlier builder.
    pub fn resume(backend: Arc<dyn GraphBackend>, config: GraphConfig) -> Result<Self, GraphError> {
        let mut state = BuilderState::default();
        let nodes = backend.find_nodes(None, &NodeFilter::any())?;
        let mut placeholders = 0usize;
        for node in &nodes {
            if node.kind == NodeKind::Unknown {
                placeholders += 1;
                continue;
            }
            state.index.add(node);
            let Some(unit) = node.prop("unit").and_then(PropValue::as_text) else {
                continue;
            };
            let entry = state.units.entry(unit.to_string()).or_default();
            entry.nodes.insert(node.id.clone());
            if let Some(hash) = node
                .prop("content_hash")
                .and_then(PropValue::as_text)
                .and_then(|h| u64::from_str_radix(h, 16).ok())
            {
                entry.hash = hash;
            }
            state.node_unit.insert(node.id.clone(), unit.to_string());
        }

        let kinds: FxHashMap<&NodeId, NodeKind> = nodes.iter().map(|n| (&n.id, n.kind)).collect();
        for edge in backend.all_edges()? {
            let Some(unit) = edge.unit() else {
                continue;
            };
            if let Some(state_unit) = state.units.get_mut(unit) {
                state_unit.edges.insert(edge.key());
            }
            let gone = if edge.target_id.is_placeholder() {
                &edge.target_id
            } else if edge.source_id.is_placeholder() {
                &edge.source_id
            } else {
                continue;
            };
            let owner_id = if gone == &edge.target_id { &edge.source_id } else { &edge.target_id };
            let index = &state.index;
            if let Some(r) = PendingRef::from_edge(
                &edge,
                gone,
                kinds.get(owner_id).copied(),
                gone.as_str(),
                |id| index.module_of(id),
            ) {
                state.pending.insert(r);
            }
        }

        tracing::info!(
            units = state.units.len(),
            nodes = nodes.len(),
            placeholders,
            pending = state.pending.len(),
            "graph builder resumed"
        );
        Ok(Self {
            backend,
            config,
            policy: BackoffPolicy::default(),
            state,
        })
    }

    /// Fold records into the graph. Units whose hash is unchanged are skipped;
    /// when every unit is unchanged the delta is empty and the backend untouched.
    pub fn ingest(&mut self, records: &[IngestRecord]) -> Result<GraphDelta, GraphError> {
        // Last record wins when a path repeats within one call.
        let mut latest: BTreeMap<&str, &IngestRecord> = BTreeMap::new();
        for record in records {
            latest.insert(record.unit.path.as_str(), record);
        }
        let changes: Vec<Change<'_>> = latest
            .into_values()
            .filter(|r| self.state.units.get(&r.unit.path).map(|u| u.hash) != Some(r.unit.hash))
            .map(Change::Upsert)
            .collect();
        if changes.is_empty() {
            tracing::debug!(records = records.len(), "all units unchanged");
            return Ok(GraphDelta::default());
        }
        self.apply(&changes)
    }

    /// Delete everything a vanished unit owned. Unknown paths yield an empty delta.
    pub fn remove_unit(&mut self, path: &str) -> Result<GraphDelta, GraphError> {
        if !self.state.units.contains_key(path) {
            return Ok(GraphDelta::default());
        }
        self.apply(&[Change::Remove(path)])
    }

    /// Link a requirement to an existing code node: `Requirement IMPLEMENTS code`.
    pub fn link_requirement(&mut self, key: &str, code: &NodeId) -> Result<GraphDelta, GraphError> {
        let node = Node::new(NodeId::requirement(key), NodeKind::Requirement, key);
        let edge = Edge::new(node.id.clone(), code.clone(), EdgeKind::Implements);
        self.link(node, edge, code)
    }

    /// Link an existing code node to an incident: `code TRIGGERS_INCIDENT Incident`.
    pub fn link_incident(&mut self, key: &str, code: &NodeId) -> Result<GraphDelta, GraphError> {
        let node = Node::new(NodeId::incident(key), NodeKind::Incident, key);
        let edge = Edge::new(code.clone(), node.id.clone(), EdgeKind::TriggersIncident);
        self.link(node, edge, code)
    }

    /// Outstanding placeholder names, sorted by placeholder id.
    pub fn unresolved(&self) -> Vec<UnresolvedRef> {
        self.state
            .pending
            .placeholders()
            .map(|(id, awaited, references)| UnresolvedRef {
                placeholder: id.clone(),
                awaited_name: awaited.to_string(),
                references,
            })
            .collect()
    }

    /// Paths and hashes of every ingested unit.
    pub fn unit_hashes(&self) -> FxHashMap<String, u64> {
        self.state
            .units
            .iter()
            .map(|(path, unit)| (path.clone(), unit.hash))
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.state.units.len()
    }

    fn link(&mut self, node: Node, edge: Edge, code: &NodeId) -> Result<GraphDelta, GraphError> {
        let exists = self.state.index.contains(code)
            || with_backoff(self.policy, || self.backend.get_node(code))?.is_some();
        if !exists {
            return Err(GraphError::NodeNotFound(code.to_string()));
        }
        let nodes = [node];
        let edges = [edge];
        with_backoff(self.policy, || self.backend.upsert(&nodes, &edges))?;
        let [node] = nodes;
        self.state.index.add(&node);
        let [edge] = edges;
        Ok(GraphDelta {
            upserted_nodes: vec![node],
            upserted_edges: vec![edge],
            ..GraphDelta::default()
        })
    }

    fn apply(&mut self, changes: &[Change<'_>]) -> Result<GraphDelta, GraphError> {
        let started = Instant::now();
        let mut next = self.state.clone();
        let plan = next.plan(changes, &self.config, self.backend.as_ref(), self.policy)?;
        self.commit(&plan)?;
        self.state = next;

        let delta = plan.into_delta();
        tracing::debug!(
            units = changes.len(),
            upserted_nodes = delta.upserted_nodes.len(),
            upserted_edges = delta.upserted_edges.len(),
            removed = delta.removed_ids.len(),
            unresolved = self.state.pending.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph delta applied"
        );
        Ok(delta)
    }

    fn commit(&self, plan: &Plan) -> Result<(), GraphError> {
        for node in plan.upsert_nodes.values() {
            props::validate(node)?;
        }
        if !plan.delete_edges.is_empty() {
            let keys: Vec<EdgeKey> = plan.delete_edges.iter().cloned().collect();
            with_backoff(self.policy, || self.backend.delete_edges(&keys))?;
        }
        if !plan.delete_nodes.is_empty() {
            let ids: Vec<NodeId> = plan.delete_nodes.iter().cloned().collect();
            with_backoff(self.policy, || self.backend.delete(&ids))?;
        }
        if !plan.upsert_nodes.is_empty() || !plan.upsert_edges.is_empty() {
            let nodes: Vec<Node> = plan.upsert_nodes.values().cloned().collect();
            let edges: Vec<Edge> = plan.upsert_edges.values().cloned().collect();
            with_backoff(self.policy, || self.backend.upsert(&nodes, &edges))?;
        }
        Ok(())
    }
}

impl BuilderState {
    fn plan(
        &mut self,
        changes: &[Change<'_>],
        config: &GraphConfig,
        backend: &dyn GraphBackend,
        policy: BackoffPolicy,
    ) -> Result<Plan, GraphError> {
        let mut plan = Plan::default();
        let placeholders_before: BTreeSet<NodeId> = self.pending.placeholder_ids().cloned().collect();
        let changed: BTreeSet<&str> = changes.iter().map(Change::path).collect();

        // Retract what the changed units owned.
        let mut retracted: BTreeMap<NodeId, NodeKind> = BTreeMap::new();
        for path in &changed {
            if let Some(old) = self.units.remove(*path) {
                for key in old.edges {
                    plan.drop_edge(key);
                }
                for id in old.nodes {
                    if let Some(kind) = self.index.remove(&id) {
                        retracted.insert(id.clone(), kind);
                    }
                    self.node_unit.remove(&id);
                }
            }
            self.pending.drain_unit(path);
        }

        // Add the new fragments.
        let markers = config.effective_test_markers();
        let mut refs: Vec<PendingRef> = Vec::new();
        let mut recreated_with_new_kind: Vec<NodeId> = Vec::new();
        for change in changes {
            let Change::Upsert(record) = change else {
                continue;
            };
            let path = record.unit.path.as_str();
            let frag = fragment::build(record, &markers);
            let mut unit = UnitState {
                hash: record.unit.hash,
                ..UnitState::default()
            };
            for node in frag.nodes {
                if let Some(owner) = self.node_unit.get(&node.id) {
                    tracing::warn!(id = %node.id, unit = path, owner = %owner, "node already owned by another unit");
                    continue;
                }
                if let Some(old_kind) = retracted.remove(&node.id) {
                    if old_kind != node.kind {
                        recreated_with_new_kind.push(node.id.clone());
                    }
                }
                self.index.add(&node);
                self.node_unit.insert(node.id.clone(), path.to_string());
                unit.nodes.insert(node.id.clone());
                plan.put_node(node);
            }
            for node in frag.shared {
                if !self.index.contains(&node.id) {
                    self.index.add(&node);
                    plan.put_node(node);
                }
            }
            for edge in frag.edges {
                let owned = |id: &NodeId| unit.nodes.contains(id) || !self.node_unit.contains_key(id);
                if owned(&edge.source_id) && owned(&edge.target_id) {
                    unit.edges.insert(edge.key());
                    plan.put_edge(edge);
                }
            }
            refs.extend(frag.refs.into_iter().filter(|r| unit.nodes.contains(&r.owner)));
            self.units.insert(path.to_string(), unit);
        }

        // Nodes that vanished (or changed kind) take other units' edges with
        // them; those references go back through resolution.
        let vanished: Vec<NodeId> = retracted
            .into_keys()
            .chain(recreated_with_new_kind)
            .collect();
        for id in &vanished {
            plan.delete_nodes.insert(id.clone());
            let neighbors = with_backoff(policy, || backend.neighbors(id, &[], Direction::Both))?;
            for neighbor in neighbors {
                let edge = &neighbor.edge;
                let Some(unit) = edge.unit() else {
                    continue;
                };
                if changed.contains(unit) {
                    continue;
                }
                if let Some(r) = PendingRef::from_edge(
                    edge,
                    id,
                    Some(neighbor.node.kind),
                    id.as_str(),
                    |n| self.index.module_of(n),
                ) {
                    if let Some(owner_unit) = self.units.get_mut(unit) {
                        owner_unit.edges.remove(&edge.key());
                    }
                    refs.push(r);
                }
            }
        }

        // Earlier references that the new nodes satisfy.
        let waiting: Vec<PendingRef> = self.pending.iter().cloned().collect();
        for r in waiting {
            if let Some((target, kind)) = self.index.resolve(&r) {
                self.pending.remove(&r);
                let placeholder_key = r.placeholder_edge().key();
                plan.drop_edge(placeholder_key.clone());
                let edge = r.edge_to(&target, kind);
                if let Some(unit) = self.units.get_mut(&r.unit) {
                    unit.edges.remove(&placeholder_key);
                    unit.edges.insert(edge.key());
                }
                plan.put_edge(edge);
            }
        }

        for r in refs {
            let edge = match self.index.resolve(&r) {
                Some((target, kind)) => r.edge_to(&target, kind),
                None => {
                    let edge = r.placeholder_edge();
                    self.pending.insert(r.clone());
                    edge
                }
            };
            if let Some(unit) = self.units.get_mut(&r.unit) {
                unit.edges.insert(edge.key());
            }
            plan.put_edge(edge);
        }

        // Placeholder nodes follow the queue.
        let placeholders_after: BTreeMap<NodeId, String> = self
            .pending
            .placeholders()
            .map(|(id, awaited, _)| (id.clone(), awaited.to_string()))
            .collect();
        for (id, awaited) in &placeholders_after {
            if !placeholders_before.contains(id) {
                plan.put_node(Node::placeholder(awaited));
            }
        }
        for id in placeholders_before {
            if !placeholders_after.contains_key(&id) {
                plan.upsert_nodes.remove(&id);
                plan.delete_nodes.insert(id);
            }
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::InMemoryBackend;
    use crate::parsers::bsl::parse_module;
    use crate::scanner::UnitKind;

    fn module(path: &str, src: &str) -> IngestRecord {
        let unit = SourceUnit::from_text(path, UnitKind::SourceModule, src);
        IngestRecord::new(&unit, parse_module(src))
    }

    fn builder() -> (Arc<InMemoryBackend>, GraphBuilder) {
        let backend = Arc::new(InMemoryBackend::new());
        let builder = GraphBuilder::new(backend.clone(), GraphConfig::default());
        (backend, builder)
    }

    #[test]
    fn unchanged_unit_is_a_noop() {
        let (_, mut b) = builder();
        let rec = module("src/A.bsl", "Procedure P()\nEndProcedure\n");
        assert!(!b.ingest(&[rec.clone()]).unwrap().is_empty());
        assert!(b.ingest(&[rec]).unwrap().is_empty());
    }

    #[test]
    fn placeholder_is_replaced_when_target_arrives() {
        let (backend, mut b) = builder();
        b.ingest(&[module("src/A.bsl", "Procedure F1()\n  F2();\nEndProcedure\n")])
            .unwrap();
        assert_eq!(b.unresolved().len(), 1);
        assert!(backend.get_node(&NodeId::placeholder("F2")).unwrap().is_some());

        let delta = b
            .ingest(&[module("src/B.bsl", "Procedure F2() Export\nEndProcedure\n")])
            .unwrap();
        assert!(delta.removed_ids.contains(&NodeId::placeholder("F2")));
        assert!(b.unresolved().is_empty());
        let calls = backend
            .neighbors(&NodeId::new("src.A::F1"), &[EdgeKind::Calls], Direction::Outgoing)
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].node.id.as_str(), "src.B::F2");
    }

    #[test]
    fn removed_declaration_returns_callers_to_pending() {
        let (backend, mut b) = builder();
        b.ingest(&[
            module("src/A.bsl", "Procedure F1()\n  F2();\nEndProcedure\n"),
            module("src/B.bsl", "Procedure F2() Export\nEndProcedure\n"),
        ])
        .unwrap();
        assert!(b.unresolved().is_empty());

        b.ingest(&[module("src/B.bsl", "Procedure Other()\nEndProcedure\n")])
            .unwrap();
        assert_eq!(b.unresolved()[0].awaited_name, "F2");
        let calls = backend
            .neighbors(&NodeId::new("src.A::F1"), &[EdgeKind::Calls], Direction::Outgoing)
            .unwrap();
        assert_eq!(calls[0].node.kind, NodeKind::Unknown);
    }

    #[test]
    fn remove_unit_deletes_owned_nodes() {
        let (backend, mut b) = builder();
        b.ingest(&[module("src/A.bsl", "Procedure F1()\n  Missing();\nEndProcedure\n")])
            .unwrap();
        let delta = b.remove_unit("src/A.bsl").unwrap();
        assert!(delta.removed_ids.contains(&NodeId::new("src.A::F1")));
        assert_eq!(backend.node_count().unwrap(), 0);
        assert!(b.unresolved().is_empty());
        assert!(b.remove_unit("src/A.bsl").unwrap().is_empty());
    }

    #[test]
    fn link_requires_existing_code() {
        let (_, mut b) = builder();
        let err = b.link_requirement("REQ-9", &NodeId::new("nope")).unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound(_)));
    }

    #[test]
    fn resume_restores_pending_queue() {
        let (backend, mut b) = builder();
        b.ingest(&[module("src/A.bsl", "Procedure F1()\n  F2();\nEndProcedure\n")])
            .unwrap();
        let mut resumed = GraphBuilder::resume(backend.clone(), GraphConfig::default()).unwrap();
        assert_eq!(resumed.unresolved(), b.unresolved());
        assert!(resumed
            .ingest(&[module("src/A.bsl", "Procedure F1()\n  F2();\nEndProcedure\n")])
            .unwrap()
            .is_empty());
        resumed
            .ingest(&[module("src/B.bsl", "Procedure F2()\nEndProcedure\n")])
            .unwrap();
        assert!(resumed.unresolved().is_empty());
        assert!(backend.get_node(&NodeId::placeholder("F2")).unwrap().is_none());
    }
}
