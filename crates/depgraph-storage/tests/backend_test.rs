//! SqliteGraphBackend against the GraphBackend contract, on a real file.

use std::sync::Arc;

use depgraph_core::errors::GraphError;
use depgraph_core::traits::{CacheKey, GraphBackend, ParseCacheStore};
use depgraph_core::types::{
    Direction, Edge, EdgeKey, EdgeKind, MetadataKind, Node, NodeFilter, NodeId, NodeKind, PropValue,
};
use depgraph_storage::{DatabaseManager, SqliteGraphBackend, SqliteParseCacheStore};

fn decl(id: &str, kind: NodeKind) -> Node {
    Node::new(NodeId::new(id), kind, id.rsplit("::").next().unwrap_or(id))
        .with_prop("module", PropValue::Text("CommonModule.Sales".into()))
        .with_prop("is_export", PropValue::Bool(true))
        .with_prop("loc", PropValue::Int(12))
}

fn call(a: &str, b: &str) -> Edge {
    Edge::new(a.into(), b.into(), EdgeKind::Calls)
        .with_prop("unit", PropValue::Text("CommonModules/Sales/Ext/Module.bsl".into()))
        .with_prop("line", PropValue::Int(3))
}

fn seed(backend: &SqliteGraphBackend) {
    let catalog = Node::new(
        MetadataKind::Catalog.object_id("Products"),
        NodeKind::MetadataObject(MetadataKind::Catalog),
        "Products",
    )
    .with_prop("metadata_type", PropValue::Text("Catalog".into()));
    backend
        .upsert(
            &[
                decl("Sales::Post", NodeKind::Procedure),
                decl("Sales::Total", NodeKind::Function),
                decl("Sales::Round", NodeKind::Function),
                catalog,
            ],
            &[
                call("Sales::Post", "Sales::Total"),
                call("Sales::Total", "Sales::Round"),
                Edge::new("Sales::Total".into(), "Catalog.Products".into(), EdgeKind::UsesMetadata),
            ],
        )
        .unwrap();
}

#[test]
fn graph_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    {
        let backend = SqliteGraphBackend::open(&path).unwrap();
        seed(&backend);
    }
    let backend = SqliteGraphBackend::open(&path).unwrap();
    assert_eq!(backend.node_count().unwrap(), 4);
    assert_eq!(backend.edge_count().unwrap(), 3);
    let total = backend.get_node(&"Sales::Total".into()).unwrap().unwrap();
    assert_eq!(total.kind, NodeKind::Function);
    assert_eq!(total.prop("loc"), Some(&PropValue::Int(12)));
}

#[test]
fn neighbors_are_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SqliteGraphBackend::open(&dir.path().join("g.db")).unwrap();
    seed(&backend);

    let all = backend
        .neighbors(&"Sales::Total".into(), &[], Direction::Both)
        .unwrap();
    let seen: Vec<(EdgeKind, &str, Direction)> = all
        .iter()
        .map(|n| (n.edge.kind, n.node.id.as_str(), n.direction))
        .collect();
    assert_eq!(
        seen,
        vec![
            (EdgeKind::Calls, "Sales::Post", Direction::Incoming),
            (EdgeKind::Calls, "Sales::Round", Direction::Outgoing),
            (EdgeKind::UsesMetadata, "Catalog.Products", Direction::Outgoing),
        ]
    );

    let calls_out = backend
        .neighbors(&"Sales::Total".into(), &[EdgeKind::Calls], Direction::Outgoing)
        .unwrap();
    assert_eq!(calls_out.len(), 1);
    assert_eq!(calls_out[0].edge.props.get("line"), Some(&PropValue::Int(3)));

    assert!(backend
        .neighbors(&"nope".into(), &[], Direction::Both)
        .unwrap()
        .is_empty());
}

#[test]
fn find_nodes_filters_and_orders_by_id() {
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    seed(&backend);
    let functions = backend
        .find_nodes(Some(NodeKind::Function), &NodeFilter::any())
        .unwrap();
    let ids: Vec<&str> = functions.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["Sales::Round", "Sales::Total"]);

    let by_name = backend.find_nodes(None, &NodeFilter::name("post")).unwrap();
    assert_eq!(by_name.len(), 1);

    let catalogs = backend
        .find_nodes(
            Some(NodeKind::MetadataObject(MetadataKind::Catalog)),
            &NodeFilter::any().with_prop("metadata_type", PropValue::Text("Catalog".into())),
        )
        .unwrap();
    assert_eq!(catalogs.len(), 1);
}

#[test]
fn dangling_edge_rolls_back_the_whole_call() {
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    let err = backend
        .upsert(
            &[decl("A::F", NodeKind::Function)],
            &[call("A::F", "B::G")],
        )
        .unwrap_err();
    assert!(matches!(err, GraphError::DanglingEdge { .. }));
    assert_eq!(backend.node_count().unwrap(), 0);
}

#[test]
fn kind_is_immutable_across_calls() {
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    backend.upsert(&[decl("A::F", NodeKind::Function)], &[]).unwrap();
    let err = backend
        .upsert(&[decl("A::F", NodeKind::Procedure)], &[])
        .unwrap_err();
    assert!(matches!(err, GraphError::KindConflict { .. }));
}

#[test]
fn delete_cascades_and_delete_edges_is_exact() {
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    seed(&backend);

    backend
        .delete_edges(&[EdgeKey {
            source_id: "Sales::Total".into(),
            target_id: "Sales::Round".into(),
            kind: EdgeKind::Calls,
        }])
        .unwrap();
    assert_eq!(backend.edge_count().unwrap(), 2);

    backend.delete(&["Sales::Total".into(), "ghost".into()]).unwrap();
    assert_eq!(backend.node_count().unwrap(), 3);
    assert_eq!(backend.edge_count().unwrap(), 0);
}

#[test]
fn all_edges_sorted_by_key() {
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    seed(&backend);
    let edges = backend.all_edges().unwrap();
    let keys: Vec<EdgeKey> = edges.iter().map(Edge::key).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn graph_and_cache_share_one_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(DatabaseManager::open(&dir.path().join("shared.db")).unwrap());
    let backend = SqliteGraphBackend::new(Arc::clone(&db));
    let cache = SqliteParseCacheStore::new(db);

    seed(&backend);
    let key = CacheKey {
        content_hash: 42,
        unit_kind: "module",
    };
    cache.put(&key, r#"{"declarations":[]}"#).unwrap();
    cache.put(&key, r#"{"declarations":[]}"#).unwrap();

    assert_eq!(cache.len().unwrap(), 1);
    assert_eq!(
        cache.get(&key).unwrap().as_deref(),
        Some(r#"{"declarations":[]}"#)
    );
    assert_eq!(backend.node_count().unwrap(), 4);
}
