use criterion::{black_box, criterion_group, criterion_main, Criterion};
use depgraph_core::traits::GraphBackend;
use depgraph_core::types::{Direction, Edge, EdgeKind, Node, NodeId, NodeKind, PropValue};
use depgraph_storage::SqliteGraphBackend;

fn chain(len: usize) -> (Vec<Node>, Vec<Edge>) {
    let nodes = (0..len)
        .map(|i| {
            Node::new(NodeId::new(format!("M::F{i}")), NodeKind::Function, format!("F{i}"))
                .with_prop("module", PropValue::Text("M".into()))
                .with_prop("is_export", PropValue::Bool(false))
                .with_prop("loc", PropValue::Int(5))
        })
        .collect();
    let edges = (1..len)
        .map(|i| {
            Edge::new(
                NodeId::new(format!("M::F{}", i - 1)),
                NodeId::new(format!("M::F{i}")),
                EdgeKind::Calls,
            )
        })
        .collect();
    (nodes, edges)
}

fn bench_upsert(c: &mut Criterion) {
    let (nodes, edges) = chain(500);
    c.bench_function("sqlite_upsert_500", |b| {
        b.iter(|| {
            let backend = SqliteGraphBackend::open_in_memory().unwrap();
            backend.upsert(black_box(&nodes), black_box(&edges)).unwrap();
        })
    });
}

fn bench_neighbors(c: &mut Criterion) {
    let (nodes, edges) = chain(500);
    let backend = SqliteGraphBackend::open_in_memory().unwrap();
    backend.upsert(&nodes, &edges).unwrap();
    let id = NodeId::new("M::F250");
    c.bench_function("sqlite_neighbors_both", |b| {
        b.iter(|| backend.neighbors(black_box(&id), &[], Direction::Both).unwrap())
    });
}

criterion_group!(benches, bench_upsert, bench_neighbors);
criterion_main!(benches);
