use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use depgraph_analysis::graph::Traversal;
use depgraph_analysis::InMemoryBackend;
use depgraph_core::config::GraphConfig;
use depgraph_core::traits::{Deadline, GraphBackend};
use depgraph_core::types::{Edge, EdgeKind, Node, NodeId, NodeKind};

/// `side`×`side` grid where every node calls its right and lower neighbor.
fn grid(side: usize) -> Arc<InMemoryBackend> {
    let id = |r: usize, c: usize| NodeId::new(format!("G::N{r}_{c}"));
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for r in 0..side {
        for c in 0..side {
            nodes.push(Node::new(id(r, c), NodeKind::Function, format!("N{r}_{c}")));
            if c + 1 < side {
                edges.push(Edge::new(id(r, c), id(r, c + 1), EdgeKind::Calls));
            }
            if r + 1 < side {
                edges.push(Edge::new(id(r, c), id(r + 1, c), EdgeKind::Calls));
            }
        }
    }
    let backend = Arc::new(InMemoryBackend::new());
    backend.upsert(&nodes, &edges).unwrap();
    backend
}

fn bench_closure(c: &mut Criterion) {
    let traversal = Traversal::new(grid(30), GraphConfig::default());
    let start = NodeId::new("G::N0_0");
    c.bench_function("transitive_dependencies_grid_30", |b| {
        b.iter(|| {
            traversal
                .transitive_dependencies(black_box(&start), 20, &Deadline::none())
                .unwrap()
        })
    });
}

fn bench_cycles(c: &mut Criterion) {
    let traversal = Traversal::new(grid(15), GraphConfig::default());
    let start = NodeId::new("G::N0_0");
    c.bench_function("find_cycles_grid_15", |b| {
        b.iter(|| traversal.find_cycles(black_box(&start), &Deadline::none()).unwrap())
    });
}

criterion_group!(benches, bench_closure, bench_cycles);
criterion_main!(benches);
