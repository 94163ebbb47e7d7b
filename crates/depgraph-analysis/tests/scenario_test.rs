//! A call into a module that has not been ingested yet goes to a
//! placeholder, and the placeholder gives way once the module arrives.

use std::sync::Arc;

use depgraph_analysis::scanner::{SourceUnit, UnitKind};
use depgraph_analysis::{InMemoryBackend, IngestionPipeline};
use depgraph_core::config::DepgraphConfig;
use depgraph_core::traits::GraphBackend;
use depgraph_core::types::{Direction, EdgeKind, NodeId, NodeKind, PropValue};
use depgraph_storage::SqliteGraphBackend;

const MODULE_A: &str = "Procedure F1()\n    F2();\nEndProcedure\n";
const MODULE_B: &str = "Procedure F2() Export\nEndProcedure\n";

fn unit(path: &str, src: &str) -> SourceUnit {
    SourceUnit::from_text(path, UnitKind::SourceModule, src)
}

fn run_scenario(backend: Arc<dyn GraphBackend>) {
    let pipeline = IngestionPipeline::new(Arc::clone(&backend), DepgraphConfig::default());
    let f1 = NodeId::new("src.ModuleA::F1");

    let first = pipeline.ingest_units(&[unit("src/ModuleA.bsl", MODULE_A)]).unwrap();
    assert_eq!(first.data.unresolved.len(), 1);
    assert_eq!(first.data.unresolved[0].awaited_name, "F2");

    let calls = backend
        .neighbors(&f1, &[EdgeKind::Calls], Direction::Outgoing)
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].node.id, NodeId::placeholder("F2"));
    assert_eq!(calls[0].node.kind, NodeKind::Unknown);
    assert_eq!(calls[0].node.display_name, "Unknown(F2)");
    assert_eq!(calls[0].edge.props.get("callee"), Some(&PropValue::Text("F2".into())));

    let second = pipeline.ingest_units(&[unit("src/ModuleB.bsl", MODULE_B)]).unwrap();
    assert!(second.data.unresolved.is_empty());

    let calls = backend
        .neighbors(&f1, &[EdgeKind::Calls], Direction::Outgoing)
        .unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].node.id.as_str(), "src.ModuleB::F2");
    assert_eq!(calls[0].node.kind, NodeKind::Procedure);
    assert!(backend.get_node(&NodeId::placeholder("F2")).unwrap().is_none());
    assert!(pipeline.unresolved().is_empty());
}

#[test]
fn placeholder_resolves_in_memory() {
    run_scenario(Arc::new(InMemoryBackend::new()));
}

#[test]
fn placeholder_resolves_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SqliteGraphBackend::open(&dir.path().join("graph.db")).unwrap();
    run_scenario(Arc::new(backend));
}

#[test]
fn resolution_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.db");
    {
        let backend: Arc<dyn GraphBackend> = Arc::new(SqliteGraphBackend::open(&path).unwrap());
        let pipeline = IngestionPipeline::new(backend, DepgraphConfig::default());
        pipeline.ingest_units(&[unit("src/ModuleA.bsl", MODULE_A)]).unwrap();
    }

    let backend: Arc<dyn GraphBackend> = Arc::new(SqliteGraphBackend::open(&path).unwrap());
    let pipeline = IngestionPipeline::resume(Arc::clone(&backend), DepgraphConfig::default()).unwrap();
    assert_eq!(pipeline.unresolved().len(), 1);

    pipeline.ingest_units(&[unit("src/ModuleB.bsl", MODULE_B)]).unwrap();
    let calls = backend
        .neighbors(&NodeId::new("src.ModuleA::F1"), &[EdgeKind::Calls], Direction::Outgoing)
        .unwrap();
    assert_eq!(calls[0].node.id.as_str(), "src.ModuleB::F2");
    assert!(backend.get_node(&NodeId::placeholder("F2")).unwrap().is_none());
}
