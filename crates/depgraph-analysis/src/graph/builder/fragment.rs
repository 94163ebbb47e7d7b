//! Turn one parsed unit into the nodes, edges and references it owns.

use depgraph_core::types::collections::FxHashSet;
use depgraph_core::types::{Edge, EdgeKind, MetadataKind, Node, NodeId, NodeKind, PropValue};

use super::ids::{self, CONFIGURATION_ID};
use super::pending::{PendingRef, RefKind};
use super::IngestRecord;
use crate::parsers::{DeclKind, Declaration, StructuralRecord};
use crate::scanner::hasher::hash_hex;
use crate::scanner::UnitKind;

/// Everything one unit contributes to the graph.
#[derive(Debug, Default)]
pub struct Fragment {
    /// Nodes owned by the unit, deleted with it.
    pub nodes: Vec<Node>,
    /// Shared nodes (requirements, incidents) that outlive any unit.
    pub shared: Vec<Node>,
    /// Edges whose endpoints are all in `nodes` or `shared`.
    pub edges: Vec<Edge>,
    /// Cross-unit references, resolved by the builder.
    pub refs: Vec<PendingRef>,
}

pub fn build(record: &IngestRecord, test_markers: &[String]) -> Fragment {
    let unit = &record.unit;
    match unit.kind {
        UnitKind::ConfigurationRoot => configuration(&unit.path, unit.hash, &record.record),
        UnitKind::MetadataDescriptor => metadata_object(&unit.path, unit.hash, &record.record),
        UnitKind::SourceModule => {
            module(&unit.path, unit.hash, &record.record, ids::is_test_module(&unit.path, test_markers))
        }
    }
}

fn owned_edge(source: NodeId, target: NodeId, kind: EdgeKind, unit: &str) -> Edge {
    Edge::new(source, target, kind).with_prop("unit", PropValue::from(unit))
}

fn configuration(path: &str, hash: u64, record: &StructuralRecord) -> Fragment {
    let id = NodeId::new(CONFIGURATION_ID);
    let display = record
        .descriptor
        .as_ref()
        .map(|d| d.name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| CONFIGURATION_ID.to_string());
    let mut node = Node::new(id.clone(), NodeKind::Configuration, display)
        .with_prop("unit", PropValue::from(path))
        .with_prop("content_hash", PropValue::Text(hash_hex(hash)));
    if record.flags.parse_failed {
        node = node.with_prop("parse_failed", PropValue::Bool(true));
    }

    let mut frag = Fragment {
        nodes: vec![node],
        ..Fragment::default()
    };
    let mut seen = FxHashSet::default();
    for child in record.descriptor.iter().flat_map(|d| d.child_objects.iter()) {
        if !seen.insert(child.to_lowercase()) {
            continue;
        }
        frag.refs.push(PendingRef {
            owner: id.clone(),
            awaited: child.clone(),
            ref_kind: RefKind::Child,
            unit: path.to_string(),
            line: None,
            context_module: None,
        });
    }
    frag
}

fn metadata_object(path: &str, hash: u64, record: &StructuralRecord) -> Fragment {
    let descriptor = record.descriptor.as_ref();
    let (kind, name) = ids::descriptor_object(path)
        .or_else(|| descriptor.and_then(|d| d.kind.map(|k| (k, d.name.clone()))))
        .unwrap_or_else(|| {
            let stem = path.rsplit('/').next().unwrap_or(path);
            let stem = stem.strip_suffix(".xml").unwrap_or(stem);
            (MetadataKind::Other, stem.to_string())
        });
    let id = kind.object_id(&name);

    let mut node = Node::new(id.clone(), NodeKind::MetadataObject(kind), name)
        .with_prop("unit", PropValue::from(path))
        .with_prop("content_hash", PropValue::Text(hash_hex(hash)))
        .with_prop("metadata_type", PropValue::from(kind.name()));
    if let Some(d) = descriptor {
        node = node.with_prop("attribute_count", PropValue::Int(i64::from(d.attribute_count)));
        if !d.forms.is_empty() {
            node = node.with_prop("forms", PropValue::List(d.forms.clone()));
        }
    }
    if record.flags.parse_failed {
        node = node.with_prop("parse_failed", PropValue::Bool(true));
    }

    let mut frag = Fragment {
        nodes: vec![node],
        ..Fragment::default()
    };
    let self_key = id.as_str().to_lowercase();
    let mut seen = FxHashSet::default();
    for type_ref in descriptor.iter().flat_map(|d| d.type_refs.iter()) {
        let key = type_ref.to_lowercase();
        if key == self_key || !seen.insert(key) {
            continue;
        }
        frag.refs.push(PendingRef {
            owner: id.clone(),
            awaited: type_ref.clone(),
            ref_kind: RefKind::MetadataType,
            unit: path.to_string(),
            line: None,
            context_module: None,
        });
    }
    frag
}

fn declaration_node(module: &NodeId, decl: &Declaration, is_test: bool, path: &str) -> Node {
    let kind = match (is_test, decl.kind) {
        (true, _) => NodeKind::TestCase,
        (false, DeclKind::Function) => NodeKind::Function,
        (false, DeclKind::Procedure) => NodeKind::Procedure,
    };
    let mut node = Node::new(NodeId::declaration(module, &decl.name), kind, decl.name.clone())
        .with_prop("module", PropValue::from(module.as_str()))
        .with_prop("is_export", PropValue::Bool(decl.is_export))
        .with_prop("loc", PropValue::Int(i64::from(decl.loc())))
        .with_prop("line_start", PropValue::Int(i64::from(decl.line_range.0)))
        .with_prop("line_end", PropValue::Int(i64::from(decl.line_range.1)))
        .with_prop("signature", PropValue::Text(decl.signature()))
        .with_prop("complexity", PropValue::Int(i64::from(decl.effective_complexity())))
        .with_prop("unit", PropValue::from(path));
    if let Some(ref region) = decl.region {
        node = node.with_prop("region", PropValue::Text(region.clone()));
    }
    if !decl.directives.is_empty() {
        node = node.with_prop("directives", PropValue::List(decl.directives.to_vec()));
    }
    if !decl.params.is_empty() {
        node = node.with_prop("params", PropValue::List(decl.params.to_vec()));
    }
    if let Some(deep) = decl.deep {
        node = node
            .with_prop("cyclomatic", PropValue::Int(i64::from(deep.cyclomatic)))
            .with_prop("basic_blocks", PropValue::Int(i64::from(deep.blocks)))
            .with_prop("cf_edges", PropValue::Int(i64::from(deep.cf_edges)))
            .with_prop("max_nesting", PropValue::Int(i64::from(deep.max_nesting)));
    }
    node
}

fn module(path: &str, hash: u64, record: &StructuralRecord, is_test: bool) -> Fragment {
    let location = ids::module_location(path);
    let module_id = location.id.clone();
    let module_kind = if is_test { NodeKind::TestSuite } else { NodeKind::Module };

    let mut module_node = Node::new(module_id.clone(), module_kind, location.short_name.clone())
        .with_prop("unit", PropValue::from(path))
        .with_prop("content_hash", PropValue::Text(hash_hex(hash)))
        .with_prop("loc", PropValue::Int(i64::from(record.loc)));
    if let Some(ref owner) = location.owner {
        module_node = module_node.with_prop("owner", PropValue::from(owner.as_str()));
    }
    if let Some(ref common) = location.common_module {
        module_node = module_node.with_prop("common_module", PropValue::Text(common.clone()));
    }
    if record.flags.parse_failed {
        module_node = module_node.with_prop("parse_failed", PropValue::Bool(true));
    }

    let mut frag = Fragment {
        nodes: vec![module_node],
        ..Fragment::default()
    };

    if let Some(owner) = location.owner {
        frag.refs.push(PendingRef {
            owner: module_id.clone(),
            awaited: owner.to_string(),
            ref_kind: RefKind::Container,
            unit: path.to_string(),
            line: None,
            context_module: None,
        });
    }

    let mut declared = FxHashSet::default();
    for decl in &record.declarations {
        if !declared.insert(decl.name.to_lowercase()) {
            tracing::debug!(unit = path, name = %decl.name, "duplicate declaration ignored");
            continue;
        }
        let node = declaration_node(&module_id, decl, is_test, path);
        let decl_id = node.id.clone();
        frag.nodes.push(node);
        frag.edges.push(owned_edge(module_id.clone(), decl_id.clone(), EdgeKind::Contains, path));

        for key in &decl.requirements {
            let req = NodeId::requirement(key);
            frag.shared.push(Node::new(req.clone(), NodeKind::Requirement, key.clone()));
            frag.edges.push(owned_edge(req, decl_id.clone(), EdgeKind::Implements, path));
        }
        for key in &decl.incidents {
            let inc = NodeId::incident(key);
            frag.shared.push(Node::new(inc.clone(), NodeKind::Incident, key.clone()));
            frag.edges.push(owned_edge(decl_id.clone(), inc, EdgeKind::TriggersIncident, path));
        }
    }

    let owner_of = |from_decl: &Option<String>| -> NodeId {
        from_decl
            .as_deref()
            .and_then(|name| record.declaration(name))
            .map(|d| NodeId::declaration(&module_id, &d.name))
            .unwrap_or_else(|| module_id.clone())
    };

    for call in &record.references {
        let owner = owner_of(&call.from_decl);
        let ref_kind = if is_test && owner != module_id {
            RefKind::TestCall
        } else {
            RefKind::Call
        };
        let awaited = match call.qualifier {
            Some(ref q) => format!("{q}.{}", call.callee_name),
            None => call.callee_name.clone(),
        };
        frag.refs.push(PendingRef {
            owner,
            awaited,
            ref_kind,
            unit: path.to_string(),
            line: Some(call.line),
            context_module: Some(module_id.clone()),
        });
    }

    for meta in &record.metadata_refs {
        frag.refs.push(PendingRef {
            owner: owner_of(&meta.from_decl),
            awaited: meta.object_id(),
            ref_kind: RefKind::Metadata,
            unit: path.to_string(),
            line: Some(meta.line),
            context_module: None,
        });
    }

    frag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::UnitMeta;
    use crate::parsers::bsl::fast_path::parse_module;
    use crate::parsers::metadata_xml::parse_descriptor;
    use crate::scanner::SourceUnit;

    fn record(path: &str, kind: UnitKind, content: &str) -> IngestRecord {
        let unit = SourceUnit::from_text(path, kind, content);
        let parsed = match kind {
            UnitKind::SourceModule => parse_module(content),
            _ => parse_descriptor(content),
        };
        IngestRecord {
            unit: UnitMeta::from(&unit),
            record: parsed,
        }
    }

    #[test]
    fn module_fragment_has_contains_and_refs() {
        let src = "// @requirement REQ-1\nFunction Calc() Export\n  Return Utils.Round(1);\nEndFunction\n";
        let frag = build(
            &record("CommonModules/Sales/Ext/Module.bsl", UnitKind::SourceModule, src),
            &["Tests".to_string()],
        );
        let ids: Vec<&str> = frag.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["CommonModule.Sales.Module", "CommonModule.Sales.Module::Calc"]);
        assert!(frag
            .edges
            .iter()
            .any(|e| e.kind == EdgeKind::Implements && e.source_id.as_str() == "requirement::REQ-1"));
        let call = frag.refs.iter().find(|r| r.ref_kind == RefKind::Call).unwrap();
        assert_eq!(call.awaited, "Utils.Round");
        assert!(frag
            .refs
            .iter()
            .any(|r| r.ref_kind == RefKind::Container && r.awaited == "CommonModule.Sales"));
    }

    #[test]
    fn test_module_declarations_are_test_cases() {
        let src = "Procedure CheckCalc() Export\n  Calc();\nEndProcedure\n";
        let frag = build(
            &record("CommonModules/SalesTests/Ext/Module.bsl", UnitKind::SourceModule, src),
            &["Tests".to_string()],
        );
        assert_eq!(frag.nodes[0].kind, NodeKind::TestSuite);
        assert_eq!(frag.nodes[1].kind, NodeKind::TestCase);
        assert_eq!(frag.refs.iter().filter(|r| r.ref_kind == RefKind::TestCall).count(), 1);
    }
}
