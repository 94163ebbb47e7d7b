//! Case-insensitive name index used for reference resolution.

use std::collections::BTreeSet;

use depgraph_core::types::collections::FxHashMap;
use depgraph_core::types::{Node, NodeId, NodeKind, PropValue};

use super::pending::PendingRef;

#[derive(Debug, Clone)]
struct Entry {
    kind: NodeKind,
    /// (module, lowercased declaration name) for declarations.
    decl: Option<(NodeId, String)>,
    exported: bool,
    common_module: Option<String>,
    object_key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: FxHashMap<NodeId, Entry>,
    decls: FxHashMap<String, BTreeSet<NodeId>>,
    module_decls: FxHashMap<NodeId, FxHashMap<String, NodeId>>,
    common_modules: FxHashMap<String, NodeId>,
    objects: FxHashMap<String, NodeId>,
}

fn is_declaration(kind: NodeKind) -> bool {
    kind.is_code() || kind == NodeKind::TestCase
}

impl NameIndex {
    /// Register a node. Placeholders are never indexed.
    pub fn add(&mut self, node: &Node) {
        if node.kind == NodeKind::Unknown {
            return;
        }
        let mut entry = Entry {
            kind: node.kind,
            decl: None,
            exported: false,
            common_module: None,
            object_key: None,
        };
        match node.kind {
            k if is_declaration(k) => {
                if let Some(module) = node.prop("module").and_then(PropValue::as_text) {
                    let module = NodeId::new(module);
                    let name = node.display_name.to_lowercase();
                    self.decls.entry(name.clone()).or_default().insert(node.id.clone());
                    self.module_decls
                        .entry(module.clone())
                        .or_default()
                        .entry(name.clone())
                        .or_insert_with(|| node.id.clone());
                    entry.decl = Some((module, name));
                }
                entry.exported = node
                    .prop("is_export")
                    .and_then(PropValue::as_bool)
                    .unwrap_or(false);
            }
            NodeKind::Module | NodeKind::TestSuite => {
                if let Some(name) = node.prop("common_module").and_then(PropValue::as_text) {
                    let key = name.to_lowercase();
                    self.common_modules.insert(key.clone(), node.id.clone());
                    entry.common_module = Some(key);
                }
            }
            NodeKind::MetadataObject(_) | NodeKind::Configuration => {
                let key = node.id.as_str().to_lowercase();
                self.objects.insert(key.clone(), node.id.clone());
                entry.object_key = Some(key);
            }
            _ => {}
        }
        self.entries.insert(node.id.clone(), entry);
    }

    /// Forget a node. Returns its kind when it was indexed.
    pub fn remove(&mut self, id: &NodeId) -> Option<NodeKind> {
        let entry = self.entries.remove(id)?;
        if let Some((module, name)) = entry.decl {
            if let Some(ids) = self.decls.get_mut(&name) {
                ids.remove(id);
                if ids.is_empty() {
                    self.decls.remove(&name);
                }
            }
            if let Some(names) = self.module_decls.get_mut(&module) {
                if names.get(&name) == Some(id) {
                    names.remove(&name);
                }
                if names.is_empty() {
                    self.module_decls.remove(&module);
                }
            }
        }
        if let Some(key) = entry.common_module {
            if self.common_modules.get(&key) == Some(id) {
                self.common_modules.remove(&key);
            }
        }
        if let Some(key) = entry.object_key {
            if self.objects.get(&key) == Some(id) {
                self.objects.remove(&key);
            }
        }
        Some(entry.kind)
    }

    pub fn kind(&self, id: &NodeId) -> Option<NodeKind> {
        self.entries.get(id).map(|e| e.kind)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.entries.contains_key(id)
    }

    /// Module of a declaration; a module is its own module.
    pub fn module_of(&self, id: &NodeId) -> Option<NodeId> {
        let entry = self.entries.get(id)?;
        match (&entry.decl, entry.kind) {
            (Some((module, _)), _) => Some(module.clone()),
            (None, NodeKind::Module | NodeKind::TestSuite) => Some(id.clone()),
            _ => None,
        }
    }

    /// Resolve a reference to its target, if the target is known.
    pub fn resolve(&self, r: &PendingRef) -> Option<(NodeId, NodeKind)> {
        let target = if r.ref_kind.is_call() {
            self.resolve_call(&r.awaited, r.context_module.as_ref())
        } else {
            self.objects.get(&r.awaited.to_lowercase()).cloned()
        }?;
        let kind = self.kind(&target)?;
        Some((target, kind))
    }

    /// Qualified names go through the common-module index. Unqualified names
    /// resolve within the calling module first, then to a unique global
    /// declaration (a unique exported one when several share the name).
    fn resolve_call(&self, awaited: &str, context: Option<&NodeId>) -> Option<NodeId> {
        let lowered = awaited.to_lowercase();
        if let Some((qualifier, name)) = lowered.split_once('.') {
            let module = self.common_modules.get(qualifier)?;
            return self.module_decls.get(module)?.get(name).cloned();
        }
        if let Some(local) = context
            .and_then(|m| self.module_decls.get(m))
            .and_then(|names| names.get(&lowered))
        {
            return Some(local.clone());
        }
        let candidates = self.decls.get(&lowered)?;
        if candidates.len() == 1 {
            return candidates.iter().next().cloned();
        }
        let mut exported = candidates
            .iter()
            .filter(|id| self.entries.get(*id).is_some_and(|e| e.exported));
        match (exported.next(), exported.next()) {
            (Some(only), None) => Some(only.clone()),
            _ => None,
        }
    }
}
