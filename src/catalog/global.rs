use std::{collections::BTreeMap, sync::Arc};

use crate::{diagnostic::ConfigDiagnostic, node::Node, nodeid::NodeId};

/// The static tree produced by the builder: root, datasets and (unpopulated) endpoints.
///
/// Never mutated after construction. Layer subtrees fetched later live in the catalog's subtree
/// cache instead, so the static tree can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct GlobalCatalog {
    nodes: BTreeMap<NodeId, Arc<Node>>,
    diagnostics: Vec<ConfigDiagnostic>,
}

impl GlobalCatalog {
    pub(crate) fn new(
        nodes: BTreeMap<NodeId, Arc<Node>>,
        diagnostics: Vec<ConfigDiagnostic>,
    ) -> GlobalCatalog {
        GlobalCatalog { nodes, diagnostics }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(id)
    }

    pub fn root(&self) -> Option<&Arc<Node>> {
        self.nodes.get(&NodeId::root())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values().filter(|n| n.is_endpoint())
    }

    pub fn diagnostics(&self) -> &[ConfigDiagnostic] {
        &self.diagnostics
    }
}
