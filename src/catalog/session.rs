use std::{collections::BTreeMap, sync::Arc};
use uuid::Uuid;

use crate::{node::Node, nodeid::NodeId};

/// Per-session overlay over the shared catalog.
///
/// Holds session-only nodes (user-added endpoints and their layers), private copies of global
/// nodes the session has modified, and, when endpoint data is not shared, the session's own
/// populated copies of global endpoints. Entries here shadow the global catalog.
///
/// The overlay is not synchronized: it is mutated through `&mut`, so concurrent requests of one
/// session must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct SessionOverlay {
    session_id: Uuid,
    nodes: BTreeMap<NodeId, Arc<Node>>,
}

impl Default for SessionOverlay {
    fn default() -> Self {
        SessionOverlay::new()
    }
}

impl SessionOverlay {
    pub fn new() -> SessionOverlay {
        SessionOverlay {
            session_id: Uuid::new_v4(),
            nodes: BTreeMap::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn get(&self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.get(id).cloned()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn insert(&mut self, node: Arc<Node>) -> Option<Arc<Node>> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn remove(&mut self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.remove(id)
    }

    /// Remove every descendant of `id` reachable through session nodes, and `id` itself when
    /// `include_self` is set. Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, id: &NodeId, include_self: bool) -> usize {
        let mut removed = 0;
        let mut stack: Vec<NodeId> = self
            .nodes
            .get(id)
            .map(|n| n.children.ids().to_vec())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children.ids().iter().cloned());
                removed += 1;
            }
        }
        if include_self && self.nodes.remove(id).is_some() {
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
