use parking_lot::{Mutex, RwLock};
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    layers::LayerSubtree,
    node::{Children, Node},
    nodeid::NodeId,
    CatalogError,
};

/// An endpoint together with the layer subtree attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedEndpoint {
    pub endpoint: Arc<Node>,
    pub layers: BTreeMap<NodeId, Arc<Node>>,
}

impl PopulatedEndpoint {
    /// Attach `subtree` to a copy of `endpoint`. The children are replaced as a whole.
    pub fn attach(endpoint: &Node, subtree: LayerSubtree) -> PopulatedEndpoint {
        let mut populated = endpoint.with_children(Children::Populated(subtree.children));
        populated.elided = subtree.elided;
        PopulatedEndpoint {
            endpoint: Arc::new(populated),
            layers: subtree.nodes,
        }
    }
}

/// Layer subtrees of shared endpoints, keyed by endpoint id.
///
/// Population runs behind a per-endpoint single-flight lock: concurrent first requests for the
/// same endpoint run one fetch+parse and the others observe its result. A failed population
/// stores nothing, so the endpoint stays unpopulated and the next request retries.
#[derive(Debug, Default)]
pub(crate) struct SubtreeCache {
    trees: RwLock<BTreeMap<NodeId, Arc<PopulatedEndpoint>>>,
    inflight: Mutex<BTreeMap<NodeId, Arc<Mutex<()>>>>,
}

impl SubtreeCache {
    pub fn get(&self, id: &NodeId) -> Option<Arc<PopulatedEndpoint>> {
        self.trees.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.trees.read().len()
    }

    fn flight(&self, id: &NodeId) -> Arc<Mutex<()>> {
        self.inflight.lock().entry(id.clone()).or_default().clone()
    }

    fn land(&self, id: &NodeId) {
        self.inflight.lock().remove(id);
    }

    pub fn get_or_populate<F>(
        &self,
        id: &NodeId,
        populate: F,
    ) -> Result<Arc<PopulatedEndpoint>, CatalogError>
    where
        F: FnOnce() -> Result<PopulatedEndpoint, CatalogError>,
    {
        if let Some(tree) = self.get(id) {
            return Ok(tree);
        }
        let flight = self.flight(id);
        let _guard = flight.lock();
        if let Some(tree) = self.get(id) {
            tracing::debug!("[SubtreeCache::get_or_populate] {id} populated by a concurrent request");
            return Ok(tree);
        }
        let result = populate().map(|populated| {
            let tree = Arc::new(populated);
            self.trees.write().insert(id.clone(), tree.clone());
            tree
        });
        self.land(id);
        result
    }

    /// Replace the subtree of `id` unconditionally. On failure the previous subtree is kept.
    pub fn replace<F>(&self, id: &NodeId, populate: F) -> Result<Arc<PopulatedEndpoint>, CatalogError>
    where
        F: FnOnce() -> Result<PopulatedEndpoint, CatalogError>,
    {
        let flight = self.flight(id);
        let _guard = flight.lock();
        let result = populate().map(|populated| {
            let tree = Arc::new(populated);
            self.trees.write().insert(id.clone(), tree.clone());
            tree
        });
        self.land(id);
        result
    }
}
