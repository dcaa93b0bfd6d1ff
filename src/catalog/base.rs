//! Catalog: the orchestrator over the static tree, the shared subtree cache and session overlays.

use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::{
    builder,
    capability::{CacheStats, CapabilityCache, CapabilityDocument, CapabilityFetcher, HttpFetcher},
    config::CatalogConfig,
    diagnostic::ConfigDiagnostic,
    keywords::KeywordData,
    layers::{LayerParser, LayerSubtree},
    node::{Children, EndpointEntity, Entity, Node, TreeInfo, USER_ENDPOINT_ICON},
    nodeid::{NodeId, NodeTag},
    sections::SectionSource,
    CatalogError,
};

use super::{
    subtrees::{PopulatedEndpoint, SubtreeCache},
    GlobalCatalog, SessionOverlay,
};

/// The dataset/endpoint/layer catalog.
///
/// Lookups go to the session overlay first; a session copy always wins. Ids the tags mark as
/// session-only, and every id when endpoint data is not shared, resolve inside the session.
/// Everything else resolves against the static [GlobalCatalog] and the shared subtree cache.
///
/// Endpoints are populated lazily: the first lookup of an endpoint, or of any layer id under
/// it, fetches the endpoint's capability document (through the URL-keyed
/// [CapabilityCache]) and parses it into a layer subtree.
///
/// `Catalog` is `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct Catalog {
    config: CatalogConfig,
    global: GlobalCatalog,
    subtrees: SubtreeCache,
    cache: CapabilityCache,
}

impl Catalog {
    pub fn new(
        config: CatalogConfig,
        global: GlobalCatalog,
        fetcher: Arc<dyn CapabilityFetcher>,
    ) -> Catalog {
        let cache = CapabilityCache::new(
            fetcher,
            config.cache.clone(),
            config.proxy_rewrite(),
            &config.wms_version,
        );
        Catalog {
            config,
            global,
            subtrees: SubtreeCache::default(),
            cache,
        }
    }

    /// Build the static tree from `sections` and wrap it in a catalog.
    pub fn from_sections<S: SectionSource + ?Sized>(
        config: CatalogConfig,
        sections: &S,
        fetcher: Arc<dyn CapabilityFetcher>,
    ) -> Catalog {
        let global = builder::build(sections, &config.page_section);
        Catalog::new(config, global, fetcher)
    }

    /// [Catalog::from_sections] with the blocking HTTP transport.
    pub fn with_http<S: SectionSource + ?Sized>(
        config: CatalogConfig,
        sections: &S,
    ) -> Result<Catalog, CatalogError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        Ok(Catalog::from_sections(config, sections, fetcher))
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn global(&self) -> &GlobalCatalog {
        &self.global
    }

    pub fn diagnostics(&self) -> &[ConfigDiagnostic] {
        self.global.diagnostics()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of shared endpoints whose layers have been populated.
    pub fn populated_endpoints(&self) -> usize {
        self.subtrees.len()
    }

    /// Ancestor ids of `id`, root-most first, read from the id alone.
    pub fn find_antecedent_ids(id: &NodeId, include_self: bool) -> Vec<NodeId> {
        id.antecedents(include_self)
    }

    pub fn root(&self, session: &mut SessionOverlay) -> Result<Option<Arc<Node>>, CatalogError> {
        self.get_node(&NodeId::root(), session)
    }

    /// Resolve a raw id string. Malformed ids are treated like stale ones: a miss.
    pub fn lookup(
        &self,
        id: &str,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        match NodeId::parse(id) {
            Ok(id) => self.get_node(&id, session),
            Err(e) => {
                tracing::debug!("[Catalog::lookup] {e}");
                Ok(None)
            }
        }
    }

    /// Resolve a node, populating its endpoint first when needed. `Ok(None)` is a lookup miss.
    pub fn get_node(
        &self,
        id: &NodeId,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        if let Some(node) = session.get(id) {
            if node.needs_population() {
                return self.populate_in_session(&node, session, false).map(Some);
            }
            return Ok(Some(node));
        }

        let private = id.is_session_only() || !self.config.shared_endpoint_data;
        let tag = id.tag();
        if tag.is_layer() {
            let Some(endpoint_id) = id.endpoint_ancestor() else {
                return Ok(None);
            };
            if private || session.contains(&endpoint_id) {
                if self.get_node(&endpoint_id, session)?.is_none() {
                    return Ok(None);
                }
                if let Some(layer) = session.get(id) {
                    return Ok(Some(layer));
                }
                if private {
                    return Ok(None);
                }
            }
            return self.shared_layer(id, &endpoint_id);
        }
        if id.is_session_only() {
            // user endpoints never exist outside their session
            return Ok(None);
        }
        if private && tag.is_endpoint() {
            return self.private_endpoint(id, session);
        }

        let Some(node) = self.global.get(id) else {
            return Ok(None);
        };
        if node.needs_population() {
            return Ok(Some(self.shared_subtree(node)?.endpoint.clone()));
        }
        Ok(Some(node.clone()))
    }

    /// Resolve the children of `node` in order. Children that no longer resolve are skipped.
    pub fn children(
        &self,
        node: &Node,
        session: &mut SessionOverlay,
    ) -> Result<Vec<Arc<Node>>, CatalogError> {
        let node = if node.needs_population() {
            match self.get_node(&node.id, session)? {
                Some(populated) => populated,
                None => return Ok(Vec::new()),
            }
        } else {
            Arc::new(node.clone())
        };
        let mut children = Vec::with_capacity(node.children.ids().len());
        for child_id in node.children.ids() {
            match self.get_node(child_id, session)? {
                Some(child) => children.push(child),
                None => tracing::warn!("[Catalog::children] {} lists missing child {child_id}", node.id),
            }
        }
        Ok(children)
    }

    /// Keyword data of `node` merged with every ancestor's, root first, descendants winning.
    pub fn get_ancestor_keyword_data(
        &self,
        node: &Node,
        session: &mut SessionOverlay,
        include_self: bool,
    ) -> Result<KeywordData, CatalogError> {
        let mut merged = KeywordData::default();
        for ancestor_id in node.id.antecedents(false) {
            if let Some(ancestor) = self.get_node(&ancestor_id, session)? {
                merged.overlay(&ancestor.keyword_data);
            }
        }
        if include_self {
            merged.overlay(&node.keyword_data);
        }
        Ok(merged)
    }

    /// Depth-first search below `root` for the leaf layer named `layer_name`.
    pub fn find_descendant_by_name(
        &self,
        root: &Node,
        layer_name: &str,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        for child in self.children(root, session)? {
            if child.leaf_layer_name() == Some(layer_name) {
                return Ok(Some(child));
            }
            if let Some(found) = self.find_descendant_by_name(&child, layer_name, session)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Lookup by endpoint id and layer name.
    pub fn find_layer(
        &self,
        endpoint_id: &NodeId,
        layer_name: &str,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        match self.get_node(endpoint_id, session)? {
            Some(endpoint) => self.find_descendant_by_name(&endpoint, layer_name, session),
            None => Ok(None),
        }
    }

    /// Refetch an endpoint's capability document and replace its whole layer subtree, in the
    /// session when the endpoint resolves there, in the shared cache otherwise.
    pub fn refresh_endpoint(
        &self,
        id: &NodeId,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        if !id.tag().is_endpoint() {
            return Err(CatalogError::InvalidOperation(format!(
                "{id} is not an endpoint and cannot be refreshed"
            )));
        }
        let private = id.is_session_only() || !self.config.shared_endpoint_data;
        if let Some(node) = session.get(id) {
            return self.populate_in_session(&node, session, true).map(Some);
        }
        if private {
            let Some(global) = self.global.get(id) else {
                return Ok(None);
            };
            let copy = Arc::new(Node::clone(global));
            session.insert(copy.clone());
            return self.populate_in_session(&copy, session, true).map(Some);
        }
        let Some(node) = self.global.get(id) else {
            return Ok(None);
        };
        let tree = self.subtrees.replace(id, || {
            let antecedent = self.chain_keyword_data(node, None);
            let subtree = self.load_subtree(node, &antecedent, true)?;
            Ok(PopulatedEndpoint::attach(node, subtree))
        })?;
        Ok(Some(tree.endpoint.clone()))
    }

    /// Add a node to the session overlay under `parent_id`.
    ///
    /// A parent that only exists globally, including a shared endpoint's populated form or one of
    /// its layers, is first copied into the session (sharing its entity, tree info and keyword
    /// data), so the global tree is never touched. An unpopulated endpoint parent is populated
    /// before the copy.
    #[allow(clippy::too_many_arguments)]
    pub fn add_session_node(
        &self,
        session: &mut SessionOverlay,
        id: NodeId,
        entity: Entity,
        tree_info: TreeInfo,
        keyword_data: KeywordData,
        parent_id: &NodeId,
        prepend: bool,
    ) -> Result<Arc<Node>, CatalogError> {
        if id.parent().as_ref() != Some(parent_id) {
            return Err(CatalogError::InvalidId(format!(
                "{id} is not a child id of {parent_id}"
            )));
        }
        if session.contains(&id) {
            return Err(CatalogError::InvalidOperation(format!(
                "{id} already exists in session {}",
                session.session_id()
            )));
        }
        let held = session.contains(parent_id);
        let Some(parent) = self.get_node(parent_id, session)? else {
            return Err(CatalogError::NotFound(format!("parent {parent_id}")));
        };
        if !held {
            tracing::debug!(
                "[Catalog::add_session_node] copying {parent_id} into session {}",
                session.session_id()
            );
        }
        let Children::Populated(siblings) = &parent.children else {
            return Err(CatalogError::InvalidOperation(format!(
                "cannot add children to unpopulated endpoint {parent_id}"
            )));
        };
        let mut siblings = siblings.clone();
        if prepend {
            siblings.insert(0, id.clone());
        } else {
            siblings.push(id.clone());
        }

        let children = if matches!(entity, Entity::Endpoint(_)) {
            Children::Unpopulated
        } else {
            Children::empty()
        };
        let child = Arc::new(Node::new(id, entity, children, tree_info, keyword_data));
        session.insert(Arc::new(parent.with_children(Children::Populated(siblings))));
        session.insert(child.clone());
        Ok(child)
    }

    /// Add a user endpoint, visible only to this session, under `parent_id`.
    pub fn add_user_endpoint(
        &self,
        session: &mut SessionOverlay,
        parent_id: &NodeId,
        wms_url: Url,
        name: &str,
        prepend: bool,
    ) -> Result<Arc<Node>, CatalogError> {
        let key = Uuid::new_v4().simple().to_string();
        let id = NodeId::build(NodeTag::UserEndpoint, &key, Some(parent_id));
        let tree_info = TreeInfo::new(name, Some(wms_url.to_string()), USER_ENDPOINT_ICON, false);
        let entity = EndpointEntity {
            key,
            name: Some(name.to_string()),
            wms_url: Some(wms_url),
            user_added: true,
            ..Default::default()
        };
        self.add_session_node(
            session,
            id,
            Entity::Endpoint(entity),
            tree_info,
            KeywordData::default(),
            parent_id,
            prepend,
        )
    }

    /// Remove a session node, and everything below it, from the session overlay.
    pub fn remove_session_node(
        &self,
        session: &mut SessionOverlay,
        id: &NodeId,
        parent_id: &NodeId,
    ) -> Result<(), CatalogError> {
        if !session.contains(id) {
            return Err(CatalogError::InvalidOperation(format!(
                "{id} is not a node of session {}",
                session.session_id()
            )));
        }
        let Some(parent) = session.get(parent_id) else {
            return Err(CatalogError::NotFound(format!(
                "parent {parent_id} in session {}",
                session.session_id()
            )));
        };
        let siblings: Vec<NodeId> = parent
            .children
            .ids()
            .iter()
            .filter(|child| *child != id)
            .cloned()
            .collect();
        if siblings.len() == parent.children.ids().len() {
            return Err(CatalogError::NotFound(format!("{id} under {parent_id}")));
        }
        session.insert(Arc::new(parent.with_children(Children::Populated(siblings))));
        let removed = session.remove_subtree(id, true);
        tracing::debug!("[Catalog::remove_session_node] removed {removed} nodes under {id}");
        Ok(())
    }

    fn private_endpoint(
        &self,
        id: &NodeId,
        session: &mut SessionOverlay,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        let Some(global) = self.global.get(id) else {
            return Ok(None);
        };
        // Copy on write: the session populates its own copy, the global node stays unpopulated.
        let copy = Arc::new(Node::clone(global));
        session.insert(copy.clone());
        self.populate_in_session(&copy, session, false).map(Some)
    }

    fn shared_layer(
        &self,
        id: &NodeId,
        endpoint_id: &NodeId,
    ) -> Result<Option<Arc<Node>>, CatalogError> {
        let Some(endpoint) = self.global.get(endpoint_id) else {
            return Ok(None);
        };
        if !endpoint.is_endpoint() {
            return Ok(None);
        }
        Ok(self.shared_subtree(endpoint)?.layers.get(id).cloned())
    }

    fn shared_subtree(&self, endpoint: &Arc<Node>) -> Result<Arc<PopulatedEndpoint>, CatalogError> {
        self.subtrees.get_or_populate(&endpoint.id, || {
            let antecedent = self.chain_keyword_data(endpoint, None);
            let subtree = self.load_subtree(endpoint, &antecedent, false)?;
            Ok(PopulatedEndpoint::attach(endpoint, subtree))
        })
    }

    /// Populate (or repopulate) an endpoint node held by the session. Layers land in the
    /// session map; a previous layer subtree is dropped only once the new one parsed.
    fn populate_in_session(
        &self,
        endpoint: &Arc<Node>,
        session: &mut SessionOverlay,
        force_refresh: bool,
    ) -> Result<Arc<Node>, CatalogError> {
        let antecedent = self.chain_keyword_data(endpoint, Some(&*session));
        let subtree = self.load_subtree(endpoint, &antecedent, force_refresh)?;
        session.remove_subtree(&endpoint.id, false);
        let populated = PopulatedEndpoint::attach(endpoint, subtree);
        for layer in populated.layers.into_values() {
            session.insert(layer);
        }
        session.insert(populated.endpoint.clone());
        tracing::debug!(
            "[Catalog::populate_in_session] populated {} in session {}",
            endpoint.id,
            session.session_id()
        );
        Ok(populated.endpoint)
    }

    /// Keyword data an endpoint hands to its layers: ancestors root first, then its own. Read
    /// without triggering population, since the ancestors of an endpoint are datasets.
    fn chain_keyword_data(&self, node: &Node, session: Option<&SessionOverlay>) -> KeywordData {
        let mut merged = KeywordData::default();
        for ancestor_id in node.id.antecedents(false) {
            let ancestor = session
                .and_then(|s| s.get(&ancestor_id))
                .or_else(|| self.global.get(&ancestor_id).cloned());
            if let Some(ancestor) = ancestor {
                merged.overlay(&ancestor.keyword_data);
            }
        }
        merged.overlay(&node.keyword_data);
        merged
    }

    /// Fetch (through the cache) and parse an endpoint's layers. A document that wraps all
    /// layers in a single grouping container has that level elided: its children attach to the
    /// endpoint directly, inherit the container's keyword data, and the container's entity is
    /// kept on the subtree.
    #[tracing::instrument(skip(self, endpoint, antecedent), fields(endpoint = %endpoint.id))]
    fn load_subtree(
        &self,
        endpoint: &Node,
        antecedent: &KeywordData,
        force_refresh: bool,
    ) -> Result<LayerSubtree, CatalogError> {
        let Some(entity) = endpoint.entity.as_endpoint() else {
            return Err(CatalogError::InvalidOperation(format!(
                "{} is not an endpoint",
                endpoint.id
            )));
        };
        let Some(url) = &entity.wms_url else {
            return Err(CatalogError::Configuration(format!(
                "endpoint {} has no wmsurl",
                endpoint.id
            )));
        };
        let document = self.cache.get(url, force_refresh)?;
        Ok(parse_endpoint_layers(&document, entity, &endpoint.id, antecedent))
    }
}

/// Layer subtree of an endpoint, with single-container elision applied.
pub fn parse_endpoint_layers(
    document: &CapabilityDocument,
    entity: &EndpointEntity,
    endpoint_id: &NodeId,
    antecedent: &KeywordData,
) -> LayerSubtree {
    let parser = LayerParser::new(entity, endpoint_id, document.service.clone());
    match document.single_container() {
        Some(container) => {
            let container_keywords = parser.resolve_keywords(container, antecedent);
            let mut subtree = parser.parse_layers(&container.children, endpoint_id, &container_keywords);
            subtree.elided = Some(Arc::new(parser.layer_entity(container)));
            subtree
        }
        None => parser.parse(document, endpoint_id, antecedent),
    }
}
