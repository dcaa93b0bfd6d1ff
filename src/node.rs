//! Catalog node types: the [Node] shape shared by every tree level, and the [Entity] payloads
//! that distinguish datasets, endpoints and layers.
use regex::Regex;
use serde::{ser::SerializeStruct, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, sync::Arc};
use url::Url;

use crate::{
    capability::{Dimension, MetadataUrl, ServiceLinks, Style},
    keywords::KeywordData,
    nodeid::{NodeId, NodeTag},
    CatalogError,
};

pub const ROOT_ICON: &str = "catalog-root";
pub const DATASET_ICON: &str = "dataset";
pub const ENDPOINT_ICON: &str = "endpoint";
pub const USER_ENDPOINT_ICON: &str = "user-endpoint";
pub const CONTAINER_LAYER_ICON: &str = "layer-container";
pub const LEAF_LAYER_ICON: &str = "layer-leaf";

/// Token in a layer-data name pattern replaced by the owning endpoint's key.
pub const ENDPOINT_TOKEN: &str = "%ENDPOINT%";

/// Child state of a node. `Unpopulated` is only valid for endpoints whose layers have not been
/// fetched yet; it is never used to mean "no children".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Children {
    Unpopulated,
    Populated(Vec<NodeId>),
}

impl Children {
    pub fn empty() -> Children {
        Children::Populated(Vec::new())
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, Children::Populated(_))
    }

    /// Child ids in display order. Empty while unpopulated.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            Children::Unpopulated => &[],
            Children::Populated(ids) => ids,
        }
    }
}

/// Display record for tree widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeInfo {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub icon_class: String,
    pub is_leaf: bool,
}

impl TreeInfo {
    pub fn new(label: impl Into<String>, tooltip: Option<String>, icon: &str, is_leaf: bool) -> Self {
        TreeInfo {
            label: label.into(),
            tooltip,
            icon_class: icon.to_string(),
            is_leaf,
        }
    }

    pub fn root() -> TreeInfo {
        TreeInfo::new("Catalog", None, ROOT_ICON, false)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetEntity {
    pub key: String,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub metadata_link: Option<String>,
    pub keyword_data_key: Option<String>,
}

/// Keyword overrides for the real layers whose names match `pattern`.
#[derive(Debug, Clone)]
pub struct LayerMatcher {
    pub key: String,
    pub pattern: String,
    regex: Regex,
    pub keyword_data: KeywordData,
}

impl LayerMatcher {
    /// Compile a matcher. [ENDPOINT_TOKEN] in `pattern` is replaced by the escaped endpoint key,
    /// and the pattern must match the whole layer name.
    pub fn new(
        key: &str,
        pattern: &str,
        endpoint_key: &str,
        keyword_data: KeywordData,
    ) -> Result<LayerMatcher, CatalogError> {
        let expanded = pattern.replace(ENDPOINT_TOKEN, &regex::escape(endpoint_key));
        let regex = Regex::new(&format!("^(?:{expanded})$"))?;
        Ok(LayerMatcher {
            key: key.to_string(),
            pattern: expanded,
            regex,
            keyword_data,
        })
    }

    pub fn matches(&self, layer_name: &str) -> bool {
        self.regex.is_match(layer_name)
    }
}

impl PartialEq for LayerMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.pattern == other.pattern
            && self.keyword_data == other.keyword_data
    }
}

impl Eq for LayerMatcher {}

impl Serialize for LayerMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("LayerMatcher", 3)?;
        state.serialize_field("key", &self.key)?;
        state.serialize_field("pattern", &self.pattern)?;
        state.serialize_field("keyword_data", &self.keyword_data)?;
        state.end()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointEntity {
    pub key: String,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub metadata_link: Option<String>,
    pub wms_url: Option<Url>,
    pub wcs_url: Option<Url>,
    pub keyword_data_key: Option<String>,
    pub layer_set: Option<String>,
    pub layer_data: Vec<LayerMatcher>,
    /// Layer name → display label, from `newlayernames`.
    pub new_layer_names: BTreeMap<String, String>,
    pub user_added: bool,
}

impl EndpointEntity {
    /// Merged overrides of every layer-data entry matching `layer_name`, in configuration order.
    pub fn layer_keyword_data(&self, layer_name: &str) -> KeywordData {
        KeywordData::merge_chain(
            self.layer_data
                .iter()
                .filter(|m| m.matches(layer_name))
                .map(|m| &m.keyword_data),
        )
    }

    pub fn display_label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| self.key.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerEntity {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub is_container: bool,
    pub dimensions: Vec<Dimension>,
    pub styles: Vec<Style>,
    pub metadata_urls: Vec<MetadataUrl>,
    pub display_options_url: Option<String>,
    pub endpoint_id: NodeId,
    pub service: Arc<ServiceLinks>,
}

/// Payload of a catalog node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Root,
    Dataset(DatasetEntity),
    Endpoint(EndpointEntity),
    Layer(LayerEntity),
}

impl Entity {
    pub fn as_endpoint(&self) -> Option<&EndpointEntity> {
        match self {
            Entity::Endpoint(ep) => Some(ep),
            _ => None,
        }
    }

    pub fn as_layer(&self) -> Option<&LayerEntity> {
        match self {
            Entity::Layer(layer) => Some(layer),
            _ => None,
        }
    }
}

/// One node of the catalog tree. Entity, tree info and keyword data are reference counted so a
/// shallow copy shares them with the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub entity: Arc<Entity>,
    pub children: Children,
    pub tree_info: Arc<TreeInfo>,
    pub keyword_data: Arc<KeywordData>,
    /// Metadata of a single grouping layer that was elided from under this endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elided: Option<Arc<LayerEntity>>,
}

impl Node {
    pub fn new(
        id: NodeId,
        entity: Entity,
        children: Children,
        tree_info: TreeInfo,
        keyword_data: KeywordData,
    ) -> Node {
        Node {
            id,
            entity: Arc::new(entity),
            children,
            tree_info: Arc::new(tree_info),
            keyword_data: Arc::new(keyword_data),
            elided: None,
        }
    }

    pub fn root(children: Vec<NodeId>) -> Node {
        Node::new(
            NodeId::root(),
            Entity::Root,
            Children::Populated(children),
            TreeInfo::root(),
            KeywordData::default(),
        )
    }

    pub fn tag(&self) -> NodeTag {
        self.id.tag()
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(*self.entity, Entity::Endpoint(_))
    }

    pub fn needs_population(&self) -> bool {
        self.is_endpoint() && !self.children.is_populated()
    }

    /// Shallow copy sharing entity, tree info and keyword data, with new children.
    pub fn with_children(&self, children: Children) -> Node {
        Node {
            children,
            ..self.clone()
        }
    }

    /// Layer name, if this node is a leaf layer with a name.
    pub fn leaf_layer_name(&self) -> Option<&str> {
        match &*self.entity {
            Entity::Layer(layer) if !layer.is_container => layer.name.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tree_info.label, self.id)
    }
}
