//! Layer tree parser: one capability document in, a subtree of layer nodes out.
//!
//! Layers with nested layers become containers, the rest become leaves. Each layer's id is its
//! name (or title) chained onto its parent's id, and its keyword data is the antecedent keyword
//! data with the endpoint's matching layer-data overrides laid on top. That merged map is both
//! attached to the node and handed down to the layer's children.
use std::{collections::BTreeMap, sync::Arc};

use crate::{
    capability::{CapabilityDocument, LayerElement, ServiceLinks},
    keywords::KeywordData,
    node::{
        Children, EndpointEntity, Entity, LayerEntity, Node, TreeInfo, CONTAINER_LAYER_ICON,
        LEAF_LAYER_ICON,
    },
    nodeid::{NodeId, NodeTag},
};

/// Layer nodes produced by one parse. `children` are the top-level ids in document order;
/// `nodes` holds every node of the subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSubtree {
    pub children: Vec<NodeId>,
    pub nodes: BTreeMap<NodeId, Arc<Node>>,
    /// Entity of a grouping layer elided from above `children`, if any.
    pub elided: Option<Arc<LayerEntity>>,
}

impl LayerSubtree {
    /// Top-level layer nodes in document order.
    pub fn top_nodes(&self) -> Vec<Arc<Node>> {
        self.children
            .iter()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Everything about the owning endpoint a layer parse needs.
pub struct LayerParser<'a> {
    endpoint: &'a EndpointEntity,
    endpoint_id: &'a NodeId,
    service: Arc<ServiceLinks>,
}

impl<'a> LayerParser<'a> {
    pub fn new(
        endpoint: &'a EndpointEntity,
        endpoint_id: &'a NodeId,
        service: Arc<ServiceLinks>,
    ) -> LayerParser<'a> {
        LayerParser {
            endpoint,
            endpoint_id,
            service,
        }
    }

    /// Parse every top-level layer of `doc` under `parent_id`.
    pub fn parse(
        &self,
        doc: &CapabilityDocument,
        parent_id: &NodeId,
        antecedent: &KeywordData,
    ) -> LayerSubtree {
        self.parse_layers(&doc.layers, parent_id, antecedent)
    }

    /// Parse a slice of sibling layers under `parent_id`.
    pub fn parse_layers(
        &self,
        layers: &[LayerElement],
        parent_id: &NodeId,
        antecedent: &KeywordData,
    ) -> LayerSubtree {
        let mut subtree = LayerSubtree::default();
        for (index, layer) in layers.iter().enumerate() {
            let id = self.parse_layer(layer, index, parent_id, antecedent, &mut subtree.nodes);
            subtree.children.push(id);
        }
        tracing::debug!(
            "[LayerParser::parse_layers] {} layers under {}",
            subtree.nodes.len(),
            parent_id
        );
        subtree
    }

    /// Keyword data of one layer: antecedent data with the endpoint's matching overrides on top.
    pub fn resolve_keywords(&self, layer: &LayerElement, antecedent: &KeywordData) -> KeywordData {
        match &layer.name {
            Some(name) => antecedent.merged_with(&self.endpoint.layer_keyword_data(name)),
            None => antecedent.clone(),
        }
    }

    pub fn layer_entity(&self, layer: &LayerElement) -> LayerEntity {
        LayerEntity {
            name: layer.name.clone(),
            title: layer.title.clone(),
            abstract_: layer.abstract_.clone(),
            is_container: layer.is_container(),
            dimensions: layer.dimensions.clone(),
            styles: layer.styles.clone(),
            metadata_urls: layer.metadata_urls.clone(),
            display_options_url: layer.display_options_url().map(str::to_string),
            endpoint_id: self.endpoint_id.clone(),
            service: self.service.clone(),
        }
    }

    fn label(&self, layer: &LayerElement, local_key: &str) -> String {
        let configured = layer.name.as_deref().and_then(|name| {
            self.endpoint
                .new_layer_names
                .get(name)
                .cloned()
                .or_else(|| self.endpoint.layer_keyword_data(name).get("title").map(str::to_string))
        });
        configured
            .or_else(|| layer.title.clone())
            .or_else(|| layer.name.clone())
            .unwrap_or_else(|| local_key.to_string())
    }

    fn parse_layer(
        &self,
        layer: &LayerElement,
        index: usize,
        parent_id: &NodeId,
        antecedent: &KeywordData,
        nodes: &mut BTreeMap<NodeId, Arc<Node>>,
    ) -> NodeId {
        let (tag, icon) = if layer.is_container() {
            (NodeTag::ContainerLayer, CONTAINER_LAYER_ICON)
        } else {
            (NodeTag::LeafLayer, LEAF_LAYER_ICON)
        };
        let mut local_key = layer
            .name
            .clone()
            .or_else(|| layer.title.clone())
            .unwrap_or_else(|| format!("untitled-{index}"));
        let mut id = NodeId::build(tag, &local_key, Some(parent_id));
        if nodes.contains_key(&id) {
            // Sibling layers sharing a title; disambiguate by position so ids stay deterministic.
            // A sibling may already be named like the positional key, so keep going until free.
            let base_key = local_key.clone();
            let mut attempt = 0usize;
            while nodes.contains_key(&id) {
                local_key = match attempt {
                    0 => format!("{base_key}-{index}"),
                    n => format!("{base_key}-{index}-{n}"),
                };
                attempt += 1;
                id = NodeId::build(tag, &local_key, Some(parent_id));
            }
            tracing::debug!("[LayerParser] duplicate layer id under {parent_id}, using {local_key}");
        }

        let keyword_data = self.resolve_keywords(layer, antecedent);
        let children: Vec<NodeId> = layer
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| self.parse_layer(child, i, &id, &keyword_data, nodes))
            .collect();

        let tree_info = TreeInfo::new(
            self.label(layer, &local_key),
            layer.abstract_.clone(),
            icon,
            !layer.is_container(),
        );
        let node = Node::new(
            id.clone(),
            Entity::Layer(self.layer_entity(layer)),
            Children::Populated(children),
            tree_info,
            keyword_data,
        );
        nodes.insert(id.clone(), Arc::new(node));
        id
    }
}
