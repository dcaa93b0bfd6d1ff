//! Static catalog builder: configuration sections in, [GlobalCatalog] out.
//!
//! The builder walks the page section's dataset keys depth-first, creating one node per
//! (dataset or endpoint, parent) pair. Endpoints are created unpopulated; their layers are only
//! ever known after a remote fetch. Every defect is non-fatal: it is logged, recorded as a
//! [ConfigDiagnostic], and the affected reference is skipped.
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, sync::Arc};
use url::Url;

use crate::{
    catalog::GlobalCatalog,
    diagnostic::ConfigDiagnostic,
    keywords::KeywordData,
    node::{
        Children, DatasetEntity, EndpointEntity, Entity, LayerMatcher, Node, TreeInfo,
        DATASET_ICON, ENDPOINT_ICON,
    },
    nodeid::{NodeId, NodeTag},
    sections::{Section, SectionSource},
};

/// Fields copied from a keyword-data section into an entity that leaves them undefined.
pub const KEYWORD_ENTITY_FIELDS: [&str; 5] = ["title", "abstract", "name", "metadatalink", "layerset"];

/// One `newlayernames` line: `<layer name>:<display name>`.
static LAYER_NAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:\s][^:]*?)\s*:\s*(\S.*?)$").expect("layer name line pattern is valid")
});

/// Keyword data of a node plus the whitelisted entity fallbacks it provides.
struct ResolvedKeywords {
    data: KeywordData,
    fallback: BTreeMap<&'static str, String>,
}

impl ResolvedKeywords {
    fn none() -> ResolvedKeywords {
        ResolvedKeywords {
            data: KeywordData::default(),
            fallback: BTreeMap::new(),
        }
    }

    /// Entity value first, keyword-data fallback second.
    fn field(&self, section: &Section, field: &'static str) -> Option<String> {
        section
            .get(field)
            .map(str::to_string)
            .or_else(|| self.fallback.get(field).cloned())
    }
}

pub struct CatalogBuilder<'a, S: SectionSource + ?Sized> {
    sections: &'a S,
    nodes: BTreeMap<NodeId, Arc<Node>>,
    diagnostics: Vec<ConfigDiagnostic>,
}

impl<'a, S: SectionSource + ?Sized> CatalogBuilder<'a, S> {
    pub fn new(sections: &'a S) -> CatalogBuilder<'a, S> {
        CatalogBuilder {
            sections,
            nodes: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Build the global catalog rooted at the datasets listed in `page_section`.
    #[tracing::instrument(skip(self))]
    pub fn build(mut self, page_section: &str) -> GlobalCatalog {
        let mut top = Vec::new();
        match self.sections.section(page_section) {
            Some(page) => {
                let mut chain = Vec::new();
                for key in page.list("keys") {
                    if let Some(id) = self.build_dataset(&key, None, &mut chain) {
                        push_unique(&mut top, id);
                    }
                }
            }
            None => self.missing(page_section, "catalog"),
        }
        self.insert(Node::root(top));
        tracing::info!(
            "[CatalogBuilder::build] built {} nodes with {} diagnostics",
            self.nodes.len(),
            self.diagnostics.len()
        );
        GlobalCatalog::new(self.nodes, self.diagnostics)
    }

    fn insert(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), Arc::new(node));
    }

    fn report(&mut self, diagnostic: ConfigDiagnostic) {
        tracing::warn!("[CatalogBuilder] {diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn missing(&mut self, section: &str, referenced_by: &str) {
        self.report(ConfigDiagnostic::MissingSection {
            section: section.to_string(),
            referenced_by: referenced_by.to_string(),
        });
    }

    fn build_dataset(
        &mut self,
        key: &str,
        parent: Option<&NodeId>,
        chain: &mut Vec<String>,
    ) -> Option<NodeId> {
        let section_name = format!("dataset:{key}");
        let referenced_by = parent.map(NodeId::to_string).unwrap_or_else(|| "page".to_string());
        let Some(section) = self.sections.section(&section_name) else {
            self.missing(&section_name, &referenced_by);
            return None;
        };
        let id = NodeId::build(NodeTag::Dataset, key, parent);
        let keywords = self.resolve_keywords(&section, &id);
        let entity = DatasetEntity {
            key: key.to_string(),
            title: keywords.field(&section, "title"),
            abstract_: keywords.field(&section, "abstract"),
            metadata_link: keywords.field(&section, "metadatalink"),
            keyword_data_key: section.get("keyworddata").map(str::to_string),
        };

        chain.push(key.to_string());
        let mut children = Vec::new();
        for child in section.list("datasets") {
            if chain.contains(&child) {
                self.report(ConfigDiagnostic::CircularReference {
                    dataset: child.clone(),
                    chain: chain.clone(),
                });
                continue;
            }
            if let Some(child_id) = self.build_dataset(&child, Some(&id), chain) {
                push_unique(&mut children, child_id);
            }
        }
        for endpoint in section.list("endpoints") {
            if let Some(endpoint_id) = self.build_endpoint(&endpoint, &id) {
                push_unique(&mut children, endpoint_id);
            }
        }
        chain.pop();

        let tree_info = TreeInfo::new(
            entity.title.clone().unwrap_or_else(|| key.to_string()),
            entity.abstract_.clone(),
            DATASET_ICON,
            false,
        );
        self.insert(Node::new(
            id.clone(),
            Entity::Dataset(entity),
            Children::Populated(children),
            tree_info,
            keywords.data,
        ));
        Some(id)
    }

    fn build_endpoint(&mut self, key: &str, parent: &NodeId) -> Option<NodeId> {
        let section_name = format!("endpoint:{key}");
        let Some(section) = self.sections.section(&section_name) else {
            self.missing(&section_name, parent.as_str());
            return None;
        };
        let id = NodeId::build(NodeTag::Endpoint, key, Some(parent));
        let keywords = self.resolve_keywords(&section, &id);

        let wms_url = self.parse_url(key, &section, "wmsurl");
        let wcs_url = self.parse_url(key, &section, "wcsurl");
        if wms_url.is_none() && section.get("wmsurl").is_none() {
            self.report(ConfigDiagnostic::MissingServiceUrl {
                endpoint: key.to_string(),
            });
        }
        let layer_set = keywords.field(&section, "layerset");
        let layer_data = match &layer_set {
            Some(set) => self.resolve_layer_set(set, key),
            None => Vec::new(),
        };
        let new_layer_names = self.parse_new_layer_names(key, section.get("newlayernames"));

        let entity = EndpointEntity {
            key: key.to_string(),
            name: keywords.field(&section, "name"),
            title: keywords.field(&section, "title"),
            abstract_: keywords.field(&section, "abstract"),
            metadata_link: keywords.field(&section, "metadatalink"),
            wms_url,
            wcs_url,
            keyword_data_key: section.get("keyworddata").map(str::to_string),
            layer_set,
            layer_data,
            new_layer_names,
            user_added: false,
        };
        let tree_info = TreeInfo::new(
            entity.display_label(),
            entity.abstract_.clone(),
            ENDPOINT_ICON,
            false,
        );
        self.insert(Node::new(
            id.clone(),
            Entity::Endpoint(entity),
            Children::Unpopulated,
            tree_info,
            keywords.data,
        ));
        Some(id)
    }

    fn resolve_keywords(&mut self, section: &Section, owner: &NodeId) -> ResolvedKeywords {
        let Some(kw_key) = section.get("keyworddata") else {
            return ResolvedKeywords::none();
        };
        let kw_section_name = format!("keyworddata:{kw_key}");
        let Some(kw_section) = self.sections.section(&kw_section_name) else {
            self.missing(&kw_section_name, owner.as_str());
            return ResolvedKeywords::none();
        };
        let data = KeywordData::from_iter(kw_section.iter());
        let fallback = KEYWORD_ENTITY_FIELDS
            .iter()
            .filter_map(|field| kw_section.get(field).map(|v| (*field, v.to_string())))
            .collect();
        ResolvedKeywords { data, fallback }
    }

    fn parse_url(&mut self, endpoint: &str, section: &Section, field: &str) -> Option<Url> {
        let raw = section.get(field)?;
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                self.report(ConfigDiagnostic::InvalidUrl {
                    endpoint: endpoint.to_string(),
                    field: field.to_string(),
                    message: e.to_string(),
                });
                None
            }
        }
    }

    fn resolve_layer_set(&mut self, set_key: &str, endpoint_key: &str) -> Vec<LayerMatcher> {
        let set_section_name = format!("layerset:{set_key}");
        let Some(set_section) = self.sections.section(&set_section_name) else {
            self.missing(&set_section_name, &format!("endpoint:{endpoint_key}"));
            return Vec::new();
        };
        let mut matchers = Vec::new();
        for layer_key in set_section.list("layers") {
            let layer_section_name = format!("layer:{layer_key}");
            let Some(layer_section) = self.sections.section(&layer_section_name) else {
                self.missing(&layer_section_name, &set_section_name);
                continue;
            };
            let pattern = layer_section
                .get("name")
                .map(str::to_string)
                .unwrap_or_else(|| regex::escape(&layer_key));
            let overrides = KeywordData::from_iter(layer_section.iter().filter(|(k, _)| *k != "name"));
            match LayerMatcher::new(&layer_key, &pattern, endpoint_key, overrides) {
                Ok(matcher) => matchers.push(matcher),
                Err(e) => self.report(ConfigDiagnostic::InvalidLayerPattern {
                    endpoint: endpoint_key.to_string(),
                    layer: layer_key.clone(),
                    message: e.to_string(),
                }),
            }
        }
        matchers
    }

    fn parse_new_layer_names(&mut self, endpoint: &str, raw: Option<&str>) -> BTreeMap<String, String> {
        let mut names = BTreeMap::new();
        for line in raw.unwrap_or_default().lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }
            match LAYER_NAME_LINE.captures(line) {
                Some(caps) => {
                    names.insert(caps[1].to_string(), caps[2].to_string());
                }
                None => self.report(ConfigDiagnostic::MalformedLayerName {
                    endpoint: endpoint.to_string(),
                    line: line.to_string(),
                }),
            }
        }
        names
    }
}

fn push_unique(ids: &mut Vec<NodeId>, id: NodeId) {
    if ids.contains(&id) {
        tracing::debug!("[CatalogBuilder] {id} listed twice under the same parent, keeping the first");
        return;
    }
    ids.push(id);
}

/// Build the global catalog from `sections`, starting at `page_section`.
pub fn build<S: SectionSource + ?Sized>(sections: &S, page_section: &str) -> GlobalCatalog {
    CatalogBuilder::new(sections).build(page_section)
}
