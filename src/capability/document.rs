use roxmltree::{Document, Node as XmlNode, ParsingOptions};
use serde::Serialize;
use std::sync::Arc;

use crate::CatalogError;

/// `MetadataURL/@type` value marking a link to JSON display options.
pub const DISPLAY_OPTIONS_TYPE: &str = "display_options";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub name: String,
    pub units: Option<String>,
    pub default: Option<String>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Style {
    pub name: String,
    pub title: Option<String>,
    pub legend_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataUrl {
    pub kind: Option<String>,
    pub href: Option<String>,
}

/// Online resources advertised under `Capability/Request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceLinks {
    pub get_capabilities: Option<String>,
    pub get_feature_info: Option<String>,
    pub get_map: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerElement {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub dimensions: Vec<Dimension>,
    pub styles: Vec<Style>,
    pub metadata_urls: Vec<MetadataUrl>,
    pub children: Vec<LayerElement>,
}

impl LayerElement {
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn display_options_url(&self) -> Option<&str> {
        self.metadata_urls
            .iter()
            .find(|m| {
                m.kind
                    .as_deref()
                    .map(|k| k.eq_ignore_ascii_case(DISPLAY_OPTIONS_TYPE))
                    .unwrap_or(false)
            })
            .and_then(|m| m.href.as_deref())
    }

    fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(LayerElement::leaf_count).sum()
        }
    }
}

/// Parsed remote capability document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDocument {
    pub version: String,
    pub service: Arc<ServiceLinks>,
    pub layers: Vec<LayerElement>,
}

impl CapabilityDocument {
    /// Parse a WMS capabilities document (1.3.0 `WMS_Capabilities` or 1.1.x
    /// `WMT_MS_Capabilities`). Elements are matched by local name, so namespaced and bare
    /// documents are treated alike.
    pub fn parse(xml: &str) -> Result<CapabilityDocument, CatalogError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options)?;
        let root = doc.root_element();
        if !root.tag_name().name().ends_with("Capabilities") {
            return Err(CatalogError::Capability(format!(
                "unexpected root element <{}>",
                root.tag_name().name()
            )));
        }
        let version = root.attribute("version").unwrap_or_default().to_string();
        if version.is_empty() {
            tracing::warn!("[CapabilityDocument::parse] capabilities root carries no version");
        }
        let capability = child(root, "Capability")
            .ok_or_else(|| CatalogError::Capability("missing Capability element".to_string()))?;

        let request = child(capability, "Request");
        let link = |op: &str| request.and_then(|r| child(r, op)).and_then(get_href);
        let get_map = link("GetMap").ok_or_else(|| {
            CatalogError::Capability("missing GetMap online resource".to_string())
        })?;
        let service = Arc::new(ServiceLinks {
            get_capabilities: link("GetCapabilities"),
            get_feature_info: link("GetFeatureInfo"),
            get_map,
        });

        let layers = children(capability, "Layer")
            .map(|layer| parse_layer(layer, &[], &[]))
            .collect();

        Ok(CapabilityDocument {
            version,
            service,
            layers,
        })
    }

    /// The lone top-level layer, when the document wraps everything in one grouping container.
    pub fn single_container(&self) -> Option<&LayerElement> {
        match self.layers.as_slice() {
            [only] if only.is_container() => Some(only),
            _ => None,
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.layers.iter().map(LayerElement::leaf_count).sum()
    }
}

fn children<'a, 'input: 'a>(
    node: XmlNode<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = XmlNode<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input>(node: XmlNode<'a, 'input>, name: &str) -> Option<XmlNode<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn child_text(node: XmlNode<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `href` of an `OnlineResource`, accepting both `xlink:href` and a bare `href`.
fn href(node: XmlNode<'_, '_>) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == "href")
        .map(|a| a.value().trim().to_string())
        .filter(|h| !h.is_empty())
}

/// `DCPType/HTTP/Get/OnlineResource/@href` under a request operation element.
fn get_href(operation: XmlNode<'_, '_>) -> Option<String> {
    children(operation, "DCPType")
        .filter_map(|dcp| child(dcp, "HTTP"))
        .filter_map(|http| child(http, "Get"))
        .filter_map(|get| child(get, "OnlineResource"))
        .find_map(href)
}

fn split_values(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_dimensions(layer: XmlNode<'_, '_>) -> Vec<Dimension> {
    let mut dims: Vec<Dimension> = Vec::new();
    for dim in children(layer, "Dimension") {
        let Some(name) = dim.attribute("name") else {
            tracing::debug!("[CapabilityDocument::parse] skipping Dimension without a name");
            continue;
        };
        dims.push(Dimension {
            name: name.to_string(),
            units: dim.attribute("units").map(str::to_string),
            default: dim.attribute("default").map(str::to_string),
            values: split_values(dim.text()),
        });
    }
    // 1.1.x documents carry the values in a sibling Extent of the same name
    for extent in children(layer, "Extent") {
        let Some(name) = extent.attribute("name") else {
            continue;
        };
        let values = split_values(extent.text());
        let default = extent.attribute("default").map(str::to_string);
        match dims.iter_mut().find(|d| d.name == name) {
            Some(dim) => {
                dim.values = values;
                if default.is_some() {
                    dim.default = default;
                }
            }
            None => dims.push(Dimension {
                name: name.to_string(),
                units: None,
                default,
                values,
            }),
        }
    }
    dims
}

fn parse_styles(layer: XmlNode<'_, '_>) -> Vec<Style> {
    children(layer, "Style")
        .filter_map(|style| {
            let name = child_text(style, "Name")?;
            Some(Style {
                name,
                title: child_text(style, "Title"),
                legend_url: child(style, "LegendURL")
                    .and_then(|legend| child(legend, "OnlineResource"))
                    .and_then(href),
            })
        })
        .collect()
}

fn parse_layer(
    layer: XmlNode<'_, '_>,
    inherited_styles: &[Style],
    inherited_dims: &[Dimension],
) -> LayerElement {
    // Styles are inherited additively, dimensions are replaced by name.
    let mut styles = inherited_styles.to_vec();
    for style in parse_styles(layer) {
        match styles.iter_mut().find(|s| s.name == style.name) {
            Some(existing) => *existing = style,
            None => styles.push(style),
        }
    }
    let mut dimensions = inherited_dims.to_vec();
    for dim in parse_dimensions(layer) {
        match dimensions.iter_mut().find(|d| d.name == dim.name) {
            Some(existing) => *existing = dim,
            None => dimensions.push(dim),
        }
    }
    let metadata_urls = children(layer, "MetadataURL")
        .map(|m| MetadataUrl {
            kind: m.attribute("type").map(str::to_string),
            href: child(m, "OnlineResource").and_then(href),
        })
        .collect();
    let nested = children(layer, "Layer")
        .map(|sub| parse_layer(sub, &styles, &dimensions))
        .collect();

    LayerElement {
        name: child_text(layer, "Name"),
        title: child_text(layer, "Title"),
        abstract_: child_text(layer, "Abstract"),
        dimensions,
        styles,
        metadata_urls,
        children: nested,
    }
}
