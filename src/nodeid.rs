//! [crate::nodeid] contains [NodeId], the composite catalog identifier.
//!
//! A node id is a type tag, a local key, and optionally the id of its parent:
//!
//! ```text
//! leaf-layer:Temperature@endpoint:ep1@dataset:Collection1
//! └── tag ──┘└── key ──┘ └────────── parent id ─────────┘
//! ```
//!
//! Reading an id right-to-left yields the path from the root, so any node's ancestry can be
//! recovered from the string alone, without touching the catalog. Local keys are escaped so the
//! separator never appears inside one.
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::CatalogError;

/// Separates a node's own `tag:key` from its parent id.
pub const ID_SEPARATOR: char = '@';
/// Separates a node's tag from its local key.
pub const TAG_SEPARATOR: char = ':';
/// Identifier of the synthetic catalog root.
pub const ROOT_ID: &str = "root";

/// Type tag carried at the front of every [NodeId].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Root,
    Dataset,
    Endpoint,
    /// An endpoint added by a user within a session. Any id with one of these in its chain is
    /// session-only.
    UserEndpoint,
    ContainerLayer,
    LeafLayer,
}

impl NodeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeTag::Root => "root",
            NodeTag::Dataset => "dataset",
            NodeTag::Endpoint => "endpoint",
            NodeTag::UserEndpoint => "user-endpoint",
            NodeTag::ContainerLayer => "container-layer",
            NodeTag::LeafLayer => "leaf-layer",
        }
    }

    pub fn is_endpoint(&self) -> bool {
        matches!(self, NodeTag::Endpoint | NodeTag::UserEndpoint)
    }

    pub fn is_layer(&self) -> bool {
        matches!(self, NodeTag::ContainerLayer | NodeTag::LeafLayer)
    }
}

impl Display for NodeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeTag {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(NodeTag::Root),
            "dataset" => Ok(NodeTag::Dataset),
            "endpoint" => Ok(NodeTag::Endpoint),
            "user-endpoint" => Ok(NodeTag::UserEndpoint),
            "container-layer" => Ok(NodeTag::ContainerLayer),
            "leaf-layer" => Ok(NodeTag::LeafLayer),
            _ => Err(CatalogError::InvalidId(format!("unknown node tag '{s}'"))),
        }
    }
}

/// Opaque composite identifier. Doubles as the key of every catalog and session map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialOrd, Ord, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// The synthetic catalog root.
    pub fn root() -> NodeId {
        NodeId(ROOT_ID.to_string())
    }

    /// Build an id from a tag, an unescaped local key and an optional parent. The root is never
    /// recorded as a parent: top-level datasets have no chain.
    pub fn build(tag: NodeTag, local_key: &str, parent: Option<&NodeId>) -> NodeId {
        if tag == NodeTag::Root {
            return NodeId::root();
        }
        let own = format!("{}{}{}", tag.as_str(), TAG_SEPARATOR, escape_key(local_key));
        match parent.filter(|p| !p.is_root()) {
            Some(parent) => NodeId(format!("{own}{ID_SEPARATOR}{}", parent.0)),
            None => NodeId(own),
        }
    }

    /// Parse and validate an id string. Every segment of the chain must carry a known tag and a
    /// non-empty key.
    pub fn parse(s: &str) -> Result<NodeId, CatalogError> {
        if s == ROOT_ID {
            return Ok(NodeId::root());
        }
        if s.is_empty() {
            return Err(CatalogError::InvalidId("empty identifier".to_string()));
        }
        for segment in s.split(ID_SEPARATOR) {
            let Some((tag, key)) = segment.split_once(TAG_SEPARATOR) else {
                return Err(CatalogError::InvalidId(format!(
                    "segment '{segment}' of '{s}' has no tag"
                )));
            };
            let tag = NodeTag::from_str(tag)?;
            if tag == NodeTag::Root || key.is_empty() {
                return Err(CatalogError::InvalidId(format!(
                    "segment '{segment}' of '{s}' is not a valid node segment"
                )));
            }
        }
        Ok(NodeId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    fn own_segment(&self) -> &str {
        self.0
            .split_once(ID_SEPARATOR)
            .map(|(own, _)| own)
            .unwrap_or(&self.0)
    }

    pub fn tag(&self) -> NodeTag {
        if self.is_root() {
            return NodeTag::Root;
        }
        self.own_segment()
            .split_once(TAG_SEPARATOR)
            .and_then(|(tag, _)| NodeTag::from_str(tag).ok())
            .unwrap_or(NodeTag::Root)
    }

    /// The unescaped local key of this node.
    pub fn local_key(&self) -> String {
        if self.is_root() {
            return String::new();
        }
        self.own_segment()
            .split_once(TAG_SEPARATOR)
            .map(|(_, key)| unescape_key(key))
            .unwrap_or_default()
    }

    /// The parent id. Top-level nodes return the root; the root returns `None`.
    pub fn parent(&self) -> Option<NodeId> {
        if self.is_root() {
            return None;
        }
        Some(
            self.0
                .split_once(ID_SEPARATOR)
                .map(|(_, parent)| NodeId(parent.to_string()))
                .unwrap_or_else(NodeId::root),
        )
    }

    /// Ancestor ids ordered root-most first, derived from the string alone. The synthetic root is
    /// not part of any chain and is never returned.
    pub fn antecedents(&self, include_self: bool) -> Vec<NodeId> {
        if self.is_root() {
            return Vec::new();
        }
        let segments: Vec<&str> = self.0.split(ID_SEPARATOR).collect();
        let mut ids = Vec::with_capacity(segments.len());
        let skip = if include_self { 0 } else { 1 };
        for start in (skip..segments.len()).rev() {
            ids.push(NodeId(segments[start..].join(&ID_SEPARATOR.to_string())));
        }
        ids
    }

    /// Nearest endpoint (configured or user-added) in this id's chain, including itself.
    pub fn endpoint_ancestor(&self) -> Option<NodeId> {
        self.antecedents(true)
            .into_iter()
            .rev()
            .find(|id| id.tag().is_endpoint())
    }

    /// True when this id, or any id in its chain, only ever lives in a session overlay.
    pub fn is_session_only(&self) -> bool {
        self.0.split(ID_SEPARATOR).any(|segment| {
            segment
                .split_once(TAG_SEPARATOR)
                .map(|(tag, _)| tag == NodeTag::UserEndpoint.as_str())
                .unwrap_or(false)
        })
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::parse(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = CatalogError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        NodeId::parse(&s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> String {
        id.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Escape the separator (and the escape character itself) out of a local key.
pub fn escape_key(key: &str) -> String {
    key.replace('%', "%25").replace(ID_SEPARATOR, "%40")
}

pub fn unescape_key(key: &str) -> String {
    key.replace("%40", "@").replace("%25", "%")
}
