//! # layercat-core
//!
//! A hierarchical catalog of geospatial map layers: datasets group map-service endpoints, and
//! each endpoint's layers are discovered lazily from its WMS capabilities document.
//!
//! ## Overview
//!
//! The catalog is a tree with a synthetic root. Datasets and endpoints come from configuration
//! and are built once at startup into a static [`catalog::GlobalCatalog`]. Layers are only known
//! after fetching an endpoint's capabilities, so endpoints start **unpopulated** and are
//! populated on first use, whether that use is a tree expansion or a bookmarked layer id
//! arriving on a cold catalog.
//!
//! Every node carries an id that spells out its whole ancestry (`leaf-layer:sst@endpoint:ep1@dataset:ocean`),
//! so ancestors can be computed without walking the tree, and ids stay stable across restarts.
//!
//! ### Key Features
//!
//! - **Lazy population**: Endpoints are fetched and parsed on first lookup, once per endpoint
//! - **Keyword inheritance**: Key/value annotations flow from datasets down to individual layers
//! - **Session overlays**: Per-user additions shadow the shared tree without ever mutating it
//! - **Diagnostics**: Configuration defects are reported, never fatal
//!
//! ## Architecture
//!
//! - **[`nodeid`]**: Chained node identifiers (`NodeId`, `NodeTag`)
//! - **[`node`]**: Nodes, entities and tree display info
//! - **[`builder`]**: Configuration sections to static tree
//! - **[`capability`]**: Capabilities documents, transport and the URL-keyed document cache
//! - **[`layers`]**: Capabilities document to layer subtree
//! - **[`catalog`]**: Two-tier lookup and session mutation (`Catalog`, `SessionOverlay`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use layercat_core::{
//!     catalog::{Catalog, SessionOverlay},
//!     config::CatalogConfig,
//!     sections::TomlSections,
//! };
//!
//! fn main() -> Result<(), layercat_core::CatalogError> {
//!     let sections = TomlSections::load("catalog.toml")?;
//!     let catalog = Catalog::with_http(CatalogConfig::default(), &sections)?;
//!     let mut session = SessionOverlay::new();
//!
//!     for diagnostic in catalog.diagnostics() {
//!         eprintln!("warning: {diagnostic}");
//!     }
//!
//!     // A bookmarked layer resolves even on a cold catalog: its endpoint is populated first.
//!     if let Some(layer) = catalog.lookup("leaf-layer:sst@endpoint:ep1@dataset:ocean", &mut session)? {
//!         println!("{}", layer.tree_info.label);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions
//!
//! Every request carries a [`catalog::SessionOverlay`]. Lookups consult it first; nodes added to
//! it (for example a user-supplied endpoint via [`catalog::Catalog::add_user_endpoint`]) are
//! invisible to every other session. With `shared_endpoint_data = false`, each session also
//! populates its own copy of every endpoint it opens.

pub mod builder;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod keywords;
pub mod layers;
pub mod node;
pub mod nodeid;
pub mod sections;
#[cfg(test)]
mod tests;

pub use error::*;
