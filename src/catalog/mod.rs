//! The catalog tree and its lookups.
//!
//! - [`GlobalCatalog`] - Static root/dataset/endpoint tree built once from configuration
//! - [`SessionOverlay`] - Per-session nodes that shadow the global tree
//! - [`Catalog`] - Two-tier lookup, lazy endpoint population, session mutation
//!
//! Layer subtrees of shared endpoints are populated on first use and kept in a cache next to the
//! static tree rather than inside it, so the tree built at startup is never mutated.
mod base;
mod global;
mod session;
mod subtrees;


pub use base::{parse_endpoint_layers, Catalog};
pub use global::GlobalCatalog;
pub use session::SessionOverlay;
pub use subtrees::PopulatedEndpoint;
