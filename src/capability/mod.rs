//! Remote capability documents: reading them, fetching them, caching them.
//!
//! ## Key Components
//!
//! - [`CapabilityDocument`] - Typed view of a WMS capabilities document (service links plus the
//!   nested layer tree)
//! - [`CapabilityFetcher`] - Transport seam; [`HttpFetcher`] is the blocking HTTP implementation
//! - [`CapabilityCache`] - URL-keyed document cache with forced refresh, TTL and size eviction
//!
//! The cache key is the final request URL: the endpoint URL rewritten into a GetCapabilities
//! request, then passed through the optional [`ProxyRewrite`]. Lookups and fetches therefore
//! always agree on what a URL means.

pub mod cache;
pub mod document;
pub mod fetcher;

pub use cache::{CacheStats, CapabilityCache};
pub use document::{CapabilityDocument, Dimension, LayerElement, MetadataUrl, ServiceLinks, Style};
pub use fetcher::{capabilities_url, CapabilityFetcher, HttpFetcher, ProxyRewrite};
