use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, time::Duration};
use url::Url;

use crate::{capability::ProxyRewrite, error::CatalogError};

pub const DEFAULT_PAGE_SECTION: &str = "page";
pub const DEFAULT_WMS_VERSION: &str = "1.3.0";

/// Runtime settings of a [crate::catalog::Catalog].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Section whose `keys` list the top-level datasets.
    pub page_section: String,
    /// When false, every session populates its own private copy of each endpoint it opens.
    pub shared_endpoint_data: bool,
    pub wms_version: String,
    pub proxy: Option<Url>,
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            page_section: DEFAULT_PAGE_SECTION.to_string(),
            shared_endpoint_data: true,
            wms_version: DEFAULT_WMS_VERSION.to_string(),
            proxy: None,
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(content: &str) -> Result<CatalogConfig, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<CatalogConfig, CatalogError> {
        tracing::debug!("Reading catalog config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        CatalogConfig::from_toml_str(&content)
    }

    pub fn proxy_rewrite(&self) -> Option<ProxyRewrite> {
        self.proxy.clone().map(ProxyRewrite::new)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Documents older than this are refetched. `None` keeps them until evicted.
    pub ttl_secs: Option<u64>,
    /// Oldest documents are evicted beyond this many entries.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: None,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: 30,
            user_agent: format!("layercat/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
