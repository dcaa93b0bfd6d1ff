use std::time::Duration;
use url::Url;

use crate::{config::FetchConfig, CatalogError};

/// Query parameters owned by the GetCapabilities rewrite. Existing values are replaced.
const CAPABILITIES_PARAMS: [&str; 3] = ["service", "request", "version"];

/// Transport used to retrieve capability documents. Implementations block; callers own any
/// request-level timeout beyond the transport's own.
pub trait CapabilityFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> Result<String, CatalogError>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<HttpFetcher, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(HttpFetcher { client })
    }
}

impl CapabilityFetcher for HttpFetcher {
    #[tracing::instrument(skip(self), fields(url = %url))]
    fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        tracing::debug!("[HttpFetcher::fetch] requesting capabilities");
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Fetch {
                url: url.to_string(),
                message: format!("server responded {status}"),
            });
        }
        Ok(response.text()?)
    }
}

/// Turn an endpoint base URL into its GetCapabilities request URL, keeping any unrelated query
/// parameters the endpoint was configured with.
pub fn capabilities_url(endpoint: &Url, version: &str) -> Url {
    let kept: Vec<(String, String)> = endpoint
        .query_pairs()
        .filter(|(k, _)| {
            !CAPABILITIES_PARAMS
                .iter()
                .any(|p| k.eq_ignore_ascii_case(p))
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (k, v) in kept.iter() {
            query.append_pair(k, v);
        }
        query
            .append_pair("SERVICE", "WMS")
            .append_pair("REQUEST", "GetCapabilities")
            .append_pair("VERSION", version);
    }
    url
}

/// Routes remote requests through a proxy as `<proxy>?url=<original>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRewrite {
    base: Url,
}

impl ProxyRewrite {
    pub fn new(base: Url) -> ProxyRewrite {
        ProxyRewrite { base }
    }

    pub fn apply(&self, url: &Url) -> Url {
        let mut proxied = self.base.clone();
        proxied.query_pairs_mut().append_pair("url", url.as_str());
        proxied
    }
}
