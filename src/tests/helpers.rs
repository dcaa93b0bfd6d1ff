//! Shared test utilities for catalog testing

use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};
use url::Url;

use crate::{
    capability::CapabilityFetcher, node::EndpointEntity, sections::MemorySections, CatalogError,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Requests are matched on scheme, host and path; the query string the cache appends is ignored.
fn fetch_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_query(None);
    key.set_fragment(None);
    key.to_string()
}

/// In-memory fetcher serving fixed bodies and counting every request.
#[derive(Default)]
pub struct MapFetcher {
    bodies: Mutex<BTreeMap<String, String>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MapFetcher {
    pub fn new<'a, I>(bodies: I) -> MapFetcher
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fetcher = MapFetcher::default();
        for (url, body) in bodies {
            fetcher.set_body(url, body);
        }
        fetcher
    }

    pub fn single(url: &str, body: &str) -> MapFetcher {
        MapFetcher::new([(url, body)])
    }

    /// Sleep this long inside every fetch, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> MapFetcher {
        self.delay = Some(delay);
        self
    }

    pub fn set_body(&self, url: &str, body: &str) {
        let url = Url::parse(url).expect("test url");
        self.bodies.lock().insert(fetch_key(&url), body.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl CapabilityFetcher for MapFetcher {
    fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(url.to_string());
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.bodies
            .lock()
            .get(&fetch_key(url))
            .cloned()
            .ok_or_else(|| CatalogError::Fetch {
                url: url.to_string(),
                message: "no such test endpoint".to_string(),
            })
    }
}

/// Fetcher whose every request fails like an unreachable server.
#[derive(Default)]
pub struct FailingFetcher {
    calls: AtomicUsize,
}

impl FailingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CapabilityFetcher for FailingFetcher {
    fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CatalogError::Fetch {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// A WMS 1.3.0 capabilities document whose Capability element holds `layers_xml`.
pub fn capabilities_xml(layers_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service><Name>WMS</Name><Title>Test</Title></Service>
  <Capability>
    <Request>
      <GetMap><DCPType><HTTP><Get>
        <OnlineResource xlink:href="http://test/wms?"/>
      </Get></HTTP></DCPType></GetMap>
    </Request>
    {layers_xml}
  </Capability>
</WMS_Capabilities>"#
    )
}

/// Capabilities with one named leaf layer at the top level.
pub fn single_leaf_capabilities(name: &str) -> String {
    capabilities_xml(&format!("<Layer><Name>{name}</Name><Title>{name}</Title></Layer>"))
}

/// Page -> Collection1 -> ep1, with ep1 served from `wms_url`.
pub fn end_to_end_sections(wms_url: &str) -> MemorySections {
    MemorySections::new()
        .with("page", [("keys", "Collection1")])
        .with("dataset:Collection1", [("title", "C1"), ("endpoints", "ep1")])
        .with("endpoint:ep1", [("wmsurl", wms_url), ("name", "EP1")])
}

pub fn endpoint_entity(key: &str, wms_url: &str) -> EndpointEntity {
    EndpointEntity {
        key: key.to_string(),
        wms_url: Some(Url::parse(wms_url).expect("test url")),
        ..Default::default()
    }
}
