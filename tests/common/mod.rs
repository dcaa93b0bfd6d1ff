//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use layercat_core::{capability::CapabilityFetcher, CatalogError};
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::TempDir;
use url::Url;

pub const OCEAN_WMS: &str = "http://ocean.test/wms";
pub const ATMOS_WMS: &str = "http://atmos.test/cgi/wms";

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture exists")
}

/// Copy the catalog fixture into `temp_dir`, optionally with a runtime config next to it.
///
/// Returns `(catalog path, config path)`.
#[allow(dead_code)]
pub fn write_catalog(temp_dir: &TempDir, config: Option<&str>) -> (PathBuf, Option<PathBuf>) {
    let catalog_path = temp_dir.path().join("catalog.toml");
    fs::write(&catalog_path, fixture("catalog.toml")).expect("write catalog");
    let config_path = config.map(|content| {
        let path = temp_dir.path().join("layercat.toml");
        fs::write(&path, content).expect("write config");
        path
    });
    (catalog_path, config_path)
}

/// Serves the capability fixtures by host and path, counting requests per host.
#[derive(Default)]
pub struct FixtureFetcher {
    bodies: Mutex<BTreeMap<String, String>>,
    calls: Mutex<BTreeMap<String, usize>>,
    total: AtomicUsize,
}

#[allow(dead_code)]
impl FixtureFetcher {
    /// The ocean (1.3.0) and atmosphere (1.1.1) servers of the catalog fixture.
    pub fn standard() -> FixtureFetcher {
        let fetcher = FixtureFetcher::default();
        fetcher.serve(OCEAN_WMS, &fixture("ocean_wms130.xml"));
        fetcher.serve(ATMOS_WMS, &fixture("atmos_wms111.xml"));
        fetcher
    }

    pub fn serve(&self, url: &str, body: &str) {
        let url = Url::parse(url).expect("fixture url");
        self.bodies.lock().insert(key(&url), body.to_string());
    }

    pub fn take_down(&self, url: &str) {
        let url = Url::parse(url).expect("fixture url");
        self.bodies.lock().remove(&key(&url));
    }

    pub fn calls_to(&self, host: &str) -> usize {
        self.calls.lock().get(host).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

fn key(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

impl CapabilityFetcher for FixtureFetcher {
    fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        let host = url.host_str().unwrap_or_default().to_string();
        *self.calls.lock().entry(host).or_default() += 1;
        self.bodies
            .lock()
            .get(&key(url))
            .cloned()
            .ok_or_else(|| CatalogError::Fetch {
                url: url.to_string(),
                message: "host unreachable".to_string(),
            })
    }
}
