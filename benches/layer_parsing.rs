//! Performance benchmarks for endpoint population
//!
//! These benchmarks measure, on a synthetic capabilities document of a large server:
//! - XML parsing into a capability document
//! - Layer subtree construction with keyword overrides
//! - A cold bookmarked-layer lookup through the whole catalog
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use layercat_core::{
    capability::{CapabilityDocument, CapabilityFetcher},
    catalog::{parse_endpoint_layers, Catalog, SessionOverlay},
    config::CatalogConfig,
    keywords::KeywordData,
    nodeid::NodeId,
    sections::MemorySections,
    CatalogError,
};
use std::sync::Arc;
use url::Url;

const GROUPS: usize = 20;
const LAYERS_PER_GROUP: usize = 50;

/// A server with one grouping layer holding GROUPS containers of LAYERS_PER_GROUP leaves each.
fn large_capabilities() -> String {
    let mut layers = String::new();
    for g in 0..GROUPS {
        layers.push_str(&format!("<Layer><Title>Group {g}</Title>"));
        for l in 0..LAYERS_PER_GROUP {
            layers.push_str(&format!(
                r#"<Layer queryable="1"><Name>g{g}_var{l}</Name><Title>Variable {l}</Title>
                   <Style><Name>boxfill</Name></Style>
                   <Dimension name="time" units="ISO8601">2020-01-01,2020-01-02</Dimension></Layer>"#
            ));
        }
        layers.push_str("</Layer>");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms"
    xmlns:xlink="http://www.w3.org/1999/xlink">
  <Capability>
    <Request><GetMap><DCPType><HTTP><Get>
      <OnlineResource xlink:href="http://bench.test/wms?"/>
    </Get></HTTP></DCPType></GetMap></Request>
    <Layer><Name>all</Name><Title>All</Title>{layers}</Layer>
  </Capability>
</WMS_Capabilities>"#
    )
}

fn sections() -> MemorySections {
    MemorySections::new()
        .with("page", [("keys", "bench")])
        .with("dataset:bench", [("endpoints", "big"), ("keyworddata", "kw")])
        .with("keyworddata:kw", [("caption_style", "model")])
        .with("endpoint:big", [("wmsurl", "http://bench.test/wms"), ("layerset", "ls")])
        .with("layerset:ls", [("layers", "vars")])
        .with("layer:vars", [("name", "g1[0-9]_var.*"), ("units", "K")])
}

struct StaticFetcher(String);

impl CapabilityFetcher for StaticFetcher {
    fn fetch(&self, _url: &Url) -> Result<String, CatalogError> {
        Ok(self.0.clone())
    }
}

fn bench_parse_document(c: &mut Criterion) {
    let xml = large_capabilities();
    c.bench_function("parse_capabilities_document", |b| {
        b.iter(|| CapabilityDocument::parse(black_box(&xml)).unwrap())
    });
}

fn bench_build_layer_subtree(c: &mut Criterion) {
    let document = CapabilityDocument::parse(&large_capabilities()).unwrap();
    let catalog = Catalog::from_sections(
        CatalogConfig::default(),
        &sections(),
        Arc::new(StaticFetcher(String::new())),
    );
    let endpoint_id = NodeId::parse("endpoint:big@dataset:bench").unwrap();
    let endpoint = catalog.global().get(&endpoint_id).unwrap().clone();
    let entity = endpoint.entity.as_endpoint().unwrap();
    let antecedent = KeywordData::from_iter([("caption_style", "model")]);

    c.bench_function("build_layer_subtree", |b| {
        b.iter(|| parse_endpoint_layers(black_box(&document), entity, &endpoint_id, &antecedent))
    });
}

fn bench_cold_lookup(c: &mut Criterion) {
    let fetcher = Arc::new(StaticFetcher(large_capabilities()));
    let bookmark = "leaf-layer:g19_var49@container-layer:Group 19@endpoint:big@dataset:bench";

    c.bench_function("cold_bookmark_lookup", |b| {
        b.iter(|| {
            let catalog = Catalog::from_sections(CatalogConfig::default(), &sections(), fetcher.clone());
            let mut session = SessionOverlay::new();
            catalog.lookup(black_box(bookmark), &mut session).unwrap().unwrap()
        })
    });
}

// Benchmark group configuration
criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets =
        bench_parse_document,
        bench_build_layer_subtree,
        bench_cold_lookup
}

criterion_main!(benches);
