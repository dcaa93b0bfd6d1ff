//! Integration tests: catalog file on disk, fixture capability documents, full lookups.

mod common;

use common::{write_catalog, FixtureFetcher};
use layercat_core::{
    catalog::{Catalog, SessionOverlay},
    config::CatalogConfig,
    nodeid::NodeId,
    sections::TomlSections,
    CatalogError,
};
use std::sync::Arc;
use tempfile::TempDir;
use test_log::test;

const OCEAN_EP: &str = "endpoint:ocean_model@dataset:ocean";
const ATMOS_EP: &str = "endpoint:atmos@dataset:atmosphere@dataset:climate";

fn open_catalog(config: Option<&str>) -> (Catalog, Arc<FixtureFetcher>) {
    let temp_dir = TempDir::new().unwrap();
    let (catalog_path, config_path) = write_catalog(&temp_dir, config);
    let sections = TomlSections::load(&catalog_path).unwrap();
    let config = match config_path {
        Some(path) => CatalogConfig::load(path).unwrap(),
        None => CatalogConfig::default(),
    };
    let fetcher = Arc::new(FixtureFetcher::standard());
    let catalog = Catalog::from_sections(config, &sections, fetcher.clone());
    (catalog, fetcher)
}

fn id(s: &str) -> NodeId {
    NodeId::parse(s).unwrap()
}

fn child_ids(catalog: &Catalog, node_id: &str, session: &mut SessionOverlay) -> Vec<String> {
    let node = catalog.lookup(node_id, session).unwrap().unwrap();
    node.children.ids().iter().map(NodeId::to_string).collect()
}

#[test]
fn static_tree_matches_catalog_file() {
    let (catalog, fetcher) = open_catalog(None);
    let mut session = SessionOverlay::new();

    assert!(catalog.diagnostics().is_empty(), "{:?}", catalog.diagnostics());
    assert_eq!(
        child_ids(&catalog, "root", &mut session),
        vec!["dataset:ocean", "dataset:climate"]
    );
    assert_eq!(
        child_ids(&catalog, "dataset:climate", &mut session),
        vec!["dataset:atmosphere@dataset:climate"]
    );
    assert_eq!(
        child_ids(&catalog, "dataset:atmosphere@dataset:climate", &mut session),
        vec![ATMOS_EP]
    );

    let ocean = catalog.lookup("dataset:ocean", &mut session).unwrap().unwrap();
    assert_eq!(ocean.tree_info.label, "Ocean");
    assert_eq!(ocean.tree_info.tooltip.as_deref(), Some("Ocean reanalysis products"));
    assert_eq!(ocean.keyword_data.get("caption_style"), Some("reanalysis"));
    assert_eq!(fetcher.total(), 0);
    assert_eq!(catalog.global().endpoints().count(), 2);
}

#[test]
fn wms130_endpoint_elides_its_grouping_layer() {
    let (catalog, fetcher) = open_catalog(None);
    let mut session = SessionOverlay::new();

    assert_eq!(
        child_ids(&catalog, OCEAN_EP, &mut session),
        vec![
            format!("leaf-layer:sst@{OCEAN_EP}"),
            format!("container-layer:Currents@{OCEAN_EP}"),
            format!("leaf-layer:zos@{OCEAN_EP}"),
        ]
    );
    let endpoint = catalog.get_node(&id(OCEAN_EP), &mut session).unwrap().unwrap();
    let elided = endpoint.elided.as_ref().unwrap();
    assert_eq!(elided.name.as_deref(), Some("ocean_model"));
    assert_eq!(
        elided.abstract_.as_deref(),
        Some("Daily means from the ocean reanalysis")
    );
    assert_eq!(elided.service.get_map, "http://ocean.test/wms?");

    let sst = catalog
        .lookup(&format!("leaf-layer:sst@{OCEAN_EP}"), &mut session)
        .unwrap()
        .unwrap();
    assert_eq!(sst.tree_info.label, "Sea surface temperature");
    assert_eq!(sst.keyword_data.get("units"), Some("degC"));
    assert_eq!(sst.keyword_data.get("palette"), Some("rainbow"));
    assert_eq!(sst.keyword_data.get("caption_style"), Some("reanalysis"));
    let layer = sst.entity.as_layer().unwrap();
    assert_eq!(
        layer.display_options_url.as_deref(),
        Some("http://ocean.test/display/sst.json")
    );
    assert_eq!(layer.styles.len(), 1);
    assert_eq!(layer.dimensions[0].values.len(), 3);
    assert_eq!(
        layer.dimensions[0].default.as_deref(),
        Some("2020-01-03T00:00:00Z")
    );

    let vo = catalog
        .find_layer(&id(OCEAN_EP), "vo", &mut session)
        .unwrap()
        .unwrap();
    let names: Vec<&str> = vo
        .entity
        .as_layer()
        .unwrap()
        .dimensions
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["time", "elevation"]);
    let uo = catalog
        .find_layer(&id(OCEAN_EP), "uo", &mut session)
        .unwrap()
        .unwrap();
    assert_eq!(uo.entity.as_layer().unwrap().styles.len(), 2);

    let zos = catalog
        .lookup(&format!("leaf-layer:zos@{OCEAN_EP}"), &mut session)
        .unwrap()
        .unwrap();
    assert_eq!(zos.tree_info.label, "Sea level");
    assert_eq!(zos.keyword_data.get("units"), Some("K"));
    assert_eq!(fetcher.calls_to("ocean.test"), 1);
    assert_eq!(fetcher.calls_to("atmos.test"), 0);
}

#[test]
fn wms111_endpoint_keeps_its_containers() {
    let (catalog, fetcher) = open_catalog(None);
    let mut session = SessionOverlay::new();

    assert_eq!(
        child_ids(&catalog, ATMOS_EP, &mut session),
        vec![
            format!("container-layer:Near-surface fields@{ATMOS_EP}"),
            format!("container-layer:Upper air@{ATMOS_EP}"),
        ]
    );
    let endpoint = catalog.get_node(&id(ATMOS_EP), &mut session).unwrap().unwrap();
    assert!(endpoint.elided.is_none());
    assert_eq!(endpoint.tree_info.label, "Atmosphere server");

    let tas = catalog
        .find_layer(&id(ATMOS_EP), "tas", &mut session)
        .unwrap()
        .unwrap();
    let time = &tas.entity.as_layer().unwrap().dimensions[0];
    assert_eq!(time.units.as_deref(), Some("ISO8601"));
    assert_eq!(time.default.as_deref(), Some("2021-06-02"));
    assert_eq!(time.values, vec!["2021-06-01", "2021-06-02"]);
    assert_eq!(
        Catalog::find_antecedent_ids(&tas.id, false),
        vec![
            id("dataset:climate"),
            id("dataset:atmosphere@dataset:climate"),
            id(ATMOS_EP),
            id(&format!("container-layer:Near-surface fields@{ATMOS_EP}")),
        ]
    );
    assert_eq!(fetcher.calls_to("atmos.test"), 1);
}

#[test]
fn unreachable_endpoint_does_not_affect_others() {
    let (catalog, fetcher) = open_catalog(None);
    fetcher.take_down(common::ATMOS_WMS);
    let mut session = SessionOverlay::new();

    let err = catalog.get_node(&id(ATMOS_EP), &mut session).unwrap_err();
    assert!(matches!(err, CatalogError::Fetch { .. }));
    assert!(err.is_remote());
    assert_eq!(err.status_code().as_u16(), 503);

    assert!(catalog.get_node(&id(OCEAN_EP), &mut session).unwrap().is_some());
    let climate = catalog.lookup("dataset:climate", &mut session).unwrap().unwrap();
    assert_eq!(climate.children.ids().len(), 1);
    assert!(catalog.global().get(&id(ATMOS_EP)).unwrap().needs_population());
}

#[test]
fn runtime_config_is_read_from_toml() {
    let (catalog, fetcher) = open_catalog(Some(
        r#"
shared_endpoint_data = false

[cache]
max_entries = 1
"#,
    ));
    assert!(!catalog.config().shared_endpoint_data);
    assert_eq!(catalog.config().wms_version, "1.3.0");

    let mut session = SessionOverlay::new();
    catalog.get_node(&id(OCEAN_EP), &mut session).unwrap();
    catalog.get_node(&id(ATMOS_EP), &mut session).unwrap();
    assert_eq!(catalog.cache_stats().entries, 1);
    assert_eq!(catalog.populated_endpoints(), 0);

    // the ocean document was evicted, so a second session refetches it
    let mut other = SessionOverlay::new();
    catalog.get_node(&id(OCEAN_EP), &mut other).unwrap();
    assert_eq!(fetcher.calls_to("ocean.test"), 2);
}

#[test]
fn http_catalog_builds_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let (catalog_path, _) = write_catalog(&temp_dir, None);
    let sections = TomlSections::load(catalog_path).unwrap();
    let catalog = Catalog::with_http(CatalogConfig::default(), &sections).unwrap();
    assert_eq!(catalog.global().len(), 6);
}
