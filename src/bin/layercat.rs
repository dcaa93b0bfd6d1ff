//! layercat CLI tool
//!
//! Command-line interface for inspecting a layer catalog built from a TOML catalog file.
//!
//! ## Commands
//!
//! - `tree <catalog.toml>`: Print the catalog tree, optionally fetching every endpoint
//! - `node <catalog.toml> <id>`: Print one node, its antecedents and merged keyword data as JSON

use clap::{Parser, Subcommand};
use layercat_core::{
    catalog::{Catalog, SessionOverlay},
    config::CatalogConfig,
    node::Node,
    sections::TomlSections,
    CatalogError,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "layercat")]
#[command(author, version, about = "Inspect a catalog of map-service layers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the catalog tree and any configuration diagnostics
    Tree {
        /// Path to the catalog sections file
        catalog: PathBuf,

        /// Runtime configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fetch every endpoint and print its layers
        #[arg(short, long)]
        expand: bool,
    },

    /// Resolve one node id and print it as JSON
    Node {
        /// Path to the catalog sections file
        catalog: PathBuf,

        /// Node id, e.g. leaf-layer:sst@endpoint:ep1@dataset:ocean
        id: String,

        /// Runtime configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn open(catalog: &Path, config: Option<&PathBuf>) -> Result<Catalog, CatalogError> {
    let config = match config {
        Some(path) => CatalogConfig::load(path)?,
        None => CatalogConfig::default(),
    };
    let sections = TomlSections::load(catalog)?;
    Catalog::with_http(config, &sections)
}

fn print_tree(
    catalog: &Catalog,
    session: &mut SessionOverlay,
    node: &Node,
    depth: usize,
    expand: bool,
) -> Result<(), CatalogError> {
    let indent = "  ".repeat(depth);
    if node.needs_population() && !expand {
        println!("{indent}{node} [not fetched]");
        return Ok(());
    }
    println!("{indent}{node}");
    let children = match catalog.children(node, session) {
        Ok(children) => children,
        Err(e) => {
            // one unreachable endpoint should not hide the rest of the tree
            println!("{indent}  ! {e}");
            return Ok(());
        }
    };
    for child in children {
        print_tree(catalog, session, &child, depth + 1, expand)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tree {
            catalog,
            config,
            expand,
        } => {
            let catalog = open(&catalog, config.as_ref())?;
            let mut session = SessionOverlay::new();
            if let Some(root) = catalog.root(&mut session)? {
                print_tree(&catalog, &mut session, &root, 0, expand)?;
            }

            if !catalog.diagnostics().is_empty() {
                println!("\n=== Diagnostics ===");
                for diagnostic in catalog.diagnostics() {
                    println!("{diagnostic}");
                }
            }
            if expand {
                let stats = catalog.cache_stats();
                println!("\nFetched {} capabilities documents", stats.fetches);
            }
            Ok(())
        }

        Commands::Node {
            catalog,
            id,
            config,
        } => {
            let catalog = open(&catalog, config.as_ref())?;
            let mut session = SessionOverlay::new();
            let Some(node) = catalog.lookup(&id, &mut session)? else {
                return Err(Box::new(CatalogError::NotFound(id)));
            };
            let output = serde_json::json!({
                "node": &*node,
                "antecedents": Catalog::find_antecedent_ids(&node.id, false),
                "keyword_data": catalog.get_ancestor_keyword_data(&node, &mut session, true)?,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
    }
}
