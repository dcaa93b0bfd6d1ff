//! Configuration defects found while building the static catalog.
//!
//! None of these abort a build. Each is logged when found and kept on the
//! [crate::catalog::GlobalCatalog] so callers can report them.
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigDiagnostic {
    /// A referenced section does not exist; the reference was skipped.
    MissingSection {
        section: String,
        referenced_by: String,
    },
    /// A dataset lists one of its own ancestors; that child was omitted.
    CircularReference { dataset: String, chain: Vec<String> },
    InvalidUrl {
        endpoint: String,
        field: String,
        message: String,
    },
    /// An endpoint has no WMS URL, so its layers can never be populated.
    MissingServiceUrl { endpoint: String },
    InvalidLayerPattern {
        endpoint: String,
        layer: String,
        message: String,
    },
    MalformedLayerName { endpoint: String, line: String },
}

impl fmt::Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDiagnostic::MissingSection {
                section,
                referenced_by,
            } => write!(f, "section [{section}] referenced by {referenced_by} does not exist"),
            ConfigDiagnostic::CircularReference { dataset, chain } => write!(
                f,
                "circular dataset reference to '{dataset}' via {}",
                chain.join(" -> ")
            ),
            ConfigDiagnostic::InvalidUrl {
                endpoint,
                field,
                message,
            } => write!(f, "endpoint '{endpoint}' has an invalid {field}: {message}"),
            ConfigDiagnostic::MissingServiceUrl { endpoint } => {
                write!(f, "endpoint '{endpoint}' has no wmsurl")
            }
            ConfigDiagnostic::InvalidLayerPattern {
                endpoint,
                layer,
                message,
            } => write!(
                f,
                "layer data '{layer}' of endpoint '{endpoint}' has an invalid name pattern: {message}"
            ),
            ConfigDiagnostic::MalformedLayerName { endpoint, line } => write!(
                f,
                "endpoint '{endpoint}' newlayernames entry '{line}' is not a name:display pair"
            ),
        }
    }
}
