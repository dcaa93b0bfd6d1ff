use std::{fmt, io};

use http::status::StatusCode;
use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum CatalogError {
    #[error("Remote capability document could not be parsed: {0}")]
    Capability(String),
    #[error("Catalog configuration error: {0}")]
    Configuration(String),
    #[error("Remote fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },
    #[error("Invalid node identifier: {0}")]
    InvalidId(String),
    #[error("Invalid catalog operation: {0}")]
    InvalidOperation(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Both surface to users as "data source temporarily unavailable"
            CatalogError::Capability(_) => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::Fetch { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::InvalidId(_) => StatusCode::BAD_REQUEST,
            CatalogError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            CatalogError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures of the remote data source rather than of the catalog itself.
    pub fn is_remote(&self) -> bool {
        matches!(self, CatalogError::Capability(_) | CatalogError::Fetch { .. })
    }
}

impl From<toml::de::Error> for CatalogError {
    fn from(src: toml::de::Error) -> CatalogError {
        CatalogError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<JsonError> for CatalogError {
    fn from(src: JsonError) -> CatalogError {
        CatalogError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for CatalogError {
    fn from(src: UrlParseError) -> CatalogError {
        CatalogError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<RegexError> for CatalogError {
    fn from(x: RegexError) -> Self {
        CatalogError::Configuration(format!("Regex parse failed: {x}"))
    }
}

impl From<roxmltree::Error> for CatalogError {
    fn from(x: roxmltree::Error) -> Self {
        CatalogError::Capability(format!("malformed XML: {x}"))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(x: reqwest::Error) -> Self {
        CatalogError::Fetch {
            url: x.url().map(|u| u.to_string()).unwrap_or_default(),
            message: format!("{x}"),
        }
    }
}

impl From<io::Error> for CatalogError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => CatalogError::NotFound(format!("{x}")),
            _ => CatalogError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for CatalogError {
    fn from(x: fmt::Error) -> Self {
        CatalogError::Serialization(format!("{x}"))
    }
}
