//! Section/key configuration source consumed by the [crate::builder].
//!
//! The catalog does not care about configuration file syntax; it asks a [SectionSource] for named
//! sections (`page`, `dataset:<key>`, `endpoint:<key>`, `keyworddata:<key>`, `layerset:<key>`,
//! `layer:<key>`) of string key/value pairs. [MemorySections] holds them directly and
//! [TomlSections] reads them from TOML tables.
use std::{collections::BTreeMap, fs::read_to_string, path::Path};
use toml::{Table, Value};

use crate::CatalogError;

/// One configuration section: string keys to string values.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Section(BTreeMap<String, String>);

impl Section {
    pub fn new() -> Section {
        Section::default()
    }

    /// Trimmed, non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Comma-separated list value of `key`, trimmed, empty items dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Section {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Section(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

pub trait SectionSource {
    fn section(&self, name: &str) -> Option<Section>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySections(BTreeMap<String, Section>);

impl MemorySections {
    pub fn new() -> MemorySections {
        MemorySections::default()
    }

    pub fn insert<I, K, V>(&mut self, name: &str, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(name.to_string(), Section::from_iter(pairs));
    }

    pub fn with<I, K, V>(mut self, name: &str, pairs: I) -> MemorySections
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(name, pairs);
        self
    }
}

impl SectionSource for MemorySections {
    fn section(&self, name: &str) -> Option<Section> {
        self.0.get(name).cloned()
    }
}

/// Sections read from the top-level tables of a TOML document. Arrays become comma-separated
/// lists; numbers and booleans are stringified.
#[derive(Debug, Default, Clone)]
pub struct TomlSections(MemorySections);

impl TomlSections {
    pub fn from_toml_str(content: &str) -> Result<TomlSections, CatalogError> {
        let table: Table = toml::from_str(content)?;
        let mut sections = MemorySections::new();
        for (name, value) in table {
            let Value::Table(entries) = value else {
                tracing::debug!("[TomlSections] ignoring top-level non-table key '{name}'");
                continue;
            };
            let pairs = entries
                .into_iter()
                .filter_map(|(k, v)| flatten_value(&v).map(|s| (k, s)));
            sections.insert(&name, pairs);
        }
        Ok(TomlSections(sections))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<TomlSections, CatalogError> {
        tracing::debug!("Reading catalog sections from {:?}", path.as_ref());
        TomlSections::from_toml_str(&read_to_string(path)?)
    }
}

impl SectionSource for TomlSections {
    fn section(&self, name: &str) -> Option<Section> {
        self.0.section(name)
    }
}

fn flatten_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(flatten_value)
                .collect::<Vec<String>>()
                .join(", "),
        ),
        Value::Table(_) => None,
    }
}
