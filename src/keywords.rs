//! Keyword data: free-form named metadata inherited down the catalog tree.
use serde::{Deserialize, Serialize};
use std::{
    collections::{btree_map, BTreeMap},
    fmt,
};

/// Ordered map of keyword name to value. Merging is always "descendant wins".
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordData(BTreeMap<String, String>);

impl KeywordData {
    pub fn new() -> KeywordData {
        KeywordData::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Overlay `descendant` onto self in place. Keys present in both take the descendant's value.
    pub fn overlay(&mut self, descendant: &KeywordData) {
        for (key, value) in descendant.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Copy of self with `descendant` overlaid.
    pub fn merged_with(&self, descendant: &KeywordData) -> KeywordData {
        let mut merged = self.clone();
        merged.overlay(descendant);
        merged
    }

    /// Merge a root→node ordered chain of keyword maps.
    pub fn merge_chain<'a, I>(chain: I) -> KeywordData
    where
        I: IntoIterator<Item = &'a KeywordData>,
    {
        let mut merged = KeywordData::default();
        for data in chain {
            merged.overlay(data);
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeywordData {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        KeywordData(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a KeywordData {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for KeywordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<String>>()
            .join(", ");
        write!(f, "{{{pairs}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendant_value_wins() {
        let ancestor = KeywordData::from_iter([("title", "X"), ("caption_style", "obs")]);
        let node = KeywordData::from_iter([("title", "Y")]);
        let merged = ancestor.merged_with(&node);
        assert_eq!(
            merged,
            KeywordData::from_iter([("title", "Y"), ("caption_style", "obs")])
        );
        // ancestor untouched
        assert_eq!(ancestor.get("title"), Some("X"));
    }

    #[test]
    fn chain_merges_root_first() {
        let a = KeywordData::from_iter([("k", "a"), ("only_a", "1")]);
        let b = KeywordData::from_iter([("k", "b")]);
        let c = KeywordData::from_iter([("k", "c"), ("only_c", "3")]);
        let merged = KeywordData::merge_chain([&a, &b, &c]);
        assert_eq!(merged.get("k"), Some("c"));
        assert_eq!(merged.get("only_a"), Some("1"));
        assert_eq!(merged.get("only_c"), Some("3"));
        assert_eq!(merged.len(), 3);
        assert_eq!(format!("{}", b), "{k=b}");
    }
}
