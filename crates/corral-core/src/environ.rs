//! Environment variable map for deployed functions.

use std::collections::{BTreeMap, HashMap};

/// Case-normalized environment variable map.
///
/// Keys are upper-cased on both insert and lookup, so `--FOO=1` on the
/// command line and a `foo` lookup in code address the same entry.
/// Values are stored as strings, which is all the Lambda environment
/// accepts anyway.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environ {
    vars: BTreeMap<String, String>,
}

impl Environ {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable. A repeated key overwrites the previous value.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.vars.insert(key.to_uppercase(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(&key.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy into the map shape the Lambda environment API takes.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
