use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Named binary attachments belonging to one crash.
///
/// Names are caller-supplied and may be empty. Payloads are opaque.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DumpSet(BTreeMap<String, Vec<u8>>);

impl DumpSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dump, returning the previous payload stored under `name`.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.0.insert(name.into(), data.into())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate dumps in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<u8>)> {
        self.0.iter()
    }

    /// Total payload bytes across all dumps.
    pub fn total_bytes(&self) -> u64 {
        self.0.values().map(|d| d.len() as u64).sum()
    }

    /// The sorted list of dump names.
    pub fn names(&self) -> DumpNames {
        DumpNames(self.0.keys().cloned().collect())
    }
}

impl FromIterator<(String, Vec<u8>)> for DumpSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for DumpSet {
    type Item = (String, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Sorted list of the dump names of one crash.
///
/// Persisted on its own so a reader can discover which dump objects exist
/// without listing the store. An empty list is valid and means the crash has
/// no dumps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DumpNames(Vec<String>);

impl DumpNames {
    /// Build from arbitrary names; the result is sorted and deduplicated.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        names.dedup();
        Self(names)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Encode as a UTF-8 JSON array of strings.
    pub fn to_json(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(&self.0).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a JSON array of strings. Order in the input is not trusted.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, TypeError> {
        let names: Vec<String> =
            serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(Self::new(names))
    }
}
