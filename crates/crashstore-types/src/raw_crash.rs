use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;

/// Structured metadata describing one crash.
///
/// Field order carries no meaning. The canonical encoding sorts keys at every
/// nesting depth so logically identical records always produce identical
/// bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawCrash(BTreeMap<String, Value>);

impl RawCrash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value if one was present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Encode as UTF-8 JSON with keys sorted at every depth.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, TypeError> {
        let canonical: BTreeMap<&String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k, canonicalize(v)))
            .collect();
        serde_json::to_vec(&canonical).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a record previously produced by [`RawCrash::to_canonical_json`].
    ///
    /// The top-level value must be a JSON object.
    pub fn from_json_slice(data: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

impl From<BTreeMap<String, Value>> for RawCrash {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for RawCrash {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rebuild objects with sorted keys, independent of how `serde_json::Map`
/// orders entries in this build.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k.clone(), canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
