use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::config::RuntimeConfigItem;
use crate::connection::BlobConnection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::health::HealthState;

/// In-memory, HashMap-based blob connection.
///
/// Intended for tests and embedding. Objects are held behind a `RwLock` and
/// cloned on read/write. A few hooks let tests inject failures and inspect
/// the order in which keys were written.
pub struct InMemoryConnection {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    write_log: RwLock<Vec<String>>,
    failing_prefixes: RwLock<Vec<String>>,
    unhealthy: RwLock<Option<String>>,
}

impl InMemoryConnection {
    /// Create a new empty connection.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            write_log: RwLock::new(Vec::new()),
            failing_prefixes: RwLock::new(Vec::new()),
            unhealthy: RwLock::new(None),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of all stored keys.
    pub fn keys(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Bytes stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().expect("lock poisoned").get(key).cloned()
    }

    /// Remove the object under `key`. Returns `true` if it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.objects.write().expect("lock poisoned").remove(key).is_some()
    }

    /// Every successfully saved key, in completion order.
    pub fn write_log(&self) -> Vec<String> {
        self.write_log.read().expect("lock poisoned").clone()
    }

    /// Make every later save to a key starting with `prefix` fail.
    pub fn fail_saves_with_prefix(&self, prefix: impl Into<String>) {
        self.failing_prefixes
            .write()
            .expect("lock poisoned")
            .push(prefix.into());
    }

    /// Report the connection as unhealthy with `reason`, or healthy on `None`.
    pub fn set_unhealthy(&self, reason: Option<String>) {
        *self.unhealthy.write().expect("lock poisoned") = reason;
    }
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobConnection for InMemoryConnection {
    async fn save_object(&self, key: &str, data: &[u8]) -> ConnectionResult<()> {
        let failing = self
            .failing_prefixes
            .read()
            .expect("lock poisoned")
            .iter()
            .any(|p| key.starts_with(p.as_str()));
        if failing {
            return Err(ConnectionError::Unavailable(format!(
                "injected save failure for {key}"
            )));
        }
        self.objects
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), data.to_vec());
        self.write_log
            .write()
            .expect("lock poisoned")
            .push(key.to_string());
        Ok(())
    }

    async fn load_object(&self, key: &str) -> ConnectionResult<Vec<u8>> {
        self.get(key).ok_or_else(|| ConnectionError::NotFound {
            key: key.to_string(),
        })
    }

    async fn check_health(&self, state: &mut HealthState) {
        let unhealthy = self.unhealthy.read().expect("lock poisoned").clone();
        match unhealthy {
            Some(reason) => state.add_error("InMemoryConnection", reason),
            None => state.add_info("InMemoryConnection", "objects", self.len()),
        }
    }

    fn runtime_config(&self, _namespace: &[String]) -> Vec<RuntimeConfigItem> {
        Vec::new()
    }
}

impl std::fmt::Debug for InMemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryConnection")
            .field("object_count", &count)
            .finish()
    }
}
