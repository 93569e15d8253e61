use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Top-level configuration: which storage to use, store behaviour, and the
/// connection to build.
///
/// ```toml
/// [storage]
/// kind = "blob"
///
/// [store]
/// parallel_dump_writes = true
///
/// [connection]
/// kind = "filesystem"
/// root = "/var/lib/crashes"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrashStoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreOptions,
    #[serde(default)]
    pub connection: ConnectionConfig,
}

impl CrashStoreConfig {
    /// Parse from TOML text. Missing sections and fields take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Selects the [`CrashStorage`](crate::CrashStorage) implementation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// [`CrashStore`](crate::CrashStore) over the configured connection.
    #[default]
    Blob,
    /// [`NoOpCrashStorage`](crate::NoOpCrashStorage). The connection is not opened.
    Noop,
}

/// Options of the crash store itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Write the dump payloads of one crash concurrently. The raw crash is
    /// always written after all of them either way.
    pub parallel_dump_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            parallel_dump_writes: true,
        }
    }
}

/// Which blob connection to build, selected by `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Process-local map. Nothing survives a restart.
    Memory,
    /// Directory on the local filesystem.
    Filesystem(FsConnectionConfig),
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::Filesystem(FsConnectionConfig::default())
    }
}

/// Settings for [`FsConnection`](crate::FsConnection).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConnectionConfig {
    pub root: PathBuf,
    /// Create `root` on open. Don't use this outside development setups.
    pub create: bool,
    /// Check on open that `root` is an accessible directory.
    pub verify: bool,
}

impl Default for FsConnectionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("crashes"),
            create: false,
            verify: true,
        }
    }
}

/// One effective configuration value, for display and diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuntimeConfigItem {
    pub namespace: Vec<String>,
    pub key: String,
    pub value: String,
    pub doc: String,
}

impl RuntimeConfigItem {
    pub fn new(
        namespace: &[String],
        key: impl Into<String>,
        value: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.to_vec(),
            key: key.into(),
            value: value.into(),
            doc: doc.into(),
        }
    }

    /// Fully qualified name, e.g. `crashstorage_parallel_dump_writes`.
    pub fn qualified_key(&self) -> String {
        let mut parts: Vec<&str> = self.namespace.iter().map(String::as_str).collect();
        parts.push(&self.key);
        parts.join("_")
    }
}
