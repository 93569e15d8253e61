use async_trait::async_trait;

use crate::config::{ConnectionConfig, RuntimeConfigItem};
use crate::error::{ConnectionResult, StoreResult};
use crate::fs::FsConnection;
use crate::health::HealthState;
use crate::memory::InMemoryConnection;

/// Key-addressed blob store capability.
///
/// This is everything crash storage needs from the backend underneath it.
/// All implementations must satisfy these invariants:
/// - An object becomes visible to `load_object` only once it is complete.
///   Readers never observe a partially written object.
/// - Objects are independent. There is no multi-object atomicity and no
///   ordering between writes to different keys beyond the caller's own
///   sequencing.
/// - Saving to an existing key overwrites it.
/// - Failures are reported, never silently ignored. Retry policy, if any,
///   lives inside the implementation.
#[async_trait]
pub trait BlobConnection: Send + Sync + 'static {
    /// Store `data` under `key`.
    async fn save_object(&self, key: &str, data: &[u8]) -> ConnectionResult<()>;

    /// Load the object stored under `key`.
    ///
    /// Returns `ConnectionError::NotFound` if no object exists.
    async fn load_object(&self, key: &str) -> ConnectionResult<Vec<u8>>;

    /// Check the backend and record any problem in `state`.
    async fn check_health(&self, state: &mut HealthState);

    /// Describe the effective configuration of this connection.
    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem>;
}

/// A connection chosen at runtime from [`ConnectionConfig`].
#[derive(Debug)]
pub enum AnyConnection {
    Memory(InMemoryConnection),
    Filesystem(FsConnection),
}

impl AnyConnection {
    /// Build the connection named by `config`.
    pub async fn from_config(config: &ConnectionConfig) -> StoreResult<Self> {
        Ok(match config {
            ConnectionConfig::Memory => Self::Memory(InMemoryConnection::new()),
            ConnectionConfig::Filesystem(fs) => {
                Self::Filesystem(FsConnection::open(fs.clone()).await?)
            }
        })
    }

    /// Short name of the selected backend.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Filesystem(_) => "filesystem",
        }
    }
}

#[async_trait]
impl BlobConnection for AnyConnection {
    async fn save_object(&self, key: &str, data: &[u8]) -> ConnectionResult<()> {
        match self {
            Self::Memory(c) => c.save_object(key, data).await,
            Self::Filesystem(c) => c.save_object(key, data).await,
        }
    }

    async fn load_object(&self, key: &str) -> ConnectionResult<Vec<u8>> {
        match self {
            Self::Memory(c) => c.load_object(key).await,
            Self::Filesystem(c) => c.load_object(key).await,
        }
    }

    async fn check_health(&self, state: &mut HealthState) {
        match self {
            Self::Memory(c) => c.check_health(state).await,
            Self::Filesystem(c) => c.check_health(state).await,
        }
    }

    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem> {
        let mut items = vec![RuntimeConfigItem::new(
            namespace,
            "kind",
            self.kind(),
            "Blob connection backend: memory or filesystem.",
        )];
        items.extend(match self {
            Self::Memory(c) => c.runtime_config(namespace),
            Self::Filesystem(c) => c.runtime_config(namespace),
        });
        items
    }
}
