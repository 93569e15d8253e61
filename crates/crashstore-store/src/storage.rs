use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use crashstore_types::{CrashId, DumpNames, DumpSet, RawCrash};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{CrashStoreConfig, RuntimeConfigItem, StorageKind, StoreOptions};
use crate::connection::{AnyConnection, BlobConnection};
use crate::error::{StoreError, StoreResult};
use crate::health::HealthState;
use crate::keys::{
    dump_key, dump_names_key, normalize_dump_name, raw_crash_key, validate_dump_name,
};
use crate::noop::NoOpCrashStorage;

/// Persistence of whole crash reports.
///
/// Implementations save and load a raw crash together with its dumps and
/// expose health and configuration so callers never need to know what sits
/// underneath.
#[async_trait]
pub trait CrashStorage: Send + Sync {
    /// Save a raw crash and all of its dumps.
    async fn save_crash(
        &self,
        crash_id: &CrashId,
        raw_crash: &RawCrash,
        dumps: &DumpSet,
    ) -> StoreResult<()>;

    /// Load a raw crash and all of its dumps.
    async fn load_crash(&self, crash_id: &CrashId) -> StoreResult<(RawCrash, DumpSet)>;

    /// Record the health of this storage in `state`.
    async fn check_health(&self, state: &mut HealthState);

    /// Describe the effective configuration of this storage.
    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem>;
}

/// Saves crash reports as several objects in a blob store.
///
/// One crash becomes a dump name index, one object per dump, and a raw crash
/// object (see [`keys`](crate::keys) for the layout). The store offers no
/// multi-object atomicity, so consistency comes from write order alone:
///
/// 1. the dump name index, written even when there are no dumps;
/// 2. every dump payload, in any order;
/// 3. the raw crash, strictly after all of the above succeeded.
///
/// A reader that finds the raw crash can therefore rely on the index and
/// every dump it lists being present. A failure before step 3 leaves the
/// crash unreadable (`NotFound`), never half-loaded.
pub struct CrashStore<C> {
    conn: Arc<C>,
    options: StoreOptions,
}

impl<C: BlobConnection> CrashStore<C> {
    /// Create a store over `conn` with default options.
    pub fn new(conn: C) -> Self {
        Self::with_options(conn, StoreOptions::default())
    }

    pub fn with_options(conn: C, options: StoreOptions) -> Self {
        Self {
            conn: Arc::new(conn),
            options,
        }
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Save the dumps, then the raw crash.
    ///
    /// If the dumps phase fails the raw crash is not written and the crash
    /// stays unreadable. If the raw crash write fails the dumps remain as
    /// orphans until the crash is saved again.
    pub async fn save_crash(
        &self,
        crash_id: &CrashId,
        raw_crash: &RawCrash,
        dumps: &DumpSet,
    ) -> StoreResult<()> {
        if let Err(e) = self.save_dumps(crash_id, dumps).await {
            warn!(%crash_id, error = %e, "saving dumps failed; raw crash not written");
            return Err(e);
        }
        if let Err(e) = self.save_raw_crash(crash_id, raw_crash).await {
            warn!(%crash_id, error = %e, "saving raw crash failed; dumps are orphaned");
            return Err(e);
        }
        info!(%crash_id, dumps = dumps.len(), bytes = dumps.total_bytes(), "crash saved");
        Ok(())
    }

    /// Write the dump name index and every dump payload.
    ///
    /// Must complete before [`save_raw_crash`](Self::save_raw_crash) is called
    /// for the same crash. Prefer [`save_crash`](Self::save_crash), which
    /// enforces that order; this phase is public for callers that stage
    /// dumps ahead of the metadata.
    pub async fn save_dumps(&self, crash_id: &CrashId, dumps: &DumpSet) -> StoreResult<()> {
        check_dump_names(dumps)?;

        let index = dumps.names().to_json()?;
        let index_key = dump_names_key(crash_id);
        self.conn.save_object(&index_key, &index).await?;
        debug!(key = %index_key, names = dumps.len(), "dump index saved");

        if self.options.parallel_dump_writes && dumps.len() > 1 {
            let mut tasks = JoinSet::new();
            for (name, data) in dumps.iter() {
                let conn = Arc::clone(&self.conn);
                let key = dump_key(crash_id, Some(name));
                let data = data.clone();
                tasks.spawn(async move {
                    conn.save_object(&key, &data).await?;
                    debug!(%key, bytes = data.len(), "dump saved");
                    Ok::<(), StoreError>(())
                });
            }
            // Returning early drops the set, which aborts writes still in flight.
            while let Some(joined) = tasks.join_next().await {
                joined.map_err(|e| StoreError::Internal(format!("dump write task: {e}")))??;
            }
        } else {
            for (name, data) in dumps.iter() {
                let key = dump_key(crash_id, Some(name));
                self.conn.save_object(&key, data).await?;
                debug!(%key, bytes = data.len(), "dump saved");
            }
        }
        Ok(())
    }

    /// Write the raw crash object.
    ///
    /// Only call this after [`save_dumps`](Self::save_dumps) succeeded for
    /// the same crash; the raw crash object is what makes a crash visible.
    pub async fn save_raw_crash(
        &self,
        crash_id: &CrashId,
        raw_crash: &RawCrash,
    ) -> StoreResult<()> {
        let data = raw_crash.to_canonical_json()?;
        let key = raw_crash_key(crash_id);
        self.conn.save_object(&key, &data).await?;
        debug!(%key, bytes = data.len(), "raw crash saved");
        Ok(())
    }

    /// Load the raw crash, its dump name index, and every listed dump.
    ///
    /// Fails with `NotFound` if the raw crash does not exist. Any dump that
    /// fails to load fails the whole call; no partial result is returned.
    pub async fn load_raw_crash(&self, crash_id: &CrashId) -> StoreResult<(RawCrash, DumpSet)> {
        let raw_data = self.conn.load_object(&raw_crash_key(crash_id)).await?;
        let raw_crash = RawCrash::from_json_slice(&raw_data)?;

        let index = self.conn.load_object(&dump_names_key(crash_id)).await?;
        let names = DumpNames::from_json_slice(&index)?;

        let mut dumps = DumpSet::new();
        for name in names.iter() {
            let data = self.conn.load_object(&dump_key(crash_id, Some(name))).await?;
            dumps.insert(name, data);
        }
        info!(%crash_id, dumps = dumps.len(), "crash loaded");
        Ok((raw_crash, dumps))
    }

    /// Delegate to the connection's health check.
    pub async fn check_health(&self, state: &mut HealthState) {
        self.conn.check_health(state).await;
    }

    /// Store options followed by the connection's configuration.
    pub fn get_runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem> {
        let mut items = vec![
            RuntimeConfigItem::new(
                namespace,
                "connection_class",
                std::any::type_name::<C>(),
                "Blob connection implementation used by this store.",
            ),
            RuntimeConfigItem::new(
                namespace,
                "parallel_dump_writes",
                self.options.parallel_dump_writes.to_string(),
                "Write the dumps of one crash concurrently.",
            ),
        ];
        items.extend(self.conn.runtime_config(namespace));
        items
    }
}

#[async_trait]
impl<C: BlobConnection> CrashStorage for CrashStore<C> {
    async fn save_crash(
        &self,
        crash_id: &CrashId,
        raw_crash: &RawCrash,
        dumps: &DumpSet,
    ) -> StoreResult<()> {
        CrashStore::save_crash(self, crash_id, raw_crash, dumps).await
    }

    async fn load_crash(&self, crash_id: &CrashId) -> StoreResult<(RawCrash, DumpSet)> {
        self.load_raw_crash(crash_id).await
    }

    async fn check_health(&self, state: &mut HealthState) {
        CrashStore::check_health(self, state).await;
    }

    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem> {
        self.get_runtime_config(namespace)
    }
}

impl<C> std::fmt::Debug for CrashStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashStore")
            .field("connection", &std::any::type_name::<C>())
            .field("options", &self.options)
            .finish()
    }
}

/// Build the storage selected by `config.storage`.
///
/// Only the blob storage opens the configured connection.
pub async fn open_storage(config: &CrashStoreConfig) -> StoreResult<Box<dyn CrashStorage>> {
    match config.storage.kind {
        StorageKind::Blob => {
            let conn = AnyConnection::from_config(&config.connection).await?;
            debug!(connection = conn.kind(), "opened blob storage");
            Ok(Box::new(CrashStore::with_options(conn, config.store.clone())))
        }
        StorageKind::Noop => Ok(Box::new(NoOpCrashStorage::new())),
    }
}

/// Every name must be valid and map to a slot of its own.
fn check_dump_names(dumps: &DumpSet) -> StoreResult<()> {
    let mut slots: HashMap<&str, &str> = HashMap::new();
    for (name, _) in dumps.iter() {
        validate_dump_name(name)?;
        let slot = normalize_dump_name(Some(name));
        if let Some(first) = slots.insert(slot, name) {
            return Err(StoreError::ConflictingDumpNames {
                first: first.to_string(),
                second: name.clone(),
                slot: slot.to_string(),
            });
        }
    }
    Ok(())
}
