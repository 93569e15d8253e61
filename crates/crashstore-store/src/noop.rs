use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use crashstore_types::{CrashId, DumpSet, RawCrash};
use tracing::info;

use crate::config::RuntimeConfigItem;
use crate::error::{StoreError, StoreResult};
use crate::health::HealthState;
use crate::storage::CrashStorage;

/// How many recent crashes a [`NoOpCrashStorage`] keeps.
pub const NOOP_RETAINED: usize = 10;

/// Number of raw crash fields included in the log line.
const LOGGED_FIELDS: usize = 10;

/// A crash held by [`NoOpCrashStorage`].
#[derive(Clone, Debug, PartialEq)]
pub struct RetainedCrash {
    pub crash_id: CrashId,
    pub raw_crash: RawCrash,
    pub dumps: DumpSet,
}

/// Crash storage that only logs what it would have stored.
///
/// Keeps the [`NOOP_RETAINED`] most recent crashes in memory, newest last,
/// which is enough for local development and tests of upstream components.
#[derive(Debug, Default)]
pub struct NoOpCrashStorage {
    crashes: Mutex<VecDeque<RetainedCrash>>,
}

impl NoOpCrashStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained crashes, oldest first.
    pub fn crashes(&self) -> Vec<RetainedCrash> {
        self.crashes
            .lock()
            .expect("lock poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CrashStorage for NoOpCrashStorage {
    async fn save_crash(
        &self,
        crash_id: &CrashId,
        raw_crash: &RawCrash,
        dumps: &DumpSet,
    ) -> StoreResult<()> {
        let fields: Vec<String> = raw_crash
            .iter()
            .take(LOGGED_FIELDS)
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        let names: Vec<&String> = dumps.iter().map(|(name, _)| name).collect();
        info!(%crash_id, raw_crash = ?fields, dumps = ?names, "crash no-op");

        let mut crashes = self.crashes.lock().expect("lock poisoned");
        crashes.push_back(RetainedCrash {
            crash_id: crash_id.clone(),
            raw_crash: raw_crash.clone(),
            dumps: dumps.clone(),
        });
        while crashes.len() > NOOP_RETAINED {
            crashes.pop_front();
        }
        Ok(())
    }

    async fn load_crash(&self, crash_id: &CrashId) -> StoreResult<(RawCrash, DumpSet)> {
        let crashes = self.crashes.lock().expect("lock poisoned");
        crashes
            .iter()
            .rev()
            .find(|c| &c.crash_id == crash_id)
            .map(|c| (c.raw_crash.clone(), c.dumps.clone()))
            .ok_or_else(|| StoreError::NotFound {
                key: crash_id.to_string(),
            })
    }

    async fn check_health(&self, state: &mut HealthState) {
        let retained = self.crashes.lock().expect("lock poisoned").len();
        state.add_info("NoOpCrashStorage", "retained", retained);
    }

    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem> {
        vec![RuntimeConfigItem::new(
            namespace,
            "retained",
            NOOP_RETAINED.to_string(),
            "Number of recent crashes kept in memory; nothing is persisted.",
        )]
    }
}
