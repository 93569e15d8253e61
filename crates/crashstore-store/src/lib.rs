//! Crash report persistence over a key-addressed blob store.
//!
//! A crash report is a raw crash (structured metadata) plus zero or more
//! named dumps (binary attachments). This crate decomposes one report into
//! several blob-store objects, writes them in an order that keeps readers
//! from ever observing a half-saved crash, and reassembles them on load.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobConnection`] trait:
//!
//! - [`InMemoryConnection`] -- `HashMap`-based store for tests and embedding
//! - [`FsConnection`] -- directory-backed store with atomic object replacement
//! - [`AnyConnection`] -- either of the above, chosen by [`ConnectionConfig`]
//!
//! # Design Rules
//!
//! 1. Key layout is persisted state and never changes (see [`keys`]).
//! 2. Dumps first, raw crash last: a present raw crash implies a complete crash.
//! 3. Serialization is canonical: identical content yields identical bytes.
//! 4. Connection failures are surfaced unchanged; retry policy is not ours.
//! 5. Different crash ids are fully independent and need no locking.

pub mod config;
pub mod connection;
pub mod error;
pub mod fs;
pub mod health;
pub mod keys;
pub mod memory;
pub mod noop;
pub mod storage;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{
    ConnectionConfig, CrashStoreConfig, FsConnectionConfig, RuntimeConfigItem, StorageConfig,
    StorageKind, StoreOptions,
};
pub use connection::{AnyConnection, BlobConnection};
pub use error::{ConnectionError, ConnectionResult, StoreError, StoreResult};
pub use fs::FsConnection;
pub use health::{HealthError, HealthState};
pub use memory::InMemoryConnection;
pub use noop::{NoOpCrashStorage, RetainedCrash};
pub use storage::{open_storage, CrashStorage, CrashStore};

pub use crashstore_types::{CrashId, DumpNames, DumpSet, RawCrash, TypeError};
