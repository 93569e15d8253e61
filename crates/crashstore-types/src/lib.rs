//! Foundation types for crash report storage.
//!
//! A crash report is one structured metadata record plus zero or more named
//! binary attachments. This crate defines the in-memory shape of both halves
//! and the identifier that ties them together. It knows nothing about where
//! they are stored.
//!
//! # Key Types
//!
//! - [`CrashId`] -- Validated crash identifier with an embedded creation date
//! - [`RawCrash`] -- Metadata record with canonical (sorted-key) JSON encoding
//! - [`DumpSet`] -- Named binary attachments of one crash
//! - [`DumpNames`] -- Sorted list of dump names, persisted as the dump index

pub mod crash_id;
pub mod dumps;
pub mod error;
pub mod raw_crash;

pub use crash_id::CrashId;
pub use dumps::{DumpNames, DumpSet};
pub use error::TypeError;
pub use raw_crash::RawCrash;
