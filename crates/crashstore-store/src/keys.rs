//! Storage key scheme.
//!
//! One crash is spread over several objects living under two coexisting
//! namespace versions:
//!
//! ```text
//! v1/dump_names/<CRASHID>                          sorted dump name index
//! v1/<DUMPNAME>/<CRASHID>                          one object per dump
//! v2/raw_crash/<ENTROPY>/<YYYYMMDD>/<CRASHID>      raw crash metadata
//! ```
//!
//! The layout is persisted state. Old objects must stay readable, so the
//! `v1` and `v2` families are never unified.

use crashstore_types::CrashId;

use crate::error::{StoreError, StoreResult};

/// Namespace of raw crash objects.
pub const RAW_CRASH_PREFIX: &str = "v2/raw_crash";

/// Namespace of dump name index objects.
pub const DUMP_NAMES_PREFIX: &str = "v1/dump_names";

/// Namespace version of dump payload objects.
pub const DUMP_PREFIX: &str = "v1";

/// Stored name of the primary dump slot.
pub const PRIMARY_DUMP_NAME: &str = "dump";

/// Legacy form field name that also denotes the primary dump.
pub const LEGACY_DUMP_NAME: &str = "upload_file_minidump";

/// Key of the raw crash object.
///
/// # Examples
///
/// ```
/// use crashstore_store::keys::raw_crash_key;
/// use crashstore_types::CrashId;
///
/// let id = CrashId::parse("ab3456ef-0000-0000-0000-20200102abcd").unwrap();
/// assert_eq!(
///     raw_crash_key(&id),
///     "v2/raw_crash/ab3/20200102/ab3456ef-0000-0000-0000-20200102abcd"
/// );
/// ```
pub fn raw_crash_key(crash_id: &CrashId) -> String {
    format!(
        "{RAW_CRASH_PREFIX}/{}/{}/{}",
        crash_id.entropy(),
        crash_id.date_segment(),
        crash_id
    )
}

/// Key of the dump name index object.
pub fn dump_names_key(crash_id: &CrashId) -> String {
    format!("{DUMP_NAMES_PREFIX}/{crash_id}")
}

/// Key of a single dump payload object.
///
/// The name is normalized first, see [`normalize_dump_name`].
pub fn dump_key(crash_id: &CrashId, dump_name: Option<&str>) -> String {
    format!("{DUMP_PREFIX}/{}/{crash_id}", normalize_dump_name(dump_name))
}

/// Map a dump name to the name it is stored under.
///
/// An absent or empty name and [`LEGACY_DUMP_NAME`] all denote the primary
/// dump, stored as [`PRIMARY_DUMP_NAME`]. Every other name is kept as is.
pub fn normalize_dump_name(dump_name: Option<&str>) -> &str {
    match dump_name {
        None | Some("") | Some(LEGACY_DUMP_NAME) => PRIMARY_DUMP_NAME,
        Some(name) => name,
    }
}

/// Reject dump names that would produce a key outside their own slot, or
/// one that a connection could not store.
///
/// Empty names are valid (they normalize to the primary dump).
pub fn validate_dump_name(name: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidDumpName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.contains('/') {
        return Err(invalid("must not contain '/'"));
    }
    if name.contains('\\') || name.contains('\0') {
        return Err(invalid("must not contain '\\' or NUL"));
    }
    if name == "." || name == ".." {
        return Err(invalid("must not be a relative path component"));
    }
    // Would overwrite the index at v1/dump_names/<CRASHID>.
    if name == "dump_names" {
        return Err(invalid("reserved for the dump name index"));
    }
    Ok(())
}
