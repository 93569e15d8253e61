use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of leading characters used as the entropy prefix.
pub const ENTROPY_LEN: usize = 3;

/// Byte offset of the embedded `yyyymmdd` date.
pub const DATE_OFFSET: usize = 24;

/// Length of the embedded date.
pub const DATE_LEN: usize = 8;

/// Shortest identifier from which both the entropy prefix and the date can
/// be sliced.
pub const MIN_LEN: usize = DATE_OFFSET + DATE_LEN;

/// Identifier of a single crash report.
///
/// A `CrashId` is an opaque token assigned upstream. By construction it
/// embeds its creation date as eight characters at [`DATE_OFFSET`], e.g.
/// `ab3456ef-0000-0000-0000-20200102abcd` was created on 2020-01-02.
/// Parsing only checks that the entropy prefix and the date segment can be
/// sliced out; it does not interpret the remaining characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CrashId(String);

impl CrashId {
    /// Validate and wrap an identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.len() < MIN_LEN {
            return Err(TypeError::MalformedIdentifier {
                reason: format!("expected at least {MIN_LEN} bytes, got {}", s.len()),
                id: s,
            });
        }
        if s.get(..ENTROPY_LEN).is_none() || s.get(DATE_OFFSET..MIN_LEN).is_none() {
            return Err(TypeError::MalformedIdentifier {
                id: s,
                reason: "entropy or date segment splits a character".into(),
            });
        }
        Ok(Self(s))
    }

    /// Generate a fresh identifier stamped with today's UTC date.
    pub fn generate() -> Self {
        Self::generate_for_date(Utc::now().date_naive())
    }

    /// Generate a fresh identifier stamped with `date`.
    ///
    /// The identifier is a random hyphenated v4 UUID whose characters at
    /// [`DATE_OFFSET`] are overwritten with `yyyymmdd`.
    pub fn generate_for_date(date: NaiveDate) -> Self {
        let mut id = uuid::Uuid::new_v4().hyphenated().to_string();
        id.replace_range(DATE_OFFSET..MIN_LEN, &date.format("%Y%m%d").to_string());
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading characters used to spread keys across partitions.
    pub fn entropy(&self) -> &str {
        &self.0[..ENTROPY_LEN]
    }

    /// The raw eight-character date segment.
    pub fn date_segment(&self) -> &str {
        &self.0[DATE_OFFSET..MIN_LEN]
    }

    /// The embedded date, if the date segment is a valid calendar date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date_segment(), "%Y%m%d").ok()
    }
}

impl FromStr for CrashId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CrashId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<CrashId> for String {
    fn from(id: CrashId) -> Self {
        id.0
    }
}

impl AsRef<str> for CrashId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CrashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CrashId({})", self.0)
    }
}

impl fmt::Display for CrashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
