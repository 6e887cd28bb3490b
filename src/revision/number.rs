//! Record and revision identities
//!
//! - Revision numbers are totally ordered and never reused
//! - Record identifiers are allocated by the persistence backend
//! - Stubs use fixed sentinels that no persisted row can carry
//!
//! These are PURE TYPES with no behavior beyond construction and access.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Revision number of a record.
///
/// Allocated by the [`crate::revision::RevisionAuthority`]. Persisted
/// revisions start at 1; zero is reserved for stubs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionNumber(u64);

impl RevisionNumber {
    /// Creates a revision number with the given value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// True for the stub sentinel.
    #[inline]
    pub fn is_stub(&self) -> bool {
        *self == STUB_REVISION
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    /// Creates a record identifier with the given value.
    #[inline]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Revision number every stub reports.
pub const STUB_REVISION: RevisionNumber = RevisionNumber::new(0);

/// Record identifier every stub reports. Never allocated by a backend.
pub const STUB_RECORD_ID: RecordId = RecordId::new(0);
