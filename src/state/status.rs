//! Record status
//!
//! Status is stored on every revision, not on the record, so selecting an
//! earlier revision also selects the status it was written with.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionStatus {
    /// Editable working state. New records start here.
    #[default]
    Draft,
    /// Approved state; survives only non-structural edits.
    Finalized,
    /// Retired but restorable.
    Inactive,
    /// Terminal.
    Deleted,
}

impl RevisionStatus {
    /// All statuses in declaration order.
    pub const ALL: [RevisionStatus; 4] = [
        RevisionStatus::Draft,
        RevisionStatus::Finalized,
        RevisionStatus::Inactive,
        RevisionStatus::Deleted,
    ];

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionStatus::Draft => "draft",
            RevisionStatus::Finalized => "finalized",
            RevisionStatus::Inactive => "inactive",
            RevisionStatus::Deleted => "deleted",
        }
    }

    /// True once no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RevisionStatus::Deleted)
    }
}

impl fmt::Display for RevisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
