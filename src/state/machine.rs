//! Status State Machine
//!
//! Transition table (directed):
//! - Draft → Finalized, Draft → Deleted
//! - Finalized → Inactive, Finalized → Deleted
//! - Inactive → Draft, Inactive → Deleted
//!
//! Deleted has no outgoing edges. Every transition not listed is rejected
//! with `InvalidStateChange`, including transitions to the current status.
//!
//! Commit-time rule: a structural change committed on a Finalized revision
//! yields a Draft revision. Non-structural changes keep the status.

use crate::errors::{RevisionError, RevisionResult};

use super::RevisionStatus;

/// Legality table for status transitions.
///
/// Stateless; the current status lives on the selected revision.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine;

impl StateMachine {
    /// Returns true if `from → to` is a legal transition.
    pub fn can_transition(from: RevisionStatus, to: RevisionStatus) -> bool {
        use RevisionStatus::*;

        matches!(
            (from, to),
            (Draft, Finalized)
                | (Draft, Deleted)
                | (Finalized, Inactive)
                | (Finalized, Deleted)
                | (Inactive, Draft)
                | (Inactive, Deleted)
        )
    }

    /// Validates `from → to` and returns the target status.
    pub fn transition(from: RevisionStatus, to: RevisionStatus) -> RevisionResult<RevisionStatus> {
        if Self::can_transition(from, to) {
            Ok(to)
        } else {
            Err(RevisionError::InvalidStateChange { from, to })
        }
    }

    /// True only from Draft.
    pub fn can_be_finalized(status: RevisionStatus) -> bool {
        Self::can_transition(status, RevisionStatus::Finalized)
    }

    /// True from Draft, Finalized and Inactive.
    pub fn can_be_deleted(status: RevisionStatus) -> bool {
        Self::can_transition(status, RevisionStatus::Deleted)
    }

    /// True from Draft and Finalized.
    ///
    /// Draft has no direct edge to Inactive in the table; it qualifies
    /// because it can reach Inactive through finalization.
    pub fn can_be_made_inactive(status: RevisionStatus) -> bool {
        matches!(status, RevisionStatus::Draft | RevisionStatus::Finalized)
    }

    /// Validates a lifecycle request from `from` to `to`.
    ///
    /// Same as [`transition`](Self::transition), except that inactivation is
    /// also accepted from Draft and applied as Draft → Finalized → Inactive.
    pub fn request(from: RevisionStatus, to: RevisionStatus) -> RevisionResult<RevisionStatus> {
        if to == RevisionStatus::Inactive && Self::can_be_made_inactive(from) {
            return Ok(to);
        }
        Self::transition(from, to)
    }

    /// Status of a new revision produced by a commit.
    ///
    /// Finalization does not survive a structural edit.
    pub fn commit_status(current: RevisionStatus, structural: bool) -> RevisionStatus {
        match (current, structural) {
            (RevisionStatus::Finalized, true) => RevisionStatus::Draft,
            (status, _) => status,
        }
    }
}
