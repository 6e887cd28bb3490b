//! Transaction summary
//!
//! Produced exactly once per ended or rolled back transaction. All flags
//! derive from a single [`TransactionOutcome`], so they can never disagree.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::revision::{RecordId, RevisionNumber};
use crate::state::RevisionStatus;

/// What a transaction ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// A new revision was allocated and written
    NewRevision(RevisionNumber),
    /// The selected revision was updated without a new number
    UpdatedInPlace,
    /// Nothing differed from the baseline
    Unchanged,
    /// Changes were discarded
    RolledBack,
    /// Decision ran, nothing was allocated or written
    Simulated { would_change: bool },
}

/// Summary of one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionInfo {
    /// Correlation id of the transaction
    pub transaction_id: Uuid,
    /// Record the transaction ran against
    pub record_id: RecordId,
    /// Revision selected when the transaction started
    pub old_revision: RevisionNumber,
    /// Status when the transaction started
    pub old_status: RevisionStatus,
    /// Status after the transaction
    pub new_status: RevisionStatus,
    /// Storage parts whose data changed
    pub changed_parts: BTreeSet<String>,
    /// True if any changed part is structural
    pub structural: bool,
    /// Underlying decision
    pub outcome: TransactionOutcome,
}

impl TransactionInfo {
    /// Revision allocated by this transaction, if any
    pub fn new_revision(&self) -> Option<RevisionNumber> {
        match self.outcome {
            TransactionOutcome::NewRevision(revision) => Some(revision),
            _ => None,
        }
    }

    pub fn is_changed(&self) -> bool {
        match self.outcome {
            TransactionOutcome::NewRevision(_) | TransactionOutcome::UpdatedInPlace => true,
            TransactionOutcome::Simulated { would_change } => would_change,
            TransactionOutcome::Unchanged | TransactionOutcome::RolledBack => false,
        }
    }

    pub fn is_new_revision(&self) -> bool {
        matches!(self.outcome, TransactionOutcome::NewRevision(_))
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.outcome, TransactionOutcome::Simulated { .. })
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self.outcome, TransactionOutcome::RolledBack)
    }

    /// True when nothing was changed, including rollbacks and simulations
    /// that would not have changed anything.
    pub fn is_unchanged(&self) -> bool {
        !self.is_changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(outcome: TransactionOutcome) -> TransactionInfo {
        TransactionInfo {
            transaction_id: Uuid::new_v4(),
            record_id: RecordId::new(1),
            old_revision: RevisionNumber::new(1),
            old_status: RevisionStatus::Draft,
            new_status: RevisionStatus::Draft,
            changed_parts: BTreeSet::new(),
            structural: false,
            outcome,
        }
    }

    #[test]
    fn test_new_revision_flags() {
        let i = info(TransactionOutcome::NewRevision(RevisionNumber::new(2)));
        assert!(i.is_changed());
        assert!(i.is_new_revision());
        assert!(!i.is_unchanged());
        assert_eq!(i.new_revision(), Some(RevisionNumber::new(2)));
    }

    #[test]
    fn test_in_place_flags() {
        let i = info(TransactionOutcome::UpdatedInPlace);
        assert!(i.is_changed());
        assert!(!i.is_new_revision());
        assert_eq!(i.new_revision(), None);
    }

    #[test]
    fn test_unchanged_flags() {
        let i = info(TransactionOutcome::Unchanged);
        assert!(!i.is_changed());
        assert!(i.is_unchanged());
        assert!(!i.is_rolled_back());
    }

    #[test]
    fn test_rolled_back_flags() {
        let i = info(TransactionOutcome::RolledBack);
        assert!(i.is_rolled_back());
        assert!(!i.is_changed());
        assert_eq!(i.new_revision(), None);
    }

    #[test]
    fn test_simulated_flags() {
        let i = info(TransactionOutcome::Simulated { would_change: true });
        assert!(i.is_simulated());
        assert!(i.is_changed());
        assert!(!i.is_new_revision());
        assert_eq!(i.new_revision(), None);
    }
}
