//! Transaction Controller
//!
//! Tracks one in-progress mutation batch against a record:
//! - baseline snapshot taken at start
//! - working copy receiving every write
//! - per-part change detection against the baseline
//!
//! The controller never touches storage. Ending a transaction produces a
//! [`CommitPlan`]; the record executes it.
//!
//! Decision on end:
//! 1. No data and no status difference → Unchanged
//! 2. Data differs → NewRevision, status via `StateMachine::commit_status`
//! 3. Only the status differs → InPlace update of the selected revision

use std::collections::BTreeSet;

use serde_json::Value;
use uuid::Uuid;

use crate::errors::RevisionResult;
use crate::revision::{PartSchema, RecordId, RevisionData, RevisionNumber};
use crate::state::{RevisionStatus, StateMachine};

use super::{TransactionInfo, TransactionOutcome};

/// How a plan must be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Unchanged,
    InPlace,
    NewRevision,
}

/// Decision produced when a transaction ends
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub kind: CommitKind,
    pub transaction_id: Uuid,
    pub record_id: RecordId,
    pub old_revision: RevisionNumber,
    pub old_status: RevisionStatus,
    /// Data to persist: the new revision, or the in-place replacement
    pub data: RevisionData,
    pub changed_parts: BTreeSet<String>,
    pub structural: bool,
    pub simulated: bool,
}

impl CommitPlan {
    /// True if applying the plan would change anything
    pub fn is_change(&self) -> bool {
        self.kind != CommitKind::Unchanged
    }

    /// Summary for the given outcome
    pub fn info(&self, outcome: TransactionOutcome) -> TransactionInfo {
        TransactionInfo {
            transaction_id: self.transaction_id,
            record_id: self.record_id,
            old_revision: self.old_revision,
            old_status: self.old_status,
            new_status: self.data.status,
            changed_parts: self.changed_parts.clone(),
            structural: self.structural,
            outcome,
        }
    }
}

/// In-progress transaction
#[derive(Debug, Clone)]
pub struct TransactionController {
    id: Uuid,
    record_id: RecordId,
    author: String,
    comment: Option<String>,
    simulated: bool,
    schema: PartSchema,
    baseline_revision: RevisionNumber,
    baseline: RevisionData,
    working: RevisionData,
}

impl TransactionController {
    /// Start a transaction on top of `baseline`, the selected revision.
    pub fn start(
        record_id: RecordId,
        author: impl Into<String>,
        comment: Option<String>,
        schema: PartSchema,
        baseline_revision: RevisionNumber,
        baseline: RevisionData,
        simulated: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            record_id,
            author: author.into(),
            comment,
            simulated,
            schema,
            baseline_revision,
            working: baseline.clone(),
            baseline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Revision selected when the transaction started
    pub fn baseline_revision(&self) -> RevisionNumber {
        self.baseline_revision
    }

    /// Snapshot taken at start
    pub fn baseline(&self) -> &RevisionData {
        &self.baseline
    }

    /// Current working copy
    pub fn working(&self) -> &RevisionData {
        &self.working
    }

    /// Read a key from the working copy
    pub fn get_key(&self, part: &str, name: &str) -> Option<&Value> {
        self.working.get_key(part, name)
    }

    /// Write a key to the working copy. The part must be declared.
    ///
    /// Returns true if the working copy changed.
    pub fn set_key(&mut self, part: &str, name: &str, value: Value) -> RevisionResult<bool> {
        self.schema.kind_of(part)?;
        Ok(self.working.set_key(part, name, value))
    }

    /// Remove a key from the working copy. The part must be declared.
    pub fn remove_key(&mut self, part: &str, name: &str) -> RevisionResult<bool> {
        self.schema.kind_of(part)?;
        Ok(self.working.remove_key(part, name))
    }

    /// Set the comment stored on the revision this transaction produces
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    /// Status of the working copy
    pub fn status(&self) -> RevisionStatus {
        self.working.status
    }

    /// Stage a status transition on the working copy
    pub fn stage_status(&mut self, to: RevisionStatus) -> RevisionResult<()> {
        self.working.status = StateMachine::request(self.working.status, to)?;
        Ok(())
    }

    /// True if data or status differ from the baseline
    pub fn has_changes(&self) -> bool {
        self.has_data_changes() || self.working.status != self.baseline.status
    }

    /// True if any key differs from the baseline
    pub fn has_data_changes(&self) -> bool {
        !self.changed_parts().is_empty()
    }

    /// True if any changed part is structural
    pub fn has_structural_changes(&self) -> bool {
        self.schema.any_structural(&self.changed_parts())
    }

    /// Parts whose data differs from the baseline
    pub fn changed_parts(&self) -> BTreeSet<String> {
        self.working.changed_parts(&self.baseline)
    }

    /// True if `part` differs from the baseline
    pub fn is_part_changed(&self, part: &str) -> bool {
        self.working.part(part) != self.baseline.part(part)
    }

    /// Decide what ending this transaction does
    pub fn end(self) -> CommitPlan {
        let changed_parts = self.changed_parts();
        let structural = self.schema.any_structural(&changed_parts);
        let old_status = self.baseline.status;

        let (kind, data) = if !changed_parts.is_empty() {
            let status = StateMachine::commit_status(self.working.status, structural);
            let data = self.working.successor(status, self.author, self.comment);
            (CommitKind::NewRevision, data)
        } else if self.working.status != old_status {
            let mut data = self.baseline;
            data.status = self.working.status;
            (CommitKind::InPlace, data)
        } else {
            (CommitKind::Unchanged, self.baseline)
        };

        CommitPlan {
            kind,
            transaction_id: self.id,
            record_id: self.record_id,
            old_revision: self.baseline_revision,
            old_status,
            data,
            changed_parts,
            structural,
            simulated: self.simulated,
        }
    }

    /// Discard the working copy
    pub fn rollback(self) -> TransactionInfo {
        TransactionInfo {
            transaction_id: self.id,
            record_id: self.record_id,
            old_revision: self.baseline_revision,
            old_status: self.baseline.status,
            new_status: self.baseline.status,
            changed_parts: BTreeSet::new(),
            structural: false,
            outcome: TransactionOutcome::RolledBack,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RevisionError;
    use crate::revision::{CUSTOM_KEYS_PART, LABEL_KEY, SETTINGS_PART};
    use serde_json::json;

    fn start(status: RevisionStatus) -> TransactionController {
        let mut baseline = RevisionData::new(status, "creator");
        baseline.set_key(SETTINGS_PART, LABEL_KEY, json!("FooBar"));
        TransactionController::start(
            RecordId::new(1),
            "editor",
            Some("edit".to_string()),
            PartSchema::default(),
            RevisionNumber::new(1),
            baseline,
            false,
        )
    }

    #[test]
    fn test_no_changes_is_unchanged() {
        let tx = start(RevisionStatus::Draft);
        assert!(!tx.has_changes());

        let plan = tx.end();
        assert_eq!(plan.kind, CommitKind::Unchanged);
        assert!(!plan.is_change());
    }

    #[test]
    fn test_same_value_is_not_a_change() {
        let mut tx = start(RevisionStatus::Draft);
        assert!(!tx.set_key(SETTINGS_PART, LABEL_KEY, json!("FooBar")).unwrap());
        assert!(!tx.has_changes());
    }

    #[test]
    fn test_non_structural_change_keeps_finalized() {
        let mut tx = start(RevisionStatus::Finalized);
        tx.set_key(SETTINGS_PART, LABEL_KEY, json!("New label")).unwrap();

        assert!(tx.has_changes());
        assert!(!tx.has_structural_changes());
        assert!(tx.is_part_changed(SETTINGS_PART));
        assert!(!tx.is_part_changed(CUSTOM_KEYS_PART));

        let plan = tx.end();
        assert_eq!(plan.kind, CommitKind::NewRevision);
        assert_eq!(plan.data.status, RevisionStatus::Finalized);
        assert_eq!(plan.data.author, "editor");
        assert_eq!(plan.data.comment.as_deref(), Some("edit"));
    }

    #[test]
    fn test_structural_change_drops_finalized() {
        let mut tx = start(RevisionStatus::Finalized);
        tx.set_key(CUSTOM_KEYS_PART, "layout", json!("X")).unwrap();
        assert!(tx.has_structural_changes());

        let plan = tx.end();
        assert_eq!(plan.kind, CommitKind::NewRevision);
        assert!(plan.structural);
        assert_eq!(plan.old_status, RevisionStatus::Finalized);
        assert_eq!(plan.data.status, RevisionStatus::Draft);
        assert_eq!(plan.data.get_key(CUSTOM_KEYS_PART, "layout"), Some(&json!("X")));
        // Unchanged parts are carried forward
        assert_eq!(plan.data.get_key(SETTINGS_PART, LABEL_KEY), Some(&json!("FooBar")));
    }

    #[test]
    fn test_status_only_is_in_place() {
        let mut tx = start(RevisionStatus::Draft);
        tx.stage_status(RevisionStatus::Finalized).unwrap();
        assert!(tx.has_changes());
        assert!(!tx.has_data_changes());

        let plan = tx.end();
        assert_eq!(plan.kind, CommitKind::InPlace);
        assert_eq!(plan.data.status, RevisionStatus::Finalized);
        assert_eq!(plan.data.author, "creator");
    }

    #[test]
    fn test_staged_status_checked_against_working_copy() {
        let mut tx = start(RevisionStatus::Draft);
        tx.stage_status(RevisionStatus::Finalized).unwrap();
        tx.stage_status(RevisionStatus::Inactive).unwrap();

        let result = tx.stage_status(RevisionStatus::Finalized);
        assert!(matches!(result, Err(RevisionError::InvalidStateChange { .. })));
        assert_eq!(tx.status(), RevisionStatus::Inactive);
    }

    #[test]
    fn test_unknown_part_rejected() {
        let mut tx = start(RevisionStatus::Draft);
        let result = tx.set_key("nope", "k", json!(1));
        assert!(matches!(result, Err(RevisionError::UnknownStoragePart(_))));
    }

    #[test]
    fn test_rollback_reports_baseline() {
        let mut tx = start(RevisionStatus::Finalized);
        tx.set_key(CUSTOM_KEYS_PART, "layout", json!("X")).unwrap();
        tx.stage_status(RevisionStatus::Inactive).unwrap();

        let info = tx.rollback();
        assert!(info.is_rolled_back());
        assert!(!info.is_changed());
        assert_eq!(info.new_status, RevisionStatus::Finalized);
        assert_eq!(info.old_revision, RevisionNumber::new(1));
    }
}
