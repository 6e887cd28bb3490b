//! The Revisionable entity
//!
//! Commit sequence of `end_transaction`, fixed:
//! 1. BeforeSave (only when something will be saved)
//! 2. persist (new revision, or in-place update)
//! 3. RevisionAdded (only when a number was allocated)
//! 4. StatusChanged (only when the status differs)
//! 5. TransactionEnded (always, last)
//!
//! A failed commit discards the transaction; nothing is written.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::EngineContext;
use crate::errors::{RevisionError, RevisionResult};
use crate::events::{
    EventRegistry, ListenerId, RecordEvent, BEFORE_SAVE, DISPOSED, REVISION_ADDED,
    STATUS_CHANGED, TRANSACTION_ENDED,
};
use crate::observability::Event;
use crate::revision::{
    RecordId, RevisionAuthority, RevisionData, RevisionNumber, ALIAS_KEY, CUSTOM_KEYS_PART,
    LABEL_KEY, SETTINGS_PART,
};
use crate::state::{RevisionStatus, StateMachine};
use crate::storage::{
    DbRevisionStorage, DependencyHandle, Disposable, Released, RevisionStorage,
    StubRevisionStorage,
};
use crate::transaction::{
    CommitKind, CommitPlan, TransactionController, TransactionInfo, TransactionOutcome,
};

/// A record with numbered, immutable revisions and a revision-scoped status.
pub struct Revisionable {
    id: RecordId,
    context: Rc<EngineContext>,
    /// None for stubs
    authority: Option<Rc<RevisionAuthority>>,
    storage: Box<dyn RevisionStorage>,
    events: EventRegistry,
    transaction: Option<TransactionController>,
    disposed: bool,
}

impl Revisionable {
    /// Record over persisted storage
    pub(crate) fn persisted(
        context: Rc<EngineContext>,
        authority: Rc<RevisionAuthority>,
        storage: DbRevisionStorage,
    ) -> Self {
        Self::assemble(context, Some(authority), Box::new(storage))
    }

    /// Never-persisted stub record
    pub(crate) fn stub(context: Rc<EngineContext>, storage: StubRevisionStorage) -> Self {
        Self::assemble(context, None, Box::new(storage))
    }

    fn assemble(
        context: Rc<EngineContext>,
        authority: Option<Rc<RevisionAuthority>>,
        storage: Box<dyn RevisionStorage>,
    ) -> Self {
        let events = EventRegistry::new(context.revision_agnostic_events().clone());
        Self {
            id: storage.record_id(),
            context,
            authority,
            storage,
            events,
            transaction: None,
            disposed: false,
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn is_stub(&self) -> bool {
        self.storage.is_stub()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Selected revision
    pub fn revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        self.storage.get_revision()
    }

    /// Highest existing revision
    pub fn latest_revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        self.storage.get_latest_revision()
    }

    /// Status of the selected revision, including a status staged by the
    /// open transaction
    pub fn status(&self) -> RevisionResult<RevisionStatus> {
        self.ensure_alive()?;
        match &self.transaction {
            Some(tx) => Ok(tx.status()),
            None => Ok(self.storage.revision_data()?.status),
        }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Read a key. Inside a transaction the working copy is read.
    pub fn get_key(&self, part: &str, name: &str) -> RevisionResult<Option<Value>> {
        self.ensure_alive()?;
        self.context.schema().kind_of(part)?;
        match &self.transaction {
            Some(tx) => Ok(tx.get_key(part, name).cloned()),
            None => self.storage.get_key(part, name),
        }
    }

    /// Write a key into the open transaction. Returns true if it changed.
    pub fn set_key(&mut self, part: &str, name: &str, value: Value) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.ensure_not_stub("set_key")?;
        self.transaction_mut()?.set_key(part, name, value)
    }

    /// Remove a key in the open transaction. Returns true if it existed.
    pub fn remove_key(&mut self, part: &str, name: &str) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.ensure_not_stub("remove_key")?;
        self.transaction_mut()?.remove_key(part, name)
    }

    pub fn label(&self) -> RevisionResult<Option<String>> {
        self.string_key(SETTINGS_PART, LABEL_KEY)
    }

    pub fn set_label(&mut self, label: &str) -> RevisionResult<bool> {
        self.set_key(SETTINGS_PART, LABEL_KEY, Value::from(label))
    }

    pub fn alias(&self) -> RevisionResult<Option<String>> {
        self.string_key(SETTINGS_PART, ALIAS_KEY)
    }

    /// Set the alias. `InvalidSetting` if it does not match the configured pattern.
    pub fn set_alias(&mut self, alias: &str) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.context.validate_alias(alias)?;
        self.set_key(SETTINGS_PART, ALIAS_KEY, Value::from(alias))
    }

    pub fn custom_key(&self, name: &str) -> RevisionResult<Option<Value>> {
        self.get_key(CUSTOM_KEYS_PART, name)
    }

    pub fn set_custom_key(&mut self, name: &str, value: Value) -> RevisionResult<bool> {
        self.set_key(CUSTOM_KEYS_PART, name, value)
    }

    fn string_key(&self, part: &str, name: &str) -> RevisionResult<Option<String>> {
        Ok(self
            .get_key(part, name)?
            .and_then(|value| value.as_str().map(str::to_string)))
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Open a transaction on the selected revision.
    ///
    /// Simulated if the engine is configured for simulation.
    pub fn start_transaction(&mut self, author: &str, comment: Option<&str>) -> RevisionResult<()> {
        let simulated = self.context.simulation();
        self.begin(author, comment, simulated)
    }

    /// Open a transaction whose end allocates and writes nothing
    pub fn start_simulated_transaction(
        &mut self,
        author: &str,
        comment: Option<&str>,
    ) -> RevisionResult<()> {
        self.begin(author, comment, true)
    }

    fn begin(&mut self, author: &str, comment: Option<&str>, simulated: bool) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.ensure_not_stub("start_transaction")?;
        if self.transaction.is_some() {
            return Err(RevisionError::TransactionAlreadyActive);
        }

        let revision = self.storage.get_revision()?;
        let baseline = self.storage.revision_data()?;
        let tx = TransactionController::start(
            self.id,
            author,
            comment.map(str::to_string),
            self.context.schema().clone(),
            revision,
            baseline,
            simulated,
        );

        let id = self.id.to_string();
        let rev = revision.to_string();
        let tx_id = tx.id().to_string();
        let simulated = simulated.to_string();
        self.context.logger().info(
            Event::TransactionBegin,
            &[
                ("author", author),
                ("record_id", id.as_str()),
                ("revision", rev.as_str()),
                ("simulated", simulated.as_str()),
                ("transaction_id", tx_id.as_str()),
            ],
        );

        self.transaction = Some(tx);
        Ok(())
    }

    pub fn is_transaction_started(&self) -> bool {
        self.transaction.is_some()
    }

    /// Set the comment stored on the revision the open transaction produces
    pub fn set_transaction_comment(&mut self, comment: Option<&str>) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.transaction_mut()?
            .set_comment(comment.map(str::to_string));
        Ok(())
    }

    pub fn has_changes(&self) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.transaction()?.has_changes())
    }

    pub fn has_structural_changes(&self) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.transaction()?.has_structural_changes())
    }

    pub fn changed_parts(&self) -> RevisionResult<BTreeSet<String>> {
        self.ensure_alive()?;
        Ok(self.transaction()?.changed_parts())
    }

    pub fn is_part_changed(&self, part: &str) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.transaction()?.is_part_changed(part))
    }

    /// Commit the open transaction
    pub fn end_transaction(&mut self) -> RevisionResult<TransactionInfo> {
        self.ensure_alive()?;
        let tx = self
            .transaction
            .take()
            .ok_or(RevisionError::TransactionNotActive)?;
        let plan = tx.end();

        let info = if plan.simulated {
            self.finish_simulated(&plan)
        } else {
            match plan.kind {
                CommitKind::Unchanged => self.finish_unchanged(&plan),
                CommitKind::InPlace => self.commit_in_place(plan)?,
                CommitKind::NewRevision => self.commit_new_revision(plan)?,
            }
        };

        self.fire_transaction_ended(&info)?;
        Ok(info)
    }

    /// Discard the open transaction. The record is left exactly as it was
    /// before `start_transaction`, status included.
    pub fn rollback_transaction(&mut self) -> RevisionResult<TransactionInfo> {
        self.ensure_alive()?;
        let tx = self
            .transaction
            .take()
            .ok_or(RevisionError::TransactionNotActive)?;
        let info = tx.rollback();

        self.log_transaction(Event::TransactionRollback, &info);
        self.fire_transaction_ended(&info)?;
        Ok(info)
    }

    fn finish_unchanged(&self, plan: &CommitPlan) -> TransactionInfo {
        let info = plan.info(TransactionOutcome::Unchanged);
        self.log_transaction(Event::TransactionUnchanged, &info);
        info
    }

    fn finish_simulated(&mut self, plan: &CommitPlan) -> TransactionInfo {
        let would_change = plan.is_change();
        let info = plan.info(TransactionOutcome::Simulated { would_change });
        if would_change {
            self.fire(RecordEvent::new(BEFORE_SAVE, self.id, plan.old_revision));
        }
        self.log_transaction(Event::TransactionSimulated, &info);
        info
    }

    fn commit_in_place(&mut self, plan: CommitPlan) -> RevisionResult<TransactionInfo> {
        let info = plan.info(TransactionOutcome::UpdatedInPlace);
        self.fire(RecordEvent::new(BEFORE_SAVE, self.id, plan.old_revision));

        self.storage.update_in_place(plan.data)?;

        self.log_transaction(Event::TransactionCommit, &info);
        self.notify_status_change(info.old_status, info.new_status)?;
        Ok(info)
    }

    fn commit_new_revision(&mut self, plan: CommitPlan) -> RevisionResult<TransactionInfo> {
        let authority = self
            .authority
            .clone()
            .ok_or_else(|| RevisionError::stub("end_transaction"))?;

        self.fire(RecordEvent::new(BEFORE_SAVE, self.id, plan.old_revision));

        let revision = authority.allocate(self.id)?;
        let info = plan.info(TransactionOutcome::NewRevision(revision));
        self.storage.add_revision(revision, plan.data)?;

        let id = self.id.to_string();
        let rev = revision.to_string();
        let status = info.new_status.to_string();
        self.context.logger().info(
            Event::RevisionAdded,
            &[
                ("record_id", id.as_str()),
                ("revision", rev.as_str()),
                ("status", status.as_str()),
            ],
        );
        self.log_transaction(Event::TransactionCommit, &info);

        self.fire(RecordEvent::new(REVISION_ADDED, self.id, revision).with_transaction(info.clone()));
        if info.old_status != info.new_status {
            self.notify_status_change(info.old_status, info.new_status)?;
        }
        Ok(info)
    }

    fn fire_transaction_ended(&mut self, info: &TransactionInfo) -> RevisionResult<()> {
        let revision = self.storage.get_revision()?;
        self.fire(RecordEvent::new(TRANSACTION_ENDED, self.id, revision).with_transaction(info.clone()));
        Ok(())
    }

    fn log_transaction(&self, event: Event, info: &TransactionInfo) {
        let id = self.id.to_string();
        let old = info.old_revision.to_string();
        let new = info
            .new_revision()
            .map(|revision| revision.to_string())
            .unwrap_or_else(|| "none".to_string());
        let parts = info.changed_parts.iter().cloned().collect::<Vec<_>>().join(",");
        let structural = info.structural.to_string();
        let tx_id = info.transaction_id.to_string();
        self.context.logger().info(
            event,
            &[
                ("changed_parts", parts.as_str()),
                ("new_revision", new.as_str()),
                ("old_revision", old.as_str()),
                ("record_id", id.as_str()),
                ("structural", structural.as_str()),
                ("transaction_id", tx_id.as_str()),
            ],
        );
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn can_be_finalized(&self) -> RevisionResult<bool> {
        Ok(StateMachine::can_be_finalized(self.status()?))
    }

    pub fn can_be_deleted(&self) -> RevisionResult<bool> {
        Ok(StateMachine::can_be_deleted(self.status()?))
    }

    pub fn can_be_made_inactive(&self) -> RevisionResult<bool> {
        Ok(StateMachine::can_be_made_inactive(self.status()?))
    }

    pub fn make_finalized(&mut self) -> RevisionResult<()> {
        self.change_status(RevisionStatus::Finalized)
    }

    pub fn make_inactive(&mut self) -> RevisionResult<()> {
        self.change_status(RevisionStatus::Inactive)
    }

    pub fn make_draft(&mut self) -> RevisionResult<()> {
        self.change_status(RevisionStatus::Draft)
    }

    pub fn make_deleted(&mut self) -> RevisionResult<()> {
        self.change_status(RevisionStatus::Deleted)
    }

    /// Inside a transaction the change is staged; otherwise the selected
    /// revision is updated in place.
    fn change_status(&mut self, to: RevisionStatus) -> RevisionResult<()> {
        self.ensure_alive()?;
        if let Some(tx) = self.transaction.as_mut() {
            return tx.stage_status(to);
        }
        self.ensure_not_stub("change_status")?;

        let mut data = self.storage.revision_data()?;
        let from = data.status;
        data.status = StateMachine::request(from, to)?;
        self.storage.update_in_place(data)?;
        self.notify_status_change(from, to)
    }

    fn notify_status_change(
        &mut self,
        from: RevisionStatus,
        to: RevisionStatus,
    ) -> RevisionResult<()> {
        let revision = self.storage.get_revision()?;

        let id = self.id.to_string();
        let rev = revision.to_string();
        self.context.logger().info(
            Event::StatusChanged,
            &[
                ("from", from.as_str()),
                ("record_id", id.as_str()),
                ("revision", rev.as_str()),
                ("to", to.as_str()),
            ],
        );

        self.fire(RecordEvent::new(STATUS_CHANGED, self.id, revision).with_status_change(from, to));
        Ok(())
    }

    // =========================================================================
    // Revisions
    // =========================================================================

    /// Switch the selected revision. Rejected while a transaction is open.
    pub fn select_revision(&mut self, revision: RevisionNumber) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.ensure_no_transaction()?;
        self.storage.select_revision(revision)
    }

    pub fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.storage.revision_exists(revision)
    }

    pub fn has_revisions(&self) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.storage.has_revisions()
    }

    pub fn count_revisions(&self) -> RevisionResult<usize> {
        self.ensure_alive()?;
        Ok(self.storage.list_revisions()?.len())
    }

    /// All revisions in ascending order
    pub fn revisions(&self) -> RevisionResult<Vec<RevisionNumber>> {
        self.ensure_alive()?;
        self.storage.list_revisions()
    }

    /// Data of the selected revision as persisted
    pub fn revision_data(&self) -> RevisionResult<RevisionData> {
        self.ensure_alive()?;
        self.storage.revision_data()
    }

    pub fn revision_author(&self) -> RevisionResult<String> {
        Ok(self.revision_data()?.author)
    }

    pub fn revision_comment(&self) -> RevisionResult<Option<String>> {
        Ok(self.revision_data()?.comment)
    }

    pub fn revision_date(&self) -> RevisionResult<DateTime<Utc>> {
        Ok(self.revision_data()?.created_at)
    }

    /// True if `revision` is held in memory
    pub fn is_revision_loaded(&self, revision: RevisionNumber) -> bool {
        !self.disposed && self.storage.is_loaded(revision)
    }

    /// Drop the cached copy of `revision` and the dependencies bound to it.
    ///
    /// Every bound dependency is attempted; the first failure is returned
    /// after the cache entry is gone.
    pub fn unload_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Vec<String>> {
        self.ensure_alive()?;
        let released = self.storage.unload_revision(revision)?;

        let id = self.id.to_string();
        let rev = revision.to_string();
        self.context.logger().trace(
            Event::RevisionUnloaded,
            &[("record_id", id.as_str()), ("revision", rev.as_str())],
        );
        self.log_released(revision, released)
    }

    /// Delete `revision`. Rejected for stubs, while a transaction is open,
    /// and for the only revision. Listeners and suppressions bound to it are
    /// dropped.
    pub fn remove_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Vec<String>> {
        self.ensure_alive()?;
        self.ensure_not_stub("remove_revision")?;
        self.ensure_no_transaction()?;
        let released = self.storage.remove_revision(revision)?;
        let pruned = self.events.forget_revision(revision);

        let id = self.id.to_string();
        let rev = revision.to_string();
        let listeners = pruned.to_string();
        self.context.logger().info(
            Event::RevisionRemoved,
            &[
                ("listeners", listeners.as_str()),
                ("record_id", id.as_str()),
                ("revision", rev.as_str()),
            ],
        );
        self.log_released(revision, released)
    }

    /// Log a cascade outcome; names on success, the first failure otherwise
    fn log_released(
        &self,
        revision: RevisionNumber,
        released: Released,
    ) -> RevisionResult<Vec<String>> {
        let id = self.id.to_string();
        let rev = revision.to_string();
        for name in &released.names {
            self.context.logger().trace(
                Event::DependencyDisposed,
                &[
                    ("name", name.as_str()),
                    ("record_id", id.as_str()),
                    ("revision", rev.as_str()),
                ],
            );
        }
        if let Some(err) = &released.error {
            let code = err.code();
            for name in &released.failed {
                self.context.logger().warn(
                    Event::DependencyDisposeFailed,
                    &[
                        ("error_code", code),
                        ("name", name.as_str()),
                        ("record_id", id.as_str()),
                        ("revision", rev.as_str()),
                    ],
                );
            }
        }
        released.into_result()
    }

    // =========================================================================
    // Dependencies
    // =========================================================================

    /// Attach a disposable dependency under `name`
    pub fn set_private_key(
        &mut self,
        name: &str,
        dependency: Rc<dyn Disposable>,
    ) -> RevisionResult<DependencyHandle> {
        self.ensure_alive()?;
        self.storage.set_private_key(name, dependency)
    }

    pub fn get_private_key(&self, name: &str) -> RevisionResult<Option<Rc<dyn Disposable>>> {
        self.ensure_alive()?;
        self.storage.get_private_key(name)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a listener bound to the selected revision, unless the event
    /// is declared revision-agnostic
    pub fn add_listener(
        &mut self,
        name: &str,
        callback: impl FnMut(&RecordEvent) + 'static,
    ) -> RevisionResult<ListenerId> {
        self.ensure_alive()?;
        let selected = self.storage.get_revision()?;
        Ok(self.events.add_listener(name, selected, Box::new(callback)))
    }

    /// Register a listener that fires whichever revision is selected
    pub fn add_revision_agnostic_listener(
        &mut self,
        name: &str,
        callback: impl FnMut(&RecordEvent) + 'static,
    ) -> RevisionResult<ListenerId> {
        self.ensure_alive()?;
        Ok(self
            .events
            .add_revision_agnostic_listener(name, Box::new(callback)))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.events.remove_listener(id))
    }

    /// Suppress `name` while the selected revision stays selected, or
    /// globally for revision-agnostic events
    pub fn ignore_event(&mut self, name: &str) -> RevisionResult<()> {
        self.ensure_alive()?;
        let selected = self.storage.get_revision()?;
        self.events.ignore(name, selected);
        Ok(())
    }

    pub fn unignore_event(&mut self, name: &str) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.events.unignore(name);
        Ok(())
    }

    pub fn is_event_ignored(&self, name: &str) -> RevisionResult<bool> {
        self.ensure_alive()?;
        let selected = self.storage.get_revision()?;
        Ok(self.events.is_ignored(name, selected))
    }

    /// Fire a custom event. Returns the number of listeners called.
    pub fn trigger_event(&mut self, name: &str) -> RevisionResult<usize> {
        self.ensure_alive()?;
        let selected = self.storage.get_revision()?;
        Ok(self.fire(RecordEvent::new(name, self.id, selected)))
    }

    fn fire(&mut self, event: RecordEvent) -> usize {
        self.events.trigger(&event)
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Release this instance.
    ///
    /// An open transaction is rolled back first. The storage is disposed
    /// together with the dependencies bound to the revision selected now.
    /// A dependency that fails to dispose does not stop the others; the
    /// instance ends up disposed and the first failure is returned.
    pub fn dispose(&mut self) -> RevisionResult<()> {
        self.ensure_alive()?;
        if self.transaction.is_some() {
            self.rollback_transaction()?;
        }

        let revision = self.storage.get_revision()?;
        self.fire(RecordEvent::new(DISPOSED, self.id, revision));

        let released = self.storage.dispose()?;
        let count = released.names.len().to_string();
        self.events.clear();
        self.disposed = true;

        let id = self.id.to_string();
        let rev = revision.to_string();
        self.context.logger().info(
            Event::RecordDisposed,
            &[
                ("dependencies", count.as_str()),
                ("record_id", id.as_str()),
                ("revision", rev.as_str()),
            ],
        );
        self.log_released(revision, released).map(|_| ())
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn ensure_alive(&self) -> RevisionResult<()> {
        if self.disposed {
            Err(RevisionError::disposed("record"))
        } else {
            Ok(())
        }
    }

    fn ensure_not_stub(&self, operation: &'static str) -> RevisionResult<()> {
        if self.is_stub() {
            Err(RevisionError::stub(operation))
        } else {
            Ok(())
        }
    }

    fn ensure_no_transaction(&self) -> RevisionResult<()> {
        if self.transaction.is_some() {
            Err(RevisionError::TransactionAlreadyActive)
        } else {
            Ok(())
        }
    }

    fn transaction(&self) -> RevisionResult<&TransactionController> {
        self.transaction
            .as_ref()
            .ok_or(RevisionError::TransactionNotActive)
    }

    fn transaction_mut(&mut self) -> RevisionResult<&mut TransactionController> {
        self.transaction
            .as_mut()
            .ok_or(RevisionError::TransactionNotActive)
    }
}

impl fmt::Debug for Revisionable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Revisionable")
            .field("id", &self.id)
            .field("stub", &self.is_stub())
            .field("transaction", &self.transaction.as_ref().map(|tx| tx.id()))
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::STUB_REVISION;
    use crate::storage::DisposableResource;

    fn stub() -> Revisionable {
        let context = Rc::new(
            EngineContext::with_defaults()
                .unwrap()
                .with_logger(crate::observability::Logger::disabled()),
        );
        let data = RevisionData::new(RevisionStatus::Draft, "system");
        Revisionable::stub(context, StubRevisionStorage::new(data))
    }

    #[test]
    fn test_stub_rejects_transactions() {
        let mut record = stub();
        assert!(record.is_stub());
        assert_eq!(record.revision().unwrap(), STUB_REVISION);

        let result = record.start_transaction("tester", None);
        assert!(matches!(
            result,
            Err(RevisionError::StubOperationNotAllowed { operation: "start_transaction" })
        ));
        assert!(!record.is_transaction_started());
    }

    #[test]
    fn test_stub_rejects_mutation() {
        let mut record = stub();
        assert!(matches!(
            record.set_label("x"),
            Err(RevisionError::StubOperationNotAllowed { .. })
        ));
        assert!(matches!(
            record.make_finalized(),
            Err(RevisionError::StubOperationNotAllowed { .. })
        ));
    }

    #[test]
    fn test_queries_without_transaction() {
        let record = stub();
        assert!(matches!(
            record.has_changes(),
            Err(RevisionError::TransactionNotActive)
        ));
        assert!(matches!(
            record.get_key("nope", "k"),
            Err(RevisionError::UnknownStoragePart(_))
        ));
        assert_eq!(record.custom_key("missing").unwrap(), None);
    }

    #[test]
    fn test_disposed_stub_rejects_everything() {
        let mut record = stub();
        let bound = DisposableResource::bound("view", record.id(), STUB_REVISION);
        record.set_private_key("view", bound.clone()).unwrap();

        record.dispose().unwrap();
        assert!(record.is_disposed());
        assert!(bound.is_disposed());

        assert!(matches!(record.revision(), Err(RevisionError::DisposedInstance { .. })));
        assert!(matches!(record.label(), Err(RevisionError::DisposedInstance { .. })));
        assert!(matches!(
            record.trigger_event("Custom"),
            Err(RevisionError::DisposedInstance { .. })
        ));
        assert!(matches!(record.dispose(), Err(RevisionError::DisposedInstance { .. })));
    }
}
