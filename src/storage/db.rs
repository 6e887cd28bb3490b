//! Backend-backed revision storage
//!
//! Reads go through a per-revision cache filled lazily from the backend.
//! Every revision read is reported to the [`RevisionAuthority`] so later
//! allocations are checked against it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::errors::{RevisionError, RevisionResult};
use crate::revision::{RecordId, RevisionAuthority, RevisionData, RevisionNumber};

use super::{DependencyArena, DependencyHandle, Disposable, Released, RevisionStorage};

/// Storage of a persisted record
#[derive(Debug)]
pub struct DbRevisionStorage {
    record_id: RecordId,
    authority: Rc<RevisionAuthority>,
    selected: RevisionNumber,
    cache: RefCell<BTreeMap<RevisionNumber, RevisionData>>,
    dependencies: DependencyArena,
    disposed: bool,
}

impl DbRevisionStorage {
    /// Open storage of `record_id` with `selected` as the selected revision.
    ///
    /// Nothing is read until the first access.
    pub(crate) fn open(
        record_id: RecordId,
        authority: Rc<RevisionAuthority>,
        selected: RevisionNumber,
    ) -> Self {
        authority.observe(record_id, selected);
        Self {
            record_id,
            authority,
            selected,
            cache: RefCell::new(BTreeMap::new()),
            dependencies: DependencyArena::new(),
            disposed: false,
        }
    }

    /// Open storage at the record's latest persisted revision.
    ///
    /// `UnknownRecord` if no revision exists.
    pub(crate) fn open_latest(record_id: RecordId, authority: Rc<RevisionAuthority>) -> RevisionResult<Self> {
        let latest = authority
            .backend()
            .fetch_current_revision(record_id)?
            .ok_or(RevisionError::UnknownRecord(record_id))?;
        Ok(Self::open(record_id, authority, latest))
    }

    fn ensure_alive(&self) -> RevisionResult<()> {
        if self.disposed {
            Err(RevisionError::disposed("revision storage"))
        } else {
            Ok(())
        }
    }

    /// Cached copy of `revision`, loading it on a miss
    fn load(&self, revision: RevisionNumber) -> RevisionResult<RevisionData> {
        if let Some(data) = self.cache.borrow().get(&revision) {
            return Ok(data.clone());
        }

        let data = self
            .authority
            .backend()
            .read_revision(self.record_id, revision)?;
        self.authority.observe(self.record_id, revision);
        self.cache.borrow_mut().insert(revision, data.clone());
        Ok(data)
    }

    fn persisted(&self) -> RevisionResult<Vec<RevisionNumber>> {
        self.authority.backend().list_revisions(self.record_id)
    }
}

impl RevisionStorage for DbRevisionStorage {
    fn record_id(&self) -> RecordId {
        self.record_id
    }

    fn is_stub(&self) -> bool {
        false
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn has_revisions(&self) -> RevisionResult<bool> {
        self.ensure_alive()?;
        self.authority.backend().record_exists(self.record_id)
    }

    fn get_revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        Ok(self.selected)
    }

    fn get_latest_revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        self.authority
            .backend()
            .fetch_current_revision(self.record_id)?
            .ok_or(RevisionError::UnknownRecord(self.record_id))
    }

    fn list_revisions(&self) -> RevisionResult<Vec<RevisionNumber>> {
        self.ensure_alive()?;
        self.persisted()
    }

    fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.persisted()?.contains(&revision))
    }

    fn is_loaded(&self, revision: RevisionNumber) -> bool {
        self.cache.borrow().contains_key(&revision)
    }

    fn select_revision(&mut self, revision: RevisionNumber) -> RevisionResult<()> {
        self.ensure_alive()?;
        if !self.persisted()?.contains(&revision) {
            return Err(RevisionError::UnknownRevision {
                record: self.record_id,
                revision,
            });
        }
        self.selected = revision;
        Ok(())
    }

    fn revision_data(&self) -> RevisionResult<RevisionData> {
        self.ensure_alive()?;
        self.load(self.selected)
    }

    fn read_revision(&self, revision: RevisionNumber) -> RevisionResult<RevisionData> {
        self.ensure_alive()?;
        self.load(revision)
    }

    fn get_key(&self, part: &str, name: &str) -> RevisionResult<Option<Value>> {
        self.ensure_alive()?;
        Ok(self.load(self.selected)?.get_key(part, name).cloned())
    }

    fn set_key(&mut self, part: &str, name: &str, value: Value) -> RevisionResult<bool> {
        self.ensure_alive()?;
        let mut data = self.load(self.selected)?;
        if !data.set_key(part, name, value) {
            return Ok(false);
        }
        self.update_in_place(data)?;
        Ok(true)
    }

    fn add_revision(
        &mut self,
        revision: RevisionNumber,
        data: RevisionData,
    ) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.authority
            .backend()
            .write_revision(self.record_id, revision, &data)?;
        self.cache.borrow_mut().insert(revision, data);
        self.selected = revision;
        Ok(())
    }

    fn update_in_place(&mut self, data: RevisionData) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.authority
            .backend()
            .update_revision(self.record_id, self.selected, &data)?;
        self.cache.borrow_mut().insert(self.selected, data);
        Ok(())
    }

    fn unload_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Released> {
        self.ensure_alive()?;
        self.cache.borrow_mut().remove(&revision);
        Ok(self.dependencies.dispose_bound_to(self.record_id, revision))
    }

    fn remove_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Released> {
        self.ensure_alive()?;
        let persisted = self.persisted()?;
        if !persisted.contains(&revision) {
            return Err(RevisionError::UnknownRevision {
                record: self.record_id,
                revision,
            });
        }
        if persisted.len() == 1 {
            return Err(RevisionError::LastRevision {
                record: self.record_id,
                revision,
            });
        }

        self.authority
            .backend()
            .delete_revision(self.record_id, revision)?;
        self.cache.borrow_mut().remove(&revision);

        if self.selected == revision {
            self.selected = self.get_latest_revision()?;
        }

        Ok(self.dependencies.dispose_bound_to(self.record_id, revision))
    }

    fn set_private_key(
        &mut self,
        name: &str,
        dependency: Rc<dyn Disposable>,
    ) -> RevisionResult<DependencyHandle> {
        self.ensure_alive()?;
        Ok(self.dependencies.insert(name, dependency))
    }

    fn get_private_key(&self, name: &str) -> RevisionResult<Option<Rc<dyn Disposable>>> {
        self.ensure_alive()?;
        Ok(self.dependencies.get(name))
    }

    fn dispose(&mut self) -> RevisionResult<Released> {
        self.ensure_alive()?;
        self.disposed = true;
        self.cache.borrow_mut().clear();
        let released = self
            .dependencies
            .dispose_bound_to(self.record_id, self.selected);
        self.dependencies.clear();
        Ok(released)
    }
}
