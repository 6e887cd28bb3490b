//! In-memory storage of a stub record
//!
//! Exactly one revision exists, numbered [`STUB_REVISION`]. Nothing is
//! ever persisted; operations that would create or delete revisions are
//! rejected with `StubOperationNotAllowed`.

use std::rc::Rc;

use serde_json::Value;

use crate::errors::{RevisionError, RevisionResult};
use crate::revision::{RecordId, RevisionData, RevisionNumber, STUB_RECORD_ID, STUB_REVISION};

use super::{DependencyArena, DependencyHandle, Disposable, Released, RevisionStorage};

/// Storage of a stub record
#[derive(Debug)]
pub struct StubRevisionStorage {
    data: RevisionData,
    dependencies: DependencyArena,
    disposed: bool,
}

impl StubRevisionStorage {
    pub(crate) fn new(data: RevisionData) -> Self {
        Self {
            data,
            dependencies: DependencyArena::new(),
            disposed: false,
        }
    }

    fn ensure_alive(&self) -> RevisionResult<()> {
        if self.disposed {
            Err(RevisionError::disposed("revision storage"))
        } else {
            Ok(())
        }
    }

    fn ensure_stub_revision(&self, revision: RevisionNumber) -> RevisionResult<()> {
        if revision == STUB_REVISION {
            Ok(())
        } else {
            Err(RevisionError::UnknownRevision {
                record: STUB_RECORD_ID,
                revision,
            })
        }
    }
}

impl RevisionStorage for StubRevisionStorage {
    fn record_id(&self) -> RecordId {
        STUB_RECORD_ID
    }

    fn is_stub(&self) -> bool {
        true
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn has_revisions(&self) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(true)
    }

    fn get_revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        Ok(STUB_REVISION)
    }

    fn get_latest_revision(&self) -> RevisionResult<RevisionNumber> {
        self.ensure_alive()?;
        Ok(STUB_REVISION)
    }

    fn list_revisions(&self) -> RevisionResult<Vec<RevisionNumber>> {
        self.ensure_alive()?;
        Ok(vec![STUB_REVISION])
    }

    fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(revision == STUB_REVISION)
    }

    fn is_loaded(&self, revision: RevisionNumber) -> bool {
        !self.disposed && revision == STUB_REVISION
    }

    fn select_revision(&mut self, revision: RevisionNumber) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.ensure_stub_revision(revision)
    }

    fn revision_data(&self) -> RevisionResult<RevisionData> {
        self.ensure_alive()?;
        Ok(self.data.clone())
    }

    fn read_revision(&self, revision: RevisionNumber) -> RevisionResult<RevisionData> {
        self.ensure_alive()?;
        self.ensure_stub_revision(revision)?;
        Ok(self.data.clone())
    }

    fn get_key(&self, part: &str, name: &str) -> RevisionResult<Option<Value>> {
        self.ensure_alive()?;
        Ok(self.data.get_key(part, name).cloned())
    }

    fn set_key(&mut self, part: &str, name: &str, value: Value) -> RevisionResult<bool> {
        self.ensure_alive()?;
        Ok(self.data.set_key(part, name, value))
    }

    fn add_revision(
        &mut self,
        _revision: RevisionNumber,
        _data: RevisionData,
    ) -> RevisionResult<()> {
        self.ensure_alive()?;
        Err(RevisionError::stub("add_revision"))
    }

    fn update_in_place(&mut self, _data: RevisionData) -> RevisionResult<()> {
        self.ensure_alive()?;
        Err(RevisionError::stub("update_in_place"))
    }

    /// The single revision cannot be reloaded, so only dependencies are released.
    fn unload_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Released> {
        self.ensure_alive()?;
        Ok(self.dependencies.dispose_bound_to(STUB_RECORD_ID, revision))
    }

    fn remove_revision(&mut self, _revision: RevisionNumber) -> RevisionResult<Released> {
        self.ensure_alive()?;
        Err(RevisionError::stub("remove_revision"))
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
        let released = self
            .dependencies
            .dispose_bound_to(STUB_RECORD_ID, STUB_REVISION);
        self.dependencies.clear();
        Ok(released)
    }
}
