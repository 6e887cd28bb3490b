//! Revision Authority - allocation of record ids and revision numbers
//!
//! - The persistence backend is the sole source of new numbers
//! - Numbers are assigned exactly once, as part of a commit
//! - Per record, every allocated number must exceed every number seen
//!
//! The authority does not store revision data. It only tracks the highest
//! number observed per record so that a misbehaving backend is detected
//! before a number is reused.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::PersistenceBackend;
use crate::errors::{RevisionError, RevisionResult};

use super::{RecordId, RevisionNumber};

/// Allocation authority shared by a collection and the records it owns.
pub struct RevisionAuthority {
    backend: Arc<dyn PersistenceBackend>,
    /// Highest revision observed or allocated per record.
    highest: RefCell<HashMap<RecordId, RevisionNumber>>,
}

impl RevisionAuthority {
    /// Create an authority over the given backend
    pub fn new(backend: Arc<dyn PersistenceBackend>) -> Self {
        Self {
            backend,
            highest: RefCell::new(HashMap::new()),
        }
    }

    /// The backend this authority allocates from
    pub fn backend(&self) -> &Arc<dyn PersistenceBackend> {
        &self.backend
    }

    /// Allocate a fresh record identifier.
    pub fn allocate_record_id(&self) -> RevisionResult<RecordId> {
        self.backend.allocate_record_id()
    }

    /// Allocate the next revision number for `record`.
    ///
    /// Returns `NonMonotonicRevision` if the backend hands out a number that
    /// is not strictly greater than every number already seen for the record.
    pub fn allocate(&self, record: RecordId) -> RevisionResult<RevisionNumber> {
        let allocated = self.backend.allocate_revision_number(record)?;
        let mut highest = self.highest.borrow_mut();
        if let Some(&current) = highest.get(&record) {
            if allocated <= current {
                return Err(RevisionError::NonMonotonicRevision {
                    record,
                    attempted: allocated,
                    highest: current,
                });
            }
        }
        highest.insert(record, allocated);
        Ok(allocated)
    }

    /// Record a revision number observed while loading persisted rows.
    pub fn observe(&self, record: RecordId, revision: RevisionNumber) {
        let mut highest = self.highest.borrow_mut();
        let entry = highest.entry(record).or_insert(revision);
        if revision > *entry {
            *entry = revision;
        }
    }

    /// Highest revision observed or allocated for `record`.
    pub fn highest(&self, record: RecordId) -> Option<RevisionNumber> {
        self.highest.borrow().get(&record).copied()
    }
}

impl std::fmt::Debug for RevisionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionAuthority")
            .field("highest", &self.highest.borrow())
            .finish_non_exhaustive()
    }
}
