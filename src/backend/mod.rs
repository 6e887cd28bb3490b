//! Persistence backend seam
//!
//! The engine never owns storage of revision rows. It consumes a
//! [`PersistenceBackend`] that stores rows and allocates identifiers.
//!
//! Requirements on implementations:
//! - Allocation is serialized: two callers never receive the same number
//! - Revision numbers are globally unique and strictly increasing
//! - Rows are immutable once written, except for in-place status updates

mod checksum;
mod memory;

pub use checksum::{compute_checksum, verify_checksum};
pub use memory::MemoryBackend;

use crate::errors::RevisionResult;
use crate::revision::{RecordId, RevisionData, RevisionNumber};

/// Storage and allocation authority for revision rows.
///
/// All methods take `&self`; implementations serialize internally.
pub trait PersistenceBackend: Send + Sync {
    /// Allocate a fresh record identifier.
    fn allocate_record_id(&self) -> RevisionResult<RecordId>;

    /// Allocate the next revision number for `record`.
    fn allocate_revision_number(&self, record: RecordId) -> RevisionResult<RevisionNumber>;

    /// Highest persisted revision of `record`, if any row exists.
    fn fetch_current_revision(&self, record: RecordId) -> RevisionResult<Option<RevisionNumber>>;

    /// Persist a new revision row. Fails if the row already exists.
    fn write_revision(
        &self,
        record: RecordId,
        revision: RevisionNumber,
        data: &RevisionData,
    ) -> RevisionResult<()>;

    /// Overwrite an existing revision row in place.
    fn update_revision(
        &self,
        record: RecordId,
        revision: RevisionNumber,
        data: &RevisionData,
    ) -> RevisionResult<()>;

    /// Read a revision row.
    fn read_revision(&self, record: RecordId, revision: RevisionNumber)
        -> RevisionResult<RevisionData>;

    /// Delete a revision row.
    fn delete_revision(&self, record: RecordId, revision: RevisionNumber) -> RevisionResult<()>;

    /// All persisted revisions of `record` in ascending order.
    fn list_revisions(&self, record: RecordId) -> RevisionResult<Vec<RevisionNumber>>;

    /// True if `record` has at least one persisted revision.
    fn record_exists(&self, record: RecordId) -> RevisionResult<bool> {
        Ok(self.fetch_current_revision(record)?.is_some())
    }

    /// True if any record has a persisted revision numbered `revision`.
    fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool>;
}
