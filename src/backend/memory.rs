//! In-memory persistence backend
//!
//! - One mutex guards all state, so allocation is serialized
//! - Revision numbers come from a single global counter
//! - Rows are stored as canonical JSON with a CRC32 checksum

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::errors::{RevisionError, RevisionResult};
use crate::revision::{RecordId, RevisionData, RevisionNumber};

use super::checksum::{compute_checksum, verify_checksum};
use super::PersistenceBackend;

/// A persisted revision row
#[derive(Debug, Clone)]
struct PersistedRow {
    payload: Vec<u8>,
    checksum: u32,
}

impl PersistedRow {
    fn encode(data: &RevisionData) -> RevisionResult<Self> {
        let payload = serde_json::to_vec(data)?;
        let checksum = compute_checksum(&payload);
        Ok(Self { payload, checksum })
    }

    fn decode(&self, record: RecordId, revision: RevisionNumber) -> RevisionResult<RevisionData> {
        if !verify_checksum(&self.payload, self.checksum) {
            return Err(RevisionError::ChecksumMismatch { record, revision });
        }
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    highest_record_id: u64,
    highest_revision: u64,
    rows: BTreeMap<RecordId, BTreeMap<RevisionNumber, PersistedRow>>,
}

/// Thread-safe in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RevisionResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RevisionError::backend("Lock poisoned"))
    }

    /// Number of stored rows across all records
    pub fn row_count(&self) -> RevisionResult<usize> {
        Ok(self.lock()?.rows.values().map(BTreeMap::len).sum())
    }

    #[cfg(test)]
    fn corrupt(&self, record: RecordId, revision: RevisionNumber) {
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .get_mut(&record)
            .and_then(|revs| revs.get_mut(&revision))
            .unwrap();
        row.payload[0] ^= 0xFF;
    }
}

impl PersistenceBackend for MemoryBackend {
    fn allocate_record_id(&self) -> RevisionResult<RecordId> {
        let mut state = self.lock()?;
        state.highest_record_id += 1;
        Ok(RecordId::new(state.highest_record_id))
    }

    fn allocate_revision_number(&self, _record: RecordId) -> RevisionResult<RevisionNumber> {
        let mut state = self.lock()?;
        state.highest_revision += 1;
        Ok(RevisionNumber::new(state.highest_revision))
    }

    fn fetch_current_revision(&self, record: RecordId) -> RevisionResult<Option<RevisionNumber>> {
        let state = self.lock()?;
        Ok(state
            .rows
            .get(&record)
            .and_then(|revs| revs.keys().next_back().copied()))
    }

    fn write_revision(
        &self,
        record: RecordId,
        revision: RevisionNumber,
        data: &RevisionData,
    ) -> RevisionResult<()> {
        let row = PersistedRow::encode(data)?;
        let mut state = self.lock()?;
        let revisions = state.rows.entry(record).or_default();
        if revisions.contains_key(&revision) {
            return Err(RevisionError::backend(format!(
                "revision {} of record {} already exists",
                revision, record
            )));
        }
        revisions.insert(revision, row);
        Ok(())
    }

    fn update_revision(
        &self,
        record: RecordId,
        revision: RevisionNumber,
        data: &RevisionData,
    ) -> RevisionResult<()> {
        let row = PersistedRow::encode(data)?;
        let mut state = self.lock()?;
        match state.rows.get_mut(&record).and_then(|revs| revs.get_mut(&revision)) {
            Some(existing) => {
                *existing = row;
                Ok(())
            }
            None => Err(RevisionError::UnknownRevision { record, revision }),
        }
    }

    fn read_revision(
        &self,
        record: RecordId,
        revision: RevisionNumber,
    ) -> RevisionResult<RevisionData> {
        let state = self.lock()?;
        state
            .rows
            .get(&record)
            .and_then(|revs| revs.get(&revision))
            .ok_or(RevisionError::UnknownRevision { record, revision })?
            .decode(record, revision)
    }

    fn delete_revision(&self, record: RecordId, revision: RevisionNumber) -> RevisionResult<()> {
        let mut state = self.lock()?;
        let removed = state
            .rows
            .get_mut(&record)
            .and_then(|revs| revs.remove(&revision))
            .is_some();
        if !removed {
            return Err(RevisionError::UnknownRevision { record, revision });
        }
        if state.rows.get(&record).map(BTreeMap::is_empty).unwrap_or(false) {
            state.rows.remove(&record);
        }
        Ok(())
    }

    fn list_revisions(&self, record: RecordId) -> RevisionResult<Vec<RevisionNumber>> {
        let state = self.lock()?;
        Ok(state
            .rows
            .get(&record)
            .map(|revs| revs.keys().copied().collect())
            .unwrap_or_default())
    }

    fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool> {
        let state = self.lock()?;
        Ok(state.rows.values().any(|revs| revs.contains_key(&revision)))
    }
}
