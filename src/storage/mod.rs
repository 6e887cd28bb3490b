//! Revision storage subsystem
//!
//! Per-record view over revision data, scoped to the selected revision.
//!
//! # Design Principles
//!
//! - Lazy: revisions are read from the backend on first access and cached
//! - Selected revision drives every key read
//! - Attached dependencies live in a [`DependencyArena`] owned 1:1 by the storage
//! - Disposal is final: every later call fails with `DisposedInstance`
//!
//! # Disposal cascade
//!
//! Disposing a storage releases only the dependencies bound to the
//! revision selected at that moment. Dependencies bound to other revisions
//! and plain dependencies remain alive.

mod db;
mod dependency;
mod stub;

pub use db::DbRevisionStorage;
pub use dependency::{
    DependencyArena, DependencyBinding, DependencyHandle, Disposable, DisposableResource,
    Released,
};
pub use stub::StubRevisionStorage;

use std::rc::Rc;

use serde_json::Value;

use crate::errors::RevisionResult;
use crate::revision::{RecordId, RevisionData, RevisionNumber};

/// Revision-scoped key/value storage of one record.
pub trait RevisionStorage {
    /// Record this storage belongs to
    fn record_id(&self) -> RecordId;

    /// True for the in-memory storage of a stub record
    fn is_stub(&self) -> bool;

    fn is_disposed(&self) -> bool;

    /// True if at least one revision exists
    fn has_revisions(&self) -> RevisionResult<bool>;

    /// Selected revision
    fn get_revision(&self) -> RevisionResult<RevisionNumber>;

    /// Highest existing revision
    fn get_latest_revision(&self) -> RevisionResult<RevisionNumber>;

    /// All existing revisions in ascending order
    fn list_revisions(&self) -> RevisionResult<Vec<RevisionNumber>>;

    fn revision_exists(&self, revision: RevisionNumber) -> RevisionResult<bool>;

    /// True if `revision` is held in memory
    fn is_loaded(&self, revision: RevisionNumber) -> bool;

    /// Switch the selected revision. `UnknownRevision` if absent.
    fn select_revision(&mut self, revision: RevisionNumber) -> RevisionResult<()>;

    /// Data of the selected revision
    fn revision_data(&self) -> RevisionResult<RevisionData>;

    /// Data of any existing revision
    fn read_revision(&self, revision: RevisionNumber) -> RevisionResult<RevisionData>;

    /// Read a key of the selected revision
    fn get_key(&self, part: &str, name: &str) -> RevisionResult<Option<Value>>;

    /// Write a key of the selected revision in place, bypassing any
    /// transaction. Returns true if it changed. Storages are only opened by
    /// the crate, so records reach this through their own commit path.
    fn set_key(&mut self, part: &str, name: &str, value: Value) -> RevisionResult<bool>;

    /// Store a newly allocated revision and select it
    fn add_revision(&mut self, revision: RevisionNumber, data: RevisionData)
        -> RevisionResult<()>;

    /// Replace the data of the selected revision
    fn update_in_place(&mut self, data: RevisionData) -> RevisionResult<()>;

    /// Drop the cached copy of `revision` and dispose the dependencies bound
    /// to it. Persisted data is untouched.
    fn unload_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Released>;

    /// Delete `revision` and dispose the dependencies bound to it.
    ///
    /// `LastRevision` if it is the only one. If it was selected, the latest
    /// remaining revision becomes selected.
    fn remove_revision(&mut self, revision: RevisionNumber) -> RevisionResult<Released>;

    /// Attach a dependency under `name`
    fn set_private_key(
        &mut self,
        name: &str,
        dependency: Rc<dyn Disposable>,
    ) -> RevisionResult<DependencyHandle>;

    /// Dependency attached under `name`
    fn get_private_key(&self, name: &str) -> RevisionResult<Option<Rc<dyn Disposable>>>;

    /// Dispose the storage and the dependencies bound to the selected
    /// revision.
    ///
    /// Fails only if already disposed. A failing dependency is reported in
    /// the returned [`Released`]; the storage is disposed regardless.
    fn dispose(&mut self) -> RevisionResult<Released>;
}
