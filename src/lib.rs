//! revisionable - A revision-tracked record engine
//!
//! Records keep numbered, immutable revisions, a revision-scoped status
//! lifecycle, transactional edits with structural change detection, and
//! revision-aware event dispatch.
//!
//! # Components
//!
//! - `state` - status lifecycle and its legality table
//! - `revision` - revision numbers, revision data, allocation authority
//! - `backend` - persistence seam and the bundled in-memory backend
//! - `storage` - per-record revision storage and disposable dependencies
//! - `transaction` - change tracking and the commit decision
//! - `events` - revision-scoped listener registry
//! - `record` - the `Revisionable` entity
//! - `collection` - record ownership, creation, stubs

pub mod backend;
pub mod collection;
pub mod config;
pub mod errors;
pub mod events;
pub mod observability;
pub mod outcome;
pub mod record;
pub mod revision;
pub mod state;
pub mod storage;
pub mod transaction;

pub use backend::{MemoryBackend, PersistenceBackend};
pub use collection::{RevisionableCollection, SettingHandler, SettingHandlers};
pub use config::{EngineConfig, EngineContext};
pub use errors::{ErrorKind, RevisionError, RevisionResult};
pub use events::{ListenerId, RecordEvent};
pub use outcome::Outcome;
pub use record::Revisionable;
pub use revision::{RecordId, RevisionNumber, STUB_RECORD_ID, STUB_REVISION};
pub use state::{RevisionStatus, StateMachine};
pub use storage::{Disposable, DisposableResource};
pub use transaction::{TransactionInfo, TransactionOutcome};
