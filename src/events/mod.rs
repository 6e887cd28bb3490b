//! Record events
//!
//! This module provides:
//! - Built-in event names fired by the record lifecycle
//! - `RecordEvent` - the payload every listener receives
//! - `EventRegistry` - revision-scoped listener bookkeeping and dispatch

mod registry;

pub use registry::{EventCallback, EventRegistry, ListenerId, ListenerScope};

use crate::revision::{RecordId, RevisionNumber};
use crate::state::RevisionStatus;
use crate::transaction::TransactionInfo;

/// Fired before a commit is persisted.
pub const BEFORE_SAVE: &str = "BeforeSave";

/// Fired after a new revision number was allocated and written.
pub const REVISION_ADDED: &str = "RevisionAdded";

/// Fired last for every ended or rolled back transaction.
pub const TRANSACTION_ENDED: &str = "TransactionEnded";

/// Fired when a status change is applied.
pub const STATUS_CHANGED: &str = "StatusChanged";

/// Fired once when a record instance is disposed.
pub const DISPOSED: &str = "Disposed";

/// Events declared revision-agnostic unless configuration adds more.
pub const DEFAULT_REVISION_AGNOSTIC_EVENTS: [&str; 3] = [REVISION_ADDED, TRANSACTION_ENDED, DISPOSED];

/// Payload delivered to listeners
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEvent {
    /// Event name
    pub name: String,
    /// Record the event belongs to
    pub record_id: RecordId,
    /// Revision selected when the event fired
    pub revision: RevisionNumber,
    /// Transaction summary for transaction events
    pub transaction: Option<TransactionInfo>,
    /// Old and new status for status events
    pub status_change: Option<(RevisionStatus, RevisionStatus)>,
}

impl RecordEvent {
    /// Create a bare event
    pub fn new(name: impl Into<String>, record_id: RecordId, revision: RevisionNumber) -> Self {
        Self {
            name: name.into(),
            record_id,
            revision,
            transaction: None,
            status_change: None,
        }
    }

    /// Attach a transaction summary
    pub fn with_transaction(mut self, info: TransactionInfo) -> Self {
        self.transaction = Some(info);
        self
    }

    /// Attach a status change
    pub fn with_status_change(mut self, from: RevisionStatus, to: RevisionStatus) -> Self {
        self.status_change = Some((from, to));
        self
    }
}
