//! Observable engine events
//!
//! Events are explicit and typed. Every log line the engine writes names
//! exactly one of these.

use std::fmt;

/// Observable events of the revision engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Engine configuration loaded
    ConfigLoaded,

    // Records
    /// New record persisted with its first revision
    RecordCreated,
    /// Record instance loaded from the backend
    RecordLoaded,
    /// Stub record created
    StubCreated,
    /// Record instance disposed
    RecordDisposed,
    /// Collection cache reset
    CollectionReset,

    // Transactions
    /// Transaction started
    TransactionBegin,
    /// Transaction committed
    TransactionCommit,
    /// Transaction rolled back
    TransactionRollback,
    /// Transaction ended without changes
    TransactionUnchanged,
    /// Simulated transaction ended
    TransactionSimulated,

    // Revisions
    /// New revision materialized
    RevisionAdded,
    /// Status changed on a revision
    StatusChanged,
    /// Cached revision dropped
    RevisionUnloaded,
    /// Persisted revision deleted
    RevisionRemoved,
    /// Auxiliary dependency disposed
    DependencyDisposed,
    /// Auxiliary dependency failed to dispose
    DependencyDisposeFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordLoaded => "RECORD_LOADED",
            Event::StubCreated => "STUB_CREATED",
            Event::RecordDisposed => "RECORD_DISPOSED",
            Event::CollectionReset => "COLLECTION_RESET",

            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::TransactionUnchanged => "TRANSACTION_UNCHANGED",
            Event::TransactionSimulated => "TRANSACTION_SIMULATED",

            Event::RevisionAdded => "REVISION_ADDED",
            Event::StatusChanged => "STATUS_CHANGED",
            Event::RevisionUnloaded => "REVISION_UNLOADED",
            Event::RevisionRemoved => "REVISION_REMOVED",
            Event::DependencyDisposed => "DEPENDENCY_DISPOSED",
            Event::DependencyDisposeFailed => "DEPENDENCY_DISPOSE_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
