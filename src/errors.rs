//! Revision engine error types
//!
//! Error codes:
//! - REV_INVALID_STATE_CHANGE (REJECT)
//! - REV_STUB_OPERATION_NOT_ALLOWED (REJECT)
//! - REV_UNKNOWN_REVISION (REJECT)
//! - REV_UNKNOWN_RECORD (REJECT)
//! - REV_DISPOSED_INSTANCE (REJECT)
//! - REV_TRANSACTION_NOT_ACTIVE (REJECT)
//! - REV_TRANSACTION_ALREADY_ACTIVE (REJECT)
//! - REV_CHECKSUM_MISMATCH (FATAL)
//! - REV_NON_MONOTONIC_REVISION (FATAL)
//!
//! All errors are synchronous and surfaced to the caller immediately.
//! Nothing in the engine retries.

use std::fmt;

use thiserror::Error;

use crate::revision::{RecordId, RevisionNumber};
use crate::state::RevisionStatus;

/// Result type for revision engine operations
pub type RevisionResult<T> = Result<T, RevisionError>;

/// Severity of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The request was rejected; engine state is unchanged
    Reject,
    /// Persisted data can no longer be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Fieldless classification of a [`RevisionError`].
///
/// Carried by [`crate::Outcome::Error`] so the presentation layer can map
/// failures without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidStateChange,
    StubOperationNotAllowed,
    UnknownRevision,
    UnknownRecord,
    DisposedInstance,
    TransactionNotActive,
    TransactionAlreadyActive,
    UnknownStoragePart,
    LastRevision,
    UnknownSetting,
    InvalidSetting,
    ChecksumMismatch,
    NonMonotonicRevision,
    Backend,
    Config,
}

/// Errors raised by the revision engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RevisionError {
    #[error("invalid state change: {from} -> {to}")]
    InvalidStateChange {
        from: RevisionStatus,
        to: RevisionStatus,
    },

    #[error("operation '{operation}' is not allowed on a stub record")]
    StubOperationNotAllowed { operation: &'static str },

    #[error("revision {revision} does not exist for record {record}")]
    UnknownRevision {
        record: RecordId,
        revision: RevisionNumber,
    },

    #[error("record {0} does not exist")]
    UnknownRecord(RecordId),

    #[error("{what} has been disposed")]
    DisposedInstance { what: &'static str },

    #[error("no transaction is active")]
    TransactionNotActive,

    #[error("a transaction is already active")]
    TransactionAlreadyActive,

    #[error("unknown storage part '{0}'")]
    UnknownStoragePart(String),

    #[error("revision {revision} is the only revision of record {record}")]
    LastRevision {
        record: RecordId,
        revision: RevisionNumber,
    },

    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("invalid value for setting '{name}': {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("checksum mismatch for record {record} revision {revision}")]
    ChecksumMismatch {
        record: RecordId,
        revision: RevisionNumber,
    },

    #[error("revision {attempted} for record {record} is not above {highest}")]
    NonMonotonicRevision {
        record: RecordId,
        attempted: RevisionNumber,
        highest: RevisionNumber,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RevisionError {
    /// Create a disposed-instance error for the named component
    pub fn disposed(what: &'static str) -> Self {
        Self::DisposedInstance { what }
    }

    /// Create a stub rejection for the named operation
    pub fn stub(operation: &'static str) -> Self {
        Self::StubOperationNotAllowed { operation }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the fieldless classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStateChange { .. } => ErrorKind::InvalidStateChange,
            Self::StubOperationNotAllowed { .. } => ErrorKind::StubOperationNotAllowed,
            Self::UnknownRevision { .. } => ErrorKind::UnknownRevision,
            Self::UnknownRecord(_) => ErrorKind::UnknownRecord,
            Self::DisposedInstance { .. } => ErrorKind::DisposedInstance,
            Self::TransactionNotActive => ErrorKind::TransactionNotActive,
            Self::TransactionAlreadyActive => ErrorKind::TransactionAlreadyActive,
            Self::UnknownStoragePart(_) => ErrorKind::UnknownStoragePart,
            Self::LastRevision { .. } => ErrorKind::LastRevision,
            Self::UnknownSetting(_) => ErrorKind::UnknownSetting,
            Self::InvalidSetting { .. } => ErrorKind::InvalidSetting,
            Self::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Self::NonMonotonicRevision { .. } => ErrorKind::NonMonotonicRevision,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidStateChange => "REV_INVALID_STATE_CHANGE",
            ErrorKind::StubOperationNotAllowed => "REV_STUB_OPERATION_NOT_ALLOWED",
            ErrorKind::UnknownRevision => "REV_UNKNOWN_REVISION",
            ErrorKind::UnknownRecord => "REV_UNKNOWN_RECORD",
            ErrorKind::DisposedInstance => "REV_DISPOSED_INSTANCE",
            ErrorKind::TransactionNotActive => "REV_TRANSACTION_NOT_ACTIVE",
            ErrorKind::TransactionAlreadyActive => "REV_TRANSACTION_ALREADY_ACTIVE",
            ErrorKind::UnknownStoragePart => "REV_UNKNOWN_STORAGE_PART",
            ErrorKind::LastRevision => "REV_LAST_REVISION",
            ErrorKind::UnknownSetting => "REV_UNKNOWN_SETTING",
            ErrorKind::InvalidSetting => "REV_INVALID_SETTING",
            ErrorKind::ChecksumMismatch => "REV_CHECKSUM_MISMATCH",
            ErrorKind::NonMonotonicRevision => "REV_NON_MONOTONIC_REVISION",
            ErrorKind::Backend => "REV_BACKEND_FAILED",
            ErrorKind::Config => "REV_CONFIG_INVALID",
        }
    }

    /// Returns the severity for this error
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::ChecksumMismatch | ErrorKind::NonMonotonicRevision => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    /// Integrity failures are fatal; everything else is a rejection
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl From<serde_json::Error> for RevisionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_prefixed() {
        let errors = [
            RevisionError::TransactionNotActive,
            RevisionError::TransactionAlreadyActive,
            RevisionError::stub("start_transaction"),
            RevisionError::disposed("record"),
            RevisionError::UnknownRecord(RecordId::new(3)),
            RevisionError::config("bad"),
        ];

        for err in errors {
            assert!(err.code().starts_with("REV_"));
        }
    }

    #[test]
    fn test_integrity_errors_are_fatal() {
        let err = RevisionError::ChecksumMismatch {
            record: RecordId::new(1),
            revision: RevisionNumber::new(2),
        };
        assert!(err.is_fatal());
        assert_eq!(err.severity(), Severity::Fatal);

        assert!(!RevisionError::TransactionNotActive.is_fatal());
    }

    #[test]
    fn test_display_mentions_states() {
        let err = RevisionError::InvalidStateChange {
            from: RevisionStatus::Deleted,
            to: RevisionStatus::Finalized,
        };
        let msg = err.to_string();
        assert!(msg.contains("deleted"));
        assert!(msg.contains("finalized"));
        assert_eq!(err.kind(), ErrorKind::InvalidStateChange);
    }
}
