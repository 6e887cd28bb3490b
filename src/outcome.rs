//! Explicit control-flow result for callers that present records
//!
//! A lookup either continues with a value, asks the caller to redirect, or
//! reports a failure by kind. The engine never aborts mid-call to redirect.

use crate::errors::{ErrorKind, RevisionResult};

/// Continue | Redirect | Error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Proceed with the value
    Continue(T),
    /// Send the caller to `target`
    Redirect(String),
    /// Failed with the given kind
    Error(ErrorKind),
}

impl<T> Outcome<T> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Outcome::Continue(_))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Outcome::Redirect(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    /// The value, if continuing
    pub fn into_continue(self) -> Option<T> {
        match self {
            Outcome::Continue(value) => Some(value),
            _ => None,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Outcome::Redirect(target) => Some(target),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Map the continued value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Continue(value) => Outcome::Continue(f(value)),
            Outcome::Redirect(target) => Outcome::Redirect(target),
            Outcome::Error(kind) => Outcome::Error(kind),
        }
    }
}

impl<T> From<RevisionResult<T>> for Outcome<T> {
    fn from(result: RevisionResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Continue(value),
            Err(err) => Outcome::Error(err.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RevisionError;

    #[test]
    fn test_from_result() {
        let ok: Outcome<u32> = Ok(7).into();
        assert_eq!(ok.into_continue(), Some(7));

        let err: Outcome<u32> = Err(RevisionError::TransactionNotActive).into();
        assert_eq!(err.error_kind(), Some(ErrorKind::TransactionNotActive));
        assert!(err.is_error());
    }

    #[test]
    fn test_map_keeps_redirect() {
        let outcome: Outcome<u32> = Outcome::Redirect("/records".to_string());
        let mapped = outcome.map(|v| v * 2);
        assert!(mapped.is_redirect());
        assert_eq!(mapped.redirect_target(), Some("/records"));
        assert!(!mapped.is_continue());
    }
}
