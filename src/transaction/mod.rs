//! Transactions against a record
//!
//! This module provides:
//! - `TransactionController` - baseline, working copy, change classification
//! - `CommitPlan` - the decision taken when a transaction ends
//! - `TransactionInfo` - summary handed to callers and listeners

mod controller;
mod info;

pub use controller::{CommitKind, CommitPlan, TransactionController};
pub use info::{TransactionInfo, TransactionOutcome};
