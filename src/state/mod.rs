//! Record status and its legality table
//!
//! This module provides:
//! - `RevisionStatus` - Draft, Finalized, Inactive, Deleted
//! - `StateMachine` - transition legality and commit-time status transforms

mod machine;
mod status;

pub use machine::StateMachine;
pub use status::RevisionStatus;
