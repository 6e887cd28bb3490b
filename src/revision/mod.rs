//! Revision Domain Types
//!
//! This module provides:
//! - `RevisionNumber` / `RecordId` - totally ordered identities
//! - `RevisionData` - the data of one revision, split into storage parts
//! - `PartSchema` - structural vs non-structural classification of parts
//! - `RevisionAuthority` - backend-driven allocation with monotonicity checks

mod authority;
mod data;
mod number;

pub use authority::RevisionAuthority;
pub use data::{
    PartKind, PartSchema, RevisionData, ALIAS_KEY, CUSTOM_KEYS_PART, LABEL_KEY, SETTINGS_PART,
};
pub use number::{RecordId, RevisionNumber, STUB_RECORD_ID, STUB_REVISION};
