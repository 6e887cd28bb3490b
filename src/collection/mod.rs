//! Record collection
//!
//! The collection owns every loaded record instance keyed by record id and
//! is the only component that asks the backend for new ids and revision
//! numbers. Stubs are produced here but never held or persisted.

mod manager;
mod settings;

pub use manager::RevisionableCollection;
pub use settings::{SettingHandler, SettingHandlers};
