//! Observability for the revision engine
//!
//! - Structured logging (JSON lines)
//! - Typed event vocabulary
//!
//! Observability is read-only: a failing log sink never changes the outcome
//! of an engine operation.

mod events;
mod logger;

pub use events::Event;
pub use logger::{LogBuffer, Logger, Severity};
