//! Revisionable records
//!
//! A [`Revisionable`] composes one revision storage, one event registry and
//! at most one open transaction. It is created by the collection, either
//! persisted or as a stub, and is released explicitly with `dispose`.
//!
//! # Lifecycle
//!
//! - Created with a first revision in Draft, or as a never-persisted stub
//! - Each committed transaction with key changes adds a revision
//! - Status changes outside a transaction update the selected revision
//! - Disposal is final; every later operation fails with `DisposedInstance`

mod entity;

pub use entity::Revisionable;
