//! Transaction Invariant Tests
//!
//! Tests for the commit decision:
//! - Revisions strictly increase; rollback never changes the revision
//! - Structural vs non-structural status rule
//! - Unchanged, in-place, rolled back and simulated outcomes
//! - Guards on transaction state

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;

use revisionable::observability::Logger;
use revisionable::revision::{CUSTOM_KEYS_PART, SETTINGS_PART};
use revisionable::{
    EngineConfig, EngineContext, MemoryBackend, RecordId, RevisionError, RevisionStatus,
    RevisionableCollection, TransactionOutcome,
};

fn collection() -> RevisionableCollection {
    let context = EngineContext::with_defaults()
        .unwrap()
        .with_logger(Logger::disabled());
    RevisionableCollection::new(Rc::new(context), Arc::new(MemoryBackend::new()))
}

fn create(collection: &mut RevisionableCollection, label: &str) -> RecordId {
    collection
        .create_new_record(label, "creator", &BTreeMap::new())
        .unwrap()
        .id()
}

// =============================================================================
// Revision Ordering Tests
// =============================================================================

/// Successive commits produce strictly increasing revisions.
#[test]
fn test_commits_strictly_increase() {
    let mut collection = collection();
    let id = create(&mut collection, "Counter");
    let record = collection.get_by_id(id).unwrap();

    let mut previous = record.revision().unwrap();
    for i in 0..5 {
        record.start_transaction("editor", None).unwrap();
        record.set_custom_key("step", json!(i)).unwrap();
        let info = record.end_transaction().unwrap();

        let current = record.revision().unwrap();
        assert!(current > previous);
        assert_eq!(info.new_revision(), Some(current));
        assert_eq!(info.old_revision, previous);
        previous = current;
    }
    assert_eq!(record.count_revisions().unwrap(), 6);
}

/// Revision numbers are unique across records.
#[test]
fn test_revisions_unique_across_records() {
    let mut collection = collection();
    let a = create(&mut collection, "A");
    let b = create(&mut collection, "B");

    let rev_a = collection.get_by_id(a).unwrap().revision().unwrap();
    let rev_b = collection.get_by_id(b).unwrap().revision().unwrap();
    assert_ne!(rev_a, rev_b);
}

// =============================================================================
// Status Rule Tests
// =============================================================================

/// Structural change on Finalized yields Draft.
#[test]
fn test_structural_change_returns_to_draft() {
    let mut collection = collection();
    let id = create(&mut collection, "Structural");
    let record = collection.get_by_id(id).unwrap();
    record.make_finalized().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.set_custom_key("layout", json!("grid")).unwrap();
    assert!(record.has_structural_changes().unwrap());
    let info = record.end_transaction().unwrap();

    assert!(info.is_new_revision());
    assert!(info.structural);
    assert_eq!(info.old_status, RevisionStatus::Finalized);
    assert_eq!(info.new_status, RevisionStatus::Draft);
    assert_eq!(record.status().unwrap(), RevisionStatus::Draft);
}

/// Non-structural change on Finalized stays Finalized.
#[test]
fn test_non_structural_change_keeps_finalized() {
    let mut collection = collection();
    let id = create(&mut collection, "NonStructural");
    let record = collection.get_by_id(id).unwrap();
    record.make_finalized().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.set_label("Renamed").unwrap();
    assert!(!record.has_structural_changes().unwrap());
    assert!(record.is_part_changed(SETTINGS_PART).unwrap());
    assert!(!record.is_part_changed(CUSTOM_KEYS_PART).unwrap());
    let info = record.end_transaction().unwrap();

    assert!(info.is_new_revision());
    assert_eq!(info.new_status, RevisionStatus::Finalized);
    assert_eq!(record.status().unwrap(), RevisionStatus::Finalized);
    assert_eq!(record.label().unwrap().as_deref(), Some("Renamed"));
}

/// Older revisions keep the status they were written with.
#[test]
fn test_status_is_revision_scoped() {
    let mut collection = collection();
    let id = create(&mut collection, "Scoped");
    let record = collection.get_by_id(id).unwrap();
    let first = record.revision().unwrap();
    record.make_finalized().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.set_custom_key("k", json!(1)).unwrap();
    record.end_transaction().unwrap();
    assert_eq!(record.status().unwrap(), RevisionStatus::Draft);

    record.select_revision(first).unwrap();
    assert_eq!(record.status().unwrap(), RevisionStatus::Finalized);
    assert_eq!(record.custom_key("k").unwrap(), None);
}

// =============================================================================
// Outcome Tests
// =============================================================================

/// Ending without changes creates nothing.
#[test]
fn test_unchanged_transaction() {
    let mut collection = collection();
    let id = create(&mut collection, "Idle");
    let record = collection.get_by_id(id).unwrap();
    let before = record.revision().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.set_label("Idle").unwrap();
    let info = record.end_transaction().unwrap();

    assert!(!info.is_changed());
    assert!(info.is_unchanged());
    assert!(!info.is_new_revision());
    assert_eq!(info.new_revision(), None);
    assert_eq!(info.outcome, TransactionOutcome::Unchanged);
    assert_eq!(record.revision().unwrap(), before);
    assert_eq!(record.count_revisions().unwrap(), 1);
}

/// Rollback restores values and status and keeps the revision.
#[test]
fn test_rollback_restores_everything() {
    let mut collection = collection();
    let id = create(&mut collection, "Original");
    let record = collection.get_by_id(id).unwrap();
    record.make_finalized().unwrap();
    let before = record.revision().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.set_label("Changed").unwrap();
    record.set_custom_key("k", json!("v")).unwrap();
    record.make_inactive().unwrap();
    assert_eq!(record.label().unwrap().as_deref(), Some("Changed"));
    assert_eq!(record.status().unwrap(), RevisionStatus::Inactive);

    let info = record.rollback_transaction().unwrap();

    assert!(info.is_rolled_back());
    assert!(!info.is_changed());
    assert!(!info.is_new_revision());
    assert_eq!(record.revision().unwrap(), before);
    assert_eq!(record.count_revisions().unwrap(), 1);
    assert_eq!(record.label().unwrap().as_deref(), Some("Original"));
    assert_eq!(record.custom_key("k").unwrap(), None);
    assert_eq!(record.status().unwrap(), RevisionStatus::Finalized);
    assert!(!record.is_transaction_started());
}

/// A staged status change alone updates the revision in place.
#[test]
fn test_status_only_transaction_is_in_place() {
    let mut collection = collection();
    let id = create(&mut collection, "InPlace");
    let record = collection.get_by_id(id).unwrap();
    let before = record.revision().unwrap();

    record.start_transaction("editor", None).unwrap();
    record.make_finalized().unwrap();
    let info = record.end_transaction().unwrap();

    assert_eq!(info.outcome, TransactionOutcome::UpdatedInPlace);
    assert!(info.is_changed());
    assert!(!info.is_new_revision());
    assert_eq!(record.revision().unwrap(), before);
    assert_eq!(record.status().unwrap(), RevisionStatus::Finalized);
}

/// Simulated transactions decide but write nothing.
#[test]
fn test_simulated_transaction_writes_nothing() {
    let mut collection = collection();
    let id = create(&mut collection, "Simulated");
    let before = collection.get_current_revision(id).unwrap();
    let record = collection.get_by_id(id).unwrap();

    record.start_simulated_transaction("editor", None).unwrap();
    record.set_label("Would change").unwrap();
    let info = record.end_transaction().unwrap();

    assert!(info.is_simulated());
    assert!(info.is_changed());
    assert_eq!(info.new_revision(), None);
    assert_eq!(record.label().unwrap().as_deref(), Some("Simulated"));
    assert_eq!(record.count_revisions().unwrap(), 1);
    assert_eq!(collection.get_current_revision(id).unwrap(), before);
}

/// Configured simulation applies to every transaction.
#[test]
fn test_configured_simulation() {
    let config = EngineConfig {
        simulation: true,
        ..EngineConfig::default()
    };
    let context = EngineContext::from_config(config)
        .unwrap()
        .with_logger(Logger::disabled());
    let mut collection =
        RevisionableCollection::new(Rc::new(context), Arc::new(MemoryBackend::new()));
    let id = create(&mut collection, "Dry");
    let record = collection.get_by_id(id).unwrap();

    record.start_transaction("editor", None).unwrap();
    let info = record.end_transaction().unwrap();
    assert_eq!(info.outcome, TransactionOutcome::Simulated { would_change: false });
    assert!(info.is_unchanged());
}

// =============================================================================
// Metadata Tests
// =============================================================================

/// New revisions carry the transaction author and comment.
#[test]
fn test_revision_metadata() {
    let mut collection = collection();
    let id = create(&mut collection, "Meta");
    let record = collection.get_by_id(id).unwrap();
    assert_eq!(record.revision_author().unwrap(), "creator");
    let created = record.revision_date().unwrap();

    record.start_transaction("editor", Some("fix typo")).unwrap();
    record.set_label("Meta 2").unwrap();
    record.end_transaction().unwrap();

    assert_eq!(record.revision_author().unwrap(), "editor");
    assert_eq!(record.revision_comment().unwrap().as_deref(), Some("fix typo"));
    assert!(record.revision_date().unwrap() >= created);
}

// =============================================================================
// Guard Tests
// =============================================================================

/// Mutators require an open transaction.
#[test]
fn test_mutation_without_transaction_rejected() {
    let mut collection = collection();
    let id = create(&mut collection, "Guarded");
    let record = collection.get_by_id(id).unwrap();

    assert!(matches!(
        record.set_label("x"),
        Err(RevisionError::TransactionNotActive)
    ));
    assert!(matches!(
        record.end_transaction(),
        Err(RevisionError::TransactionNotActive)
    ));
    assert!(matches!(
        record.rollback_transaction(),
        Err(RevisionError::TransactionNotActive)
    ));
}

/// Only one transaction may be open.
#[test]
fn test_nested_transaction_rejected() {
    let mut collection = collection();
    let id = create(&mut collection, "Nested");
    let record = collection.get_by_id(id).unwrap();

    record.start_transaction("editor", None).unwrap();
    assert!(matches!(
        record.start_transaction("editor", None),
        Err(RevisionError::TransactionAlreadyActive)
    ));
    assert!(matches!(
        record.select_revision(record.revision().unwrap()),
        Err(RevisionError::TransactionAlreadyActive)
    ));
}

/// Undeclared storage parts are rejected.
#[test]
fn test_unknown_part_rejected() {
    let mut collection = collection();
    let id = create(&mut collection, "Parts");
    let record = collection.get_by_id(id).unwrap();

    record.start_transaction("editor", None).unwrap();
    assert!(matches!(
        record.set_key("mystery", "k", json!(1)),
        Err(RevisionError::UnknownStoragePart(_))
    ));
}

/// Aliases are validated before they are staged.
#[test]
fn test_invalid_alias_rejected() {
    let mut collection = collection();
    let id = create(&mut collection, "Alias");
    let record = collection.get_by_id(id).unwrap();

    record.start_transaction("editor", None).unwrap();
    assert!(matches!(
        record.set_alias("Has Spaces"),
        Err(RevisionError::InvalidSetting { .. })
    ));
    assert!(record.set_alias("has-dashes").unwrap());
    assert_eq!(record.alias().unwrap().as_deref(), Some("has-dashes"));
    assert!(!record.has_structural_changes().unwrap());
}
