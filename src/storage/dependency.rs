//! Auxiliary disposable dependencies
//!
//! Resources attached to a record's storage under a name. A dependency is
//! either plain, or bound to one revision of one record. The arena owns
//! the attachments; disposal walks the arena instead of following
//! back-references, so there are no ownership cycles.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::errors::{RevisionError, RevisionResult};
use crate::revision::{RecordId, RevisionNumber};

/// What a dependency is tied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyBinding {
    /// Not tied to any revision; never disposed by the engine
    Plain,
    /// Tied to one revision of one record
    Revision {
        record: RecordId,
        revision: RevisionNumber,
    },
}

impl DependencyBinding {
    /// True if bound to exactly this record revision
    pub fn is_bound_to(&self, record: RecordId, revision: RevisionNumber) -> bool {
        matches!(
            self,
            DependencyBinding::Revision { record: r, revision: n } if *r == record && *n == revision
        )
    }
}

/// An object the engine may dispose.
pub trait Disposable {
    /// Release the resource. Fails with `DisposedInstance` if already released.
    fn dispose(&self) -> RevisionResult<()>;

    fn is_disposed(&self) -> bool;

    fn binding(&self) -> DependencyBinding {
        DependencyBinding::Plain
    }
}

/// Ready-made disposable with a name and a binding.
#[derive(Debug)]
pub struct DisposableResource {
    name: String,
    binding: DependencyBinding,
    disposed: Cell<bool>,
}

impl DisposableResource {
    /// A resource not tied to any revision
    pub fn plain(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            binding: DependencyBinding::Plain,
            disposed: Cell::new(false),
        })
    }

    /// A resource tied to `revision` of `record`
    pub fn bound(name: impl Into<String>, record: RecordId, revision: RevisionNumber) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            binding: DependencyBinding::Revision { record, revision },
            disposed: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fails with `DisposedInstance` once disposed
    pub fn ensure_alive(&self) -> RevisionResult<()> {
        if self.disposed.get() {
            Err(RevisionError::disposed("dependency"))
        } else {
            Ok(())
        }
    }
}

impl Disposable for DisposableResource {
    fn dispose(&self) -> RevisionResult<()> {
        self.ensure_alive()?;
        self.disposed.set(true);
        Ok(())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn binding(&self) -> DependencyBinding {
        self.binding
    }
}

/// Result of a disposal cascade
#[derive(Debug, Default)]
pub struct Released {
    /// Detached attachments, in slot order
    pub names: Vec<String>,
    /// Attachments whose disposal failed
    pub failed: Vec<String>,
    /// First failure of the cascade
    pub error: Option<RevisionError>,
}

impl Released {
    /// Names on success, the first failure otherwise
    pub fn into_result(self) -> RevisionResult<Vec<String>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.names),
        }
    }
}

/// Stable handle to an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyHandle(usize);

struct Slot {
    name: String,
    dependency: Rc<dyn Disposable>,
}

/// Named attachments owned by one storage
#[derive(Default)]
pub struct DependencyArena {
    slots: Vec<Option<Slot>>,
    by_name: HashMap<String, usize>,
}

impl DependencyArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `dependency` under `name`. An existing attachment with the
    /// same name is detached (not disposed) and its slot reused; otherwise
    /// the first free slot is taken.
    pub fn insert(&mut self, name: &str, dependency: Rc<dyn Disposable>) -> DependencyHandle {
        let slot = Slot {
            name: name.to_string(),
            dependency,
        };
        let index = match self.by_name.get(name) {
            Some(&index) => index,
            None => match self.slots.iter().position(Option::is_none) {
                Some(free) => free,
                None => {
                    self.slots.push(None);
                    self.slots.len() - 1
                }
            },
        };
        self.slots[index] = Some(slot);
        self.by_name.insert(name.to_string(), index);
        DependencyHandle(index)
    }

    /// Attachment under `name`
    pub fn get(&self, name: &str) -> Option<Rc<dyn Disposable>> {
        self.by_name
            .get(name)
            .and_then(|&index| self.slots[index].as_ref())
            .map(|slot| Rc::clone(&slot.dependency))
    }

    /// Attachment behind `handle`
    pub fn get_handle(&self, handle: DependencyHandle) -> Option<Rc<dyn Disposable>> {
        self.slots
            .get(handle.0)
            .and_then(Option::as_ref)
            .map(|slot| Rc::clone(&slot.dependency))
    }

    /// Detach without disposing
    pub fn remove(&mut self, name: &str) -> Option<Rc<dyn Disposable>> {
        let index = self.by_name.remove(name)?;
        self.slots[index].take().map(|slot| slot.dependency)
    }

    /// Dispose every live attachment bound to `revision` of `record`.
    ///
    /// Every bound attachment is attempted even after a failure. Disposed
    /// attachments are detached; one whose disposal fails stays attached.
    /// Plain attachments and those bound elsewhere are untouched.
    pub fn dispose_bound_to(&mut self, record: RecordId, revision: RevisionNumber) -> Released {
        let mut released = Released::default();
        for index in 0..self.slots.len() {
            let Some(slot) = &self.slots[index] else {
                continue;
            };
            if !slot.dependency.binding().is_bound_to(record, revision) {
                continue;
            }
            if !slot.dependency.is_disposed() {
                if let Err(err) = slot.dependency.dispose() {
                    released.failed.push(slot.name.clone());
                    released.error.get_or_insert(err);
                    continue;
                }
            }
            if let Some(slot) = self.slots[index].take() {
                self.by_name.remove(&slot.name);
                released.names.push(slot.name);
            }
        }
        released
    }

    /// Number of attachments
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Detach everything without disposing
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_name.clear();
    }
}

impl fmt::Debug for DependencyArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .slots
            .iter()
            .flatten()
            .map(|slot| slot.name.as_str())
            .collect();
        f.debug_struct("DependencyArena").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: RecordId = RecordId::new(1);
    const REV1: RevisionNumber = RevisionNumber::new(1);
    const REV2: RevisionNumber = RevisionNumber::new(2);

    #[test]
    fn test_resource_disposes_once() {
        let res = DisposableResource::plain("cache");
        assert!(res.ensure_alive().is_ok());
        res.dispose().unwrap();
        assert!(res.is_disposed());
        assert!(matches!(
            res.dispose(),
            Err(RevisionError::DisposedInstance { .. })
        ));
    }

    #[test]
    fn test_dispose_bound_only() {
        let mut arena = DependencyArena::new();
        let plain = DisposableResource::plain("plain");
        let same = DisposableResource::bound("same", RECORD, REV1);
        let other = DisposableResource::bound("other", RECORD, REV2);
        let foreign = DisposableResource::bound("foreign", RecordId::new(2), REV1);

        arena.insert("plain", plain.clone());
        arena.insert("same", same.clone());
        arena.insert("other", other.clone());
        arena.insert("foreign", foreign.clone());

        let disposed = arena.dispose_bound_to(RECORD, REV1).into_result().unwrap();
        assert_eq!(disposed, vec!["same".to_string()]);

        assert!(same.is_disposed());
        assert!(!plain.is_disposed());
        assert!(!other.is_disposed());
        assert!(!foreign.is_disposed());
        assert_eq!(arena.len(), 3);
        assert!(arena.get("same").is_none());
    }

    #[test]
    fn test_already_disposed_is_skipped() {
        let mut arena = DependencyArena::new();
        let same = DisposableResource::bound("same", RECORD, REV1);
        arena.insert("same", same.clone());
        same.dispose().unwrap();

        let disposed = arena.dispose_bound_to(RECORD, REV1).into_result().unwrap();
        assert_eq!(disposed.len(), 1);
    }

    #[test]
    fn test_insert_replaces_by_name() {
        let mut arena = DependencyArena::new();
        let first = DisposableResource::plain("a");
        let second = DisposableResource::plain("b");

        let h1 = arena.insert("slot", first.clone());
        let h2 = arena.insert("slot", second.clone());
        assert_eq!(h1, h2);
        assert_eq!(arena.len(), 1);
        assert!(!first.is_disposed());

        let got = arena.get_handle(h2).unwrap();
        assert!(!got.is_disposed());
    }

    #[test]
    fn test_remove_detaches() {
        let mut arena = DependencyArena::new();
        let res = DisposableResource::plain("a");
        arena.insert("a", res.clone());

        assert!(arena.remove("a").is_some());
        assert!(arena.is_empty());
        assert!(!res.is_disposed());
    }

    struct Failing {
        binding: DependencyBinding,
    }

    impl Disposable for Failing {
        fn dispose(&self) -> RevisionResult<()> {
            Err(RevisionError::backend("close failed"))
        }

        fn is_disposed(&self) -> bool {
            false
        }

        fn binding(&self) -> DependencyBinding {
            self.binding
        }
    }

    #[test]
    fn test_cascade_continues_past_failure() {
        let mut arena = DependencyArena::new();
        let failing = Rc::new(Failing {
            binding: DependencyBinding::Revision {
                record: RECORD,
                revision: REV1,
            },
        });
        let later = DisposableResource::bound("later", RECORD, REV1);
        arena.insert("failing", failing);
        arena.insert("later", later.clone());

        let released = arena.dispose_bound_to(RECORD, REV1);
        assert_eq!(released.names, vec!["later".to_string()]);
        assert_eq!(released.failed, vec!["failing".to_string()]);
        assert!(later.is_disposed());
        assert!(arena.get("failing").is_some());
        assert!(matches!(
            released.into_result(),
            Err(RevisionError::Backend(_))
        ));
    }

    #[test]
    fn test_free_slots_are_reused() {
        let mut arena = DependencyArena::new();
        let first = arena.insert("a", DisposableResource::plain("a"));
        arena.insert("b", DisposableResource::plain("b"));

        arena.remove("a");
        let reused = arena.insert("c", DisposableResource::plain("c"));
        assert_eq!(reused, first);
        assert_eq!(arena.len(), 2);
        assert!(arena.get("c").is_some());
    }
}
