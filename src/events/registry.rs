//! Event Registry
//!
//! Listener bookkeeping per record:
//! - event name -> listeners in registration order
//! - each listener is revision-agnostic or bound to the revision selected
//!   when it was registered
//! - event name -> suppression scopes (global, or one revision)
//!
//! Binding and suppression are evaluated against the revision selected at
//! trigger time. An event declared revision-agnostic at the type level
//! fires for every listener regardless of its binding, and its suppression
//! is always global.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::revision::RevisionNumber;

use super::RecordEvent;

/// Listener callback
pub type EventCallback = Box<dyn FnMut(&RecordEvent)>;

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which revisions a listener fires for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScope {
    /// Fires whichever revision is selected
    RevisionAgnostic,
    /// Fires only while this revision is selected
    Revision(RevisionNumber),
}

/// Scope of an `ignore` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum IgnoreScope {
    Global,
    Revision(RevisionNumber),
}

struct Listener {
    id: ListenerId,
    scope: ListenerScope,
    callback: EventCallback,
}

/// Revision-aware listener registry
pub struct EventRegistry {
    /// Event names declared revision-agnostic at the type level
    agnostic_events: BTreeSet<String>,
    listeners: HashMap<String, Vec<Listener>>,
    ignored: HashMap<String, HashSet<IgnoreScope>>,
    next_id: u64,
}

impl EventRegistry {
    /// Create a registry with the given revision-agnostic event names
    pub fn new(agnostic_events: BTreeSet<String>) -> Self {
        Self {
            agnostic_events,
            listeners: HashMap::new(),
            ignored: HashMap::new(),
            next_id: 1,
        }
    }

    /// True if `name` is declared revision-agnostic
    pub fn is_revision_agnostic(&self, name: &str) -> bool {
        self.agnostic_events.contains(name)
    }

    /// Register a listener bound to `selected`, unless the event is
    /// revision-agnostic.
    pub fn add_listener(
        &mut self,
        name: &str,
        selected: RevisionNumber,
        callback: EventCallback,
    ) -> ListenerId {
        let scope = if self.is_revision_agnostic(name) {
            ListenerScope::RevisionAgnostic
        } else {
            ListenerScope::Revision(selected)
        };
        self.push(name, scope, callback)
    }

    /// Register a listener that fires whichever revision is selected
    pub fn add_revision_agnostic_listener(
        &mut self,
        name: &str,
        callback: EventCallback,
    ) -> ListenerId {
        self.push(name, ListenerScope::RevisionAgnostic, callback)
    }

    fn push(&mut self, name: &str, scope: ListenerScope, callback: EventCallback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push(Listener {
                id,
                scope,
                callback,
            });
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        for listeners in self.listeners.values_mut() {
            if let Some(pos) = listeners.iter().position(|l| l.id == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    /// Scope a listener was registered with
    pub fn scope_of(&self, id: ListenerId) -> Option<ListenerScope> {
        self.listeners
            .values()
            .flat_map(|listeners| listeners.iter())
            .find(|l| l.id == id)
            .map(|l| l.scope)
    }

    /// Suppress `name`: globally for revision-agnostic events, otherwise
    /// only while `selected` remains selected.
    pub fn ignore(&mut self, name: &str, selected: RevisionNumber) {
        let scope = if self.is_revision_agnostic(name) {
            IgnoreScope::Global
        } else {
            IgnoreScope::Revision(selected)
        };
        self.ignored.entry(name.to_string()).or_default().insert(scope);
    }

    /// Lift every suppression of `name`
    pub fn unignore(&mut self, name: &str) {
        self.ignored.remove(name);
    }

    /// True if `name` is suppressed while `selected` is selected
    pub fn is_ignored(&self, name: &str, selected: RevisionNumber) -> bool {
        match self.ignored.get(name) {
            Some(scopes) => {
                scopes.contains(&IgnoreScope::Global)
                    || scopes.contains(&IgnoreScope::Revision(selected))
            }
            None => false,
        }
    }

    /// Dispatch `event` to every matching listener in registration order.
    ///
    /// `event.revision` is the revision selected at trigger time. Returns
    /// the number of listeners called.
    pub fn trigger(&mut self, event: &RecordEvent) -> usize {
        let selected = event.revision;
        if self.is_ignored(&event.name, selected) {
            return 0;
        }

        let agnostic = self.is_revision_agnostic(&event.name);
        let Some(listeners) = self.listeners.get_mut(&event.name) else {
            return 0;
        };

        let mut called = 0;
        for listener in listeners.iter_mut() {
            let matches = agnostic
                || match listener.scope {
                    ListenerScope::RevisionAgnostic => true,
                    ListenerScope::Revision(bound) => bound == selected,
                };
            if matches {
                (listener.callback)(event);
                called += 1;
            }
        }
        called
    }

    /// Drop listeners bound to `revision` and suppressions scoped to it.
    ///
    /// Used once a revision is deleted. Returns the number of listeners
    /// dropped.
    pub fn forget_revision(&mut self, revision: RevisionNumber) -> usize {
        let mut dropped = 0;
        for listeners in self.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.scope != ListenerScope::Revision(revision));
            dropped += before - listeners.len();
        }
        self.listeners.retain(|_, listeners| !listeners.is_empty());

        for scopes in self.ignored.values_mut() {
            scopes.remove(&IgnoreScope::Revision(revision));
        }
        self.ignored.retain(|_, scopes| !scopes.is_empty());
        dropped
    }

    /// Number of listeners registered for `name`
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map(Vec::len).unwrap_or(0)
    }

    /// Drop all listeners and suppressions
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.ignored.clear();
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventRegistry")
            .field("agnostic_events", &self.agnostic_events)
            .field("listeners", &counts)
            .field("ignored", &self.ignored)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::RecordId;
    use std::cell::RefCell;
    use std::rc::Rc;

    const REV1: RevisionNumber = RevisionNumber::new(1);
    const REV2: RevisionNumber = RevisionNumber::new(2);

    fn registry() -> EventRegistry {
        EventRegistry::new(["Agnostic".to_string()].into_iter().collect())
    }

    fn event(name: &str, revision: RevisionNumber) -> RecordEvent {
        RecordEvent::new(name, RecordId::new(1), revision)
    }

    fn counter() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> EventCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let make = move |tag: &str| -> EventCallback {
            let log = Rc::clone(&log_clone);
            let tag = tag.to_string();
            Box::new(move |_e: &RecordEvent| log.borrow_mut().push(tag.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_bound_listener_only_fires_on_its_revision() {
        let mut reg = registry();
        let (log, make) = counter();
        reg.add_listener("Saved", REV1, make("a"));

        assert_eq!(reg.trigger(&event("Saved", REV2)), 0);
        assert_eq!(reg.trigger(&event("Saved", REV1)), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn test_agnostic_listener_fires_everywhere() {
        let mut reg = registry();
        let (log, make) = counter();
        reg.add_revision_agnostic_listener("Saved", make("a"));

        reg.trigger(&event("Saved", REV1));
        reg.trigger(&event("Saved", REV2));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_type_level_agnostic_overrides_binding() {
        let mut reg = registry();
        let (log, make) = counter();
        let id = reg.add_listener("Agnostic", REV1, make("a"));

        assert_eq!(reg.scope_of(id), Some(ListenerScope::RevisionAgnostic));
        reg.trigger(&event("Agnostic", REV2));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_registration_order() {
        let mut reg = registry();
        let (log, make) = counter();
        reg.add_listener("Saved", REV1, make("first"));
        reg.add_revision_agnostic_listener("Saved", make("second"));
        reg.add_listener("Saved", REV1, make("third"));

        reg.trigger(&event("Saved", REV1));
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_ignore_is_revision_scoped() {
        let mut reg = registry();
        let (log, make) = counter();
        reg.add_revision_agnostic_listener("Saved", make("a"));

        reg.ignore("Saved", REV1);
        assert!(reg.is_ignored("Saved", REV1));
        assert!(!reg.is_ignored("Saved", REV2));

        assert_eq!(reg.trigger(&event("Saved", REV1)), 0);
        assert_eq!(reg.trigger(&event("Saved", REV2)), 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_ignore_agnostic_event_is_global() {
        let mut reg = registry();
        let (_log, make) = counter();
        reg.add_listener("Agnostic", REV1, make("a"));

        reg.ignore("Agnostic", REV1);
        assert!(reg.is_ignored("Agnostic", REV2));
        assert_eq!(reg.trigger(&event("Agnostic", REV2)), 0);

        reg.unignore("Agnostic");
        assert_eq!(reg.trigger(&event("Agnostic", REV2)), 1);
    }

    #[test]
    fn test_remove_listener() {
        let mut reg = registry();
        let (_log, make) = counter();
        let id = reg.add_listener("Saved", REV1, make("a"));

        assert!(reg.remove_listener(id));
        assert!(!reg.remove_listener(id));
        assert_eq!(reg.listener_count("Saved"), 0);
        assert_eq!(reg.trigger(&event("Saved", REV1)), 0);
    }

    #[test]
    fn test_forget_revision_drops_bound_only() {
        let mut reg = registry();
        let (log, make) = counter();
        reg.add_listener("Saved", REV1, make("gone"));
        reg.add_listener("Saved", REV2, make("kept"));
        reg.add_revision_agnostic_listener("Saved", make("any"));
        reg.ignore("Saved", REV1);

        assert_eq!(reg.forget_revision(REV1), 1);
        assert_eq!(reg.listener_count("Saved"), 2);
        assert!(!reg.is_ignored("Saved", REV1));

        reg.trigger(&event("Saved", REV1));
        assert_eq!(*log.borrow(), vec!["any"]);
    }

    #[test]
    fn test_unknown_event_is_noop() {
        let mut reg = registry();
        assert_eq!(reg.trigger(&event("Nothing", REV1)), 0);
    }
}
