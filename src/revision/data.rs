//! Revision data and storage parts
//!
//! A revision is an immutable, numbered snapshot of a record. Its data is
//! split into named storage parts, each a key/value map. Every part is
//! classified by the [`PartSchema`] as structural or non-structural.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{RevisionError, RevisionResult};
use crate::state::RevisionStatus;

/// Non-structural part holding label and alias.
pub const SETTINGS_PART: &str = "settings";

/// Structural part holding free-form custom keys.
pub const CUSTOM_KEYS_PART: &str = "custom_keys";

/// Key of the record label inside [`SETTINGS_PART`].
pub const LABEL_KEY: &str = "label";

/// Key of the record alias inside [`SETTINGS_PART`].
pub const ALIAS_KEY: &str = "alias";

/// Classification of a storage part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    /// Changing it invalidates a Finalized status.
    Structural,
    /// Changing it leaves the status alone.
    NonStructural,
}

impl PartKind {
    #[inline]
    pub fn is_structural(&self) -> bool {
        matches!(self, PartKind::Structural)
    }
}

/// Known storage parts and their classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSchema {
    parts: BTreeMap<String, PartKind>,
}

impl PartSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self {
            parts: BTreeMap::new(),
        }
    }

    /// Add a part. Later declarations of the same name win.
    pub fn with_part(mut self, name: impl Into<String>, kind: PartKind) -> Self {
        self.parts.insert(name.into(), kind);
        self
    }

    /// Classification of `part`, or `UnknownStoragePart`.
    pub fn kind_of(&self, part: &str) -> RevisionResult<PartKind> {
        self.parts
            .get(part)
            .copied()
            .ok_or_else(|| RevisionError::UnknownStoragePart(part.to_string()))
    }

    /// Returns true if `part` is declared.
    pub fn contains(&self, part: &str) -> bool {
        self.parts.contains_key(part)
    }

    /// True if any of `parts` is structural. Unknown parts count as structural.
    pub fn any_structural<'a>(&self, parts: impl IntoIterator<Item = &'a String>) -> bool {
        parts.into_iter().any(|part| {
            self.parts
                .get(part)
                .map(PartKind::is_structural)
                .unwrap_or(true)
        })
    }

    /// Iterate over declared parts in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, PartKind)> {
        self.parts.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for PartSchema {
    fn default() -> Self {
        Self::new()
            .with_part(SETTINGS_PART, PartKind::NonStructural)
            .with_part(CUSTOM_KEYS_PART, PartKind::Structural)
    }
}

/// Full data of one revision.
///
/// The status is part of the revision so that selecting an older revision
/// also restores the status it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionData {
    /// Status this revision was written with.
    pub status: RevisionStatus,
    /// Who produced this revision.
    pub author: String,
    /// Free-form revision comment.
    #[serde(default)]
    pub comment: Option<String>,
    /// When this revision was materialized.
    pub created_at: DateTime<Utc>,
    /// Storage part name -> key/value map.
    #[serde(default)]
    parts: BTreeMap<String, BTreeMap<String, Value>>,
}

impl RevisionData {
    /// Create empty revision data with the given status and author.
    pub fn new(status: RevisionStatus, author: impl Into<String>) -> Self {
        Self {
            status,
            author: author.into(),
            comment: None,
            created_at: Utc::now(),
            parts: BTreeMap::new(),
        }
    }

    /// Read a key.
    pub fn get_key(&self, part: &str, name: &str) -> Option<&Value> {
        self.parts.get(part).and_then(|keys| keys.get(name))
    }

    /// Write a key. Returns true if the stored value changed.
    pub fn set_key(&mut self, part: &str, name: &str, value: Value) -> bool {
        let keys = self.parts.entry(part.to_string()).or_default();
        match keys.get(name) {
            Some(existing) if *existing == value => false,
            _ => {
                keys.insert(name.to_string(), value);
                true
            }
        }
    }

    /// Remove a key. Returns true if it existed.
    pub fn remove_key(&mut self, part: &str, name: &str) -> bool {
        let removed = match self.parts.get_mut(part) {
            Some(keys) => keys.remove(name).is_some(),
            None => false,
        };
        if removed && self.parts.get(part).map(BTreeMap::is_empty).unwrap_or(false) {
            self.parts.remove(part);
        }
        removed
    }

    /// All keys of a part.
    pub fn part(&self, part: &str) -> Option<&BTreeMap<String, Value>> {
        self.parts.get(part)
    }

    /// Names of all non-empty parts.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Names of the parts whose key/value maps differ from `baseline`.
    ///
    /// Only data is compared; status and metadata are ignored.
    pub fn changed_parts(&self, baseline: &RevisionData) -> BTreeSet<String> {
        let empty = BTreeMap::new();
        self.parts
            .keys()
            .chain(baseline.parts.keys())
            .filter(|part| {
                let mine = self.parts.get(*part).unwrap_or(&empty);
                let theirs = baseline.parts.get(*part).unwrap_or(&empty);
                mine != theirs
            })
            .cloned()
            .collect()
    }

    /// Copy of this data as the base of a new revision.
    pub fn successor(
        &self,
        status: RevisionStatus,
        author: impl Into<String>,
        comment: Option<String>,
    ) -> Self {
        Self {
            status,
            author: author.into(),
            comment,
            created_at: Utc::now(),
            parts: self.parts.clone(),
        }
    }
}
