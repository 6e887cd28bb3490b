//! Creation settings
//!
//! Settings passed to `create_new_record` are dispatched through an
//! explicit name → handler table built once, before the collection is used.
//! Unknown names are rejected.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::config::EngineContext;
use crate::errors::{RevisionError, RevisionResult};
use crate::revision::{RevisionData, ALIAS_KEY, CUSTOM_KEYS_PART, SETTINGS_PART};

/// Applies one setting value to the first revision of a new record
pub type SettingHandler = fn(&EngineContext, &mut RevisionData, &Value) -> RevisionResult<()>;

/// Name → handler registration table
#[derive(Clone)]
pub struct SettingHandlers {
    handlers: BTreeMap<String, SettingHandler>,
}

impl SettingHandlers {
    /// Empty table
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` under `name`, returning the one it replaces
    pub fn register(&mut self, name: &str, handler: SettingHandler) -> Option<SettingHandler> {
        self.handlers.insert(name.to_string(), handler)
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, name: &str, handler: SettingHandler) -> Self {
        self.register(name, handler);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Apply one setting. `UnknownSetting` if no handler is registered.
    pub fn apply(
        &self,
        context: &EngineContext,
        data: &mut RevisionData,
        name: &str,
        value: &Value,
    ) -> RevisionResult<()> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| RevisionError::UnknownSetting(name.to_string()))?;
        handler(context, data, value)
    }

    /// Apply every setting, or none if any is unknown.
    pub fn apply_all(
        &self,
        context: &EngineContext,
        data: &mut RevisionData,
        settings: &BTreeMap<String, Value>,
    ) -> RevisionResult<()> {
        if let Some(unknown) = settings.keys().find(|name| !self.contains(name)) {
            return Err(RevisionError::UnknownSetting(unknown.clone()));
        }
        for (name, value) in settings {
            self.apply(context, data, name, value)?;
        }
        Ok(())
    }
}

impl Default for SettingHandlers {
    fn default() -> Self {
        Self::empty()
            .with(ALIAS_KEY, apply_alias)
            .with(CUSTOM_KEYS_PART, apply_custom_keys)
            .with("comment", apply_comment)
    }
}

impl fmt::Debug for SettingHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handlers.keys()).finish()
    }
}

fn invalid(name: &str, reason: &str) -> RevisionError {
    RevisionError::InvalidSetting {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn apply_alias(context: &EngineContext, data: &mut RevisionData, value: &Value) -> RevisionResult<()> {
    let alias = value
        .as_str()
        .ok_or_else(|| invalid(ALIAS_KEY, "expected a string"))?;
    context.schema().kind_of(SETTINGS_PART)?;
    context.validate_alias(alias)?;
    data.set_key(SETTINGS_PART, ALIAS_KEY, value.clone());
    Ok(())
}

fn apply_custom_keys(
    context: &EngineContext,
    data: &mut RevisionData,
    value: &Value,
) -> RevisionResult<()> {
    let keys = value
        .as_object()
        .ok_or_else(|| invalid(CUSTOM_KEYS_PART, "expected an object"))?;
    context.schema().kind_of(CUSTOM_KEYS_PART)?;
    for (name, value) in keys {
        data.set_key(CUSTOM_KEYS_PART, name, value.clone());
    }
    Ok(())
}

fn apply_comment(_context: &EngineContext, data: &mut RevisionData, value: &Value) -> RevisionResult<()> {
    data.comment = match value {
        Value::Null => None,
        Value::String(comment) => Some(comment.clone()),
        _ => return Err(invalid("comment", "expected a string or null")),
    };
    Ok(())
}
