//! Engine configuration and context
//!
//! `EngineConfig` is the serialized form (JSON). `EngineContext` is built
//! once from it and shared by reference with every collection and record;
//! there is no process-wide state.

mod context;

pub use context::EngineContext;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{RevisionError, RevisionResult};
use crate::observability::Severity;
use crate::revision::{PartKind, CUSTOM_KEYS_PART, SETTINGS_PART};

/// Storage part declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartConfig {
    /// Part name
    pub name: String,
    /// Structural or non-structural
    pub kind: PartKind,
}

impl PartConfig {
    pub fn new(name: impl Into<String>, kind: PartKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Whether engine events are logged (default: true)
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,

    /// Minimum severity written (default: INFO)
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            min_severity: default_min_severity(),
        }
    }
}

/// Engine configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Storage parts and their classification
    #[serde(default = "default_parts")]
    pub parts: Vec<PartConfig>,

    /// Extra event names declared revision-agnostic
    #[serde(default)]
    pub revision_agnostic_events: Vec<String>,

    /// Simulate every transaction (default: false)
    #[serde(default)]
    pub simulation: bool,

    /// Pattern aliases must match
    #[serde(default = "default_alias_pattern")]
    pub alias_pattern: String,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

fn default_parts() -> Vec<PartConfig> {
    vec![
        PartConfig::new(SETTINGS_PART, PartKind::NonStructural),
        PartConfig::new(CUSTOM_KEYS_PART, PartKind::Structural),
    ]
}

fn default_alias_pattern() -> String {
    "^[a-z0-9][a-z0-9_-]*$".to_string()
}

fn default_log_enabled() -> bool {
    true
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parts: default_parts(),
            revision_agnostic_events: Vec::new(),
            simulation: false,
            alias_pattern: default_alias_pattern(),
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> RevisionResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| RevisionError::config(format!("Failed to read config: {}", e)))?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration from JSON
    pub fn from_json_str(content: &str) -> RevisionResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| RevisionError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> RevisionResult<()> {
        if self.parts.is_empty() {
            return Err(RevisionError::config("At least one storage part is required"));
        }

        let mut seen = std::collections::HashSet::new();
        for part in &self.parts {
            if part.name.trim().is_empty() {
                return Err(RevisionError::config("Storage part names must not be empty"));
            }
            if !seen.insert(part.name.as_str()) {
                return Err(RevisionError::config(format!(
                    "Duplicate storage part '{}'",
                    part.name
                )));
            }
        }

        regex::Regex::new(&self.alias_pattern).map_err(|e| {
            RevisionError::config(format!(
                "Invalid alias_pattern '{}': {}",
                self.alias_pattern, e
            ))
        })?;

        Ok(())
    }
}
