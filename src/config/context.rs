//! Engine context
//!
//! Built once from an [`EngineConfig`] and passed by reference to every
//! component that needs configuration, classification, or logging.

use std::collections::BTreeSet;

use regex::Regex;

use crate::errors::{RevisionError, RevisionResult};
use crate::events::DEFAULT_REVISION_AGNOSTIC_EVENTS;
use crate::observability::Logger;
use crate::revision::{PartSchema, ALIAS_KEY};

use super::EngineConfig;

/// Shared, immutable engine context.
#[derive(Debug, Clone)]
pub struct EngineContext {
    config: EngineConfig,
    schema: PartSchema,
    alias_pattern: Regex,
    revision_agnostic_events: BTreeSet<String>,
    logger: Logger,
}

impl EngineContext {
    /// Build a context from a validated configuration
    pub fn from_config(config: EngineConfig) -> RevisionResult<Self> {
        config.validate()?;

        let schema = config
            .parts
            .iter()
            .fold(PartSchema::new(), |schema, part| {
                schema.with_part(part.name.clone(), part.kind)
            });

        let alias_pattern = Regex::new(&config.alias_pattern)
            .map_err(|e| RevisionError::config(e.to_string()))?;

        let revision_agnostic_events = DEFAULT_REVISION_AGNOSTIC_EVENTS
            .iter()
            .map(|name| name.to_string())
            .chain(config.revision_agnostic_events.iter().cloned())
            .collect();

        let logger = if config.log.enabled {
            Logger::new(config.log.min_severity)
        } else {
            Logger::disabled()
        };

        Ok(Self {
            config,
            schema,
            alias_pattern,
            revision_agnostic_events,
            logger,
        })
    }

    /// Context with the default configuration
    pub fn with_defaults() -> RevisionResult<Self> {
        Self::from_config(EngineConfig::default())
    }

    /// Replace the logger
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schema(&self) -> &PartSchema {
        &self.schema
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// True if every transaction is simulated
    pub fn simulation(&self) -> bool {
        self.config.simulation
    }

    /// Event names declared revision-agnostic at the type level
    pub fn revision_agnostic_events(&self) -> &BTreeSet<String> {
        &self.revision_agnostic_events
    }

    /// Check an alias against the configured pattern
    pub fn validate_alias(&self, alias: &str) -> RevisionResult<()> {
        if self.alias_pattern.is_match(alias) {
            Ok(())
        } else {
            Err(RevisionError::InvalidSetting {
                name: ALIAS_KEY.to_string(),
                reason: format!(
                    "'{}' does not match {}",
                    alias,
                    self.alias_pattern.as_str()
                ),
            })
        }
    }
}
