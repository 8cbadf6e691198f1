// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for uagraph.
//!
//! # Schema Structure
//!
//! ```text
//! UaGraphConfig
//! ├── browse: BrowseOptions
//! ├── expansion: ExpansionPolicy
//! ├── codec: CodecOptions
//! ├── engine: EngineConfig
//! └── logging: LoggingConfig
//! ```
//!
//! Every section is optional; an empty document yields the defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uagraph_core::{BrowseOptions, CodecOptions, EngineOptions, ExpansionPolicy, NamespaceFormat};

// =============================================================================
// Constants
// =============================================================================

/// Upper bound accepted for `browse.max_continuations`.
pub const MAX_CONTINUATIONS_LIMIT: usize = 1_000_000;

/// Shortest accepted operation deadline.
pub const MIN_OPERATION_DEADLINE: Duration = Duration::from_millis(1);

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for uagraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UaGraphConfig {
    /// Browse paging.
    #[serde(default)]
    pub browse: BrowseOptions,

    /// Default expansion policy.
    #[serde(default)]
    pub expansion: ExpansionPolicy,

    /// Value codec settings.
    #[serde(default)]
    pub codec: CodecOptions,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl UaGraphConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.browse.max_continuations == 0 {
            return Err(ConfigError::validation(
                "browse.max_continuations",
                "must be greater than 0",
            ));
        }
        if self.browse.max_continuations > MAX_CONTINUATIONS_LIMIT {
            return Err(ConfigError::validation(
                "browse.max_continuations",
                format!("cannot exceed {}", MAX_CONTINUATIONS_LIMIT),
            ));
        }

        self.engine.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Builds the engine options described by this configuration.
    ///
    /// `engine.namespace_format`, when set, replaces the expansion policy's format.
    pub fn engine_options(&self) -> EngineOptions {
        let mut expansion = self.expansion.clone();
        if let Some(format) = self.engine.namespace_format {
            expansion.namespace_format = format;
        }
        EngineOptions::default()
            .with_browse(self.browse)
            .with_codec(self.codec.clone())
            .with_expansion(expansion)
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Engine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Deadline after which a running operation is cancelled (`"30s"`, `"2m"`).
    #[serde(default, with = "option_duration")]
    pub operation_deadline: Option<Duration>,

    /// Node id rendering in emitted output.
    #[serde(default)]
    pub namespace_format: Option<NamespaceFormat>,
}

impl EngineConfig {
    /// Sets the operation deadline.
    pub fn with_operation_deadline(mut self, deadline: Duration) -> Self {
        self.operation_deadline = Some(deadline);
        self
    }

    /// Sets the namespace format.
    pub fn with_namespace_format(mut self, format: NamespaceFormat) -> Self {
        self.namespace_format = Some(format);
        self
    }

    /// Validates the engine configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(deadline) = self.operation_deadline {
            if deadline < MIN_OPERATION_DEADLINE {
                return Err(ConfigError::validation(
                    "engine.operation_deadline",
                    "must be at least 1ms",
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, accepting `warning` for `warn`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Text,
    /// Compact single-line output.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "compact" => Some(LogFormat::Compact),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

mod option_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => humantime::format_duration(*d).to_string().serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        opt.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = UaGraphConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.browse.max_continuations, 10_000);
        assert!(config.codec.strict_dimensions);
        assert_eq!(config.engine.operation_deadline, None);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_zero_continuations_rejected() {
        let mut config = UaGraphConfig::default();
        config.browse.max_continuations = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "browse.max_continuations"
        ));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let mut config = UaGraphConfig::default();
        config.engine.operation_deadline = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_options_namespace_override() {
        let mut config = UaGraphConfig::default();
        config.expansion.create_single_writer = true;
        config.engine = EngineConfig::default().with_namespace_format(NamespaceFormat::Index);

        let options = config.engine_options();
        assert!(options.expansion.create_single_writer);
        assert_eq!(options.expansion.namespace_format, NamespaceFormat::Index);
    }

    #[test]
    fn test_deadline_humantime_json() {
        let config: UaGraphConfig =
            serde_json::from_str(r#"{"engine": {"operation_deadline": "1m 30s"}}"#).unwrap();
        assert_eq!(config.engine.operation_deadline, Some(Duration::from_secs(90)));

        let json = serde_json::to_string(&config.engine).unwrap();
        assert!(json.contains("1m 30s"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<UaGraphConfig, _> = serde_json::from_str(r#"{"gateway": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_level_and_format_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("nope"), None);
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Text));
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }
}
