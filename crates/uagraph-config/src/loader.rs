// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading.
//!
//! Loading runs in a fixed order:
//!
//! ```text
//! read file ─► ${VAR} placeholders ─► parse (yaml | toml | json)
//!           ─► UAGRAPH_* overrides ─► validate
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, UaGraphConfig};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "UAGRAPH";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`UaGraphConfig`] from files or strings.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a loader with the `UAGRAPH` prefix and env resolution enabled.
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment override prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholder resolution and env overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Returns the environment override prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Loads configuration from a file, picking the format from its extension.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UaGraphConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let format = ConfigFormat::from_path(path)?;
        let content = self.read_file(path)?;
        let mut config = self.parse_content(&content, format, path)?;
        debug!(format = ?format, "Configuration parsed");

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Loads configuration from a file, or returns validated defaults when `path` is `None`.
    pub fn load_or_default(&self, path: Option<&Path>) -> ConfigResult<UaGraphConfig> {
        match path {
            Some(path) => self.load(path),
            None => {
                let mut config = UaGraphConfig::default();
                if self.resolve_env_vars {
                    self.apply_env_overrides(&mut config)?;
                }
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UaGraphConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let mut config = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<UaGraphConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Resolves `${VAR}` and `${VAR:default}` placeholders.
    ///
    /// Unknown variables without a default are left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let body = &after[..end];
            let (name, default) = match body.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (body, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!(variable = name, "Environment variable not found");
                    result.push_str(&rest[start..start + 3 + end]);
                }
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Applies `<PREFIX>_*` environment overrides.
    fn apply_env_overrides(&self, config: &mut UaGraphConfig) -> ConfigResult<()> {
        if let Some(value) = self.env_parsed::<u32>("BROWSE_MAX_REFERENCES_PER_NODE", "expected number")? {
            config.browse.max_references_per_node = value;
        }
        if let Some(value) = self.env_parsed::<usize>("BROWSE_MAX_CONTINUATIONS", "expected number")? {
            config.browse.max_continuations = value;
        }

        if let Some(value) = self.env_var("EXPANSION_DISCARD_ERRORS") {
            config.expansion.discard_errors = parse_bool(&value);
        }
        if let Some(value) = self.env_var("EXPANSION_EXCLUDE_ROOT_OBJECT") {
            config.expansion.exclude_root_object = parse_bool(&value);
        }
        if let Some(value) = self.env_var("EXPANSION_NO_SUBTYPES") {
            config.expansion.no_subtypes = parse_bool(&value);
        }
        if let Some(value) = self.env_var("EXPANSION_CREATE_SINGLE_WRITER") {
            config.expansion.create_single_writer = parse_bool(&value);
        }
        if let Some(value) = self.env_var("EXPANSION_INCLUDE_METHODS") {
            config.expansion.include_methods = parse_bool(&value);
        }
        if let Some(value) = self.env_parsed::<u32>("EXPANSION_LEVELS_TO_EXPAND", "expected number")? {
            config.expansion.levels_to_expand = Some(value);
        }
        if let Some(value) = self.env_parsed::<u32>("EXPANSION_MAX_DEPTH", "expected number")? {
            config.expansion.max_depth = Some(value);
        }

        if let Some(value) = self.env_var("CODEC_STRICT_DIMENSIONS") {
            config.codec.strict_dimensions = parse_bool(&value);
        }

        if let Some(value) = self.env_var("ENGINE_OPERATION_DEADLINE") {
            let deadline = humantime::parse_duration(&value).map_err(|e| {
                ConfigError::invalid_env_var(self.env_name("ENGINE_OPERATION_DEADLINE"), e.to_string())
            })?;
            config.engine.operation_deadline = Some(deadline);
        }

        if let Some(value) = self.env_var("LOG_LEVEL") {
            match LogLevel::parse(&value) {
                Some(level) => config.logging.level = level,
                None => warn!(value = %value, "Ignoring unknown log level override"),
            }
        }
        if let Some(value) = self.env_var("LOG_FORMAT") {
            match LogFormat::parse(&value) {
                Some(format) => config.logging.format = format,
                None => warn!(value = %value, "Ignoring unknown log format override"),
            }
        }

        Ok(())
    }

    fn env_name(&self, key: &str) -> String {
        format!("{}_{}", self.env_prefix, key)
    }

    fn env_var(&self, key: &str) -> Option<String> {
        env::var(self.env_name(key)).ok()
    }

    fn env_parsed<T: FromStr>(&self, key: &str, expected: &str) -> ConfigResult<Option<T>> {
        match self.env_var(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::invalid_env_var(self.env_name(key), expected)),
            None => Ok(None),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<UaGraphConfig> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

/// YAML goes through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
///
/// ```no_run
/// use uagraph_config::loader::load_config;
///
/// let config = load_config("uagraph.yaml").unwrap();
/// ```
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UaGraphConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<UaGraphConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================
