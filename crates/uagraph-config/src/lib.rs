// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagraph-config
//!
//! Configuration management for the uagraph engine.
//!
//! ## Features
//!
//! - **Schema Definition**: Browse, expansion, codec, engine and logging sections
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `${VAR}` placeholders and `UAGRAPH_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use uagraph_config::loader::load_config;
//!
//! let config = load_config("uagraph.yaml").unwrap();
//! let options = config.engine_options();
//! println!("single writer: {}", options.expansion.create_single_writer);
//! ```
//!
//! ## Example Configuration
//!
//! ```yaml
//! browse:
//!   max_references_per_node: 1000
//! expansion:
//!   create_single_writer: false
//!   levels_to_expand: 2
//! engine:
//!   operation_deadline: 30s
//!   namespace_format: expanded
//! logging:
//!   level: info
//!   format: text
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader};
pub use schema::{EngineConfig, LogFormat, LogLevel, LoggingConfig, UaGraphConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
