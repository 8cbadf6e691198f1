// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagraph-bin
//!
//! CLI binary for the uagraph engine.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────┐
//!                    │   main.rs   │
//!                    └──────┬──────┘
//!                           │
//!                    ┌──────▼──────┐
//!                    │   cli.rs    │
//!                    └──────┬──────┘
//!                           │  config + logging
//!               ┌───────────┼───────────┐
//!               ▼           ▼           ▼
//!        ┌──────────┐ ┌──────────┐ ┌──────────┐
//!        │ commands │ │ runtime  │ │ logging  │
//!        └────┬─────┘ └────┬─────┘ └──────────┘
//!             │            │
//!             └─────┬──────┘
//!                   ▼
//!            ┌─────────────┐
//!            │ uagraph-core│
//!            └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Expand two roots into one writer entry
//! uagraph expand -s plant.json -n "ns=2;s=Line1" -n "ns=2;s=Line2" --single-writer
//!
//! # Show the metadata of a node found by path
//! uagraph metadata -s plant.json -p Objects 2:Line1 2:Pump
//!
//! # Write a value and persist the snapshot
//! uagraph write -s plant.json -n "ns=2;i=17" -v '{"type":"Double","value":3.5}' --save
//!
//! # Validate configuration
//! uagraph -c uagraph.yaml validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::Session;

use std::sync::Arc;

use uagraph_config::ConfigLoader;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Loads the configuration, initializes logging and runs the command.
pub async fn run(cli: Cli) -> BinResult<()> {
    let config = ConfigLoader::new().load_or_default(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.as_str().to_string());
    let format = cli.log_format.unwrap_or_else(|| config.logging.format.into());
    init_logging(&level, format)?;

    commands::execute(&cli, Arc::new(config)).await
}
