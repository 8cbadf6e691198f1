// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! Engine commands print their result as pretty JSON on stdout.

mod expand;
mod metadata;
mod read;
mod resolve;
mod validate;
mod version;
mod write;

pub use expand::expand;
pub use metadata::metadata;
pub use read::read;
pub use resolve::resolve;
pub use validate::validate;
pub use version::version;
pub use write::write;

use std::io::Write as _;
use std::sync::Arc;

use serde::Serialize;
use uagraph_config::UaGraphConfig;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: &Cli, config: Arc<UaGraphConfig>) -> BinResult<()> {
    match &cli.command {
        Commands::Expand(args) => expand::expand(config, args).await,
        Commands::Metadata(args) => metadata::metadata(config, args).await,
        Commands::Resolve(args) => resolve::resolve(config, args).await,
        Commands::Read(args) => read::read(config, args).await,
        Commands::Write(args) => write::write(config, args).await,
        Commands::Validate(args) => validate::validate(cli, &config, args),
        Commands::Version => version::version(cli),
    }
}

/// Prints a value as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> BinResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

/// Prints a value as one compact JSON line.
pub(crate) fn print_json_line<T: Serialize>(value: &T) -> BinResult<()> {
    let json = serde_json::to_string(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    stdout.flush()?;
    Ok(())
}
