// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! Every engine command works on an address-space snapshot (`--snapshot`),
//! a JSON file in the format written by `MemoryNodeService::save_json`:
//!
//! - `expand`: Expand published nodes into leaf variable entries
//! - `metadata`: Show the metadata of a node
//! - `resolve`: Resolve a browse path to a node id
//! - `read`: Read and decode a variable value
//! - `write`: Encode and write a variable value
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// uagraph - OPC UA address-space engine
///
/// Expands, resolves, reads and writes nodes of an OPC UA address space.
#[derive(Parser, Debug)]
#[command(
    name = "uagraph",
    author = "Sylvex <contact@sylvex.io>",
    version = uagraph_core::VERSION,
    about = "OPC UA address-space expansion and typed value access",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (defaults apply when absent)
    #[arg(short, long, env = "UAGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overrides the configuration
    #[arg(short, long, env = "UAGRAPH_CLI_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format, overrides the configuration
    #[arg(long, env = "UAGRAPH_CLI_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the uagraph CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Expand published nodes
    ///
    /// Each node (or each node of the entry file) is an expansion root.
    /// Results are printed as a JSON array, or one JSON line per result with `--stream`.
    Expand(ExpandArgs),

    /// Show node metadata
    Metadata(MetadataArgs),

    /// Resolve a browse path
    Resolve(ResolveArgs),

    /// Read a variable value
    Read(ReadArgs),

    /// Write a variable value
    Write(WriteArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Snapshot selection shared by engine commands.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Address-space snapshot (JSON)
    #[arg(short, long, env = "UAGRAPH_SNAPSHOT")]
    pub snapshot: PathBuf,
}

/// A node given by id or by browse path.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Node id (`ns=2;s=Pump`, `nsu=urn:x;i=5`)
    #[arg(short, long, conflicts_with = "path")]
    pub node: Option<String>,

    /// Browse path segments from the RootFolder (`Objects 2:Pump 2:Speed`)
    #[arg(short, long, num_args = 1.., required_unless_present = "node")]
    pub path: Vec<String>,
}

/// Arguments for the `expand` command.
#[derive(Args, Debug, Clone)]
pub struct ExpandArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Root node ids
    #[arg(short, long = "node", required_unless_present = "entry")]
    pub nodes: Vec<String>,

    /// Published nodes entry file (JSON)
    #[arg(short, long, conflicts_with = "nodes")]
    pub entry: Option<PathBuf>,

    /// Writer group for the expanded entries
    #[arg(short, long)]
    pub group: Option<String>,

    /// Merge all leaves into one entry
    #[arg(long)]
    pub single_writer: bool,

    /// Skip failing branches instead of reporting them
    #[arg(long)]
    pub discard_errors: bool,

    /// Do not treat a root object as a unit of its own
    #[arg(long)]
    pub exclude_root: bool,

    /// Type roots only match instances of exactly that type
    #[arg(long)]
    pub no_subtypes: bool,

    /// Aggregation levels collected below each root
    #[arg(long)]
    pub levels: Option<u32>,

    /// Hierarchy depth searched for objects
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Emit methods as leaves
    #[arg(long)]
    pub methods: bool,

    /// Node id rendering in the output
    #[arg(long)]
    pub namespace_format: Option<NamespaceFormatArg>,

    /// Print one JSON line per result as results arrive
    #[arg(long)]
    pub stream: bool,
}

/// Arguments for the `metadata` command.
#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the `resolve` command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Start node (RootFolder when absent)
    #[arg(long)]
    pub start: Option<String>,

    /// Relative path in text form (`/Objects/2:Data.2:Static`)
    #[arg(short, long, conflicts_with = "segments")]
    pub relative: Option<String>,

    /// Path segments
    #[arg(required_unless_present = "relative")]
    pub segments: Vec<String>,
}

/// Arguments for the `read` command.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the `write` command.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Value as JSON (`{"type":"Int32","value":5}`)
    #[arg(short, long)]
    pub value: String,

    /// Index range (`2`, `1:3`, `0:1,2:3`)
    #[arg(short, long)]
    pub index_range: Option<String>,

    /// Write the modified snapshot back to its file
    #[arg(long)]
    pub save: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<uagraph_config::LogFormat> for LogFormat {
    fn from(format: uagraph_config::LogFormat) -> Self {
        match format {
            uagraph_config::LogFormat::Text => LogFormat::Text,
            uagraph_config::LogFormat::Json => LogFormat::Json,
            uagraph_config::LogFormat::Compact => LogFormat::Compact,
        }
    }
}

/// Node id rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NamespaceFormatArg {
    /// `ns=<index>;...`
    Index,
    /// `<uri>#...`
    Uri,
    /// `nsu=<uri>;...`
    Expanded,
}

impl From<NamespaceFormatArg> for uagraph_core::NamespaceFormat {
    fn from(format: NamespaceFormatArg) -> Self {
        match format {
            NamespaceFormatArg::Index => uagraph_core::NamespaceFormat::Index,
            NamespaceFormatArg::Uri => uagraph_core::NamespaceFormat::Uri,
            NamespaceFormatArg::Expanded => uagraph_core::NamespaceFormat::Expanded,
        }
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_command() {
        let cli = Cli::parse_from([
            "uagraph", "expand", "-s", "space.json", "-n", "ns=1;i=1", "-n", "ns=1;i=2",
            "--single-writer", "--levels", "2",
        ]);
        if let Commands::Expand(args) = cli.command {
            assert_eq!(args.snapshot.snapshot, PathBuf::from("space.json"));
            assert_eq!(args.nodes, vec!["ns=1;i=1", "ns=1;i=2"]);
            assert!(args.single_writer);
            assert_eq!(args.levels, Some(2));
            assert!(args.entry.is_none());
        } else {
            panic!("Expected Expand command");
        }
    }

    #[test]
    fn test_expand_requires_roots() {
        assert!(Cli::try_parse_from(["uagraph", "expand", "-s", "space.json"]).is_err());
    }

    #[test]
    fn test_resolve_segments() {
        let cli = Cli::parse_from(["uagraph", "resolve", "-s", "a.json", "Objects", "1:Pump"]);
        if let Commands::Resolve(args) = cli.command {
            assert_eq!(args.segments, vec!["Objects", "1:Pump"]);
            assert!(args.relative.is_none());
        } else {
            panic!("Expected Resolve command");
        }
    }

    #[test]
    fn test_write_by_path() {
        let cli = Cli::parse_from([
            "uagraph", "write", "-s", "a.json", "-p", "Objects", "1:Pump", "1:Speed",
            "-v", r#"{"type":"Double","value":1.5}"#,
        ]);
        if let Commands::Write(args) = cli.command {
            assert_eq!(args.target.path, vec!["Objects", "1:Pump", "1:Speed"]);
            assert!(args.target.node.is_none());
            assert!(!args.save);
        } else {
            panic!("Expected Write command");
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from([
            "uagraph", "version", "-c", "/etc/uagraph.yaml", "-l", "debug", "--log-format", "json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/uagraph.yaml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert!(matches!(cli.command, Commands::Version));
    }
}
