// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `expand` command.

use std::sync::Arc;

use futures::StreamExt;
use tracing::info;

use uagraph_config::UaGraphConfig;
use uagraph_core::{ExpansionPolicy, PublishedNode, PublishedNodesEntry};

use crate::cli::ExpandArgs;
use crate::error::{BinError, BinResult};
use crate::runtime::Session;

use super::{print_json, print_json_line};

/// Executes the `expand` command.
pub async fn expand(config: Arc<UaGraphConfig>, args: &ExpandArgs) -> BinResult<()> {
    let entry = build_entry(args)?;
    let policy = build_policy(config.engine_options().expansion, args);

    let mut session = Session::open(config, &args.snapshot.snapshot)?;
    session.arm();

    let expansion = session
        .engine()
        .expand_with(entry, policy, session.cancel().clone());

    let mut entries = 0usize;
    let mut errors = 0usize;
    if args.stream {
        let mut stream = Box::pin(expansion.into_stream());
        while let Some(result) = stream.next().await {
            if result.is_error() {
                errors += 1;
            } else {
                entries += 1;
            }
            print_json_line(&result)?;
        }
    } else {
        let results = expansion.collect().await;
        errors = results.iter().filter(|r| r.is_error()).count();
        entries = results.len() - errors;
        print_json(&results)?;
    }

    if session.cancel().is_cancelled() {
        return Err(BinError::operation("expansion cancelled before completion"));
    }
    info!(entries, errors, "Expansion finished");
    Ok(())
}

fn build_entry(args: &ExpandArgs) -> BinResult<PublishedNodesEntry> {
    let mut entry = match &args.entry {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| BinError::io(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str::<PublishedNodesEntry>(&content)
                .map_err(|e| BinError::input(format!("{}: {}", path.display(), e)))?
        }
        None => PublishedNodesEntry::new(args.nodes.iter().map(PublishedNode::from_id).collect()),
    };
    if let Some(group) = &args.group {
        entry = entry.with_group(group.clone());
    }
    entry
        .validate()
        .map_err(|e| BinError::input(e.to_string()))?;
    Ok(entry)
}

/// Applies command line switches on top of the configured policy.
fn build_policy(base: ExpansionPolicy, args: &ExpandArgs) -> ExpansionPolicy {
    let mut policy = base;
    if args.single_writer {
        policy = policy.with_single_writer(true);
    }
    if args.discard_errors {
        policy = policy.with_discard_errors(true);
    }
    if args.exclude_root {
        policy = policy.with_exclude_root_object(true);
    }
    if args.no_subtypes {
        policy = policy.with_no_subtypes(true);
    }
    if args.methods {
        policy = policy.with_methods(true);
    }
    if args.levels.is_some() {
        policy = policy.with_levels_to_expand(args.levels);
    }
    if args.max_depth.is_some() {
        policy = policy.with_max_depth(args.max_depth);
    }
    if let Some(format) = args.namespace_format {
        policy = policy.with_namespace_format(format.into());
    }
    policy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use uagraph_core::NamespaceFormat;

    fn args(extra: &[&str]) -> ExpandArgs {
        let mut argv = vec!["uagraph", "expand", "-s", "space.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Expand(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_policy_overrides() {
        let base = ExpansionPolicy::default().with_discard_errors(true);
        let policy = build_policy(
            base,
            &args(&["-n", "ns=1;i=1", "--single-writer", "--max-depth", "0", "--namespace-format", "index"]),
        );
        assert!(policy.discard_errors);
        assert!(policy.create_single_writer);
        assert_eq!(policy.max_depth, Some(0));
        assert_eq!(policy.levels_to_expand, None);
        assert_eq!(policy.namespace_format, NamespaceFormat::Index);
    }

    #[test]
    fn test_entry_from_nodes() {
        let entry = build_entry(&args(&["-n", "ns=1;i=1", "-n", "ns=1;i=2", "-g", "Line1"])).unwrap();
        assert_eq!(entry.opc_nodes.len(), 2);
        assert_eq!(entry.data_set_writer_group.as_deref(), Some("Line1"));
    }

    #[test]
    fn test_entry_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.json");
        std::fs::write(
            &path,
            r#"{"DataSetWriterGroup": "G", "OpcNodes": [{"Id": "ns=1;i=10", "DataSetFieldId": "F"}]}"#,
        )
        .unwrap();

        let entry = build_entry(&args(&["-e", path.to_str().unwrap()])).unwrap();
        assert_eq!(entry.data_set_writer_group.as_deref(), Some("G"));
        assert_eq!(entry.opc_nodes[0].data_set_field_id.as_deref(), Some("F"));
    }
}
