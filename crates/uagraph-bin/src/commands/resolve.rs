// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `resolve` command.

use std::sync::Arc;

use serde::Serialize;
use uagraph_config::UaGraphConfig;
use uagraph_core::{NodeId, RelativePath};

use crate::cli::ResolveArgs;
use crate::error::{BinError, BinResult};
use crate::runtime::{parse_node_id, Session};

use super::print_json;

#[derive(Debug, Serialize)]
struct Resolved {
    start: String,
    path: String,
    node_id: String,
}

/// Executes the `resolve` command.
pub async fn resolve(config: Arc<UaGraphConfig>, args: &ResolveArgs) -> BinResult<()> {
    let start = match &args.start {
        Some(start) => parse_node_id(start)?,
        None => NodeId::NULL,
    };
    let path = match &args.relative {
        Some(text) => text
            .parse::<RelativePath>()
            .map_err(|e| BinError::input(e.to_string()))?,
        None => RelativePath::from_segments(args.segments.iter())
            .map_err(|e| BinError::input(e.to_string()))?,
    };

    let mut session = Session::open(config, &args.snapshot.snapshot)?;
    session.arm();

    let node_id = session
        .engine()
        .resolve_relative_path(&start, &path, session.cancel())
        .await?;

    print_json(&Resolved {
        start: start.to_string(),
        path: path.to_string(),
        node_id: node_id.to_string(),
    })
}
