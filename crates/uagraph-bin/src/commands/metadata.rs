// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `metadata` command.

use std::sync::Arc;

use uagraph_config::UaGraphConfig;
use uagraph_core::NodeId;

use crate::cli::MetadataArgs;
use crate::error::BinResult;
use crate::runtime::{target_from_args, Session};

use super::print_json;

/// Executes the `metadata` command.
pub async fn metadata(config: Arc<UaGraphConfig>, args: &MetadataArgs) -> BinResult<()> {
    let target = target_from_args(&args.target)?;
    let mut session = Session::open(config, &args.snapshot.snapshot)?;
    session.arm();

    let engine = session.engine();
    let cancel = session.cancel();
    let node_id = match target.node_id {
        Some(node_id) => node_id,
        None => engine.resolve_path(&NodeId::NULL, &target.browse_path, cancel).await?,
    };

    let metadata = engine.get_metadata(&node_id, cancel).await?;
    print_json(&metadata)
}
