// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `write` command.

use std::sync::Arc;

use tracing::info;

use uagraph_config::UaGraphConfig;
use uagraph_core::{GenericValue, ValueWriteRequest};

use crate::cli::WriteArgs;
use crate::error::{BinError, BinResult};
use crate::runtime::{target_from_args, Session};

use super::print_json;

/// Executes the `write` command.
pub async fn write(config: Arc<UaGraphConfig>, args: &WriteArgs) -> BinResult<()> {
    let request = build_request(args)?;

    let mut session = Session::open(config, &args.snapshot.snapshot)?;
    session.arm();

    let response = session.engine().write(&request, session.cancel()).await;
    print_json(&response)?;

    if let Some(diagnostic) = response.error_info {
        return Err(BinError::operation(format!(
            "{}: {}",
            diagnostic.symbolic_id, diagnostic.message
        )));
    }

    if args.save {
        session.save()?;
    }
    info!(value = request.value.type_name(), "Value written");
    Ok(())
}

fn build_request(args: &WriteArgs) -> BinResult<ValueWriteRequest> {
    let value: GenericValue = serde_json::from_str(&args.value)
        .map_err(|e| BinError::input(format!("--value: {}", e)))?;
    let mut request = ValueWriteRequest::new(target_from_args(&args.target)?, value);
    if let Some(range) = &args.index_range {
        request = request.with_index_range(range.clone());
    }
    Ok(request)
}
