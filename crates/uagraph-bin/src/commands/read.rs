// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `read` command.

use std::sync::Arc;

use uagraph_config::UaGraphConfig;
use uagraph_core::ValueReadRequest;

use crate::cli::ReadArgs;
use crate::error::{BinError, BinResult};
use crate::runtime::{target_from_args, Session};

use super::print_json;

/// Executes the `read` command.
pub async fn read(config: Arc<UaGraphConfig>, args: &ReadArgs) -> BinResult<()> {
    let request = ValueReadRequest {
        target: target_from_args(&args.target)?,
        data_type: None,
    };

    let mut session = Session::open(config, &args.snapshot.snapshot)?;
    session.arm();

    let response = session.engine().read(&request, session.cancel()).await;
    print_json(&response)?;

    match response.error_info {
        Some(diagnostic) => Err(BinError::operation(format!(
            "{}: {}",
            diagnostic.symbolic_id, diagnostic.message
        ))),
        None => Ok(()),
    }
}
