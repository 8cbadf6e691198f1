// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! uagraph - OPC UA address-space engine
//!
//! Main binary entry point.

use uagraph_bin::error::report_error_and_exit;
use uagraph_bin::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    if let Err(error) = uagraph_bin::run(cli).await {
        report_error_and_exit(error);
    }
}
