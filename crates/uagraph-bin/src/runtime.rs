// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-command runtime: configuration, the engine over a snapshot, and the
//! cancellation signal shared by the running operation.
//!
//! ```text
//!   UaGraphConfig ──► EngineOptions ─┐
//!                                    ├──► NodeEngine<MemoryNodeService>
//!   snapshot.json ──► MemoryNodeService
//!
//!   operation_deadline ─┐
//!   Ctrl+C ─────────────┴──► CancellationSignal
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use uagraph_config::UaGraphConfig;
use uagraph_core::{CancellationSignal, MemoryNodeService, NodeEngine, NodeId, NodeTarget};

use crate::cli::TargetArgs;
use crate::error::{BinError, BinResult};

// =============================================================================
// Session
// =============================================================================

/// An engine bound to one snapshot for the duration of a command.
pub struct Session {
    config: Arc<UaGraphConfig>,
    snapshot: PathBuf,
    engine: NodeEngine<MemoryNodeService>,
    cancel: CancellationSignal,
    watchers: Vec<JoinHandle<()>>,
}

impl Session {
    /// Loads the snapshot and builds the engine.
    pub fn open(config: Arc<UaGraphConfig>, snapshot: &Path) -> BinResult<Self> {
        let service = MemoryNodeService::load_json(snapshot)
            .map_err(|e| BinError::from(e).with_context("loading snapshot"))?
            .with_name(snapshot.display().to_string());
        info!(
            snapshot = %snapshot.display(),
            nodes = service.node_count(),
            "Address space loaded"
        );

        let engine = NodeEngine::with_options(Arc::new(service), config.engine_options());
        Ok(Self {
            config,
            snapshot: snapshot.to_path_buf(),
            engine,
            cancel: CancellationSignal::new(),
            watchers: Vec::new(),
        })
    }

    /// Arms the operation deadline and the Ctrl+C handler.
    ///
    /// Must be called from within the tokio runtime.
    pub fn arm(&mut self) {
        if let Some(deadline) = self.config.engine.operation_deadline {
            self.watchers.push(self.cancel.cancel_after(deadline));
        }

        let signal = self.cancel.clone();
        self.watchers.push(tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => {
                        warn!("Interrupted, cancelling the running operation");
                        signal.cancel();
                    }
                    Err(e) => warn!(error = %e, "Failed to register Ctrl+C handler"),
                },
                _ = signal.cancelled() => {}
            }
        }));
    }

    /// Returns the engine.
    pub fn engine(&self) -> &NodeEngine<MemoryNodeService> {
        &self.engine
    }

    /// Returns the cancellation signal.
    pub fn cancel(&self) -> &CancellationSignal {
        &self.cancel
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UaGraphConfig {
        &self.config
    }

    /// Writes the (possibly modified) address space back to the snapshot file.
    pub fn save(&self) -> BinResult<()> {
        self.engine
            .service()
            .save_json(&self.snapshot)
            .map_err(|e| BinError::from(e).with_context("saving snapshot"))?;
        info!(snapshot = %self.snapshot.display(), "Address space saved");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
    }
}

// =============================================================================
// Argument helpers
// =============================================================================

/// Parses a node id argument.
pub fn parse_node_id(value: &str) -> BinResult<NodeId> {
    value
        .parse()
        .map_err(|e: uagraph_core::OpcUaError| BinError::input(format!("'{}': {}", value, e)))
}

/// Converts target arguments into a node target.
pub fn target_from_args(args: &TargetArgs) -> BinResult<NodeTarget> {
    match &args.node {
        Some(node) => Ok(NodeTarget::node(parse_node_id(node)?)),
        None if !args.path.is_empty() => Ok(NodeTarget::path(args.path.iter().cloned())),
        None => Err(BinError::input("either --node or --path is required")),
    }
}
