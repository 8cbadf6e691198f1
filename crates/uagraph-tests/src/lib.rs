// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagraph Integration Tests
//!
//! Shared fixtures and helpers plus the integration suites for the uagraph
//! engine. Every suite runs against [`uagraph_core::MemoryNodeService`]
//! address spaces built in-process; no server is required.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Canned address spaces and values
//!   - `builders`: Address-space builder with automatic node ids
//!   - `assertions`: Assertion extensions for expansion and write results
//!   - `mocks`: A recording, fault-injecting `NodeService` wrapper
//!   - `harness`: Engine + cancellation + temp dir with a test timeout
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p uagraph-tests
//!
//! # Run a specific suite
//! cargo test -p uagraph-tests --test integration_expand
//! cargo test -p uagraph-tests --test integration_metadata
//! cargo test -p uagraph-tests --test integration_path
//! cargo test -p uagraph-tests --test integration_codec
//! cargo test -p uagraph-tests --test integration_config
//!
//! # With log output
//! RUST_LOG=uagraph_core=debug cargo test -p uagraph-tests -- --nocapture
//! ```
//!
//! ## Test Categories
//!
//! ### Expansion (`integration_expand.rs`)
//! - Per-object and single-writer entries
//! - Depth and level limits, type roots, subtypes
//! - Error containment and cancellation
//!
//! ### Metadata (`integration_metadata.rs`)
//! - Type hierarchies and classification
//! - Declaration aggregation and overrides
//!
//! ### Paths (`integration_path.rs`)
//! - Browse path resolution and determinism
//! - Reference filters and namespace lookup
//!
//! ### Codec (`integration_codec.rs`)
//! - Typed reads and writes through the engine
//! - Shape and type validation before any write
//!
//! ### Config (`integration_config.rs`)
//! - Loading YAML/TOML/JSON into engine options
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use uagraph_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let fixture = AddressSpaceFixtures::sensors(4);
//!     TestHarness::with_name("something")
//!         .run(fixture.service.clone(), |resources| async move {
//!             let results = resources.expand(fixture.root_entry()).await;
//!             results.assert_entry_count(4);
//!         })
//!         .await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
