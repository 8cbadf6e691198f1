// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Configuration files driving a real engine over the fixtures.
//!
//! ## Test Categories
//!
//! - `test_config_drives_*`: Settings observed through expansion
//! - `test_config_rejects_*`: Invalid configuration

use std::sync::Arc;

use uagraph_config::{ConfigError, ConfigFormat, ConfigLoader, UaGraphConfig};
use uagraph_core::{CancellationSignal, NamespaceFormat, NodeEngine};
use uagraph_tests::common::temp_test_dir;
use uagraph_tests::prelude::*;

fn loader() -> ConfigLoader {
    ConfigLoader::new().with_env_vars(false)
}

fn load(content: &str, format: ConfigFormat) -> UaGraphConfig {
    loader().load_from_str(content, format).unwrap()
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_config_drives_single_writer() {
    let config = load(
        r#"
expansion:
  create_single_writer: true
"#,
        ConfigFormat::Yaml,
    );
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::with_options(fixture.service.clone(), config.engine_options());

    let results = engine
        .expand(fixture.root_entry(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_no_errors();
    results.assert_entry_count(1);
    assert_eq!(results.total_nodes(), fixture.leaf_count());
}

#[tokio::test]
async fn test_config_drives_namespace_format() {
    let config = load(
        r#"
[expansion]
namespace_format = "expanded"

[engine]
namespace_format = "index"
"#,
        ConfigFormat::Toml,
    );
    assert_eq!(config.engine_options().expansion.namespace_format, NamespaceFormat::Index);

    let fixture = AddressSpaceFixtures::sensors(3);
    let engine = NodeEngine::with_options(fixture.service.clone(), config.engine_options());
    let results = engine
        .expand(fixture.root_entry(), CancellationSignal::new())
        .collect()
        .await;

    results.assert_entry_count(3);
    for entry in results.entries() {
        for id in entry.node_ids() {
            assert!(id.starts_with("ns=1;"), "unexpected node id {}", id);
        }
    }
}

#[tokio::test]
async fn test_config_drives_error_discarding_from_file() {
    let dir = temp_test_dir("uagraph_config_");
    let path = dir.path().join("uagraph.json");
    std::fs::write(&path, r#"{"expansion": {"discard_errors": true}}"#).unwrap();
    let config = loader().load(&path).unwrap();

    let fixture = AddressSpaceFixtures::production(6);
    fixture.service.fail_browse(&fixture.machines[1]);
    let engine = NodeEngine::with_options(fixture.service.clone(), config.engine_options());

    let results = engine
        .expand(fixture.root_entry(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_no_errors();
    results.assert_entry_count(29);
}

#[tokio::test]
async fn test_config_drives_browse_page_size() {
    let config = load(r#"{"browse": {"max_references_per_node": 2}}"#, ConfigFormat::Json);
    let fixture = AddressSpaceFixtures::sensors(6);
    let service = Arc::new(RecordingNodeService::new(fixture.service.clone()));
    let engine = NodeEngine::with_options(service.clone(), config.engine_options());

    let results = engine
        .expand(fixture.root_entry(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(6);
    assert!(service.count(|c| *c == ServiceCall::BrowseNext) > 0);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_config_rejects_invalid_values() {
    let result = loader().load_from_str(
        r#"{"browse": {"max_continuations": 0}}"#,
        ConfigFormat::Json,
    );
    assert!(matches!(result, Err(ConfigError::Validation { ref field, .. })
        if field == "browse.max_continuations"));

    let result = loader().load_from_str("engine:\n  operation_deadline: 0s\n", ConfigFormat::Yaml);
    assert!(matches!(result, Err(ConfigError::Validation { .. })));
}

#[test]
fn test_config_rejects_unknown_sections() {
    let result = loader().load_from_str("[server]\nport = 4840\n", ConfigFormat::Toml);
    assert!(result.is_err());
}
