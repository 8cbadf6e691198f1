// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Expansion Integration Tests
//!
//! Address-space expansion through [`NodeEngine::expand_with`] over the
//! sensor and production fixtures.
//!
//! ## Test Categories
//!
//! - `test_writers_*`: Per-object vs single-writer output
//! - `test_limits_*`: Depth, level and root exclusion limits
//! - `test_roots_*`: Type, variable and path roots
//! - `test_errors_*`: Error containment
//! - `test_cancel_*`: Cancellation

use std::sync::Arc;

use futures::StreamExt;

use uagraph_core::{
    CancellationSignal, ExpansionPolicy, ExpansionResult, NamespaceFormat, NodeEngine, NodeId, NodeService,
    PublishedNode, PublishedNodesEntry, StatusCode,
};
use uagraph_tests::common::init_test_logging;
use uagraph_tests::prelude::*;

fn entry_for(id: &NodeId) -> PublishedNodesEntry {
    PublishedNodesEntry::new(vec![PublishedNode::from_id(id.to_string())])
}

// =============================================================================
// Writers
// =============================================================================

#[tokio::test]
async fn test_writers_one_result_per_sensor() {
    init_test_logging();
    let fixture = AddressSpaceFixtures::sensors(24);

    TestHarness::with_name("one_result_per_sensor")
        .run(fixture.service.clone(), |resources| async move {
            let results = resources
                .expand_with(fixture.root_entry(), ExpansionPolicy::default())
                .await;

            assert_eq!(results.len(), 24);
            results.assert_no_errors();
            for (i, entry) in results.entries().into_iter().enumerate() {
                entry.assert_node_count(1);
                entry.assert_writer_id(&format!("/1:Sensor{:02}", i));
                assert_eq!(entry.data_set_writer_group.as_deref(), Some("Sensors"));
                assert_eq!(entry.field_ids(), vec!["/1:Value".to_string()]);
            }
        })
        .await;
}

#[tokio::test]
async fn test_writers_single_writer_collects_all_leaves() {
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::new(fixture.service.clone());
    let policy = ExpansionPolicy::default().with_single_writer(true);

    let results = engine
        .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    let entry = results[0].entry().expect("single entry");
    entry.assert_node_count(258);
    assert_eq!(entry.opc_nodes.len(), fixture.leaf_count());
    results.assert_unique_nodes();

    let field_ids = entry.field_ids();
    assert!(field_ids.contains(&"/1:Line0/1:Throughput".to_string()));
    assert!(field_ids.contains(&"/1:Line5/1:Machine3/1:Temperature/1:EURange".to_string()));
}

#[tokio::test]
async fn test_writers_per_object_on_production() {
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::new(fixture.service.clone());

    let results = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;

    // Six lines and 24 machines; the folder itself has no leaves.
    results.assert_entry_count(30);
    results.assert_no_errors();
    assert_eq!(results.total_nodes(), 258);

    let machine = results
        .entries()
        .into_iter()
        .find(|e| e.data_set_name.as_deref() == Some("Line0.Machine1"))
        .expect("machine entry");
    machine.assert_node_count(10);
    machine.assert_writer_id("/1:Line0/1:Machine1");
    assert_eq!(
        machine.data_set_type.as_deref(),
        Some(format!("nsu={};{}", PLANT_NAMESPACE, fixture.machine_type.identifier).as_str())
    );
}

#[tokio::test]
async fn test_writers_are_deterministic() {
    let fixture = AddressSpaceFixtures::production(2);
    let engine = NodeEngine::new(fixture.service.clone());

    let first = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    let second = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_writers_field_id_prefix_and_group() {
    let fixture = AddressSpaceFixtures::sensors(3);
    let engine = NodeEngine::new(fixture.service.clone());
    let entry = PublishedNodesEntry::new(vec![
        PublishedNode::from_id(fixture.root.to_string()).with_field_id("plant")
    ])
    .with_group("Floor1");

    let results = engine
        .expand_with(entry, ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;

    let entries = results.entries();
    assert_eq!(entries.len(), 3);
    entries[0].assert_writer_id("plant/1:Sensor00");
    assert_eq!(entries[0].data_set_writer_group.as_deref(), Some("Floor1"));
    assert_eq!(entries[0].field_ids(), vec!["plant/1:Value".to_string()]);
}

#[tokio::test]
async fn test_writers_namespace_format() {
    let fixture = AddressSpaceFixtures::sensors(1);
    let engine = NodeEngine::new(fixture.service.clone());
    let value = &fixture.values[0];

    for (format, expected) in [
        (NamespaceFormat::Index, format!("ns=1;{}", value.identifier)),
        (NamespaceFormat::Uri, format!("{}#{}", PLANT_NAMESPACE, value.identifier)),
        (NamespaceFormat::Expanded, format!("nsu={};{}", PLANT_NAMESPACE, value.identifier)),
    ] {
        let policy = ExpansionPolicy::default().with_namespace_format(format);
        let results = engine
            .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.entries()[0].node_ids(), vec![expected]);
    }
}

#[tokio::test]
async fn test_writers_stream_matches_collect() {
    let fixture = AddressSpaceFixtures::sensors(5);
    let engine = NodeEngine::new(fixture.service.clone());

    let streamed: Vec<ExpansionResult> = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .into_stream()
        .collect()
        .await;
    let collected = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    assert_eq!(streamed, collected);
}

// =============================================================================
// Limits
// =============================================================================

#[tokio::test]
async fn test_limits_max_depth() {
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::new(fixture.service.clone());
    let policy = ExpansionPolicy::default().with_max_depth(Some(1));

    let results = engine
        .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
        .collect()
        .await;

    // Only the lines are reached.
    results.assert_entry_count(6);
    for entry in results.entries() {
        entry.assert_node_count(3);
    }
}

#[tokio::test]
async fn test_limits_levels_to_expand() {
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::new(fixture.service.clone());
    let policy = ExpansionPolicy::default()
        .with_single_writer(true)
        .with_levels_to_expand(Some(1));

    let results = engine
        .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
        .collect()
        .await;

    // EURange sits one level below Temperature and is cut off.
    let entry = results[0].entry().expect("single entry");
    entry.assert_node_count(258 - 24);
}

#[tokio::test]
async fn test_limits_exclude_root_object() {
    let fixture = AddressSpaceFixtures::production(1);
    let engine = NodeEngine::new(fixture.service.clone());
    let line = &fixture.lines[0];

    let with_root = engine
        .expand_with(entry_for(line), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    with_root.assert_entry_count(5);

    let policy = ExpansionPolicy::default().with_exclude_root_object(true);
    let without_root = engine
        .expand_with(entry_for(line), policy, CancellationSignal::new())
        .collect()
        .await;
    without_root.assert_entry_count(4);
    assert!(without_root
        .entries()
        .iter()
        .all(|e| e.data_set_name.as_deref() != Some("Default")));
}

#[tokio::test]
async fn test_limits_methods_included_on_request() {
    let fixture = AddressSpaceFixtures::production(1);
    let engine = NodeEngine::new(fixture.service.clone());
    let machine = &fixture.machines[1];

    let plain = engine
        .expand_with(entry_for(machine), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    plain.entries()[0].assert_node_count(10);

    let policy = ExpansionPolicy::default().with_methods(true);
    let with_methods = engine
        .expand_with(entry_for(machine), policy, CancellationSignal::new())
        .collect()
        .await;
    let entry = with_methods.entries()[0];
    entry.assert_node_count(11);
    let reset = entry
        .opc_nodes
        .iter()
        .find(|n| n.display_name.as_deref() == Some("Reset"))
        .expect("method leaf");
    let metadata = reset.method_metadata.as_ref().expect("method metadata");
    assert!(metadata.input_arguments.is_empty());
}

// =============================================================================
// Roots
// =============================================================================

#[tokio::test]
async fn test_roots_object_type_with_subtypes() {
    let fixture = AddressSpaceFixtures::production(6);
    let engine = NodeEngine::new(fixture.service.clone());

    let results = engine
        .expand_with(entry_for(&fixture.machine_type), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(24);

    let policy = ExpansionPolicy::default().with_no_subtypes(true);
    let results = engine
        .expand_with(entry_for(&fixture.machine_type), policy, CancellationSignal::new())
        .collect()
        .await;
    // The first machine of each line is a CncMachineType.
    results.assert_entry_count(18);
}

#[tokio::test]
async fn test_roots_variable() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let results = engine
        .expand_with(
            entry_for(&fixture.double_array),
            ExpansionPolicy::default(),
            CancellationSignal::new(),
        )
        .collect()
        .await;
    results.assert_entry_count(1);
    results.entries()[0].assert_node_count(1);
}

#[tokio::test]
async fn test_roots_browse_path() {
    let fixture = AddressSpaceFixtures::sensors(4);
    let engine = NodeEngine::new(fixture.service.clone());
    let entry = PublishedNodesEntry::new(vec![PublishedNode::from_path(vec![
        "Objects".to_string(),
        format!("{}#Sensors", PLANT_NAMESPACE),
    ])]);

    let results = engine
        .expand_with(entry, ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(4);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_errors_branch_failure_is_contained() {
    let fixture = AddressSpaceFixtures::production(6);
    let failing = fixture.machines[1].clone();
    fixture.service.fail_browse(&failing);
    let engine = NodeEngine::new(fixture.service.clone());

    let results = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(29);
    results.assert_error_count(1);

    let table = fixture.service.namespace_table().await.unwrap();
    let expected = failing.format(&table, NamespaceFormat::Expanded);
    let carrier = results
        .iter()
        .find_map(|r| match r {
            ExpansionResult::Error { entry, .. } => Some(entry),
            ExpansionResult::Entry { .. } => None,
        })
        .expect("error result");
    assert_eq!(carrier.opc_nodes.len(), 1);
    assert_eq!(carrier.opc_nodes[0].id.as_deref(), Some(expected.as_str()));
}

#[tokio::test]
async fn test_errors_discarded_drop_the_branch() {
    let fixture = AddressSpaceFixtures::production(6);
    fixture.service.fail_browse(&fixture.machines[1]);
    let engine = NodeEngine::new(fixture.service.clone());
    let policy = ExpansionPolicy::default()
        .with_single_writer(true)
        .with_discard_errors(true);

    let results = engine
        .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
        .collect()
        .await;
    results.assert_no_errors();
    results.assert_entry_count(1);
    results.entries()[0].assert_node_count(258 - LEAVES_PER_MACHINE);
}

#[tokio::test]
async fn test_errors_unknown_root() {
    let fixture = AddressSpaceFixtures::sensors(2);
    let engine = NodeEngine::new(fixture.service.clone());
    let entry = PublishedNodesEntry::new(vec![
        PublishedNode::from_id("ns=1;i=999999"),
        PublishedNode::from_id(fixture.root.to_string()),
    ]);

    let results = engine
        .expand_with(entry, ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(2);
    results.assert_error_count(1);
    let error = results.iter().find(|r| r.is_error()).expect("error");
    error.assert_status(StatusCode::BAD_NODE_ID_UNKNOWN);
}

#[tokio::test]
async fn test_errors_namespace_table_failure() {
    let fixture = AddressSpaceFixtures::sensors(2);
    let service = Arc::new(RecordingNodeService::new(fixture.service.clone()));
    service.set_fail_namespace_table(true);
    let engine = NodeEngine::new(service.clone());

    let results = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), CancellationSignal::new())
        .collect()
        .await;
    results.assert_entry_count(0);
    results.assert_error_count(1);

    let policy = ExpansionPolicy::default().with_discard_errors(true);
    let results = engine
        .expand_with(fixture.root_entry(), policy, CancellationSignal::new())
        .collect()
        .await;
    assert!(results.is_empty());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_mid_walk_stops_without_errors() {
    let fixture = AddressSpaceFixtures::sensors(24);
    let service = Arc::new(RecordingNodeService::new(fixture.service.clone()));

    TestHarness::with_name("cancel_mid_walk")
        .run(service.clone(), |resources| async move {
            service.cancel_after_calls(20, resources.cancel.clone());
            let mut expansion = resources.engine.expand_with(
                fixture.root_entry(),
                ExpansionPolicy::default(),
                resources.cancel.clone(),
            );

            let mut results = Vec::new();
            while let Some(result) = expansion.next().await {
                results.push(result);
            }

            assert!(resources.cancel.is_cancelled());
            assert!(expansion.is_done());
            assert!(results.len() < 24);
            results.assert_no_errors();

            // A finished expansion never calls the service again.
            let calls = service.call_count();
            assert!(expansion.next().await.is_none());
            assert_eq!(service.call_count(), calls);
        })
        .await;
}

#[tokio::test]
async fn test_cancel_before_start_yields_nothing() {
    let fixture = AddressSpaceFixtures::sensors(3);
    let service = Arc::new(RecordingNodeService::new(fixture.service.clone()));
    let engine = NodeEngine::new(service.clone());
    let cancel = CancellationSignal::new();
    cancel.cancel();

    let results = engine
        .expand_with(fixture.root_entry(), ExpansionPolicy::default(), cancel)
        .collect()
        .await;
    assert!(results.is_empty());
    assert_eq!(service.call_count(), 0);
}
