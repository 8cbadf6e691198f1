// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Codec Integration Tests
//!
//! Typed reads and writes through the engine against the test data
//! namespace.
//!
//! ## Test Categories
//!
//! - `test_codec_round_trip_*`: Write then read back
//! - `test_codec_reject_*`: Writes that must not reach the server
//! - `test_codec_array_*`: Dimensions and index ranges

use uagraph_core::{
    BuiltInType, CancellationSignal, DataTypeTag, GenericValue, NodeEngine, NodeId, NodeTarget,
    ScalarValue, StatusCode, ValueRank, ValueReadRequest, ValueWriteRequest, Variant,
};
use uagraph_tests::prelude::*;

fn read_request(node_id: &NodeId) -> ValueReadRequest {
    ValueReadRequest {
        target: NodeTarget::node(node_id.clone()),
        data_type: None,
    }
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
async fn test_codec_round_trip_every_scalar() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let cancel = CancellationSignal::new();

    for (data_type, value) in ValueFixtures::samples() {
        let node_id = fixture.scalar_of(data_type);
        let request = ValueWriteRequest::new(NodeTarget::node(node_id.clone()), value.clone());
        engine.write(&request, &cancel).await.assert_ok();

        let response = engine.read(&read_request(&node_id), &cancel).await;
        response.assert_ok();
        assert_eq!(response.node_id.as_ref(), Some(&node_id));
        assert_eq!(response.value, Some(value), "round trip of {}", data_type);
    }

    assert_eq!(
        fixture.service.stats().write,
        ValueFixtures::samples().len() as u64
    );
}

#[tokio::test]
async fn test_codec_round_trip_by_browse_path() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let cancel = CancellationSignal::new();

    let target = NodeTarget::path(fixture.scalar_path("Int32Value"));
    let request = ValueWriteRequest::new(target.clone(), GenericValue::Int32(42));
    engine.write(&request, &cancel).await.assert_ok();

    let read = engine
        .read(
            &ValueReadRequest {
                target,
                data_type: None,
            },
            &cancel,
        )
        .await;
    assert_eq!(read.node_id, Some(fixture.scalar_of(BuiltInType::Int32)));
    assert_eq!(read.value, Some(GenericValue::Int32(42)));
}

#[tokio::test]
async fn test_codec_round_trip_without_server() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let tag = DataTypeTag::BuiltIn(BuiltInType::DateTime);
    let value = GenericValue::DateTime(ValueFixtures::timestamp());

    let variant = engine.encode(&value, &tag, ValueRank::SCALAR).unwrap();
    assert_eq!(variant.built_in_type(), Some(BuiltInType::DateTime));
    assert_eq!(engine.decode(&variant, &tag).unwrap(), value);
    assert_eq!(fixture.service.stats().write, 0);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_codec_reject_string_for_byte_string() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let node_id = fixture.scalar_of(BuiltInType::ByteString);

    let request = ValueWriteRequest::new(
        NodeTarget::node(node_id.clone()),
        GenericValue::String("not bytes".into()),
    );
    let response = engine.write(&request, &CancellationSignal::new()).await;
    response.assert_status(StatusCode::BAD_TYPE_MISMATCH);

    assert_eq!(fixture.service.stats().write, 0);
    assert!(fixture.service.write_history().is_empty());
    assert_eq!(
        fixture.service.value(&node_id),
        Some(Variant::scalar(ScalarValue::ByteString(Vec::new())))
    );
}

#[tokio::test]
async fn test_codec_reject_explicit_tag_mismatch() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(
        NodeTarget::node(fixture.scalar_of(BuiltInType::Int32)),
        GenericValue::Int32(7),
    )
    .with_data_type(DataTypeTag::BuiltIn(BuiltInType::Int16));
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_TYPE_MISMATCH);
    assert_eq!(fixture.service.stats().write, 0);
}

#[tokio::test]
async fn test_codec_reject_read_only() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(
        NodeTarget::node(fixture.read_only.clone()),
        GenericValue::String("SN-001".into()),
    );
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_NOT_WRITABLE);
    assert!(fixture.service.write_history().is_empty());
}

#[tokio::test]
async fn test_codec_reject_server_status() {
    let fixture = AddressSpaceFixtures::test_data();
    let node_id = fixture.scalar_of(BuiltInType::Double);
    fixture
        .service
        .fail_write(&node_id, StatusCode::BAD_USER_ACCESS_DENIED);
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(NodeTarget::node(node_id), GenericValue::Double(1.5));
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_USER_ACCESS_DENIED);
}

#[tokio::test]
async fn test_codec_reject_missing_target() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(NodeTarget::default(), GenericValue::Int32(1));
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_INVALID_ARGUMENT);
}

#[tokio::test]
async fn test_codec_read_failure_is_reported() {
    let fixture = AddressSpaceFixtures::test_data();
    let node_id = fixture.scalar_of(BuiltInType::Boolean);
    fixture.service.fail_read(&node_id);
    let engine = NodeEngine::new(fixture.service.clone());

    let response = engine
        .read(&read_request(&node_id), &CancellationSignal::new())
        .await;
    assert!(response.error_info.is_some());
    assert!(response.value.is_none());
}

// =============================================================================
// Arrays
// =============================================================================

#[tokio::test]
async fn test_codec_array_within_declared_length() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let cancel = CancellationSignal::new();

    let value = ValueFixtures::double_array(5);
    let request = ValueWriteRequest::new(NodeTarget::node(fixture.double_array.clone()), value.clone());
    engine.write(&request, &cancel).await.assert_ok();

    let response = engine.read(&read_request(&fixture.double_array), &cancel).await;
    assert_eq!(response.value, Some(value));
}

#[tokio::test]
async fn test_codec_array_too_long_is_rejected() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(
        NodeTarget::node(fixture.double_array.clone()),
        ValueFixtures::double_array(6),
    );
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_OUT_OF_RANGE);
    assert_eq!(fixture.service.stats().write, 0);
}

#[tokio::test]
async fn test_codec_array_scalar_is_rejected() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());

    let request = ValueWriteRequest::new(
        NodeTarget::node(fixture.double_array.clone()),
        GenericValue::Double(1.0),
    );
    engine
        .write(&request, &CancellationSignal::new())
        .await
        .assert_status(StatusCode::BAD_TYPE_MISMATCH);
    assert_eq!(fixture.service.stats().write, 0);
}

#[tokio::test]
async fn test_codec_array_index_range() {
    let fixture = AddressSpaceFixtures::test_data();
    let engine = NodeEngine::new(fixture.service.clone());
    let cancel = CancellationSignal::new();
    let target = NodeTarget::node(fixture.int32_array.clone());

    let full = ValueWriteRequest::new(target.clone(), vec![1i32, 2, 3, 4]);
    engine.write(&full, &cancel).await.assert_ok();

    let ranged = ValueWriteRequest::new(target.clone(), vec![9i32, 9]).with_index_range("1:2");
    engine.write(&ranged, &cancel).await.assert_ok();

    let response = engine.read(&read_request(&fixture.int32_array), &cancel).await;
    assert_eq!(response.value, Some(GenericValue::from(vec![1i32, 9, 9, 4])));

    let outside = ValueWriteRequest::new(target, vec![5i32]).with_index_range("10");
    engine
        .write(&outside, &cancel)
        .await
        .assert_status(StatusCode::BAD_INDEX_RANGE_NO_DATA);
    assert_eq!(fixture.service.stats().write, 2);
}
