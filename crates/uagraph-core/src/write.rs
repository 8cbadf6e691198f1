// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed value reads and writes.
//!
//! A write resolves its target (node id and/or relative path), reads the
//! target's DataType, ValueRank and ArrayDimensions, encodes the generic
//! value against them and hands the variant to [`NodeService::write`]. The
//! server's verdict is returned as is; there is no retry at this layer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::codec::ValueCodec;
use crate::error::{ConfigurationError, OpcUaResult, OperationError, ServiceDiagnostic};
use crate::metadata::DataTypeResolver;
use crate::path::PathResolver;
use crate::service::NodeService;
use crate::types::{ids, NodeId};
use crate::value::{DataTypeTag, GenericValue, ValueRank};

// =============================================================================
// Requests
// =============================================================================

/// Identifies a node by id, by path, or by path from an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTarget {
    /// Node id, or the start of `browse_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,

    /// Relative path segments. Starts at RootFolder without `node_id`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub browse_path: Vec<String>,
}

impl NodeTarget {
    /// Targets a node id.
    pub fn node(node_id: NodeId) -> Self {
        Self {
            node_id: Some(node_id),
            browse_path: Vec::new(),
        }
    }

    /// Targets a path from RootFolder.
    pub fn path<I, T>(segments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            node_id: None,
            browse_path: segments.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let has_node = self.node_id.as_ref().is_some_and(|n| !n.is_null());
        if !has_node && self.browse_path.is_empty() {
            return Err(ConfigurationError::invalid_request(
                "either a node id or a browse path is required",
            ));
        }
        Ok(())
    }
}

/// A value write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueWriteRequest {
    /// Target node.
    #[serde(flatten)]
    pub target: NodeTarget,

    /// Value to write.
    pub value: GenericValue,

    /// Data type to encode as. Read from the node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataTypeTag>,

    /// Index range, e.g. `2` or `1:3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

impl ValueWriteRequest {
    /// Creates a write of `value` to `target`.
    pub fn new(target: NodeTarget, value: impl Into<GenericValue>) -> Self {
        Self {
            target,
            value: value.into(),
            data_type: None,
            index_range: None,
        }
    }

    /// Encodes against `tag` instead of the node's DataType.
    pub fn with_data_type(mut self, tag: DataTypeTag) -> Self {
        self.data_type = Some(tag);
        self
    }

    /// Writes only `range` of an array value.
    pub fn with_index_range(mut self, range: impl Into<String>) -> Self {
        self.index_range = Some(range.into());
        self
    }
}

/// Outcome of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueWriteResponse {
    /// Present when the write failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceDiagnostic>,
}

impl ValueWriteResponse {
    /// Returns `true` if the write succeeded.
    pub fn is_ok(&self) -> bool {
        self.error_info.is_none()
    }
}

/// A value read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReadRequest {
    /// Target node.
    #[serde(flatten)]
    pub target: NodeTarget,

    /// Data type to decode as. Read from the node when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataTypeTag>,
}

/// Outcome of a read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueReadResponse {
    /// The node that was read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,

    /// The decoded value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<GenericValue>,

    /// Present when the read failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceDiagnostic>,
}

// =============================================================================
// ValueWriter
// =============================================================================

/// Reads and writes typed values.
#[derive(Debug)]
pub struct ValueWriter<S: NodeService + ?Sized> {
    browser: Browser<S>,
    paths: PathResolver<S>,
    data_types: DataTypeResolver<S>,
    codec: ValueCodec,
}

impl<S: NodeService + ?Sized> Clone for ValueWriter<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
            paths: self.paths.clone(),
            data_types: self.data_types.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> ValueWriter<S> {
    /// Creates a writer.
    pub fn new(browser: Browser<S>, codec: ValueCodec) -> Self {
        Self {
            paths: PathResolver::new(browser.clone()),
            data_types: DataTypeResolver::new(browser.clone()),
            browser,
            codec,
        }
    }

    /// Resolves a target to a node id.
    pub async fn resolve_target(
        &self,
        target: &NodeTarget,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        target.validate()?;
        let start = target.node_id.clone().unwrap_or(NodeId::NULL);
        if target.browse_path.is_empty() {
            return Ok(start);
        }
        self.paths
            .resolve_segments(&start, &target.browse_path, cancel)
            .await
    }

    /// Writes a value and reports the outcome as a response.
    pub async fn write(
        &self,
        request: &ValueWriteRequest,
        cancel: &CancellationSignal,
    ) -> ValueWriteResponse {
        match self.try_write(request, cancel).await {
            Ok(_) => ValueWriteResponse::default(),
            Err(error) => ValueWriteResponse {
                error_info: Some(ServiceDiagnostic::from(&error)),
            },
        }
    }

    /// Writes a value and returns the written node.
    #[instrument(skip(self, request, cancel), fields(value = %request.value.type_name()))]
    pub async fn try_write(
        &self,
        request: &ValueWriteRequest,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        let node_id = self.resolve_target(&request.target, cancel).await?;
        cancel.check()?;

        let attributes = self.browser.read_attributes(&node_id).await?;
        let tag = match &request.data_type {
            Some(tag) => tag.clone(),
            None => {
                let data_type = attributes.data_type.clone().unwrap_or(ids::BASE_DATA_TYPE);
                self.data_types.resolve(&data_type, cancel).await?
            }
        };
        let rank = attributes.value_rank.unwrap_or(ValueRank::ANY);

        let variant = if request.index_range.is_some() {
            // A range write carries a slice, not the whole array.
            self.codec.encode(&request.value, &tag, ValueRank::ANY)?
        } else {
            let dimensions = attributes.array_dimensions.clone().unwrap_or_default();
            self.codec
                .encode_with_dimensions(&request.value, &tag, rank, &dimensions)?
        };

        cancel.check()?;
        let status = self
            .browser
            .service()
            .write(&node_id, &variant, request.index_range.as_deref())
            .await?;
        if !status.is_good() {
            warn!(node_id = %node_id, status = %status.name(), "Write rejected");
            return Err(OperationError::write_rejected(node_id.to_string(), status).into());
        }
        info!(node_id = %node_id, data_type = %tag, "Value written");
        Ok(node_id)
    }

    /// Reads and decodes a value.
    pub async fn read(
        &self,
        request: &ValueReadRequest,
        cancel: &CancellationSignal,
    ) -> ValueReadResponse {
        let mut response = ValueReadResponse::default();
        match self.try_read(request, cancel).await {
            Ok((node_id, value)) => {
                response.node_id = Some(node_id);
                response.value = Some(value);
            }
            Err(error) => response.error_info = Some(ServiceDiagnostic::from(&error)),
        }
        response
    }

    /// Reads and decodes a value.
    #[instrument(skip(self, request, cancel))]
    pub async fn try_read(
        &self,
        request: &ValueReadRequest,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<(NodeId, GenericValue)> {
        let node_id = self.resolve_target(&request.target, cancel).await?;
        let tag = match &request.data_type {
            Some(tag) => tag.clone(),
            None => {
                let attributes = self.browser.read_attributes(&node_id).await?;
                let data_type = attributes.data_type.unwrap_or(ids::BASE_DATA_TYPE);
                self.data_types.resolve(&data_type, cancel).await?
            }
        };
        cancel.check()?;
        let data_value = self.browser.service().read_value(&node_id).await?;
        if data_value.status.is_bad() {
            return Err(OperationError::read_failed(node_id.to_string(), data_value.status.name()).into());
        }
        let value = self.codec.decode(&data_value.value, &tag)?;
        debug!(node_id = %node_id, value = %value.type_name(), "Value read");
        Ok((node_id, value))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::CodecOptions;
    use crate::error::{ConversionError, OpcUaError};
    use crate::service::{AccessLevel, MemoryNodeService, NodeBuilder};
    use crate::status::StatusCode;
    use crate::variant::{BuiltInType, ScalarValue, Variant};

    fn fixture() -> Arc<MemoryNodeService> {
        let service = MemoryNodeService::new();
        let ns = service.add_namespace("urn:test:write");
        let folder = service.insert(NodeBuilder::object(NodeId::numeric(ns, 1), "Device").organized_by(&NodeId::OBJECTS_FOLDER));
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 2), "Setpoint", BuiltInType::Double.node_id())
                .component_of(&folder)
                .value(Variant::scalar(ScalarValue::Double(1.0))),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 3), "Blob", BuiltInType::ByteString.node_id())
                .component_of(&folder),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 4), "Serial", BuiltInType::String.node_id())
                .component_of(&folder)
                .access_level(AccessLevel::CURRENT_READ),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 5), "Samples", BuiltInType::Int32.node_id())
                .component_of(&folder)
                .value_rank(ValueRank::ONE_DIMENSION)
                .array_dimensions(vec![3])
                .value(Variant::array(
                    BuiltInType::Int32,
                    vec![ScalarValue::Int32(0), ScalarValue::Int32(0), ScalarValue::Int32(0)],
                )),
        );
        Arc::new(service)
    }

    fn writer(service: Arc<MemoryNodeService>) -> ValueWriter<MemoryNodeService> {
        ValueWriter::new(Browser::new(service), ValueCodec::new(CodecOptions::default()))
    }

    #[tokio::test]
    async fn test_write_by_path() {
        let service = fixture();
        let request = ValueWriteRequest::new(NodeTarget::path(["Objects", "1:Device", "1:Setpoint"]), 42.5f64);
        let response = writer(service.clone()).write(&request, &CancellationSignal::new()).await;
        assert!(response.is_ok(), "{:?}", response);
        assert_eq!(
            service.value(&NodeId::numeric(1, 2)),
            Some(Variant::scalar(ScalarValue::Double(42.5)))
        );
    }

    #[tokio::test]
    async fn test_byte_string_mismatch_never_writes() {
        let service = fixture();
        let request = ValueWriteRequest::new(NodeTarget::node(NodeId::numeric(1, 3)), "not bytes");
        let result = writer(service.clone()).try_write(&request, &CancellationSignal::new()).await;
        assert!(matches!(result, Err(OpcUaError::Conversion(ConversionError::TypeMismatch { .. }))));
        assert_eq!(service.stats().write, 0);
    }

    #[tokio::test]
    async fn test_read_only_rejected() {
        let service = fixture();
        let request = ValueWriteRequest::new(NodeTarget::node(NodeId::numeric(1, 4)), "SN-1");
        let response = writer(service).write(&request, &CancellationSignal::new()).await;
        assert_eq!(response.error_info.unwrap().status_code, StatusCode::BAD_NOT_WRITABLE);
    }

    #[tokio::test]
    async fn test_dimension_check_and_index_range() {
        let service = fixture();
        let writer = writer(service.clone());
        let cancel = CancellationSignal::new();

        let too_long = ValueWriteRequest::new(NodeTarget::node(NodeId::numeric(1, 5)), vec![1i32, 2, 3, 4]);
        assert!(!writer.write(&too_long, &cancel).await.is_ok());

        let ranged = ValueWriteRequest::new(NodeTarget::node(NodeId::numeric(1, 5)), vec![7i32]).with_index_range("1");
        assert!(writer.write(&ranged, &cancel).await.is_ok());

        let read = writer
            .read(
                &ValueReadRequest {
                    target: NodeTarget::node(NodeId::numeric(1, 5)),
                    data_type: None,
                },
                &cancel,
            )
            .await;
        assert_eq!(read.value, Some(GenericValue::from(vec![0i32, 7, 0])));
    }

    #[tokio::test]
    async fn test_missing_target() {
        let request = ValueWriteRequest::new(NodeTarget::default(), 1i32);
        let response = writer(fixture()).write(&request, &CancellationSignal::new()).await;
        assert_eq!(response.error_info.unwrap().status_code, StatusCode::BAD_INVALID_ARGUMENT);
    }
}
