// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node service abstraction.
//!
//! Everything the engine knows about a server it learns through the
//! [`NodeService`] trait: paged browse, attribute reads, value reads and
//! writes. Sessions, security and the wire encoding live behind it.
//!
//! The [`memory`] module provides a complete in-memory implementation used by
//! the CLI and the test suites.

pub mod memory;
mod standard;

use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OpcUaResult;
use crate::status::StatusCode;
use crate::types::{
    BrowseDirection, ExpandedNodeId, LocalizedText, NamespaceTable, NodeClass, NodeId,
    QualifiedName,
};
use crate::value::ValueRank;
use crate::variant::Variant;

pub use memory::{MemoryNodeService, NodeBuilder};

// =============================================================================
// Browse
// =============================================================================

/// Parameters of a single browse call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseRequest {
    /// The node to browse from.
    pub node_id: NodeId,

    /// Which references to follow.
    pub direction: BrowseDirection,

    /// Reference type filter (`None` = all references).
    pub reference_type_id: Option<NodeId>,

    /// Include subtypes of the reference type filter.
    pub include_subtypes: bool,

    /// Target node class mask (0 = all classes).
    pub node_class_mask: u32,

    /// Requested page size (0 = server default).
    pub max_references: u32,
}

impl BrowseRequest {
    /// Creates a forward browse of all references.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_type_id: None,
            include_subtypes: true,
            node_class_mask: 0,
            max_references: 0,
        }
    }

    /// Sets the direction.
    #[inline]
    pub fn with_direction(mut self, direction: BrowseDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Restricts the browse to one reference type.
    #[inline]
    pub fn with_reference_type(mut self, reference_type_id: NodeId, include_subtypes: bool) -> Self {
        self.reference_type_id = Some(reference_type_id);
        self.include_subtypes = include_subtypes;
        self
    }

    /// Restricts the browse to the given target node classes.
    #[inline]
    pub fn with_node_classes(mut self, classes: &[NodeClass]) -> Self {
        self.node_class_mask = NodeClass::mask(classes);
        self
    }

    /// Sets the requested page size.
    #[inline]
    pub fn with_max_references(mut self, max_references: u32) -> Self {
        self.max_references = max_references;
        self
    }
}

/// A reference returned by browse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDescription {
    /// The reference type.
    pub reference_type_id: NodeId,

    /// `true` if the reference points away from the browsed node.
    pub is_forward: bool,

    /// The target node.
    pub node_id: ExpandedNodeId,

    /// Target browse name.
    pub browse_name: QualifiedName,

    /// Target display name.
    pub display_name: LocalizedText,

    /// Target node class.
    pub node_class: NodeClass,

    /// Target type definition, for objects and variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition: Option<ExpandedNodeId>,
}

/// Opaque server token for fetching the next browse page.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationPoint(pub Vec<u8>);

impl fmt::Debug for ContinuationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationPoint({})", BASE64.encode(&self.0))
    }
}

impl fmt::Display for ContinuationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE64.encode(&self.0))
    }
}

/// One page of browse results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowseResponse {
    /// References on this page.
    pub references: Vec<ReferenceDescription>,

    /// Token for the next page, `None` on the last page.
    pub continuation_point: Option<ContinuationPoint>,
}

// =============================================================================
// Attributes
// =============================================================================

/// AccessLevel attribute bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u8);

impl AccessLevel {
    /// CurrentRead.
    pub const CURRENT_READ: AccessLevel = AccessLevel(0x01);
    /// CurrentWrite.
    pub const CURRENT_WRITE: AccessLevel = AccessLevel(0x02);
    /// CurrentRead | CurrentWrite.
    pub const READ_WRITE: AccessLevel = AccessLevel(0x03);

    /// Returns `true` if the value can be read.
    pub const fn is_readable(&self) -> bool {
        self.0 & Self::CURRENT_READ.0 != 0
    }

    /// Returns `true` if the value can be written.
    pub const fn is_writable(&self) -> bool {
        self.0 & Self::CURRENT_WRITE.0 != 0
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        Self::CURRENT_READ
    }
}

/// A field of a structured data type, as published by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureFieldDescription {
    /// Field name.
    pub name: String,

    /// Field data type node.
    pub data_type: NodeId,

    /// Field value rank.
    #[serde(default)]
    pub value_rank: ValueRank,

    /// Optional fields may be omitted.
    #[serde(default)]
    pub is_optional: bool,
}

/// An enumeration member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumFieldDescription {
    /// Member name.
    pub name: String,

    /// Member value.
    pub value: i64,
}

/// The DataTypeDefinition attribute of a DataType node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataTypeDefinition {
    /// A structured type.
    Structure {
        /// Default binary encoding id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_encoding_id: Option<NodeId>,
        /// Fields in declaration order.
        fields: Vec<StructureFieldDescription>,
    },
    /// An enumerated type.
    Enum {
        /// Members.
        fields: Vec<EnumFieldDescription>,
    },
}

/// Attributes of a node, as returned by a single read call.
///
/// Attributes that do not apply to the node class are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Node id.
    pub node_id: NodeId,

    /// Node class.
    pub node_class: NodeClass,

    /// Browse name.
    pub browse_name: QualifiedName,

    /// Display name.
    pub display_name: LocalizedText,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,

    /// DataType (variables and variable types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<NodeId>,

    /// ValueRank (variables and variable types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<ValueRank>,

    /// ArrayDimensions (variables and variable types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,

    /// AccessLevel (variables).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,

    /// IsAbstract (types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,

    /// DataTypeDefinition (data types).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type_definition: Option<DataTypeDefinition>,
}

/// A value with its status and timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataValue {
    /// The value.
    pub value: Variant,

    /// Status of the value.
    #[serde(default)]
    pub status: StatusCode,

    /// Source timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,

    /// Server timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// NodeService Trait
// =============================================================================

/// Abstract access to a server's address space.
///
/// Implementations must be `Send + Sync`; the engine holds them behind an
/// `Arc` and issues calls sequentially per operation.
#[async_trait]
pub trait NodeService: Send + Sync {
    // =========================================================================
    // Browse Operations
    // =========================================================================

    /// Browses one page of references.
    async fn browse(&self, request: &BrowseRequest) -> OpcUaResult<BrowseResponse>;

    /// Fetches the next page of a browse.
    async fn browse_next(
        &self,
        continuation_point: &ContinuationPoint,
    ) -> OpcUaResult<BrowseResponse>;

    /// Releases a continuation point that will not be followed.
    async fn release_continuation_point(
        &self,
        _continuation_point: &ContinuationPoint,
    ) -> OpcUaResult<()> {
        Ok(())
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Reads the attributes of a node.
    async fn read_attributes(&self, node_id: &NodeId) -> OpcUaResult<NodeAttributes>;

    /// Reads the Value attribute of a node.
    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<DataValue>;

    /// Reads the server namespace array.
    async fn namespace_table(&self) -> OpcUaResult<NamespaceTable>;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Writes the Value attribute of a node.
    ///
    /// Transport failures are errors; the server's verdict is the returned
    /// status code.
    async fn write(
        &self,
        node_id: &NodeId,
        value: &Variant,
        index_range: Option<&str>,
    ) -> OpcUaResult<StatusCode>;

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the service display name for logging.
    fn display_name(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_request_builder() {
        let request = BrowseRequest::new(NodeId::OBJECTS_FOLDER)
            .with_direction(BrowseDirection::Inverse)
            .with_reference_type(crate::types::ids::HAS_SUBTYPE, false)
            .with_node_classes(&[NodeClass::ObjectType])
            .with_max_references(10);
        assert_eq!(request.direction, BrowseDirection::Inverse);
        assert!(!request.include_subtypes);
        assert_eq!(request.node_class_mask, 8);
        assert_eq!(request.max_references, 10);
    }

    #[test]
    fn test_access_level() {
        assert!(AccessLevel::READ_WRITE.is_writable());
        assert!(!AccessLevel::CURRENT_READ.is_writable());
        assert!(AccessLevel::default().is_readable());
    }

    #[test]
    fn test_continuation_point_display() {
        let cp = ContinuationPoint(vec![0, 1, 2]);
        assert_eq!(cp.to_string(), "AAEC");
    }
}
