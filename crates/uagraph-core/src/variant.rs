// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-side value representation.
//!
//! [`Variant`] is what the node service reads and writes: a strongly typed
//! scalar, a flat array with optional multi-dimensional shape, or nothing.
//! Structured values travel as [`ExtensionObject`]s whose body is either an
//! opaque encoding or a decoded, ordered field list.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::StatusCode;
use crate::types::{ExpandedNodeId, LocalizedText, NodeId, QualifiedName};

// =============================================================================
// BuiltInType
// =============================================================================

/// OPC UA built-in types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltInType {
    /// Boolean (i=1).
    Boolean,
    /// SByte (i=2).
    SByte,
    /// Byte (i=3).
    Byte,
    /// Int16 (i=4).
    Int16,
    /// UInt16 (i=5).
    UInt16,
    /// Int32 (i=6).
    Int32,
    /// UInt32 (i=7).
    UInt32,
    /// Int64 (i=8).
    Int64,
    /// UInt64 (i=9).
    UInt64,
    /// Float (i=10).
    Float,
    /// Double (i=11).
    Double,
    /// String (i=12).
    String,
    /// DateTime (i=13).
    DateTime,
    /// Guid (i=14).
    Guid,
    /// ByteString (i=15).
    ByteString,
    /// XmlElement (i=16).
    XmlElement,
    /// NodeId (i=17).
    NodeId,
    /// ExpandedNodeId (i=18).
    ExpandedNodeId,
    /// StatusCode (i=19).
    StatusCode,
    /// QualifiedName (i=20).
    QualifiedName,
    /// LocalizedText (i=21).
    LocalizedText,
    /// ExtensionObject (i=22, the Structure data type).
    ExtensionObject,
    /// Variant (i=24, BaseDataType). Only appears as the element type of
    /// arrays without a concrete element type.
    Variant,
}

impl BuiltInType {
    /// All built-in types with a scalar encoding, in data type id order.
    pub const ALL: [BuiltInType; 22] = [
        Self::Boolean,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::DateTime,
        Self::Guid,
        Self::ByteString,
        Self::XmlElement,
        Self::NodeId,
        Self::ExpandedNodeId,
        Self::StatusCode,
        Self::QualifiedName,
        Self::LocalizedText,
        Self::ExtensionObject,
    ];

    /// Returns the namespace 0 data type id.
    pub const fn data_type_id(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
            Self::Guid => 14,
            Self::ByteString => 15,
            Self::XmlElement => 16,
            Self::NodeId => 17,
            Self::ExpandedNodeId => 18,
            Self::StatusCode => 19,
            Self::QualifiedName => 20,
            Self::LocalizedText => 21,
            Self::ExtensionObject => 22,
            Self::Variant => 24,
        }
    }

    /// Returns the data type node id.
    pub const fn node_id(&self) -> NodeId {
        NodeId::numeric(0, self.data_type_id())
    }

    /// Looks up a built-in type by data type node id.
    pub fn from_node_id(node_id: &NodeId) -> Option<Self> {
        if node_id.namespace_index != 0 {
            return None;
        }
        let id = node_id.as_numeric()?;
        Self::ALL.iter().copied().find(|t| t.data_type_id() == id)
    }

    /// Returns the type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::XmlElement => "XmlElement",
            Self::NodeId => "NodeId",
            Self::ExpandedNodeId => "ExpandedNodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
            Self::ExtensionObject => "ExtensionObject",
            Self::Variant => "Variant",
        }
    }

    /// Returns `true` for the numeric types.
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Float | Self::Double)
    }

    /// Returns `true` for the signed and unsigned integer types.
    pub const fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// Returns `true` for SByte through Int64.
    pub const fn is_signed_integer(&self) -> bool {
        matches!(self, Self::SByte | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` for Byte through UInt64.
    pub const fn is_unsigned_integer(&self) -> bool {
        matches!(self, Self::Byte | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }
}

impl fmt::Display for BuiltInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ScalarValue
// =============================================================================

/// A single strongly typed protocol value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ScalarValue {
    /// Boolean.
    Boolean(bool),
    /// SByte.
    SByte(i8),
    /// Byte.
    Byte(u8),
    /// Int16.
    Int16(i16),
    /// UInt16.
    UInt16(u16),
    /// Int32.
    Int32(i32),
    /// UInt32.
    UInt32(u32),
    /// Int64.
    Int64(i64),
    /// UInt64.
    UInt64(u64),
    /// Float.
    Float(f32),
    /// Double.
    Double(f64),
    /// String.
    String(String),
    /// DateTime.
    DateTime(DateTime<Utc>),
    /// Guid.
    Guid(Uuid),
    /// ByteString.
    ByteString(#[serde(with = "crate::value::base64_bytes")] Vec<u8>),
    /// XmlElement.
    XmlElement(String),
    /// NodeId.
    NodeId(NodeId),
    /// ExpandedNodeId.
    ExpandedNodeId(ExpandedNodeId),
    /// StatusCode.
    StatusCode(StatusCode),
    /// QualifiedName.
    QualifiedName(QualifiedName),
    /// LocalizedText.
    LocalizedText(LocalizedText),
    /// ExtensionObject.
    ExtensionObject(ExtensionObject),
}

impl ScalarValue {
    /// Returns the built-in type of this value.
    pub fn built_in_type(&self) -> BuiltInType {
        match self {
            Self::Boolean(_) => BuiltInType::Boolean,
            Self::SByte(_) => BuiltInType::SByte,
            Self::Byte(_) => BuiltInType::Byte,
            Self::Int16(_) => BuiltInType::Int16,
            Self::UInt16(_) => BuiltInType::UInt16,
            Self::Int32(_) => BuiltInType::Int32,
            Self::UInt32(_) => BuiltInType::UInt32,
            Self::Int64(_) => BuiltInType::Int64,
            Self::UInt64(_) => BuiltInType::UInt64,
            Self::Float(_) => BuiltInType::Float,
            Self::Double(_) => BuiltInType::Double,
            Self::String(_) => BuiltInType::String,
            Self::DateTime(_) => BuiltInType::DateTime,
            Self::Guid(_) => BuiltInType::Guid,
            Self::ByteString(_) => BuiltInType::ByteString,
            Self::XmlElement(_) => BuiltInType::XmlElement,
            Self::NodeId(_) => BuiltInType::NodeId,
            Self::ExpandedNodeId(_) => BuiltInType::ExpandedNodeId,
            Self::StatusCode(_) => BuiltInType::StatusCode,
            Self::QualifiedName(_) => BuiltInType::QualifiedName,
            Self::LocalizedText(_) => BuiltInType::LocalizedText,
            Self::ExtensionObject(_) => BuiltInType::ExtensionObject,
        }
    }
}

// =============================================================================
// ExtensionObject
// =============================================================================

/// A structured value identified by its encoding node id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionObject {
    /// The structure's data type id.
    pub type_id: NodeId,

    /// The encoding used for the body.
    pub encoding: EncodingKind,

    /// The body.
    pub body: ExtensionObjectBody,
}

/// The encoding kind of a structured value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingKind {
    /// Default binary encoding.
    #[default]
    Binary,
    /// Default XML encoding.
    Xml,
    /// Default JSON encoding.
    Json,
}

/// The body of an [`ExtensionObject`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExtensionObjectBody {
    /// No body.
    None,
    /// Decoded fields in declaration order.
    Fields(Vec<(String, Variant)>),
    /// Undecoded binary body.
    Binary(#[serde(with = "crate::value::base64_bytes")] Vec<u8>),
    /// Undecoded XML body.
    Xml(String),
}

impl ExtensionObject {
    /// Creates an extension object with decoded fields.
    pub fn with_fields(type_id: NodeId, fields: Vec<(String, Variant)>) -> Self {
        Self {
            type_id,
            encoding: EncodingKind::Binary,
            body: ExtensionObjectBody::Fields(fields),
        }
    }

    /// Returns a decoded field by name.
    pub fn field(&self, name: &str) -> Option<&Variant> {
        match &self.body {
            ExtensionObjectBody::Fields(fields) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A value as exchanged with the node service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Variant {
    /// No value.
    #[default]
    Empty,

    /// A scalar value.
    Scalar {
        /// The value.
        value: ScalarValue,
    },

    /// A homogeneous array, flattened in row-major order.
    Array {
        /// The element type.
        element_type: BuiltInType,
        /// Elements.
        values: Vec<ScalarValue>,
        /// Lengths per dimension for multi-dimensional arrays.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dimensions: Option<Vec<u32>>,
    },
}

impl Variant {
    /// Creates a scalar variant.
    pub fn scalar(value: ScalarValue) -> Self {
        Self::Scalar { value }
    }

    /// Creates a one-dimensional array variant.
    pub fn array(element_type: BuiltInType, values: Vec<ScalarValue>) -> Self {
        Self::Array {
            element_type,
            values,
            dimensions: None,
        }
    }

    /// Returns `true` if there is no value.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the scalar value if this is a scalar.
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Self::Scalar { value } => Some(value),
            _ => None,
        }
    }

    /// Returns the built-in type of the value or its elements.
    pub fn built_in_type(&self) -> Option<BuiltInType> {
        match self {
            Self::Empty => None,
            Self::Scalar { value } => Some(value.built_in_type()),
            Self::Array { element_type, .. } => Some(*element_type),
        }
    }

    /// Returns the array dimensions (empty for scalars, one entry for
    /// one-dimensional arrays).
    pub fn array_dimensions(&self) -> Vec<u32> {
        match self {
            Self::Empty | Self::Scalar { .. } => Vec::new(),
            Self::Array {
                values, dimensions, ..
            } => match dimensions {
                Some(dims) => dims.clone(),
                None => vec![u32::try_from(values.len()).unwrap_or(u32::MAX)],
            },
        }
    }

    /// Returns a short description for diagnostics, e.g. `Int32[3]`.
    pub fn describe(&self) -> String {
        match self {
            Self::Empty => "Null".to_string(),
            Self::Scalar { value } => value.built_in_type().name().to_string(),
            Self::Array { element_type, .. } => {
                let dims = self
                    .array_dimensions()
                    .iter()
                    .map(|d| format!("[{}]", d))
                    .collect::<String>();
                format!("{}{}", element_type.name(), dims)
            }
        }
    }
}

impl From<ScalarValue> for Variant {
    fn from(value: ScalarValue) -> Self {
        Self::scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_type_lookup() {
        assert_eq!(
            BuiltInType::from_node_id(&NodeId::numeric(0, 11)),
            Some(BuiltInType::Double)
        );
        assert_eq!(BuiltInType::from_node_id(&NodeId::numeric(1, 11)), None);
        assert_eq!(BuiltInType::from_node_id(&NodeId::numeric(0, 24)), None);
        assert!(BuiltInType::UInt16.is_unsigned_integer());
        assert!(!BuiltInType::Float.is_integer());
    }

    #[test]
    fn test_variant_dimensions() {
        let scalar = Variant::scalar(ScalarValue::Int32(1));
        assert!(scalar.array_dimensions().is_empty());
        assert_eq!(scalar.describe(), "Int32");

        let array = Variant::Array {
            element_type: BuiltInType::Byte,
            values: vec![ScalarValue::Byte(0); 6],
            dimensions: Some(vec![2, 3]),
        };
        assert_eq!(array.array_dimensions(), vec![2, 3]);
        assert_eq!(array.describe(), "Byte[2][3]");
    }

    #[test]
    fn test_extension_object_field() {
        let eo = ExtensionObject::with_fields(
            NodeId::numeric(0, 296),
            vec![(
                "Name".to_string(),
                Variant::scalar(ScalarValue::String("x".into())),
            )],
        );
        assert!(eo.field("Name").is_some());
        assert!(eo.field("DataType").is_none());
    }

    #[test]
    fn test_variant_serde() {
        let variant = Variant::scalar(ScalarValue::ByteString(vec![1, 2, 3]));
        let json = serde_json::to_string(&variant).unwrap();
        assert!(json.contains("AQID"));
        let back: Variant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, variant);
    }
}
