// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Generic, self-describing values and data type descriptions.
//!
//! # Overview
//!
//! ```text
//! GenericValue ──(DataTypeTag, ValueRank)──▶ codec ──▶ Variant
//!      ▲                                                  │
//!      └──────────────(DataTypeTag)──── codec ◀───────────┘
//! ```
//!
//! [`GenericValue`] is the caller-facing representation: every variant carries
//! its own type, and nothing is ever coerced implicitly. [`DataTypeTag`] names
//! the declared type of a node (a built-in type, an abstract numeric family,
//! an enumeration or a structure with its field schema) and [`ValueRank`]
//! its declared shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::StatusCode;
use crate::types::{ExpandedNodeId, LocalizedText, NodeId, QualifiedName};
use crate::variant::{BuiltInType, EncodingKind};

// =============================================================================
// GenericValue
// =============================================================================

/// A self-describing value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum GenericValue {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// String.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// UUID.
    Guid(Uuid),
    /// Byte string.
    ByteString(#[serde(with = "base64_bytes")] Vec<u8>),
    /// XML fragment.
    XmlElement(String),
    /// Node id.
    NodeId(NodeId),
    /// Expanded node id.
    ExpandedNodeId(ExpandedNodeId),
    /// Qualified name.
    QualifiedName(QualifiedName),
    /// Localized text.
    LocalizedText(LocalizedText),
    /// Status code.
    StatusCode(StatusCode),
    /// Nested structure.
    Structure(StructureValue),
    /// Homogeneous array; nested arrays express multiple dimensions.
    Array(Vec<GenericValue>),
}

impl GenericValue {
    /// Returns the type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::XmlElement(_) => "XmlElement",
            Self::NodeId(_) => "NodeId",
            Self::ExpandedNodeId(_) => "ExpandedNodeId",
            Self::QualifiedName(_) => "QualifiedName",
            Self::LocalizedText(_) => "LocalizedText",
            Self::StatusCode(_) => "StatusCode",
            Self::Structure(_) => "Structure",
            Self::Array(_) => "Array",
        }
    }

    /// Returns `true` for [`GenericValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the elements if this is an array.
    pub fn as_array(&self) -> Option<&[GenericValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_generic {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for GenericValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_generic! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
    NodeId => NodeId,
    QualifiedName => QualifiedName,
    LocalizedText => LocalizedText,
    StatusCode => StatusCode,
    StructureValue => Structure,
}

impl From<&str> for GenericValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T: Into<GenericValue>> From<Vec<T>> for GenericValue {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// StructureValue
// =============================================================================

/// A structure with an ordered field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureValue {
    /// The structure data type id.
    pub type_id: NodeId,

    /// The encoding the structure travels in.
    #[serde(default)]
    pub encoding: EncodingKind,

    /// Fields in declaration order.
    pub fields: Vec<StructureField>,
}

/// A named field of a [`StructureValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: GenericValue,
}

impl StructureValue {
    /// Creates an empty structure of the given type.
    pub fn new(type_id: NodeId) -> Self {
        Self {
            type_id,
            encoding: EncodingKind::Binary,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<GenericValue>) -> Self {
        self.fields.push(StructureField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Returns a field value by name.
    pub fn field(&self, name: &str) -> Option<&GenericValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }
}

// =============================================================================
// DataTypeTag
// =============================================================================

/// The declared data type of a variable, as far as the codec cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum DataTypeTag {
    /// A concrete built-in type.
    BuiltIn(BuiltInType),
    /// Any numeric built-in type.
    Number,
    /// Any signed or unsigned integer type.
    Integer,
    /// Any unsigned integer type.
    UInteger,
    /// An enumeration, transported as Int32.
    Enumeration(NodeId),
    /// A structure with its field schema.
    Structure(StructureDefinition),
    /// BaseDataType: any value is accepted as-is.
    Any,
}

impl DataTypeTag {
    /// Returns the built-in type on the wire, if the tag fixes one.
    pub fn built_in_type(&self) -> Option<BuiltInType> {
        match self {
            Self::BuiltIn(t) => Some(*t),
            Self::Enumeration(_) => Some(BuiltInType::Int32),
            Self::Structure(_) => Some(BuiltInType::ExtensionObject),
            Self::Number | Self::Integer | Self::UInteger | Self::Any => None,
        }
    }

    /// Returns `true` if a value of the given built-in type satisfies this tag.
    pub fn accepts(&self, actual: BuiltInType) -> bool {
        match self {
            Self::BuiltIn(t) => *t == actual,
            Self::Number => actual.is_numeric(),
            Self::Integer => actual.is_integer(),
            Self::UInteger => actual.is_unsigned_integer(),
            Self::Enumeration(_) => actual == BuiltInType::Int32,
            Self::Structure(_) => actual == BuiltInType::ExtensionObject,
            Self::Any => true,
        }
    }
}

impl fmt::Display for DataTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn(t) => write!(f, "{}", t),
            Self::Number => f.write_str("Number"),
            Self::Integer => f.write_str("Integer"),
            Self::UInteger => f.write_str("UInteger"),
            Self::Enumeration(id) => write!(f, "Enumeration({})", id),
            Self::Structure(def) => write!(f, "Structure({})", def.type_id),
            Self::Any => f.write_str("BaseDataType"),
        }
    }
}

impl From<BuiltInType> for DataTypeTag {
    fn from(value: BuiltInType) -> Self {
        Self::BuiltIn(value)
    }
}

// =============================================================================
// StructureDefinition
// =============================================================================

/// Field schema of a structured data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// The structure data type id.
    pub type_id: NodeId,

    /// Default encoding id, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_encoding_id: Option<NodeId>,

    /// Fields in declaration order.
    pub fields: Vec<StructureFieldDefinition>,
}

/// One field of a [`StructureDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureFieldDefinition {
    /// Field name.
    pub name: String,

    /// Field data type.
    pub data_type: DataTypeTag,

    /// Field value rank.
    #[serde(default)]
    pub value_rank: ValueRank,

    /// Optional fields may be absent from a value.
    #[serde(default)]
    pub is_optional: bool,
}

impl StructureDefinition {
    /// Creates a definition without fields.
    pub fn new(type_id: NodeId) -> Self {
        Self {
            type_id,
            default_encoding_id: None,
            fields: Vec::new(),
        }
    }

    /// Appends a mandatory field.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        data_type: impl Into<DataTypeTag>,
        value_rank: ValueRank,
    ) -> Self {
        self.fields.push(StructureFieldDefinition {
            name: name.into(),
            data_type: data_type.into(),
            value_rank,
            is_optional: false,
        });
        self
    }

    /// Appends an optional field.
    pub fn with_optional_field(
        mut self,
        name: impl Into<String>,
        data_type: impl Into<DataTypeTag>,
        value_rank: ValueRank,
    ) -> Self {
        self.fields.push(StructureFieldDefinition {
            name: name.into(),
            data_type: data_type.into(),
            value_rank,
            is_optional: true,
        });
        self
    }
}

// =============================================================================
// ValueRank
// =============================================================================

/// Declared dimensionality of a variable's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueRank(pub i32);

impl ValueRank {
    /// Scalar or one-dimensional array.
    pub const SCALAR_OR_ONE_DIMENSION: ValueRank = ValueRank(-3);
    /// Any shape.
    pub const ANY: ValueRank = ValueRank(-2);
    /// Scalar only.
    pub const SCALAR: ValueRank = ValueRank(-1);
    /// Array with one or more dimensions.
    pub const ONE_OR_MORE_DIMENSIONS: ValueRank = ValueRank(0);
    /// One-dimensional array.
    pub const ONE_DIMENSION: ValueRank = ValueRank(1);

    /// Returns `true` if a value with `rank` dimensions is allowed
    /// (0 dimensions means scalar).
    pub fn accepts(&self, rank: usize) -> bool {
        match self.0 {
            -3 => rank <= 1,
            -2 => true,
            -1 => rank == 0,
            0 => rank >= 1,
            n if n > 0 => rank == n as usize,
            _ => false,
        }
    }

    /// Returns `true` if scalars are allowed.
    pub fn allows_scalar(&self) -> bool {
        self.accepts(0)
    }
}

impl Default for ValueRank {
    fn default() -> Self {
        Self::SCALAR
    }
}

impl fmt::Display for ValueRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            -3 => f.write_str("ScalarOrOneDimension"),
            -2 => f.write_str("Any"),
            -1 => f.write_str("Scalar"),
            0 => f.write_str("OneOrMoreDimensions"),
            n => write!(f, "{}D", n),
        }
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

/// Serializes byte vectors as standard base64 strings.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64.decode(text).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_rank_accepts() {
        assert!(ValueRank::SCALAR.accepts(0));
        assert!(!ValueRank::SCALAR.accepts(1));
        assert!(ValueRank::ONE_DIMENSION.accepts(1));
        assert!(!ValueRank::ONE_DIMENSION.accepts(2));
        assert!(ValueRank::ONE_OR_MORE_DIMENSIONS.accepts(3));
        assert!(!ValueRank::ONE_OR_MORE_DIMENSIONS.accepts(0));
        assert!(ValueRank::SCALAR_OR_ONE_DIMENSION.accepts(0));
        assert!(ValueRank::SCALAR_OR_ONE_DIMENSION.accepts(1));
        assert!(ValueRank::ANY.accepts(5));
        assert!(ValueRank(2).accepts(2));
    }

    #[test]
    fn test_data_type_tag_accepts() {
        assert!(DataTypeTag::Number.accepts(BuiltInType::Float));
        assert!(!DataTypeTag::Number.accepts(BuiltInType::String));
        assert!(DataTypeTag::Integer.accepts(BuiltInType::SByte));
        assert!(!DataTypeTag::UInteger.accepts(BuiltInType::Int64));
        assert!(DataTypeTag::Enumeration(NodeId::numeric(0, 852)).accepts(BuiltInType::Int32));
        assert!(DataTypeTag::Any.accepts(BuiltInType::Guid));
    }

    #[test]
    fn test_generic_value_from() {
        assert_eq!(GenericValue::from(true), GenericValue::Boolean(true));
        assert_eq!(
            GenericValue::from(vec![1i32, 2]),
            GenericValue::Array(vec![GenericValue::Int32(1), GenericValue::Int32(2)])
        );
        assert_eq!(GenericValue::from("x").type_name(), "String");
    }

    #[test]
    fn test_structure_value() {
        let value = StructureValue::new(NodeId::numeric(2, 3001))
            .with_field("X", 1.5f64)
            .with_field("Y", 2.5f64);
        assert_eq!(value.field("Y"), Some(&GenericValue::Double(2.5)));
        assert_eq!(value.field("Z"), None);
    }

    #[test]
    fn test_generic_value_serde() {
        let value = GenericValue::ByteString(vec![0xde, 0xad]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "ByteString");
        assert_eq!(json["value"], "3q0=");
        let back: GenericValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }
}
