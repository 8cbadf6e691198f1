// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Typed value codec: [`GenericValue`] ↔ [`Variant`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          ValueCodec                             │
//! │        (shape checks: ValueRank, ArrayDimensions, limits)       │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!            ┌─────────────────┼──────────────────┐
//!            ▼                 ▼                  ▼
//! ┌───────────────┐ ┌───────────────────┐ ┌─────────────────────┐
//! │ Built-in tags │ │  Abstract tags    │ │ Structures          │
//! │ (exact match) │ │ (Number, Integer) │ │ (field-by-field)    │
//! └───────────────┘ └───────────────────┘ └─────────────────────┘
//! ```
//!
//! Conversions are exact: a value whose own type does not satisfy the
//! declared tag fails with [`ConversionError::TypeMismatch`], never with a
//! silent coercion. Nested [`GenericValue::Array`]s map onto flattened
//! multi-dimensional variants and back.
//!
//! # Examples
//!
//! ```
//! use uagraph_core::codec::ValueCodec;
//! use uagraph_core::value::{DataTypeTag, GenericValue, ValueRank};
//! use uagraph_core::variant::BuiltInType;
//!
//! let codec = ValueCodec::default();
//! let tag = DataTypeTag::BuiltIn(BuiltInType::Int32);
//! let variant = codec.encode(&GenericValue::Int32(42), &tag, ValueRank::SCALAR).unwrap();
//! assert_eq!(codec.decode(&variant, &tag).unwrap(), GenericValue::Int32(42));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, OpcUaResult};
use crate::value::{
    DataTypeTag, GenericValue, StructureDefinition, StructureField, StructureValue, ValueRank,
};
use crate::variant::{BuiltInType, ExtensionObject, ExtensionObjectBody, ScalarValue, Variant};

// =============================================================================
// CodecOptions
// =============================================================================

/// Options controlling shape validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Validate arrays against the declared ArrayDimensions.
    pub strict_dimensions: bool,

    /// Maximum number of array elements (0 = unlimited).
    pub max_array_length: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            strict_dimensions: true,
            max_array_length: 0,
        }
    }
}

impl CodecOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables ArrayDimensions validation.
    #[inline]
    pub fn with_strict_dimensions(mut self, strict: bool) -> Self {
        self.strict_dimensions = strict;
        self
    }

    /// Sets the maximum array length.
    #[inline]
    pub fn with_max_array_length(mut self, max: usize) -> Self {
        self.max_array_length = max;
        self
    }
}

// =============================================================================
// ValueCodec
// =============================================================================

/// Converts between generic values and protocol variants.
#[derive(Debug, Clone, Default)]
pub struct ValueCodec {
    options: CodecOptions,
}

impl ValueCodec {
    /// Creates a codec with the given options.
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Returns the codec options.
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Encodes a value for a node with the given data type and value rank.
    pub fn encode(
        &self,
        value: &GenericValue,
        tag: &DataTypeTag,
        rank: ValueRank,
    ) -> OpcUaResult<Variant> {
        self.encode_with_dimensions(value, tag, rank, &[])
    }

    /// Encodes a value and validates arrays against `array_dimensions`.
    ///
    /// A declared length of zero leaves that dimension unbounded; any other
    /// declared length is an upper bound.
    pub fn encode_with_dimensions(
        &self,
        value: &GenericValue,
        tag: &DataTypeTag,
        rank: ValueRank,
        array_dimensions: &[u32],
    ) -> OpcUaResult<Variant> {
        match value {
            GenericValue::Null => Ok(Variant::Empty),
            GenericValue::Array(_) => {
                let mut shape = Vec::new();
                let mut leaves = Vec::new();
                flatten(value, 0, &mut shape, &mut leaves)?;

                if !rank.accepts(shape.len()) {
                    return Err(ConversionError::shape_mismatch(
                        rank.to_string(),
                        format!("{}D array", shape.len()),
                    )
                    .into());
                }
                self.check_dimensions(&shape, array_dimensions)?;
                if self.options.max_array_length > 0 && leaves.len() > self.options.max_array_length
                {
                    return Err(ConversionError::array_too_long(
                        leaves.len(),
                        self.options.max_array_length,
                    )
                    .into());
                }

                let values = leaves
                    .iter()
                    .map(|leaf| self.encode_scalar(leaf, tag))
                    .collect::<OpcUaResult<Vec<_>>>()?;
                let element_type = element_type_of(tag, &values)?;
                let dimensions = if shape.len() > 1 {
                    Some(
                        shape
                            .iter()
                            .map(|d| u32::try_from(*d).unwrap_or(u32::MAX))
                            .collect(),
                    )
                } else {
                    None
                };
                Ok(Variant::Array {
                    element_type,
                    values,
                    dimensions,
                })
            }
            scalar => {
                if !rank.allows_scalar() {
                    return Err(
                        ConversionError::shape_mismatch(rank.to_string(), "scalar").into()
                    );
                }
                Ok(Variant::scalar(self.encode_scalar(scalar, tag)?))
            }
        }
    }

    fn check_dimensions(&self, shape: &[usize], declared: &[u32]) -> OpcUaResult<()> {
        if !self.options.strict_dimensions || declared.is_empty() {
            return Ok(());
        }
        if declared.len() != shape.len() {
            return Err(ConversionError::shape_mismatch(
                format!("{} dimensions", declared.len()),
                format!("{} dimensions", shape.len()),
            )
            .into());
        }
        for (index, (declared, actual)) in declared.iter().zip(shape).enumerate() {
            if *declared != 0 && *actual > *declared as usize {
                return Err(ConversionError::dimension_mismatch(index, *declared, *actual).into());
            }
        }
        Ok(())
    }

    fn encode_scalar(&self, value: &GenericValue, tag: &DataTypeTag) -> OpcUaResult<ScalarValue> {
        match tag {
            DataTypeTag::Structure(definition) => self.encode_structure(value, definition),
            DataTypeTag::Any => self.encode_natural(value),
            _ => {
                if matches!(value, GenericValue::Null | GenericValue::Array(_)) {
                    return Err(mismatch(tag, value).into());
                }
                let scalar = self.encode_natural(value)?;
                if tag.accepts(scalar.built_in_type()) {
                    Ok(scalar)
                } else {
                    Err(mismatch(tag, value).into())
                }
            }
        }
    }

    fn encode_natural(&self, value: &GenericValue) -> OpcUaResult<ScalarValue> {
        Ok(match value {
            GenericValue::Boolean(v) => ScalarValue::Boolean(*v),
            GenericValue::SByte(v) => ScalarValue::SByte(*v),
            GenericValue::Byte(v) => ScalarValue::Byte(*v),
            GenericValue::Int16(v) => ScalarValue::Int16(*v),
            GenericValue::UInt16(v) => ScalarValue::UInt16(*v),
            GenericValue::Int32(v) => ScalarValue::Int32(*v),
            GenericValue::UInt32(v) => ScalarValue::UInt32(*v),
            GenericValue::Int64(v) => ScalarValue::Int64(*v),
            GenericValue::UInt64(v) => ScalarValue::UInt64(*v),
            GenericValue::Float(v) => ScalarValue::Float(*v),
            GenericValue::Double(v) => ScalarValue::Double(*v),
            GenericValue::String(v) => ScalarValue::String(v.clone()),
            GenericValue::DateTime(v) => ScalarValue::DateTime(*v),
            GenericValue::Guid(v) => ScalarValue::Guid(*v),
            GenericValue::ByteString(v) => ScalarValue::ByteString(v.clone()),
            GenericValue::XmlElement(v) => ScalarValue::XmlElement(v.clone()),
            GenericValue::NodeId(v) => ScalarValue::NodeId(v.clone()),
            GenericValue::ExpandedNodeId(v) => ScalarValue::ExpandedNodeId(v.clone()),
            GenericValue::QualifiedName(v) => ScalarValue::QualifiedName(v.clone()),
            GenericValue::LocalizedText(v) => ScalarValue::LocalizedText(v.clone()),
            GenericValue::StatusCode(v) => ScalarValue::StatusCode(*v),
            GenericValue::Structure(s) => {
                let fields = s
                    .fields
                    .iter()
                    .map(|f| {
                        self.encode(&f.value, &DataTypeTag::Any, ValueRank::ANY)
                            .map(|v| (f.name.clone(), v))
                    })
                    .collect::<OpcUaResult<Vec<_>>>()?;
                ScalarValue::ExtensionObject(ExtensionObject {
                    type_id: s.type_id.clone(),
                    encoding: s.encoding,
                    body: ExtensionObjectBody::Fields(fields),
                })
            }
            GenericValue::Null | GenericValue::Array(_) => {
                return Err(ConversionError::type_mismatch("scalar", value.type_name()).into())
            }
        })
    }

    fn encode_structure(
        &self,
        value: &GenericValue,
        definition: &StructureDefinition,
    ) -> OpcUaResult<ScalarValue> {
        let GenericValue::Structure(structure) = value else {
            return Err(ConversionError::type_mismatch(
                format!("Structure({})", definition.type_id),
                value.type_name(),
            )
            .into());
        };
        if !structure.type_id.is_null() && structure.type_id != definition.type_id {
            return Err(ConversionError::type_mismatch(
                definition.type_id.to_string(),
                structure.type_id.to_string(),
            )
            .into());
        }

        let type_name = definition.type_id.to_string();
        if let Some(unknown) = structure
            .fields
            .iter()
            .find(|f| !definition.fields.iter().any(|d| d.name == f.name))
        {
            return Err(ConversionError::unknown_field(type_name, unknown.name.clone()).into());
        }

        let mut fields = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            match structure.field(&field.name) {
                Some(field_value) => {
                    let encoded = self.encode(field_value, &field.data_type, field.value_rank)?;
                    fields.push((field.name.clone(), encoded));
                }
                None if field.is_optional => {}
                None => {
                    return Err(ConversionError::missing_field(type_name, field.name.clone()).into())
                }
            }
        }

        Ok(ScalarValue::ExtensionObject(ExtensionObject {
            type_id: definition.type_id.clone(),
            encoding: structure.encoding,
            body: ExtensionObjectBody::Fields(fields),
        }))
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    /// Decodes a variant read from a node with the given data type.
    pub fn decode(&self, variant: &Variant, tag: &DataTypeTag) -> OpcUaResult<GenericValue> {
        match variant {
            Variant::Empty => Ok(GenericValue::Null),
            Variant::Scalar { value } => self.decode_scalar(value, tag),
            Variant::Array {
                element_type,
                values,
                dimensions,
            } => {
                if !tag.accepts(*element_type) {
                    return Err(ConversionError::type_mismatch(
                        tag.to_string(),
                        format!("{}[]", element_type),
                    )
                    .into());
                }
                let decoded = values
                    .iter()
                    .map(|v| self.decode_scalar(v, tag))
                    .collect::<OpcUaResult<Vec<_>>>()?;
                match dimensions {
                    Some(dims) if dims.len() > 1 => nest(decoded, dims),
                    _ => Ok(GenericValue::Array(decoded)),
                }
            }
        }
    }

    fn decode_scalar(&self, value: &ScalarValue, tag: &DataTypeTag) -> OpcUaResult<GenericValue> {
        if !tag.accepts(value.built_in_type()) {
            return Err(
                ConversionError::type_mismatch(tag.to_string(), value.built_in_type().name())
                    .into(),
            );
        }
        Ok(match value {
            ScalarValue::Boolean(v) => GenericValue::Boolean(*v),
            ScalarValue::SByte(v) => GenericValue::SByte(*v),
            ScalarValue::Byte(v) => GenericValue::Byte(*v),
            ScalarValue::Int16(v) => GenericValue::Int16(*v),
            ScalarValue::UInt16(v) => GenericValue::UInt16(*v),
            ScalarValue::Int32(v) => GenericValue::Int32(*v),
            ScalarValue::UInt32(v) => GenericValue::UInt32(*v),
            ScalarValue::Int64(v) => GenericValue::Int64(*v),
            ScalarValue::UInt64(v) => GenericValue::UInt64(*v),
            ScalarValue::Float(v) => GenericValue::Float(*v),
            ScalarValue::Double(v) => GenericValue::Double(*v),
            ScalarValue::String(v) => GenericValue::String(v.clone()),
            ScalarValue::DateTime(v) => GenericValue::DateTime(*v),
            ScalarValue::Guid(v) => GenericValue::Guid(*v),
            ScalarValue::ByteString(v) => GenericValue::ByteString(v.clone()),
            ScalarValue::XmlElement(v) => GenericValue::XmlElement(v.clone()),
            ScalarValue::NodeId(v) => GenericValue::NodeId(v.clone()),
            ScalarValue::ExpandedNodeId(v) => GenericValue::ExpandedNodeId(v.clone()),
            ScalarValue::StatusCode(v) => GenericValue::StatusCode(*v),
            ScalarValue::QualifiedName(v) => GenericValue::QualifiedName(v.clone()),
            ScalarValue::LocalizedText(v) => GenericValue::LocalizedText(v.clone()),
            ScalarValue::ExtensionObject(eo) => {
                let definition = match tag {
                    DataTypeTag::Structure(definition) => Some(definition),
                    _ => None,
                };
                self.decode_extension_object(eo, definition)?
            }
        })
    }

    fn decode_extension_object(
        &self,
        eo: &ExtensionObject,
        definition: Option<&StructureDefinition>,
    ) -> OpcUaResult<GenericValue> {
        let encoded_fields: &[(String, Variant)] = match &eo.body {
            ExtensionObjectBody::None => &[],
            ExtensionObjectBody::Fields(fields) => fields,
            ExtensionObjectBody::Binary(_) | ExtensionObjectBody::Xml(_) => {
                return Err(ConversionError::invalid_value(
                    eo.type_id.to_string(),
                    "structure body is not decoded",
                )
                .into())
            }
        };

        let mut fields = Vec::with_capacity(encoded_fields.len());
        for (name, variant) in encoded_fields {
            let value = match definition {
                Some(definition) => {
                    let field = definition
                        .fields
                        .iter()
                        .find(|f| &f.name == name)
                        .ok_or_else(|| {
                            ConversionError::unknown_field(definition.type_id.to_string(), name)
                        })?;
                    self.decode(variant, &field.data_type)?
                }
                None => self.decode(variant, &DataTypeTag::Any)?,
            };
            fields.push(StructureField {
                name: name.clone(),
                value,
            });
        }

        Ok(GenericValue::Structure(StructureValue {
            type_id: eo.type_id.clone(),
            encoding: eo.encoding,
            fields,
        }))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn mismatch(tag: &DataTypeTag, value: &GenericValue) -> ConversionError {
    ConversionError::type_mismatch(tag.to_string(), value.type_name())
}

/// Walks nested arrays, recording the length per depth and collecting leaves.
fn flatten<'a>(
    value: &'a GenericValue,
    depth: usize,
    shape: &mut Vec<usize>,
    leaves: &mut Vec<&'a GenericValue>,
) -> OpcUaResult<()> {
    match value {
        GenericValue::Array(items) => {
            if shape.len() == depth {
                shape.push(items.len());
            } else if shape.get(depth) != Some(&items.len()) {
                return Err(ConversionError::shape_mismatch(
                    "rectangular array",
                    "jagged array",
                )
                .into());
            }
            for item in items {
                flatten(item, depth + 1, shape, leaves)?;
            }
            Ok(())
        }
        scalar => {
            if depth != shape.len() {
                return Err(ConversionError::shape_mismatch(
                    "rectangular array",
                    "mixed scalars and arrays",
                )
                .into());
            }
            leaves.push(scalar);
            Ok(())
        }
    }
}

/// Picks the element type of an encoded array.
///
/// Abstract tags take the type of the elements, which must agree. Empty
/// arrays under a numeric tag take the widest member of the family and
/// empty arrays under `BaseDataType` are arrays of `Variant`.
fn element_type_of(tag: &DataTypeTag, values: &[ScalarValue]) -> OpcUaResult<BuiltInType> {
    if let Some(fixed) = tag.built_in_type() {
        return Ok(fixed);
    }
    let Some(first) = values.first() else {
        return Ok(match tag {
            DataTypeTag::Number => BuiltInType::Double,
            DataTypeTag::Integer => BuiltInType::Int64,
            DataTypeTag::UInteger => BuiltInType::UInt64,
            _ => BuiltInType::Variant,
        });
    };
    let element_type = first.built_in_type();
    if let Some(other) = values.iter().find(|v| v.built_in_type() != element_type) {
        return Err(ConversionError::type_mismatch(
            element_type.name(),
            other.built_in_type().name(),
        )
        .into());
    }
    Ok(element_type)
}

/// Rebuilds nested arrays from a row-major flat list.
fn nest(values: Vec<GenericValue>, dims: &[u32]) -> OpcUaResult<GenericValue> {
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(*d as usize))
        .ok_or_else(|| {
            ConversionError::shape_mismatch(
                format!("dimensions {:?}", dims),
                format!("{} elements", values.len()),
            )
        })?;
    if expected != values.len() {
        return Err(ConversionError::shape_mismatch(
            format!("{} elements", expected),
            format!("{} elements", values.len()),
        )
        .into());
    }

    fn build(values: &mut std::vec::IntoIter<GenericValue>, dims: &[u32]) -> GenericValue {
        match dims.split_first() {
            Some((len, [])) => GenericValue::Array(values.take(*len as usize).collect()),
            Some((len, rest)) => {
                GenericValue::Array((0..*len).map(|_| build(values, rest)).collect())
            }
            None => GenericValue::Array(Vec::new()),
        }
    }

    let mut iter = values.into_iter();
    Ok(build(&mut iter, dims))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::error::OpcUaError;
    use crate::status::StatusCode;
    use crate::types::{ExpandedNodeId, LocalizedText, NodeId, QualifiedName};

    fn built_in(t: BuiltInType) -> DataTypeTag {
        DataTypeTag::BuiltIn(t)
    }

    #[test]
    fn test_scalar_round_trip_per_tag() {
        let codec = ValueCodec::default();
        let samples = vec![
            (GenericValue::Boolean(true), BuiltInType::Boolean),
            (GenericValue::SByte(-8), BuiltInType::SByte),
            (GenericValue::Byte(200), BuiltInType::Byte),
            (GenericValue::Int16(-1234), BuiltInType::Int16),
            (GenericValue::UInt16(65000), BuiltInType::UInt16),
            (GenericValue::Int32(i32::MIN), BuiltInType::Int32),
            (GenericValue::UInt32(u32::MAX), BuiltInType::UInt32),
            (GenericValue::Int64(i64::MAX), BuiltInType::Int64),
            (GenericValue::UInt64(u64::MAX), BuiltInType::UInt64),
            (GenericValue::Float(1.5), BuiltInType::Float),
            (GenericValue::Double(-0.25), BuiltInType::Double),
            (GenericValue::String("hello".into()), BuiltInType::String),
            (
                GenericValue::DateTime(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
                BuiltInType::DateTime,
            ),
            (GenericValue::Guid(Uuid::new_v4()), BuiltInType::Guid),
            (GenericValue::ByteString(vec![1, 2, 3]), BuiltInType::ByteString),
            (GenericValue::XmlElement("<a/>".into()), BuiltInType::XmlElement),
            (GenericValue::NodeId(NodeId::numeric(2, 7)), BuiltInType::NodeId),
            (
                GenericValue::ExpandedNodeId(ExpandedNodeId::from(NodeId::string(1, "x"))),
                BuiltInType::ExpandedNodeId,
            ),
            (
                GenericValue::StatusCode(StatusCode::BAD_NOT_FOUND),
                BuiltInType::StatusCode,
            ),
            (
                GenericValue::QualifiedName(QualifiedName::new(2, "Name")),
                BuiltInType::QualifiedName,
            ),
            (
                GenericValue::LocalizedText(LocalizedText::with_locale("en", "Text")),
                BuiltInType::LocalizedText,
            ),
        ];

        for (value, t) in samples {
            let tag = built_in(t);
            let variant = codec.encode(&value, &tag, ValueRank::SCALAR).unwrap();
            assert_eq!(variant.built_in_type(), Some(t));
            assert_eq!(codec.decode(&variant, &tag).unwrap(), value, "{}", t);
        }
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let codec = ValueCodec::default();
        let result = codec.encode(
            &GenericValue::String("not bytes".into()),
            &built_in(BuiltInType::ByteString),
            ValueRank::SCALAR,
        );
        match result {
            Err(OpcUaError::Conversion(ConversionError::TypeMismatch { expected, actual })) => {
                assert_eq!(expected, "ByteString");
                assert_eq!(actual, "String");
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(codec
            .encode(&GenericValue::Int16(1), &built_in(BuiltInType::Int32), ValueRank::SCALAR)
            .is_err());
    }

    #[test]
    fn test_abstract_tags() {
        let codec = ValueCodec::default();
        let variant = codec
            .encode(&GenericValue::Float(2.0), &DataTypeTag::Number, ValueRank::SCALAR)
            .unwrap();
        assert_eq!(variant.built_in_type(), Some(BuiltInType::Float));

        assert!(codec
            .encode(&GenericValue::Double(1.0), &DataTypeTag::Integer, ValueRank::SCALAR)
            .is_err());
        assert!(codec
            .encode(&GenericValue::SByte(-1), &DataTypeTag::UInteger, ValueRank::SCALAR)
            .is_err());
    }

    #[test]
    fn test_enumeration_as_int32() {
        let codec = ValueCodec::default();
        let tag = DataTypeTag::Enumeration(NodeId::numeric(0, 852));
        let variant = codec
            .encode(&GenericValue::Int32(3), &tag, ValueRank::SCALAR)
            .unwrap();
        assert_eq!(variant, Variant::scalar(ScalarValue::Int32(3)));
        assert!(codec
            .encode(&GenericValue::UInt32(3), &tag, ValueRank::SCALAR)
            .is_err());
    }

    #[test]
    fn test_rank_is_enforced() {
        let codec = ValueCodec::default();
        let tag = built_in(BuiltInType::Int32);
        let array = GenericValue::from(vec![1i32, 2, 3]);

        assert!(codec.encode(&array, &tag, ValueRank::SCALAR).is_err());
        assert!(codec
            .encode(&GenericValue::Int32(1), &tag, ValueRank::ONE_DIMENSION)
            .is_err());
        assert!(codec.encode(&array, &tag, ValueRank::ONE_DIMENSION).is_ok());
        assert!(codec.encode(&array, &tag, ValueRank::ANY).is_ok());
    }

    #[test]
    fn test_multi_dimensional_round_trip() {
        let codec = ValueCodec::default();
        let tag = built_in(BuiltInType::Double);
        let matrix = GenericValue::Array(vec![
            GenericValue::from(vec![1.0f64, 2.0, 3.0]),
            GenericValue::from(vec![4.0f64, 5.0, 6.0]),
        ]);

        let variant = codec.encode(&matrix, &tag, ValueRank(2)).unwrap();
        assert_eq!(variant.array_dimensions(), vec![2, 3]);
        assert_eq!(codec.decode(&variant, &tag).unwrap(), matrix);
    }

    #[test]
    fn test_overflowing_dimensions_are_rejected() {
        let codec = ValueCodec::default();
        let variant = Variant::Array {
            element_type: BuiltInType::Int32,
            values: Vec::new(),
            dimensions: Some(vec![u32::MAX; 3]),
        };
        let error = codec.decode(&variant, &built_in(BuiltInType::Int32)).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_TYPE_MISMATCH);
    }

    #[test]
    fn test_empty_array_element_types() {
        let codec = ValueCodec::default();
        let empty = GenericValue::Array(Vec::new());

        let variant = codec.encode(&empty, &DataTypeTag::Any, ValueRank::ANY).unwrap();
        assert_eq!(variant.built_in_type(), Some(BuiltInType::Variant));
        assert_eq!(codec.decode(&variant, &DataTypeTag::Any).unwrap(), empty);

        let variant = codec.encode(&empty, &DataTypeTag::Integer, ValueRank::ANY).unwrap();
        assert_eq!(variant.built_in_type(), Some(BuiltInType::Int64));
    }

    #[test]
    fn test_jagged_array_is_rejected() {
        let codec = ValueCodec::default();
        let jagged = GenericValue::Array(vec![
            GenericValue::from(vec![1i32, 2]),
            GenericValue::from(vec![3i32]),
        ]);
        assert!(codec
            .encode(&jagged, &built_in(BuiltInType::Int32), ValueRank::ANY)
            .is_err());
    }

    #[test]
    fn test_array_dimensions() {
        let codec = ValueCodec::default();
        let tag = built_in(BuiltInType::Byte);
        let value = GenericValue::from(vec![1u8, 2, 3]);

        assert!(codec
            .encode_with_dimensions(&value, &tag, ValueRank::ONE_DIMENSION, &[0])
            .is_ok());
        assert!(codec
            .encode_with_dimensions(&value, &tag, ValueRank::ONE_DIMENSION, &[3])
            .is_ok());
        assert!(matches!(
            codec.encode_with_dimensions(&value, &tag, ValueRank::ONE_DIMENSION, &[2]),
            Err(OpcUaError::Conversion(ConversionError::DimensionMismatch { .. }))
        ));

        let lenient = ValueCodec::new(CodecOptions::new().with_strict_dimensions(false));
        assert!(lenient
            .encode_with_dimensions(&value, &tag, ValueRank::ONE_DIMENSION, &[2])
            .is_ok());
    }

    #[test]
    fn test_max_array_length() {
        let codec = ValueCodec::new(CodecOptions::new().with_max_array_length(2));
        let result = codec.encode(
            &GenericValue::from(vec![1u8, 2, 3]),
            &built_in(BuiltInType::Byte),
            ValueRank::ANY,
        );
        assert!(matches!(
            result,
            Err(OpcUaError::Conversion(ConversionError::ArrayTooLong { length: 3, max: 2 }))
        ));
    }

    #[test]
    fn test_structure_with_schema() {
        let codec = ValueCodec::default();
        let definition = StructureDefinition::new(NodeId::numeric(2, 3001))
            .with_field("X", BuiltInType::Double, ValueRank::SCALAR)
            .with_field("Tags", BuiltInType::String, ValueRank::ONE_DIMENSION)
            .with_optional_field("Note", BuiltInType::String, ValueRank::SCALAR);
        let tag = DataTypeTag::Structure(definition);

        let value = GenericValue::Structure(
            StructureValue::new(NodeId::numeric(2, 3001))
                .with_field("X", 1.0f64)
                .with_field("Tags", vec!["a", "b"].into_iter().map(String::from).collect::<Vec<_>>()),
        );
        let variant = codec.encode(&value, &tag, ValueRank::SCALAR).unwrap();
        assert_eq!(variant.built_in_type(), Some(BuiltInType::ExtensionObject));
        assert_eq!(codec.decode(&variant, &tag).unwrap(), value);

        let missing = GenericValue::Structure(
            StructureValue::new(NodeId::numeric(2, 3001)).with_field("X", 1.0f64),
        );
        assert!(matches!(
            codec.encode(&missing, &tag, ValueRank::SCALAR),
            Err(OpcUaError::Conversion(ConversionError::MissingField { .. }))
        ));

        let wrong_field_type = GenericValue::Structure(
            StructureValue::new(NodeId::numeric(2, 3001))
                .with_field("X", 1i32)
                .with_field("Tags", Vec::<String>::new()),
        );
        assert!(matches!(
            codec.encode(&wrong_field_type, &tag, ValueRank::SCALAR),
            Err(OpcUaError::Conversion(ConversionError::TypeMismatch { .. }))
        ));

        let unknown = GenericValue::Structure(
            StructureValue::new(NodeId::numeric(2, 3001))
                .with_field("X", 1.0f64)
                .with_field("Tags", Vec::<String>::new())
                .with_field("Extra", true),
        );
        assert!(matches!(
            codec.encode(&unknown, &tag, ValueRank::SCALAR),
            Err(OpcUaError::Conversion(ConversionError::UnknownField { .. }))
        ));
    }

    #[test]
    fn test_structure_without_schema_uses_natural_types() {
        let codec = ValueCodec::default();
        let tag = built_in(BuiltInType::ExtensionObject);
        let value = GenericValue::Structure(
            StructureValue::new(NodeId::numeric(3, 10))
                .with_field("Flag", true)
                .with_field("Count", 4u16),
        );
        let variant = codec.encode(&value, &tag, ValueRank::SCALAR).unwrap();
        assert_eq!(codec.decode(&variant, &tag).unwrap(), value);

        assert!(codec
            .encode(&GenericValue::Int32(1), &tag, ValueRank::SCALAR)
            .is_err());
    }

    #[test]
    fn test_decode_type_mismatch() {
        let codec = ValueCodec::default();
        let variant = Variant::scalar(ScalarValue::String("x".into()));
        assert!(codec
            .decode(&variant, &built_in(BuiltInType::Int32))
            .is_err());
        assert_eq!(
            codec.decode(&variant, &DataTypeTag::Any).unwrap(),
            GenericValue::String("x".into())
        );
    }

    #[test]
    fn test_null_encodes_to_empty() {
        let codec = ValueCodec::default();
        let variant = codec
            .encode(&GenericValue::Null, &built_in(BuiltInType::Int32), ValueRank::SCALAR)
            .unwrap();
        assert!(variant.is_empty());
        assert_eq!(
            codec.decode(&variant, &built_in(BuiltInType::Int32)).unwrap(),
            GenericValue::Null
        );
    }
}
