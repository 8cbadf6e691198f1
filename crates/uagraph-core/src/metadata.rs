// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node metadata resolution.
//!
//! [`MetadataResolver::get_metadata`] combines the type hierarchy, the
//! instance declarations and the node's own variable or method details:
//!
//! ```text
//! node ──read──► NodeAttributes
//!   │
//!   ├── Method ─────────► MethodMetadata (InputArguments / OutputArguments)
//!   │
//!   └── Object/Variable ─► HasTypeDefinition ─► TypeHierarchy ─► Declarations
//!                                                     │
//!                                                     └─► NodeKind
//! ```
//!
//! [`DataTypeResolver`] maps a DataType node onto the [`DataTypeTag`] the
//! codec works with by walking the data type's supertypes.

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::declarations::{DeclarationAggregator, DeclarationSet};
use crate::error::{ConversionError, MetadataError, OpcUaError, OpcUaResult};
use crate::hierarchy::{NodeKind, TypeHierarchy, TypeHierarchyResolver};
use crate::service::{DataTypeDefinition, NodeAttributes, NodeService};
use crate::types::{ids, LocalizedText, NodeClass, NodeId, QualifiedName};
use crate::value::{DataTypeTag, StructureDefinition, StructureFieldDefinition, ValueRank};
use crate::variant::{BuiltInType, ExtensionObject, ScalarValue, Variant};

// =============================================================================
// Metadata types
// =============================================================================

/// Data type and shape of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMetadata {
    /// The DataType attribute.
    pub data_type_id: NodeId,
    /// The resolved codec tag.
    pub data_type: DataTypeTag,
    /// The ValueRank attribute.
    pub value_rank: ValueRank,
    /// The ArrayDimensions attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
}

/// One method argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodArgument {
    /// Argument name.
    pub name: String,
    /// Argument data type node.
    pub data_type: NodeId,
    /// Value rank.
    pub value_rank: ValueRank,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_dimensions: Vec<u32>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
}

/// Arguments of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Input arguments in order.
    pub input_arguments: Vec<MethodArgument>,
    /// Output arguments in order.
    pub output_arguments: Vec<MethodArgument>,
}

/// Everything known about a node's type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeMetadata {
    /// The node.
    pub node_id: NodeId,
    /// Node class.
    pub node_class: NodeClass,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Display name.
    pub display_name: LocalizedText,
    /// Classification.
    pub kind: NodeKind,
    /// The node's type definition (the node itself for types).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_definition_id: Option<NodeId>,
    /// Supertypes of the type definition.
    pub type_hierarchy: TypeHierarchy,
    /// Instance declarations of the type definition.
    pub declarations: DeclarationSet,
    /// Variable details, for variables and variable types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<VariableMetadata>,
    /// Method details, for methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<MethodMetadata>,
}

// =============================================================================
// DataTypeResolver
// =============================================================================

/// Maps DataType nodes onto codec tags.
#[derive(Debug)]
pub struct DataTypeResolver<S: NodeService + ?Sized> {
    browser: Browser<S>,
}

impl<S: NodeService + ?Sized> Clone for DataTypeResolver<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> DataTypeResolver<S> {
    /// Creates a resolver.
    pub fn new(browser: Browser<S>) -> Self {
        Self { browser }
    }

    /// Resolves the codec tag of a data type.
    ///
    /// Built-in types map to themselves, Number/Integer/UInteger to the
    /// abstract tags, enumerations to Int32, structures to their field
    /// schema (or an opaque ExtensionObject without a definition), and
    /// BaseDataType to `Any`.
    pub async fn resolve(
        &self,
        data_type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<DataTypeTag> {
        let mut in_progress = Vec::new();
        self.resolve_inner(data_type_id.clone(), &mut in_progress, cancel)
            .await
    }

    fn resolve_inner<'a>(
        &'a self,
        data_type_id: NodeId,
        in_progress: &'a mut Vec<NodeId>,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, OpcUaResult<DataTypeTag>>
    where
        S: 'a,
    {
        async move {
            let mut current = data_type_id.clone();
            let mut visited = vec![current.clone()];
            loop {
                cancel.check()?;
                if current == ids::STRUCTURE {
                    if data_type_id == ids::STRUCTURE || in_progress.contains(&data_type_id) {
                        return Ok(DataTypeTag::BuiltIn(BuiltInType::ExtensionObject));
                    }
                    in_progress.push(data_type_id.clone());
                    let tag = self.structure(&data_type_id, in_progress, cancel).await;
                    in_progress.pop();
                    return tag;
                }
                if current == ids::ENUMERATION {
                    return Ok(DataTypeTag::Enumeration(data_type_id));
                }
                if current == ids::NUMBER {
                    return Ok(DataTypeTag::Number);
                }
                if current == ids::INTEGER {
                    return Ok(DataTypeTag::Integer);
                }
                if current == ids::UINTEGER {
                    return Ok(DataTypeTag::UInteger);
                }
                if current == ids::BASE_DATA_TYPE {
                    return Ok(DataTypeTag::Any);
                }
                if let Some(built_in) = BuiltInType::from_node_id(&current) {
                    return Ok(DataTypeTag::BuiltIn(built_in));
                }

                let parent = self
                    .browser
                    .supertype(&current, cancel)
                    .await?
                    .map(|r| r.node_id.node_id)
                    .ok_or_else(|| {
                        MetadataError::data_type_unresolved(
                            data_type_id.to_string(),
                            format!("{} has no supertype", current),
                        )
                    })?;
                if visited.contains(&parent) {
                    return Err(MetadataError::malformed(
                        data_type_id.to_string(),
                        format!("data type cycle through {}", parent),
                    )
                    .into());
                }
                visited.push(parent.clone());
                current = parent;
            }
        }
        .boxed()
    }

    async fn structure(
        &self,
        data_type_id: &NodeId,
        in_progress: &mut Vec<NodeId>,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<DataTypeTag> {
        let attributes = self.browser.read_attributes(data_type_id).await?;
        let Some(DataTypeDefinition::Structure {
            default_encoding_id,
            fields,
        }) = attributes.data_type_definition
        else {
            debug!(data_type = %data_type_id, "Structure without definition, treating as opaque");
            return Ok(DataTypeTag::BuiltIn(BuiltInType::ExtensionObject));
        };

        let mut definition = StructureDefinition::new(data_type_id.clone());
        definition.default_encoding_id = default_encoding_id;
        for field in fields {
            let data_type = self
                .resolve_inner(field.data_type.clone(), in_progress, cancel)
                .await?;
            definition.fields.push(StructureFieldDefinition {
                name: field.name,
                data_type,
                value_rank: field.value_rank,
                is_optional: field.is_optional,
            });
        }
        Ok(DataTypeTag::Structure(definition))
    }

    /// Builds variable metadata from the node's attributes.
    pub async fn variable_metadata(
        &self,
        attributes: &NodeAttributes,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<VariableMetadata> {
        let data_type_id = attributes
            .data_type
            .clone()
            .unwrap_or(ids::BASE_DATA_TYPE);
        let data_type = self.resolve(&data_type_id, cancel).await?;
        Ok(VariableMetadata {
            data_type_id,
            data_type,
            value_rank: attributes.value_rank.unwrap_or(ValueRank::ANY),
            array_dimensions: attributes.array_dimensions.clone(),
        })
    }

    /// Reads the `InputArguments` and `OutputArguments` properties of a method.
    pub async fn method_metadata(
        &self,
        method_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<MethodMetadata> {
        let table = self.browser.namespace_table().await?;
        let properties = self
            .browser
            .children(method_id, ids::HAS_PROPERTY, &[NodeClass::Variable], cancel)
            .await?;

        let mut metadata = MethodMetadata::default();
        for property in properties {
            let target = match property.browse_name.name.as_str() {
                ids::INPUT_ARGUMENTS => &mut metadata.input_arguments,
                ids::OUTPUT_ARGUMENTS => &mut metadata.output_arguments,
                _ => continue,
            };
            let Some(node_id) = property.node_id.to_node_id(&table) else {
                continue;
            };
            let value = self.browser.service().read_value(&node_id).await?;
            *target = decode_arguments(&value.value)?;
        }
        Ok(metadata)
    }
}

/// Decodes an array of `Argument` structures.
pub fn decode_arguments(value: &Variant) -> OpcUaResult<Vec<MethodArgument>> {
    let values = match value {
        Variant::Empty => return Ok(Vec::new()),
        Variant::Array { values, .. } => values.as_slice(),
        Variant::Scalar { value } => std::slice::from_ref(value),
    };
    values
        .iter()
        .map(|value| match value {
            ScalarValue::ExtensionObject(object) => decode_argument(object),
            other => Err(ConversionError::type_mismatch(
                "Argument",
                other.built_in_type().name(),
            )
            .into()),
        })
        .collect()
}

fn decode_argument(object: &ExtensionObject) -> OpcUaResult<MethodArgument> {
    let missing = |field: &str| -> OpcUaError { ConversionError::missing_field("Argument", field).into() };
    let name = match object.field("Name").and_then(Variant::as_scalar) {
        Some(ScalarValue::String(name)) => name.clone(),
        _ => return Err(missing("Name")),
    };
    let data_type = match object.field("DataType").and_then(Variant::as_scalar) {
        Some(ScalarValue::NodeId(id)) => id.clone(),
        _ => return Err(missing("DataType")),
    };
    let value_rank = match object.field("ValueRank").and_then(Variant::as_scalar) {
        Some(ScalarValue::Int32(rank)) => ValueRank(*rank),
        _ => ValueRank::SCALAR,
    };
    let array_dimensions = match object.field("ArrayDimensions") {
        Some(Variant::Array { values, .. }) => values
            .iter()
            .filter_map(|v| match v {
                ScalarValue::UInt32(d) => Some(*d),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    let description = match object.field("Description").and_then(Variant::as_scalar) {
        Some(ScalarValue::LocalizedText(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    };
    Ok(MethodArgument {
        name,
        data_type,
        value_rank,
        array_dimensions,
        description,
    })
}

/// Builds an `Argument` extension object, as servers expose them.
pub fn encode_argument(argument: &MethodArgument) -> ExtensionObject {
    ExtensionObject::with_fields(
        ids::ARGUMENT,
        vec![
            ("Name".to_string(), Variant::scalar(ScalarValue::String(argument.name.clone()))),
            ("DataType".to_string(), Variant::scalar(ScalarValue::NodeId(argument.data_type.clone()))),
            ("ValueRank".to_string(), Variant::scalar(ScalarValue::Int32(argument.value_rank.0))),
            (
                "ArrayDimensions".to_string(),
                Variant::array(
                    BuiltInType::UInt32,
                    argument.array_dimensions.iter().map(|d| ScalarValue::UInt32(*d)).collect(),
                ),
            ),
            (
                "Description".to_string(),
                Variant::scalar(ScalarValue::LocalizedText(
                    argument.description.clone().unwrap_or_default(),
                )),
            ),
        ],
    )
}

// =============================================================================
// MetadataResolver
// =============================================================================

/// Resolves [`NodeMetadata`].
#[derive(Debug)]
pub struct MetadataResolver<S: NodeService + ?Sized> {
    browser: Browser<S>,
    hierarchy: TypeHierarchyResolver<S>,
    declarations: DeclarationAggregator<S>,
    data_types: DataTypeResolver<S>,
}

impl<S: NodeService + ?Sized> Clone for MetadataResolver<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
            hierarchy: self.hierarchy.clone(),
            declarations: self.declarations.clone(),
            data_types: self.data_types.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> MetadataResolver<S> {
    /// Creates a resolver.
    pub fn new(browser: Browser<S>) -> Self {
        Self {
            hierarchy: TypeHierarchyResolver::new(browser.clone()),
            declarations: DeclarationAggregator::new(browser.clone()),
            data_types: DataTypeResolver::new(browser.clone()),
            browser,
        }
    }

    /// Returns the hierarchy resolver.
    pub fn hierarchy(&self) -> &TypeHierarchyResolver<S> {
        &self.hierarchy
    }

    /// Returns the declaration aggregator.
    pub fn declarations(&self) -> &DeclarationAggregator<S> {
        &self.declarations
    }

    /// Returns the data type resolver.
    pub fn data_types(&self) -> &DataTypeResolver<S> {
        &self.data_types
    }

    /// Resolves the metadata of a node.
    #[instrument(skip(self, cancel), fields(node_id = %node_id))]
    pub async fn get_metadata(
        &self,
        node_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeMetadata> {
        cancel.check()?;
        let attributes = self.browser.read_attributes(node_id).await?;

        let mut metadata = NodeMetadata {
            node_id: node_id.clone(),
            node_class: attributes.node_class,
            browse_name: attributes.browse_name.clone(),
            display_name: attributes.display_name.clone(),
            kind: NodeKind::Other,
            type_definition_id: None,
            type_hierarchy: TypeHierarchy::default(),
            declarations: DeclarationSet::new(),
            variable: None,
            method: None,
        };

        match attributes.node_class {
            NodeClass::Method => {
                metadata.kind = NodeKind::Method;
                metadata.method = Some(
                    self.data_types
                        .method_metadata(node_id, cancel)
                        .await
                        .map_err(|e| resolution_failed(node_id, e))?,
                );
                return Ok(metadata);
            }
            NodeClass::View => {
                metadata.kind = NodeKind::View;
                return Ok(metadata);
            }
            _ => {}
        }

        let type_id = match attributes.node_class {
            NodeClass::Object | NodeClass::Variable => self
                .browser
                .type_definition(node_id, cancel)
                .await
                .map_err(|e| resolution_failed(node_id, e))?
                .unwrap_or_else(|| node_id.clone()),
            _ => node_id.clone(),
        };
        if type_id != *node_id {
            if let Err(error) = self.browser.read_attributes(&type_id).await {
                if matches!(error, OpcUaError::Cancelled) {
                    return Err(error);
                }
                return Err(MetadataError::type_definition_invalid(
                    node_id.to_string(),
                    type_id.to_string(),
                )
                .into());
            }
        }

        if matches!(attributes.node_class, NodeClass::Variable | NodeClass::VariableType) {
            metadata.variable = Some(
                self.data_types
                    .variable_metadata(&attributes, cancel)
                    .await
                    .map_err(|e| resolution_failed(node_id, e))?,
            );
        }

        let hierarchy = self.hierarchy.resolve(&type_id, cancel).await?;
        if matches!(
            attributes.node_class,
            NodeClass::Object | NodeClass::Variable | NodeClass::ObjectType | NodeClass::VariableType
        ) {
            metadata.declarations = self.declarations.aggregate(&hierarchy, cancel).await?;
        }
        metadata.kind = NodeKind::classify(attributes.node_class, &hierarchy);
        metadata.type_definition_id = Some(type_id);
        metadata.type_hierarchy = hierarchy;

        info!(
            kind = ?metadata.kind,
            supertypes = metadata.type_hierarchy.len(),
            declarations = metadata.declarations.len(),
            "Metadata resolved"
        );
        Ok(metadata)
    }
}

fn resolution_failed(node_id: &NodeId, error: OpcUaError) -> OpcUaError {
    match error {
        OpcUaError::Cancelled | OpcUaError::Metadata(_) => error,
        other => MetadataError::resolution_failed(node_id.to_string(), other).into(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::{MemoryNodeService, NodeBuilder, StructureFieldDescription};
    use crate::status::StatusCode;

    fn fixture() -> Arc<MemoryNodeService> {
        let service = MemoryNodeService::new();
        let ns = service.add_namespace("urn:test:meta");

        let point = service.insert(
            NodeBuilder::data_type(NodeId::numeric(ns, 100), "Point")
                .subtype_of(&ids::STRUCTURE)
                .data_type_definition(DataTypeDefinition::Structure {
                    default_encoding_id: Some(NodeId::numeric(ns, 101)),
                    fields: vec![
                        StructureFieldDescription {
                            name: "X".into(),
                            data_type: BuiltInType::Double.node_id(),
                            value_rank: ValueRank::SCALAR,
                            is_optional: false,
                        },
                        StructureFieldDescription {
                            name: "Label".into(),
                            data_type: NodeId::numeric(ns, 102),
                            value_rank: ValueRank::SCALAR,
                            is_optional: true,
                        },
                    ],
                }),
        );
        service.insert(NodeBuilder::data_type(NodeId::numeric(ns, 102), "Label").subtype_of(&BuiltInType::String.node_id()));
        service.insert(NodeBuilder::data_type(NodeId::numeric(ns, 103), "Mode").subtype_of(&ids::ENUMERATION));

        let sensor_type = service.insert(
            NodeBuilder::object_type(NodeId::numeric(ns, 1), "SensorType").subtype_of(&ids::BASE_OBJECT_TYPE),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 2), "Position", point.clone())
                .component_of(&sensor_type)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .modelling_rule(ids::MODELLING_RULE_MANDATORY),
        );

        let sensor = service.insert(
            NodeBuilder::object(NodeId::numeric(ns, 10), "Sensor1")
                .organized_by(&NodeId::OBJECTS_FOLDER)
                .type_definition(sensor_type),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 11), "Position", point)
                .component_of(&sensor)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE),
        );

        let method = service.insert(NodeBuilder::method(NodeId::numeric(ns, 20), "Calibrate").component_of(&sensor));
        let input = MethodArgument {
            name: "Offset".into(),
            data_type: BuiltInType::Double.node_id(),
            value_rank: ValueRank::SCALAR,
            array_dimensions: Vec::new(),
            description: None,
        };
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 21), ids::INPUT_ARGUMENTS, ids::ARGUMENT)
                .property_of(&method)
                .value_rank(ValueRank::ONE_DIMENSION)
                .value(Variant::array(
                    BuiltInType::ExtensionObject,
                    vec![ScalarValue::ExtensionObject(encode_argument(&input))],
                )),
        );
        Arc::new(service)
    }

    fn resolver(service: Arc<MemoryNodeService>) -> MetadataResolver<MemoryNodeService> {
        MetadataResolver::new(Browser::new(service))
    }

    #[tokio::test]
    async fn test_data_type_tags() {
        let resolver = resolver(fixture());
        let types = resolver.data_types();
        let cancel = CancellationSignal::new();

        assert_eq!(
            types.resolve(&NodeId::numeric(0, 290), &cancel).await.unwrap(),
            DataTypeTag::BuiltIn(BuiltInType::Double)
        );
        assert_eq!(types.resolve(&ids::INTEGER, &cancel).await.unwrap(), DataTypeTag::Integer);
        assert_eq!(types.resolve(&ids::BASE_DATA_TYPE, &cancel).await.unwrap(), DataTypeTag::Any);
        assert_eq!(
            types.resolve(&NodeId::numeric(1, 103), &cancel).await.unwrap(),
            DataTypeTag::Enumeration(NodeId::numeric(1, 103))
        );

        match types.resolve(&NodeId::numeric(1, 100), &cancel).await.unwrap() {
            DataTypeTag::Structure(def) => {
                assert_eq!(def.fields.len(), 2);
                assert_eq!(def.fields[1].data_type, DataTypeTag::BuiltIn(BuiltInType::String));
                assert!(def.fields[1].is_optional);
                assert_eq!(def.default_encoding_id, Some(NodeId::numeric(1, 101)));
            }
            other => panic!("unexpected tag {}", other),
        }
    }

    #[tokio::test]
    async fn test_object_metadata() {
        let resolver = resolver(fixture());
        let metadata = resolver.get_metadata(&NodeId::numeric(1, 10), &CancellationSignal::new()).await.unwrap();
        assert_eq!(metadata.kind, NodeKind::Object);
        assert_eq!(metadata.type_definition_id, Some(NodeId::numeric(1, 1)));
        assert!(metadata.type_hierarchy.is_empty());
        assert_eq!(metadata.declarations.len(), 1);
        assert!(metadata.declarations.get(".1:Position").is_some());
    }

    #[tokio::test]
    async fn test_variable_metadata() {
        let resolver = resolver(fixture());
        let metadata = resolver.get_metadata(&NodeId::numeric(1, 11), &CancellationSignal::new()).await.unwrap();
        assert_eq!(metadata.kind, NodeKind::DataVariable);
        let variable = metadata.variable.unwrap();
        assert_eq!(variable.data_type_id, NodeId::numeric(1, 100));
        assert!(matches!(variable.data_type, DataTypeTag::Structure(_)));
    }

    #[tokio::test]
    async fn test_method_metadata() {
        let resolver = resolver(fixture());
        let metadata = resolver.get_metadata(&NodeId::numeric(1, 20), &CancellationSignal::new()).await.unwrap();
        assert_eq!(metadata.kind, NodeKind::Method);
        let method = metadata.method.unwrap();
        assert_eq!(method.input_arguments.len(), 1);
        assert_eq!(method.input_arguments[0].name, "Offset");
        assert!(method.output_arguments.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_type_definition() {
        let service = fixture();
        service.fail_read(&NodeId::numeric(1, 1));
        let result = resolver(service).get_metadata(&NodeId::numeric(1, 10), &CancellationSignal::new()).await;
        let error = result.unwrap_err();
        assert!(matches!(error, OpcUaError::Metadata(MetadataError::TypeDefinitionInvalid { .. })));
        assert_eq!(error.status_code(), StatusCode::BAD_TYPE_DEFINITION_INVALID);
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let resolver = resolver(fixture());
        let result = resolver.get_metadata(&NodeId::numeric(1, 999), &CancellationSignal::new()).await;
        assert_eq!(result.unwrap_err().status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn test_decode_arguments_rejects_non_structures() {
        let value = Variant::array(BuiltInType::Int32, vec![ScalarValue::Int32(1)]);
        assert!(decode_arguments(&value).is_err());
        assert!(decode_arguments(&Variant::Empty).unwrap().is_empty());
    }
}
