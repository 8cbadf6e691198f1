// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The subset of the standard namespace every in-memory address space starts
//! with: root folders, the reference type tree, base object/variable types,
//! modelling rules and the built-in data type tree.

use crate::service::memory::{MemoryNodeService, NodeBuilder};
use crate::service::{AccessLevel, DataTypeDefinition, StructureFieldDescription};
use crate::types::{ids, NodeId};
use crate::value::ValueRank;
use crate::variant::BuiltInType;

const OBJECT_TYPES_FOLDER: NodeId = NodeId::numeric(0, 88);
const VARIABLE_TYPES_FOLDER: NodeId = NodeId::numeric(0, 89);
const DATA_TYPES_FOLDER: NodeId = NodeId::numeric(0, 90);
const REFERENCE_TYPES_FOLDER: NodeId = NodeId::numeric(0, 91);
const SERVER_TYPE: NodeId = NodeId::numeric(0, 2004);
const MODELLING_RULE_TYPE: NodeId = NodeId::numeric(0, 77);
const HAS_ORDERED_COMPONENT: NodeId = NodeId::numeric(0, 49);
const DURATION: NodeId = NodeId::numeric(0, 290);
const UTC_TIME: NodeId = NodeId::numeric(0, 294);
const ARGUMENT_ENCODING_BINARY: NodeId = NodeId::numeric(0, 298);

/// Populates namespace 0.
pub(crate) fn bootstrap(service: &MemoryNodeService) {
    folders(service);
    reference_types(service);
    object_and_variable_types(service);
    modelling_rules(service);
    data_types(service);
    server_object(service);
}

fn folders(service: &MemoryNodeService) {
    service.insert(NodeBuilder::object(NodeId::ROOT_FOLDER, "Root").type_definition(ids::FOLDER_TYPE));
    for (id, name, parent) in [
        (NodeId::OBJECTS_FOLDER, "Objects", NodeId::ROOT_FOLDER),
        (NodeId::TYPES_FOLDER, "Types", NodeId::ROOT_FOLDER),
        (NodeId::VIEWS_FOLDER, "Views", NodeId::ROOT_FOLDER),
        (OBJECT_TYPES_FOLDER, "ObjectTypes", NodeId::TYPES_FOLDER),
        (VARIABLE_TYPES_FOLDER, "VariableTypes", NodeId::TYPES_FOLDER),
        (DATA_TYPES_FOLDER, "DataTypes", NodeId::TYPES_FOLDER),
        (REFERENCE_TYPES_FOLDER, "ReferenceTypes", NodeId::TYPES_FOLDER),
    ] {
        service.insert(
            NodeBuilder::object(id, name)
                .organized_by(&parent)
                .type_definition(ids::FOLDER_TYPE),
        );
    }
}

fn reference_types(service: &MemoryNodeService) {
    service.insert(
        NodeBuilder::reference_type(ids::REFERENCES, "References")
            .is_abstract(true)
            .organized_by(&REFERENCE_TYPES_FOLDER),
    );
    let tree = [
        (ids::HIERARCHICAL_REFERENCES, "HierarchicalReferences", ids::REFERENCES, true),
        (ids::NON_HIERARCHICAL_REFERENCES, "NonHierarchicalReferences", ids::REFERENCES, true),
        (ids::HAS_CHILD, "HasChild", ids::HIERARCHICAL_REFERENCES, true),
        (ids::ORGANIZES, "Organizes", ids::HIERARCHICAL_REFERENCES, false),
        (ids::HAS_EVENT_SOURCE, "HasEventSource", ids::HIERARCHICAL_REFERENCES, false),
        (ids::HAS_NOTIFIER, "HasNotifier", ids::HAS_EVENT_SOURCE, false),
        (ids::AGGREGATES, "Aggregates", ids::HAS_CHILD, true),
        (ids::HAS_SUBTYPE, "HasSubtype", ids::HAS_CHILD, false),
        (ids::HAS_COMPONENT, "HasComponent", ids::AGGREGATES, false),
        (ids::HAS_PROPERTY, "HasProperty", ids::AGGREGATES, false),
        (HAS_ORDERED_COMPONENT, "HasOrderedComponent", ids::HAS_COMPONENT, false),
        (ids::HAS_TYPE_DEFINITION, "HasTypeDefinition", ids::NON_HIERARCHICAL_REFERENCES, false),
        (ids::HAS_MODELLING_RULE, "HasModellingRule", ids::NON_HIERARCHICAL_REFERENCES, false),
        (ids::HAS_ENCODING, "HasEncoding", ids::NON_HIERARCHICAL_REFERENCES, false),
        (ids::GENERATES_EVENT, "GeneratesEvent", ids::NON_HIERARCHICAL_REFERENCES, false),
        (ids::HAS_INTERFACE, "HasInterface", ids::NON_HIERARCHICAL_REFERENCES, false),
    ];
    for (id, name, parent, is_abstract) in tree {
        service.insert(
            NodeBuilder::reference_type(id, name)
                .subtype_of(&parent)
                .is_abstract(is_abstract),
        );
    }
}

fn object_and_variable_types(service: &MemoryNodeService) {
    service.insert(
        NodeBuilder::object_type(ids::BASE_OBJECT_TYPE, "BaseObjectType")
            .organized_by(&OBJECT_TYPES_FOLDER),
    );
    for (id, name, is_abstract) in [
        (ids::FOLDER_TYPE, "FolderType", false),
        (ids::BASE_EVENT_TYPE, "BaseEventType", true),
        (ids::BASE_INTERFACE_TYPE, "BaseInterfaceType", true),
        (SERVER_TYPE, "ServerType", false),
        (MODELLING_RULE_TYPE, "ModellingRuleType", false),
    ] {
        service.insert(
            NodeBuilder::object_type(id, name)
                .subtype_of(&ids::BASE_OBJECT_TYPE)
                .is_abstract(is_abstract),
        );
    }

    service.insert(
        NodeBuilder::variable_type(ids::BASE_VARIABLE_TYPE, "BaseVariableType", ids::BASE_DATA_TYPE)
            .is_abstract(true)
            .organized_by(&VARIABLE_TYPES_FOLDER),
    );
    for (id, name) in [
        (ids::BASE_DATA_VARIABLE_TYPE, "BaseDataVariableType"),
        (ids::PROPERTY_TYPE, "PropertyType"),
    ] {
        service.insert(
            NodeBuilder::variable_type(id, name, ids::BASE_DATA_TYPE)
                .subtype_of(&ids::BASE_VARIABLE_TYPE),
        );
    }
}

fn modelling_rules(service: &MemoryNodeService) {
    for (id, name) in [
        (ids::MODELLING_RULE_MANDATORY, "Mandatory"),
        (ids::MODELLING_RULE_OPTIONAL, "Optional"),
        (ids::MODELLING_RULE_EXPOSES_ITS_ARRAY, "ExposesItsArray"),
        (ids::MODELLING_RULE_OPTIONAL_PLACEHOLDER, "OptionalPlaceholder"),
        (ids::MODELLING_RULE_MANDATORY_PLACEHOLDER, "MandatoryPlaceholder"),
    ] {
        service.insert(NodeBuilder::object(id, name).type_definition(MODELLING_RULE_TYPE));
    }
}

fn data_types(service: &MemoryNodeService) {
    service.insert(
        NodeBuilder::data_type(ids::BASE_DATA_TYPE, "BaseDataType")
            .is_abstract(true)
            .organized_by(&DATA_TYPES_FOLDER),
    );

    let abstract_types = [
        (ids::NUMBER, "Number", ids::BASE_DATA_TYPE),
        (ids::INTEGER, "Integer", ids::NUMBER),
        (ids::UINTEGER, "UInteger", ids::NUMBER),
        (ids::STRUCTURE, "Structure", ids::BASE_DATA_TYPE),
        (ids::ENUMERATION, "Enumeration", ids::BASE_DATA_TYPE),
    ];
    for (id, name, parent) in abstract_types {
        service.insert(
            NodeBuilder::data_type(id, name)
                .subtype_of(&parent)
                .is_abstract(true),
        );
    }

    for built_in in BuiltInType::ALL {
        if built_in == BuiltInType::ExtensionObject {
            continue;
        }
        let parent = if built_in.is_signed_integer() {
            ids::INTEGER
        } else if built_in.is_unsigned_integer() {
            ids::UINTEGER
        } else if built_in.is_numeric() {
            ids::NUMBER
        } else {
            ids::BASE_DATA_TYPE
        };
        service.insert(NodeBuilder::data_type(built_in.node_id(), built_in.name()).subtype_of(&parent));
    }

    service.insert(NodeBuilder::data_type(DURATION, "Duration").subtype_of(&BuiltInType::Double.node_id()));
    service.insert(NodeBuilder::data_type(UTC_TIME, "UtcTime").subtype_of(&BuiltInType::DateTime.node_id()));

    let argument_fields = [
        ("Name", BuiltInType::String, ValueRank::SCALAR),
        ("DataType", BuiltInType::NodeId, ValueRank::SCALAR),
        ("ValueRank", BuiltInType::Int32, ValueRank::SCALAR),
        ("ArrayDimensions", BuiltInType::UInt32, ValueRank::ONE_DIMENSION),
        ("Description", BuiltInType::LocalizedText, ValueRank::SCALAR),
    ];
    service.insert(
        NodeBuilder::data_type(ids::ARGUMENT, "Argument")
            .subtype_of(&ids::STRUCTURE)
            .data_type_definition(DataTypeDefinition::Structure {
                default_encoding_id: Some(ARGUMENT_ENCODING_BINARY),
                fields: argument_fields
                    .iter()
                    .map(|(name, data_type, value_rank)| StructureFieldDescription {
                        name: name.to_string(),
                        data_type: data_type.node_id(),
                        value_rank: *value_rank,
                        is_optional: false,
                    })
                    .collect(),
            }),
    );
}

fn server_object(service: &MemoryNodeService) {
    service.insert(
        NodeBuilder::object(NodeId::SERVER, "Server")
            .organized_by(&NodeId::OBJECTS_FOLDER)
            .type_definition(SERVER_TYPE),
    );
    service.insert(
        NodeBuilder::variable(ids::SERVER_NAMESPACE_ARRAY, "NamespaceArray", BuiltInType::String.node_id())
            .property_of(&NodeId::SERVER)
            .value_rank(ValueRank::ONE_DIMENSION)
            .access_level(AccessLevel::CURRENT_READ),
    );
}

