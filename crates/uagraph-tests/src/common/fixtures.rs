// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Canned address spaces with known shapes.
//!
//! | Fixture | Shape | Leaves |
//! |---------|-------|--------|
//! | [`AddressSpaceFixtures::sensors`] | `Sensors/SensorNN/Value` | one per sensor |
//! | [`AddressSpaceFixtures::production`] | `Production/LineN/MachineN/...` | 43 per line |
//! | [`AddressSpaceFixtures::test_data`] | `Data/Static/{Scalar,Array}/...` | one per built-in type |

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use uagraph_core::{
    ids, BuiltInType, GenericValue, MemoryNodeService, NodeId, PublishedNode, PublishedNodesEntry,
    ScalarValue,
};

use super::builders::AddressSpaceBuilder;

/// Namespace of [`AddressSpaceFixtures::sensors`] and [`AddressSpaceFixtures::production`].
pub const PLANT_NAMESPACE: &str = "http://test.org/UA/Plant/";

/// Namespace of [`AddressSpaceFixtures::test_data`].
pub const DATA_NAMESPACE: &str = "http://test.org/UA/Data/";

/// Leaves under one production line: 3 line variables and 4 machines of 10.
pub const LEAVES_PER_LINE: usize = 3 + MACHINES_PER_LINE * LEAVES_PER_MACHINE;

/// Machines under one production line.
pub const MACHINES_PER_LINE: usize = 4;

/// Leaves of one machine, nested properties included.
pub const LEAVES_PER_MACHINE: usize = 10;

// =============================================================================
// Address Spaces
// =============================================================================

/// `Objects/Sensors/SensorNN/Value`.
#[derive(Debug, Clone)]
pub struct SensorFixture {
    /// The address space.
    pub service: Arc<MemoryNodeService>,
    /// The `Sensors` folder.
    pub root: NodeId,
    /// `SensorType`.
    pub sensor_type: NodeId,
    /// Sensor objects in creation order.
    pub sensors: Vec<NodeId>,
    /// `Value` variables in creation order.
    pub values: Vec<NodeId>,
}

impl SensorFixture {
    /// An entry expanding the `Sensors` folder.
    pub fn root_entry(&self) -> PublishedNodesEntry {
        PublishedNodesEntry::new(vec![PublishedNode::from_id(self.root.to_string())])
    }
}

/// `Objects/Production/LineN/MachineN/...` with a three-level type hierarchy.
#[derive(Debug, Clone)]
pub struct ProductionFixture {
    /// The address space.
    pub service: Arc<MemoryNodeService>,
    /// The `Production` folder.
    pub root: NodeId,
    /// Line objects.
    pub lines: Vec<NodeId>,
    /// Machine objects, line by line.
    pub machines: Vec<NodeId>,
    /// `DeviceType`, subtype of BaseObjectType.
    pub device_type: NodeId,
    /// `MachineType`, subtype of `DeviceType`.
    pub machine_type: NodeId,
    /// `CncMachineType`, subtype of `MachineType`. Used by the first machine of every line.
    pub cnc_machine_type: NodeId,
    /// `LineType`, subtype of BaseObjectType.
    pub line_type: NodeId,
    /// `DeviceType.Speed` (Optional, Float).
    pub device_speed: NodeId,
    /// `MachineType.Speed` (Mandatory, Double), overriding `DeviceType.Speed`.
    pub machine_speed: NodeId,
}

impl ProductionFixture {
    /// An entry expanding the `Production` folder.
    pub fn root_entry(&self) -> PublishedNodesEntry {
        PublishedNodesEntry::new(vec![PublishedNode::from_id(self.root.to_string())])
    }

    /// Total number of leaves below the root.
    pub fn leaf_count(&self) -> usize {
        self.lines.len() * LEAVES_PER_LINE
    }
}

/// `Objects/Data/Static/Scalar/*Value` and `Objects/Data/Static/Array/*Value`.
#[derive(Debug, Clone)]
pub struct DataFixture {
    /// The address space.
    pub service: Arc<MemoryNodeService>,
    /// Namespace index of [`DATA_NAMESPACE`].
    pub namespace: u16,
    /// `Data`.
    pub data: NodeId,
    /// `Data/Static`.
    pub static_folder: NodeId,
    /// `Data/Static/Scalar`.
    pub scalar: NodeId,
    /// `Data/Static/Array`.
    pub array: NodeId,
    /// Scalar variables by built-in type, in creation order.
    pub scalars: Vec<(BuiltInType, NodeId)>,
    /// `Array/DoubleValue`, fixed to 5 elements.
    pub double_array: NodeId,
    /// `Array/Int32Value`, unbounded.
    pub int32_array: NodeId,
    /// `Scalar/ReadOnlyValue`, a read-only String.
    pub read_only: NodeId,
}

impl DataFixture {
    /// Returns the scalar variable of `data_type`.
    pub fn scalar_of(&self, data_type: BuiltInType) -> NodeId {
        self.scalars
            .iter()
            .find(|(t, _)| *t == data_type)
            .map(|(_, id)| id.clone())
            .unwrap_or_else(|| panic!("no scalar variable of type {}", data_type))
    }

    /// Browse path segments of a scalar variable, starting at `Objects`.
    pub fn scalar_path(&self, name: &str) -> Vec<String> {
        vec![
            "Objects".to_string(),
            format!("{}#Data", DATA_NAMESPACE),
            format!("{}#Static", DATA_NAMESPACE),
            format!("{}#Scalar", DATA_NAMESPACE),
            format!("{}#{}", DATA_NAMESPACE, name),
        ]
    }
}

/// Pre-built address spaces.
pub struct AddressSpaceFixtures;

impl AddressSpaceFixtures {
    /// A folder of `count` sensors, each with a single `Value` leaf.
    pub fn sensors(count: usize) -> SensorFixture {
        let mut space = AddressSpaceBuilder::new(PLANT_NAMESPACE);
        let sensor_type = space.object_type("SensorType", &ids::BASE_OBJECT_TYPE);
        let root = space.folder(&NodeId::OBJECTS_FOLDER, "Sensors");

        let mut sensors = Vec::with_capacity(count);
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let sensor = space.object(&root, &format!("Sensor{:02}", i), &sensor_type);
            values.push(space.variable_with_value(
                &sensor,
                "Value",
                BuiltInType::Double,
                ScalarValue::Double(i as f64),
            ));
            sensors.push(sensor);
        }

        SensorFixture {
            service: space.build(),
            root,
            sensor_type,
            sensors,
            values,
        }
    }

    /// `lines` production lines of [`MACHINES_PER_LINE`] machines each.
    pub fn production(lines: usize) -> ProductionFixture {
        let mut space = AddressSpaceBuilder::new(PLANT_NAMESPACE);

        // Types
        let device_type = space.object_type("DeviceType", &ids::BASE_OBJECT_TYPE);
        space.declare_property(&device_type, "SerialNumber", BuiltInType::String, ids::MODELLING_RULE_MANDATORY);
        let device_speed =
            space.declare_variable(&device_type, "Speed", BuiltInType::Float, ids::MODELLING_RULE_OPTIONAL);
        space.declare_variable(&device_type, "Power", BuiltInType::Double, ids::MODELLING_RULE_OPTIONAL);

        let machine_type = space.object_type("MachineType", &device_type);
        let machine_speed =
            space.declare_variable(&machine_type, "Speed", BuiltInType::Double, ids::MODELLING_RULE_MANDATORY);
        let temperature =
            space.declare_variable(&machine_type, "Temperature", BuiltInType::Double, ids::MODELLING_RULE_MANDATORY);
        space.declare_property(&temperature, "EURange", BuiltInType::String, ids::MODELLING_RULE_OPTIONAL);
        space.declare_method(&machine_type, "Reset", ids::MODELLING_RULE_OPTIONAL);

        let cnc_machine_type = space.object_type("CncMachineType", &machine_type);
        space.declare_variable(&cnc_machine_type, "SpindleLoad", BuiltInType::Double, ids::MODELLING_RULE_OPTIONAL);

        let line_type = space.object_type("LineType", &ids::BASE_OBJECT_TYPE);
        space.declare_variable(&line_type, "Throughput", BuiltInType::Double, ids::MODELLING_RULE_MANDATORY);

        // Instances
        let root = space.folder(&NodeId::OBJECTS_FOLDER, "Production");
        let mut line_ids = Vec::with_capacity(lines);
        let mut machines = Vec::with_capacity(lines * MACHINES_PER_LINE);
        for l in 0..lines {
            let line = space.object(&root, &format!("Line{}", l), &line_type);
            space.variable(&line, "Throughput", BuiltInType::Double);
            space.variable(&line, "State", BuiltInType::Int32);
            space.variable(&line, "Mode", BuiltInType::String);

            for m in 0..MACHINES_PER_LINE {
                let type_id = if m == 0 { &cnc_machine_type } else { &machine_type };
                let machine = space.object(&line, &format!("Machine{}", m), type_id);
                space.property(&machine, "SerialNumber", BuiltInType::String);
                space.variable(&machine, "Speed", BuiltInType::Double);
                let temperature = space.variable(&machine, "Temperature", BuiltInType::Double);
                space.property(&temperature, "EURange", BuiltInType::String);
                space.variable(&machine, "Pressure", BuiltInType::Double);
                space.variable(&machine, "Power", BuiltInType::Double);
                space.variable(&machine, "State", BuiltInType::Int32);
                space.variable(&machine, "Mode", BuiltInType::String);
                space.variable(&machine, "Counter", BuiltInType::UInt32);
                space.variable(&machine, "Alarm", BuiltInType::Boolean);
                space.method(&machine, "Reset");
                machines.push(machine);
            }
            line_ids.push(line);
        }

        ProductionFixture {
            service: space.build(),
            root,
            lines: line_ids,
            machines,
            device_type,
            machine_type,
            cnc_machine_type,
            line_type,
            device_speed,
            machine_speed,
        }
    }

    /// One variable per commonly used built-in type, plus array variables.
    pub fn test_data() -> DataFixture {
        let mut space = AddressSpaceBuilder::new(DATA_NAMESPACE);
        let namespace = space.namespace();
        let data = space.folder(&NodeId::OBJECTS_FOLDER, "Data");
        let static_folder = space.folder(&data, "Static");
        let scalar = space.folder(&static_folder, "Scalar");
        let array = space.folder(&static_folder, "Array");

        let mut scalars = Vec::new();
        for (data_type, value) in ValueFixtures::scalar_defaults() {
            let name = format!("{}Value", data_type);
            let id = space.variable_with_value(&scalar, &name, data_type, value);
            scalars.push((data_type, id));
        }

        let read_only = space.property(&scalar, "ReadOnlyValue", BuiltInType::String);
        let double_array = space.array_variable(&array, "DoubleValue", BuiltInType::Double, 5);
        let int32_array = space.array_variable(&array, "Int32Value", BuiltInType::Int32, 0);

        DataFixture {
            service: space.build(),
            namespace,
            data,
            static_folder,
            scalar,
            array,
            scalars,
            double_array,
            int32_array,
            read_only,
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// Pre-built values.
pub struct ValueFixtures;

impl ValueFixtures {
    /// Initial values of the [`DataFixture`] scalar variables.
    pub fn scalar_defaults() -> Vec<(BuiltInType, ScalarValue)> {
        vec![
            (BuiltInType::Boolean, ScalarValue::Boolean(false)),
            (BuiltInType::SByte, ScalarValue::SByte(0)),
            (BuiltInType::Byte, ScalarValue::Byte(0)),
            (BuiltInType::Int16, ScalarValue::Int16(0)),
            (BuiltInType::UInt16, ScalarValue::UInt16(0)),
            (BuiltInType::Int32, ScalarValue::Int32(0)),
            (BuiltInType::UInt32, ScalarValue::UInt32(0)),
            (BuiltInType::Int64, ScalarValue::Int64(0)),
            (BuiltInType::UInt64, ScalarValue::UInt64(0)),
            (BuiltInType::Float, ScalarValue::Float(0.0)),
            (BuiltInType::Double, ScalarValue::Double(0.0)),
            (BuiltInType::String, ScalarValue::String(String::new())),
            (BuiltInType::DateTime, ScalarValue::DateTime(Self::timestamp())),
            (BuiltInType::Guid, ScalarValue::Guid(Uuid::nil())),
            (BuiltInType::ByteString, ScalarValue::ByteString(Vec::new())),
        ]
    }

    /// A non-default value of every scalar type in [`Self::scalar_defaults`].
    pub fn samples() -> Vec<(BuiltInType, GenericValue)> {
        vec![
            (BuiltInType::Boolean, GenericValue::Boolean(true)),
            (BuiltInType::SByte, GenericValue::SByte(-12)),
            (BuiltInType::Byte, GenericValue::Byte(200)),
            (BuiltInType::Int16, GenericValue::Int16(-3000)),
            (BuiltInType::UInt16, GenericValue::UInt16(60000)),
            (BuiltInType::Int32, GenericValue::Int32(-123_456)),
            (BuiltInType::UInt32, GenericValue::UInt32(4_000_000_000)),
            (BuiltInType::Int64, GenericValue::Int64(-9_000_000_000)),
            (BuiltInType::UInt64, GenericValue::UInt64(18_000_000_000_000_000_000)),
            (BuiltInType::Float, GenericValue::Float(2.5)),
            (BuiltInType::Double, GenericValue::Double(-273.15)),
            (BuiltInType::String, GenericValue::String("line-7".into())),
            (BuiltInType::DateTime, GenericValue::DateTime(Self::timestamp())),
            (BuiltInType::Guid, GenericValue::Guid(Self::guid())),
            (BuiltInType::ByteString, GenericValue::ByteString(vec![0xde, 0xad, 0xbe, 0xef])),
        ]
    }

    /// A fixed timestamp.
    pub fn timestamp() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    /// A fixed GUID.
    pub fn guid() -> Uuid {
        Uuid::from_u128(0x72962b91_fa75_4ae6_8d28_b404dc7daf63)
    }

    /// A one-dimensional Double array of `len` elements.
    pub fn double_array(len: usize) -> GenericValue {
        GenericValue::Array((0..len).map(|i| GenericValue::Double(i as f64 * 0.5)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_fixture_shape() {
        let fixture = AddressSpaceFixtures::sensors(24);
        assert_eq!(fixture.sensors.len(), 24);
        assert_eq!(fixture.values.len(), 24);
        assert!(fixture.service.contains(&fixture.root));
    }

    #[test]
    fn test_production_leaf_count() {
        let fixture = AddressSpaceFixtures::production(6);
        assert_eq!(fixture.leaf_count(), 258);
        assert_eq!(fixture.machines.len(), 24);
    }

    #[test]
    fn test_data_fixture_lookup() {
        let fixture = AddressSpaceFixtures::test_data();
        assert_eq!(fixture.namespace, 1);
        assert!(fixture.service.contains(&fixture.scalar_of(BuiltInType::Boolean)));
        assert_eq!(fixture.scalar_path("BooleanValue").len(), 5);
        assert_eq!(ValueFixtures::samples().len(), ValueFixtures::scalar_defaults().len());
    }
}
