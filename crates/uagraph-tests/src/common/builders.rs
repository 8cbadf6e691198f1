// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! [`AddressSpaceBuilder`] wraps a [`MemoryNodeService`] and hands out
//! numeric node ids in one custom namespace, so fixtures only name nodes
//! and their parents.
//!
//! ```rust,ignore
//! let mut space = AddressSpaceBuilder::new("urn:test:line");
//! let line = space.folder(&NodeId::OBJECTS_FOLDER, "Line");
//! let speed = space.variable(&line, "Speed", BuiltInType::Double);
//! let service = space.build();
//! ```

use std::sync::Arc;

use uagraph_core::{
    ids, AccessLevel, BuiltInType, MemoryNodeService, NodeBuilder, NodeId, ScalarValue, ValueRank,
    Variant,
};

/// First id handed out by [`AddressSpaceBuilder`].
pub const FIRST_NODE_ID: u32 = 1000;

// =============================================================================
// AddressSpaceBuilder
// =============================================================================

/// Builds a test address space on top of the standard namespace.
#[derive(Debug)]
pub struct AddressSpaceBuilder {
    service: MemoryNodeService,
    namespace: u16,
    next_id: u32,
}

impl AddressSpaceBuilder {
    /// Creates a builder whose nodes live in `uri`.
    pub fn new(uri: &str) -> Self {
        let service = MemoryNodeService::new();
        let namespace = service.add_namespace(uri);
        Self {
            service,
            namespace,
            next_id: FIRST_NODE_ID,
        }
    }

    /// Limits browse pages to `page_size` references.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.service = self.service.with_page_size(page_size);
        self
    }

    /// Returns the namespace index of built nodes.
    pub fn namespace(&self) -> u16 {
        self.namespace
    }

    /// Returns the service being built.
    pub fn service(&self) -> &MemoryNodeService {
        &self.service
    }

    fn next_node_id(&mut self) -> NodeId {
        let id = NodeId::numeric(self.namespace, self.next_id);
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Instances
    // =========================================================================

    /// Adds a FolderType object organized by `parent`.
    pub fn folder(&mut self, parent: &NodeId, name: &str) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::object(id, name)
                .organized_by(parent)
                .type_definition(ids::FOLDER_TYPE),
        )
    }

    /// Adds an object of `type_id` as a component of `parent`.
    pub fn object(&mut self, parent: &NodeId, name: &str, type_id: &NodeId) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::object(id, name)
                .component_of(parent)
                .type_definition(type_id.clone()),
        )
    }

    /// Adds a writable scalar data variable as a component of `parent`.
    pub fn variable(&mut self, parent: &NodeId, name: &str, data_type: BuiltInType) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::variable(id, name, data_type.node_id())
                .component_of(parent)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .value_rank(ValueRank::SCALAR)
                .access_level(AccessLevel::READ_WRITE),
        )
    }

    /// Adds a writable scalar data variable holding `value`.
    pub fn variable_with_value(
        &mut self,
        parent: &NodeId,
        name: &str,
        data_type: BuiltInType,
        value: ScalarValue,
    ) -> NodeId {
        let id = self.variable(parent, name, data_type);
        self.service.set_value(&id, Variant::scalar(value));
        id
    }

    /// Adds a writable one-dimensional array variable with fixed `length`
    /// (0 for unbounded).
    pub fn array_variable(
        &mut self,
        parent: &NodeId,
        name: &str,
        data_type: BuiltInType,
        length: u32,
    ) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::variable(id, name, data_type.node_id())
                .component_of(parent)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .value_rank(ValueRank::ONE_DIMENSION)
                .array_dimensions(vec![length])
                .access_level(AccessLevel::READ_WRITE),
        )
    }

    /// Adds a read-only property of `parent`.
    pub fn property(&mut self, parent: &NodeId, name: &str, data_type: BuiltInType) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::variable(id, name, data_type.node_id())
                .property_of(parent)
                .type_definition(ids::PROPERTY_TYPE),
        )
    }

    /// Adds a method as a component of `parent`.
    pub fn method(&mut self, parent: &NodeId, name: &str) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(NodeBuilder::method(id, name).component_of(parent))
    }

    // =========================================================================
    // Types
    // =========================================================================

    /// Adds an object type below `supertype`.
    pub fn object_type(&mut self, name: &str, supertype: &NodeId) -> NodeId {
        let id = self.next_node_id();
        self.service
            .insert(NodeBuilder::object_type(id, name).subtype_of(supertype))
    }

    /// Declares a data variable on a type with a modelling rule.
    pub fn declare_variable(
        &mut self,
        owner: &NodeId,
        name: &str,
        data_type: BuiltInType,
        rule: NodeId,
    ) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::variable(id, name, data_type.node_id())
                .component_of(owner)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .modelling_rule(rule),
        )
    }

    /// Declares a property on a type (or declaration) with a modelling rule.
    pub fn declare_property(
        &mut self,
        owner: &NodeId,
        name: &str,
        data_type: BuiltInType,
        rule: NodeId,
    ) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::variable(id, name, data_type.node_id())
                .property_of(owner)
                .type_definition(ids::PROPERTY_TYPE)
                .modelling_rule(rule),
        )
    }

    /// Declares a method on a type with a modelling rule.
    pub fn declare_method(&mut self, owner: &NodeId, name: &str, rule: NodeId) -> NodeId {
        let id = self.next_node_id();
        self.service.insert(
            NodeBuilder::method(id, name)
                .component_of(owner)
                .modelling_rule(rule),
        )
    }

    /// Inserts a hand-built node.
    pub fn insert(&mut self, builder: NodeBuilder) -> NodeId {
        self.service.insert(builder)
    }

    /// Finishes the address space.
    pub fn build(self) -> Arc<MemoryNodeService> {
        Arc::new(self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_allocates_ids() {
        let mut space = AddressSpaceBuilder::new("urn:test:builder");
        let folder = space.folder(&NodeId::OBJECTS_FOLDER, "Folder");
        let speed = space.variable(&folder, "Speed", BuiltInType::Double);

        assert_eq!(space.namespace(), 1);
        assert_eq!(folder, NodeId::numeric(1, FIRST_NODE_ID));
        assert_eq!(speed, NodeId::numeric(1, FIRST_NODE_ID + 1));

        let service = space.build();
        assert!(service.contains(&folder));
        assert!(service.contains(&speed));
    }

    #[test]
    fn test_variable_with_value() {
        let mut space = AddressSpaceBuilder::new("urn:test:builder");
        let id = space.variable_with_value(
            &NodeId::OBJECTS_FOLDER,
            "Flag",
            BuiltInType::Boolean,
            ScalarValue::Boolean(true),
        );
        assert_eq!(
            space.service().value(&id),
            Some(Variant::scalar(ScalarValue::Boolean(true)))
        );
    }
}
