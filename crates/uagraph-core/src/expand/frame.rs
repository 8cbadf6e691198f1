// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse frames and the per-object groups built from them.

use std::collections::HashSet;

use crate::metadata::MethodMetadata;
use crate::service::{NodeAttributes, ReferenceDescription};
use crate::types::{LocalizedText, NamespaceFormat, NamespaceTable, NodeClass, NodeId, QualifiedName};

use super::model::{PublishedNode, PublishedNodesEntry};

/// A node reached during the walk, with the browse names leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub node_id: NodeId,
    pub node_class: NodeClass,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub type_definition: Option<NodeId>,
    /// Browse names from the group root (exclusive) to this node.
    pub names: Vec<QualifiedName>,
}

impl Frame {
    pub fn root(attributes: &NodeAttributes, type_definition: Option<NodeId>) -> Self {
        Self {
            node_id: attributes.node_id.clone(),
            node_class: attributes.node_class,
            browse_name: attributes.browse_name.clone(),
            display_name: attributes.display_name.clone(),
            type_definition,
            names: Vec::new(),
        }
    }

    pub fn child(&self, node_id: NodeId, reference: &ReferenceDescription, table: &NamespaceTable) -> Self {
        let mut names = self.names.clone();
        names.push(reference.browse_name.clone());
        Self {
            node_id,
            node_class: reference.node_class,
            browse_name: reference.browse_name.clone(),
            display_name: reference.display_name.clone(),
            type_definition: reference
                .type_definition
                .as_ref()
                .and_then(|t| t.to_node_id(table)),
            names,
        }
    }

    /// `/1:Boiler/1:Drum`, empty for the root.
    pub fn browse_path(&self) -> String {
        self.names.iter().map(|n| format!("/{}", n)).collect()
    }

    /// Dot-joined browse names from the root, `Default` for the root itself.
    pub fn data_set_name(&self) -> String {
        if self.names.is_empty() {
            return "Default".to_string();
        }
        self.names
            .iter()
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// A publishable leaf below an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Leaf {
    pub node_id: NodeId,
    pub browse_name: QualifiedName,
    pub type_definition: Option<NodeId>,
    /// Path relative to the owning object.
    pub path: String,
    pub method: Option<MethodMetadata>,
}

/// An object and the leaves collected under it.
#[derive(Debug, Clone)]
pub(crate) struct ObjectGroup {
    pub frame: Frame,
    pub leaves: Vec<Leaf>,
    known: HashSet<NodeId>,
}

impl ObjectGroup {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            leaves: Vec::new(),
            known: HashSet::new(),
        }
    }

    /// Adds a leaf; returns `false` if the node was already present.
    pub fn add(&mut self, leaf: Leaf) -> bool {
        if leaf.node_id.is_null() || !self.known.insert(leaf.node_id.clone()) {
            return false;
        }
        self.leaves.push(leaf);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn writer_id(&self, template: &PublishedNode) -> String {
        let mut id = template.data_set_field_id.clone().unwrap_or_default();
        id.push_str(&self.frame.browse_path());
        id
    }

    /// Converts the leaves to published nodes.
    ///
    /// Field ids are `<template id>[<object path>]<leaf path>`, made unique
    /// within `ids` by appending `_1`, `_2`, ...
    pub fn published_nodes(
        &self,
        template: &PublishedNode,
        table: &NamespaceTable,
        format: NamespaceFormat,
        ids: &mut HashSet<String>,
        long_ids: bool,
    ) -> Vec<PublishedNode> {
        let prefix = template.data_set_field_id.clone().unwrap_or_default();
        let object_path = if long_ids {
            self.frame.browse_path()
        } else {
            String::new()
        };
        self.leaves
            .iter()
            .map(|leaf| PublishedNode {
                id: Some(leaf.node_id.format(table, format)),
                browse_path: None,
                data_set_field_id: Some(unique_id(ids, format!("{}{}{}", prefix, object_path, leaf.path))),
                display_name: Some(leaf.browse_name.name.clone()),
                type_definition_id: leaf
                    .type_definition
                    .as_ref()
                    .map(|t| t.format(table, format)),
                method_metadata: leaf.method.clone(),
            })
            .collect()
    }

    /// Builds the writer entry for this object.
    pub fn to_entry(
        &self,
        base: &PublishedNodesEntry,
        template: &PublishedNode,
        group: Option<String>,
        table: &NamespaceTable,
        format: NamespaceFormat,
    ) -> PublishedNodesEntry {
        let mut ids = HashSet::new();
        PublishedNodesEntry {
            data_set_writer_id: Some(self.writer_id(template)),
            data_set_writer_group: base.data_set_writer_group.clone().or(group),
            data_set_name: Some(self.frame.data_set_name()),
            data_set_root_node_id: Some(self.frame.node_id.format(table, format)),
            data_set_type: self
                .frame
                .type_definition
                .as_ref()
                .map(|t| t.format(table, format)),
            opc_nodes: self.published_nodes(template, table, format, &mut ids, false),
        }
    }
}

fn unique_id(ids: &mut HashSet<String>, id: String) -> String {
    if ids.insert(id.clone()) {
        return id;
    }
    let mut index = 1usize;
    loop {
        let candidate = format!("{}_{}", id, index);
        if ids.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExpandedNodeId;

    fn frame() -> Frame {
        Frame {
            node_id: NodeId::numeric(1, 1),
            node_class: NodeClass::Object,
            browse_name: QualifiedName::new(1, "Plant"),
            display_name: LocalizedText::new("Plant"),
            type_definition: None,
            names: Vec::new(),
        }
    }

    fn reference(id: u32, name: &str) -> ReferenceDescription {
        ReferenceDescription {
            reference_type_id: crate::types::ids::HAS_COMPONENT,
            is_forward: true,
            node_id: ExpandedNodeId::from(NodeId::numeric(1, id)),
            browse_name: QualifiedName::new(1, name),
            display_name: LocalizedText::new(name),
            node_class: NodeClass::Object,
            type_definition: None,
        }
    }

    #[test]
    fn test_names_and_paths() {
        let table = NamespaceTable::default();
        let root = frame();
        assert_eq!(root.browse_path(), "");
        assert_eq!(root.data_set_name(), "Default");

        let boiler = root.child(NodeId::numeric(1, 2), &reference(2, "Boiler"), &table);
        let drum = boiler.child(NodeId::numeric(1, 3), &reference(3, "Drum"), &table);
        assert_eq!(drum.browse_path(), "/1:Boiler/1:Drum");
        assert_eq!(drum.data_set_name(), "Boiler.Drum");
    }

    #[test]
    fn test_unique_field_ids() {
        let table = NamespaceTable::default();
        let mut group = ObjectGroup::new(frame());
        for id in [10, 11] {
            assert!(group.add(Leaf {
                node_id: NodeId::numeric(1, id),
                browse_name: QualifiedName::new(1, "Value"),
                type_definition: None,
                path: "/1:Value".into(),
                method: None,
            }));
        }
        assert!(!group.add(Leaf {
            node_id: NodeId::numeric(1, 10),
            browse_name: QualifiedName::new(1, "Other"),
            type_definition: None,
            path: "/1:Other".into(),
            method: None,
        }));

        let template = PublishedNode::default().with_field_id("F");
        let mut ids = HashSet::new();
        let nodes = group.published_nodes(&template, &table, NamespaceFormat::Index, &mut ids, false);
        let field_ids: Vec<_> = nodes.iter().filter_map(|n| n.data_set_field_id.clone()).collect();
        assert_eq!(field_ids, vec!["F/1:Value", "F/1:Value_1"]);
        assert_eq!(nodes[0].id.as_deref(), Some("ns=1;i=10"));
    }
}
