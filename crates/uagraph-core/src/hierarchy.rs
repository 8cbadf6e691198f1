// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Type hierarchy resolution and node kind classification.
//!
//! ```text
//!   MyPumpType ──HasSubtype⁻¹──► PumpType ──HasSubtype⁻¹──► BaseObjectType
//!        │                          │                            │
//!        └──── start ───────────────┴── TypeHierarchy ───────────┘ (excluded)
//! ```
//!
//! The hierarchy lists supertypes from the immediate parent to the most base
//! type below the universal root. It is recomputed on every call.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::error::{MetadataError, OpcUaResult};
use crate::service::{BrowseRequest, NodeService};
use crate::types::{ids, NodeClass, NodeId, QualifiedName};

/// Types at which a supertype walk stops. They never appear in a hierarchy.
const UNIVERSAL_ROOTS: [NodeId; 4] = [
    ids::BASE_OBJECT_TYPE,
    ids::BASE_VARIABLE_TYPE,
    ids::BASE_DATA_TYPE,
    ids::REFERENCES,
];

/// Returns `true` for the root of one of the type trees.
pub fn is_universal_root(type_id: &NodeId) -> bool {
    UNIVERSAL_ROOTS.contains(type_id)
}

// =============================================================================
// TypeHierarchy
// =============================================================================

/// One supertype in a [`TypeHierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHierarchyEntry {
    /// Type node.
    pub node_id: NodeId,
    /// Type browse name.
    pub browse_name: QualifiedName,
}

/// Supertypes of a type, ordered from the immediate parent towards the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHierarchy {
    /// The type the hierarchy was resolved for.
    pub type_id: NodeId,
    /// Supertypes, most derived first. The universal root is not included.
    pub supertypes: Vec<TypeHierarchyEntry>,
}

impl TypeHierarchy {
    /// Returns `true` if the type derives directly from the universal root.
    pub fn is_empty(&self) -> bool {
        self.supertypes.is_empty()
    }

    /// Returns the number of supertypes.
    pub fn len(&self) -> usize {
        self.supertypes.len()
    }

    /// Returns `true` if `type_id` is the type itself or one of its supertypes.
    pub fn contains(&self, type_id: &NodeId) -> bool {
        self.type_id == *type_id || self.supertypes.iter().any(|e| e.node_id == *type_id)
    }

    /// Returns the type followed by its supertypes, most derived first.
    pub fn lineage(&self) -> impl Iterator<Item = &NodeId> {
        std::iter::once(&self.type_id).chain(self.supertypes.iter().map(|e| &e.node_id))
    }

    /// Returns the lineage from the most base type to the type itself.
    pub fn base_first(&self) -> Vec<NodeId> {
        let mut lineage: Vec<NodeId> = self.lineage().cloned().collect();
        lineage.reverse();
        lineage
    }
}

// =============================================================================
// NodeKind
// =============================================================================

/// Closed classification of a node by class and type lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain object.
    Object,
    /// Variable deriving from BaseDataVariableType.
    DataVariable,
    /// Variable deriving from PropertyType.
    Property,
    /// Object deriving from BaseEventType.
    Event,
    /// Object deriving from BaseInterfaceType.
    Interface,
    /// Method.
    Method,
    /// View.
    View,
    /// Variable with neither a property nor a data variable type.
    Variable,
    /// Type nodes.
    Other,
    /// Object or variable without a type definition.
    Unknown,
}

impl NodeKind {
    /// Classifies a node.
    ///
    /// `hierarchy` is the hierarchy of the node's type definition (or of the
    /// node itself for type nodes). A node whose lineage reaches more than one
    /// specialised root takes the highest tier.
    pub fn classify(node_class: NodeClass, hierarchy: &TypeHierarchy) -> Self {
        match node_class {
            NodeClass::Method => Self::Method,
            NodeClass::View => Self::View,
            NodeClass::Object | NodeClass::Variable if hierarchy.type_id.is_null() => Self::Unknown,
            // Tiers are exclusive: Event, then Interface, then Property, then DataVariable.
            NodeClass::Object if hierarchy.contains(&ids::BASE_EVENT_TYPE) => Self::Event,
            NodeClass::Object if hierarchy.contains(&ids::BASE_INTERFACE_TYPE) => Self::Interface,
            NodeClass::Object => Self::Object,
            NodeClass::Variable if hierarchy.contains(&ids::PROPERTY_TYPE) => Self::Property,
            NodeClass::Variable if hierarchy.contains(&ids::BASE_DATA_VARIABLE_TYPE) => {
                Self::DataVariable
            }
            NodeClass::Variable => Self::Variable,
            NodeClass::ObjectType
            | NodeClass::VariableType
            | NodeClass::ReferenceType
            | NodeClass::DataType => Self::Other,
        }
    }

    /// Returns `true` for kinds the expander descends into.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Unknown)
    }

    /// Returns `true` for kinds the expander emits as leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::DataVariable | Self::Property | Self::Variable)
    }
}

// =============================================================================
// TypeHierarchyResolver
// =============================================================================

/// Walks inverse `HasSubtype` references.
#[derive(Debug)]
pub struct TypeHierarchyResolver<S: NodeService + ?Sized> {
    browser: Browser<S>,
}

impl<S: NodeService + ?Sized> Clone for TypeHierarchyResolver<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> TypeHierarchyResolver<S> {
    /// Creates a resolver.
    pub fn new(browser: Browser<S>) -> Self {
        Self { browser }
    }

    /// Resolves the supertype chain of `type_id`.
    ///
    /// Fails with `NodeNotFound` if the type does not exist and with
    /// `MalformedHierarchy` if the chain loops.
    #[instrument(skip(self, cancel), fields(type_id = %type_id))]
    pub async fn resolve(
        &self,
        type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<TypeHierarchy> {
        cancel.check()?;
        self.browser.read_attributes(type_id).await?;

        let mut hierarchy = TypeHierarchy {
            type_id: type_id.clone(),
            supertypes: Vec::new(),
        };
        if is_universal_root(type_id) {
            return Ok(hierarchy);
        }

        let mut visited = HashSet::from([type_id.clone()]);
        let mut current = type_id.clone();
        while let Some(parent) = self.browser.supertype(&current, cancel).await? {
            let parent_id = parent.node_id.node_id;
            if is_universal_root(&parent_id) {
                break;
            }
            if !visited.insert(parent_id.clone()) {
                return Err(MetadataError::malformed(
                    type_id.to_string(),
                    format!("supertype cycle through {}", parent_id),
                )
                .into());
            }
            hierarchy.supertypes.push(TypeHierarchyEntry {
                node_id: parent_id.clone(),
                browse_name: parent.browse_name,
            });
            current = parent_id;
        }

        debug!(depth = hierarchy.len(), "Type hierarchy resolved");
        Ok(hierarchy)
    }

    /// Returns `true` if `type_id` is `base` or one of its subtypes.
    ///
    /// Universal roots never appear in a hierarchy, so only equality matches
    /// them.
    pub async fn is_subtype_of(
        &self,
        type_id: &NodeId,
        base: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<bool> {
        if type_id == base {
            return Ok(true);
        }
        Ok(self.resolve(type_id, cancel).await?.contains(base))
    }

    /// Returns all transitive subtypes of `type_id`, excluding itself,
    /// breadth first.
    #[instrument(skip(self, cancel), fields(type_id = %type_id))]
    pub async fn collect_subtypes(
        &self,
        type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Vec<NodeId>> {
        let table = self.browser.namespace_table().await?;
        let mut visited = HashSet::from([type_id.clone()]);
        let mut queue = VecDeque::from([type_id.clone()]);
        let mut subtypes = Vec::new();

        while let Some(current) = queue.pop_front() {
            let request = BrowseRequest::new(current).with_reference_type(ids::HAS_SUBTYPE, false);
            for reference in self.browser.browse_all(request, cancel).await? {
                let Some(child) = reference.node_id.to_node_id(&table) else {
                    continue;
                };
                if visited.insert(child.clone()) {
                    subtypes.push(child.clone());
                    queue.push_back(child);
                }
            }
        }
        Ok(subtypes)
    }
}
