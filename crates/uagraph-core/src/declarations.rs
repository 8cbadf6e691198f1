// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Instance declaration aggregation.
//!
//! A type's instance declarations are the children (and nested children) of
//! the type and all of its supertypes that carry a modelling rule. They are
//! keyed by their relative browse path from the type:
//!
//! ```text
//! BaseType ──► .2:Speed  .2:Status           (introduced, base first)
//!    ▲
//! PumpType ──► .2:Speed  .2:Speed.2:EURange  (overrides .2:Speed in place)
//! ```
//!
//! Entries live in an arena; an override keeps an index back to the entry it
//! replaced. A derived child with the same path but without a modelling rule
//! removes the inherited declaration.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, instrument, warn};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::error::{MetadataError, OpcUaError, OpcUaResult};
use crate::hierarchy::TypeHierarchy;
use crate::metadata::{DataTypeResolver, MethodMetadata, VariableMetadata};
use crate::path::{PathElement, RelativePath, TargetName};
use crate::service::{NodeAttributes, NodeService, ReferenceDescription};
use crate::types::{ids, LocalizedText, NodeClass, NodeId, QualifiedName};

// =============================================================================
// ModellingRule
// =============================================================================

/// The modelling rule of an instance declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModellingRule {
    /// Mandatory.
    Mandatory,
    /// Optional.
    Optional,
    /// MandatoryPlaceholder.
    MandatoryPlaceholder,
    /// OptionalPlaceholder.
    OptionalPlaceholder,
    /// ExposesItsArray.
    ExposesItsArray,
    /// A non-standard rule, by browse name.
    Other(String),
}

impl ModellingRule {
    /// Maps a modelling rule object onto a rule.
    pub fn from_node(node_id: &NodeId, browse_name: &QualifiedName) -> Self {
        match node_id {
            id if *id == ids::MODELLING_RULE_MANDATORY => Self::Mandatory,
            id if *id == ids::MODELLING_RULE_OPTIONAL => Self::Optional,
            id if *id == ids::MODELLING_RULE_MANDATORY_PLACEHOLDER => Self::MandatoryPlaceholder,
            id if *id == ids::MODELLING_RULE_OPTIONAL_PLACEHOLDER => Self::OptionalPlaceholder,
            id if *id == ids::MODELLING_RULE_EXPOSES_ITS_ARRAY => Self::ExposesItsArray,
            _ => Self::Other(browse_name.name.clone()),
        }
    }

    /// Returns `true` for placeholder rules.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::MandatoryPlaceholder | Self::OptionalPlaceholder)
    }
}

impl fmt::Display for ModellingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mandatory => f.write_str("Mandatory"),
            Self::Optional => f.write_str("Optional"),
            Self::MandatoryPlaceholder => f.write_str("MandatoryPlaceholder"),
            Self::OptionalPlaceholder => f.write_str("OptionalPlaceholder"),
            Self::ExposesItsArray => f.write_str("ExposesItsArray"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

// =============================================================================
// InstanceDeclaration
// =============================================================================

/// Index of a declaration in a [`DeclarationSet`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationIndex(pub usize);

/// Variable or method details of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberMetadata {
    /// Variable declaration.
    Variable(VariableMetadata),
    /// Method declaration.
    Method(MethodMetadata),
}

/// A child of a type that instances of the type are expected to have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDeclaration {
    /// Path from the declaring type, e.g. `.2:Speed.2:EURange`.
    pub browse_path: String,

    /// Browse name of the declaration node.
    pub browse_name: QualifiedName,

    /// Display name.
    pub display_name: LocalizedText,

    /// The declaration node.
    pub node_id: NodeId,

    /// Node class.
    pub node_class: NodeClass,

    /// Modelling rule.
    pub modelling_rule: ModellingRule,

    /// The type in the hierarchy that declared this entry.
    pub root_type_id: NodeId,

    /// The inherited entry this one replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden: Option<DeclarationIndex>,

    /// Variable or method metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MemberMetadata>,
}

impl InstanceDeclaration {
    /// Returns `true` if the entry was declared by a supertype of `type_id`.
    pub fn is_inherited(&self, type_id: &NodeId) -> bool {
        self.root_type_id != *type_id
    }

    /// Returns `true` if the entry replaced an inherited one.
    pub fn is_override(&self) -> bool {
        self.overridden.is_some()
    }
}

// =============================================================================
// DeclarationSet
// =============================================================================

/// Ordered, path-deduplicated instance declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationSet {
    entries: Vec<InstanceDeclaration>,
    order: Vec<DeclarationIndex>,
    by_path: HashMap<String, DeclarationIndex>,
}

impl DeclarationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a declaration, replacing any entry with the same path in place.
    pub fn insert(&mut self, mut declaration: InstanceDeclaration) -> DeclarationIndex {
        let index = DeclarationIndex(self.entries.len());
        match self.by_path.get(&declaration.browse_path).copied() {
            Some(previous) => {
                declaration.overridden = Some(previous);
                if let Some(slot) = self.order.iter_mut().find(|i| **i == previous) {
                    *slot = index;
                }
            }
            None => self.order.push(index),
        }
        self.by_path.insert(declaration.browse_path.clone(), index);
        self.entries.push(declaration);
        index
    }

    /// Removes the active entry for `path` and every entry nested below it.
    pub fn remove(&mut self, path: &str) -> usize {
        let nested = format!("{}.", path);
        let doomed: HashSet<DeclarationIndex> = self
            .by_path
            .iter()
            .filter(|(p, _)| p.as_str() == path || p.starts_with(&nested))
            .map(|(_, i)| *i)
            .collect();
        self.by_path.retain(|_, i| !doomed.contains(i));
        self.order.retain(|i| !doomed.contains(i));
        doomed.len()
    }

    /// Returns the number of active declarations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no active declarations.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates active declarations, base type entries first.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceDeclaration> {
        self.order.iter().filter_map(|i| self.entries.get(i.0))
    }

    /// Returns the active declaration for a path.
    pub fn get(&self, path: &str) -> Option<&InstanceDeclaration> {
        self.by_path.get(path).and_then(|i| self.entries.get(i.0))
    }

    /// Returns any entry, active or overridden, by index.
    pub fn entry(&self, index: DeclarationIndex) -> Option<&InstanceDeclaration> {
        self.entries.get(index.0)
    }

    /// Returns the entry `declaration` overrode.
    pub fn overridden(&self, declaration: &InstanceDeclaration) -> Option<&InstanceDeclaration> {
        declaration.overridden.and_then(|i| self.entry(i))
    }
}

impl Serialize for DeclarationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

// =============================================================================
// DeclarationAggregator
// =============================================================================

/// Collects instance declarations across a type hierarchy.
#[derive(Debug)]
pub struct DeclarationAggregator<S: NodeService + ?Sized> {
    browser: Browser<S>,
    data_types: DataTypeResolver<S>,
}

impl<S: NodeService + ?Sized> Clone for DeclarationAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
            data_types: self.data_types.clone(),
        }
    }
}

/// A child waiting to be visited: the reference, its parent path and declaring type.
struct PendingChild {
    reference: ReferenceDescription,
    node_id: NodeId,
    parent_path: RelativePath,
}

impl<S: NodeService + ?Sized> DeclarationAggregator<S> {
    /// Creates an aggregator.
    pub fn new(browser: Browser<S>) -> Self {
        Self {
            data_types: DataTypeResolver::new(browser.clone()),
            browser,
        }
    }

    /// Aggregates the declarations of the type in `hierarchy` and its supertypes.
    ///
    /// All or nothing: any browse or read failure fails the whole call with
    /// a `ResolutionFailed` error naming the node.
    #[instrument(skip(self, hierarchy, cancel), fields(type_id = %hierarchy.type_id))]
    pub async fn aggregate(
        &self,
        hierarchy: &TypeHierarchy,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<DeclarationSet> {
        let table = self.browser.namespace_table().await?;
        let mut set = DeclarationSet::new();

        for type_id in hierarchy.base_first() {
            let mut visited = HashSet::from([type_id.clone()]);
            let mut stack = self
                .children(&type_id, &RelativePath::default(), &table, cancel)
                .await?;
            stack.reverse();

            while let Some(pending) = stack.pop() {
                cancel.check()?;
                if !visited.insert(pending.node_id.clone()) {
                    continue;
                }
                let mut path = pending.parent_path.clone();
                path.elements.push(PathElement::child(TargetName::new(
                    pending.reference.browse_name.namespace_index,
                    pending.reference.browse_name.name.clone(),
                )));
                let browse_path = path.to_string();

                let Some(rule) = self
                    .modelling_rule(&pending.node_id, &table, cancel)
                    .await?
                else {
                    let removed = set.remove(&browse_path);
                    if removed > 0 {
                        debug!(path = %browse_path, removed, "Declaration removed by child without modelling rule");
                    }
                    continue;
                };

                let metadata = self.member_metadata(&pending, cancel).await?;
                set.insert(InstanceDeclaration {
                    browse_path,
                    browse_name: pending.reference.browse_name.clone(),
                    display_name: pending.reference.display_name.clone(),
                    node_id: pending.node_id.clone(),
                    node_class: pending.reference.node_class,
                    modelling_rule: rule,
                    root_type_id: type_id.clone(),
                    overridden: None,
                    metadata,
                });

                if pending.reference.node_class != NodeClass::Method {
                    let mut nested = self.children(&pending.node_id, &path, &table, cancel).await?;
                    nested.reverse();
                    stack.extend(nested);
                }
            }
        }

        debug!(declarations = set.len(), "Declarations aggregated");
        Ok(set)
    }

    async fn children(
        &self,
        node_id: &NodeId,
        parent_path: &RelativePath,
        table: &crate::types::NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Vec<PendingChild>> {
        let references = self
            .browser
            .children(
                node_id,
                ids::AGGREGATES,
                &[NodeClass::Object, NodeClass::Variable, NodeClass::Method],
                cancel,
            )
            .await
            .map_err(|e| wrap(node_id, e))?;
        Ok(references
            .into_iter()
            .filter_map(|reference| {
                let child = reference.node_id.to_node_id(table)?;
                Some(PendingChild {
                    reference,
                    node_id: child,
                    parent_path: parent_path.clone(),
                })
            })
            .collect())
    }

    async fn modelling_rule(
        &self,
        node_id: &NodeId,
        table: &crate::types::NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Option<ModellingRule>> {
        let references = self
            .browser
            .children(node_id, ids::HAS_MODELLING_RULE, &[], cancel)
            .await
            .map_err(|e| wrap(node_id, e))?;
        Ok(references.into_iter().find_map(|r| {
            r.node_id
                .to_node_id(table)
                .map(|rule| ModellingRule::from_node(&rule, &r.browse_name))
        }))
    }

    async fn member_metadata(
        &self,
        pending: &PendingChild,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Option<MemberMetadata>> {
        let node_id = &pending.node_id;
        match pending.reference.node_class {
            NodeClass::Variable => {
                let attributes: NodeAttributes = self
                    .browser
                    .read_attributes(node_id)
                    .await
                    .map_err(|e| wrap(node_id, e))?;
                let metadata = self
                    .data_types
                    .variable_metadata(&attributes, cancel)
                    .await
                    .map_err(|e| wrap(node_id, e))?;
                Ok(Some(MemberMetadata::Variable(metadata)))
            }
            NodeClass::Method => {
                let metadata = self
                    .data_types
                    .method_metadata(node_id, cancel)
                    .await
                    .map_err(|e| wrap(node_id, e))?;
                Ok(Some(MemberMetadata::Method(metadata)))
            }
            _ => Ok(None),
        }
    }
}

/// Wraps a failure as `ResolutionFailed`, leaving cancellation untouched.
fn wrap(node_id: &NodeId, error: OpcUaError) -> OpcUaError {
    match error {
        OpcUaError::Cancelled | OpcUaError::Metadata(MetadataError::ResolutionFailed { .. }) => error,
        other => {
            warn!(node_id = %node_id, error = %other, "Declaration resolution failed");
            MetadataError::resolution_failed(node_id.to_string(), other).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hierarchy::TypeHierarchyResolver;
    use crate::service::{MemoryNodeService, NodeBuilder};
    use crate::value::DataTypeTag;
    use crate::variant::BuiltInType;

    fn declaration(path: &str, root: u32) -> InstanceDeclaration {
        InstanceDeclaration {
            browse_path: path.to_string(),
            browse_name: QualifiedName::new(1, path.trim_start_matches(".1:")),
            display_name: LocalizedText::new(path),
            node_id: NodeId::numeric(1, root * 100),
            node_class: NodeClass::Variable,
            modelling_rule: ModellingRule::Mandatory,
            root_type_id: NodeId::numeric(1, root),
            overridden: None,
            metadata: None,
        }
    }

    #[test]
    fn test_set_override_keeps_position() {
        let mut set = DeclarationSet::new();
        set.insert(declaration(".1:A", 1));
        set.insert(declaration(".1:B", 1));
        let first = set.get(".1:A").unwrap().clone();
        set.insert(declaration(".1:A", 2));

        assert_eq!(set.len(), 2);
        let paths: Vec<_> = set.iter().map(|d| d.browse_path.as_str()).collect();
        assert_eq!(paths, vec![".1:A", ".1:B"]);
        let active = set.get(".1:A").unwrap();
        assert_eq!(active.root_type_id, NodeId::numeric(1, 2));
        assert!(active.is_override());
        assert_eq!(set.overridden(active), Some(&first));
    }

    #[test]
    fn test_set_remove_nested() {
        let mut set = DeclarationSet::new();
        set.insert(declaration(".1:A", 1));
        set.insert(declaration(".1:A.1:X", 1));
        set.insert(declaration(".1:AB", 1));
        assert_eq!(set.remove(".1:A"), 2);
        assert_eq!(set.len(), 1);
        assert!(set.get(".1:AB").is_some());
    }

    fn fixture() -> Arc<MemoryNodeService> {
        let service = MemoryNodeService::new();
        let ns = service.add_namespace("urn:test:types");
        let base = service.insert(NodeBuilder::object_type(NodeId::numeric(ns, 1), "DeviceType").subtype_of(&ids::BASE_OBJECT_TYPE));
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 10), "Serial", BuiltInType::String.node_id())
                .property_of(&base)
                .type_definition(ids::PROPERTY_TYPE)
                .modelling_rule(ids::MODELLING_RULE_MANDATORY),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 11), "Speed", BuiltInType::Float.node_id())
                .component_of(&base)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .modelling_rule(ids::MODELLING_RULE_OPTIONAL),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 12), "Legacy", BuiltInType::Int32.node_id())
                .component_of(&base)
                .modelling_rule(ids::MODELLING_RULE_OPTIONAL),
        );
        // Not a declaration.
        service.insert(NodeBuilder::variable(NodeId::numeric(ns, 13), "Scratch", BuiltInType::Int32.node_id()).component_of(&base));

        let pump = service.insert(NodeBuilder::object_type(NodeId::numeric(ns, 2), "PumpType").subtype_of(&base));
        let speed = service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 20), "Speed", BuiltInType::Double.node_id())
                .component_of(&pump)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE)
                .modelling_rule(ids::MODELLING_RULE_MANDATORY),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 21), "EURange", BuiltInType::Double.node_id())
                .property_of(&speed)
                .modelling_rule(ids::MODELLING_RULE_OPTIONAL),
        );
        service.insert(NodeBuilder::variable(NodeId::numeric(ns, 22), "Legacy", BuiltInType::Int32.node_id()).component_of(&pump));
        service.insert(
            NodeBuilder::method(NodeId::numeric(ns, 23), "Start")
                .component_of(&pump)
                .modelling_rule(ids::MODELLING_RULE_MANDATORY),
        );
        Arc::new(service)
    }

    async fn aggregate(service: Arc<MemoryNodeService>, type_id: NodeId) -> OpcUaResult<DeclarationSet> {
        let browser = Browser::new(service);
        let cancel = CancellationSignal::new();
        let hierarchy = TypeHierarchyResolver::new(browser.clone()).resolve(&type_id, &cancel).await?;
        DeclarationAggregator::new(browser).aggregate(&hierarchy, &cancel).await
    }

    #[tokio::test]
    async fn test_aggregate_merges_and_overrides() {
        let set = aggregate(fixture(), NodeId::numeric(1, 2)).await.unwrap();
        let paths: Vec<_> = set.iter().map(|d| d.browse_path.clone()).collect();
        assert_eq!(paths, vec![".1:Serial", ".1:Speed", ".1:Speed.1:EURange", ".1:Start"]);

        let speed = set.get(".1:Speed").unwrap();
        assert_eq!(speed.node_id, NodeId::numeric(1, 20));
        assert_eq!(speed.modelling_rule, ModellingRule::Mandatory);
        assert!(!speed.is_inherited(&NodeId::numeric(1, 2)));
        assert_eq!(set.overridden(speed).map(|d| d.node_id.clone()), Some(NodeId::numeric(1, 11)));
        match &speed.metadata {
            Some(MemberMetadata::Variable(v)) => assert_eq!(v.data_type, DataTypeTag::BuiltIn(BuiltInType::Double)),
            other => panic!("unexpected metadata {:?}", other),
        }

        let serial = set.get(".1:Serial").unwrap();
        assert!(serial.is_inherited(&NodeId::numeric(1, 2)));
        assert!(set.get(".1:Legacy").is_none());
        assert!(set.get(".1:Scratch").is_none());
        assert!(matches!(set.get(".1:Start").unwrap().metadata, Some(MemberMetadata::Method(_))));
    }

    #[tokio::test]
    async fn test_aggregate_is_all_or_nothing() {
        let service = fixture();
        service.fail_browse(&NodeId::numeric(1, 20));
        let result = aggregate(service, NodeId::numeric(1, 2)).await;
        match result {
            Err(OpcUaError::Metadata(MetadataError::ResolutionFailed { node_id, .. })) => {
                assert_eq!(node_id, "ns=1;i=20")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
