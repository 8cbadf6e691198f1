// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory address space.
//!
//! [`MemoryNodeService`] implements [`NodeService`] over a node graph held in
//! memory. It behaves like a small server:
//!
//! - **Paging**: Browse results are cut to the page size and the remainder is
//!   parked behind a continuation point
//! - **Reference filters**: `include_subtypes` is evaluated against the
//!   reference type tree of the address space itself
//! - **Access control**: Writes honour `AccessLevel`, the node's data type
//!   and value rank
//! - **Fault injection**: Browse, read and write can be made to fail per node
//! - **Snapshots**: The non-standard part of the address space can be saved to
//!   and loaded from JSON
//!
//! # Examples
//!
//! ```
//! use uagraph_core::service::{MemoryNodeService, NodeBuilder};
//! use uagraph_core::types::{ids, NodeId};
//! use uagraph_core::variant::BuiltInType;
//!
//! let service = MemoryNodeService::new();
//! let ns = service.add_namespace("urn:example:plant");
//! let pump = service.insert(
//!     NodeBuilder::object(NodeId::numeric(ns, 1), "Pump")
//!         .organized_by(&NodeId::OBJECTS_FOLDER)
//!         .type_definition(ids::BASE_OBJECT_TYPE),
//! );
//! service.insert(
//!     NodeBuilder::variable(NodeId::numeric(ns, 2), "Speed", BuiltInType::Double.node_id())
//!         .component_of(&pump),
//! );
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{BrowseError, ConfigurationError, OpcUaError, OpcUaResult, OperationError};
use crate::service::{
    standard, AccessLevel, BrowseRequest, BrowseResponse, ContinuationPoint, DataTypeDefinition,
    DataValue, NodeAttributes, NodeService, ReferenceDescription,
};
use crate::status::StatusCode;
use crate::types::{
    ids, BrowseDirection, ExpandedNodeId, LocalizedText, NamespaceTable, NodeClass, NodeId,
    QualifiedName,
};
use crate::value::{DataTypeTag, ValueRank};
use crate::variant::{BuiltInType, ScalarValue, Variant};

// =============================================================================
// Nodes and references
// =============================================================================

/// A node stored in the in-memory address space.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryNode {
    /// Attributes.
    pub attributes: NodeAttributes,
    /// Current value (variables and variable types).
    pub value: Variant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference {
    reference_type_id: NodeId,
    target: ExpandedNodeId,
}

#[derive(Debug, Default)]
struct AddressSpace {
    namespaces: Vec<String>,
    nodes: HashMap<NodeId, MemoryNode>,
    /// Insertion order, for deterministic snapshots.
    order: Vec<NodeId>,
    forward: HashMap<NodeId, Vec<Reference>>,
    inverse: HashMap<NodeId, Vec<(NodeId, NodeId)>>,
}

impl AddressSpace {
    fn add_reference(&mut self, source: &NodeId, reference_type_id: &NodeId, target: ExpandedNodeId) {
        let reference = Reference {
            reference_type_id: reference_type_id.clone(),
            target,
        };
        let list = self.forward.entry(source.clone()).or_default();
        if list.contains(&reference) {
            return;
        }
        if reference.target.is_local() && reference.target.namespace_uri.is_none() {
            self.inverse
                .entry(reference.target.node_id.clone())
                .or_default()
                .push((reference_type_id.clone(), source.clone()));
        }
        list.push(reference);
    }

    fn supertype_of(&self, type_id: &NodeId) -> Option<&NodeId> {
        self.inverse.get(type_id).and_then(|refs| {
            refs.iter()
                .find(|(rt, _)| *rt == ids::HAS_SUBTYPE)
                .map(|(_, source)| source)
        })
    }

    /// Returns `true` if `type_id` equals `base` or derives from it.
    fn is_subtype_of(&self, type_id: &NodeId, base: &NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(type_id);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            if !visited.insert(id.clone()) {
                return false;
            }
            current = self.supertype_of(id);
        }
        false
    }

    fn type_definition_of(&self, node_id: &NodeId) -> Option<ExpandedNodeId> {
        self.forward.get(node_id).and_then(|refs| {
            refs.iter()
                .find(|r| r.reference_type_id == ids::HAS_TYPE_DEFINITION)
                .map(|r| r.target.clone())
        })
    }

    fn describe(&self, reference_type_id: &NodeId, is_forward: bool, target: &ExpandedNodeId) -> ReferenceDescription {
        let node = if target.is_local() && target.namespace_uri.is_none() {
            self.nodes.get(&target.node_id)
        } else {
            None
        };
        match node {
            Some(node) => ReferenceDescription {
                reference_type_id: reference_type_id.clone(),
                is_forward,
                node_id: target.clone(),
                browse_name: node.attributes.browse_name.clone(),
                display_name: node.attributes.display_name.clone(),
                node_class: node.attributes.node_class,
                type_definition: match node.attributes.node_class {
                    NodeClass::Object | NodeClass::Variable => {
                        self.type_definition_of(&target.node_id)
                    }
                    _ => None,
                },
            },
            None => ReferenceDescription {
                reference_type_id: reference_type_id.clone(),
                is_forward,
                node_id: target.clone(),
                browse_name: QualifiedName::default(),
                display_name: LocalizedText::default(),
                node_class: NodeClass::Object,
                type_definition: None,
            },
        }
    }

    /// Maps a data type onto the codec tag used to check written values.
    fn wire_tag(&self, data_type: &NodeId) -> DataTypeTag {
        let mut visited = HashSet::new();
        let mut current = Some(data_type);
        while let Some(id) = current {
            if let Some(built_in) = BuiltInType::from_node_id(id) {
                return DataTypeTag::BuiltIn(built_in);
            }
            match id {
                id if *id == ids::NUMBER => return DataTypeTag::Number,
                id if *id == ids::INTEGER => return DataTypeTag::Integer,
                id if *id == ids::UINTEGER => return DataTypeTag::UInteger,
                id if *id == ids::ENUMERATION => return DataTypeTag::BuiltIn(BuiltInType::Int32),
                id if *id == ids::STRUCTURE => {
                    return DataTypeTag::BuiltIn(BuiltInType::ExtensionObject)
                }
                _ => {}
            }
            if !visited.insert(id.clone()) {
                break;
            }
            current = self.supertype_of(id);
        }
        DataTypeTag::Any
    }
}

/// Pending browse results parked behind a continuation point.
#[derive(Debug)]
struct PendingBrowse {
    remaining: Vec<ReferenceDescription>,
    page_size: usize,
}

#[derive(Debug, Default)]
struct Faults {
    browse: HashSet<NodeId>,
    read: HashSet<NodeId>,
    write: HashMap<NodeId, StatusCode>,
}

// =============================================================================
// ServiceCounters
// =============================================================================

/// Call counters of a [`MemoryNodeService`].
#[derive(Debug, Default)]
struct ServiceCounters {
    browse: AtomicU64,
    browse_next: AtomicU64,
    read_attributes: AtomicU64,
    read_value: AtomicU64,
    write: AtomicU64,
}

/// A snapshot of the call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Browse calls.
    pub browse: u64,
    /// BrowseNext calls.
    pub browse_next: u64,
    /// Attribute reads.
    pub read_attributes: u64,
    /// Value reads.
    pub read_value: u64,
    /// Writes that reached the address space.
    pub write: u64,
}

// =============================================================================
// MemoryNodeService
// =============================================================================

/// A [`NodeService`] over an in-memory address space.
#[derive(Debug)]
pub struct MemoryNodeService {
    name: String,
    space: RwLock<AddressSpace>,
    page_size: usize,
    continuations: Mutex<HashMap<Vec<u8>, PendingBrowse>>,
    next_continuation: AtomicU64,
    faults: RwLock<Faults>,
    counters: ServiceCounters,
    write_history: Mutex<Vec<(NodeId, Variant)>>,
}

impl MemoryNodeService {
    /// Creates an address space containing the standard namespace.
    pub fn new() -> Self {
        let service = Self::empty();
        standard::bootstrap(&service);
        service
    }

    /// Creates an address space without any nodes.
    pub fn empty() -> Self {
        Self {
            name: "memory".to_string(),
            space: RwLock::new(AddressSpace {
                namespaces: vec![crate::types::OPC_UA_NAMESPACE.to_string()],
                ..Default::default()
            }),
            page_size: 0,
            continuations: Mutex::new(HashMap::new()),
            next_continuation: AtomicU64::new(1),
            faults: RwLock::new(Faults::default()),
            counters: ServiceCounters::default(),
            write_history: Mutex::new(Vec::new()),
        }
    }

    /// Sets the maximum references returned per browse page (0 = unlimited).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Registers a namespace URI and returns its index.
    pub fn add_namespace(&self, uri: impl Into<String>) -> u16 {
        let uri = uri.into();
        let mut space = self.space.write();
        if let Some(index) = space.namespaces.iter().position(|u| *u == uri) {
            return u16::try_from(index).unwrap_or(u16::MAX);
        }
        space.namespaces.push(uri);
        u16::try_from(space.namespaces.len() - 1).unwrap_or(u16::MAX)
    }

    /// Inserts a node and its references, replacing any node with the same id.
    pub fn insert(&self, builder: NodeBuilder) -> NodeId {
        let NodeBuilder { node, references } = builder;
        let node_id = node.attributes.node_id.clone();
        let mut space = self.space.write();
        if space.nodes.insert(node_id.clone(), node).is_none() {
            space.order.push(node_id.clone());
        }
        for pending in references {
            match pending {
                PendingReference::Forward(reference_type_id, target) => {
                    space.add_reference(&node_id, &reference_type_id, target)
                }
                PendingReference::Inverse(reference_type_id, source) => {
                    space.add_reference(&source, &reference_type_id, node_id.clone().into())
                }
            }
        }
        node_id
    }

    /// Adds a reference between two nodes.
    pub fn add_reference(&self, source: &NodeId, reference_type_id: &NodeId, target: impl Into<ExpandedNodeId>) {
        self.space
            .write()
            .add_reference(source, reference_type_id, target.into());
    }

    /// Returns `true` if the node exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.space.read().nodes.contains_key(node_id)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.space.read().nodes.len()
    }

    /// Returns the current value of a node.
    pub fn value(&self, node_id: &NodeId) -> Option<Variant> {
        self.space.read().nodes.get(node_id).map(|n| n.value.clone())
    }

    /// Sets the value of a node directly, bypassing access checks.
    pub fn set_value(&self, node_id: &NodeId, value: Variant) -> bool {
        match self.space.write().nodes.get_mut(node_id) {
            Some(node) => {
                node.value = value;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Makes browse calls on `node_id` fail.
    pub fn fail_browse(&self, node_id: &NodeId) {
        self.faults.write().browse.insert(node_id.clone());
    }

    /// Makes attribute and value reads of `node_id` fail.
    pub fn fail_read(&self, node_id: &NodeId) {
        self.faults.write().read.insert(node_id.clone());
    }

    /// Makes writes to `node_id` return `status`.
    pub fn fail_write(&self, node_id: &NodeId, status: StatusCode) {
        self.faults.write().write.insert(node_id.clone(), status);
    }

    /// Removes all injected faults.
    pub fn clear_faults(&self) {
        *self.faults.write() = Faults::default();
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Returns the call counters.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            browse: self.counters.browse.load(Ordering::Relaxed),
            browse_next: self.counters.browse_next.load(Ordering::Relaxed),
            read_attributes: self.counters.read_attributes.load(Ordering::Relaxed),
            read_value: self.counters.read_value.load(Ordering::Relaxed),
            write: self.counters.write.load(Ordering::Relaxed),
        }
    }

    /// Returns every accepted write in order.
    pub fn write_history(&self) -> Vec<(NodeId, Variant)> {
        self.write_history.lock().clone()
    }

    /// Returns the number of continuation points currently held.
    pub fn open_continuation_points(&self) -> usize {
        self.continuations.lock().len()
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Exports every node outside namespace 0 with its references.
    pub fn snapshot(&self) -> AddressSpaceSnapshot {
        let space = self.space.read();
        let nodes = space
            .order
            .iter()
            .filter(|id| !id.is_standard())
            .filter_map(|id| space.nodes.get(id))
            .map(SnapshotNode::from_node)
            .collect();
        let mut references = Vec::new();
        for source in &space.order {
            let Some(refs) = space.forward.get(source) else {
                continue;
            };
            for reference in refs {
                if source.is_standard() && reference.target.node_id.is_standard() {
                    continue;
                }
                references.push(SnapshotReference {
                    source: source.to_string(),
                    reference_type: reference.reference_type_id.to_string(),
                    target: reference.target.to_string(),
                });
            }
        }
        AddressSpaceSnapshot {
            namespaces: space.namespaces.iter().skip(1).cloned().collect(),
            nodes,
            references,
        }
    }

    /// Builds an address space from the standard namespace plus a snapshot.
    pub fn from_snapshot(snapshot: &AddressSpaceSnapshot) -> OpcUaResult<Self> {
        let service = Self::new();
        for uri in &snapshot.namespaces {
            service.add_namespace(uri.clone());
        }
        for node in &snapshot.nodes {
            let memory_node = node.to_node()?;
            service.insert(NodeBuilder {
                node: memory_node,
                references: Vec::new(),
            });
        }
        for reference in &snapshot.references {
            let source: NodeId = reference.source.parse().map_err(snapshot_error)?;
            let reference_type: NodeId = reference.reference_type.parse().map_err(snapshot_error)?;
            let target: ExpandedNodeId = reference.target.parse().map_err(snapshot_error)?;
            service.add_reference(&source, &reference_type, target);
        }
        Ok(service)
    }

    /// Loads a JSON snapshot file.
    pub fn load_json(path: impl AsRef<Path>) -> OpcUaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::invalid_snapshot(format!("{}: {}", path.display(), e))
        })?;
        let snapshot: AddressSpaceSnapshot = serde_json::from_str(&content)
            .map_err(|e| ConfigurationError::invalid_snapshot(format!("{}: {}", path.display(), e)))?;
        Self::from_snapshot(&snapshot)
    }

    /// Saves the snapshot as pretty-printed JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> OpcUaResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| ConfigurationError::invalid_snapshot(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            ConfigurationError::invalid_snapshot(format!("{}: {}", path.display(), e)).into()
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn park(&self, mut references: Vec<ReferenceDescription>, page_size: usize) -> BrowseResponse {
        if page_size == 0 || references.len() <= page_size {
            return BrowseResponse {
                references,
                continuation_point: None,
            };
        }
        let remaining = references.split_off(page_size);
        let id = self.next_continuation.fetch_add(1, Ordering::Relaxed);
        let token = id.to_be_bytes().to_vec();
        self.continuations.lock().insert(
            token.clone(),
            PendingBrowse {
                remaining,
                page_size,
            },
        );
        BrowseResponse {
            references,
            continuation_point: Some(ContinuationPoint(token)),
        }
    }

    fn effective_page_size(&self, requested: u32) -> usize {
        match (self.page_size, requested as usize) {
            (0, requested) => requested,
            (server, 0) => server,
            (server, requested) => server.min(requested),
        }
    }
}

impl Default for MemoryNodeService {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_error(error: OpcUaError) -> OpcUaError {
    ConfigurationError::invalid_snapshot(error.to_string()).into()
}

// =============================================================================
// NodeService implementation
// =============================================================================

#[async_trait]
impl NodeService for MemoryNodeService {
    async fn browse(&self, request: &BrowseRequest) -> OpcUaResult<BrowseResponse> {
        self.counters.browse.fetch_add(1, Ordering::Relaxed);
        if self.faults.read().browse.contains(&request.node_id) {
            return Err(BrowseError::browse_failed(
                request.node_id.to_string(),
                "injected browse fault",
            )
            .into());
        }

        let references = {
            let space = self.space.read();
            if !space.nodes.contains_key(&request.node_id) {
                return Err(BrowseError::node_not_found(request.node_id.to_string()).into());
            }

            let type_matches = |reference_type_id: &NodeId| match &request.reference_type_id {
                None => true,
                Some(filter) if request.include_subtypes => {
                    space.is_subtype_of(reference_type_id, filter)
                }
                Some(filter) => reference_type_id == filter,
            };

            let mut results = Vec::new();
            if request.direction.accepts(true) {
                for reference in space.forward.get(&request.node_id).into_iter().flatten() {
                    if type_matches(&reference.reference_type_id) {
                        results.push(space.describe(&reference.reference_type_id, true, &reference.target));
                    }
                }
            }
            if request.direction.accepts(false) {
                for (reference_type_id, source) in space.inverse.get(&request.node_id).into_iter().flatten() {
                    if type_matches(reference_type_id) {
                        results.push(space.describe(reference_type_id, false, &source.clone().into()));
                    }
                }
            }
            results.retain(|r| r.node_class.matches_mask(request.node_class_mask));
            results
        };

        Ok(self.park(references, self.effective_page_size(request.max_references)))
    }

    async fn browse_next(&self, continuation_point: &ContinuationPoint) -> OpcUaResult<BrowseResponse> {
        self.counters.browse_next.fetch_add(1, Ordering::Relaxed);
        let pending = self
            .continuations
            .lock()
            .remove(&continuation_point.0)
            .ok_or(BrowseError::BadContinuationPoint)?;
        Ok(self.park(pending.remaining, pending.page_size))
    }

    async fn release_continuation_point(&self, continuation_point: &ContinuationPoint) -> OpcUaResult<()> {
        self.continuations.lock().remove(&continuation_point.0);
        Ok(())
    }

    async fn read_attributes(&self, node_id: &NodeId) -> OpcUaResult<NodeAttributes> {
        self.counters.read_attributes.fetch_add(1, Ordering::Relaxed);
        if self.faults.read().read.contains(node_id) {
            return Err(OperationError::read_failed(node_id.to_string(), "injected read fault").into());
        }
        self.space
            .read()
            .nodes
            .get(node_id)
            .map(|node| node.attributes.clone())
            .ok_or_else(|| BrowseError::node_not_found(node_id.to_string()).into())
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<DataValue> {
        self.counters.read_value.fetch_add(1, Ordering::Relaxed);
        if self.faults.read().read.contains(node_id) {
            return Err(OperationError::read_failed(node_id.to_string(), "injected read fault").into());
        }
        let space = self.space.read();
        let node = space
            .nodes
            .get(node_id)
            .ok_or_else(|| BrowseError::node_not_found(node_id.to_string()))?;
        if !matches!(node.attributes.node_class, NodeClass::Variable | NodeClass::VariableType) {
            return Err(OperationError::read_failed(node_id.to_string(), "node has no value").into());
        }
        if !node.attributes.access_level.unwrap_or_default().is_readable() {
            return Err(OperationError::read_failed(node_id.to_string(), "node is not readable").into());
        }

        let value = if *node_id == ids::SERVER_NAMESPACE_ARRAY {
            Variant::array(
                BuiltInType::String,
                space.namespaces.iter().cloned().map(ScalarValue::String).collect(),
            )
        } else {
            node.value.clone()
        };
        Ok(DataValue {
            value,
            status: StatusCode::GOOD,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        })
    }

    async fn namespace_table(&self) -> OpcUaResult<NamespaceTable> {
        Ok(NamespaceTable::new(self.space.read().namespaces.clone()))
    }

    async fn write(&self, node_id: &NodeId, value: &Variant, index_range: Option<&str>) -> OpcUaResult<StatusCode> {
        if let Some(status) = self.faults.read().write.get(node_id) {
            return Ok(*status);
        }

        let mut space = self.space.write();
        let Some(node) = space.nodes.get(node_id) else {
            return Ok(StatusCode::BAD_NODE_ID_UNKNOWN);
        };
        let attributes = &node.attributes;
        if attributes.node_class != NodeClass::Variable
            || !attributes.access_level.unwrap_or_default().is_writable()
        {
            return Ok(StatusCode::BAD_NOT_WRITABLE);
        }

        let tag = attributes
            .data_type
            .as_ref()
            .map(|dt| space.wire_tag(dt))
            .unwrap_or(DataTypeTag::Any);
        if let Some(actual) = value.built_in_type() {
            if !tag.accepts(actual) {
                return Ok(StatusCode::BAD_TYPE_MISMATCH);
            }
        }

        let new_value = match index_range {
            None => {
                let rank = attributes.value_rank.unwrap_or(ValueRank::ANY);
                let dims = match value {
                    Variant::Empty | Variant::Scalar { .. } => 0,
                    Variant::Array { .. } => value.array_dimensions().len(),
                };
                if !value.is_empty() && !rank.accepts(dims) {
                    return Ok(StatusCode::BAD_TYPE_MISMATCH);
                }
                value.clone()
            }
            Some(range) => match apply_index_range(&node.value, value, range) {
                Ok(updated) => updated,
                Err(status) => return Ok(status),
            },
        };

        if let Some(node) = space.nodes.get_mut(node_id) {
            node.value = new_value;
        }
        drop(space);

        self.counters.write.fetch_add(1, Ordering::Relaxed);
        self.write_history.lock().push((node_id.clone(), value.clone()));
        Ok(StatusCode::GOOD)
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Applies a one-dimensional numeric range (`"3"` or `"1:4"`) to an array value.
fn apply_index_range(current: &Variant, value: &Variant, range: &str) -> Result<Variant, StatusCode> {
    let (start, end) = match range.split_once(':') {
        Some((a, b)) => (
            a.trim().parse::<usize>().map_err(|_| StatusCode::BAD_INDEX_RANGE_INVALID)?,
            b.trim().parse::<usize>().map_err(|_| StatusCode::BAD_INDEX_RANGE_INVALID)?,
        ),
        None => {
            let index = range.trim().parse::<usize>().map_err(|_| StatusCode::BAD_INDEX_RANGE_INVALID)?;
            (index, index)
        }
    };
    if end < start || (range.contains(':') && end == start) {
        return Err(StatusCode::BAD_INDEX_RANGE_INVALID);
    }

    let Variant::Array {
        element_type,
        values: existing,
        dimensions: None,
    } = current
    else {
        return Err(StatusCode::BAD_INDEX_RANGE_NO_DATA);
    };
    if end >= existing.len() {
        return Err(StatusCode::BAD_INDEX_RANGE_NO_DATA);
    }
    let replacement: Vec<ScalarValue> = match value {
        Variant::Array { values, .. } => values.clone(),
        Variant::Scalar { value } => vec![value.clone()],
        Variant::Empty => return Err(StatusCode::BAD_TYPE_MISMATCH),
    };
    if replacement.len() != end - start + 1 {
        return Err(StatusCode::BAD_INDEX_RANGE_INVALID);
    }
    if replacement.iter().any(|v| v.built_in_type() != *element_type) {
        return Err(StatusCode::BAD_TYPE_MISMATCH);
    }

    let mut values = existing.clone();
    values.splice(start..=end, replacement);
    Ok(Variant::Array {
        element_type: *element_type,
        values,
        dimensions: None,
    })
}

// =============================================================================
// NodeBuilder
// =============================================================================

#[derive(Debug, Clone)]
enum PendingReference {
    Forward(NodeId, ExpandedNodeId),
    Inverse(NodeId, NodeId),
}

/// Fluent construction of a node and its references.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    node: MemoryNode,
    references: Vec<PendingReference>,
}

impl NodeBuilder {
    fn new(node_id: NodeId, node_class: NodeClass, name: &str) -> Self {
        let browse_name = QualifiedName::new(node_id.namespace_index, name);
        Self {
            node: MemoryNode {
                attributes: NodeAttributes {
                    node_id,
                    node_class,
                    browse_name,
                    display_name: LocalizedText::new(name),
                    description: None,
                    data_type: None,
                    value_rank: None,
                    array_dimensions: None,
                    access_level: None,
                    is_abstract: None,
                    data_type_definition: None,
                },
                value: Variant::Empty,
            },
            references: Vec::new(),
        }
    }

    /// Starts an Object node. The browse name takes the node's namespace.
    pub fn object(node_id: NodeId, name: &str) -> Self {
        Self::new(node_id, NodeClass::Object, name)
    }

    /// Starts a Variable node with read/write access and scalar rank.
    pub fn variable(node_id: NodeId, name: &str, data_type: NodeId) -> Self {
        let mut builder = Self::new(node_id, NodeClass::Variable, name);
        builder.node.attributes.data_type = Some(data_type);
        builder.node.attributes.value_rank = Some(ValueRank::SCALAR);
        builder.node.attributes.access_level = Some(AccessLevel::READ_WRITE);
        builder
    }

    /// Starts a Method node.
    pub fn method(node_id: NodeId, name: &str) -> Self {
        Self::new(node_id, NodeClass::Method, name)
    }

    /// Starts an ObjectType node.
    pub fn object_type(node_id: NodeId, name: &str) -> Self {
        let mut builder = Self::new(node_id, NodeClass::ObjectType, name);
        builder.node.attributes.is_abstract = Some(false);
        builder
    }

    /// Starts a VariableType node.
    pub fn variable_type(node_id: NodeId, name: &str, data_type: NodeId) -> Self {
        let mut builder = Self::new(node_id, NodeClass::VariableType, name);
        builder.node.attributes.data_type = Some(data_type);
        builder.node.attributes.value_rank = Some(ValueRank::ANY);
        builder.node.attributes.is_abstract = Some(false);
        builder
    }

    /// Starts a DataType node.
    pub fn data_type(node_id: NodeId, name: &str) -> Self {
        let mut builder = Self::new(node_id, NodeClass::DataType, name);
        builder.node.attributes.is_abstract = Some(false);
        builder
    }

    /// Starts a ReferenceType node.
    pub fn reference_type(node_id: NodeId, name: &str) -> Self {
        let mut builder = Self::new(node_id, NodeClass::ReferenceType, name);
        builder.node.attributes.is_abstract = Some(false);
        builder
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Overrides the browse name.
    pub fn browse_name(mut self, browse_name: QualifiedName) -> Self {
        self.node.attributes.browse_name = browse_name;
        self
    }

    /// Overrides the display name.
    pub fn display_name(mut self, text: impl Into<String>) -> Self {
        self.node.attributes.display_name = LocalizedText::new(text);
        self
    }

    /// Sets the description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.node.attributes.description = Some(LocalizedText::new(text));
        self
    }

    /// Sets the value rank.
    pub fn value_rank(mut self, value_rank: ValueRank) -> Self {
        self.node.attributes.value_rank = Some(value_rank);
        self
    }

    /// Sets the array dimensions.
    pub fn array_dimensions(mut self, dimensions: Vec<u32>) -> Self {
        self.node.attributes.array_dimensions = Some(dimensions);
        self
    }

    /// Sets the access level.
    pub fn access_level(mut self, access_level: AccessLevel) -> Self {
        self.node.attributes.access_level = Some(access_level);
        self
    }

    /// Sets IsAbstract.
    pub fn is_abstract(mut self, is_abstract: bool) -> Self {
        self.node.attributes.is_abstract = Some(is_abstract);
        self
    }

    /// Sets the DataTypeDefinition.
    pub fn data_type_definition(mut self, definition: DataTypeDefinition) -> Self {
        self.node.attributes.data_type_definition = Some(definition);
        self
    }

    /// Sets the initial value.
    pub fn value(mut self, value: impl Into<Variant>) -> Self {
        self.node.value = value.into();
        self
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Adds a forward reference from this node.
    pub fn reference(mut self, reference_type_id: NodeId, target: impl Into<ExpandedNodeId>) -> Self {
        self.references
            .push(PendingReference::Forward(reference_type_id, target.into()));
        self
    }

    /// Adds a reference from `parent` to this node.
    pub fn child_of(mut self, parent: &NodeId, reference_type_id: NodeId) -> Self {
        self.references
            .push(PendingReference::Inverse(reference_type_id, parent.clone()));
        self
    }

    /// `parent --Organizes--> self`.
    pub fn organized_by(self, parent: &NodeId) -> Self {
        self.child_of(parent, ids::ORGANIZES)
    }

    /// `parent --HasComponent--> self`.
    pub fn component_of(self, parent: &NodeId) -> Self {
        self.child_of(parent, ids::HAS_COMPONENT)
    }

    /// `parent --HasProperty--> self`.
    pub fn property_of(self, parent: &NodeId) -> Self {
        self.child_of(parent, ids::HAS_PROPERTY)
    }

    /// `supertype --HasSubtype--> self`.
    pub fn subtype_of(self, supertype: &NodeId) -> Self {
        self.child_of(supertype, ids::HAS_SUBTYPE)
    }

    /// `self --HasTypeDefinition--> type_id`.
    pub fn type_definition(self, type_id: NodeId) -> Self {
        self.reference(ids::HAS_TYPE_DEFINITION, type_id)
    }

    /// `self --HasModellingRule--> rule`.
    pub fn modelling_rule(self, rule: NodeId) -> Self {
        self.reference(ids::HAS_MODELLING_RULE, rule)
    }
}

// =============================================================================
// Snapshot format
// =============================================================================

/// Serializable form of the non-standard part of an address space.
///
/// Node ids are written in their string form (`ns=2;s=Pump`), browse names
/// as `<index>:<name>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressSpaceSnapshot {
    /// Namespace URIs starting at index 1.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Nodes.
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,

    /// References.
    #[serde(default)]
    pub references: Vec<SnapshotReference>,
}

/// A node in an [`AddressSpaceSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNode {
    /// Node id.
    pub node_id: String,
    /// Node class.
    pub node_class: NodeClass,
    /// Browse name.
    pub browse_name: String,
    /// Display name (defaults to the browse name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Data type node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Value rank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<ValueRank>,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
    /// Access level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    /// IsAbstract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_abstract: Option<bool>,
    /// DataTypeDefinition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type_definition: Option<DataTypeDefinition>,
    /// Value.
    #[serde(default, skip_serializing_if = "Variant::is_empty")]
    pub value: Variant,
}

/// A reference in an [`AddressSpaceSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReference {
    /// Source node id.
    pub source: String,
    /// Reference type node id.
    pub reference_type: String,
    /// Target node id (may be an expanded id).
    pub target: String,
}

impl SnapshotNode {
    fn from_node(node: &MemoryNode) -> Self {
        let a = &node.attributes;
        Self {
            node_id: a.node_id.to_string(),
            node_class: a.node_class,
            browse_name: a.browse_name.to_string(),
            display_name: (a.display_name.text != a.browse_name.name)
                .then(|| a.display_name.text.clone()),
            description: a.description.as_ref().map(|d| d.text.clone()),
            data_type: a.data_type.as_ref().map(NodeId::to_string),
            value_rank: a.value_rank,
            array_dimensions: a.array_dimensions.clone(),
            access_level: a.access_level,
            is_abstract: a.is_abstract,
            data_type_definition: a.data_type_definition.clone(),
            value: node.value.clone(),
        }
    }

    fn to_node(&self) -> OpcUaResult<MemoryNode> {
        let node_id: NodeId = self.node_id.parse().map_err(snapshot_error)?;
        let browse_name: QualifiedName = self.browse_name.parse().map_err(snapshot_error)?;
        let data_type = self
            .data_type
            .as_deref()
            .map(str::parse::<NodeId>)
            .transpose()
            .map_err(snapshot_error)?;
        let is_value_node = matches!(self.node_class, NodeClass::Variable | NodeClass::VariableType);
        Ok(MemoryNode {
            attributes: NodeAttributes {
                node_id,
                node_class: self.node_class,
                display_name: LocalizedText::new(
                    self.display_name.clone().unwrap_or_else(|| browse_name.name.clone()),
                ),
                browse_name,
                description: self.description.clone().map(LocalizedText::new),
                data_type: data_type.or_else(|| is_value_node.then_some(ids::BASE_DATA_TYPE)),
                value_rank: self.value_rank.or_else(|| is_value_node.then_some(ValueRank::SCALAR)),
                array_dimensions: self.array_dimensions.clone(),
                access_level: self.access_level.or_else(|| {
                    (self.node_class == NodeClass::Variable).then_some(AccessLevel::READ_WRITE)
                }),
                is_abstract: self.is_abstract,
                data_type_definition: self.data_type_definition.clone(),
            },
            value: self.value.clone(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
