// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space expansion.
//!
//! Turns a [`PublishedNodesEntry`] whose nodes are roots (objects, variables
//! or types) into publishable entries whose nodes are leaf variables.
//!
//! # Walk
//!
//! ```text
//! roots ──resolve──► Object ───► objects below (HierarchicalReferences, max_depth)
//!                    ObjectType ► instances under Objects (+ subtypes)
//!                    VariableType ► variable instances under Objects
//!                    Variable ─► the variable itself
//!                        │
//!                        ▼
//!              per object: leaves via Aggregates (levels_to_expand)
//!                        │
//!          create_single_writer? ── no ──► one entry per object, emitted as found
//!                        │
//!                       yes ──► one entry at the end
//! ```
//!
//! [`Expansion`] is lazy: each call to [`Expansion::next`] walks only as far
//! as needed to produce the next result. Failures are contained to the root
//! or object that caused them and surface as [`ExpansionResult::Error`]
//! unless `discard_errors` is set.

mod frame;
pub mod model;

use std::collections::{HashMap, HashSet, VecDeque};

use futures::stream::{self, Stream};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::error::{BrowseError, OpcUaError, OpcUaResult, ServiceDiagnostic};
use crate::hierarchy::{NodeKind, TypeHierarchy, TypeHierarchyResolver};
use crate::metadata::DataTypeResolver;
use crate::path::PathResolver;
use crate::service::NodeService;
use crate::status::StatusCode;
use crate::types::{ids, ExpandedNodeId, NamespaceTable, NodeClass, NodeId};

use frame::{Frame, Leaf, ObjectGroup};
pub use model::{ExpansionPolicy, ExpansionResult, PublishedNode, PublishedNodesEntry};

// =============================================================================
// Expander
// =============================================================================

/// Creates [`Expansion`]s.
pub struct Expander<S: NodeService + ?Sized> {
    browser: Browser<S>,
    hierarchy: TypeHierarchyResolver<S>,
    paths: PathResolver<S>,
    data_types: DataTypeResolver<S>,
}

impl<S: NodeService + ?Sized> Clone for Expander<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
            hierarchy: self.hierarchy.clone(),
            paths: self.paths.clone(),
            data_types: self.data_types.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> std::fmt::Debug for Expander<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expander").field("browser", &self.browser).finish()
    }
}

impl<S: NodeService + ?Sized> Expander<S> {
    /// Creates an expander.
    pub fn new(browser: Browser<S>) -> Self {
        Self {
            hierarchy: TypeHierarchyResolver::new(browser.clone()),
            paths: PathResolver::new(browser.clone()),
            data_types: DataTypeResolver::new(browser.clone()),
            browser,
        }
    }

    /// Starts expanding `entry`. Nothing is browsed until the first
    /// [`Expansion::next`] call.
    pub fn expand(
        &self,
        entry: PublishedNodesEntry,
        policy: ExpansionPolicy,
        cancel: CancellationSignal,
    ) -> Expansion<S> {
        let span = info_span!(
            "expand",
            roots = entry.opc_nodes.len(),
            single_writer = policy.create_single_writer
        );
        Expansion {
            walker: Walker {
                expander: self.clone(),
                policy,
                kinds: HashMap::new(),
            },
            entry,
            cancel,
            table: NamespaceTable::default(),
            roots: Vec::new(),
            current: 0,
            phase: Phase::Start,
            pending: VecDeque::new(),
            counts: Counts::default(),
            span,
        }
    }
}

// =============================================================================
// Expansion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Walk,
    Finish,
    Done,
}

#[derive(Debug, Default)]
struct Counts {
    entries: usize,
    errors: usize,
    nodes: usize,
}

/// Kind of walk a root needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootMode {
    Objects,
    ObjectInstances,
    VariableInstances,
    Variable,
}

/// State of one root of the entry.
#[derive(Debug)]
struct RootState {
    node: PublishedNode,
    frame: Option<Frame>,
    errors: Vec<ServiceDiagnostic>,
    discovered: bool,
    objects: VecDeque<Frame>,
    known: HashSet<NodeId>,
    /// Groups awaiting the final single-writer entry.
    groups: Vec<ObjectGroup>,
}

impl RootState {
    fn new(node: PublishedNode) -> Self {
        Self {
            node,
            frame: None,
            errors: Vec::new(),
            discovered: false,
            objects: VecDeque::new(),
            known: HashSet::new(),
            groups: Vec::new(),
        }
    }

    fn fail(&mut self, status_code: StatusCode, message: impl Into<String>) {
        self.errors.push(ServiceDiagnostic::new(status_code, message));
    }

    fn mode(&self) -> Option<RootMode> {
        match self.frame.as_ref()?.node_class {
            NodeClass::Object => Some(RootMode::Objects),
            NodeClass::ObjectType => Some(RootMode::ObjectInstances),
            NodeClass::VariableType => Some(RootMode::VariableInstances),
            NodeClass::Variable => Some(RootMode::Variable),
            _ => None,
        }
    }

    fn group_name(&self) -> Option<String> {
        self.frame.as_ref().map(|f| f.browse_name.name.clone())
    }
}

/// A lazy, finite, non-restartable sequence of [`ExpansionResult`]s.
pub struct Expansion<S: NodeService + ?Sized> {
    walker: Walker<S>,
    entry: PublishedNodesEntry,
    cancel: CancellationSignal,
    table: NamespaceTable,
    roots: Vec<RootState>,
    current: usize,
    phase: Phase,
    pending: VecDeque<ExpansionResult>,
    counts: Counts,
    span: Span,
}

impl<S: NodeService + ?Sized> std::fmt::Debug for Expansion<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expansion")
            .field("phase", &self.phase)
            .field("roots", &self.roots.len())
            .field("current", &self.current)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<S: NodeService + ?Sized> Expansion<S> {
    /// Returns the next result, or `None` when the expansion is complete or
    /// was cancelled.
    pub async fn next(&mut self) -> Option<ExpansionResult> {
        let span = self.span.clone();
        self.advance().instrument(span).await
    }

    /// Drains the remaining results.
    pub async fn collect(mut self) -> Vec<ExpansionResult> {
        let mut results = Vec::new();
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }

    /// Converts the expansion into a stream.
    pub fn into_stream(self) -> impl Stream<Item = ExpansionResult> {
        stream::unfold(self, |mut expansion| async move {
            expansion.next().await.map(|result| (result, expansion))
        })
    }

    /// Returns `true` once the sequence has ended.
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done && self.pending.is_empty()
    }

    async fn advance(&mut self) -> Option<ExpansionResult> {
        loop {
            if self.cancel.is_cancelled() {
                if self.phase != Phase::Done {
                    debug!(dropped = self.pending.len(), "Expansion cancelled");
                }
                self.stop();
                return None;
            }
            if let Some(result) = self.pending.pop_front() {
                return Some(result);
            }

            let outcome = match self.phase {
                Phase::Start => self.start().await.map(|()| Phase::Walk),
                Phase::Walk => self
                    .step()
                    .await
                    .map(|more| if more { Phase::Walk } else { Phase::Finish }),
                Phase::Finish => {
                    self.finish();
                    Ok(Phase::Done)
                }
                Phase::Done => return None,
            };

            match outcome {
                Ok(phase) => self.phase = phase,
                Err(OpcUaError::Cancelled) => {
                    self.stop();
                    return None;
                }
                Err(error) => {
                    // Only the namespace table read can fail outside a branch.
                    error.log("expansion");
                    if !self.walker.policy.discard_errors {
                        self.pending.push_back(ExpansionResult::Error {
                            error_info: ServiceDiagnostic::from(&error),
                            entry: self.entry.clone(),
                        });
                    }
                    self.phase = Phase::Done;
                }
            }
        }
    }

    fn stop(&mut self) {
        self.pending.clear();
        self.phase = Phase::Done;
    }

    fn push_error(&mut self, error_info: ServiceDiagnostic, nodes: Vec<PublishedNode>) {
        self.counts.errors += 1;
        if self.walker.policy.discard_errors {
            return;
        }
        self.pending.push_back(ExpansionResult::Error {
            error_info,
            entry: PublishedNodesEntry {
                opc_nodes: nodes,
                ..self.entry.clone()
            },
        });
    }

    fn push_entry(&mut self, entry: PublishedNodesEntry) {
        self.counts.entries += 1;
        self.counts.nodes += entry.opc_nodes.len();
        self.pending.push_back(ExpansionResult::Entry { entry });
    }

    /// Resolves every root node.
    async fn start(&mut self) -> OpcUaResult<()> {
        self.table = self.walker.expander.browser.namespace_table().await?;
        let nodes = std::mem::take(&mut self.entry.opc_nodes);
        for node in &nodes {
            let mut root = RootState::new(node.clone());
            match self.walker.resolve_root(node, &self.table, &self.cancel).await {
                Ok(frame) => root.frame = Some(frame),
                Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
                Err(error) => {
                    warn!(node = %node.describe(), error = %error, "Root node could not be resolved");
                    root.errors.push(ServiceDiagnostic::from(&error));
                }
            }
            self.roots.push(root);
        }
        self.entry.opc_nodes = nodes;
        Ok(())
    }

    /// Does one unit of work. Returns `false` when every root is walked.
    async fn step(&mut self) -> OpcUaResult<bool> {
        let Some(root) = self.roots.get_mut(self.current) else {
            return Ok(false);
        };
        if !root.errors.is_empty() {
            self.current += 1;
            return Ok(true);
        }
        let Some(mode) = root.mode() else {
            let class = root.frame.as_ref().map_or("Unspecified", |f| f.node_class.name());
            root.fail(
                StatusCode::BAD_NOT_SUPPORTED,
                format!("Node class {} not supported.", class),
            );
            self.current += 1;
            return Ok(true);
        };

        if !root.discovered {
            root.discovered = true;
            let branch_errors = self.walker.discover(root, mode, &self.table, &self.cancel).await?;
            for (error, frame) in branch_errors {
                let context = self.context_node(self.current, &frame);
                self.push_error(error, vec![context]);
            }
            return Ok(true);
        }

        let Some(object) = root.objects.pop_front() else {
            self.current += 1;
            return Ok(true);
        };

        match self
            .walker
            .collect(object.clone(), mode, &self.table, &self.cancel)
            .await
        {
            Ok((group, nested)) => {
                let root = &mut self.roots[self.current];
                for frame in nested {
                    if root.known.insert(frame.node_id.clone()) {
                        root.objects.push_back(frame);
                    }
                }
                if group.is_empty() {
                    debug!(object = %group.frame.node_id, "Object has no leaves");
                } else if self.walker.policy.create_single_writer {
                    root.groups.push(group);
                } else {
                    let entry = group.to_entry(
                        &self.entry,
                        &root.node,
                        root.group_name(),
                        &self.table,
                        self.walker.policy.namespace_format,
                    );
                    debug!(
                        writer_id = entry.data_set_writer_id.as_deref().unwrap_or_default(),
                        nodes = entry.opc_nodes.len(),
                        "Object expanded"
                    );
                    self.push_entry(entry);
                }
            }
            Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
            Err(error) => {
                warn!(object = %object.node_id, error = %error, "Object expansion failed");
                let context = self.context_node(self.current, &object);
                self.push_error(ServiceDiagnostic::from(&error), vec![context]);
            }
        }
        Ok(true)
    }

    /// Emits the single-writer entry and the root errors.
    fn finish(&mut self) {
        let format = self.walker.policy.namespace_format;
        let mut ids = HashSet::new();
        let mut nodes = Vec::new();
        for root in self.roots.iter().filter(|r| r.errors.is_empty()) {
            for group in &root.groups {
                nodes.extend(group.published_nodes(&root.node, &self.table, format, &mut ids, true));
            }
        }
        if !nodes.is_empty() {
            let entry = PublishedNodesEntry {
                opc_nodes: nodes,
                ..self.entry.clone()
            };
            self.push_entry(entry);
        }

        let failed: Vec<(ServiceDiagnostic, PublishedNode)> = self
            .roots
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| (e.clone(), r.node.clone())))
            .collect();
        for (error, node) in failed {
            self.push_error(error, vec![node]);
        }

        info!(
            entries = self.counts.entries,
            errors = self.counts.errors,
            nodes = self.counts.nodes,
            "Expansion complete"
        );
    }

    fn context_node(&self, root: usize, frame: &Frame) -> PublishedNode {
        let template = self.roots.get(root).map(|r| &r.node);
        PublishedNode {
            id: Some(frame.node_id.format(&self.table, self.walker.policy.namespace_format)),
            data_set_field_id: template.and_then(|t| t.data_set_field_id.clone()),
            display_name: Some(frame.display_name.text.clone()),
            ..Default::default()
        }
    }
}

// =============================================================================
// Walker
// =============================================================================

/// Browsing half of an expansion.
struct Walker<S: NodeService + ?Sized> {
    expander: Expander<S>,
    policy: ExpansionPolicy,
    /// Node kind per type definition, for this expansion only.
    kinds: HashMap<NodeId, NodeKind>,
}

impl<S: NodeService + ?Sized> Walker<S> {
    fn browser(&self) -> &Browser<S> {
        &self.expander.browser
    }

    async fn resolve_root(
        &self,
        node: &PublishedNode,
        table: &NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Frame> {
        let start = match &node.id {
            Some(id) => {
                let expanded: ExpandedNodeId = id.parse()?;
                expanded.to_node_id(table).ok_or_else(|| {
                    BrowseError::invalid_node_id(id.clone(), "namespace is not known to the server")
                })?
            }
            None => NodeId::NULL,
        };
        let node_id = match &node.browse_path {
            Some(path) if !path.is_empty() => {
                self.expander.paths.resolve_segments(&start, path, cancel).await?
            }
            _ => start,
        };
        if node_id.is_null() {
            return Err(BrowseError::invalid_node_id(node.describe(), "no node to expand").into());
        }

        let attributes = self.browser().read_attributes(&node_id).await?;
        let type_definition = match attributes.node_class {
            NodeClass::Object | NodeClass::Variable => {
                self.browser().type_definition(&node_id, cancel).await?
            }
            NodeClass::ObjectType | NodeClass::VariableType => Some(node_id.clone()),
            _ => None,
        };
        debug!(node_id = %node_id, class = %attributes.node_class.name(), "Root resolved");
        Ok(Frame::root(&attributes, type_definition))
    }

    async fn kind_of(
        &mut self,
        frame: &Frame,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeKind> {
        let Some(type_id) = frame.type_definition.clone().filter(|t| !t.is_null()) else {
            return Ok(NodeKind::classify(frame.node_class, &TypeHierarchy::default()));
        };
        if let Some(kind) = self.kinds.get(&type_id) {
            return Ok(*kind);
        }
        let hierarchy = self.expander.hierarchy.resolve(&type_id, cancel).await?;
        let kind = NodeKind::classify(frame.node_class, &hierarchy);
        self.kinds.insert(type_id, kind);
        Ok(kind)
    }

    /// Fills the root's object queue. Failures below the root are returned
    /// as branch errors; a failure at the root fails the root.
    async fn discover(
        &mut self,
        root: &mut RootState,
        mode: RootMode,
        table: &NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Vec<(ServiceDiagnostic, Frame)>> {
        let Some(root_frame) = root.frame.clone() else {
            return Ok(Vec::new());
        };
        let mut branch_errors = Vec::new();

        let result = match mode {
            RootMode::Variable => {
                root.objects.push_back(root_frame.clone());
                Ok(())
            }
            RootMode::Objects => {
                self.discover_objects(root, &root_frame, table, cancel, &mut branch_errors)
                    .await
            }
            RootMode::ObjectInstances | RootMode::VariableInstances => {
                self.discover_instances(root, &root_frame, mode, table, cancel)
                    .await
            }
        };
        match result {
            Ok(()) => {}
            Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
            Err(error) => {
                warn!(root = %root_frame.node_id, error = %error, "Discovery failed");
                root.errors.push(ServiceDiagnostic::from(&error));
                root.objects.clear();
                return Ok(branch_errors);
            }
        }

        if root.objects.is_empty() && root.groups.is_empty() && mode != RootMode::Variable {
            root.fail(StatusCode::BAD_NOT_FOUND, "No objects resolved.");
        }
        info!(
            root = %root_frame.node_id,
            objects = root.objects.len(),
            branch_errors = branch_errors.len(),
            "Discovery complete"
        );
        Ok(branch_errors)
    }

    async fn discover_objects(
        &mut self,
        root: &mut RootState,
        root_frame: &Frame,
        table: &NamespaceTable,
        cancel: &CancellationSignal,
        branch_errors: &mut Vec<(ServiceDiagnostic, Frame)>,
    ) -> OpcUaResult<()> {
        root.known.insert(root_frame.node_id.clone());
        if !self.policy.exclude_root_object {
            root.objects.push_back(root_frame.clone());
        }
        let max_depth = self.policy.max_depth;
        if max_depth == Some(0) {
            return Ok(());
        }

        let mut queue = VecDeque::from([(root_frame.clone(), 0u32)]);
        while let Some((frame, depth)) = queue.pop_front() {
            cancel.check()?;
            let children = match self
                .browser()
                .children(
                    &frame.node_id,
                    ids::HIERARCHICAL_REFERENCES,
                    &[NodeClass::Object],
                    cancel,
                )
                .await
            {
                Ok(children) => children,
                Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
                Err(error) if frame.node_id == root_frame.node_id => return Err(error),
                Err(error) => {
                    warn!(object = %frame.node_id, error = %error, "Branch skipped");
                    root.objects.retain(|o| o.node_id != frame.node_id);
                    branch_errors.push((ServiceDiagnostic::from(&error), frame));
                    continue;
                }
            };

            for reference in children {
                let Some(node_id) = reference.node_id.to_node_id(table) else {
                    continue;
                };
                if !root.known.insert(node_id.clone()) {
                    continue;
                }
                let child = frame.child(node_id, &reference, table);
                let kind = match self.kind_of(&child, cancel).await {
                    Ok(kind) => kind,
                    Err(OpcUaError::Cancelled) => return Err(OpcUaError::Cancelled),
                    Err(error) => {
                        branch_errors.push((ServiceDiagnostic::from(&error), child));
                        continue;
                    }
                };
                if !kind.is_container() {
                    debug!(node_id = %child.node_id, kind = ?kind, "Skipping non-container object");
                    continue;
                }
                root.objects.push_back(child.clone());
                if max_depth.map_or(true, |max| depth + 1 < max) {
                    queue.push_back((child, depth + 1));
                }
            }
        }
        Ok(())
    }

    async fn discover_instances(
        &mut self,
        root: &mut RootState,
        type_frame: &Frame,
        mode: RootMode,
        table: &NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<()> {
        let mut types = vec![type_frame.node_id.clone()];
        if !self.policy.no_subtypes {
            types.extend(
                self.expander
                    .hierarchy
                    .collect_subtypes(&type_frame.node_id, cancel)
                    .await?,
            );
        }

        let instance_class = if mode == RootMode::VariableInstances {
            NodeClass::Variable
        } else {
            NodeClass::Object
        };
        let objects = self.browser().read_attributes(&NodeId::OBJECTS_FOLDER).await?;
        let objects_frame = Frame::root(&objects, Some(ids::FOLDER_TYPE));
        // Matching variables are leaves of a single group rooted at the type.
        let mut variables = ObjectGroup::new(type_frame.clone());

        let mut visited = HashSet::from([NodeId::OBJECTS_FOLDER]);
        let mut queue = VecDeque::from([(objects_frame, 0u32)]);
        while let Some((frame, depth)) = queue.pop_front() {
            cancel.check()?;
            let children = self
                .browser()
                .children(
                    &frame.node_id,
                    ids::HIERARCHICAL_REFERENCES,
                    &[NodeClass::Object, instance_class],
                    cancel,
                )
                .await?;
            for reference in children {
                let Some(node_id) = reference.node_id.to_node_id(table) else {
                    continue;
                };
                if !visited.insert(node_id.clone()) {
                    continue;
                }
                let child = frame.child(node_id, &reference, table);
                let matches = reference.node_class == instance_class
                    && child.type_definition.as_ref().is_some_and(|t| types.contains(t));
                if matches {
                    match mode {
                        RootMode::VariableInstances => {
                            variables.add(Leaf {
                                node_id: child.node_id.clone(),
                                browse_name: child.browse_name.clone(),
                                type_definition: child.type_definition.clone(),
                                path: child.browse_path(),
                                method: None,
                            });
                            continue;
                        }
                        _ => {
                            root.known.insert(child.node_id.clone());
                            root.objects.push_back(child.clone());
                        }
                    }
                }
                if child.node_class == NodeClass::Object
                    && self.policy.max_depth.map_or(true, |max| depth + 1 < max)
                {
                    queue.push_back((child, depth + 1));
                }
            }
        }

        if !variables.is_empty() {
            root.groups.push(variables);
        }
        debug!(type_id = %type_frame.node_id, types = types.len(), "Instances discovered");
        Ok(())
    }

    /// Collects the leaves of one object (or variable root).
    ///
    /// Returns the group and, for type roots, nested object components to
    /// expand as objects of their own.
    async fn collect(
        &self,
        object: Frame,
        mode: RootMode,
        table: &NamespaceTable,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<(ObjectGroup, Vec<Frame>)> {
        let mut group = ObjectGroup::new(object.clone());
        let mut nested = Vec::new();

        if mode == RootMode::Variable && !self.policy.exclude_root_object {
            group.add(Leaf {
                node_id: object.node_id.clone(),
                browse_name: object.browse_name.clone(),
                type_definition: object.type_definition.clone(),
                path: String::new(),
                method: None,
            });
        }

        let mut classes = vec![NodeClass::Variable];
        if self.policy.include_methods && mode != RootMode::Variable {
            classes.push(NodeClass::Method);
        }
        if mode == RootMode::ObjectInstances {
            classes.push(NodeClass::Object);
        }

        let base = Frame {
            names: Vec::new(),
            ..object
        };
        let mut duplicates = 0usize;
        let mut stack = vec![(base, 0u32)];
        while let Some((frame, level)) = stack.pop() {
            if self.policy.levels_to_expand.is_some_and(|max| level >= max) {
                continue;
            }
            cancel.check()?;
            let children = self
                .browser()
                .children(&frame.node_id, ids::AGGREGATES, &classes, cancel)
                .await?;

            let mut descend = Vec::new();
            for reference in children {
                let Some(node_id) = reference.node_id.to_node_id(table) else {
                    continue;
                };
                let child = frame.child(node_id, &reference, table);
                match reference.node_class {
                    NodeClass::Object => {
                        // Nested objects keep their path from the instance root.
                        let mut names = group.frame.names.clone();
                        names.extend(child.names.iter().cloned());
                        nested.push(Frame { names, ..child });
                    }
                    NodeClass::Method => {
                        let method = self
                            .expander
                            .data_types
                            .method_metadata(&child.node_id, cancel)
                            .await?;
                        if !group.add(Leaf {
                            node_id: child.node_id.clone(),
                            browse_name: child.browse_name.clone(),
                            type_definition: None,
                            path: child.browse_path(),
                            method: Some(method),
                        }) {
                            duplicates += 1;
                        }
                    }
                    _ => {
                        if group.add(Leaf {
                            node_id: child.node_id.clone(),
                            browse_name: child.browse_name.clone(),
                            type_definition: child.type_definition.clone(),
                            path: child.browse_path(),
                            method: None,
                        }) {
                            descend.push((child, level + 1));
                        } else {
                            duplicates += 1;
                        }
                    }
                }
            }
            // Depth-first in browse order.
            stack.extend(descend.into_iter().rev());
        }

        if duplicates > 0 {
            debug!(object = %group.frame.node_id, duplicates, "Dropped duplicate items");
        }
        Ok((group, nested))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::StreamExt;

    use super::*;
    use crate::service::{MemoryNodeService, NodeBuilder};
    use crate::variant::BuiltInType;

    /// `Plant` with `count` boilers, each holding a temperature (with an
    /// EURange property) and a pressure variable.
    fn plant(count: u32) -> Arc<MemoryNodeService> {
        let service = MemoryNodeService::new();
        let ns = service.add_namespace("urn:test:plant");
        let boiler_type = service.insert(
            NodeBuilder::object_type(NodeId::numeric(ns, 1), "BoilerType").subtype_of(&ids::BASE_OBJECT_TYPE),
        );
        service.insert(
            NodeBuilder::object_type(NodeId::numeric(ns, 2), "SuperBoilerType").subtype_of(&boiler_type),
        );
        let plant = service.insert(
            NodeBuilder::object(NodeId::numeric(ns, 10), "Plant")
                .organized_by(&NodeId::OBJECTS_FOLDER)
                .type_definition(ids::FOLDER_TYPE),
        );
        for i in 0..count {
            let base = 100 + i * 10;
            let type_id = if i == 0 { NodeId::numeric(ns, 2) } else { boiler_type.clone() };
            let boiler = service.insert(
                NodeBuilder::object(NodeId::numeric(ns, base), &format!("Boiler{}", i))
                    .organized_by(&plant)
                    .type_definition(type_id),
            );
            let temp = service.insert(
                NodeBuilder::variable(NodeId::numeric(ns, base + 1), "Temperature", BuiltInType::Double.node_id())
                    .component_of(&boiler)
                    .type_definition(ids::BASE_DATA_VARIABLE_TYPE),
            );
            service.insert(
                NodeBuilder::variable(NodeId::numeric(ns, base + 2), "EURange", BuiltInType::String.node_id())
                    .property_of(&temp)
                    .type_definition(ids::PROPERTY_TYPE),
            );
            service.insert(
                NodeBuilder::variable(NodeId::numeric(ns, base + 3), "Pressure", BuiltInType::Double.node_id())
                    .component_of(&boiler)
                    .type_definition(ids::BASE_DATA_VARIABLE_TYPE),
            );
        }
        Arc::new(service)
    }

    fn expander(service: Arc<MemoryNodeService>) -> Expander<MemoryNodeService> {
        Expander::new(Browser::new(service))
    }

    fn entry(id: &str) -> PublishedNodesEntry {
        PublishedNodesEntry::new(vec![PublishedNode::from_id(id)])
    }

    #[tokio::test]
    async fn test_one_entry_per_object() {
        let results = expander(plant(3))
            .expand(entry("ns=1;i=10"), ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 3);
        let first = results[0].entry().unwrap();
        assert_eq!(first.data_set_name.as_deref(), Some("Boiler0"));
        assert_eq!(first.data_set_writer_id.as_deref(), Some("/1:Boiler0"));
        assert_eq!(first.data_set_writer_group.as_deref(), Some("Plant"));
        assert_eq!(first.opc_nodes.len(), 3);
        let field_ids: Vec<_> = first
            .opc_nodes
            .iter()
            .filter_map(|n| n.data_set_field_id.as_deref())
            .collect();
        assert_eq!(field_ids, vec!["/1:Temperature", "/1:Pressure", "/1:Temperature/1:EURange"]);
    }

    #[tokio::test]
    async fn test_single_writer() {
        let policy = ExpansionPolicy::default().with_single_writer(true);
        let results = expander(plant(4))
            .expand(entry("ns=1;i=10"), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        let nodes = &results[0].entry().unwrap().opc_nodes;
        assert_eq!(nodes.len(), 12);
        assert_eq!(nodes[0].data_set_field_id.as_deref(), Some("/1:Boiler0/1:Temperature"));
    }

    #[tokio::test]
    async fn test_levels_to_expand() {
        let policy = ExpansionPolicy::default()
            .with_single_writer(true)
            .with_levels_to_expand(Some(1));
        let results = expander(plant(2))
            .expand(entry("ns=1;i=10"), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results[0].entry().unwrap().opc_nodes.len(), 4);
    }

    #[tokio::test]
    async fn test_type_root_and_no_subtypes() {
        let service = plant(3);
        let results = expander(service.clone())
            .expand(entry("ns=1;i=1"), ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 3);

        let policy = ExpansionPolicy::default().with_no_subtypes(true);
        let results = expander(service)
            .expand(entry("ns=1;i=1"), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry().unwrap().data_set_name.as_deref(), Some("Plant.Boiler1"));
    }

    #[tokio::test]
    async fn test_variable_root() {
        let results = expander(plant(1))
            .expand(entry("ns=1;i=101"), ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        let nodes = &results[0].entry().unwrap().opc_nodes;
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id.as_deref(), Some("nsu=urn:test:plant;i=101"));
    }

    #[tokio::test]
    async fn test_error_containment() {
        let service = plant(3);
        service.fail_browse(&NodeId::numeric(1, 110));

        let results = expander(service.clone())
            .expand(entry("ns=1;i=10"), ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);

        let policy = ExpansionPolicy::default().with_discard_errors(true);
        let results = expander(service)
            .expand(entry("ns=1;i=10"), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_error()));
    }

    #[tokio::test]
    async fn test_unresolvable_and_unsupported_roots() {
        let entry = PublishedNodesEntry::new(vec![
            PublishedNode::from_id("ns=1;i=999"),
            PublishedNode::from_id(ids::HAS_COMPONENT.to_string()),
        ]);
        let results = expander(plant(1))
            .expand(entry, ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error_info().unwrap().status_code, StatusCode::BAD_NODE_ID_UNKNOWN);
        assert_eq!(results[1].error_info().unwrap().status_code, StatusCode::BAD_NOT_SUPPORTED);
        assert_eq!(results[1].entry(), None);
    }

    #[tokio::test]
    async fn test_no_objects_resolved() {
        let policy = ExpansionPolicy::default()
            .with_exclude_root_object(true)
            .with_max_depth(Some(0));
        let results = expander(plant(1))
            .expand(entry("ns=1;i=10"), policy, CancellationSignal::new())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        let error = results[0].error_info().unwrap();
        assert_eq!(error.status_code, StatusCode::BAD_NOT_FOUND);
        assert_eq!(error.message, "No objects resolved.");
    }

    #[tokio::test]
    async fn test_cancellation_ends_sequence() {
        let cancel = CancellationSignal::new();
        let mut expansion = expander(plant(5)).expand(entry("ns=1;i=10"), ExpansionPolicy::default(), cancel.clone());
        let first = expansion.next().await;
        assert!(first.is_some());
        cancel.cancel();
        assert!(expansion.next().await.is_none());
        assert!(expansion.is_done());
    }

    #[tokio::test]
    async fn test_stream() {
        let stream = expander(plant(2))
            .expand(entry("ns=1;i=10"), ExpansionPolicy::default(), CancellationSignal::new())
            .into_stream();
        let results: Vec<_> = stream.collect().await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_untyped_object_is_expanded() {
        let service = plant(1);
        let ns = 1;
        let area = service.insert(
            NodeBuilder::object(NodeId::numeric(ns, 500), "Area").organized_by(&NodeId::numeric(ns, 10)),
        );
        service.insert(
            NodeBuilder::variable(NodeId::numeric(ns, 501), "Level", BuiltInType::Double.node_id())
                .component_of(&area)
                .type_definition(ids::BASE_DATA_VARIABLE_TYPE),
        );

        let results = expander(service)
            .expand(entry("ns=1;i=10"), ExpansionPolicy::default(), CancellationSignal::new())
            .collect()
            .await;
        assert!(results.iter().all(|r| r.error_info().is_none()), "{:?}", results);
        assert_eq!(results.len(), 2);

        let area_entry = results
            .iter()
            .filter_map(ExpansionResult::entry)
            .find(|e| e.data_set_name.as_deref() == Some("Area"))
            .expect("entry for the untyped object");
        assert_eq!(area_entry.opc_nodes.len(), 1);
        assert_eq!(area_entry.data_set_writer_id.as_deref(), Some("/1:Area"));
        assert_eq!(area_entry.opc_nodes[0].data_set_field_id.as_deref(), Some("/1:Level"));
    }
}
