// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! One handle over every engine operation.
//!
//! ```rust,ignore
//! let engine = NodeEngine::new(Arc::new(MemoryNodeService::new()));
//! let cancel = CancellationSignal::new();
//! let metadata = engine.get_metadata(&NodeId::OBJECTS_FOLDER, &cancel).await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::browse::{BrowseOptions, BrowseStatisticsSnapshot, Browser};
use crate::cancel::CancellationSignal;
use crate::codec::{CodecOptions, ValueCodec};
use crate::declarations::{DeclarationAggregator, DeclarationSet};
use crate::error::OpcUaResult;
use crate::expand::{Expander, Expansion, ExpansionPolicy, PublishedNodesEntry};
use crate::hierarchy::{TypeHierarchy, TypeHierarchyResolver};
use crate::metadata::{DataTypeResolver, MetadataResolver, NodeMetadata};
use crate::path::{PathResolver, RelativePath};
use crate::service::NodeService;
use crate::types::NodeId;
use crate::value::{DataTypeTag, GenericValue, ValueRank};
use crate::variant::Variant;
use crate::write::{
    ValueReadRequest, ValueReadResponse, ValueWriteRequest, ValueWriteResponse, ValueWriter,
};

/// Options for a [`NodeEngine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Browse paging.
    pub browse: BrowseOptions,
    /// Codec settings.
    pub codec: CodecOptions,
    /// Default expansion policy.
    pub expansion: ExpansionPolicy,
}

impl EngineOptions {
    /// Sets the browse options.
    pub fn with_browse(mut self, browse: BrowseOptions) -> Self {
        self.browse = browse;
        self
    }

    /// Sets the codec options.
    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the default expansion policy.
    pub fn with_expansion(mut self, expansion: ExpansionPolicy) -> Self {
        self.expansion = expansion;
        self
    }
}

/// The engine: resolvers, expander and writer over one node service.
pub struct NodeEngine<S: NodeService + ?Sized> {
    options: EngineOptions,
    browser: Browser<S>,
    codec: ValueCodec,
    hierarchy: TypeHierarchyResolver<S>,
    declarations: DeclarationAggregator<S>,
    metadata: MetadataResolver<S>,
    data_types: DataTypeResolver<S>,
    paths: PathResolver<S>,
    expander: Expander<S>,
    writer: ValueWriter<S>,
}

impl<S: NodeService + ?Sized> Clone for NodeEngine<S> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            browser: self.browser.clone(),
            codec: self.codec.clone(),
            hierarchy: self.hierarchy.clone(),
            declarations: self.declarations.clone(),
            metadata: self.metadata.clone(),
            data_types: self.data_types.clone(),
            paths: self.paths.clone(),
            expander: self.expander.clone(),
            writer: self.writer.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> std::fmt::Debug for NodeEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeEngine")
            .field("service", &self.browser.service().display_name())
            .field("options", &self.options)
            .finish()
    }
}

impl<S: NodeService + ?Sized> NodeEngine<S> {
    /// Creates an engine with default options.
    pub fn new(service: Arc<S>) -> Self {
        Self::with_options(service, EngineOptions::default())
    }

    /// Creates an engine.
    pub fn with_options(service: Arc<S>, options: EngineOptions) -> Self {
        let browser = Browser::with_options(service, options.browse);
        let codec = ValueCodec::new(options.codec.clone());
        Self {
            hierarchy: TypeHierarchyResolver::new(browser.clone()),
            declarations: DeclarationAggregator::new(browser.clone()),
            metadata: MetadataResolver::new(browser.clone()),
            data_types: DataTypeResolver::new(browser.clone()),
            paths: PathResolver::new(browser.clone()),
            expander: Expander::new(browser.clone()),
            writer: ValueWriter::new(browser.clone(), codec.clone()),
            codec,
            browser,
            options,
        }
    }

    /// Returns the options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the node service.
    pub fn service(&self) -> &Arc<S> {
        self.browser.service()
    }

    /// Returns browse counters accumulated by this engine.
    pub fn statistics(&self) -> BrowseStatisticsSnapshot {
        self.browser.statistics()
    }

    /// Expands an entry with the default policy.
    pub fn expand(&self, entry: PublishedNodesEntry, cancel: CancellationSignal) -> Expansion<S> {
        self.expander.expand(entry, self.options.expansion.clone(), cancel)
    }

    /// Expands an entry with an explicit policy.
    pub fn expand_with(
        &self,
        entry: PublishedNodesEntry,
        policy: ExpansionPolicy,
        cancel: CancellationSignal,
    ) -> Expansion<S> {
        self.expander.expand(entry, policy, cancel)
    }

    /// Resolves the metadata of a node.
    pub async fn get_metadata(
        &self,
        node_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeMetadata> {
        self.metadata.get_metadata(node_id, cancel).await
    }

    /// Resolves the supertype chain of a type.
    pub async fn resolve_hierarchy(
        &self,
        type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<TypeHierarchy> {
        self.hierarchy.resolve(type_id, cancel).await
    }

    /// Aggregates the instance declarations of a type.
    pub async fn aggregate_declarations(
        &self,
        type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<DeclarationSet> {
        let hierarchy = self.hierarchy.resolve(type_id, cancel).await?;
        self.declarations.aggregate(&hierarchy, cancel).await
    }

    /// Resolves a data type to its codec tag.
    pub async fn resolve_data_type(
        &self,
        data_type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<DataTypeTag> {
        self.data_types.resolve(data_type_id, cancel).await
    }

    /// Resolves path segments from `start` (null = RootFolder).
    pub async fn resolve_path<T: AsRef<str>>(
        &self,
        start: &NodeId,
        segments: &[T],
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        self.paths.resolve_segments(start, segments, cancel).await
    }

    /// Resolves a parsed relative path.
    pub async fn resolve_relative_path(
        &self,
        start: &NodeId,
        path: &RelativePath,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        self.paths.resolve(start, path, cancel).await
    }

    /// Writes a value.
    pub async fn write(
        &self,
        request: &ValueWriteRequest,
        cancel: &CancellationSignal,
    ) -> ValueWriteResponse {
        self.writer.write(request, cancel).await
    }

    /// Reads a value.
    pub async fn read(
        &self,
        request: &ValueReadRequest,
        cancel: &CancellationSignal,
    ) -> ValueReadResponse {
        self.writer.read(request, cancel).await
    }

    /// Encodes a value without touching the server.
    pub fn encode(&self, value: &GenericValue, tag: &DataTypeTag, rank: ValueRank) -> OpcUaResult<Variant> {
        self.codec.encode(value, tag, rank)
    }

    /// Decodes a variant.
    pub fn decode(&self, variant: &Variant, tag: &DataTypeTag) -> OpcUaResult<GenericValue> {
        self.codec.decode(variant, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::PublishedNode;
    use crate::service::{MemoryNodeService, NodeBuilder};
    use crate::types::ids;
    use crate::variant::BuiltInType;
    use crate::write::NodeTarget;

    fn engine() -> NodeEngine<MemoryNodeService> {
        let service = MemoryNodeService::new().with_page_size(2);
        let ns = service.add_namespace("urn:test:engine");
        let device = service.insert(
            NodeBuilder::object(NodeId::numeric(ns, 1), "Device")
                .organized_by(&NodeId::OBJECTS_FOLDER)
                .type_definition(ids::BASE_OBJECT_TYPE),
        );
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            service.insert(
                NodeBuilder::variable(NodeId::numeric(ns, 10 + i as u32), name, BuiltInType::Int32.node_id())
                    .component_of(&device),
            );
        }
        let options = EngineOptions::default().with_expansion(ExpansionPolicy::default().with_single_writer(true));
        NodeEngine::with_options(Arc::new(service), options)
    }

    #[tokio::test]
    async fn test_engine_operations() {
        let engine = engine();
        let cancel = CancellationSignal::new();

        let node = engine.resolve_path(&NodeId::NULL, &["Objects", "1:Device", "1:B"], &cancel).await.unwrap();
        assert_eq!(node, NodeId::numeric(1, 11));

        let response = engine
            .write(&ValueWriteRequest::new(NodeTarget::node(node.clone()), 7i32), &cancel)
            .await;
        assert!(response.is_ok());
        let read = engine
            .read(&ValueReadRequest { target: NodeTarget::node(node), data_type: None }, &cancel)
            .await;
        assert_eq!(read.value, Some(GenericValue::Int32(7)));

        let results = engine
            .expand(PublishedNodesEntry::new(vec![PublishedNode::from_id("ns=1;i=1")]), cancel.clone())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry().unwrap().opc_nodes.len(), 3);
        assert!(engine.statistics().continuations > 0);
    }

    #[tokio::test]
    async fn test_engine_types() {
        let engine = engine();
        let cancel = CancellationSignal::new();
        let hierarchy = engine.resolve_hierarchy(&ids::FOLDER_TYPE, &cancel).await.unwrap();
        assert!(hierarchy.is_empty());
        let tag = engine.resolve_data_type(&BuiltInType::Int32.node_id(), &cancel).await.unwrap();
        assert_eq!(tag, DataTypeTag::BuiltIn(BuiltInType::Int32));
        let variant = engine.encode(&GenericValue::Int32(1), &tag, ValueRank::SCALAR).unwrap();
        assert_eq!(engine.decode(&variant, &tag).unwrap(), GenericValue::Int32(1));
    }
}
