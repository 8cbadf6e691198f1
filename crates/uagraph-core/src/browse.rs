// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Paged browsing on top of a [`NodeService`].
//!
//! Every resolver in this crate walks the address space through a
//! [`Browser`], which follows continuation points transparently and checks
//! the caller's cancellation signal between pages.
//!
//! ```text
//! Browser::browse_all
//!     │
//!     ├── NodeService::browse ─────────┐
//!     │                                │  continuation point?
//!     ├── NodeService::browse_next ◄───┘  (up to max_continuations)
//!     │
//!     └── NodeService::release_continuation_point  (on cancellation or failure)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cancel::CancellationSignal;
use crate::error::{BrowseError, OpcUaResult};
use crate::service::{
    BrowseRequest, ContinuationPoint, NodeAttributes, NodeService, ReferenceDescription,
};
use crate::types::{ids, BrowseDirection, NamespaceTable, NodeClass, NodeId};

// =============================================================================
// BrowseOptions
// =============================================================================

/// Paging options applied to every browse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseOptions {
    /// Requested references per page (0 = server default).
    pub max_references_per_node: u32,

    /// Maximum continuation points followed for one node.
    pub max_continuations: usize,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            max_references_per_node: 0,
            max_continuations: 10_000,
        }
    }
}

impl BrowseOptions {
    /// Sets the requested page size.
    pub fn with_max_references_per_node(mut self, max: u32) -> Self {
        self.max_references_per_node = max;
        self
    }

    /// Sets the continuation limit.
    pub fn with_max_continuations(mut self, max: usize) -> Self {
        self.max_continuations = max;
        self
    }
}

// =============================================================================
// BrowseStatistics
// =============================================================================

/// Counters shared by all clones of a [`Browser`].
#[derive(Debug, Default)]
pub struct BrowseStatistics {
    requests: AtomicU64,
    continuations: AtomicU64,
    references: AtomicU64,
    attribute_reads: AtomicU64,
}

/// A point-in-time copy of [`BrowseStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrowseStatisticsSnapshot {
    /// Browse calls.
    pub requests: u64,
    /// BrowseNext calls.
    pub continuations: u64,
    /// References received.
    pub references: u64,
    /// Attribute reads.
    pub attribute_reads: u64,
}

impl BrowseStatistics {
    /// Returns the current counter values.
    pub fn snapshot(&self) -> BrowseStatisticsSnapshot {
        BrowseStatisticsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            continuations: self.continuations.load(Ordering::Relaxed),
            references: self.references.load(Ordering::Relaxed),
            attribute_reads: self.attribute_reads.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Browser
// =============================================================================

/// Paging browse helper shared by the resolvers.
pub struct Browser<S: NodeService + ?Sized> {
    service: Arc<S>,
    options: BrowseOptions,
    stats: Arc<BrowseStatistics>,
}

impl<S: NodeService + ?Sized> Clone for Browser<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            options: self.options,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<S: NodeService + ?Sized> std::fmt::Debug for Browser<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("service", &self.service.display_name())
            .field("options", &self.options)
            .finish()
    }
}

impl<S: NodeService + ?Sized> Browser<S> {
    /// Creates a browser with default options.
    pub fn new(service: Arc<S>) -> Self {
        Self::with_options(service, BrowseOptions::default())
    }

    /// Creates a browser with the given options.
    pub fn with_options(service: Arc<S>, options: BrowseOptions) -> Self {
        Self {
            service,
            options,
            stats: Arc::new(BrowseStatistics::default()),
        }
    }

    /// Returns the underlying service.
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Returns the paging options.
    pub fn options(&self) -> &BrowseOptions {
        &self.options
    }

    /// Returns the counters.
    pub fn statistics(&self) -> BrowseStatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Browses `request` and follows continuation points until the last page.
    ///
    /// On cancellation the pending continuation point is released and
    /// `OpcUaError::Cancelled` is returned. A failed page also releases it.
    pub async fn browse_all(
        &self,
        request: BrowseRequest,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        cancel.check()?;
        let request = if request.max_references == 0 {
            request.with_max_references(self.options.max_references_per_node)
        } else {
            request
        };

        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        let mut response = self.service.browse(&request).await?;
        let mut references = std::mem::take(&mut response.references);
        let mut continuations = 0usize;

        while let Some(cp) = response.continuation_point.take() {
            if cancel.is_cancelled() {
                self.release(&request.node_id, &cp).await;
                cancel.check()?;
            }
            if continuations >= self.options.max_continuations {
                self.release(&request.node_id, &cp).await;
                return Err(BrowseError::continuation_limit(
                    request.node_id.to_string(),
                    self.options.max_continuations,
                )
                .into());
            }
            continuations += 1;
            self.stats.continuations.fetch_add(1, Ordering::Relaxed);
            trace!(node_id = %request.node_id, page = continuations, "Following continuation point");
            response = match self.service.browse_next(&cp).await {
                Ok(response) => response,
                Err(error) => {
                    self.release(&request.node_id, &cp).await;
                    return Err(error);
                }
            };
            references.append(&mut response.references);
        }

        self.stats
            .references
            .fetch_add(references.len() as u64, Ordering::Relaxed);
        debug!(
            node_id = %request.node_id,
            references = references.len(),
            pages = continuations + 1,
            "Browse complete"
        );
        Ok(references)
    }

    async fn release(&self, node_id: &NodeId, cp: &ContinuationPoint) {
        if let Err(error) = self.service.release_continuation_point(cp).await {
            debug!(node_id = %node_id, error = %error, "Continuation point release failed");
        }
    }

    /// Returns forward references of `reference_type` (and subtypes) from `node_id`.
    pub async fn children(
        &self,
        node_id: &NodeId,
        reference_type: NodeId,
        node_classes: &[NodeClass],
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Vec<ReferenceDescription>> {
        let request = BrowseRequest::new(node_id.clone())
            .with_reference_type(reference_type, true)
            .with_node_classes(node_classes);
        self.browse_all(request, cancel).await
    }

    /// Returns the target of the node's `HasTypeDefinition` reference.
    pub async fn type_definition(
        &self,
        node_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Option<NodeId>> {
        let request = BrowseRequest::new(node_id.clone())
            .with_reference_type(ids::HAS_TYPE_DEFINITION, false);
        let table = self.namespace_table().await?;
        Ok(self
            .browse_all(request, cancel)
            .await?
            .into_iter()
            .find_map(|r| r.node_id.to_node_id(&table)))
    }

    /// Returns the immediate supertype of a type node.
    ///
    /// Remote supertypes (non-zero server index) are treated as absent.
    pub async fn supertype(
        &self,
        type_id: &NodeId,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<Option<ReferenceDescription>> {
        let request = BrowseRequest::new(type_id.clone())
            .with_direction(BrowseDirection::Inverse)
            .with_reference_type(ids::HAS_SUBTYPE, false);
        Ok(self
            .browse_all(request, cancel)
            .await?
            .into_iter()
            .find(|r| r.node_id.is_local()))
    }

    /// Reads the attributes of a node.
    pub async fn read_attributes(&self, node_id: &NodeId) -> OpcUaResult<NodeAttributes> {
        self.stats.attribute_reads.fetch_add(1, Ordering::Relaxed);
        self.service.read_attributes(node_id).await
    }

    /// Reads the namespace table.
    pub async fn namespace_table(&self) -> OpcUaResult<NamespaceTable> {
        self.service.namespace_table().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpcUaError;
    use crate::service::{BrowseResponse, DataValue, MemoryNodeService, NodeBuilder};
    use crate::status::StatusCode;
    use crate::variant::Variant;
    use async_trait::async_trait;

    fn wide_folder(count: u32, page: usize) -> (Arc<MemoryNodeService>, NodeId) {
        let service = MemoryNodeService::new().with_page_size(page);
        let folder = service.insert(
            NodeBuilder::object(NodeId::numeric(1, 1), "Wide").organized_by(&NodeId::OBJECTS_FOLDER),
        );
        for i in 0..count {
            service.insert(
                NodeBuilder::object(NodeId::numeric(1, 100 + i), &format!("Child{}", i)).organized_by(&folder),
            );
        }
        (Arc::new(service), folder)
    }

    #[tokio::test]
    async fn test_browse_all_follows_continuations() {
        let (service, folder) = wide_folder(25, 4);
        let browser = Browser::new(Arc::clone(&service));
        let refs = browser
            .children(&folder, ids::HIERARCHICAL_REFERENCES, &[], &CancellationSignal::new())
            .await
            .unwrap();
        assert_eq!(refs.len(), 25);
        let stats = browser.statistics();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.continuations, 6);
        assert_eq!(service.open_continuation_points(), 0);
    }

    #[tokio::test]
    async fn test_continuation_limit() {
        let (service, folder) = wide_folder(10, 2);
        let browser = Browser::with_options(service.clone(), BrowseOptions::default().with_max_continuations(2));
        let result = browser
            .children(&folder, ids::ORGANIZES, &[], &CancellationSignal::new())
            .await;
        assert!(matches!(
            result,
            Err(OpcUaError::Browse(BrowseError::ContinuationLimitExceeded { max: 2, .. }))
        ));
        assert_eq!(service.open_continuation_points(), 0);
    }

    /// Pages through `inner` but fails every `browse_next`.
    struct FailingPages {
        inner: Arc<MemoryNodeService>,
        releases: AtomicU64,
    }

    #[async_trait]
    impl NodeService for FailingPages {
        async fn browse(&self, request: &BrowseRequest) -> OpcUaResult<BrowseResponse> {
            self.inner.browse(request).await
        }

        async fn browse_next(&self, _continuation_point: &ContinuationPoint) -> OpcUaResult<BrowseResponse> {
            Err(OpcUaError::browse_failed("ns=1;i=1", "connection lost"))
        }

        async fn release_continuation_point(&self, continuation_point: &ContinuationPoint) -> OpcUaResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.inner.release_continuation_point(continuation_point).await
        }

        async fn read_attributes(&self, node_id: &NodeId) -> OpcUaResult<NodeAttributes> {
            self.inner.read_attributes(node_id).await
        }

        async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<DataValue> {
            self.inner.read_value(node_id).await
        }

        async fn namespace_table(&self) -> OpcUaResult<NamespaceTable> {
            self.inner.namespace_table().await
        }

        async fn write(&self, node_id: &NodeId, value: &Variant, index_range: Option<&str>) -> OpcUaResult<StatusCode> {
            self.inner.write(node_id, value, index_range).await
        }

        fn display_name(&self) -> String {
            "failing-pages".to_string()
        }
    }

    #[tokio::test]
    async fn test_failed_page_releases_continuation_point() {
        let (inner, folder) = wide_folder(10, 3);
        let service = Arc::new(FailingPages {
            inner: Arc::clone(&inner),
            releases: AtomicU64::new(0),
        });
        let browser = Browser::new(service.clone());

        let result = browser
            .children(&folder, ids::ORGANIZES, &[], &CancellationSignal::new())
            .await;
        assert!(matches!(result, Err(OpcUaError::Browse(_))));
        assert_eq!(service.releases.load(Ordering::SeqCst), 1);
        assert_eq!(inner.open_continuation_points(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_browse() {
        let (service, folder) = wide_folder(3, 0);
        let browser = Browser::new(service.clone());
        let cancel = CancellationSignal::new();
        cancel.cancel();
        let result = browser.children(&folder, ids::ORGANIZES, &[], &cancel).await;
        assert!(matches!(result, Err(OpcUaError::Cancelled)));
        assert_eq!(service.stats().browse, 0);
    }

    #[tokio::test]
    async fn test_type_definition_and_supertype() {
        let service = Arc::new(MemoryNodeService::new());
        let browser = Browser::new(service);
        let cancel = CancellationSignal::new();
        let td = browser.type_definition(&NodeId::OBJECTS_FOLDER, &cancel).await.unwrap();
        assert_eq!(td, Some(ids::FOLDER_TYPE));
        let parent = browser.supertype(&ids::FOLDER_TYPE, &cancel).await.unwrap().unwrap();
        assert_eq!(parent.node_id.node_id, ids::BASE_OBJECT_TYPE);
        assert!(browser.supertype(&ids::BASE_OBJECT_TYPE, &cancel).await.unwrap().is_none());
    }
}
