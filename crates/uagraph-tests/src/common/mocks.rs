// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! [`RecordingNodeService`] wraps any [`NodeService`] and records every call,
//! optionally delaying calls, failing the namespace table read, or firing a
//! [`CancellationSignal`] once a call budget is spent.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use uagraph_core::{
    BrowseRequest, BrowseResponse, CancellationSignal, ContinuationPoint, DataValue,
    NamespaceTable, NodeAttributes, NodeId, NodeService, OpcUaError, OpcUaResult, StatusCode,
    Variant,
};

// =============================================================================
// Recorded Calls
// =============================================================================

/// One call made through a [`RecordingNodeService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// `browse` of a node.
    Browse(NodeId),
    /// `browse_next`.
    BrowseNext,
    /// `release_continuation_point`.
    Release,
    /// `read_attributes` of a node.
    ReadAttributes(NodeId),
    /// `read_value` of a node.
    ReadValue(NodeId),
    /// `namespace_table`.
    NamespaceTable,
    /// `write` of a node.
    Write(NodeId),
}

// =============================================================================
// RecordingNodeService
// =============================================================================

/// A [`NodeService`] wrapper that records calls and injects faults.
pub struct RecordingNodeService<S: NodeService + ?Sized> {
    inner: Arc<S>,
    calls: Mutex<Vec<ServiceCall>>,
    call_count: AtomicUsize,
    latency_ms: AtomicU64,
    fail_namespace_table: AtomicBool,
    cancel_after: Mutex<Option<(usize, CancellationSignal)>>,
}

impl<S: NodeService + ?Sized> RecordingNodeService<S> {
    /// Wraps a service.
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
            latency_ms: AtomicU64::new(0),
            fail_namespace_table: AtomicBool::new(false),
            cancel_after: Mutex::new(None),
        }
    }

    /// Returns the wrapped service.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes `namespace_table` fail.
    pub fn set_fail_namespace_table(&self, fail: bool) {
        self.fail_namespace_table.store(fail, Ordering::SeqCst);
    }

    /// Cancels `signal` when the `calls`-th call is made.
    pub fn cancel_after_calls(&self, calls: usize, signal: CancellationSignal) {
        *self.cancel_after.lock() = Some((calls, signal));
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Returns the number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ServiceCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Returns the number of browse calls on `node_id`.
    pub fn browse_count(&self, node_id: &NodeId) -> usize {
        self.count(|c| matches!(c, ServiceCall::Browse(id) if id == node_id))
    }

    /// Forgets recorded calls.
    pub fn reset(&self) {
        self.calls.lock().clear();
        self.call_count.store(0, Ordering::SeqCst);
    }

    async fn record(&self, call: ServiceCall) {
        self.calls.lock().push(call);
        let count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((budget, signal)) = self.cancel_after.lock().as_ref() {
            if count >= *budget {
                signal.cancel();
            }
        }

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }
}

#[async_trait]
impl<S: NodeService + ?Sized> NodeService for RecordingNodeService<S> {
    async fn browse(&self, request: &BrowseRequest) -> OpcUaResult<BrowseResponse> {
        self.record(ServiceCall::Browse(request.node_id.clone())).await;
        self.inner.browse(request).await
    }

    async fn browse_next(
        &self,
        continuation_point: &ContinuationPoint,
    ) -> OpcUaResult<BrowseResponse> {
        self.record(ServiceCall::BrowseNext).await;
        self.inner.browse_next(continuation_point).await
    }

    async fn release_continuation_point(
        &self,
        continuation_point: &ContinuationPoint,
    ) -> OpcUaResult<()> {
        self.record(ServiceCall::Release).await;
        self.inner.release_continuation_point(continuation_point).await
    }

    async fn read_attributes(&self, node_id: &NodeId) -> OpcUaResult<NodeAttributes> {
        self.record(ServiceCall::ReadAttributes(node_id.clone())).await;
        self.inner.read_attributes(node_id).await
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<DataValue> {
        self.record(ServiceCall::ReadValue(node_id.clone())).await;
        self.inner.read_value(node_id).await
    }

    async fn namespace_table(&self) -> OpcUaResult<NamespaceTable> {
        self.record(ServiceCall::NamespaceTable).await;
        if self.fail_namespace_table.load(Ordering::SeqCst) {
            return Err(OpcUaError::browse_failed(
                "ns=0;i=2255",
                "namespace array unavailable",
            ));
        }
        self.inner.namespace_table().await
    }

    async fn write(
        &self,
        node_id: &NodeId,
        value: &Variant,
        index_range: Option<&str>,
    ) -> OpcUaResult<StatusCode> {
        self.record(ServiceCall::Write(node_id.clone())).await;
        self.inner.write(node_id, value, index_range).await
    }

    fn display_name(&self) -> String {
        format!("recording({})", self.inner.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uagraph_core::MemoryNodeService;

    #[tokio::test]
    async fn test_records_calls() {
        let service = RecordingNodeService::new(Arc::new(MemoryNodeService::new()));
        service.read_attributes(&NodeId::OBJECTS_FOLDER).await.unwrap();
        service
            .browse(&BrowseRequest::new(NodeId::OBJECTS_FOLDER))
            .await
            .unwrap();

        assert_eq!(service.call_count(), 2);
        assert_eq!(service.browse_count(&NodeId::OBJECTS_FOLDER), 1);
        assert_eq!(
            service.calls()[0],
            ServiceCall::ReadAttributes(NodeId::OBJECTS_FOLDER)
        );

        service.reset();
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_calls() {
        let service = RecordingNodeService::new(Arc::new(MemoryNodeService::new()));
        let signal = CancellationSignal::new();
        service.cancel_after_calls(2, signal.clone());

        service.namespace_table().await.unwrap();
        assert!(!signal.is_cancelled());
        service.namespace_table().await.unwrap();
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_fail_namespace_table() {
        let service = RecordingNodeService::new(Arc::new(MemoryNodeService::new()));
        service.set_fail_namespace_table(true);
        assert!(service.namespace_table().await.is_err());
        assert!(service.display_name().starts_with("recording("));
    }
}
