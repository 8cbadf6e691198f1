// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Runs a test body against a [`NodeEngine`] with a fresh cancellation
//! signal, an optional temp directory and an overall timeout.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use uagraph_core::{
    CancellationSignal, EngineOptions, ExpansionPolicy, ExpansionResult, NodeEngine, NodeService,
    PublishedNodesEntry,
};

use super::{init_test_logging, temp_test_dir};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the test harness.
#[derive(Debug, Clone)]
pub struct TestHarnessConfig {
    /// Name of the test (used for logging and temp directories).
    pub test_name: String,

    /// Timeout for the entire test.
    pub timeout: Duration,

    /// Engine options.
    pub options: EngineOptions,

    /// Whether to create a temp directory for the test.
    pub create_temp_dir: bool,

    /// Whether to enable tracing for the test.
    pub enable_tracing: bool,
}

impl Default for TestHarnessConfig {
    fn default() -> Self {
        Self {
            test_name: "unknown_test".to_string(),
            timeout: Duration::from_secs(30),
            options: EngineOptions::default(),
            create_temp_dir: false,
            enable_tracing: false,
        }
    }
}

impl TestHarnessConfig {
    /// Create a new config with a test name.
    pub fn new(test_name: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            ..Default::default()
        }
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the engine options.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Create a temp directory for the test.
    pub fn with_temp_dir(mut self) -> Self {
        self.create_temp_dir = true;
        self
    }

    /// Enable tracing.
    pub fn with_tracing(mut self) -> Self {
        self.enable_tracing = true;
        self
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Resources handed to a harnessed test.
pub struct TestResources<S: NodeService + ?Sized> {
    /// Configuration used to create the resources.
    pub config: TestHarnessConfig,

    /// Engine over the test service.
    pub engine: NodeEngine<S>,

    /// Cancellation signal for the test's operations.
    pub cancel: CancellationSignal,

    temp_dir: Option<TempDir>,
}

impl<S: NodeService + ?Sized> TestResources<S> {
    /// Get the temp directory path.
    pub fn temp_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().to_path_buf())
    }

    /// Returns the service under test.
    pub fn service(&self) -> &Arc<S> {
        self.engine.service()
    }

    /// Expands `entry` with the configured policy and collects the results.
    pub async fn expand(&self, entry: PublishedNodesEntry) -> Vec<ExpansionResult> {
        self.engine.expand(entry, self.cancel.clone()).collect().await
    }

    /// Expands `entry` with `policy` and collects the results.
    pub async fn expand_with(
        &self,
        entry: PublishedNodesEntry,
        policy: ExpansionPolicy,
    ) -> Vec<ExpansionResult> {
        self.engine
            .expand_with(entry, policy, self.cancel.clone())
            .collect()
            .await
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Runs harnessed tests.
#[derive(Debug, Clone)]
pub struct TestHarness {
    config: TestHarnessConfig,
}

impl TestHarness {
    /// Creates a harness.
    pub fn new(config: TestHarnessConfig) -> Self {
        Self { config }
    }

    /// Creates a harness with default settings.
    pub fn with_name(test_name: impl Into<String>) -> Self {
        Self::new(TestHarnessConfig::new(test_name))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TestHarnessConfig {
        &self.config
    }

    /// Builds the resources for `service`.
    pub fn resources<S: NodeService + ?Sized>(&self, service: Arc<S>) -> TestResources<S> {
        if self.config.enable_tracing {
            init_test_logging();
        }
        let temp_dir = self
            .config
            .create_temp_dir
            .then(|| temp_test_dir(&format!("uagraph_{}_", self.config.test_name)));
        TestResources {
            config: self.config.clone(),
            engine: NodeEngine::with_options(service, self.config.options.clone()),
            cancel: CancellationSignal::new(),
            temp_dir,
        }
    }

    /// Runs `test` against `service`, panicking if it exceeds the timeout.
    pub async fn run<S, F, Fut>(&self, service: Arc<S>, test: F)
    where
        S: NodeService + ?Sized,
        F: FnOnce(TestResources<S>) -> Fut,
        Fut: Future<Output = ()>,
    {
        let resources = self.resources(service);
        let cancel = resources.cancel.clone();
        let outcome = tokio::time::timeout(self.config.timeout, test(resources)).await;
        if outcome.is_err() {
            cancel.cancel();
            panic!(
                "Test '{}' timed out after {:?}",
                self.config.test_name, self.config.timeout
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::AddressSpaceFixtures;

    #[tokio::test]
    async fn test_harness_runs_body() {
        let fixture = AddressSpaceFixtures::sensors(2);
        let harness = TestHarness::new(TestHarnessConfig::new("harness").with_temp_dir());
        harness
            .run(fixture.service.clone(), |resources| async move {
                assert!(resources.temp_path().is_some());
                let results = resources.expand(fixture.root_entry()).await;
                assert_eq!(results.len(), 2);
            })
            .await;
    }

    #[tokio::test]
    #[should_panic(expected = "timed out")]
    async fn test_harness_timeout() {
        let fixture = AddressSpaceFixtures::sensors(1);
        let harness = TestHarness::new(
            TestHarnessConfig::new("timeout").timeout(Duration::from_millis(10)),
        );
        harness
            .run(fixture.service, |_resources| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
            })
            .await;
    }
}
