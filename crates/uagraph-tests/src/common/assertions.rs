// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertion extensions that print the offending results on failure.

use std::collections::HashSet;

use uagraph_core::{
    ExpansionResult, PublishedNodesEntry, ServiceDiagnostic, StatusCode, ValueReadResponse,
    ValueWriteResponse,
};

// =============================================================================
// Expansion Assertions
// =============================================================================

/// Assertion extensions for a collected expansion.
pub trait ExpansionAssertions {
    /// Returns the successful entries.
    fn entries(&self) -> Vec<&PublishedNodesEntry>;

    /// Returns the error diagnostics.
    fn errors(&self) -> Vec<&ServiceDiagnostic>;

    /// Returns the node count over all entries.
    fn total_nodes(&self) -> usize;

    /// Assert the number of successful entries.
    fn assert_entry_count(&self, expected: usize);

    /// Assert the number of error results.
    fn assert_error_count(&self, expected: usize);

    /// Assert there are no error results.
    fn assert_no_errors(&self);

    /// Assert no node id appears twice within any entry.
    fn assert_unique_nodes(&self);
}

impl ExpansionAssertions for [ExpansionResult] {
    fn entries(&self) -> Vec<&PublishedNodesEntry> {
        self.iter().filter_map(ExpansionResult::entry).collect()
    }

    fn errors(&self) -> Vec<&ServiceDiagnostic> {
        self.iter().filter_map(ExpansionResult::error_info).collect()
    }

    fn total_nodes(&self) -> usize {
        self.entries().iter().map(|e| e.opc_nodes.len()).sum()
    }

    fn assert_entry_count(&self, expected: usize) {
        let actual = self.entries().len();
        assert_eq!(
            actual,
            expected,
            "Expected {} entries, but got {} (errors: {:?})",
            expected,
            actual,
            self.errors()
        );
    }

    fn assert_error_count(&self, expected: usize) {
        let actual = self.errors().len();
        assert_eq!(
            actual, expected,
            "Expected {} errors, but got {}: {:?}",
            expected, actual, self.errors()
        );
    }

    fn assert_no_errors(&self) {
        self.assert_error_count(0);
    }

    fn assert_unique_nodes(&self) {
        for entry in self.entries() {
            let mut seen = HashSet::new();
            for node in &entry.opc_nodes {
                assert!(
                    seen.insert(node.id.clone()),
                    "Node {:?} appears twice in writer {:?}",
                    node.id,
                    entry.data_set_writer_id
                );
            }
        }
    }
}

// =============================================================================
// Entry Assertions
// =============================================================================

/// Assertion extensions for an expanded entry.
pub trait EntryAssertions {
    /// Returns the node ids of the entry.
    fn node_ids(&self) -> Vec<String>;

    /// Returns the field ids of the entry.
    fn field_ids(&self) -> Vec<String>;

    /// Assert the number of nodes.
    fn assert_node_count(&self, expected: usize);

    /// Assert the writer id.
    fn assert_writer_id(&self, expected: &str);
}

impl EntryAssertions for PublishedNodesEntry {
    fn node_ids(&self) -> Vec<String> {
        self.opc_nodes.iter().filter_map(|n| n.id.clone()).collect()
    }

    fn field_ids(&self) -> Vec<String> {
        self.opc_nodes
            .iter()
            .filter_map(|n| n.data_set_field_id.clone())
            .collect()
    }

    fn assert_node_count(&self, expected: usize) {
        assert_eq!(
            self.opc_nodes.len(),
            expected,
            "Expected {} nodes in writer {:?}, but got {:?}",
            expected,
            self.data_set_writer_id,
            self.field_ids()
        );
    }

    fn assert_writer_id(&self, expected: &str) {
        assert_eq!(
            self.data_set_writer_id.as_deref(),
            Some(expected),
            "Unexpected writer id for data set {:?}",
            self.data_set_name
        );
    }
}

// =============================================================================
// Operation Assertions
// =============================================================================

/// Assertion extensions for responses that may carry a diagnostic.
pub trait DiagnosticAssertions {
    /// Returns the diagnostic, if any.
    fn diagnostic(&self) -> Option<&ServiceDiagnostic>;

    /// Assert the operation succeeded.
    fn assert_ok(&self) {
        if let Some(error) = self.diagnostic() {
            panic!(
                "Expected success, but got {} ({}): {}",
                error.symbolic_id,
                error.error_code.as_deref().unwrap_or("-"),
                error.message
            );
        }
    }

    /// Assert the operation failed with `status`.
    fn assert_status(&self, status: StatusCode) {
        match self.diagnostic() {
            Some(error) => assert_eq!(
                error.status_code, status,
                "Expected {}, but got {}: {}",
                status.name(),
                error.symbolic_id,
                error.message
            ),
            None => panic!("Expected {}, but the operation succeeded", status.name()),
        }
    }
}

impl DiagnosticAssertions for ValueWriteResponse {
    fn diagnostic(&self) -> Option<&ServiceDiagnostic> {
        self.error_info.as_ref()
    }
}

impl DiagnosticAssertions for ValueReadResponse {
    fn diagnostic(&self) -> Option<&ServiceDiagnostic> {
        self.error_info.as_ref()
    }
}

impl DiagnosticAssertions for ExpansionResult {
    fn diagnostic(&self) -> Option<&ServiceDiagnostic> {
        self.error_info()
    }
}
