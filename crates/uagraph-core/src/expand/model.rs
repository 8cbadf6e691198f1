// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Expansion request and result models.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ServiceDiagnostic};
use crate::metadata::MethodMetadata;
use crate::types::NamespaceFormat;

// =============================================================================
// ExpansionPolicy
// =============================================================================

/// Controls how a published nodes entry is expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionPolicy {
    /// Skip failing branches instead of reporting them.
    pub discard_errors: bool,

    /// Do not treat an object or variable root as a unit of its own.
    pub exclude_root_object: bool,

    /// Aggregation levels collected below each object or variable root.
    /// `None` is unbounded.
    pub levels_to_expand: Option<u32>,

    /// Type roots only match instances of exactly that type.
    pub no_subtypes: bool,

    /// Merge all leaves into one entry.
    pub create_single_writer: bool,

    /// Hierarchy depth searched for objects below a root. `None` is unbounded.
    pub max_depth: Option<u32>,

    /// Emit methods as leaves next to variables.
    pub include_methods: bool,

    /// How node ids are rendered in emitted entries.
    pub namespace_format: NamespaceFormat,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            discard_errors: false,
            exclude_root_object: false,
            levels_to_expand: None,
            no_subtypes: false,
            create_single_writer: false,
            max_depth: None,
            include_methods: false,
            namespace_format: NamespaceFormat::Expanded,
        }
    }
}

impl ExpansionPolicy {
    /// Sets `discard_errors`.
    pub fn with_discard_errors(mut self, discard: bool) -> Self {
        self.discard_errors = discard;
        self
    }

    /// Sets `exclude_root_object`.
    pub fn with_exclude_root_object(mut self, exclude: bool) -> Self {
        self.exclude_root_object = exclude;
        self
    }

    /// Sets `levels_to_expand`.
    pub fn with_levels_to_expand(mut self, levels: Option<u32>) -> Self {
        self.levels_to_expand = levels;
        self
    }

    /// Sets `no_subtypes`.
    pub fn with_no_subtypes(mut self, no_subtypes: bool) -> Self {
        self.no_subtypes = no_subtypes;
        self
    }

    /// Sets `create_single_writer`.
    pub fn with_single_writer(mut self, single: bool) -> Self {
        self.create_single_writer = single;
        self
    }

    /// Sets `max_depth`.
    pub fn with_max_depth(mut self, depth: Option<u32>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets `include_methods`.
    pub fn with_methods(mut self, include: bool) -> Self {
        self.include_methods = include;
        self
    }

    /// Sets the namespace format of emitted ids.
    pub fn with_namespace_format(mut self, format: NamespaceFormat) -> Self {
        self.namespace_format = format;
        self
    }
}

// =============================================================================
// PublishedNodesEntry
// =============================================================================

/// A node to publish, either a root to expand or an expanded leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedNode {
    /// Node id, in any of the accepted string forms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Relative path segments from `id` (or RootFolder).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_path: Option<Vec<String>>,

    /// Field id. On a root it is the prefix of generated ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_field_id: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Type definition of the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition_id: Option<String>,

    /// Arguments, for method leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_metadata: Option<MethodMetadata>,
}

impl PublishedNode {
    /// Creates a node from an id string.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Creates a node from a browse path starting at RootFolder.
    pub fn from_path<I, T>(segments: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            browse_path: Some(segments.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    /// Sets the field id.
    pub fn with_field_id(mut self, field_id: impl Into<String>) -> Self {
        self.data_set_field_id = Some(field_id.into());
        self
    }

    /// Short description used in logs and error contexts.
    pub fn describe(&self) -> String {
        match (&self.id, &self.browse_path) {
            (Some(id), Some(path)) => format!("{}/{}", id, path.join("/")),
            (Some(id), None) => id.clone(),
            (None, Some(path)) => path.join("/"),
            (None, None) => "<empty>".to_string(),
        }
    }
}

/// A writer entry: a named group of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedNodesEntry {
    /// Writer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_writer_id: Option<String>,

    /// Writer group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_writer_group: Option<String>,

    /// Dataset name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_name: Option<String>,

    /// Node the dataset is rooted at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_root_node_id: Option<String>,

    /// Type of the dataset root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_type: Option<String>,

    /// Nodes.
    #[serde(default)]
    pub opc_nodes: Vec<PublishedNode>,
}

impl PublishedNodesEntry {
    /// Creates an entry with the given roots.
    pub fn new(opc_nodes: Vec<PublishedNode>) -> Self {
        Self {
            opc_nodes,
            ..Default::default()
        }
    }

    /// Sets the writer group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.data_set_writer_group = Some(group.into());
        self
    }

    /// Sets the writer id.
    pub fn with_writer_id(mut self, id: impl Into<String>) -> Self {
        self.data_set_writer_id = Some(id.into());
        self
    }

    /// Rejects entries without roots or with roots lacking both id and path.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.opc_nodes.is_empty() {
            return Err(ConfigurationError::invalid_request("entry has no nodes to expand"));
        }
        if let Some(index) = self
            .opc_nodes
            .iter()
            .position(|n| n.id.is_none() && n.browse_path.as_ref().map_or(true, Vec::is_empty))
        {
            return Err(ConfigurationError::invalid_request(format!(
                "node {} has neither an id nor a browse path",
                index
            )));
        }
        Ok(())
    }
}

// =============================================================================
// ExpansionResult
// =============================================================================

/// One item of an expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpansionResult {
    /// A publishable entry.
    Entry {
        /// The entry.
        entry: PublishedNodesEntry,
    },
    /// A failed branch with the nodes it originated from.
    Error {
        /// What went wrong.
        error_info: ServiceDiagnostic,
        /// Context: the original entry narrowed to the failing nodes.
        entry: PublishedNodesEntry,
    },
}

impl ExpansionResult {
    /// Returns `true` for error results.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the entry, if this is not an error.
    pub fn entry(&self) -> Option<&PublishedNodesEntry> {
        match self {
            Self::Entry { entry } => Some(entry),
            Self::Error { .. } => None,
        }
    }

    /// Returns the diagnostic, if this is an error.
    pub fn error_info(&self) -> Option<&ServiceDiagnostic> {
        match self {
            Self::Entry { .. } => None,
            Self::Error { error_info, .. } => Some(error_info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = ExpansionPolicy::default();
        assert!(!policy.create_single_writer);
        assert_eq!(policy.levels_to_expand, None);
        assert_eq!(policy.namespace_format, NamespaceFormat::Expanded);

        let parsed: ExpansionPolicy = serde_json::from_str(r#"{"create_single_writer": true}"#).unwrap();
        assert!(parsed.create_single_writer);
        assert!(!parsed.discard_errors);
    }

    #[test]
    fn test_entry_validation() {
        assert!(PublishedNodesEntry::default().validate().is_err());
        let entry = PublishedNodesEntry::new(vec![PublishedNode::default()]);
        assert!(entry.validate().is_err());
        let entry = PublishedNodesEntry::new(vec![PublishedNode::from_path(["Objects", "Boilers"])]);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_entry_wire_names() {
        let entry = PublishedNodesEntry::new(vec![PublishedNode::from_id("ns=1;i=5").with_field_id("F")])
            .with_group("G");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["DataSetWriterGroup"], "G");
        assert_eq!(json["OpcNodes"][0]["Id"], "ns=1;i=5");
        assert_eq!(json["OpcNodes"][0]["DataSetFieldId"], "F");
    }
}
