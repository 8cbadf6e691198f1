// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Engine error types with structured diagnostics.
//!
//! This module provides the error hierarchy shared by every resolver, the
//! expander and the codec:
//!
//! - **Categorization**: One enum per failure domain
//! - **Diagnostics**: Error codes, severities and recovery hints
//! - **Interoperability**: Every error maps onto an OPC UA [`StatusCode`] and
//!   a serializable [`ServiceDiagnostic`]
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Browse        - Node lookup and browse paging failures
//! ├── Path          - Relative path resolution failures
//! ├── Metadata      - Type hierarchy and declaration resolution failures
//! ├── Conversion    - Typed value codec failures
//! ├── Operation     - Read/write failures
//! ├── Configuration - Invalid requests or settings
//! └── Cancelled     - Cooperative cancellation
//! ```
//!
//! # Examples
//!
//! ```
//! use uagraph_core::error::{OpcUaError, PathError};
//! use uagraph_core::status::StatusCode;
//!
//! let error = OpcUaError::from(PathError::not_found("Objects/Missing", "Missing"));
//! assert_eq!(error.status_code(), StatusCode::BAD_NO_MATCH);
//!
//! for hint in error.recovery_hints() {
//!     println!("Hint: {}", hint);
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::status::StatusCode;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for engine operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Node lookup and browse errors.
    #[error("{0}")]
    Browse(#[from] BrowseError),

    /// Relative path resolution errors.
    #[error("{0}")]
    Path(#[from] PathError),

    /// Type metadata resolution errors.
    #[error("{0}")]
    Metadata(#[from] MetadataError),

    /// Value conversion errors.
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// Read/write operation errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Configuration and request validation errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

impl OpcUaError {
    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl fmt::Display) -> Self {
        Self::Browse(BrowseError::node_not_found(node_id.to_string()))
    }

    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::Browse(BrowseError::browse_failed(node_id.to_string(), message))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conversion(ConversionError::type_mismatch(expected, actual))
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::invalid_request(message))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browse(e) => e.is_retryable(),
            Self::Operation(e) => e.is_retryable(),
            Self::Metadata(e) => e.is_retryable(),
            Self::Path(_) | Self::Conversion(_) | Self::Configuration(_) | Self::Cancelled => {
                false
            }
        }
    }

    /// Returns the suggested retry delay for this error.
    ///
    /// Returns `None` if the error is not retryable.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        if !self.is_retryable() {
            return None;
        }
        match self {
            Self::Browse(e) => e.suggested_retry_delay(),
            Self::Operation(e) => e.suggested_retry_delay(),
            Self::Metadata(_) => Some(Duration::from_millis(500)),
            _ => None,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Browse(e) => e.severity(),
            Self::Path(_) => ErrorSeverity::Warning,
            Self::Metadata(e) => e.severity(),
            Self::Conversion(_) => ErrorSeverity::Error,
            Self::Operation(e) => e.severity(),
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Cancelled => ErrorSeverity::Info,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Browse(_) => "browse",
            Self::Path(_) => "path",
            Self::Metadata(_) => "metadata",
            Self::Conversion(_) => "conversion",
            Self::Operation(_) => "operation",
            Self::Configuration(_) => "configuration",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Browse(e) => e.error_code(),
            Self::Path(e) => e.error_code(),
            Self::Metadata(e) => e.error_code(),
            Self::Conversion(e) => e.error_code(),
            Self::Operation(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
            Self::Cancelled => ErrorCode::new(7, 1),
        }
    }

    /// Maps this error onto the closest OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Browse(e) => e.status_code(),
            Self::Path(e) => e.status_code(),
            Self::Metadata(e) => e.status_code(),
            Self::Conversion(e) => e.status_code(),
            Self::Operation(e) => e.status_code(),
            Self::Configuration(e) => e.status_code(),
            Self::Cancelled => StatusCode::BAD_REQUEST_CANCELLED_BY_CLIENT,
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Browse(e) => e.recovery_hints(),
            Self::Path(e) => e.recovery_hints(),
            Self::Metadata(e) => e.recovery_hints(),
            Self::Conversion(e) => e.recovery_hints(),
            Self::Operation(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
            Self::Cancelled => vec!["The caller cancelled the operation"],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Browse(e) => e.user_message(),
            Self::Path(e) => e.user_message(),
            Self::Metadata(e) => e.user_message(),
            Self::Conversion(e) => e.user_message(),
            Self::Operation(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
            Self::Cancelled => "작업이 취소됨".to_string(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let level = self.tracing_level();
        let code = self.error_code();

        match level {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// Node lookup and browse errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Node not found.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The node ID that was not found.
        node_id: String,
    },

    /// Browse failed.
    #[error("Browse failed for node '{node_id}': {message}")]
    BrowseFailed {
        /// Node ID being browsed.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Invalid node ID format.
    #[error("Invalid node ID format: '{node_id}' - {reason}")]
    InvalidNodeId {
        /// The invalid node ID.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// Bad continuation point.
    #[error("Invalid continuation point")]
    BadContinuationPoint,

    /// Paging did not terminate within the configured bound.
    #[error("Browse of '{node_id}' exceeded {max} continuation requests")]
    ContinuationLimitExceeded {
        /// Node ID being browsed.
        node_id: String,
        /// Maximum number of follow-up requests.
        max: usize,
    },

    /// Access denied for node.
    #[error("Access denied for node '{node_id}'")]
    AccessDenied {
        /// The node ID.
        node_id: String,
    },
}

impl BrowseError {
    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a continuation limit error.
    pub fn continuation_limit(node_id: impl Into<String>, max: usize) -> Self {
        Self::ContinuationLimitExceeded {
            node_id: node_id.into(),
            max,
        }
    }

    /// Creates an access denied error.
    pub fn access_denied(node_id: impl Into<String>) -> Self {
        Self::AccessDenied {
            node_id: node_id.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BrowseFailed { .. } | Self::BadContinuationPoint)
    }

    /// Returns the suggested retry delay.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::BrowseFailed { .. } => Some(Duration::from_millis(500)),
            Self::BadContinuationPoint => Some(Duration::from_millis(100)),
            _ => None,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::AccessDenied { .. } | Self::ContinuationLimitExceeded { .. } => {
                ErrorSeverity::Error
            }
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NodeNotFound { .. } => ErrorCode::new(1, 1),
            Self::BrowseFailed { .. } => ErrorCode::new(1, 2),
            Self::InvalidNodeId { .. } => ErrorCode::new(1, 3),
            Self::BadContinuationPoint => ErrorCode::new(1, 4),
            Self::ContinuationLimitExceeded { .. } => ErrorCode::new(1, 5),
            Self::AccessDenied { .. } => ErrorCode::new(1, 6),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NodeNotFound { .. } => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::BrowseFailed { .. } => StatusCode::BAD_UNEXPECTED_ERROR,
            Self::InvalidNodeId { .. } => StatusCode::BAD_NODE_ID_INVALID,
            Self::BadContinuationPoint => StatusCode::BAD_CONTINUATION_POINT_INVALID,
            Self::ContinuationLimitExceeded { .. } => StatusCode::BAD_NO_CONTINUATION_POINTS,
            Self::AccessDenied { .. } => StatusCode::BAD_USER_ACCESS_DENIED,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NodeNotFound { .. } => vec![
                "Verify the node ID is correct",
                "Use browse to discover available nodes",
            ],
            Self::BrowseFailed { .. } => vec![
                "Check server connection",
                "Verify browse permissions",
                "Retry the operation",
            ],
            Self::InvalidNodeId { .. } => vec![
                "Node ID format: ns=<namespace>;i=<numeric> or ns=<namespace>;s=<string>",
                "Example: ns=2;s=MyNode or i=85",
            ],
            Self::BadContinuationPoint => vec![
                "Continuation point may have expired",
                "Restart the browse operation",
            ],
            Self::ContinuationLimitExceeded { .. } => vec![
                "Increase browse.max_continuations",
                "Increase browse.max_references_per_node to reduce paging",
            ],
            Self::AccessDenied { .. } => vec![
                "Check user permissions for this node",
                "Contact server administrator",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NodeNotFound { node_id } => {
                format!("노드를 찾을 수 없음: {}", node_id)
            }
            Self::BrowseFailed { node_id, .. } => {
                format!("노드 탐색 실패: {}", node_id)
            }
            Self::InvalidNodeId { node_id, .. } => {
                format!("잘못된 노드 ID 형식: {}", node_id)
            }
            Self::BadContinuationPoint => "잘못된 연속 포인트".to_string(),
            Self::ContinuationLimitExceeded { node_id, max } => {
                format!("연속 탐색 한도 초과: {} (최대: {})", node_id, max)
            }
            Self::AccessDenied { node_id } => {
                format!("노드 접근 거부: {}", node_id)
            }
        }
    }
}

// =============================================================================
// PathError
// =============================================================================

/// Relative path resolution errors.
#[derive(Debug, Error)]
pub enum PathError {
    /// A segment matched no target.
    #[error("Path '{path}' did not resolve to any node (no match for '{segment}')")]
    PathNotFound {
        /// The full path.
        path: String,
        /// The segment that failed.
        segment: String,
    },

    /// A segment matched more than one target.
    #[error("Path '{path}' resolved to {count} nodes at '{segment}'")]
    AmbiguousPath {
        /// The full path.
        path: String,
        /// The segment that matched more than once.
        segment: String,
        /// Number of matches.
        count: usize,
    },

    /// Malformed path text.
    #[error("Invalid browse path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: String,
        /// Reason.
        reason: String,
    },

    /// A `<uri>#<name>` segment named an unknown namespace.
    #[error("Unknown namespace '{namespace_uri}' in path '{path}'")]
    UnknownNamespace {
        /// The full path.
        path: String,
        /// The namespace URI.
        namespace_uri: String,
    },
}

impl PathError {
    /// Creates a path not found error.
    pub fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::PathNotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// Creates an ambiguous path error.
    pub fn ambiguous(path: impl Into<String>, segment: impl Into<String>, count: usize) -> Self {
        Self::AmbiguousPath {
            path: path.into(),
            segment: segment.into(),
            count,
        }
    }

    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unknown namespace error.
    pub fn unknown_namespace(path: impl Into<String>, namespace_uri: impl Into<String>) -> Self {
        Self::UnknownNamespace {
            path: path.into(),
            namespace_uri: namespace_uri.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::PathNotFound { .. } => ErrorCode::new(2, 1),
            Self::AmbiguousPath { .. } => ErrorCode::new(2, 2),
            Self::InvalidPath { .. } => ErrorCode::new(2, 3),
            Self::UnknownNamespace { .. } => ErrorCode::new(2, 4),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PathNotFound { .. } => StatusCode::BAD_NO_MATCH,
            Self::AmbiguousPath { .. } => StatusCode::BAD_TOO_MANY_MATCHES,
            Self::InvalidPath { .. } => StatusCode::BAD_BROWSE_NAME_INVALID,
            Self::UnknownNamespace { .. } => StatusCode::BAD_BROWSE_NAME_INVALID,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::PathNotFound { .. } => vec![
                "Verify each segment of the path exists",
                "Use browse to discover available paths",
            ],
            Self::AmbiguousPath { .. } => vec![
                "Qualify the segment with its namespace (<uri>#<name>)",
                "Use '.' to restrict the hop to aggregated children",
            ],
            Self::InvalidPath { .. } => vec![
                "Segment format: [/|.|<RefType>][!][#]<namespace>#<name>",
                "Escape reserved characters with '&'",
            ],
            Self::UnknownNamespace { .. } => vec![
                "Check the server namespace array",
                "Use the numeric form <index>:<name>",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::PathNotFound { path, .. } => {
                format!("경로를 찾을 수 없음: {}", path)
            }
            Self::AmbiguousPath { path, count, .. } => {
                format!("경로가 여러 노드와 일치함: {} ({}개)", path, count)
            }
            Self::InvalidPath { path, .. } => {
                format!("잘못된 탐색 경로: {}", path)
            }
            Self::UnknownNamespace { namespace_uri, .. } => {
                format!("알 수 없는 네임스페이스: {}", namespace_uri)
            }
        }
    }
}

// =============================================================================
// MetadataError
// =============================================================================

/// Type hierarchy and declaration resolution errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The supertype chain loops back on itself.
    #[error("Malformed type hierarchy at '{type_id}': {reason}")]
    MalformedHierarchy {
        /// The type where the problem was detected.
        type_id: String,
        /// Reason.
        reason: String,
    },

    /// A browse or read failed while aggregating metadata.
    #[error("Metadata resolution failed at '{node_id}': {source}")]
    ResolutionFailed {
        /// The node being resolved when the failure happened.
        node_id: String,
        /// The underlying failure.
        #[source]
        source: Box<OpcUaError>,
    },

    /// The node's type definition could not be read.
    #[error("Invalid type definition '{type_id}' for node '{node_id}'")]
    TypeDefinitionInvalid {
        /// The instance node.
        node_id: String,
        /// The type definition that failed.
        type_id: String,
    },

    /// A data type node could not be mapped onto a built-in type.
    #[error("Data type '{data_type}' cannot be resolved: {reason}")]
    DataTypeUnresolved {
        /// The data type node.
        data_type: String,
        /// Reason.
        reason: String,
    },
}

impl MetadataError {
    /// Creates a malformed hierarchy error.
    pub fn malformed(type_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedHierarchy {
            type_id: type_id.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an underlying failure with the node being resolved.
    pub fn resolution_failed(node_id: impl Into<String>, source: OpcUaError) -> Self {
        Self::ResolutionFailed {
            node_id: node_id.into(),
            source: Box::new(source),
        }
    }

    /// Creates a type definition invalid error.
    pub fn type_definition_invalid(node_id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self::TypeDefinitionInvalid {
            node_id: node_id.into(),
            type_id: type_id.into(),
        }
    }

    /// Creates a data type unresolved error.
    pub fn data_type_unresolved(data_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataTypeUnresolved {
            data_type: data_type.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ResolutionFailed { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MalformedHierarchy { .. } => ErrorSeverity::Error,
            Self::ResolutionFailed { source, .. } => source.severity(),
            _ => ErrorSeverity::Warning,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MalformedHierarchy { .. } => ErrorCode::new(3, 1),
            Self::ResolutionFailed { .. } => ErrorCode::new(3, 2),
            Self::TypeDefinitionInvalid { .. } => ErrorCode::new(3, 3),
            Self::DataTypeUnresolved { .. } => ErrorCode::new(3, 4),
        }
    }

    /// Returns the OPC UA status code.
    ///
    /// Wrapped failures keep the status of their cause.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedHierarchy { .. } => StatusCode::BAD_TYPE_DEFINITION_INVALID,
            Self::ResolutionFailed { source, .. } => source.status_code(),
            Self::TypeDefinitionInvalid { .. } => StatusCode::BAD_TYPE_DEFINITION_INVALID,
            Self::DataTypeUnresolved { .. } => StatusCode::BAD_DATA_TYPE_ID_UNKNOWN,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::MalformedHierarchy { .. } => vec![
                "The server's HasSubtype references form a cycle",
                "Report the information model defect to the server vendor",
            ],
            Self::ResolutionFailed { .. } => vec![
                "Check that every type in the hierarchy is browsable",
                "Retry after the server finishes loading its model",
            ],
            Self::TypeDefinitionInvalid { .. } => vec![
                "Verify the node's HasTypeDefinition target exists",
            ],
            Self::DataTypeUnresolved { .. } => vec![
                "Verify the DataType node derives from a built-in type",
                "Pass an explicit data type with the request",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedHierarchy { type_id, .. } => {
                format!("타입 계층 구조 오류: {}", type_id)
            }
            Self::ResolutionFailed { node_id, .. } => {
                format!("메타데이터 해석 실패: {}", node_id)
            }
            Self::TypeDefinitionInvalid { type_id, .. } => {
                format!("잘못된 타입 정의: {}", type_id)
            }
            Self::DataTypeUnresolved { data_type, .. } => {
                format!("데이터 타입을 해석할 수 없음: {}", data_type)
            }
        }
    }
}

// =============================================================================
// ConversionError
// =============================================================================

/// Typed value codec errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Type mismatch.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Array rank disagrees with the declared value rank.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// An array dimension exceeds its declared length.
    #[error("Dimension {dimension} has length {actual}, declared {declared}")]
    DimensionMismatch {
        /// Zero-based dimension index.
        dimension: usize,
        /// Declared length.
        declared: u32,
        /// Actual length.
        actual: usize,
    },

    /// Array exceeds the configured limit.
    #[error("Array length {length} exceeds limit {max}")]
    ArrayTooLong {
        /// Actual length.
        length: usize,
        /// Configured limit.
        max: usize,
    },

    /// A structure field required by the schema is missing.
    #[error("Structure '{structure}' is missing field '{field}'")]
    MissingField {
        /// Structure type.
        structure: String,
        /// Field name.
        field: String,
    },

    /// A structure field is not part of the schema.
    #[error("Structure '{structure}' has no field '{field}'")]
    UnknownField {
        /// Structure type.
        structure: String,
        /// Field name.
        field: String,
    },

    /// Invalid value.
    #[error("Invalid value for type '{target_type}': {message}")]
    InvalidValue {
        /// Target type.
        target_type: String,
        /// Error message.
        message: String,
    },
}

impl ConversionError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(dimension: usize, declared: u32, actual: usize) -> Self {
        Self::DimensionMismatch {
            dimension,
            declared,
            actual,
        }
    }

    /// Creates an array too long error.
    pub fn array_too_long(length: usize, max: usize) -> Self {
        Self::ArrayTooLong { length, max }
    }

    /// Creates a missing field error.
    pub fn missing_field(structure: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            structure: structure.into(),
            field: field.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(structure: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            structure: structure.into(),
            field: field.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(target_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            target_type: target_type.into(),
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ErrorCode::new(4, 1),
            Self::ShapeMismatch { .. } => ErrorCode::new(4, 2),
            Self::DimensionMismatch { .. } => ErrorCode::new(4, 3),
            Self::ArrayTooLong { .. } => ErrorCode::new(4, 4),
            Self::MissingField { .. } => ErrorCode::new(4, 5),
            Self::UnknownField { .. } => ErrorCode::new(4, 6),
            Self::InvalidValue { .. } => ErrorCode::new(4, 7),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DimensionMismatch { .. } | Self::ArrayTooLong { .. } => {
                StatusCode::BAD_OUT_OF_RANGE
            }
            _ => StatusCode::BAD_TYPE_MISMATCH,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::TypeMismatch { .. } => vec![
                "Check the DataType attribute of the node",
                "Send the value with the matching tag",
            ],
            Self::ShapeMismatch { .. } => vec![
                "Check the ValueRank attribute of the node",
                "Send a scalar for rank -1 and an array for rank >= 1",
            ],
            Self::DimensionMismatch { .. } | Self::ArrayTooLong { .. } => vec![
                "Check the ArrayDimensions attribute of the node",
                "Shorten the array",
            ],
            Self::MissingField { .. } | Self::UnknownField { .. } => vec![
                "Resolve the structure definition with the metadata request",
                "Match field names exactly",
            ],
            Self::InvalidValue { .. } => vec![
                "Check the value format",
                "Ensure value is valid for the target type",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::TypeMismatch { expected, actual } => {
                format!("타입 불일치 (예상: {}, 실제: {})", expected, actual)
            }
            Self::ShapeMismatch { expected, actual } => {
                format!("배열 형태 불일치 (예상: {}, 실제: {})", expected, actual)
            }
            Self::DimensionMismatch { dimension, .. } => {
                format!("배열 차원 불일치: {}", dimension)
            }
            Self::ArrayTooLong { length, max } => {
                format!("배열이 너무 김 ({}/{})", length, max)
            }
            Self::MissingField { field, .. } => format!("필드 누락: {}", field),
            Self::UnknownField { field, .. } => format!("알 수 없는 필드: {}", field),
            Self::InvalidValue { target_type, .. } => {
                format!("잘못된 값 (타입: {})", target_type)
            }
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read/write operation errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Attribute read failed.
    #[error("Read failed for node '{node_id}': {message}")]
    ReadFailed {
        /// Node ID.
        node_id: String,
        /// Error message.
        message: String,
        /// OPC UA status code.
        status: StatusCode,
    },

    /// The server rejected a write.
    #[error("Write rejected for node '{node_id}': {status}")]
    WriteRejected {
        /// Node ID.
        node_id: String,
        /// Status returned by the server.
        status: StatusCode,
    },

    /// The node class cannot be processed by the requested operation.
    #[error("Operation '{operation}' not supported for node class {node_class}")]
    NotSupported {
        /// Operation name.
        operation: String,
        /// Offending node class.
        node_class: String,
    },

    /// A discovery step yielded nothing.
    #[error("{message}")]
    NothingResolved {
        /// Message.
        message: String,
    },
}

impl OperationError {
    /// Creates a read failed error.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
            status: StatusCode::BAD_NOT_READABLE,
        }
    }

    /// Creates a write rejected error.
    pub fn write_rejected(node_id: impl Into<String>, status: StatusCode) -> Self {
        Self::WriteRejected {
            node_id: node_id.into(),
            status,
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(operation: impl Into<String>, node_class: impl fmt::Display) -> Self {
        Self::NotSupported {
            operation: operation.into(),
            node_class: node_class.to_string(),
        }
    }

    /// Creates a nothing resolved error.
    pub fn nothing_resolved(message: impl Into<String>) -> Self {
        Self::NothingResolved {
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReadFailed { .. })
    }

    /// Returns the suggested retry delay.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            Self::ReadFailed { .. } => Some(Duration::from_millis(200)),
            _ => None,
        }
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NothingResolved { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ReadFailed { .. } => ErrorCode::new(5, 1),
            Self::WriteRejected { .. } => ErrorCode::new(5, 2),
            Self::NotSupported { .. } => ErrorCode::new(5, 3),
            Self::NothingResolved { .. } => ErrorCode::new(5, 4),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ReadFailed { status, .. } => *status,
            Self::WriteRejected { status, .. } => *status,
            Self::NotSupported { .. } => StatusCode::BAD_NOT_SUPPORTED,
            Self::NothingResolved { .. } => StatusCode::BAD_NOT_FOUND,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::ReadFailed { .. } => vec![
                "Check the node's AccessLevel",
                "Retry the operation",
            ],
            Self::WriteRejected { .. } => vec![
                "Check the node's AccessLevel and UserAccessLevel",
                "Verify the value is within the node's range",
            ],
            Self::NotSupported { .. } => vec![
                "Use an Object, Variable, ObjectType or VariableType node",
            ],
            Self::NothingResolved { .. } => vec![
                "Check the root node and expansion depth",
                "Disable no_subtypes to include derived instances",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::ReadFailed { node_id, .. } => format!("읽기 실패: {}", node_id),
            Self::WriteRejected { node_id, status } => {
                format!("쓰기 거부: {} ({})", node_id, status.name())
            }
            Self::NotSupported { node_class, .. } => {
                format!("지원되지 않는 노드 클래스: {}", node_class)
            }
            Self::NothingResolved { .. } => "해석된 객체 없음".to_string(),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration and request validation errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A request is missing required information or is contradictory.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// A setting has an invalid value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Reason.
        reason: String,
    },

    /// An address-space snapshot could not be loaded or saved.
    #[error("Invalid address space snapshot: {message}")]
    InvalidSnapshot {
        /// Error message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest { .. } => ErrorCode::new(6, 1),
            Self::InvalidValue { .. } => ErrorCode::new(6, 2),
            Self::InvalidSnapshot { .. } => ErrorCode::new(6, 3),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_INVALID_ARGUMENT,
            _ => StatusCode::BAD_CONFIGURATION_ERROR,
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidRequest { .. } => vec![
                "Provide a node ID or a browse path",
            ],
            Self::InvalidValue { .. } => vec![
                "Check the configuration file",
                "Run 'uagraph validate' to check the settings",
            ],
            Self::InvalidSnapshot { .. } => vec![
                "Check the snapshot file is valid JSON",
                "Regenerate the snapshot from the source address space",
            ],
        }
    }

    /// Returns a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest { message } => format!("잘못된 요청: {}", message),
            Self::InvalidValue { field, .. } => format!("잘못된 설정 값: {}", field),
            Self::InvalidSnapshot { .. } => "잘못된 주소 공간 스냅샷".to_string(),
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error => Level::ERROR,
            Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Browse
/// - 2: Path
/// - 3: Metadata
/// - 4: Conversion
/// - 5: Operation
/// - 6: Configuration
/// - 7: Cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-7).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// ServiceDiagnostic
// =============================================================================

/// Structured diagnostic returned to callers in place of raw errors.
///
/// Carried by failed expansion units and write responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDiagnostic {
    /// OPC UA status code.
    pub status_code: StatusCode,

    /// Symbolic name of the status code.
    pub symbolic_id: String,

    /// Human readable message.
    pub message: String,

    /// Engine error code (`UA-XXYY`), absent for server-originated diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ServiceDiagnostic {
    /// Creates a diagnostic from a status code and message.
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            symbolic_id: status_code.name().to_string(),
            message: message.into(),
            error_code: None,
        }
    }
}

impl From<&OpcUaError> for ServiceDiagnostic {
    fn from(error: &OpcUaError) -> Self {
        let status_code = error.status_code();
        Self {
            status_code,
            symbolic_id: status_code.name().to_string(),
            message: error.to_string(),
            error_code: Some(error.error_code().to_string()),
        }
    }
}

impl From<OpcUaError> for ServiceDiagnostic {
    fn from(error: OpcUaError) -> Self {
        Self::from(&error)
    }
}

impl fmt::Display for ServiceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbolic_id, self.message)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Error Context Extension
// =============================================================================

/// Extension trait for adding context to engine errors.
pub trait OpcUaErrorContext<T> {
    /// Adds node context to errors.
    fn with_node(self, node_id: &str) -> Result<T, OpcUaError>;

    /// Adds browse path context to errors.
    fn with_path(self, path: &str) -> Result<T, OpcUaError>;
}

impl<T> OpcUaErrorContext<T> for Result<T, OpcUaError> {
    fn with_node(self, node_id: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(node_id = node_id, error = %e, "OPC UA error with node context");
            e
        })
    }

    fn with_path(self, path: &str) -> Result<T, OpcUaError> {
        self.map_err(|e| {
            tracing::debug!(path = path, error = %e, "OPC UA error with path context");
            e
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browse_error() {
        let error = BrowseError::node_not_found("ns=2;s=Unknown");
        assert!(!error.is_retryable());
        assert!(error.to_string().contains("ns=2;s=Unknown"));
        assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn test_path_error_status_codes() {
        let error = OpcUaError::from(PathError::not_found("a/b", "b"));
        assert_eq!(error.status_code(), StatusCode::BAD_NO_MATCH);
        assert!(error.to_string().contains("did not resolve to any node"));

        let error = OpcUaError::from(PathError::ambiguous("a/b", "b", 2));
        assert_eq!(error.status_code(), StatusCode::BAD_TOO_MANY_MATCHES);
        assert!(error.to_string().contains("resolved to 2 nodes"));
    }

    #[test]
    fn test_metadata_error_keeps_cause_status() {
        let cause = OpcUaError::node_not_found("ns=1;i=7");
        let error = OpcUaError::from(MetadataError::resolution_failed("ns=1;i=1", cause));
        assert_eq!(error.status_code(), StatusCode::BAD_NODE_ID_UNKNOWN);
        assert_eq!(error.category(), "metadata");
        assert!(error.to_string().contains("ns=1;i=7"));
    }

    #[test]
    fn test_conversion_error() {
        let error = ConversionError::type_mismatch("Int32", "String");
        assert!(error.to_string().contains("Int32"));
        assert!(error.to_string().contains("String"));
        assert_eq!(error.status_code(), StatusCode::BAD_TYPE_MISMATCH);
        assert_eq!(
            ConversionError::dimension_mismatch(0, 2, 3).status_code(),
            StatusCode::BAD_OUT_OF_RANGE
        );
    }

    #[test]
    fn test_error_code() {
        let code = ErrorCode::new(1, 5);
        assert_eq!(code.to_string(), "UA-0105");
        assert_eq!(code.as_u16(), 0x0105);
    }

    #[test]
    fn test_service_diagnostic_from_error() {
        let error = OpcUaError::from(OperationError::write_rejected(
            "ns=2;i=10",
            StatusCode::BAD_NOT_WRITABLE,
        ));
        let diagnostic = ServiceDiagnostic::from(&error);
        assert_eq!(diagnostic.status_code, StatusCode::BAD_NOT_WRITABLE);
        assert_eq!(diagnostic.symbolic_id, "BadNotWritable");
        assert_eq!(diagnostic.error_code.as_deref(), Some("UA-0502"));
    }

    #[test]
    fn test_cancelled() {
        let error = OpcUaError::Cancelled;
        assert!(!error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Info);
        assert_eq!(
            error.status_code(),
            StatusCode::BAD_REQUEST_CANCELLED_BY_CLIENT
        );
    }

    #[test]
    fn test_retry_delay() {
        let error = OpcUaError::browse_failed("i=85", "timeout");
        assert!(error.is_retryable());
        assert_eq!(error.suggested_retry_delay(), Some(Duration::from_millis(500)));
        assert!(OpcUaError::type_mismatch("a", "b").suggested_retry_delay().is_none());
    }

    #[test]
    fn test_recovery_hints() {
        let error = OpcUaError::from(PathError::ambiguous("x", "x", 3));
        assert!(error.recovery_hints().iter().any(|h| h.contains("namespace")));
    }

    #[test]
    fn test_user_messages() {
        let error = OpcUaError::node_not_found("ns=2;i=99");
        assert!(error.user_message().contains("ns=2;i=99"));
    }
}
