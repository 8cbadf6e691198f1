// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # uagraph-core
//!
//! Client-side engine for the OPC UA address-space model.
//!
//! This crate provides:
//!
//! - **Types**: `NodeId`, `ExpandedNodeId`, `QualifiedName`, `NodeClass` and friends
//! - **Error**: Unified error hierarchy mapped onto OPC UA status codes
//! - **Service**: The `NodeService` abstraction and an in-memory address space
//! - **Browse**: Paged browsing with transparent continuation points
//! - **Hierarchy**: Supertype chains and node kind classification
//! - **Declarations**: Instance declarations aggregated over a type hierarchy
//! - **Metadata**: Node metadata and data type resolution
//! - **Path**: Relative path parsing and resolution
//! - **Codec**: Lossless conversion between generic values and variants
//! - **Expand**: Published nodes expansion into leaf variable entries
//! - **Write**: Typed value reads and writes
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use uagraph_core::{CancellationSignal, MemoryNodeService, NodeEngine, NodeId};
//!
//! let engine = NodeEngine::new(Arc::new(MemoryNodeService::new()));
//! let cancel = CancellationSignal::new();
//! let node = engine
//!     .resolve_path(&NodeId::NULL, &["Objects", "Server"], &cancel)
//!     .await?;
//! let metadata = engine.get_metadata(&node, &cancel).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod status;
pub mod types;
pub mod value;
pub mod variant;

// =============================================================================
// Service Modules
// =============================================================================

pub mod browse;
pub mod cancel;
pub mod service;

// =============================================================================
// Resolution Modules
// =============================================================================

pub mod codec;
pub mod declarations;
pub mod hierarchy;
pub mod metadata;
pub mod path;

// =============================================================================
// Operation Modules
// =============================================================================

pub mod engine;
pub mod expand;
pub mod write;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

pub use status::StatusCode;
pub use value::{
    DataTypeTag, GenericValue, StructureDefinition, StructureField, StructureFieldDefinition,
    StructureValue, ValueRank,
};
pub use variant::{BuiltInType, EncodingKind, ExtensionObject, ExtensionObjectBody, ScalarValue, Variant};

// Re-export service types
pub use service::{
    AccessLevel, BrowseRequest, BrowseResponse, ContinuationPoint, DataTypeDefinition, DataValue,
    EnumFieldDescription, MemoryNodeService, NodeAttributes, NodeBuilder, NodeService,
    ReferenceDescription, StructureFieldDescription,
};
pub use browse::{BrowseOptions, BrowseStatisticsSnapshot, Browser};
pub use cancel::CancellationSignal;

// Re-export resolvers
pub use codec::{CodecOptions, ValueCodec};
pub use declarations::{
    DeclarationAggregator, DeclarationIndex, DeclarationSet, InstanceDeclaration, MemberMetadata,
    ModellingRule,
};
pub use hierarchy::{NodeKind, TypeHierarchy, TypeHierarchyEntry, TypeHierarchyResolver};
pub use metadata::{
    DataTypeResolver, MetadataResolver, MethodArgument, MethodMetadata, NodeMetadata,
    VariableMetadata,
};
pub use path::{PathElement, PathResolver, ReferenceFilter, RelativePath, TargetName, TargetNamespace};

// Re-export operations
pub use engine::{EngineOptions, NodeEngine};
pub use expand::{
    Expander, Expansion, ExpansionPolicy, ExpansionResult, PublishedNode, PublishedNodesEntry,
};
pub use write::{
    NodeTarget, ValueReadRequest, ValueReadResponse, ValueWriteRequest, ValueWriteResponse,
    ValueWriter,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
