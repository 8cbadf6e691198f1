// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space primitives.
//!
//! This module provides the identifier and naming types every other module
//! builds on:
//!
//! - **NodeId / ExpandedNodeId**: All four OPC UA identifier kinds with parsing
//! - **QualifiedName / LocalizedText**: Browse and display names
//! - **NodeClass / BrowseDirection**: Node and reference classification
//! - **NamespaceTable / NamespaceFormat**: Namespace URI resolution and output format
//! - **ids**: Well-known namespace 0 node identifiers
//!
//! # Examples
//!
//! ```
//! use uagraph_core::types::{NodeId, QualifiedName};
//!
//! let node: NodeId = "ns=2;s=Boiler.Temperature".parse().unwrap();
//! assert_eq!(node.namespace_index, 2);
//!
//! let name: QualifiedName = "2:Temperature".parse().unwrap();
//! assert_eq!(name.name, "Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BrowseError, OpcUaError, PathError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId uniquely identifies a node within a server. It consists of a
/// namespace index and an identifier which can be numeric, string, GUID, or
/// opaque (byte string). Equality is structural.
///
/// # Examples
///
/// ```
/// use uagraph_core::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// assert_eq!(numeric.to_string(), "ns=2;i=1001");
///
/// let parsed: NodeId = "i=85".parse().unwrap();
/// assert_eq!(parsed, NodeId::OBJECTS_FOLDER);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// The null node ID (`i=0`).
    pub const NULL: NodeId = NodeId::numeric(0, 0);

    /// Root folder.
    pub const ROOT_FOLDER: NodeId = NodeId::numeric(0, 84);

    /// Objects folder.
    pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);

    /// Types folder.
    pub const TYPES_FOLDER: NodeId = NodeId::numeric(0, 86);

    /// Views folder.
    pub const VIEWS_FOLDER: NodeId = NodeId::numeric(0, 87);

    /// Server object.
    pub const SERVER: NodeId = NodeId::numeric(0, 2253);

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns `true` for the null node ID.
    pub fn is_null(&self) -> bool {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => self.namespace_index == 0 && *v == 0,
            NodeIdentifier::String(v) => self.namespace_index == 0 && v.is_empty(),
            NodeIdentifier::Guid(v) => self.namespace_index == 0 && v.is_nil(),
            NodeIdentifier::Opaque(v) => self.namespace_index == 0 && v.is_empty(),
        }
    }

    /// Returns the numeric value if this is a numeric node ID.
    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            NodeIdentifier::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` if this node lives in namespace 0.
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    // =========================================================================
    // Formatting
    // =========================================================================

    /// Converts to the OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`, namespace 0 omits
    /// the `ns=` part.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }

    /// Formats this node ID using the requested namespace format.
    ///
    /// Namespaces missing from `table` fall back to the index form.
    pub fn format(&self, table: &NamespaceTable, format: NamespaceFormat) -> String {
        if self.namespace_index == 0 {
            return self.identifier.to_string();
        }
        let Some(uri) = table.uri(self.namespace_index) else {
            return self.to_opc_string();
        };
        match format {
            NamespaceFormat::Index => self.to_opc_string(),
            NamespaceFormat::Uri => format!("{}#{}", uri, self.identifier),
            NamespaceFormat::Expanded => format!("nsu={};{}", uri, self.identifier),
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` (numeric, namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest.split_once(';').ok_or_else(|| {
                    BrowseError::invalid_node_id(s, "Missing identifier after namespace")
                })?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| BrowseError::invalid_node_id(s, "Invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = identifier_part
            .parse::<NodeIdentifier>()
            .map_err(|reason| BrowseError::invalid_node_id(s, reason))?;

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier (used for all standard nodes).
    Numeric(u32),

    /// String identifier.
    String(String),

    /// GUID identifier.
    Guid(Uuid),

    /// Opaque identifier (application-specific byte array).
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

impl FromStr for NodeIdentifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(id) = s.strip_prefix("i=") {
            id.parse()
                .map(Self::Numeric)
                .map_err(|_| "Invalid numeric identifier".to_string())
        } else if let Some(id) = s.strip_prefix("s=") {
            Ok(Self::String(id.to_string()))
        } else if let Some(id) = s.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(Self::Guid)
                .map_err(|e| format!("Invalid GUID: {}", e))
        } else if let Some(id) = s.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(Self::Opaque)
                .map_err(|e| format!("Invalid base64: {}", e))
        } else {
            Err("Unknown identifier type. Expected i=, s=, g=, or b=".to_string())
        }
    }
}

// =============================================================================
// ExpandedNodeId
// =============================================================================

/// A node ID that may carry its namespace URI and a server index.
///
/// References returned by browse use this form; targets with a non-zero
/// server index live on another server and are never followed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpandedNodeId {
    /// The node ID (its namespace index is authoritative when no URI is set).
    pub node_id: NodeId,

    /// Namespace URI, overriding the node ID's namespace index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,

    /// Server index (0 = local server).
    #[serde(default)]
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Returns `true` if the target lives on the local server.
    #[inline]
    pub fn is_local(&self) -> bool {
        self.server_index == 0
    }

    /// Converts to a local node ID, resolving the namespace URI if present.
    ///
    /// Returns `None` for remote targets or unknown namespace URIs.
    pub fn to_node_id(&self, table: &NamespaceTable) -> Option<NodeId> {
        if !self.is_local() {
            return None;
        }
        match &self.namespace_uri {
            Some(uri) => table.index_of(uri).map(|namespace_index| NodeId {
                namespace_index,
                identifier: self.node_id.identifier.clone(),
            }),
            None => Some(self.node_id.clone()),
        }
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: None,
            server_index: 0,
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match &self.namespace_uri {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

impl FromStr for ExpandedNodeId {
    type Err = OpcUaError;

    /// Parses `[svr=<index>;][nsu=<uri>;]<identifier>` or a plain node ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut server_index = 0;
        if let Some(after) = rest.strip_prefix("svr=") {
            let (index, tail) = after
                .split_once(';')
                .ok_or_else(|| BrowseError::invalid_node_id(s, "Missing identifier after server"))?;
            server_index = index
                .parse()
                .map_err(|_| BrowseError::invalid_node_id(s, "Invalid server index"))?;
            rest = tail;
        }
        if let Some(after) = rest.strip_prefix("nsu=") {
            let (uri, id) = after.split_once(';').ok_or_else(|| {
                BrowseError::invalid_node_id(s, "Missing identifier after namespace URI")
            })?;
            let identifier = id
                .parse::<NodeIdentifier>()
                .map_err(|reason| BrowseError::invalid_node_id(s, reason))?;
            return Ok(Self {
                node_id: NodeId {
                    namespace_index: 0,
                    identifier,
                },
                namespace_uri: Some(uri.to_string()),
                server_index,
            });
        }
        Ok(Self {
            node_id: rest.parse()?,
            namespace_uri: None,
            server_index,
        })
    }
}

// =============================================================================
// QualifiedName
// =============================================================================

/// A namespace-qualified browse name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,

    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Returns `true` if the name is empty.
    pub fn is_null(&self) -> bool {
        self.name.is_empty()
    }

    /// Formats the name with its namespace URI when one is known.
    pub fn format(&self, table: &NamespaceTable, format: NamespaceFormat) -> String {
        if self.namespace_index == 0 || format == NamespaceFormat::Index {
            return self.to_string();
        }
        match table.uri(self.namespace_index) {
            Some(uri) => format!("{}#{}", uri, self.name),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

impl FromStr for QualifiedName {
    type Err = OpcUaError;

    /// Parses `<index>:<name>` or a bare name in namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::invalid_path(s, "Browse name is empty").into());
        }
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(namespace_index) = ns.parse::<u16>() {
                return Ok(Self::new(namespace_index, name));
            }
        }
        Ok(Self::new(0, s))
    }
}

// =============================================================================
// LocalizedText
// =============================================================================

/// Human readable text with an optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    /// Locale identifier, e.g. `en-US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// The text.
    pub text: String,
}

impl LocalizedText {
    /// Creates text without a locale.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            locale: None,
            text: text.into(),
        }
    }

    /// Creates text with a locale.
    pub fn with_locale(locale: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.into()),
            text: text.into(),
        }
    }

    /// Returns `true` if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

// =============================================================================
// BrowseDirection
// =============================================================================

/// Browse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Browse forward references.
    #[default]
    Forward,

    /// Browse inverse references.
    Inverse,

    /// Browse both forward and inverse references.
    Both,
}

impl BrowseDirection {
    /// Returns the OPC UA value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Inverse => 1,
            Self::Both => 2,
        }
    }

    /// Returns `true` if a reference with the given direction passes this filter.
    pub const fn accepts(&self, is_forward: bool) -> bool {
        match self {
            Self::Forward => is_forward,
            Self::Inverse => !is_forward,
            Self::Both => true,
        }
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Builds a node class mask from a list of classes.
    pub fn mask(classes: &[NodeClass]) -> u32 {
        classes.iter().fold(0, |mask, class| mask | class.value())
    }

    /// Returns `true` if `mask` selects this class (0 selects every class).
    #[inline]
    pub const fn matches_mask(&self, mask: u32) -> bool {
        mask == 0 || (mask & self.value()) != 0
    }

    /// Returns `true` for ObjectType and VariableType.
    pub const fn is_instance_type(&self) -> bool {
        matches!(self, Self::ObjectType | Self::VariableType)
    }

    /// Returns the node class name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
            Self::ObjectType => "ObjectType",
            Self::VariableType => "VariableType",
            Self::ReferenceType => "ReferenceType",
            Self::DataType => "DataType",
            Self::View => "View",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Namespaces
// =============================================================================

/// The standard OPC UA namespace URI (index 0).
pub const OPC_UA_NAMESPACE: &str = "http://opcfoundation.org/UA/";

/// Server namespace table mapping indices to URIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates a table from the server's namespace array.
    pub fn new(uris: Vec<String>) -> Self {
        Self { uris }
    }

    /// Returns the URI for an index.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }

    /// Returns the index for a URI.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        let wanted = uri.trim_end_matches('/');
        self.uris
            .iter()
            .position(|u| u.trim_end_matches('/') == wanted)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Returns the number of namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Returns all URIs in index order.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new(vec![OPC_UA_NAMESPACE.to_string()])
    }
}

/// How node IDs are rendered in expansion output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceFormat {
    /// `ns=<index>;i=<id>`
    Index,
    /// `<namespace uri>#i=<id>`
    Uri,
    /// `nsu=<namespace uri>;i=<id>`
    #[default]
    Expanded,
}

// =============================================================================
// Well-known identifiers
// =============================================================================

/// Well-known namespace 0 node identifiers.
pub mod ids {
    use super::NodeId;

    // Reference types
    /// References (root of all reference types).
    pub const REFERENCES: NodeId = NodeId::numeric(0, 31);
    /// NonHierarchicalReferences.
    pub const NON_HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 32);
    /// HierarchicalReferences.
    pub const HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 33);
    /// HasChild.
    pub const HAS_CHILD: NodeId = NodeId::numeric(0, 34);
    /// Organizes.
    pub const ORGANIZES: NodeId = NodeId::numeric(0, 35);
    /// HasEventSource.
    pub const HAS_EVENT_SOURCE: NodeId = NodeId::numeric(0, 36);
    /// HasModellingRule.
    pub const HAS_MODELLING_RULE: NodeId = NodeId::numeric(0, 37);
    /// HasEncoding.
    pub const HAS_ENCODING: NodeId = NodeId::numeric(0, 38);
    /// HasTypeDefinition.
    pub const HAS_TYPE_DEFINITION: NodeId = NodeId::numeric(0, 40);
    /// GeneratesEvent.
    pub const GENERATES_EVENT: NodeId = NodeId::numeric(0, 41);
    /// Aggregates.
    pub const AGGREGATES: NodeId = NodeId::numeric(0, 44);
    /// HasSubtype.
    pub const HAS_SUBTYPE: NodeId = NodeId::numeric(0, 45);
    /// HasProperty.
    pub const HAS_PROPERTY: NodeId = NodeId::numeric(0, 46);
    /// HasComponent.
    pub const HAS_COMPONENT: NodeId = NodeId::numeric(0, 47);
    /// HasNotifier.
    pub const HAS_NOTIFIER: NodeId = NodeId::numeric(0, 48);
    /// HasInterface.
    pub const HAS_INTERFACE: NodeId = NodeId::numeric(0, 17603);

    // Object and variable types
    /// BaseObjectType (universal base of object types).
    pub const BASE_OBJECT_TYPE: NodeId = NodeId::numeric(0, 58);
    /// FolderType.
    pub const FOLDER_TYPE: NodeId = NodeId::numeric(0, 61);
    /// BaseVariableType (universal base of variable types).
    pub const BASE_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 62);
    /// BaseDataVariableType.
    pub const BASE_DATA_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 63);
    /// PropertyType.
    pub const PROPERTY_TYPE: NodeId = NodeId::numeric(0, 68);
    /// BaseEventType.
    pub const BASE_EVENT_TYPE: NodeId = NodeId::numeric(0, 2041);
    /// BaseInterfaceType.
    pub const BASE_INTERFACE_TYPE: NodeId = NodeId::numeric(0, 17602);

    // Modelling rules
    /// ModellingRule Mandatory.
    pub const MODELLING_RULE_MANDATORY: NodeId = NodeId::numeric(0, 78);
    /// ModellingRule Optional.
    pub const MODELLING_RULE_OPTIONAL: NodeId = NodeId::numeric(0, 80);
    /// ModellingRule ExposesItsArray.
    pub const MODELLING_RULE_EXPOSES_ITS_ARRAY: NodeId = NodeId::numeric(0, 83);
    /// ModellingRule OptionalPlaceholder.
    pub const MODELLING_RULE_OPTIONAL_PLACEHOLDER: NodeId = NodeId::numeric(0, 11508);
    /// ModellingRule MandatoryPlaceholder.
    pub const MODELLING_RULE_MANDATORY_PLACEHOLDER: NodeId = NodeId::numeric(0, 11510);

    // Data types
    /// BaseDataType.
    pub const BASE_DATA_TYPE: NodeId = NodeId::numeric(0, 24);
    /// Structure.
    pub const STRUCTURE: NodeId = NodeId::numeric(0, 22);
    /// Number.
    pub const NUMBER: NodeId = NodeId::numeric(0, 26);
    /// Integer.
    pub const INTEGER: NodeId = NodeId::numeric(0, 27);
    /// UInteger.
    pub const UINTEGER: NodeId = NodeId::numeric(0, 28);
    /// Enumeration.
    pub const ENUMERATION: NodeId = NodeId::numeric(0, 29);
    /// Argument structure.
    pub const ARGUMENT: NodeId = NodeId::numeric(0, 296);

    // Instances
    /// Server namespace array variable.
    pub const SERVER_NAMESPACE_ARRAY: NodeId = NodeId::numeric(0, 2255);

    /// Browse name of method input argument properties.
    pub const INPUT_ARGUMENTS: &str = "InputArguments";
    /// Browse name of method output argument properties.
    pub const OUTPUT_ARGUMENTS: &str = "OutputArguments";
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_and_display() {
        let node: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(node, NodeId::numeric(2, 1001));
        assert_eq!(node.to_string(), "ns=2;i=1001");

        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node, NodeId::OBJECTS_FOLDER);
        assert_eq!(node.to_string(), "i=85");

        let node: NodeId = "ns=3;s=Line1.Motor".parse().unwrap();
        assert_eq!(node, NodeId::string(3, "Line1.Motor"));
    }

    #[test]
    fn test_node_id_parse_guid_and_opaque() {
        let node: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(node.identifier, NodeIdentifier::Guid(_)));

        let node: NodeId = "ns=1;b=SGVsbG8=".parse().unwrap();
        assert_eq!(node, NodeId::opaque(1, b"Hello".to_vec()));
        assert_eq!(node.to_string(), "ns=1;b=SGVsbG8=");
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("q=12".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_null() {
        assert!(NodeId::NULL.is_null());
        assert!(NodeId::string(0, "").is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
    }

    #[test]
    fn test_node_id_format() {
        let table = NamespaceTable::new(vec![
            OPC_UA_NAMESPACE.to_string(),
            "urn:test:server".to_string(),
        ]);
        let node = NodeId::numeric(1, 5);
        assert_eq!(node.format(&table, NamespaceFormat::Index), "ns=1;i=5");
        assert_eq!(node.format(&table, NamespaceFormat::Uri), "urn:test:server#i=5");
        assert_eq!(
            node.format(&table, NamespaceFormat::Expanded),
            "nsu=urn:test:server;i=5"
        );
        assert_eq!(NodeId::numeric(4, 5).format(&table, NamespaceFormat::Uri), "ns=4;i=5");
    }

    #[test]
    fn test_expanded_node_id() {
        let table = NamespaceTable::new(vec![
            OPC_UA_NAMESPACE.to_string(),
            "urn:a".to_string(),
            "urn:b".to_string(),
        ]);
        let expanded: ExpandedNodeId = "nsu=urn:b;s=Pump".parse().unwrap();
        assert_eq!(expanded.to_node_id(&table), Some(NodeId::string(2, "Pump")));
        assert_eq!(expanded.to_string(), "nsu=urn:b;s=Pump");

        let remote: ExpandedNodeId = "svr=1;ns=1;i=7".parse().unwrap();
        assert!(!remote.is_local());
        assert_eq!(remote.to_node_id(&table), None);

        let unknown: ExpandedNodeId = "nsu=urn:zzz;i=1".parse().unwrap();
        assert_eq!(unknown.to_node_id(&table), None);
    }

    #[test]
    fn test_qualified_name() {
        let name: QualifiedName = "2:Temperature".parse().unwrap();
        assert_eq!(name, QualifiedName::new(2, "Temperature"));
        assert_eq!(name.to_string(), "2:Temperature");

        let name: QualifiedName = "Objects".parse().unwrap();
        assert_eq!(name, QualifiedName::new(0, "Objects"));

        let name: QualifiedName = "urn:x:Thing".parse().unwrap();
        assert_eq!(name.namespace_index, 0);
        assert_eq!(name.name, "urn:x:Thing");

        assert!("".parse::<QualifiedName>().is_err());
    }

    #[test]
    fn test_node_class_mask() {
        let mask = NodeClass::mask(&[NodeClass::Object, NodeClass::Variable]);
        assert_eq!(mask, 3);
        assert!(NodeClass::Object.matches_mask(mask));
        assert!(!NodeClass::Method.matches_mask(mask));
        assert!(NodeClass::Method.matches_mask(0));
        assert_eq!(NodeClass::from_value(16), Some(NodeClass::VariableType));
        assert_eq!(NodeClass::from_value(3), None);
    }

    #[test]
    fn test_browse_direction_accepts() {
        assert!(BrowseDirection::Forward.accepts(true));
        assert!(!BrowseDirection::Forward.accepts(false));
        assert!(BrowseDirection::Inverse.accepts(false));
        assert!(BrowseDirection::Both.accepts(false));
    }

    #[test]
    fn test_namespace_table() {
        let table = NamespaceTable::new(vec![
            OPC_UA_NAMESPACE.to_string(),
            "http://example.com/UA/".to_string(),
        ]);
        assert_eq!(table.index_of("http://example.com/UA"), Some(1));
        assert_eq!(table.uri(1), Some("http://example.com/UA/"));
        assert_eq!(table.index_of("urn:none"), None);
        assert_eq!(NamespaceTable::default().len(), 1);
    }
}
