// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Relative browse paths and their resolution.
//!
//! # Path Syntax
//!
//! A path is a sequence of elements, each an optional reference prefix
//! followed by a target browse name:
//!
//! | Prefix          | Follows                                          |
//! |-----------------|--------------------------------------------------|
//! | *(none)*        | any forward reference                            |
//! | `/`             | HierarchicalReferences and subtypes              |
//! | `.`             | Aggregates and subtypes (immediate children)     |
//! | `<Name>`        | the named reference type and subtypes            |
//! | `<!Name>`       | the named reference type, inverse direction      |
//! | `<#Name>`       | the named reference type only, without subtypes  |
//!
//! Target names are `Name` (namespace 0), `<index>:Name` or `<uri>#Name`.
//! Reserved characters (`/ . < > : # ! &`) inside names are escaped with `&`.
//!
//! ```text
//! /Objects/2:Data.2:Static
//! <HasComponent>2:Pump<HasProperty>2:Speed
//! /urn&:plant#Line&.1
//! ```
//!
//! Paths given as a list of segments ([`RelativePath::from_segments`]) take
//! each target verbatim, so URIs need no escaping there:
//! `["Objects", "http://test.org/UA/Data/#Data"]`.
//!
//! # Resolution
//!
//! [`PathResolver`] walks the path one hop at a time. Every hop must match
//! exactly one node: no match is [`PathError::PathNotFound`], more than one
//! is [`PathError::AmbiguousPath`]. There is no backtracking.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, instrument};

use crate::browse::Browser;
use crate::cancel::CancellationSignal;
use crate::error::{OpcUaError, OpcUaResult, PathError};
use crate::service::{BrowseRequest, NodeService};
use crate::types::{ids, BrowseDirection, NamespaceTable, NodeId, QualifiedName};

// =============================================================================
// Reference filters
// =============================================================================

const WELL_KNOWN_REFERENCE_TYPES: &[(&str, NodeId)] = &[
    ("References", ids::REFERENCES),
    ("NonHierarchicalReferences", ids::NON_HIERARCHICAL_REFERENCES),
    ("HierarchicalReferences", ids::HIERARCHICAL_REFERENCES),
    ("HasChild", ids::HAS_CHILD),
    ("Organizes", ids::ORGANIZES),
    ("HasEventSource", ids::HAS_EVENT_SOURCE),
    ("HasModellingRule", ids::HAS_MODELLING_RULE),
    ("HasEncoding", ids::HAS_ENCODING),
    ("HasTypeDefinition", ids::HAS_TYPE_DEFINITION),
    ("GeneratesEvent", ids::GENERATES_EVENT),
    ("Aggregates", ids::AGGREGATES),
    ("HasSubtype", ids::HAS_SUBTYPE),
    ("HasProperty", ids::HAS_PROPERTY),
    ("HasComponent", ids::HAS_COMPONENT),
    ("HasNotifier", ids::HAS_NOTIFIER),
    ("HasOrderedComponent", NodeId::numeric(0, 49)),
    ("HasInterface", ids::HAS_INTERFACE),
];

/// Which references a path element follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFilter {
    /// Any forward reference.
    Any,
    /// `/`: HierarchicalReferences and subtypes.
    Hierarchical,
    /// `.`: Aggregates and subtypes.
    Aggregates,
    /// `<...>`: an explicit reference type.
    Explicit {
        /// Reference type node.
        reference_type_id: NodeId,
        /// Follow the reference in the inverse direction.
        is_inverse: bool,
        /// Include subtypes of the reference type.
        include_subtypes: bool,
    },
}

impl ReferenceFilter {
    fn to_request(&self, node_id: NodeId) -> BrowseRequest {
        let request = BrowseRequest::new(node_id);
        match self {
            Self::Any => request,
            Self::Hierarchical => request.with_reference_type(ids::HIERARCHICAL_REFERENCES, true),
            Self::Aggregates => request.with_reference_type(ids::AGGREGATES, true),
            Self::Explicit {
                reference_type_id,
                is_inverse,
                include_subtypes,
            } => request
                .with_reference_type(reference_type_id.clone(), *include_subtypes)
                .with_direction(if *is_inverse {
                    BrowseDirection::Inverse
                } else {
                    BrowseDirection::Forward
                }),
        }
    }
}

impl fmt::Display for ReferenceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => Ok(()),
            Self::Hierarchical => f.write_str("/"),
            Self::Aggregates => f.write_str("."),
            Self::Explicit {
                reference_type_id,
                is_inverse,
                include_subtypes,
            } => {
                f.write_str("<")?;
                if *is_inverse {
                    f.write_str("!")?;
                }
                if !*include_subtypes {
                    f.write_str("#")?;
                }
                match WELL_KNOWN_REFERENCE_TYPES
                    .iter()
                    .find(|(_, id)| id == reference_type_id)
                {
                    Some((name, _)) => f.write_str(name)?,
                    None => write!(f, "{}", reference_type_id)?,
                }
                f.write_str(">")
            }
        }
    }
}

// =============================================================================
// Target names
// =============================================================================

/// Namespace part of a target name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetNamespace {
    /// `<index>:Name`, or namespace 0 for a bare name.
    Index(u16),
    /// `<uri>#Name`.
    Uri(String),
}

/// The browse name a path element must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    /// Namespace.
    pub namespace: TargetNamespace,
    /// Name.
    pub name: String,
}

impl TargetName {
    /// Creates a target in namespace `index`.
    pub fn new(index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace: TargetNamespace::Index(index),
            name: name.into(),
        }
    }

    /// Creates a target in the namespace identified by `uri`.
    pub fn with_uri(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: TargetNamespace::Uri(uri.into()),
            name: name.into(),
        }
    }

    /// Resolves the namespace against a server table.
    fn qualified(&self, table: &NamespaceTable, path: &str) -> OpcUaResult<QualifiedName> {
        let index = match &self.namespace {
            TargetNamespace::Index(index) => *index,
            TargetNamespace::Uri(uri) => table
                .index_of(uri)
                .ok_or_else(|| PathError::unknown_namespace(path, uri.clone()))?,
        };
        Ok(QualifiedName::new(index, self.name.clone()))
    }

    /// Parses an unescaped target (`Name`, `2:Name`, `uri#Name`).
    fn parse_raw(raw: &str) -> Option<Self> {
        if let Some((uri, name)) = raw.rsplit_once('#') {
            if !uri.is_empty() && !name.is_empty() {
                return Some(Self::with_uri(uri, name));
            }
            return None;
        }
        if let Some((index, name)) = raw.split_once(':') {
            if let Ok(index) = index.parse::<u16>() {
                return (!name.is_empty()).then(|| Self::new(index, name));
            }
        }
        (!raw.is_empty()).then(|| Self::new(0, raw))
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            TargetNamespace::Index(0) => f.write_str(&escape(&self.name)),
            TargetNamespace::Index(index) => write!(f, "{}:{}", index, escape(&self.name)),
            TargetNamespace::Uri(uri) => write!(f, "{}#{}", escape(uri), escape(&self.name)),
        }
    }
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '/' | '.' | '<' | '>' | ':' | '#' | '!' | '&') {
            out.push('&');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// RelativePath
// =============================================================================

/// One hop of a relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathElement {
    /// References to follow.
    pub reference: ReferenceFilter,
    /// Browse name to match.
    pub target: TargetName,
}

impl PathElement {
    /// Creates an element following any forward reference.
    pub fn any(target: TargetName) -> Self {
        Self {
            reference: ReferenceFilter::Any,
            target,
        }
    }

    /// Creates an element following aggregates only.
    pub fn child(target: TargetName) -> Self {
        Self {
            reference: ReferenceFilter::Aggregates,
            target,
        }
    }
}

impl PathElement {
    /// Parses a single unescaped segment.
    ///
    /// Unlike the full path syntax, the target is taken verbatim so that
    /// namespace URIs need no escaping.
    pub fn parse_segment(segment: &str) -> OpcUaResult<Self> {
        let invalid = |reason: String| -> OpcUaError { PathError::invalid_path(segment, reason).into() };
        let (reference, rest) = if let Some(rest) = segment.strip_prefix('/') {
            (ReferenceFilter::Hierarchical, rest)
        } else if let Some(rest) = segment.strip_prefix('.') {
            (ReferenceFilter::Aggregates, rest)
        } else if let Some(body) = segment.strip_prefix('<') {
            let (body, rest) = body
                .split_once('>')
                .ok_or_else(|| invalid("Unterminated reference type".to_string()))?;
            let reference = explicit_reference(body)
                .ok_or_else(|| invalid(format!("Unknown reference type '{}'", body)))?;
            (reference, rest)
        } else {
            (ReferenceFilter::Any, segment)
        };
        let target = TargetName::parse_raw(rest).ok_or_else(|| invalid("Empty target name".to_string()))?;
        Ok(Self { reference, target })
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.reference, self.target)
    }
}

/// A parsed relative browse path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativePath {
    /// Hops in order.
    pub elements: Vec<PathElement>,
}

impl RelativePath {
    /// Builds a path from individually written segments.
    ///
    /// Each segment is one element: an optional prefix plus an unescaped
    /// target name, e.g. `["Objects", "http://test.org/UA/Data/#Data", ".2:Speed"]`.
    pub fn from_segments<I, T>(segments: I) -> OpcUaResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let elements = segments
            .into_iter()
            .map(|segment| PathElement::parse_segment(segment.as_ref()))
            .collect::<OpcUaResult<Vec<_>>>()?;
        Ok(Self { elements })
    }

    /// Returns `true` if the path has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl FromStr for RelativePath {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathParser::new(s).parse()
    }
}

struct PathParser<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> PathParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().peekable(),
        }
    }

    fn invalid(&self, reason: &str) -> OpcUaError {
        PathError::invalid_path(self.text, reason).into()
    }

    fn parse(mut self) -> OpcUaResult<RelativePath> {
        let mut elements = Vec::new();
        while self.chars.peek().is_some() {
            let reference = self.parse_reference()?;
            let target = self.parse_target()?;
            elements.push(PathElement { reference, target });
        }
        Ok(RelativePath { elements })
    }

    fn parse_reference(&mut self) -> OpcUaResult<ReferenceFilter> {
        match self.chars.peek() {
            Some('/') => {
                self.chars.next();
                Ok(ReferenceFilter::Hierarchical)
            }
            Some('.') => {
                self.chars.next();
                Ok(ReferenceFilter::Aggregates)
            }
            Some('<') => {
                self.chars.next();
                let mut body = String::new();
                loop {
                    match self.chars.next() {
                        Some('>') => break,
                        Some('&') => match self.chars.next() {
                            Some(c) => body.push(c),
                            None => return Err(self.invalid("Dangling escape character")),
                        },
                        Some(c) => body.push(c),
                        None => return Err(self.invalid("Unterminated reference type")),
                    }
                }
                explicit_reference(&body).ok_or_else(|| {
                    self.invalid(&format!("Unknown reference type '{}'", body))
                })
            }
            _ => Ok(ReferenceFilter::Any),
        }
    }

    fn parse_target(&mut self) -> OpcUaResult<TargetName> {
        // Escaped characters are kept literally; only unescaped ':' and '#'
        // separate the namespace from the name.
        let mut prefix = String::new();
        let mut name = String::new();
        let mut separator: Option<char> = None;
        while let Some(&c) = self.chars.peek() {
            match c {
                '/' | '.' | '<' => break,
                '&' => {
                    self.chars.next();
                    match self.chars.next() {
                        Some(escaped) => name.push(escaped),
                        None => return Err(self.invalid("Dangling escape character")),
                    }
                }
                '#' if separator != Some('#') => {
                    self.chars.next();
                    prefix = match separator {
                        Some(_) => format!("{}:{}", prefix, name),
                        None => name.clone(),
                    };
                    name.clear();
                    separator = Some('#');
                }
                ':' if separator.is_none() => {
                    self.chars.next();
                    prefix = std::mem::take(&mut name);
                    separator = Some(':');
                }
                _ => {
                    self.chars.next();
                    name.push(c);
                }
            }
        }
        if name.is_empty() {
            return Err(self.invalid("Empty target name"));
        }
        match separator {
            None => Ok(TargetName::new(0, name)),
            Some('#') => Ok(TargetName::with_uri(prefix, name)),
            Some(_) => match prefix.parse::<u16>() {
                Ok(index) => Ok(TargetName::new(index, name)),
                Err(_) => Err(self.invalid(&format!("Invalid namespace index '{}'", prefix))),
            },
        }
    }
}

/// Parses the body of a `<...>` prefix: flags followed by a reference type
/// name or node id.
fn explicit_reference(body: &str) -> Option<ReferenceFilter> {
    let mut is_inverse = false;
    let mut include_subtypes = true;
    let mut name = body;
    loop {
        if let Some(rest) = name.strip_prefix('!') {
            is_inverse = true;
            name = rest;
        } else if let Some(rest) = name.strip_prefix('#') {
            include_subtypes = false;
            name = rest;
        } else {
            break;
        }
    }
    let bare = name.strip_prefix("0:").unwrap_or(name);
    let reference_type_id = WELL_KNOWN_REFERENCE_TYPES
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|(_, id)| id.clone())
        .or_else(|| name.parse::<NodeId>().ok())?;
    Some(ReferenceFilter::Explicit {
        reference_type_id,
        is_inverse,
        include_subtypes,
    })
}

// =============================================================================
// PathResolver
// =============================================================================

/// Resolves relative paths one hop at a time.
#[derive(Debug)]
pub struct PathResolver<S: NodeService + ?Sized> {
    browser: Browser<S>,
}

impl<S: NodeService + ?Sized> Clone for PathResolver<S> {
    fn clone(&self) -> Self {
        Self {
            browser: self.browser.clone(),
        }
    }
}

impl<S: NodeService + ?Sized> PathResolver<S> {
    /// Creates a resolver.
    pub fn new(browser: Browser<S>) -> Self {
        Self { browser }
    }

    /// Resolves `path` from `start`. A null start means RootFolder.
    #[instrument(skip(self, cancel), fields(start = %start, path = %path))]
    pub async fn resolve(
        &self,
        start: &NodeId,
        path: &RelativePath,
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        let path_text = path.to_string();
        let table = self.browser.namespace_table().await?;
        let mut current = if start.is_null() {
            NodeId::ROOT_FOLDER
        } else {
            start.clone()
        };

        for element in &path.elements {
            cancel.check()?;
            let wanted = element.target.qualified(&table, &path_text)?;
            let references = self
                .browser
                .browse_all(element.reference.to_request(current.clone()), cancel)
                .await?;

            let mut matches: Vec<NodeId> = Vec::new();
            for reference in references {
                if reference.browse_name != wanted {
                    continue;
                }
                if let Some(node_id) = reference.node_id.to_node_id(&table) {
                    if !matches.contains(&node_id) {
                        matches.push(node_id);
                    }
                }
            }

            current = match matches.len() {
                0 => return Err(PathError::not_found(&path_text, element.to_string()).into()),
                1 => matches.remove(0),
                n => return Err(PathError::ambiguous(&path_text, element.to_string(), n).into()),
            };
            debug!(segment = %element, node_id = %current, "Path hop resolved");
        }

        Ok(current)
    }

    /// Parses each segment and resolves the resulting path.
    pub async fn resolve_segments<T: AsRef<str>>(
        &self,
        start: &NodeId,
        segments: &[T],
        cancel: &CancellationSignal,
    ) -> OpcUaResult<NodeId> {
        let path = RelativePath::from_segments(segments.iter().map(AsRef::as_ref))?;
        self.resolve(start, &path, cancel).await
    }
}
