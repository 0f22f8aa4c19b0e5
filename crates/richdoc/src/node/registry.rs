//! Registry of collaborator-defined node types.
//!
//! The core node set is a closed enum; everything else (lists, links,
//! images, …) enters the tree through this registry. A registered type tag
//! maps to a [`NodeBehavior`] — how to decode its extra fields, which
//! children it accepts, and how to construct a default instance. The codec
//! and the validator match core tags first and fall back here; a tag found in
//! neither place decodes to a tolerant [`super::UnknownNode`].

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::{DocNode, ElementBody};

/// Wire fields owned by the engine on every element; everything else in a
/// serialized extension object is collaborator payload.
pub(crate) const STANDARD_ELEMENT_FIELDS: &[&str] =
    &["children", "direction", "format", "indent", "type", "version"];

/// Where a registered node type sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    /// Element accepted by the root (e.g. a list).
    Block,
    /// Element accepted inside blocks (e.g. a link).
    Inline,
    /// Atomic decorator content (e.g. an image).
    Decorator,
}

/// Behavior contributed by the collaborator that registered a node type.
#[derive(Clone, Copy)]
pub struct NodeBehavior {
    pub kind: ExtensionKind,
    /// Predicate over candidate children; `None` means "inline children",
    /// the default element rule. Ignored for decorators.
    pub allows_child: Option<fn(&DocNode) -> bool>,
    /// Extract the collaborator field bag from a serialized object. `None`
    /// copies every non-standard field opaquely.
    pub decode_fields: Option<fn(&Map<String, Value>) -> Map<String, Value>>,
    /// Field bag for a freshly constructed default instance.
    pub default_fields: Option<fn() -> Map<String, Value>>,
}

impl NodeBehavior {
    pub fn element(kind: ExtensionKind) -> Self {
        Self {
            kind,
            allows_child: None,
            decode_fields: None,
            default_fields: None,
        }
    }

    pub fn decorator() -> Self {
        Self {
            kind: ExtensionKind::Decorator,
            allows_child: None,
            decode_fields: None,
            default_fields: None,
        }
    }

    pub fn with_allows_child(mut self, pred: fn(&DocNode) -> bool) -> Self {
        self.allows_child = Some(pred);
        self
    }

    pub fn with_decode_fields(mut self, f: fn(&Map<String, Value>) -> Map<String, Value>) -> Self {
        self.decode_fields = Some(f);
        self
    }

    pub fn with_default_fields(mut self, f: fn() -> Map<String, Value>) -> Self {
        self.default_fields = Some(f);
        self
    }

    /// Apply the decode hook, or the opaque default: every field the engine
    /// does not own is kept as-is.
    pub(crate) fn decode_field_bag(&self, raw: &Map<String, Value>) -> Map<String, Value> {
        match self.decode_fields {
            Some(f) => f(raw),
            None => strip_standard_fields(raw),
        }
    }
}

pub(crate) fn strip_standard_fields(raw: &Map<String, Value>) -> Map<String, Value> {
    raw.iter()
        .filter(|(k, _)| !STANDARD_ELEMENT_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Type-tag → behavior table.
#[derive(Default)]
pub struct NodeRegistry {
    types: HashMap<String, NodeBehavior>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the behavior for a type tag.
    pub fn register(&mut self, tag: impl Into<String>, behavior: NodeBehavior) {
        self.types.insert(tag.into(), behavior);
    }

    pub fn get(&self, tag: &str) -> Option<&NodeBehavior> {
        self.types.get(tag)
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }
}

// ── ExtensionNode ─────────────────────────────────────────────────────────

/// A registered, collaborator-defined element instance.
///
/// Carries the ordinary element attribute set plus the collaborator's opaque
/// field bag (e.g. a list item's ordinal `value`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub body: ElementBody,
    pub tag: String,
    pub kind: ExtensionKind,
    pub fields: Map<String, Value>,
}

impl ExtensionNode {
    pub fn new(tag: impl Into<String>, kind: ExtensionKind, fields: Map<String, Value>) -> Self {
        Self {
            body: ElementBody::new(),
            tag: tag.into(),
            kind,
            fields,
        }
    }
}
