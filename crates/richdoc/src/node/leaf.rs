//! Structural and opaque leaf nodes.

use serde_json::{Map, Value};

use super::NodeKey;

// ── LineBreakNode ─────────────────────────────────────────────────────────

/// Zero-width structural marker inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct LineBreakNode {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    pub version: u64,
}

impl LineBreakNode {
    pub fn new() -> Self {
        Self {
            key: NodeKey::next(),
            parent: None,
            version: 0,
        }
    }
}

impl Default for LineBreakNode {
    fn default() -> Self {
        Self::new()
    }
}

// ── DecoratorNode ─────────────────────────────────────────────────────────

/// Atomic opaque content rendered by a collaborator (embedded media and the
/// like). Not content-editable internally; selected whole via a node
/// selection, never entered by a text caret.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratorNode {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    /// Registered type tag this decorator serializes under.
    pub tag: String,
    /// Collaborator-owned payload; the engine never interprets it.
    pub payload: Map<String, Value>,
    /// Inline decorators sit inside blocks; block decorators sit in the root.
    pub inline: bool,
    pub version: u64,
}

impl DecoratorNode {
    pub fn new(tag: impl Into<String>, payload: Map<String, Value>, inline: bool) -> Self {
        Self {
            key: NodeKey::next(),
            parent: None,
            tag: tag.into(),
            payload,
            inline,
            version: 0,
        }
    }
}

// ── UnknownNode ───────────────────────────────────────────────────────────

/// Tolerant pass-through for serialized node types this build does not
/// understand. The raw JSON object is preserved verbatim so the document can
/// be loaded, edited elsewhere, and re-saved without losing content.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownNode {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    /// The original serialized object, children included, untouched.
    pub raw: Map<String, Value>,
    pub version: u64,
}

impl UnknownNode {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self {
            key: NodeKey::next(),
            parent: None,
            raw,
            version: 0,
        }
    }

    pub fn type_tag(&self) -> &str {
        self.raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_node_reports_wire_type() {
        let raw = json!({"type": "poll", "version": 2, "question": "?"});
        let node = UnknownNode::new(raw.as_object().cloned().unwrap_or_default());
        assert_eq!(node.type_tag(), "poll");
    }

    #[test]
    fn unknown_node_without_type_falls_back() {
        let node = UnknownNode::new(Map::new());
        assert_eq!(node.type_tag(), "unknown");
    }
}
