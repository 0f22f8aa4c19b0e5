//! Element (container) node variants.
//!
//! Elements own their children by key: removing a key from the parent's
//! sequence detaches the child, and a detached child not re-attached before
//! commit is destroyed. The `parent` link is a non-owning back-reference.

use super::{Direction, ElementFormat, NodeKey};

/// Attribute set shared by every element variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBody {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub direction: Option<Direction>,
    pub format: ElementFormat,
    pub indent: u32,
    pub version: u64,
}

impl ElementBody {
    pub(crate) fn new() -> Self {
        Self {
            key: NodeKey::next(),
            parent: None,
            children: Vec::new(),
            direction: None,
            format: ElementFormat::Unspecified,
            indent: 0,
            version: 0,
        }
    }
}

// ── RootNode ──────────────────────────────────────────────────────────────

/// Document root. Exactly one per document; has no parent, is never
/// deletable or wrappable. Children are top-level block nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    pub body: ElementBody,
}

impl RootNode {
    pub fn new() -> Self {
        Self {
            body: ElementBody::new(),
        }
    }
}

impl Default for RootNode {
    fn default() -> Self {
        Self::new()
    }
}

// ── ParagraphNode ─────────────────────────────────────────────────────────

/// The default block element. Created wherever a "default block" is called
/// for: empty documents, block splits, collapsed quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphNode {
    pub body: ElementBody,
}

impl ParagraphNode {
    pub fn new() -> Self {
        Self {
            body: ElementBody::new(),
        }
    }
}

impl Default for ParagraphNode {
    fn default() -> Self {
        Self::new()
    }
}

// ── QuoteNode ─────────────────────────────────────────────────────────────

/// Block quote. Always indented at least one level.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteNode {
    pub body: ElementBody,
}

impl QuoteNode {
    pub fn new() -> Self {
        let mut body = ElementBody::new();
        body.indent = 1;
        Self { body }
    }
}

impl Default for QuoteNode {
    fn default() -> Self {
        Self::new()
    }
}

// ── HeadingNode ───────────────────────────────────────────────────────────

/// Heading level tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingTag {
    H1,
    H2,
    H3,
    H4,
    H5,
}

impl HeadingTag {
    pub fn as_str(self) -> &'static str {
        match self {
            HeadingTag::H1 => "h1",
            HeadingTag::H2 => "h2",
            HeadingTag::H3 => "h3",
            HeadingTag::H4 => "h4",
            HeadingTag::H5 => "h5",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "h1" => Some(HeadingTag::H1),
            "h2" => Some(HeadingTag::H2),
            "h3" => Some(HeadingTag::H3),
            "h4" => Some(HeadingTag::H4),
            "h5" => Some(HeadingTag::H5),
            _ => None,
        }
    }
}

/// Heading block element.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingNode {
    pub body: ElementBody,
    pub tag: HeadingTag,
}

impl HeadingNode {
    pub fn new(tag: HeadingTag) -> Self {
        Self {
            body: ElementBody::new(),
            tag,
        }
    }
}
