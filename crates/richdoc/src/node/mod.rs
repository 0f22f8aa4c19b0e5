//! Document node types.
//!
//! # Node Types
//!
//! | Rust type       | Wire tag      | Semantics                              |
//! |-----------------|---------------|----------------------------------------|
//! | `RootNode`      | `root`        | Document root, one per document        |
//! | `ParagraphNode` | `paragraph`   | Default block element                  |
//! | `QuoteNode`     | `quote`       | Block quote (minimum indent 1)         |
//! | `HeadingNode`   | `heading`     | Heading block with an `h1`–`h5` tag    |
//! | `TextNode`      | `text`        | Leaf text run with a format bitmask    |
//! | `LineBreakNode` | `linebreak`   | Zero-width structural marker           |
//! | `DecoratorNode` | *(registered)*| Atomic opaque content (media, embeds)  |
//! | `ExtensionNode` | *(registered)*| Collaborator-defined element type      |
//! | `UnknownNode`   | *(any)*       | Tolerant pass-through for foreign data |
//!
//! Nodes reference each other by [`NodeKey`] only; the key→node store in
//! [`crate::state`] is the single owner of node values, and an element's
//! child sequence is the single source of truth for tree shape.

pub mod element;
pub mod leaf;
pub mod registry;
pub mod text;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use element::{ElementBody, HeadingNode, HeadingTag, ParagraphNode, QuoteNode, RootNode};
pub use leaf::{DecoratorNode, LineBreakNode, UnknownNode};
pub use registry::{ExtensionKind, ExtensionNode, NodeBehavior, NodeRegistry};
pub use text::{TextFormat, TextMode, TextNode};

// ── NodeKey ───────────────────────────────────────────────────────────────

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique node identifier.
///
/// Stable across mutations of the same logical node and never reused after a
/// node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

impl NodeKey {
    /// Allocate the next fresh key.
    pub fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Block attributes ──────────────────────────────────────────────────────

/// Text direction of a block element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ltr" => Some(Direction::Ltr),
            "rtl" => Some(Direction::Rtl),
            _ => None,
        }
    }
}

/// Block-level alignment format. Serialized as a string; the empty string
/// means "unspecified".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElementFormat {
    #[default]
    Unspecified,
    Left,
    Start,
    Center,
    Right,
    End,
    Justify,
}

impl ElementFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ElementFormat::Unspecified => "",
            ElementFormat::Left => "left",
            ElementFormat::Start => "start",
            ElementFormat::Center => "center",
            ElementFormat::Right => "right",
            ElementFormat::End => "end",
            ElementFormat::Justify => "justify",
        }
    }

    /// Parse a wire string; unrecognized values decode as unspecified.
    pub fn parse(s: &str) -> Self {
        match s {
            "left" => ElementFormat::Left,
            "start" => ElementFormat::Start,
            "center" => ElementFormat::Center,
            "right" => ElementFormat::Right,
            "end" => ElementFormat::End,
            "justify" => ElementFormat::Justify,
            _ => ElementFormat::Unspecified,
        }
    }
}

// ── DocNode enum ──────────────────────────────────────────────────────────

/// All document node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Root(RootNode),
    Paragraph(ParagraphNode),
    Quote(QuoteNode),
    Heading(HeadingNode),
    Text(TextNode),
    LineBreak(LineBreakNode),
    Decorator(DecoratorNode),
    Extension(ExtensionNode),
    Unknown(UnknownNode),
}

impl DocNode {
    pub fn key(&self) -> NodeKey {
        match self {
            Self::Root(n) => n.body.key,
            Self::Paragraph(n) => n.body.key,
            Self::Quote(n) => n.body.key,
            Self::Heading(n) => n.body.key,
            Self::Text(n) => n.key,
            Self::LineBreak(n) => n.key,
            Self::Decorator(n) => n.key,
            Self::Extension(n) => n.body.key,
            Self::Unknown(n) => n.key,
        }
    }

    pub fn parent(&self) -> Option<NodeKey> {
        match self {
            Self::Root(_) => None,
            Self::Paragraph(n) => n.body.parent,
            Self::Quote(n) => n.body.parent,
            Self::Heading(n) => n.body.parent,
            Self::Text(n) => n.parent,
            Self::LineBreak(n) => n.parent,
            Self::Decorator(n) => n.parent,
            Self::Extension(n) => n.body.parent,
            Self::Unknown(n) => n.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeKey>) {
        match self {
            Self::Root(_) => {}
            Self::Paragraph(n) => n.body.parent = parent,
            Self::Quote(n) => n.body.parent = parent,
            Self::Heading(n) => n.body.parent = parent,
            Self::Text(n) => n.parent = parent,
            Self::LineBreak(n) => n.parent = parent,
            Self::Decorator(n) => n.parent = parent,
            Self::Extension(n) => n.body.parent = parent,
            Self::Unknown(n) => n.parent = parent,
        }
    }

    /// Per-node mutation counter. Not persisted; used for change detection.
    pub fn version(&self) -> u64 {
        match self {
            Self::Root(n) => n.body.version,
            Self::Paragraph(n) => n.body.version,
            Self::Quote(n) => n.body.version,
            Self::Heading(n) => n.body.version,
            Self::Text(n) => n.version,
            Self::LineBreak(n) => n.version,
            Self::Decorator(n) => n.version,
            Self::Extension(n) => n.body.version,
            Self::Unknown(n) => n.version,
        }
    }

    pub(crate) fn bump_version(&mut self) {
        match self {
            Self::Root(n) => n.body.version += 1,
            Self::Paragraph(n) => n.body.version += 1,
            Self::Quote(n) => n.body.version += 1,
            Self::Heading(n) => n.body.version += 1,
            Self::Text(n) => n.version += 1,
            Self::LineBreak(n) => n.version += 1,
            Self::Decorator(n) => n.version += 1,
            Self::Extension(n) => n.body.version += 1,
            Self::Unknown(n) => n.version += 1,
        }
    }

    /// The serialized type tag of this node.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Root(_) => "root",
            Self::Paragraph(_) => "paragraph",
            Self::Quote(_) => "quote",
            Self::Heading(_) => "heading",
            Self::Text(_) => "text",
            Self::LineBreak(_) => "linebreak",
            Self::Decorator(n) => &n.tag,
            Self::Extension(n) => &n.tag,
            Self::Unknown(n) => n.type_tag(),
        }
    }

    /// Shared element attribute set, if this node is an element.
    pub fn element(&self) -> Option<&ElementBody> {
        match self {
            Self::Root(n) => Some(&n.body),
            Self::Paragraph(n) => Some(&n.body),
            Self::Quote(n) => Some(&n.body),
            Self::Heading(n) => Some(&n.body),
            Self::Extension(n) => Some(&n.body),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementBody> {
        match self {
            Self::Root(n) => Some(&mut n.body),
            Self::Paragraph(n) => Some(&mut n.body),
            Self::Quote(n) => Some(&mut n.body),
            Self::Heading(n) => Some(&mut n.body),
            Self::Extension(n) => Some(&mut n.body),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.element().is_some()
    }

    /// Ordered child keys; empty for leaves.
    pub fn children(&self) -> &[NodeKey] {
        match self.element() {
            Some(body) => &body.children,
            None => &[],
        }
    }

    /// Inline nodes live inside block elements (text runs, line breaks,
    /// inline decorators).
    pub fn is_inline(&self) -> bool {
        match self {
            Self::Text(_) | Self::LineBreak(_) => true,
            Self::Decorator(n) => n.inline,
            Self::Extension(n) => n.kind == ExtensionKind::Inline,
            _ => false,
        }
    }

    /// Block nodes are the allowed children of the root.
    pub fn is_block(&self) -> bool {
        match self {
            Self::Paragraph(_) | Self::Quote(_) | Self::Heading(_) => true,
            Self::Decorator(n) => !n.inline,
            Self::Extension(n) => n.kind == ExtensionKind::Block,
            Self::Unknown(_) => true,
            _ => false,
        }
    }

    /// Whether `child` may appear in this node's child sequence.
    ///
    /// Core variants are matched directly; extension elements defer to their
    /// registered predicate. Violations fail the mutation, they are never
    /// silently coerced.
    pub fn accepts_child(&self, child: &DocNode, registry: &NodeRegistry) -> bool {
        match self {
            Self::Root(_) => child.is_block(),
            Self::Paragraph(_) | Self::Quote(_) | Self::Heading(_) => child.is_inline(),
            Self::Extension(n) => match registry.get(&n.tag).and_then(|b| b.allows_child) {
                Some(pred) => pred(child),
                None => child.is_inline(),
            },
            // Leaves and pass-through nodes never hold children.
            _ => false,
        }
    }

    /// The smallest legal indent for this variant.
    pub fn min_indent(&self) -> u32 {
        match self {
            Self::Quote(_) => 1,
            _ => 0,
        }
    }
}
