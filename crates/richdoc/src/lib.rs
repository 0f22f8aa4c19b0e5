//! richdoc — structured rich-text document engine.
//!
//! # Overview
//!
//! A document is a typed node tree: a single root, block elements
//! (paragraphs, quotes, headings, registered collaborator types), and leaf
//! content (text runs with a style bitmask, line breaks, atomic decorators).
//! Nodes are addressed by stable opaque keys, independent of tree position.
//!
//! All mutation flows through [`Editor::update`]: the body edits a working
//! copy through a [`Transaction`], the whole batch is validated against the
//! structural invariants, and either a single new immutable [`EditorState`]
//! snapshot is committed — listeners notified once, selection reconciled —
//! or the batch aborts and the previous snapshot stays untouched.
//!
//! Documents persist through a versioned JSON format ([`to_json`] /
//! [`from_json`]) that round-trips every known node type structurally and
//! preserves unrecognized types as opaque pass-through nodes.
//!
//! ```
//! use richdoc::{Editor, Point, Selection};
//!
//! let mut editor = Editor::new();
//! editor.update(|tx| {
//!     let para = tx.create_paragraph();
//!     let text = tx.create_text("hello");
//!     tx.append(para, &[text])?;
//!     let root = tx.root_key();
//!     tx.append(root, &[para])?;
//!     tx.set_selection(Selection::caret(Point::text(text, 5)))
//! })?;
//! let json = editor.export_json()?;
//! # Ok::<(), richdoc::DocError>(())
//! ```

pub mod codec;
pub mod editor;
pub mod error;
pub mod node;
pub mod selection;
pub mod state;
pub mod theme;

pub use codec::{decode_state, encode_state, from_json, to_json, RestoreReport, RestoredDocument};
pub use editor::{ChangeEvent, Editor, ListenerId, Transaction, UpdateQueue};
pub use error::DocError;
pub use node::{
    DecoratorNode, Direction, DocNode, ElementBody, ElementFormat, ExtensionKind, ExtensionNode,
    HeadingNode, HeadingTag, LineBreakNode, NodeBehavior, NodeKey, NodeRegistry, ParagraphNode,
    QuoteNode, RootNode, TextFormat, TextMode, TextNode, UnknownNode,
};
pub use selection::{NodeSelection, Point, PointKind, RangeSelection, Selection};
pub use state::{EditorState, NodeMap};
pub use theme::{attributes_for, AttributeBag, Theme};
