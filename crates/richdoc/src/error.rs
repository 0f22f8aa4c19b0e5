//! Engine error taxonomy.

use thiserror::Error;

/// Errors surfaced by the document engine.
///
/// `InvalidMutation` and `InvalidSelection` are programming-error class:
/// they abort the whole open transaction and nothing is applied.
/// `MalformedDocument` is data-quality class: deserialization failed and no
/// partial tree was installed. An unsupported node type is deliberately not
/// an error — it decodes to a tolerant pass-through node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    /// A structural invariant would be violated: wrong child type, mutating
    /// the root where forbidden, touching a missing or destroyed node.
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// A selection offset is out of range for the node it points at.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// The serialized document is structurally invalid.
    #[error("malformed document: {0}")]
    MalformedDocument(String),
}

impl DocError {
    pub(crate) fn mutation(msg: impl Into<String>) -> Self {
        DocError::InvalidMutation(msg.into())
    }

    pub(crate) fn selection(msg: impl Into<String>) -> Self {
        DocError::InvalidSelection(msg.into())
    }

    pub(crate) fn document(msg: impl Into<String>) -> Self {
        DocError::MalformedDocument(msg.into())
    }
}
