//! Versioned JSON wire format.
//!
//! The root object is `{ "root": <element> }`, with a sibling `"selection"`
//! key when a selection is active. Every node object carries a `type` tag
//! and a schema `version`; element objects add `children` (ordered),
//! `direction`, `format`, and `indent`; text objects add `text`, `detail`,
//! `format` (the bitmask), `mode`, and `style`.
//!
//! Decoding is tolerant where the data may legitimately disagree with this
//! build: unrecognized node types are preserved as opaque pass-through nodes
//! (never dropped), missing optional fields take documented defaults, and a
//! persisted selection that no longer fits the content is clamped and
//! flagged. Structural garbage — a non-object root, a node without a `type`
//! — is a [`DocError::MalformedDocument`] and installs nothing.

mod decode;
mod encode;

use serde_json::Value;

use crate::error::DocError;
use crate::node::NodeRegistry;
use crate::state::EditorState;

pub use decode::{RestoreReport, RestoredDocument};

/// Schema version stamped on every node object this build writes.
pub(crate) const NODE_VERSION: u64 = 1;

/// Encode a snapshot as a JSON value.
pub fn encode_state(state: &EditorState) -> Value {
    encode::state_to_value(state)
}

/// Decode a JSON value into a snapshot, resolving registered node types
/// through `registry`.
pub fn decode_state(value: &Value, registry: &NodeRegistry) -> Result<RestoredDocument, DocError> {
    decode::value_to_state(value, registry)
}

/// Serialize a snapshot to a JSON string.
pub fn to_json(state: &EditorState) -> Result<String, DocError> {
    serde_json::to_string(&encode_state(state))
        .map_err(|e| DocError::document(format!("serialization failed: {e}")))
}

/// Parse a JSON string into a snapshot.
pub fn from_json(text: &str, registry: &NodeRegistry) -> Result<RestoredDocument, DocError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| DocError::document(format!("invalid JSON: {e}")))?;
    decode_state(&value, registry)
}
