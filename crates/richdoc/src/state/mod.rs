//! Key→node store and immutable editor-state snapshots.
//!
//! # Overview
//!
//! [`NodeMap`] is the arena every higher component reads and writes through:
//! an ordered map from [`NodeKey`] to [`DocNode`] with O(1) lookup. Tree
//! shape lives in the element child sequences; the map itself is flat.
//! Re-parenting goes through [`NodeMap::splice_child`] /
//! [`NodeMap::push_child`], which atomically remove the child from its
//! previous parent — the single-parent invariant is enforced at this seam,
//! not left to callers.
//!
//! [`EditorState`] is an immutable snapshot: the full store at a point in
//! time plus the selection at that point. Snapshots are the unit of
//! undo/redo, diffing, and persistence.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::node::{DocNode, NodeKey, RootNode};
use crate::selection::Selection;

// ── NodeMap ───────────────────────────────────────────────────────────────

/// Ordered key→node store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeMap {
    nodes: IndexMap<NodeKey, DocNode>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: NodeKey) -> Option<&DocNode> {
        self.nodes.get(&key)
    }

    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut DocNode> {
        self.nodes.get_mut(&key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(&key)
    }

    /// Insert a node under its own key, replacing any previous value.
    pub fn insert(&mut self, node: DocNode) {
        self.nodes.insert(node.key(), node);
    }

    pub fn remove(&mut self, key: NodeKey) -> Option<DocNode> {
        self.nodes.shift_remove(&key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &DocNode)> {
        self.nodes.iter().map(|(k, n)| (*k, n))
    }

    /// Parent key and position of `key` within its parent's child sequence.
    pub fn position_of(&self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.get(key)?.parent()?;
        let index = self.get(parent)?.children().iter().position(|&c| c == key)?;
        Some((parent, index))
    }

    /// Detach `key` from its parent's child sequence, clearing the back
    /// reference. A detached node not re-attached before commit is destroyed.
    pub(crate) fn detach(&mut self, key: NodeKey) {
        if let Some((parent, index)) = self.position_of(key) {
            if let Some(body) = self.get_mut(parent).and_then(|n| n.element_mut()) {
                body.children.remove(index);
                body.version += 1;
            }
        }
        if let Some(node) = self.get_mut(key) {
            node.set_parent(None);
            node.bump_version();
        }
    }

    /// Insert `child` into `parent`'s sequence at `index`, detaching it from
    /// any previous parent first.
    pub(crate) fn splice_child(&mut self, parent: NodeKey, index: usize, child: NodeKey) {
        self.detach(child);
        if let Some(body) = self.get_mut(parent).and_then(|n| n.element_mut()) {
            let index = index.min(body.children.len());
            body.children.insert(index, child);
            body.version += 1;
        }
        if let Some(node) = self.get_mut(child) {
            node.set_parent(Some(parent));
            node.bump_version();
        }
    }

    /// Append `child` to the end of `parent`'s sequence, re-parenting
    /// atomically.
    pub(crate) fn push_child(&mut self, parent: NodeKey, child: NodeKey) {
        let end = self
            .get(parent)
            .map(|n| n.children().len())
            .unwrap_or_default();
        self.splice_child(parent, end, child);
    }
}

// ── EditorState ───────────────────────────────────────────────────────────

/// Immutable snapshot of the document tree plus the active selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    nodes: NodeMap,
    root: NodeKey,
    selection: Selection,
}

impl EditorState {
    /// A fresh document: a bare root with no children and no selection.
    pub fn new() -> Self {
        let root = RootNode::new();
        let root_key = root.body.key;
        let mut nodes = NodeMap::new();
        nodes.insert(DocNode::Root(root));
        Self {
            nodes,
            root: root_key,
            selection: Selection::None,
        }
    }

    pub(crate) fn from_parts(nodes: NodeMap, root: NodeKey, selection: Selection) -> Self {
        Self {
            nodes,
            root,
            selection,
        }
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn get(&self, key: NodeKey) -> Option<&DocNode> {
        self.nodes.get(key)
    }

    /// All keys reachable from the root, in depth-first order.
    pub fn reachable(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            out.push(key);
            if let Some(node) = self.nodes.get(key) {
                // Reverse so the leftmost child is visited first.
                stack.extend(node.children().iter().rev().copied());
            }
        }
        out
    }

    /// Whether `key` is reachable from the root via parent links.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = key;
        loop {
            if cursor == self.root {
                return true;
            }
            if !seen.insert(cursor) {
                return false;
            }
            match self.nodes.get(cursor).and_then(DocNode::parent) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    /// Structural comparison: walks both trees from their roots comparing
    /// node type, payload, and child order. Key identity and mutation
    /// counters are ignored, so a decoded copy of a document compares equal
    /// to the original.
    pub fn structurally_equal(&self, other: &EditorState) -> bool {
        subtree_equal(&self.nodes, self.root, &other.nodes, other.root)
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}

fn subtree_equal(a: &NodeMap, a_key: NodeKey, b: &NodeMap, b_key: NodeKey) -> bool {
    let (Some(na), Some(nb)) = (a.get(a_key), b.get(b_key)) else {
        return false;
    };
    if !payload_equal(na, nb) {
        return false;
    }
    let (ca, cb) = (na.children(), nb.children());
    if ca.len() != cb.len() {
        return false;
    }
    ca.iter()
        .zip(cb)
        .all(|(&x, &y)| subtree_equal(a, x, b, y))
}

/// Variant payload equality, excluding keys, parent links, and versions.
fn payload_equal(a: &DocNode, b: &DocNode) -> bool {
    match (a, b) {
        (DocNode::Root(_), DocNode::Root(_)) => element_attrs_equal(a, b),
        (DocNode::LineBreak(_), DocNode::LineBreak(_)) => true,
        (DocNode::Paragraph(_), DocNode::Paragraph(_)) => element_attrs_equal(a, b),
        (DocNode::Quote(_), DocNode::Quote(_)) => element_attrs_equal(a, b),
        (DocNode::Heading(x), DocNode::Heading(y)) => x.tag == y.tag && element_attrs_equal(a, b),
        (DocNode::Text(x), DocNode::Text(y)) => {
            x.text == y.text
                && x.format == y.format
                && x.detail == y.detail
                && x.mode == y.mode
                && x.style == y.style
        }
        (DocNode::Decorator(x), DocNode::Decorator(y)) => {
            x.tag == y.tag && x.payload == y.payload && x.inline == y.inline
        }
        (DocNode::Extension(x), DocNode::Extension(y)) => {
            x.tag == y.tag && x.fields == y.fields && element_attrs_equal(a, b)
        }
        (DocNode::Unknown(x), DocNode::Unknown(y)) => x.raw == y.raw,
        _ => false,
    }
}

fn element_attrs_equal(a: &DocNode, b: &DocNode) -> bool {
    match (a.element(), b.element()) {
        (Some(x), Some(y)) => {
            x.direction == y.direction && x.format == y.format && x.indent == y.indent
        }
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ParagraphNode, TextNode};

    /// Helper: root ← paragraph ← text("hello").
    fn small_doc() -> (EditorState, NodeKey, NodeKey) {
        let mut state = EditorState::new();
        let root = state.root_key();
        let para = ParagraphNode::new();
        let para_key = para.body.key;
        let text = TextNode::new("hello");
        let text_key = text.key;
        state.nodes.insert(DocNode::Paragraph(para));
        state.nodes.insert(DocNode::Text(text));
        state.nodes.push_child(root, para_key);
        state.nodes.push_child(para_key, text_key);
        (state, para_key, text_key)
    }

    #[test]
    fn push_child_sets_both_links() {
        let (state, para_key, text_key) = small_doc();
        let para = state.get(para_key).map(DocNode::children);
        assert_eq!(para, Some(&[text_key][..]));
        let text_parent = state.get(text_key).and_then(DocNode::parent);
        assert_eq!(text_parent, Some(para_key));
        assert!(state.is_attached(text_key));
    }

    #[test]
    fn splice_child_moves_between_parents() {
        let (mut state, para_key, text_key) = small_doc();
        let root = state.root_key();
        let second = ParagraphNode::new();
        let second_key = second.body.key;
        state.nodes.insert(DocNode::Paragraph(second));
        state.nodes.push_child(root, second_key);

        // Move the text node into the second paragraph; it must vanish from
        // the first one in the same step.
        state.nodes.push_child(second_key, text_key);
        assert!(state.get(para_key).map(DocNode::children).is_some_and(<[NodeKey]>::is_empty));
        assert_eq!(
            state.get(second_key).map(DocNode::children),
            Some(&[text_key][..])
        );
        assert_eq!(state.get(text_key).and_then(DocNode::parent), Some(second_key));
    }

    #[test]
    fn detach_makes_subtree_unreachable() {
        let (mut state, para_key, text_key) = small_doc();
        state.nodes.detach(para_key);
        assert!(!state.is_attached(para_key));
        assert!(!state.is_attached(text_key));
        assert_eq!(state.reachable(), vec![state.root_key()]);
    }

    #[test]
    fn structural_equality_ignores_keys() {
        let (a, _, _) = small_doc();
        let (b, _, _) = small_doc();
        assert!(a.structurally_equal(&b));
        assert_ne!(a, b); // keys differ
    }

    #[test]
    fn structural_equality_sees_payload_changes() {
        let (a, _, _) = small_doc();
        let (mut b, _, text_key) = small_doc();
        if let Some(DocNode::Text(t)) = b.nodes.get_mut(text_key) {
            t.text.push('!');
        }
        assert!(!a.structurally_equal(&b));
    }

    #[test]
    fn reachable_is_depth_first() {
        let (state, para_key, text_key) = small_doc();
        assert_eq!(state.reachable(), vec![state.root_key(), para_key, text_key]);
    }
}
