//! Caret, range, and node selection.
//!
//! A selection is either a *range* (anchor/focus points over text or element
//! positions, where anchor-after-focus encodes a backwards selection), a
//! *node* selection (whole atomic nodes, used for decorators), or nothing.
//!
//! Offsets are always revalidated against the current text length or child
//! count before use. During live editing an out-of-range offset is a
//! programming error and fails with [`DocError::InvalidSelection`]; during
//! restore from persisted data it is clamped and flagged instead, because
//! the document may have shrunk since the selection was saved.

use std::collections::BTreeSet;

use crate::error::DocError;
use crate::node::{DocNode, NodeKey};
use crate::state::NodeMap;

// ── Point ─────────────────────────────────────────────────────────────────

/// How a point's offset is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Character offset inside a text node.
    Text,
    /// Child index inside an element node.
    Element,
}

impl PointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointKind::Text => "text",
            PointKind::Element => "element",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(PointKind::Text),
            "element" => Some(PointKind::Element),
            _ => None,
        }
    }
}

/// A single caret position: node key plus offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub key: NodeKey,
    pub offset: usize,
    pub kind: PointKind,
}

impl Point {
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }

    /// Maximum legal offset for this point against the current tree, or
    /// `None` when the point no longer resolves to a node of the right kind.
    fn limit(&self, nodes: &NodeMap) -> Option<usize> {
        let node = nodes.get(self.key)?;
        match (self.kind, node) {
            (PointKind::Text, DocNode::Text(t)) => Some(t.len()),
            (PointKind::Element, n) if n.is_element() => Some(n.children().len()),
            _ => None,
        }
    }

    /// Strict check used on the live-editing path.
    pub(crate) fn validate(&self, nodes: &NodeMap) -> Result<(), DocError> {
        let limit = self.limit(nodes).ok_or_else(|| {
            DocError::selection(format!(
                "point {} does not resolve to a {} position",
                self.key,
                self.kind.as_str()
            ))
        })?;
        if self.offset > limit {
            return Err(DocError::selection(format!(
                "offset {} out of range for {} (max {})",
                self.offset, self.key, limit
            )));
        }
        Ok(())
    }

    /// Tolerant adjustment used on the restore path. Returns whether the
    /// offset was pulled in range, or `None` when the point is unsalvageable.
    pub(crate) fn clamped(&self, nodes: &NodeMap) -> Option<(Point, bool)> {
        let limit = self.limit(nodes)?;
        if self.offset > limit {
            let mut point = *self;
            point.offset = limit;
            Some((point, true))
        } else {
            Some((*self, false))
        }
    }
}

// ── RangeSelection ────────────────────────────────────────────────────────

/// Anchor/focus pair. The anchor is where the selection began; the focus is
/// where it ends. Anchor after focus means the user selected backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    pub anchor: Point,
    pub focus: Point,
}

impl RangeSelection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// A collapsed range — a plain caret.
    pub fn caret(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

// ── NodeSelection ─────────────────────────────────────────────────────────

/// Whole nodes selected without a text caret (atomic/decorator nodes).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSelection {
    pub keys: BTreeSet<NodeKey>,
}

impl NodeSelection {
    pub fn single(key: NodeKey) -> Self {
        let mut keys = BTreeSet::new();
        keys.insert(key);
        Self { keys }
    }
}

// ── Selection ─────────────────────────────────────────────────────────────

/// The active selection of an editor state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Selection {
    Range(RangeSelection),
    Node(NodeSelection),
    #[default]
    None,
}

impl Selection {
    pub fn caret(point: Point) -> Self {
        Selection::Range(RangeSelection::caret(point))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }

    /// Strict validation against the current tree (live-editing path).
    pub(crate) fn validate(&self, nodes: &NodeMap) -> Result<(), DocError> {
        match self {
            Selection::Range(range) => {
                range.anchor.validate(nodes)?;
                range.focus.validate(nodes)
            }
            Selection::Node(node_sel) => {
                if node_sel.keys.is_empty() {
                    return Err(DocError::selection("empty node selection"));
                }
                for &key in &node_sel.keys {
                    if !nodes.contains(key) {
                        return Err(DocError::selection(format!("selected node {key} missing")));
                    }
                }
                Ok(())
            }
            Selection::None => Ok(()),
        }
    }

    /// Tolerant adjustment (restore path): pull offsets in range, drop
    /// missing keys, collapse to `None` when nothing survives. Returns the
    /// adjusted selection and whether anything had to change.
    pub fn clamped(&self, nodes: &NodeMap) -> (Selection, bool) {
        match self {
            Selection::Range(range) => {
                match (range.anchor.clamped(nodes), range.focus.clamped(nodes)) {
                    (Some((anchor, a)), Some((focus, b))) => {
                        (Selection::Range(RangeSelection { anchor, focus }), a || b)
                    }
                    _ => (Selection::None, true),
                }
            }
            Selection::Node(node_sel) => {
                let keys: BTreeSet<NodeKey> = node_sel
                    .keys
                    .iter()
                    .copied()
                    .filter(|&k| nodes.contains(k))
                    .collect();
                let changed = keys.len() != node_sel.keys.len();
                if keys.is_empty() {
                    (Selection::None, true)
                } else {
                    (Selection::Node(NodeSelection { keys }), changed)
                }
            }
            Selection::None => (Selection::None, false),
        }
    }
}

// ── Commit-time reconciliation ────────────────────────────────────────────

/// Adjust a selection after a commit destroyed nodes.
///
/// A point whose node survived keeps its position (offset pulled in range if
/// the content shrank). A point whose node was destroyed moves to the
/// boundary of its nearest surviving ancestor — at the child index the lost
/// subtree occupied, per the pre-commit tree — or the whole selection
/// becomes `None` when no ancestor survives.
pub(crate) fn reconcile(selection: &Selection, prev: &NodeMap, next: &NodeMap) -> Selection {
    match selection {
        Selection::Range(range) => {
            let anchor = reconcile_point(&range.anchor, prev, next);
            let focus = reconcile_point(&range.focus, prev, next);
            match (anchor, focus) {
                (Some(anchor), Some(focus)) => Selection::Range(RangeSelection { anchor, focus }),
                _ => Selection::None,
            }
        }
        Selection::Node(node_sel) => {
            let keys: BTreeSet<NodeKey> = node_sel
                .keys
                .iter()
                .copied()
                .filter(|&k| next.contains(k))
                .collect();
            if keys.is_empty() {
                Selection::None
            } else {
                Selection::Node(NodeSelection { keys })
            }
        }
        Selection::None => Selection::None,
    }
}

fn reconcile_point(point: &Point, prev: &NodeMap, next: &NodeMap) -> Option<Point> {
    if next.contains(point.key) {
        return point.clamped(next).map(|(p, _)| p);
    }
    // Walk the pre-commit parent chain until a node that survived.
    let mut child = point.key;
    let mut seen = std::collections::HashSet::new();
    while let Some(parent) = prev.get(child).and_then(DocNode::parent) {
        if !seen.insert(child) {
            return None;
        }
        if next.contains(parent) {
            let index = prev
                .get(parent)
                .map(|n| n.children().iter().position(|&c| c == child).unwrap_or(0))
                .unwrap_or(0);
            let limit = next.get(parent).map(|n| n.children().len()).unwrap_or(0);
            return Some(Point::element(parent, index.min(limit)));
        }
        child = parent;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{DocNode, ParagraphNode, TextNode};

    fn text_doc() -> (NodeMap, NodeKey, NodeKey) {
        let mut nodes = NodeMap::new();
        let para = ParagraphNode::new();
        let para_key = para.body.key;
        let text = TextNode::new("hello");
        let text_key = text.key;
        nodes.insert(DocNode::Paragraph(para));
        nodes.insert(DocNode::Text(text));
        nodes.push_child(para_key, text_key);
        (nodes, para_key, text_key)
    }

    #[test]
    fn validate_rejects_out_of_range_text_offset() {
        let (nodes, _, text_key) = text_doc();
        assert!(Point::text(text_key, 5).validate(&nodes).is_ok());
        let err = Point::text(text_key, 6).validate(&nodes);
        assert!(matches!(err, Err(DocError::InvalidSelection(_))));
    }

    #[test]
    fn validate_rejects_kind_mismatch() {
        let (nodes, para_key, text_key) = text_doc();
        assert!(Point::element(text_key, 0).validate(&nodes).is_err());
        assert!(Point::element(para_key, 1).validate(&nodes).is_ok());
        assert!(Point::element(para_key, 2).validate(&nodes).is_err());
    }

    #[test]
    fn clamp_pulls_offset_in_range() {
        let (nodes, _, text_key) = text_doc();
        let sel = Selection::caret(Point::text(text_key, 40));
        let (clamped, changed) = sel.clamped(&nodes);
        assert!(changed);
        match clamped {
            Selection::Range(range) => assert_eq!(range.anchor.offset, 5),
            other => panic!("expected range selection, got {other:?}"),
        }
    }

    #[test]
    fn clamp_drops_missing_nodes_to_none() {
        let (nodes, _, _) = text_doc();
        let stray = TextNode::new("gone");
        let sel = Selection::caret(Point::text(stray.key, 0));
        let (clamped, changed) = sel.clamped(&nodes);
        assert!(changed);
        assert!(clamped.is_none());
    }

    #[test]
    fn reconcile_moves_to_surviving_ancestor() {
        let (prev, para_key, text_key) = text_doc();
        let mut next = prev.clone();
        next.detach(text_key);
        next.remove(text_key);

        let sel = Selection::caret(Point::text(text_key, 3));
        let reconciled = reconcile(&sel, &prev, &next);
        match reconciled {
            Selection::Range(range) => {
                assert_eq!(range.anchor.key, para_key);
                assert_eq!(range.anchor.kind, PointKind::Element);
                assert_eq!(range.anchor.offset, 0);
            }
            other => panic!("expected range selection, got {other:?}"),
        }
    }

    #[test]
    fn reconcile_gives_up_without_survivors() {
        let (prev, para_key, text_key) = text_doc();
        let mut next = prev.clone();
        next.remove(text_key);
        next.remove(para_key);

        let sel = Selection::caret(Point::text(text_key, 3));
        assert!(reconcile(&sel, &prev, &next).is_none());
    }
}
