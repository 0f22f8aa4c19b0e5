//! The open transaction: working copy, mutation operations, validation.
//!
//! A [`Transaction`] holds a working copy of the committed store. Mutation
//! calls edit the copy and record dirty keys; nothing is visible to readers
//! of the editor until [`Transaction::finish`] validates the whole batch and
//! the editor swaps the snapshot in. Any structural violation aborts the
//! entire batch — there is no partially-applied transaction.

use std::collections::{BTreeSet, HashSet};

use serde_json::Map;

use crate::error::DocError;
use crate::node::{
    DecoratorNode, Direction, DocNode, ElementFormat, ExtensionKind, ExtensionNode, HeadingNode,
    HeadingTag, LineBreakNode, NodeKey, NodeRegistry, ParagraphNode, QuoteNode, TextFormat,
    TextNode,
};
use crate::selection::{self, Point, Selection};
use crate::state::{EditorState, NodeMap};

pub(crate) struct CommitOutcome {
    pub(crate) state: EditorState,
    pub(crate) changed: BTreeSet<NodeKey>,
}

/// An open transaction over one editor's state.
pub struct Transaction<'a> {
    registry: &'a NodeRegistry,
    prev: &'a EditorState,
    nodes: NodeMap,
    root: NodeKey,
    selection: Selection,
    dirty: BTreeSet<NodeKey>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(prev: &'a EditorState, registry: &'a NodeRegistry) -> Self {
        Self {
            registry,
            prev,
            nodes: prev.nodes().clone(),
            root: prev.root_key(),
            selection: prev.selection().clone(),
            dirty: BTreeSet::new(),
        }
    }

    // ── Reads ─────────────────────────────────────────────────────────────

    pub fn root_key(&self) -> NodeKey {
        self.root
    }

    pub fn get(&self, key: NodeKey) -> Option<&DocNode> {
        self.nodes.get(key)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    fn node(&self, key: NodeKey) -> Result<&DocNode, DocError> {
        self.nodes
            .get(key)
            .ok_or_else(|| DocError::mutation(format!("node {key} is missing or destroyed")))
    }

    // ── Node constructors ─────────────────────────────────────────────────
    //
    // Created nodes start detached; a node still detached at commit time is
    // silently dropped.

    pub fn create_paragraph(&mut self) -> NodeKey {
        self.adopt(DocNode::Paragraph(ParagraphNode::new()))
    }

    pub fn create_quote(&mut self) -> NodeKey {
        self.adopt(DocNode::Quote(QuoteNode::new()))
    }

    pub fn create_heading(&mut self, tag: HeadingTag) -> NodeKey {
        self.adopt(DocNode::Heading(HeadingNode::new(tag)))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeKey {
        self.adopt(DocNode::Text(TextNode::new(text)))
    }

    pub fn create_line_break(&mut self) -> NodeKey {
        self.adopt(DocNode::LineBreak(LineBreakNode::new()))
    }

    pub fn create_decorator(
        &mut self,
        tag: impl Into<String>,
        payload: Map<String, serde_json::Value>,
        inline: bool,
    ) -> NodeKey {
        self.adopt(DocNode::Decorator(DecoratorNode::new(tag, payload, inline)))
    }

    /// Construct a registered extension element. Fails when the tag is not
    /// registered — an unknown element type cannot be given children safely.
    pub fn create_extension(&mut self, tag: &str) -> Result<NodeKey, DocError> {
        let behavior = self
            .registry
            .get(tag)
            .copied()
            .ok_or_else(|| DocError::mutation(format!("node type `{tag}` is not registered")))?;
        if behavior.kind == ExtensionKind::Decorator {
            return Err(DocError::mutation(format!(
                "node type `{tag}` is a decorator; use create_decorator"
            )));
        }
        let fields = behavior.default_fields.map(|f| f()).unwrap_or_default();
        Ok(self.adopt(DocNode::Extension(ExtensionNode::new(
            tag,
            behavior.kind,
            fields,
        ))))
    }

    fn adopt(&mut self, node: DocNode) -> NodeKey {
        let key = node.key();
        self.nodes.insert(node);
        self.dirty.insert(key);
        key
    }

    // ── Structural operations ─────────────────────────────────────────────

    /// Splice `new_node` immediately after `node` in its parent's sequence.
    pub fn insert_after(&mut self, node: NodeKey, new_node: NodeKey) -> Result<(), DocError> {
        let (parent, index) = self.insertion_site(node)?;
        self.attach(parent, index + 1, new_node)
    }

    /// Splice `new_node` immediately before `node` in its parent's sequence.
    pub fn insert_before(&mut self, node: NodeKey, new_node: NodeKey) -> Result<(), DocError> {
        let (parent, index) = self.insertion_site(node)?;
        self.attach(parent, index, new_node)
    }

    fn insertion_site(&self, node: NodeKey) -> Result<(NodeKey, usize), DocError> {
        if node == self.root {
            return Err(DocError::mutation("cannot insert a sibling of the root"));
        }
        self.node(node)?;
        self.nodes
            .position_of(node)
            .ok_or_else(|| DocError::mutation(format!("node {node} is detached")))
    }

    /// Append `children` to `parent`, re-parenting each atomically.
    pub fn append(&mut self, parent: NodeKey, children: &[NodeKey]) -> Result<(), DocError> {
        for &child in children {
            let end = self.node(parent)?.children().len();
            self.attach(parent, end, child)?;
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeKey, index: usize, child: NodeKey) -> Result<(), DocError> {
        if child == self.root {
            return Err(DocError::mutation("the root cannot be re-parented"));
        }
        let parent_node = self.node(parent)?;
        if !parent_node.is_element() {
            return Err(DocError::mutation(format!(
                "node {parent} (`{}`) cannot hold children",
                parent_node.type_tag()
            )));
        }
        let child_node = self.node(child)?;
        if !parent_node.accepts_child(child_node, self.registry) {
            return Err(DocError::mutation(format!(
                "`{}` does not accept `{}` children",
                parent_node.type_tag(),
                child_node.type_tag()
            )));
        }
        let old_parent = child_node.parent();
        self.nodes.splice_child(parent, index, child);
        self.dirty.insert(parent);
        self.dirty.insert(child);
        if let Some(old) = old_parent {
            self.dirty.insert(old);
        }
        Ok(())
    }

    /// Substitute `with_node` at `node`'s position. `node` and its subtree
    /// are detached; its children move to `with_node` only when
    /// `transfer_children` is set.
    pub fn replace(
        &mut self,
        node: NodeKey,
        with_node: NodeKey,
        transfer_children: bool,
    ) -> Result<(), DocError> {
        if node == self.root {
            return Err(DocError::mutation("the root cannot be replaced"));
        }
        let (parent, index) = self
            .nodes
            .position_of(node)
            .ok_or_else(|| DocError::mutation(format!("node {node} is detached")))?;
        if transfer_children {
            let children: Vec<NodeKey> = self.node(node)?.children().to_vec();
            self.append(with_node, &children)?;
        }
        self.nodes.detach(node);
        self.dirty.insert(node);
        self.attach(parent, index, with_node)
    }

    /// Detach `node`; unless re-attached before commit, it and its subtree
    /// are destroyed.
    pub fn remove(&mut self, node: NodeKey) -> Result<(), DocError> {
        if node == self.root {
            return Err(DocError::mutation("the root cannot be removed"));
        }
        let parent = self.node(node)?.parent();
        self.nodes.detach(node);
        self.dirty.insert(node);
        if let Some(parent) = parent {
            self.dirty.insert(parent);
        }
        Ok(())
    }

    // ── Text operations ───────────────────────────────────────────────────

    fn with_text<F>(&mut self, key: NodeKey, f: F) -> Result<(), DocError>
    where
        F: FnOnce(&mut TextNode),
    {
        match self.nodes.get_mut(key) {
            Some(DocNode::Text(text)) => {
                f(text);
                text.version += 1;
                self.dirty.insert(key);
                Ok(())
            }
            Some(other) => Err(DocError::mutation(format!(
                "node {key} is `{}`, not text",
                other.type_tag()
            ))),
            None => Err(DocError::mutation(format!(
                "node {key} is missing or destroyed"
            ))),
        }
    }

    pub fn set_text(&mut self, key: NodeKey, text: impl Into<String>) -> Result<(), DocError> {
        let text = text.into();
        self.with_text(key, |node| node.text = text)
    }

    pub fn apply_format(&mut self, key: NodeKey, format: TextFormat) -> Result<(), DocError> {
        self.with_text(key, |node| node.format.insert(format))
    }

    pub fn clear_format(&mut self, key: NodeKey, format: TextFormat) -> Result<(), DocError> {
        self.with_text(key, |node| node.format.remove(format))
    }

    pub fn toggle_format(&mut self, key: NodeKey, format: TextFormat) -> Result<(), DocError> {
        self.with_text(key, |node| node.format.toggle(format))
    }

    pub fn set_style(&mut self, key: NodeKey, style: impl Into<String>) -> Result<(), DocError> {
        let style = style.into();
        self.with_text(key, |node| node.style = style)
    }

    // ── Element attribute operations ──────────────────────────────────────

    fn with_element<F>(&mut self, key: NodeKey, f: F) -> Result<(), DocError>
    where
        F: FnOnce(&mut crate::node::ElementBody),
    {
        match self.nodes.get_mut(key) {
            Some(node) => match node.element_mut() {
                Some(body) => {
                    f(body);
                    body.version += 1;
                    self.dirty.insert(key);
                    Ok(())
                }
                None => Err(DocError::mutation(format!(
                    "node {key} is not an element"
                ))),
            },
            None => Err(DocError::mutation(format!(
                "node {key} is missing or destroyed"
            ))),
        }
    }

    pub fn set_direction(
        &mut self,
        key: NodeKey,
        direction: Option<Direction>,
    ) -> Result<(), DocError> {
        self.with_element(key, |body| body.direction = direction)
    }

    pub fn set_block_format(
        &mut self,
        key: NodeKey,
        format: ElementFormat,
    ) -> Result<(), DocError> {
        self.with_element(key, |body| body.format = format)
    }

    pub fn set_indent(&mut self, key: NodeKey, indent: u32) -> Result<(), DocError> {
        let min = self.node(key)?.min_indent();
        if indent < min {
            return Err(DocError::mutation(format!(
                "indent {indent} below the minimum {min} for `{}`",
                self.node(key)?.type_tag()
            )));
        }
        self.with_element(key, |body| body.indent = indent)
    }

    // ── Selection operations ──────────────────────────────────────────────

    /// Replace the active selection. Offsets are checked strictly against
    /// the current tree — an out-of-range point is a programming error.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), DocError> {
        selection.validate(&self.nodes)?;
        self.selection = selection;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    // ── Variant capabilities ──────────────────────────────────────────────

    /// Collapse the block at the caret back into a default paragraph.
    ///
    /// Performed only when the caret sits at the very start of a block whose
    /// variant opts in (quote, heading): the block's children move into a
    /// fresh paragraph which replaces it at the same position. Returns
    /// whether the collapse happened; an unmet precondition is a normal
    /// "not performed", not an error.
    pub fn collapse_at_start(&mut self) -> Result<bool, DocError> {
        let Selection::Range(range) = self.selection.clone() else {
            return Ok(false);
        };
        if !range.is_collapsed() {
            return Ok(false);
        }
        let Some(block) = self.enclosing_block(&range.anchor) else {
            return Ok(false);
        };
        if !self.at_block_start(&range.anchor, block) {
            return Ok(false);
        }
        match self.node(block)? {
            DocNode::Quote(_) | DocNode::Heading(_) => {}
            _ => return Ok(false),
        }

        let paragraph = self.create_paragraph();
        let children: Vec<NodeKey> = self.node(block)?.children().to_vec();
        self.append(paragraph, &children)?;
        self.replace(block, paragraph, false)?;
        // A caret that sat on the block element itself has lost its node;
        // put it at the head of the replacement.
        if range.anchor.key == block {
            self.selection = Selection::caret(Point::element(paragraph, 0));
        }
        Ok(true)
    }

    /// Create the block that should follow the caret's block when it is
    /// split (e.g. pressing enter at the end of a quote).
    ///
    /// Variants that opt in (quote, heading) produce a paragraph inheriting
    /// the block's direction; other block variants decline and fall back to
    /// the engine default, a plain paragraph. Returns the new block's key —
    /// the new caret target — or `None` when the caret is not inside a
    /// block.
    pub fn insert_new_after(&mut self) -> Result<Option<NodeKey>, DocError> {
        let Selection::Range(range) = self.selection.clone() else {
            return Ok(None);
        };
        let Some(block) = self.enclosing_block(&range.focus) else {
            return Ok(None);
        };
        let direction = self
            .node(block)?
            .element()
            .and_then(|body| body.direction);

        let paragraph = match self.node(block)? {
            // Quote and heading override the split: the new paragraph
            // inherits the source block's direction.
            DocNode::Quote(_) | DocNode::Heading(_) => {
                let paragraph = self.create_paragraph();
                self.set_direction(paragraph, direction)?;
                paragraph
            }
            // Every other block variant declines; the engine default is a
            // plain paragraph after the current block.
            _ => self.create_paragraph(),
        };
        self.insert_after(block, paragraph)?;
        self.set_selection(Selection::caret(Point::element(paragraph, 0)))?;
        Ok(Some(paragraph))
    }

    /// Nearest block-level ancestor of a point (the point's own node if it
    /// is a block).
    fn enclosing_block(&self, point: &Point) -> Option<NodeKey> {
        let mut key = point.key;
        loop {
            let node = self.nodes.get(key)?;
            if node.is_block() {
                return Some(key);
            }
            key = node.parent()?;
        }
    }

    /// Whether `point` addresses the very first position of `block`'s
    /// content: offset zero, reached through first children all the way up.
    fn at_block_start(&self, point: &Point, block: NodeKey) -> bool {
        if point.offset != 0 {
            return false;
        }
        let mut key = point.key;
        while key != block {
            match self.nodes.position_of(key) {
                Some((parent, 0)) => key = parent,
                _ => return false,
            }
        }
        true
    }

    // ── Close ─────────────────────────────────────────────────────────────

    /// Validate the batch and produce the commit outcome.
    pub(crate) fn finish(self) -> Result<CommitOutcome, DocError> {
        self.validate_tree()?;

        let Transaction {
            mut nodes,
            root,
            selection,
            dirty,
            prev,
            ..
        } = self;

        // Destroy everything no longer reachable from the root.
        let mut reachable = HashSet::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if !reachable.insert(key) {
                continue;
            }
            if let Some(node) = nodes.get(key) {
                stack.extend(node.children().iter().copied());
            }
        }
        let destroyed: Vec<NodeKey> = nodes.keys().filter(|k| !reachable.contains(k)).collect();
        let pre_gc = nodes.clone();
        for &key in &destroyed {
            nodes.remove(key);
        }

        // Report dirty survivors plus destroyed nodes that existed before
        // this transaction (created-and-dropped nodes were never visible).
        let mut changed: BTreeSet<NodeKey> = dirty
            .iter()
            .copied()
            .filter(|k| reachable.contains(k))
            .collect();
        changed.extend(
            destroyed
                .iter()
                .copied()
                .filter(|&k| prev.nodes().contains(k)),
        );

        let selection = selection::reconcile(&selection, &pre_gc, &nodes);
        Ok(CommitOutcome {
            state: EditorState::from_parts(nodes, root, selection),
            changed,
        })
    }

    /// Check every structural invariant over the working copy. Any
    /// violation aborts the whole batch.
    fn validate_tree(&self) -> Result<(), DocError> {
        let root_node = self.node(self.root)?;
        if !matches!(root_node, DocNode::Root(_)) {
            return Err(DocError::mutation("root key does not hold the root node"));
        }
        if root_node.parent().is_some() {
            return Err(DocError::mutation("the root must not have a parent"));
        }

        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        seen.insert(self.root);
        while let Some(key) = stack.pop() {
            let node = self.node(key)?;
            if let Some(body) = node.element() {
                if body.indent < node.min_indent() {
                    return Err(DocError::mutation(format!(
                        "`{}` {key} has indent {} below its minimum {}",
                        node.type_tag(),
                        body.indent,
                        node.min_indent()
                    )));
                }
            }
            for &child in node.children() {
                let child_node = self.nodes.get(child).ok_or_else(|| {
                    DocError::mutation(format!("{key} references missing child {child}"))
                })?;
                if child_node.parent() != Some(key) {
                    return Err(DocError::mutation(format!(
                        "parent link of {child} disagrees with {key}'s child sequence"
                    )));
                }
                if matches!(child_node, DocNode::Root(_)) {
                    return Err(DocError::mutation("the root cannot be a child"));
                }
                if !node.accepts_child(child_node, self.registry) {
                    return Err(DocError::mutation(format!(
                        "`{}` does not accept `{}` children",
                        node.type_tag(),
                        child_node.type_tag()
                    )));
                }
                if !seen.insert(child) {
                    return Err(DocError::mutation(format!(
                        "node {child} appears in two child sequences"
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }
}
