//! Shared helpers for the integration suites.

use richdoc::{DocNode, Editor, EditorState, NodeKey, Point, Selection};

/// Editor holding root ← quote ← text("hello"), caret at `caret` characters
/// into the text run.
pub fn quote_editor(caret: usize) -> (Editor, NodeKey, NodeKey) {
    let mut editor = Editor::new();
    let mut keys = None;
    editor
        .update(|tx| {
            let quote = tx.create_quote();
            let text = tx.create_text("hello");
            tx.append(quote, &[text])?;
            let root = tx.root_key();
            tx.append(root, &[quote])?;
            tx.set_selection(Selection::caret(Point::text(text, caret)))?;
            keys = Some((quote, text));
            Ok(())
        })
        .unwrap_or_else(|e| panic!("seed failed: {e}"));
    let (quote, text) = keys.unwrap_or_else(|| panic!("seed did not run"));
    (editor, quote, text)
}

/// Type tags of the root's children, in order.
pub fn root_child_tags(state: &EditorState) -> Vec<String> {
    state
        .get(state.root_key())
        .map(DocNode::children)
        .unwrap_or(&[])
        .iter()
        .filter_map(|&key| state.get(key).map(|n| n.type_tag().to_string()))
        .collect()
}

/// The first text run found walking the tree from the root.
pub fn first_text(state: &EditorState) -> Option<(NodeKey, String)> {
    state.reachable().into_iter().find_map(|key| {
        match state.get(key) {
            Some(DocNode::Text(t)) => Some((key, t.text.clone())),
            _ => None,
        }
    })
}
