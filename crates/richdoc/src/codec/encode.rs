//! JSON encoder.

use serde_json::{json, Map, Value};

use super::NODE_VERSION;
use crate::node::{DocNode, ElementBody, NodeKey};
use crate::selection::{Point, Selection};
use crate::state::{EditorState, NodeMap};

pub(super) fn state_to_value(state: &EditorState) -> Value {
    let mut doc = Map::new();
    doc.insert(
        "root".to_string(),
        encode_node(state.nodes(), state.root_key()),
    );
    if let Some(selection) = encode_selection(state) {
        doc.insert("selection".to_string(), selection);
    }
    Value::Object(doc)
}

fn encode_node(nodes: &NodeMap, key: NodeKey) -> Value {
    let Some(node) = nodes.get(key) else {
        // Unreachable for committed states; emitted for robustness.
        return Value::Null;
    };
    match node {
        DocNode::Root(n) => element_value(nodes, &n.body, "root", Map::new()),
        DocNode::Paragraph(n) => element_value(nodes, &n.body, "paragraph", Map::new()),
        DocNode::Quote(n) => element_value(nodes, &n.body, "quote", Map::new()),
        DocNode::Heading(n) => {
            let mut extra = Map::new();
            extra.insert("tag".to_string(), json!(n.tag.as_str()));
            element_value(nodes, &n.body, "heading", extra)
        }
        DocNode::Extension(n) => element_value(nodes, &n.body, &n.tag, n.fields.clone()),
        DocNode::Text(n) => json!({
            "detail": n.detail,
            "format": n.format.bits(),
            "mode": n.mode.as_str(),
            "style": n.style,
            "text": n.text,
            "type": "text",
            "version": NODE_VERSION,
        }),
        DocNode::LineBreak(_) => json!({
            "type": "linebreak",
            "version": NODE_VERSION,
        }),
        DocNode::Decorator(n) => {
            let mut obj = n.payload.clone();
            obj.insert("inline".to_string(), json!(n.inline));
            obj.insert("type".to_string(), json!(n.tag));
            obj.insert("version".to_string(), json!(NODE_VERSION));
            Value::Object(obj)
        }
        // Foreign content re-encodes exactly as it was loaded.
        DocNode::Unknown(n) => Value::Object(n.raw.clone()),
    }
}

fn element_value(
    nodes: &NodeMap,
    body: &ElementBody,
    tag: &str,
    extra: Map<String, Value>,
) -> Value {
    let children: Vec<Value> = body
        .children
        .iter()
        .map(|&child| encode_node(nodes, child))
        .collect();
    let mut obj = Map::new();
    obj.insert("children".to_string(), Value::Array(children));
    obj.insert(
        "direction".to_string(),
        match body.direction {
            Some(direction) => json!(direction.as_str()),
            None => Value::Null,
        },
    );
    obj.insert("format".to_string(), json!(body.format.as_str()));
    obj.insert("indent".to_string(), json!(body.indent));
    obj.insert("type".to_string(), json!(tag));
    obj.insert("version".to_string(), json!(NODE_VERSION));
    for (k, v) in extra {
        obj.entry(k).or_insert(v);
    }
    Value::Object(obj)
}

// ── Selection ─────────────────────────────────────────────────────────────
//
// Node keys are process-local, so persisted points are addressed by child
// index path from the root instead.

fn encode_selection(state: &EditorState) -> Option<Value> {
    match state.selection() {
        Selection::None => None,
        Selection::Range(range) => {
            let anchor = encode_point(state, &range.anchor)?;
            let focus = encode_point(state, &range.focus)?;
            Some(json!({
                "type": "range",
                "anchor": anchor,
                "focus": focus,
            }))
        }
        Selection::Node(node_sel) => {
            let paths: Vec<Value> = node_sel
                .keys
                .iter()
                .filter_map(|&key| path_of(state, key))
                .map(|path| json!(path))
                .collect();
            if paths.is_empty() {
                None
            } else {
                Some(json!({ "type": "node", "paths": paths }))
            }
        }
    }
}

fn encode_point(state: &EditorState, point: &Point) -> Option<Value> {
    let path = path_of(state, point.key)?;
    Some(json!({
        "path": path,
        "offset": point.offset,
        "kind": point.kind.as_str(),
    }))
}

fn path_of(state: &EditorState, key: NodeKey) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut cursor = key;
    while cursor != state.root_key() {
        let (parent, index) = state.nodes().position_of(cursor)?;
        path.push(index);
        cursor = parent;
    }
    path.reverse();
    Some(path)
}
