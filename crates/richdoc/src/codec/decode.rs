//! JSON decoder.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::DocError;
use crate::node::{
    DecoratorNode, Direction, DocNode, ElementBody, ElementFormat, ExtensionKind, ExtensionNode,
    HeadingNode, HeadingTag, LineBreakNode, NodeKey, NodeRegistry, ParagraphNode, QuoteNode,
    RootNode, TextFormat, TextMode, TextNode, UnknownNode,
};
use crate::selection::{NodeSelection, Point, PointKind, RangeSelection, Selection};
use crate::state::{EditorState, NodeMap};

/// What the tolerant half of the decoder had to do to the input.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// The persisted selection referenced content that shrank or vanished
    /// and was pulled in range (or dropped).
    pub selection_clamped: bool,
    /// Type tags preserved as opaque pass-through nodes.
    pub unknown_types: Vec<String>,
}

/// A decoded snapshot plus the tolerance report.
#[derive(Debug)]
pub struct RestoredDocument {
    pub state: EditorState,
    pub report: RestoreReport,
}

pub(super) fn value_to_state(
    value: &Value,
    registry: &NodeRegistry,
) -> Result<RestoredDocument, DocError> {
    let doc = value
        .as_object()
        .ok_or_else(|| DocError::document("document is not a JSON object"))?;
    let root_val = doc
        .get("root")
        .ok_or_else(|| DocError::document("missing `root` object"))?;
    let root_obj = as_node_object(root_val)?;
    let tag = type_tag(root_obj)?;
    if tag != "root" {
        return Err(DocError::document(format!(
            "top-level node is `{tag}`, expected `root`"
        )));
    }

    let mut nodes = NodeMap::new();
    let mut report = RestoreReport::default();

    let mut root = RootNode::new();
    apply_element_attrs(&mut root.body, root_obj, 0);
    let root_key = root.body.key;
    nodes.insert(DocNode::Root(root));
    decode_children(root_obj, root_key, &mut nodes, registry, &mut report)?;

    let (selection, clamped) = decode_selection(doc.get("selection"), &nodes, root_key);
    if clamped {
        report.selection_clamped = true;
        warn!("restored selection did not fit the document; clamped");
    }

    Ok(RestoredDocument {
        state: EditorState::from_parts(nodes, root_key, selection),
        report,
    })
}

// ── Nodes ─────────────────────────────────────────────────────────────────

fn as_node_object(value: &Value) -> Result<&Map<String, Value>, DocError> {
    value
        .as_object()
        .ok_or_else(|| DocError::document("node is not a JSON object"))
}

fn type_tag(obj: &Map<String, Value>) -> Result<&str, DocError> {
    obj.get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| DocError::document("node object has no `type` tag"))
}

fn decode_children(
    parent_obj: &Map<String, Value>,
    parent_key: NodeKey,
    nodes: &mut NodeMap,
    registry: &NodeRegistry,
    report: &mut RestoreReport,
) -> Result<(), DocError> {
    let children = match parent_obj.get("children") {
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => return Err(DocError::document("`children` is not an array")),
        None => &[],
    };
    for item in children {
        let obj = as_node_object(item)?;
        let key = decode_node(obj, nodes, registry, report)?;
        if let Some(node) = nodes.get_mut(key) {
            node.set_parent(Some(parent_key));
        }
        if let Some(body) = nodes.get_mut(parent_key).and_then(DocNode::element_mut) {
            body.children.push(key);
        }
    }
    Ok(())
}

fn decode_node(
    obj: &Map<String, Value>,
    nodes: &mut NodeMap,
    registry: &NodeRegistry,
    report: &mut RestoreReport,
) -> Result<NodeKey, DocError> {
    let tag = type_tag(obj)?;
    match tag {
        "root" => Err(DocError::document("nested `root` node")),
        "paragraph" => {
            let mut node = ParagraphNode::new();
            apply_element_attrs(&mut node.body, obj, 0);
            let key = node.body.key;
            nodes.insert(DocNode::Paragraph(node));
            decode_children(obj, key, nodes, registry, report)?;
            Ok(key)
        }
        "quote" => {
            let mut node = QuoteNode::new();
            apply_element_attrs(&mut node.body, obj, 1);
            let key = node.body.key;
            nodes.insert(DocNode::Quote(node));
            decode_children(obj, key, nodes, registry, report)?;
            Ok(key)
        }
        "heading" => {
            let level = obj
                .get("tag")
                .and_then(Value::as_str)
                .and_then(HeadingTag::parse)
                .unwrap_or(HeadingTag::H1);
            let mut node = HeadingNode::new(level);
            apply_element_attrs(&mut node.body, obj, 0);
            let key = node.body.key;
            nodes.insert(DocNode::Heading(node));
            decode_children(obj, key, nodes, registry, report)?;
            Ok(key)
        }
        "text" => {
            let mut node = TextNode::new(
                obj.get("text").and_then(Value::as_str).unwrap_or_default(),
            );
            node.format = TextFormat::from_bits(
                obj.get("format").and_then(Value::as_u64).unwrap_or(0) as u32,
            );
            node.detail = obj.get("detail").and_then(Value::as_u64).unwrap_or(0) as u32;
            node.mode = obj
                .get("mode")
                .and_then(Value::as_str)
                .map(TextMode::parse)
                .unwrap_or_default();
            node.style = obj
                .get("style")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let key = node.key;
            nodes.insert(DocNode::Text(node));
            Ok(key)
        }
        "linebreak" => {
            let node = LineBreakNode::new();
            let key = node.key;
            nodes.insert(DocNode::LineBreak(node));
            Ok(key)
        }
        _ => match registry.get(tag).copied() {
            Some(behavior) if behavior.kind == ExtensionKind::Decorator => {
                let inline = obj.get("inline").and_then(Value::as_bool).unwrap_or(false);
                let payload: Map<String, Value> = obj
                    .iter()
                    .filter(|(k, _)| !matches!(k.as_str(), "type" | "version" | "inline"))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let node = DecoratorNode::new(tag, payload, inline);
                let key = node.key;
                nodes.insert(DocNode::Decorator(node));
                Ok(key)
            }
            Some(behavior) => {
                let mut node =
                    ExtensionNode::new(tag, behavior.kind, behavior.decode_field_bag(obj));
                apply_element_attrs(&mut node.body, obj, 0);
                let key = node.body.key;
                nodes.insert(DocNode::Extension(node));
                decode_children(obj, key, nodes, registry, report)?;
                Ok(key)
            }
            // Unrecognized type: keep the raw object, children included.
            None => {
                report.unknown_types.push(tag.to_string());
                let node = UnknownNode::new(obj.clone());
                let key = node.key;
                nodes.insert(DocNode::Unknown(node));
                Ok(key)
            }
        },
    }
}

fn apply_element_attrs(body: &mut ElementBody, obj: &Map<String, Value>, min_indent: u32) {
    body.direction = obj
        .get("direction")
        .and_then(Value::as_str)
        .and_then(Direction::parse);
    body.format = obj
        .get("format")
        .and_then(Value::as_str)
        .map(ElementFormat::parse)
        .unwrap_or_default();
    let indent = obj.get("indent").and_then(Value::as_u64).unwrap_or(0) as u32;
    body.indent = indent.max(min_indent);
}

// ── Selection ─────────────────────────────────────────────────────────────

fn decode_selection(
    value: Option<&Value>,
    nodes: &NodeMap,
    root: NodeKey,
) -> (Selection, bool) {
    let Some(value) = value else {
        return (Selection::None, false);
    };
    let Some(obj) = value.as_object() else {
        return (Selection::None, true);
    };
    match obj.get("type").and_then(Value::as_str) {
        Some("range") => {
            let anchor = decode_point(obj.get("anchor"), nodes, root);
            let focus = decode_point(obj.get("focus"), nodes, root);
            match (anchor, focus) {
                (Some((anchor, a)), Some((focus, b))) => (
                    Selection::Range(RangeSelection { anchor, focus }),
                    a || b,
                ),
                _ => (Selection::None, true),
            }
        }
        Some("node") => {
            let paths = obj
                .get("paths")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut selection = NodeSelection::default();
            let mut clamped = false;
            for path_val in paths {
                match decode_path(path_val).and_then(|path| resolve_exact(nodes, root, &path)) {
                    Some(key) => {
                        selection.keys.insert(key);
                    }
                    None => clamped = true,
                }
            }
            if selection.keys.is_empty() {
                (Selection::None, true)
            } else {
                (Selection::Node(selection), clamped)
            }
        }
        _ => (Selection::None, true),
    }
}

fn decode_point(
    value: Option<&Value>,
    nodes: &NodeMap,
    root: NodeKey,
) -> Option<(Point, bool)> {
    let obj = value?.as_object()?;
    let path = decode_path(obj.get("path")?)?;
    let offset = obj.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
    let kind = obj
        .get("kind")
        .and_then(Value::as_str)
        .and_then(PointKind::parse)
        .unwrap_or(PointKind::Element);
    Some(resolve_point(nodes, root, &path, offset, kind))
}

fn decode_path(value: &Value) -> Option<Vec<usize>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_u64().map(|u| u as usize))
        .collect()
}

/// Walk a child-index path exactly; `None` when it no longer resolves.
fn resolve_exact(nodes: &NodeMap, root: NodeKey, path: &[usize]) -> Option<NodeKey> {
    let mut cursor = root;
    for &index in path {
        cursor = *nodes.get(cursor)?.children().get(index)?;
    }
    Some(cursor)
}

/// Walk a child-index path tolerantly, clamping where the persisted
/// selection outruns the current content.
fn resolve_point(
    nodes: &NodeMap,
    root: NodeKey,
    path: &[usize],
    offset: usize,
    kind: PointKind,
) -> (Point, bool) {
    let mut cursor = root;
    for &index in path {
        let children = nodes.get(cursor).map(DocNode::children).unwrap_or(&[]);
        match children.get(index) {
            Some(&child) => cursor = child,
            None => {
                // The path outruns the tree; stop at this element's boundary.
                return (Point::element(cursor, index.min(children.len())), true);
            }
        }
    }
    match nodes.get(cursor) {
        Some(DocNode::Text(t)) => {
            let limit = t.len();
            let clamped = offset > limit || kind != PointKind::Text;
            (Point::text(cursor, offset.min(limit)), clamped)
        }
        Some(n) if n.is_element() => {
            let limit = n.children().len();
            let clamped = offset > limit || kind != PointKind::Element;
            (Point::element(cursor, offset.min(limit)), clamped)
        }
        // Atomic leaf: fall back to its slot in the parent.
        _ => match nodes.position_of(cursor) {
            Some((parent, index)) => (Point::element(parent, index), true),
            None => (Point::element(root, 0), true),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_state, encode_state, from_json};
    use crate::node::NodeBehavior;
    use serde_json::json;

    /// The wire form of a quote holding one text run — the format every
    /// producer of this document family emits.
    fn quote_doc() -> Value {
        json!({
            "root": {
                "type": "root",
                "indent": 0,
                "version": 1,
                "direction": null,
                "format": null,
                "children": [{
                    "type": "quote",
                    "direction": "ltr",
                    "format": "",
                    "indent": 1,
                    "version": 1,
                    "children": [{
                        "type": "text",
                        "text": "hello",
                        "format": 0,
                        "detail": 0,
                        "mode": "normal",
                        "style": "",
                        "version": 1
                    }]
                }]
            }
        })
    }

    #[test]
    fn decodes_quote_document() {
        let registry = NodeRegistry::new();
        let restored = decode_state(&quote_doc(), &registry).unwrap_or_else(|e| panic!("{e}"));
        let state = &restored.state;
        let root = state.root_key();
        let quote = state.get(root).map(DocNode::children).unwrap_or(&[])[0];
        let quote_node = state.get(quote);
        assert_eq!(quote_node.map(DocNode::type_tag), Some("quote"));
        assert_eq!(
            quote_node.and_then(DocNode::element).map(|b| (b.indent, b.direction)),
            Some((1, Some(Direction::Ltr)))
        );
        let text = quote_node.map(DocNode::children).unwrap_or(&[])[0];
        match state.get(text) {
            Some(DocNode::Text(t)) => {
                assert_eq!(t.text, "hello");
                assert_eq!(t.format.bits(), 0);
                assert_eq!(t.mode, TextMode::Normal);
            }
            other => panic!("expected text node, got {other:?}"),
        }
        assert!(restored.report.unknown_types.is_empty());
        assert!(!restored.report.selection_clamped);
    }

    #[test]
    fn round_trips_structurally() {
        let registry = NodeRegistry::new();
        let restored = decode_state(&quote_doc(), &registry).unwrap_or_else(|e| panic!("{e}"));
        let encoded = encode_state(&restored.state);
        let again = decode_state(&encoded, &registry).unwrap_or_else(|e| panic!("{e}"));
        assert!(restored.state.structurally_equal(&again.state));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let registry = NodeRegistry::new();
        let doc = json!({
            "root": {
                "type": "root",
                "children": [
                    {"type": "paragraph", "children": [{"type": "text", "text": "x"}]}
                ]
            }
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        let state = &restored.state;
        let para = state.get(state.root_key()).map(DocNode::children).unwrap_or(&[])[0];
        let body = state.get(para).and_then(DocNode::element);
        assert_eq!(body.map(|b| (b.indent, b.direction, b.format)),
            Some((0, None, ElementFormat::Unspecified)));
    }

    #[test]
    fn quote_indent_is_raised_to_its_minimum() {
        let registry = NodeRegistry::new();
        let doc = json!({
            "root": {"type": "root", "children": [{"type": "quote", "indent": 0, "children": []}]}
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        let state = &restored.state;
        let quote = state.get(state.root_key()).map(DocNode::children).unwrap_or(&[])[0];
        assert_eq!(state.get(quote).and_then(DocNode::element).map(|b| b.indent), Some(1));
    }

    #[test]
    fn unknown_type_is_preserved_verbatim() {
        let registry = NodeRegistry::new();
        let doc = json!({
            "root": {
                "type": "root",
                "children": [{
                    "type": "poll",
                    "version": 3,
                    "question": "lunch?",
                    "children": [{"type": "text", "text": "inside"}]
                }]
            }
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(restored.report.unknown_types, vec!["poll".to_string()]);

        let encoded = encode_state(&restored.state);
        let children = &encoded["root"]["children"];
        assert_eq!(children[0]["type"], json!("poll"));
        assert_eq!(children[0]["question"], json!("lunch?"));
        // Foreign children stay inside the raw object, untouched.
        assert_eq!(children[0]["children"][0]["text"], json!("inside"));
    }

    #[test]
    fn registered_extension_round_trips_its_fields() {
        let mut registry = NodeRegistry::new();
        registry.register("list", NodeBehavior::element(ExtensionKind::Block)
            .with_allows_child(|child| child.type_tag() == "listitem"));
        registry.register("listitem", NodeBehavior::element(ExtensionKind::Block));
        let doc = json!({
            "root": {
                "type": "root",
                "children": [{
                    "type": "list",
                    "listType": "number",
                    "children": [
                        {"type": "listitem", "value": 1, "children": []},
                        {"type": "listitem", "value": 2, "children": []}
                    ]
                }]
            }
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        assert!(restored.report.unknown_types.is_empty());

        let encoded = encode_state(&restored.state);
        let list = &encoded["root"]["children"][0];
        assert_eq!(list["type"], json!("list"));
        assert_eq!(list["listType"], json!("number"));
        assert_eq!(list["children"][1]["value"], json!(2));
    }

    #[test]
    fn malformed_documents_are_rejected_whole() {
        let registry = NodeRegistry::new();
        let cases = [
            json!(42),
            json!({}),
            json!({"root": []}),
            json!({"root": {"children": []}}),
            json!({"root": {"type": "paragraph", "children": []}}),
            json!({"root": {"type": "root", "children": [{"version": 1}]}}),
            json!({"root": {"type": "root", "children": {"not": "an array"}}}),
        ];
        for case in cases {
            let err = decode_state(&case, &registry);
            assert!(
                matches!(err, Err(DocError::MalformedDocument(_))),
                "expected rejection of {case}"
            );
        }
    }

    #[test]
    fn invalid_json_text_is_malformed() {
        let registry = NodeRegistry::new();
        assert!(matches!(
            from_json("{not json", &registry),
            Err(DocError::MalformedDocument(_))
        ));
    }

    #[test]
    fn oversized_restored_selection_is_clamped_and_flagged() {
        let registry = NodeRegistry::new();
        let mut doc = quote_doc();
        doc["selection"] = json!({
            "type": "range",
            "anchor": {"path": [0, 0], "offset": 99, "kind": "text"},
            "focus": {"path": [0, 0], "offset": 99, "kind": "text"}
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        assert!(restored.report.selection_clamped);
        match restored.state.selection() {
            Selection::Range(range) => {
                assert_eq!(range.anchor.offset, 5);
                assert_eq!(range.focus.offset, 5);
            }
            other => panic!("expected clamped range, got {other:?}"),
        }
    }

    #[test]
    fn selection_path_into_vanished_content_falls_back() {
        let registry = NodeRegistry::new();
        let mut doc = quote_doc();
        doc["selection"] = json!({
            "type": "range",
            "anchor": {"path": [4, 2], "offset": 0, "kind": "text"},
            "focus": {"path": [4, 2], "offset": 0, "kind": "text"}
        });
        let restored = decode_state(&doc, &registry).unwrap_or_else(|e| panic!("{e}"));
        assert!(restored.report.selection_clamped);
        match restored.state.selection() {
            Selection::Range(range) => {
                assert_eq!(range.anchor.key, restored.state.root_key());
                assert_eq!(range.anchor.offset, 1);
            }
            other => panic!("expected fallback range, got {other:?}"),
        }
    }

    #[test]
    fn absent_selection_restores_as_none() {
        let registry = NodeRegistry::new();
        let restored = decode_state(&quote_doc(), &registry).unwrap_or_else(|e| panic!("{e}"));
        assert!(restored.state.selection().is_none());
        assert!(!restored.report.selection_clamped);
    }
}
