//! Style projection boundary.
//!
//! [`attributes_for`] is a pure function from a node plus a [`Theme`] to a
//! platform-neutral attribute bag. The rendering collaborator decides what
//! the attributes mean on its platform; the engine never calls into
//! rendering.
//!
//! A [`Theme`] is plain configuration — hosts typically deserialize one from
//! their settings store and pass it to the renderer unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::node::{DocNode, TextFormat};

/// Platform-neutral attribute set for one node.
pub type AttributeBag = IndexMap<String, Value>;

/// Per-node-type attribute configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub root: AttributeBag,
    pub paragraph: AttributeBag,
    pub quote: AttributeBag,
    /// Keyed by heading tag (`h1` … `h5`).
    pub heading: IndexMap<String, AttributeBag>,
    /// Base attributes of every text run.
    pub text: AttributeBag,
    pub bold: AttributeBag,
    pub italic: AttributeBag,
    pub strikethrough: AttributeBag,
    pub underline: AttributeBag,
    /// Attributes for registered collaborator types, keyed by type tag.
    pub custom: IndexMap<String, AttributeBag>,
}

// Quote blocks draw a vertical bar in the leading gutter; these are the
// stock bar metrics, overridable through `theme.quote`.
const QUOTE_BAR_COLOR: &str = "#C2C2C8";
const QUOTE_BAR_WIDTH: u64 = 4;

/// Compute the attribute bag for `node` under `theme`.
pub fn attributes_for(node: &DocNode, theme: &Theme) -> AttributeBag {
    let mut bag = match node {
        DocNode::Root(_) => theme.root.clone(),
        DocNode::Paragraph(_) => theme.paragraph.clone(),
        DocNode::Quote(_) => {
            let mut bag = theme.quote.clone();
            bag.entry("quote-bar-color".to_string())
                .or_insert_with(|| json!(QUOTE_BAR_COLOR));
            bag.entry("quote-bar-width".to_string())
                .or_insert_with(|| json!(QUOTE_BAR_WIDTH));
            bag.entry("quote-bar-rounded".to_string())
                .or_insert_with(|| json!(true));
            bag
        }
        DocNode::Heading(n) => theme
            .heading
            .get(n.tag.as_str())
            .cloned()
            .unwrap_or_default(),
        DocNode::Text(n) => {
            let mut bag = theme.text.clone();
            for (bit, attrs) in [
                (TextFormat::BOLD, &theme.bold),
                (TextFormat::ITALIC, &theme.italic),
                (TextFormat::STRIKETHROUGH, &theme.strikethrough),
                (TextFormat::UNDERLINE, &theme.underline),
            ] {
                if n.format.contains(bit) {
                    bag.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
            if n.format.contains(TextFormat::BOLD) {
                bag.insert("bold".to_string(), json!(true));
            }
            if n.format.contains(TextFormat::ITALIC) {
                bag.insert("italic".to_string(), json!(true));
            }
            if n.format.contains(TextFormat::STRIKETHROUGH) {
                bag.insert("strikethrough".to_string(), json!(true));
            }
            if n.format.contains(TextFormat::UNDERLINE) {
                bag.insert("underline".to_string(), json!(true));
            }
            if !n.style.is_empty() {
                bag.insert("style".to_string(), json!(n.style));
            }
            bag
        }
        DocNode::LineBreak(_) => AttributeBag::new(),
        DocNode::Decorator(n) => theme.custom.get(&n.tag).cloned().unwrap_or_default(),
        DocNode::Extension(n) => theme.custom.get(&n.tag).cloned().unwrap_or_default(),
        DocNode::Unknown(_) => AttributeBag::new(),
    };

    if let Some(body) = node.element() {
        if let Some(direction) = body.direction {
            bag.insert("direction".to_string(), json!(direction.as_str()));
        }
        if body.indent > 0 {
            bag.insert("indent".to_string(), json!(body.indent));
        }
        let align = body.format.as_str();
        if !align.is_empty() {
            bag.insert("align".to_string(), json!(align));
        }
    }
    bag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{QuoteNode, TextNode};

    #[test]
    fn quote_carries_bar_attributes() {
        let theme = Theme::default();
        let bag = attributes_for(&DocNode::Quote(QuoteNode::new()), &theme);
        assert_eq!(bag.get("quote-bar-color"), Some(&json!("#C2C2C8")));
        assert_eq!(bag.get("quote-bar-width"), Some(&json!(4)));
        assert_eq!(bag.get("quote-bar-rounded"), Some(&json!(true)));
        // Quote default indent projects too.
        assert_eq!(bag.get("indent"), Some(&json!(1)));
    }

    #[test]
    fn theme_overrides_win_over_stock_bar() {
        let mut theme = Theme::default();
        theme
            .quote
            .insert("quote-bar-color".to_string(), json!("#FF0000"));
        let bag = attributes_for(&DocNode::Quote(QuoteNode::new()), &theme);
        assert_eq!(bag.get("quote-bar-color"), Some(&json!("#FF0000")));
    }

    #[test]
    fn text_format_bits_project_to_flags() {
        let theme = Theme::default();
        let mut text = TextNode::new("x");
        text.format.insert(TextFormat::BOLD);
        text.format.insert(TextFormat::UNDERLINE);
        let bag = attributes_for(&DocNode::Text(text), &theme);
        assert_eq!(bag.get("bold"), Some(&json!(true)));
        assert_eq!(bag.get("underline"), Some(&json!(true)));
        assert!(bag.get("italic").is_none());
    }

    #[test]
    fn theme_deserializes_from_config() {
        let theme: Theme = serde_json::from_value(json!({
            "quote": {"background": "#EEE"},
            "heading": {"h1": {"font-size": 32}},
            "bold": {"font-weight": 700}
        }))
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(theme.quote.get("background"), Some(&json!("#EEE")));
        let mut text = TextNode::new("x");
        text.format.insert(TextFormat::BOLD);
        let bag = attributes_for(&DocNode::Text(text), &theme);
        assert_eq!(bag.get("font-weight"), Some(&json!(700)));
    }
}
