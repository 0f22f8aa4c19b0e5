//! Text leaf nodes and the inline format bitmask.

use std::ops::{BitOr, BitOrAssign};

use super::NodeKey;

// ── TextFormat ────────────────────────────────────────────────────────────

/// Bit-combinable inline style mask.
///
/// The four known bits are bold, italic, strikethrough and underline. The
/// full `u32` is carried verbatim so that bits written by a newer build
/// survive a load/edit/save cycle here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFormat(u32);

impl TextFormat {
    pub const BOLD: TextFormat = TextFormat(1);
    pub const ITALIC: TextFormat = TextFormat(2);
    pub const STRIKETHROUGH: TextFormat = TextFormat(4);
    pub const UNDERLINE: TextFormat = TextFormat(8);

    /// Union of all bits this build understands.
    pub const KNOWN: TextFormat = TextFormat(0b1111);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: TextFormat) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: TextFormat) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: TextFormat) {
        self.0 &= !other.0;
    }

    pub fn toggle(&mut self, other: TextFormat) {
        self.0 ^= other.0;
    }

    /// Bits outside [`TextFormat::KNOWN`], preserved opaquely.
    pub const fn unknown_bits(self) -> u32 {
        self.0 & !Self::KNOWN.0
    }
}

impl BitOr for TextFormat {
    type Output = TextFormat;

    fn bitor(self, rhs: TextFormat) -> TextFormat {
        TextFormat(self.0 | rhs.0)
    }
}

impl BitOrAssign for TextFormat {
    fn bitor_assign(&mut self, rhs: TextFormat) {
        self.0 |= rhs.0;
    }
}

// ── TextMode ──────────────────────────────────────────────────────────────

/// Editing mode of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Ordinary editable text.
    #[default]
    Normal,
    /// Deleted as a single unit, caret cannot enter.
    Token,
    /// Deleted segment-by-segment.
    Segmented,
}

impl TextMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TextMode::Normal => "normal",
            TextMode::Token => "token",
            TextMode::Segmented => "segmented",
        }
    }

    /// Parse a wire string; unrecognized modes decode as normal.
    pub fn parse(s: &str) -> Self {
        match s {
            "token" => TextMode::Token,
            "segmented" => TextMode::Segmented,
            _ => TextMode::Normal,
        }
    }
}

// ── TextNode ──────────────────────────────────────────────────────────────

/// Leaf node holding a run of literal text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    pub text: String,
    pub format: TextFormat,
    pub detail: u32,
    pub mode: TextMode,
    pub style: String,
    pub version: u64,
}

impl TextNode {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            key: NodeKey::next(),
            parent: None,
            text: text.into(),
            format: TextFormat::default(),
            detail: 0,
            mode: TextMode::Normal,
            style: String::new(),
            version: 0,
        }
    }

    /// Length in characters — the unit text selection offsets are measured in.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bits_combine() {
        let mut format = TextFormat::default();
        format.insert(TextFormat::BOLD);
        format.insert(TextFormat::UNDERLINE);
        assert_eq!(format.bits(), 9);
        format.toggle(TextFormat::BOLD);
        assert_eq!(format.bits(), 8);
        assert!(format.contains(TextFormat::UNDERLINE));
        assert!(!format.contains(TextFormat::BOLD));
    }

    #[test]
    fn unknown_bits_survive() {
        let format = TextFormat::from_bits(0b1_0000_0101);
        assert_eq!(format.unknown_bits(), 0b1_0000_0000);
        assert!(format.contains(TextFormat::BOLD));
    }

    #[test]
    fn text_len_counts_characters() {
        let node = TextNode::new("héllo");
        assert_eq!(node.len(), 5);
        assert_eq!(node.text.len(), 6);
    }

    #[test]
    fn mode_parse_is_tolerant() {
        assert_eq!(TextMode::parse("token"), TextMode::Token);
        assert_eq!(TextMode::parse("segmented"), TextMode::Segmented);
        assert_eq!(TextMode::parse("whatever"), TextMode::Normal);
    }
}
