//! # Receipt Markup
//!
//! A small XML vocabulary for receipts, compiled into ESC/POS bytes.
//!
//! ```text
//! <receipt align="center">
//!     <h1>Shop</h1>
//!     <line><left>Total</left><right><value>9.99</value></right></line>
//! </receipt>
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! markup ──► parse::parse ──► Node tree ──► MarkupCompiler ──► CommandBuffer
//!                                  ▲
//!        receipt::ReceiptData ─────┘ (structured receipts build the tree directly)
//! ```
//!
//! - [`parse`]: markup text to [`Node`] tree
//! - [`compiler`]: tree walk with the style stack and serializers
//! - [`line`]: two-column line composer
//! - [`value`]: numeric value formatting

pub mod compiler;
pub mod line;
pub mod parse;
pub mod value;

pub use compiler::MarkupCompiler;

/// Deepest element nesting accepted by the parser and the compiler.
pub const MAX_DEPTH: usize = 64;

use crate::protocol::cp437;

/// How an element participates in layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Starts on a fresh line and ends with a line break
    Block,
    /// Flows within the current line
    Inline,
    /// Has its own rendering rule
    Special,
}

/// Element vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Receipt,
    P,
    Div,
    Section,
    Article,
    Header,
    Footer,
    Li,
    H1,
    H2,
    H3,
    H4,
    H5,
    Span,
    B,
    Em,
    Left,
    Right,
    Line,
    Ul,
    Ol,
    Value,
    Pre,
    Hr,
    Br,
    Img,
    Barcode,
    Cut,
    PartialCut,
    CashDraw,
}

impl Tag {
    pub fn from_name(name: &str) -> Option<Self> {
        let tag = match name {
            "receipt" => Tag::Receipt,
            "p" => Tag::P,
            "div" => Tag::Div,
            "section" => Tag::Section,
            "article" => Tag::Article,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "li" => Tag::Li,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "span" => Tag::Span,
            "b" => Tag::B,
            "em" => Tag::Em,
            "left" => Tag::Left,
            "right" => Tag::Right,
            "line" => Tag::Line,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "value" => Tag::Value,
            "pre" => Tag::Pre,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "barcode" => Tag::Barcode,
            "cut" => Tag::Cut,
            "partialcut" => Tag::PartialCut,
            "cashdraw" => Tag::CashDraw,
            _ => return None,
        };
        Some(tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Receipt => "receipt",
            Tag::P => "p",
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Article => "article",
            Tag::Header => "header",
            Tag::Footer => "footer",
            Tag::Li => "li",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::Span => "span",
            Tag::B => "b",
            Tag::Em => "em",
            Tag::Left => "left",
            Tag::Right => "right",
            Tag::Line => "line",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Value => "value",
            Tag::Pre => "pre",
            Tag::Hr => "hr",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Barcode => "barcode",
            Tag::Cut => "cut",
            Tag::PartialCut => "partialcut",
            Tag::CashDraw => "cashdraw",
        }
    }

    pub fn kind(self) -> TagKind {
        match self {
            Tag::Receipt
            | Tag::P
            | Tag::Div
            | Tag::Section
            | Tag::Article
            | Tag::Header
            | Tag::Footer
            | Tag::Li
            | Tag::H1
            | Tag::H2
            | Tag::H3
            | Tag::H4
            | Tag::H5 => TagKind::Block,
            Tag::Span | Tag::B | Tag::Em | Tag::Left | Tag::Right => TagKind::Inline,
            _ => TagKind::Special,
        }
    }

    /// Style the element applies before its own attributes.
    pub fn base_style(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Tag::H1 => &[("bold", "on"), ("size", "double")],
            Tag::H2 => &[("size", "double")],
            Tag::H3 => &[("bold", "on"), ("size", "double-height")],
            Tag::H4 => &[("size", "double-height")],
            Tag::H5 => &[("bold", "on")],
            Tag::Em => &[("font", "b")],
            Tag::B => &[("bold", "on")],
            _ => &[],
        }
    }
}

/// One element of a document tree.
///
/// `text` is the content before the first child; each child's `tail` is the
/// content between it and the next sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: Tag,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Node>,
    pub tail: String,
}

impl Node {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            tail: String::new(),
        }
    }

    /// Element holding only text.
    pub fn text_node(tag: Tag, text: impl Into<String>) -> Self {
        Self::new(tag).with_text(text)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = tail.into();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes as borrowed pairs, for the style stack.
    pub fn attr_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Append-only device command bytes for one compile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBuffer {
    bytes: Vec<u8>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Append text in the printer's code page.
    pub fn push_text(&mut self, text: &str) {
        self.bytes.extend(cp437::encode(text));
    }

    pub fn ends_with(&self, suffix: &[u8]) -> bool {
        self.bytes.ends_with(suffix)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names_round_trip() {
        for name in ["receipt", "h3", "partialcut", "cashdraw", "value", "left"] {
            assert_eq!(Tag::from_name(name).map(Tag::name), Some(name));
        }
        assert_eq!(Tag::from_name("table"), None);
    }

    #[test]
    fn test_tag_kinds() {
        assert_eq!(Tag::Footer.kind(), TagKind::Block);
        assert_eq!(Tag::Em.kind(), TagKind::Inline);
        assert_eq!(Tag::Line.kind(), TagKind::Special);
    }

    #[test]
    fn test_node_builder() {
        let node = Node::new(Tag::P)
            .with_attr("align", "center")
            .with_text("Hello")
            .with_child(Node::text_node(Tag::B, "World").with_tail("!"));

        assert_eq!(node.attr("align"), Some("center"));
        assert_eq!(node.attr("bold"), None);
        assert_eq!(node.children[0].tail, "!");
        assert_eq!(node.attr_pairs().count(), 1);
    }

    #[test]
    fn test_command_buffer_encodes_text() {
        let mut buf = CommandBuffer::new();
        buf.push(&[0x1B, 0x40]);
        buf.push_text("Café");
        assert_eq!(buf.as_bytes(), &[0x1B, 0x40, b'C', b'a', b'f', 0x82]);
        assert!(buf.ends_with(&[b'f', 0x82]));
    }
}
