//! # Markup Compiler
//!
//! Walks a [`Node`] tree and writes ESC/POS commands into a
//! [`CommandBuffer`].
//!
//! ## Serializers
//!
//! Output goes through a [`Sink`]. The stream sink writes to the device
//! buffer and tracks a stack of block/inline entities plus a dirty flag
//! (text was written on the current line and no break followed yet):
//!
//! | Call | Effect |
//! |------|--------|
//! | `start_block` | line break if dirty, then the resolved style |
//! | `start_inline` | a separating space if dirty, then the resolved style |
//! | `end_entity` | line break if a dirty block ends |
//! | `text` | whitespace collapsed and trimmed |
//! | `pre` | verbatim |
//!
//! Inside `<line>`, children are routed to a [`LineComposer`] instead, and
//! the finished line is written to the stream as one `pre` run.
//!
//! ## Trailer
//!
//! After the tree, the root's `open-cashdrawer="true"` pulses the drawer,
//! and unless `cut="false"` the paper is cut. Both flags also accept
//! `on`/`off`, `yes`/`no` and `1`/`0` in any case. A document that already
//! ends with a cut is not cut twice.
//!
//! ## Failures
//!
//! Any fault aborts the walk. The bytes written so far are kept, followed by
//! the error message in font B and a cut, and handed back in a
//! [`CompileFailure`] so the device is never left mid-document.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::line::LineComposer;
use super::value::{ValueFormat, format_value, parse_value};
use super::{CommandBuffer, MAX_DEPTH, Node, Tag, TagKind, parse};
use crate::error::{CompileError, CompileFailure};
use crate::protocol::barcode::{self, Symbology};
use crate::protocol::commands::{self, LF};
use crate::protocol::text::{self, CharSize, Font};
use crate::render::raster::RasterCache;
use crate::style::StyleStack;

/// Width of the rule under a printed error message.
const ERROR_RULE_WIDTH: usize = 48;

/// Widest raster a default 80mm printer can print.
pub const DEFAULT_MAX_IMAGE_DOTS: u32 = 576;

/// Output target of the tree walk.
trait Sink {
    fn start_block(&mut self, styles: &StyleStack);
    fn start_inline(&mut self, styles: &StyleStack);
    fn end_entity(&mut self);
    fn text(&mut self, text: &str);
    fn pre(&mut self, text: &str);
    /// Text that does not dirty the line (list markers).
    fn marker(&mut self, styles: &StyleStack, text: &str);
    fn linebreak(&mut self);
    /// A device command produced by `tag`.
    fn command(&mut self, tag: Tag, bytes: &[u8]) -> Result<(), CompileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Block,
    Inline,
}

#[derive(Debug, Default)]
struct StreamSink {
    out: CommandBuffer,
    stack: Vec<Entity>,
    dirty: bool,
}

impl StreamSink {
    fn break_if_dirty(&mut self) {
        if self.dirty {
            self.out.push(&[LF]);
            self.dirty = false;
        }
    }
}

impl Sink for StreamSink {
    fn start_block(&mut self, styles: &StyleStack) {
        self.break_if_dirty();
        self.stack.push(Entity::Block);
        self.out.push(&styles.to_device_commands());
    }

    fn start_inline(&mut self, styles: &StyleStack) {
        self.stack.push(Entity::Inline);
        if self.dirty {
            self.out.push_text(" ");
        }
        self.out.push(&styles.to_device_commands());
    }

    fn end_entity(&mut self) {
        if self.stack.pop() == Some(Entity::Block) {
            self.break_if_dirty();
        }
    }

    fn text(&mut self, text: &str) {
        let text = collapse_whitespace(text);
        if !text.is_empty() {
            self.out.push_text(&text);
            self.dirty = true;
        }
    }

    fn pre(&mut self, text: &str) {
        if !text.is_empty() {
            self.out.push_text(text);
            self.dirty = true;
        }
    }

    fn marker(&mut self, styles: &StyleStack, text: &str) {
        self.out.push(&styles.to_device_commands());
        self.out.push_text(text);
    }

    fn linebreak(&mut self) {
        self.out.push(&[LF]);
        self.dirty = false;
    }

    fn command(&mut self, tag: Tag, bytes: &[u8]) -> Result<(), CompileError> {
        if matches!(tag, Tag::Cut | Tag::PartialCut) {
            self.break_if_dirty();
        }
        self.out.push(bytes);
        Ok(())
    }
}

impl Sink for LineComposer {
    fn start_block(&mut self, _styles: &StyleStack) {
        if self.has_content() {
            self.push(" ");
        }
    }

    fn start_inline(&mut self, _styles: &StyleStack) {
        if self.has_content() {
            self.push(" ");
        }
    }

    fn end_entity(&mut self) {}

    fn text(&mut self, text: &str) {
        let text = collapse_whitespace(text);
        if !text.is_empty() {
            self.push(&text);
        }
    }

    fn pre(&mut self, text: &str) {
        self.push(text);
    }

    fn marker(&mut self, _styles: &StyleStack, text: &str) {
        self.push(text);
    }

    fn linebreak(&mut self) {}

    fn command(&mut self, tag: Tag, _bytes: &[u8]) -> Result<(), CompileError> {
        Err(CompileError::InvalidElement {
            element: "line",
            message: format!("<{}> cannot be placed inside a line", tag.name()),
        })
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiles receipt documents to ESC/POS bytes.
#[derive(Debug, Clone)]
pub struct MarkupCompiler {
    images: Arc<RasterCache>,
    max_image_dots: u32,
}

impl Default for MarkupCompiler {
    fn default() -> Self {
        Self::new(Arc::new(RasterCache::new()))
    }
}

impl MarkupCompiler {
    pub fn new(images: Arc<RasterCache>) -> Self {
        Self {
            images,
            max_image_dots: DEFAULT_MAX_IMAGE_DOTS,
        }
    }

    /// Images wider than this are still sent but logged, since the printer
    /// will clip them.
    pub fn with_max_image_dots(mut self, dots: u32) -> Self {
        self.max_image_dots = dots;
        self
    }

    /// Parse and compile a markup document.
    pub fn compile_str(&self, markup: &str) -> Result<Vec<u8>, CompileFailure> {
        match parse::parse(markup) {
            Ok(root) => self.compile(&root),
            Err(error) => {
                let mut sink = StreamSink::default();
                sink.out.push(&commands::init());
                Err(fail(sink, error))
            }
        }
    }

    /// Compile a document tree.
    ///
    /// Output starts with `ESC @` and the default style, so every document
    /// is printed from a known printer state.
    pub fn compile(&self, root: &Node) -> Result<Vec<u8>, CompileFailure> {
        let mut walker = Walker {
            styles: StyleStack::new(),
            images: &self.images,
            max_image_dots: self.max_image_dots,
            depth: 0,
        };
        let mut sink = StreamSink::default();
        sink.out.push(&commands::init());
        sink.out.push(&walker.styles.to_device_commands());

        if let Err(error) = walker.node(root, &mut sink, 0) {
            return Err(fail(sink, error));
        }

        sink.break_if_dirty();
        if root_flag(root, "open-cashdrawer", false) {
            sink.out.push(&commands::open_drawer());
        }
        let auto_cut = root_flag(root, "cut", true);
        let already_cut = sink.out.ends_with(&commands::cut_full_feed())
            || sink.out.ends_with(&commands::cut_partial_feed());
        if auto_cut && !already_cut {
            sink.out.push(&commands::cut_full_feed());
        }

        debug!(bytes = sink.out.len(), "compiled receipt");
        Ok(sink.out.into_bytes())
    }
}

/// A boolean attribute of the root element. Unrecognised values keep the
/// default.
fn root_flag(root: &Node, name: &str, default: bool) -> bool {
    let Some(raw) = root.attr(name) else {
        return default;
    };
    let value = raw.trim();
    if ["true", "on", "yes", "1"].iter().any(|v| v.eq_ignore_ascii_case(value)) {
        true
    } else if ["false", "off", "no", "0"].iter().any(|v| v.eq_ignore_ascii_case(value)) {
        false
    } else {
        warn!(attribute = name, value = raw, default, "unrecognised flag value");
        default
    }
}

/// Close a failed compile: partial output, the error in font B, a cut.
fn fail(mut sink: StreamSink, error: CompileError) -> CompileFailure {
    error!(%error, "receipt compilation failed");
    sink.break_if_dirty();
    let out = &mut sink.out;
    out.push(&text::size(CharSize::Normal));
    out.push(&text::bold(false));
    out.push(&text::font(Font::B));
    out.push_text(&format!("{}\n", error));
    out.push_text(&"-".repeat(ERROR_RULE_WIDTH));
    out.push(&[LF]);
    out.push(&commands::cut_full_feed());
    CompileFailure {
        error,
        stub: sink.out.into_bytes(),
    }
}

struct Walker<'c> {
    styles: StyleStack,
    images: &'c RasterCache,
    max_image_dots: u32,
    /// Elements currently open
    depth: usize,
}

impl Walker<'_> {
    fn node(&mut self, node: &Node, sink: &mut dyn Sink, indent: usize) -> Result<(), CompileError> {
        if self.depth >= MAX_DEPTH {
            return Err(CompileError::InvalidElement {
                element: node.tag.name(),
                message: format!("nested deeper than {} levels", MAX_DEPTH),
            });
        }
        self.depth += 1;
        self.styles.push(node.tag.base_style().iter().copied());
        self.styles.set(node.attr_pairs());
        let result = self.render(node, sink, indent);
        self.styles.pop();
        self.depth -= 1;
        result
    }

    /// Children interleaved with their tails. A tail restores the parent's
    /// style before its text.
    fn children(&mut self, node: &Node, sink: &mut dyn Sink, indent: usize) -> Result<(), CompileError> {
        for child in &node.children {
            self.node(child, sink, indent)?;
            if !child.tail.trim().is_empty() {
                sink.start_inline(&self.styles);
                sink.text(&child.tail);
                sink.end_entity();
            }
        }
        Ok(())
    }

    /// Line width in columns for the current character size.
    fn columns(&self) -> usize {
        let width = self.styles.width();
        if self.styles.size().is_double_width() {
            width / 2
        } else {
            width
        }
    }

    fn render(&mut self, node: &Node, sink: &mut dyn Sink, indent: usize) -> Result<(), CompileError> {
        match node.tag {
            Tag::Line => {
                let mut composer = LineComposer::new(
                    self.styles.indent() + indent,
                    self.styles.tabwidth(),
                    self.columns(),
                    self.styles.line_ratio(),
                );
                sink.start_block(&self.styles);
                for child in &node.children {
                    match child.tag {
                        Tag::Left => self.node(child, &mut composer, indent)?,
                        Tag::Right => {
                            composer.start_right();
                            self.node(child, &mut composer, indent)?;
                        }
                        _ => debug!(tag = child.tag.name(), "ignoring non-run child of <line>"),
                    }
                }
                sink.pre(&composer.finish());
                sink.end_entity();
            }
            Tag::Ul => {
                let pad = " ".repeat(indent.saturating_mul(self.styles.tabwidth()));
                let bullet = format!("{}{}", pad, self.styles.bullet());
                sink.start_block(&self.styles);
                for child in &node.children {
                    if child.tag == Tag::Li {
                        sink.marker(&self.styles, &bullet);
                    }
                    self.node(child, sink, indent + 1)?;
                }
                sink.end_entity();
            }
            Tag::Ol => {
                let pad = " ".repeat(indent.saturating_mul(self.styles.tabwidth()));
                let items = node.children.iter().filter(|c| c.tag == Tag::Li).count();
                let marker_width = items.to_string().len() + 1;
                let mut number = 1;
                sink.start_block(&self.styles);
                for child in &node.children {
                    if child.tag == Tag::Li {
                        let label = format!("{})", number);
                        let marker = format!("{} {:>w$} ", pad, label, w = marker_width);
                        sink.marker(&self.styles, &marker);
                        number += 1;
                    }
                    self.node(child, sink, indent + 1)?;
                }
                sink.end_entity();
            }
            Tag::Value => {
                let value = parse_value(&node.text)?;
                sink.start_inline(&self.styles);
                sink.pre(&format_value(value, &ValueFormat::from_styles(&self.styles)));
                sink.end_entity();
            }
            Tag::Pre => {
                sink.start_block(&self.styles);
                sink.pre(&node.text);
                sink.end_entity();
            }
            Tag::Hr => {
                sink.start_block(&self.styles);
                sink.text(&"-".repeat(self.columns()));
                sink.end_entity();
            }
            Tag::Br => sink.linebreak(),
            Tag::Img => {
                let src = node.attr("src").ok_or(CompileError::InvalidElement {
                    element: "img",
                    message: "missing src attribute".into(),
                })?;
                let raster = self.images.encode_data_url(src)?;
                if raster.width_dots > self.max_image_dots {
                    warn!(
                        width = raster.width_dots,
                        max = self.max_image_dots,
                        "image is wider than the printer and will be clipped"
                    );
                }
                sink.start_block(&self.styles);
                sink.command(Tag::Img, &raster.command)?;
                sink.end_entity();
            }
            Tag::Barcode => {
                let invalid = |message: String| CompileError::InvalidElement {
                    element: "barcode",
                    message,
                };
                let encoding = node
                    .attr("encoding")
                    .ok_or_else(|| invalid("missing encoding attribute".into()))?;
                let symbology: Symbology = encoding.parse().map_err(invalid)?;
                let data = collapse_whitespace(&node.text);
                let cmd = barcode::barcode(symbology, &data).map_err(invalid)?;
                sink.start_block(&self.styles);
                sink.command(Tag::Barcode, &cmd)?;
                sink.end_entity();
            }
            Tag::Cut => sink.command(Tag::Cut, &commands::cut_full_feed())?,
            Tag::PartialCut => sink.command(Tag::PartialCut, &commands::cut_partial_feed())?,
            Tag::CashDraw => sink.command(Tag::CashDraw, &commands::open_drawer())?,
            tag => {
                if tag.kind() == TagKind::Block {
                    sink.start_block(&self.styles);
                } else {
                    sink.start_inline(&self.styles);
                }
                sink.text(&node.text);
                self.children(node, sink, indent)?;
                sink.end_entity();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(markup: &str) -> Vec<u8> {
        MarkupCompiler::default().compile_str(markup).unwrap()
    }

    fn styles(attrs: &[(&str, &str)]) -> Vec<u8> {
        let mut s = StyleStack::new();
        s.push(attrs.iter().copied());
        s.to_device_commands()
    }

    fn cat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn test_end_to_end_sample() {
        let out = compile(
            "<receipt><h1>Shop</h1><line><left>Total</left><right>9.99</right></line><cut/></receipt>",
        );
        let defaults = styles(&[]);
        let line = format!("Total{}9.99", " ".repeat(39));
        let expected = cat(&[
            &commands::init(),
            &defaults,
            &defaults,
            &styles(&[("bold", "on"), ("size", "double")]),
            b"Shop\n",
            &defaults,
            line.as_bytes(),
            b"\n",
            &commands::cut_full_feed(),
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let doc = "<receipt><h2>Hi</h2><ul><li>one</li><li>two</li></ul>\
                   <p>Total <value value-symbol=\"$\">12</value></p></receipt>";
        let compiler = MarkupCompiler::default();
        assert_eq!(compiler.compile_str(doc).unwrap(), compiler.compile_str(doc).unwrap());
    }

    #[test]
    fn test_whitespace_collapsing_and_inline_spacing() {
        let out = compile("<receipt cut=\"false\"><p>  Hello\n   <b>big</b>  world </p></receipt>");
        let defaults = styles(&[]);
        let expected = cat(&[
            &commands::init(),
            &defaults,
            &defaults,
            &defaults,
            b"Hello ",
            &styles(&[("bold", "on")]),
            b"big ",
            &defaults,
            b"world\n",
        ]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_pre_is_verbatim() {
        let out = compile("<receipt cut=\"false\"><pre>a   b\n  c</pre></receipt>");
        assert!(out.windows(9).any(|w| w == b"a   b\n  c"));
    }

    #[test]
    fn test_automatic_cut_and_drawer() {
        let out = compile("<receipt open-cashdrawer=\"true\"><p>x</p></receipt>");
        let tail = cat(&[b"x\n", &commands::open_drawer(), &commands::cut_full_feed()]);
        assert!(out.ends_with(&tail));

        let uncut = compile("<receipt cut=\"false\"><p>x</p></receipt>");
        assert!(uncut.ends_with(b"x\n"));
    }

    #[test]
    fn test_explicit_partial_cut_is_not_doubled() {
        let out = compile("<receipt><p>x</p><partialcut/></receipt>");
        assert!(out.ends_with(&cat(&[b"x\n", &commands::cut_partial_feed()])));
        let cuts = out.windows(2).filter(|w| w == &[0x1D, 0x56]).count();
        assert_eq!(cuts, 1);
    }

    #[test]
    fn test_hr_halves_for_double_width() {
        let out = compile("<receipt width=\"40\"><hr/><hr size=\"double\"/></receipt>");
        let text = String::from_utf8_lossy(&out).to_string();
        assert!(text.contains(&format!("{}\n", "-".repeat(40))));
        assert!(text.contains(&format!("\u{1b}M\u{0}{}\n", "-".repeat(20))));
    }

    #[test]
    fn test_unordered_list() {
        let out = compile("<receipt cut=\"false\"><ul><li>one</li><li>two</li></ul></receipt>");
        let text = String::from_utf8_lossy(&out).to_string();
        let plain: String = text
            .split('\u{1b}')
            .map(|chunk| chunk.get(2..).unwrap_or(""))
            .collect();
        assert_eq!(plain, " - one\n - two\n");
    }

    #[test]
    fn test_ordered_list_markers_are_right_justified() {
        let items: String = (1..=10).map(|i| format!("<li>item {}</li>", i)).collect();
        let out = compile(&format!("<receipt cut=\"false\"><ol>{}</ol></receipt>", items));
        let text = String::from_utf8_lossy(&out).to_string();
        assert!(text.contains("  1) "));
        assert!(text.contains(" 10) "));
    }

    #[test]
    fn test_line_with_value_and_indent() {
        let out = compile(
            "<receipt width=\"20\" cut=\"false\"><line indent=\"1\"><left>Tea</left>\
             <right><value value-symbol=\"$\" value-symbol-position=\"before\">3.5</value></right>\
             </line></receipt>",
        );
        // 20 - 2 indent = 18 columns: 9 left, 9 right
        let expected = format!("  Tea{}$3.50\n", " ".repeat(10));
        assert!(out.ends_with(expected.as_bytes()));
    }

    #[test]
    fn test_barcode() {
        let out = compile("<receipt><barcode encoding=\"ean13\"> 4006381333931 </barcode></receipt>");
        let cmd = barcode::barcode(Symbology::Ean13, "4006381333931").unwrap();
        assert!(out.windows(cmd.len()).any(|w| w == cmd.as_slice()));
    }

    #[test]
    fn test_barcode_without_encoding_fails() {
        let err = MarkupCompiler::default()
            .compile_str("<receipt><barcode>123</barcode></receipt>")
            .unwrap_err();
        assert!(matches!(err.error, CompileError::InvalidElement { element: "barcode", .. }));
    }

    #[test]
    fn test_failure_stub_keeps_partial_output_and_cuts() {
        let err = MarkupCompiler::default()
            .compile_str("<receipt><p>Before</p><p><value>abc</value></p></receipt>")
            .unwrap_err();
        assert!(matches!(err.error, CompileError::InvalidElement { element: "value", .. }));

        let stub = &err.stub;
        assert!(stub.starts_with(&commands::init()));
        assert!(stub.windows(7).any(|w| w == b"Before\n"));
        assert!(stub.windows(3).any(|w| w == text::font(Font::B).as_slice()));
        assert!(stub.windows(3).any(|w| w == b"abc"));
        assert!(stub.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_parse_failure_still_produces_a_stub() {
        let err = MarkupCompiler::default()
            .compile_str("<receipt><table/></receipt>")
            .unwrap_err();
        assert_eq!(err.error, CompileError::UnsupportedElement("table".into()));
        assert!(err.stub.starts_with(&commands::init()));
        assert!(err.stub.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_device_commands_rejected_inside_line() {
        let err = MarkupCompiler::default()
            .compile_str("<receipt><line><left><cut/></left></line></receipt>")
            .unwrap_err();
        assert!(matches!(err.error, CompileError::InvalidElement { element: "line", .. }));
    }

    #[test]
    fn test_oversized_layout_numbers_are_ignored() {
        let out = compile(
            "<receipt cut=\"false\"><p><value value-width=\"1000000000000000000\">1</value></p></receipt>",
        );
        assert!(out.ends_with(b"1.00\n"));

        let out = compile(
            "<receipt indent=\"9223372036854775807\" width=\"99999999999\" tabwidth=\"4096\">\
             <line><left>a</left><right>b</right></line><hr/></receipt>",
        );
        let line = format!("a{}b\n", " ".repeat(46));
        assert!(out.windows(line.len()).any(|w| w == line.as_bytes()));
        assert!(out.windows(49).any(|w| w == format!("{}\n", "-".repeat(48)).as_bytes()));
    }

    #[test]
    fn test_deep_nesting_fails_with_stub() {
        let doc = format!(
            "<receipt>{}x{}</receipt>",
            "<b>".repeat(100_000),
            "</b>".repeat(100_000)
        );
        let failure = MarkupCompiler::default().compile_str(&doc).unwrap_err();
        assert!(matches!(failure.error, CompileError::Markup { .. }));
        assert!(failure.stub.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_deep_tree_built_in_code_is_rejected() {
        let mut node = Node::text_node(Tag::B, "x");
        for _ in 0..MAX_DEPTH {
            node = Node::new(Tag::Span).with_child(node);
        }
        let root = Node::new(Tag::Receipt).with_child(node);

        let failure = MarkupCompiler::default().compile(&root).unwrap_err();
        assert_eq!(
            failure.error,
            CompileError::InvalidElement {
                element: "span",
                message: format!("nested deeper than {} levels", MAX_DEPTH),
            }
        );
        assert!(failure.stub.ends_with(&commands::cut_full_feed()));
    }

    #[test]
    fn test_root_flags_ignore_case() {
        let cut = commands::cut_full_feed();
        assert!(compile("<receipt cut=\"TRUE\"><p>x</p></receipt>").ends_with(&cut));
        assert!(compile("<receipt cut=\"on\"><p>x</p></receipt>").ends_with(&cut));
        assert!(compile("<receipt cut=\"maybe\"><p>x</p></receipt>").ends_with(&cut));
        assert!(compile("<receipt cut=\"Off\"><p>x</p></receipt>").ends_with(b"x\n"));

        let out = compile("<receipt open-cashdrawer=\"Yes\" cut=\"0\"><p>x</p></receipt>");
        assert!(out.ends_with(&cat(&[b"x\n", &commands::open_drawer()])));
    }
}
