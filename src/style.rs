//! # Style Inheritance Stack
//!
//! Formatting attributes are inherited down the document tree. Each element
//! opens a scope; lookups walk from the innermost scope outwards and end at
//! the root scope, which holds a default for every attribute and can never
//! be popped.
//!
//! ```
//! use tillprint::style::{StyleAttr, StyleStack, StyleValue};
//!
//! let mut styles = StyleStack::new();
//! styles.push([("bold", "on"), ("width", "40")]);
//! assert_eq!(styles.get(StyleAttr::Bold), &StyleValue::Choice("on"));
//! assert_eq!(styles.width(), 40);
//!
//! styles.pop();
//! assert_eq!(styles.get(StyleAttr::Bold), &StyleValue::Choice("off"));
//! ```
//!
//! ## Command Order
//!
//! Attributes that map to printer commands carry an explicit order.
//! `ESC !` (size) clears bold, underline and font on real hardware, so the
//! order-1 group (align, size, color) is always sent before the order-10
//! group (underline, bold, font).

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

use tracing::warn;

use crate::protocol::text::{self, Alignment, CharSize, Color, Font, Underline};

/// Widest line or value field, in columns.
pub const MAX_COLUMNS: i64 = 512;

/// Deepest indent, in tab stops.
pub const MAX_INDENT: i64 = 32;

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    /// One of the attribute's legal choices
    Choice(&'static str),
    Int(i64),
    Float(f64),
    Str(String),
}

enum ValueKind {
    Choice(&'static [&'static str]),
    Int,
    Float,
    Str,
}

/// Every style attribute the markup understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleAttr {
    Align,
    Size,
    Color,
    Underline,
    Bold,
    Font,
    Width,
    Indent,
    TabWidth,
    Bullet,
    LineRatio,
    ValueDecimals,
    ValueSymbol,
    ValueSymbolPosition,
    ValueAutoint,
    ValueDecimalsSeparator,
    ValueThousandsSeparator,
    ValueWidth,
}

impl StyleAttr {
    pub const ALL: [StyleAttr; 18] = [
        StyleAttr::Align,
        StyleAttr::Size,
        StyleAttr::Color,
        StyleAttr::Underline,
        StyleAttr::Bold,
        StyleAttr::Font,
        StyleAttr::Width,
        StyleAttr::Indent,
        StyleAttr::TabWidth,
        StyleAttr::Bullet,
        StyleAttr::LineRatio,
        StyleAttr::ValueDecimals,
        StyleAttr::ValueSymbol,
        StyleAttr::ValueSymbolPosition,
        StyleAttr::ValueAutoint,
        StyleAttr::ValueDecimalsSeparator,
        StyleAttr::ValueThousandsSeparator,
        StyleAttr::ValueWidth,
    ];

    /// Markup attribute name.
    pub fn name(self) -> &'static str {
        match self {
            StyleAttr::Align => "align",
            StyleAttr::Size => "size",
            StyleAttr::Color => "color",
            StyleAttr::Underline => "underline",
            StyleAttr::Bold => "bold",
            StyleAttr::Font => "font",
            StyleAttr::Width => "width",
            StyleAttr::Indent => "indent",
            StyleAttr::TabWidth => "tabwidth",
            StyleAttr::Bullet => "bullet",
            StyleAttr::LineRatio => "line-ratio",
            StyleAttr::ValueDecimals => "value-decimals",
            StyleAttr::ValueSymbol => "value-symbol",
            StyleAttr::ValueSymbolPosition => "value-symbol-position",
            StyleAttr::ValueAutoint => "value-autoint",
            StyleAttr::ValueDecimalsSeparator => "value-decimals-separator",
            StyleAttr::ValueThousandsSeparator => "value-thousands-separator",
            StyleAttr::ValueWidth => "value-width",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.name() == name)
    }

    fn kind(self) -> ValueKind {
        match self {
            StyleAttr::Align => ValueKind::Choice(&["left", "center", "right"]),
            StyleAttr::Size => {
                ValueKind::Choice(&["normal", "double-height", "double-width", "double"])
            }
            StyleAttr::Color => ValueKind::Choice(&["black", "red"]),
            StyleAttr::Underline => ValueKind::Choice(&["off", "on", "double"]),
            StyleAttr::Bold => ValueKind::Choice(&["off", "on"]),
            StyleAttr::Font => ValueKind::Choice(&["a", "b"]),
            StyleAttr::ValueSymbolPosition => ValueKind::Choice(&["before", "after"]),
            StyleAttr::ValueAutoint => ValueKind::Choice(&["off", "on"]),
            StyleAttr::Width
            | StyleAttr::Indent
            | StyleAttr::TabWidth
            | StyleAttr::ValueDecimals
            | StyleAttr::ValueWidth => ValueKind::Int,
            StyleAttr::LineRatio => ValueKind::Float,
            StyleAttr::Bullet
            | StyleAttr::ValueSymbol
            | StyleAttr::ValueDecimalsSeparator
            | StyleAttr::ValueThousandsSeparator => ValueKind::Str,
        }
    }

    /// Legal range of an integer attribute.
    fn int_range(self) -> RangeInclusive<i64> {
        match self {
            StyleAttr::Indent => 0..=MAX_INDENT,
            StyleAttr::TabWidth => 0..=16,
            StyleAttr::ValueDecimals => 0..=12,
            _ => 0..=MAX_COLUMNS,
        }
    }

    /// Value held by the root scope.
    pub fn default_value(self) -> StyleValue {
        match self {
            StyleAttr::Align => StyleValue::Choice("left"),
            StyleAttr::Size => StyleValue::Choice("normal"),
            StyleAttr::Color => StyleValue::Choice("black"),
            StyleAttr::Underline => StyleValue::Choice("off"),
            StyleAttr::Bold => StyleValue::Choice("off"),
            StyleAttr::Font => StyleValue::Choice("a"),
            StyleAttr::Width => StyleValue::Int(48),
            StyleAttr::Indent => StyleValue::Int(0),
            StyleAttr::TabWidth => StyleValue::Int(2),
            StyleAttr::Bullet => StyleValue::Str(" - ".into()),
            StyleAttr::LineRatio => StyleValue::Float(0.5),
            StyleAttr::ValueDecimals => StyleValue::Int(2),
            StyleAttr::ValueSymbol => StyleValue::Str(String::new()),
            StyleAttr::ValueSymbolPosition => StyleValue::Choice("after"),
            StyleAttr::ValueAutoint => StyleValue::Choice("off"),
            StyleAttr::ValueDecimalsSeparator => StyleValue::Str(".".into()),
            StyleAttr::ValueThousandsSeparator => StyleValue::Str(",".into()),
            StyleAttr::ValueWidth => StyleValue::Int(0),
        }
    }

    /// Position in the device command sequence, for attributes that map to
    /// a printer command. Lower orders are sent first.
    pub fn command_order(self) -> Option<u8> {
        match self {
            StyleAttr::Align | StyleAttr::Size | StyleAttr::Color => Some(1),
            StyleAttr::Underline | StyleAttr::Bold | StyleAttr::Font => Some(10),
            _ => None,
        }
    }

    /// Coerce a raw markup value to this attribute's type.
    fn coerce(self, raw: &str) -> Result<StyleValue, String> {
        let raw = raw.trim_matches(|c: char| c.is_ascii_whitespace() && self.trims());
        match self.kind() {
            ValueKind::Choice(choices) => choices
                .iter()
                .copied()
                .find(|choice| choice.eq_ignore_ascii_case(raw))
                .map(StyleValue::Choice)
                .ok_or_else(|| format!("expected one of: {}", choices.join(", "))),
            ValueKind::Int => {
                let n = raw
                    .parse::<i64>()
                    .ok()
                    .or_else(|| {
                        raw.parse::<f64>()
                            .ok()
                            .filter(|f| f.is_finite())
                            .map(|f| f.trunc() as i64)
                    })
                    .ok_or_else(|| "expected an integer".to_string())?;
                let range = self.int_range();
                if !range.contains(&n) {
                    return Err(format!(
                        "expected a value between {} and {}",
                        range.start(),
                        range.end()
                    ));
                }
                Ok(StyleValue::Int(n))
            }
            ValueKind::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(StyleValue::Float)
                .ok_or_else(|| "expected a number".to_string()),
            ValueKind::Str => Ok(StyleValue::Str(raw.to_string())),
        }
    }

    // String attributes keep their whitespace (" - " bullets, " " separators).
    fn trims(self) -> bool {
        !matches!(self.kind(), ValueKind::Str)
    }
}

impl fmt::Display for StyleAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute value that was rejected and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleWarning {
    pub attr: StyleAttr,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for StyleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ignored {}=\"{}\": {}",
            self.attr, self.value, self.reason
        )
    }
}

type Scope = HashMap<StyleAttr, StyleValue>;

/// Stack of style scopes, root first.
#[derive(Debug, Clone)]
pub struct StyleStack {
    scopes: Vec<Scope>,
}

impl Default for StyleStack {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleStack {
    /// A stack holding only the root scope with every default.
    pub fn new() -> Self {
        let root = StyleAttr::ALL
            .into_iter()
            .map(|attr| (attr, attr.default_value()))
            .collect();
        Self { scopes: vec![root] }
    }

    /// Open a new scope with `attrs`.
    ///
    /// Names that are not style attributes (`src`, `encoding`, ...) are
    /// skipped. Invalid values are dropped and returned as warnings.
    pub fn push<'a, I>(&mut self, attrs: I) -> Vec<StyleWarning>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.scopes.push(Scope::new());
        self.set(attrs)
    }

    /// Override attributes in the innermost scope.
    pub fn set<'a, I>(&mut self, attrs: I) -> Vec<StyleWarning>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut warnings = Vec::new();
        for (name, raw) in attrs {
            let Some(attr) = StyleAttr::from_name(name) else {
                continue;
            };
            match attr.coerce(raw) {
                Ok(value) => {
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(attr, value);
                    }
                }
                Err(reason) => {
                    let warning = StyleWarning {
                        attr,
                        value: raw.to_string(),
                        reason,
                    };
                    warn!(%warning, "invalid style attribute");
                    warnings.push(warning);
                }
            }
        }
        warnings
    }

    /// Close the innermost scope. The root scope is never removed.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes, including the root.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Resolve an attribute, innermost scope first.
    pub fn get(&self, attr: StyleAttr) -> &StyleValue {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&attr))
            .unwrap_or(&ROOT_FALLBACK)
    }

    /// Device commands for the resolved style, in declared command order.
    pub fn to_device_commands(&self) -> Vec<u8> {
        let mut attrs: Vec<(u8, StyleAttr)> = StyleAttr::ALL
            .into_iter()
            .filter_map(|attr| attr.command_order().map(|order| (order, attr)))
            .collect();
        attrs.sort_by_key(|&(order, _)| order);

        let mut out = Vec::with_capacity(attrs.len() * 3);
        for (_, attr) in attrs {
            let cmd = match attr {
                StyleAttr::Align => text::align(self.align()),
                StyleAttr::Size => text::size(self.size()),
                StyleAttr::Color => text::color(self.color()),
                StyleAttr::Underline => text::underline(self.underline()),
                StyleAttr::Bold => text::bold(self.bold()),
                StyleAttr::Font => text::font(self.font()),
                _ => continue,
            };
            out.extend(cmd);
        }
        out
    }

    // ========================================================================
    // Typed accessors
    // ========================================================================

    fn choice(&self, attr: StyleAttr) -> &'static str {
        match self.get(attr) {
            StyleValue::Choice(c) => *c,
            _ => "",
        }
    }

    fn int(&self, attr: StyleAttr) -> i64 {
        match self.get(attr) {
            StyleValue::Int(n) => *n,
            _ => 0,
        }
    }

    /// Integer attribute clamped to its legal range.
    fn bounded(&self, attr: StyleAttr) -> usize {
        let range = attr.int_range();
        self.int(attr).clamp(*range.start(), *range.end()) as usize
    }

    /// Resolved string attribute.
    pub fn string(&self, attr: StyleAttr) -> &str {
        match self.get(attr) {
            StyleValue::Str(s) => s,
            _ => "",
        }
    }

    pub fn align(&self) -> Alignment {
        match self.choice(StyleAttr::Align) {
            "center" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::Left,
        }
    }

    pub fn size(&self) -> CharSize {
        match self.choice(StyleAttr::Size) {
            "double-height" => CharSize::DoubleHeight,
            "double-width" => CharSize::DoubleWidth,
            "double" => CharSize::Double,
            _ => CharSize::Normal,
        }
    }

    pub fn color(&self) -> Color {
        match self.choice(StyleAttr::Color) {
            "red" => Color::Red,
            _ => Color::Black,
        }
    }

    pub fn underline(&self) -> Underline {
        match self.choice(StyleAttr::Underline) {
            "on" => Underline::On,
            "double" => Underline::Double,
            _ => Underline::Off,
        }
    }

    pub fn bold(&self) -> bool {
        self.choice(StyleAttr::Bold) == "on"
    }

    pub fn font(&self) -> Font {
        match self.choice(StyleAttr::Font) {
            "b" => Font::B,
            _ => Font::A,
        }
    }

    /// Line width in columns.
    pub fn width(&self) -> usize {
        self.bounded(StyleAttr::Width)
    }

    pub fn indent(&self) -> usize {
        self.bounded(StyleAttr::Indent)
    }

    pub fn tabwidth(&self) -> usize {
        self.bounded(StyleAttr::TabWidth)
    }

    pub fn bullet(&self) -> &str {
        self.string(StyleAttr::Bullet)
    }

    /// Share of a composed line given to the left run, clamped to [0, 1].
    pub fn line_ratio(&self) -> f64 {
        match self.get(StyleAttr::LineRatio) {
            StyleValue::Float(f) => f.clamp(0.0, 1.0),
            _ => 0.5,
        }
    }

    pub fn value_decimals(&self) -> usize {
        self.bounded(StyleAttr::ValueDecimals)
    }

    pub fn value_symbol_before(&self) -> bool {
        self.choice(StyleAttr::ValueSymbolPosition) == "before"
    }

    pub fn value_autoint(&self) -> bool {
        self.choice(StyleAttr::ValueAutoint) == "on"
    }

    pub fn value_width(&self) -> usize {
        self.bounded(StyleAttr::ValueWidth)
    }
}

// Only reachable if a scope were built without going through `new`.
static ROOT_FALLBACK: StyleValue = StyleValue::Int(0);
