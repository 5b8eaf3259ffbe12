//! # Value Formatting
//!
//! Formatting for `<value>` elements: fixed decimals, thousands grouping,
//! custom separators, an optional currency symbol and a minimum width.
//!
//! ```
//! use tillprint::markup::value::{format_value, ValueFormat};
//!
//! let price = ValueFormat { symbol: "$".into(), autoint: true, ..ValueFormat::default() };
//! assert_eq!(format_value(12.0, &price), "12$");
//! assert_eq!(format_value(1234.5, &price), "1,234.50$");
//! ```

use crate::error::CompileError;
use crate::style::{StyleAttr, StyleStack};

/// Resolved `value-*` style attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFormat {
    pub decimals: usize,
    /// Minimum width of the number (symbol excluded); right aligned
    pub width: usize,
    pub decimals_separator: String,
    pub thousands_separator: String,
    /// Drop the decimals of whole numbers
    pub autoint: bool,
    pub symbol: String,
    pub symbol_before: bool,
}

impl Default for ValueFormat {
    fn default() -> Self {
        Self {
            decimals: 2,
            width: 0,
            decimals_separator: ".".into(),
            thousands_separator: ",".into(),
            autoint: false,
            symbol: String::new(),
            symbol_before: false,
        }
    }
}

impl ValueFormat {
    pub fn from_styles(styles: &StyleStack) -> Self {
        Self {
            decimals: styles.value_decimals(),
            width: styles.value_width(),
            decimals_separator: styles.string(StyleAttr::ValueDecimalsSeparator).to_string(),
            thousands_separator: styles
                .string(StyleAttr::ValueThousandsSeparator)
                .to_string(),
            autoint: styles.value_autoint(),
            symbol: styles.string(StyleAttr::ValueSymbol).to_string(),
            symbol_before: styles.value_symbol_before(),
        }
    }
}

/// Parse the text content of a `<value>` element.
pub fn parse_value(text: &str) -> Result<f64, CompileError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CompileError::InvalidElement {
            element: "value",
            message: format!("'{}' is not a number", trimmed),
        })
}

/// Format a number according to `fmt`.
pub fn format_value(value: f64, fmt: &ValueFormat) -> String {
    let decimals = if fmt.autoint && value.fract() == 0.0 {
        0
    } else {
        fmt.decimals
    };

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut number = String::with_capacity(fixed.len() + 8);
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        number.push('-');
    }
    number.push_str(&group_thousands(int_part, &fmt.thousands_separator));
    if let Some(frac) = frac_part {
        number.push_str(&fmt.decimals_separator);
        number.push_str(frac);
    }

    let padding = fmt.width.saturating_sub(number.chars().count());
    let mut out = " ".repeat(padding);
    if fmt.symbol_before {
        out.push_str(&fmt.symbol);
        out.push_str(&number);
    } else {
        out.push_str(&number);
        out.push_str(&fmt.symbol);
    }
    out
}

fn group_thousands(digits: &str, separator: &str) -> String {
    if separator.is_empty() || digits.len() <= 3 {
        return digits.to_string();
    }
    let mut out = String::with_capacity(digits.len() + separator.len() * (digits.len() / 3));
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}
