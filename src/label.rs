//! # Labels
//!
//! Structured label data rendered to ZPL. Labels are coordinate based: each
//! field carries its own origin in dots, measured from the top-left corner.
//!
//! ```json
//! {
//!   "width_dots": 576, "height_dots": 400, "copies": 2,
//!   "fields": [
//!     {"type": "box", "x": 10, "y": 10, "width": 556, "height": 380, "thickness": 3},
//!     {"type": "text", "x": 20, "y": 30, "height": 40, "data": "Organic Beans",
//!      "block_width": 536, "justify": "center"},
//!     {"type": "barcode", "kind": "qr", "x": 20, "y": 100, "data": "0123456789"}
//!   ]
//! }
//! ```

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::CompileError;
use crate::protocol::zpl::{FieldBlock, FieldFont, Justification, LabelWriter, Orientation};

fn one() -> u32 {
    1
}

fn default_char_height() -> u32 {
    30
}

fn default_bar_height() -> u32 {
    80
}

fn default_magnification() -> u8 {
    4
}

fn yes() -> bool {
    true
}

/// Barcode symbologies available on labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelBarcode {
    Code128,
    Code39,
    Ean13,
    Qr,
}

/// One printed element of a label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LabelField {
    Text {
        x: u32,
        y: u32,
        #[serde(default = "default_char_height")]
        height: u32,
        #[serde(default)]
        width: u32,
        #[serde(default)]
        orientation: Orientation,
        /// Wrap into a block this many dots wide
        #[serde(default)]
        block_width: Option<u32>,
        #[serde(default = "one")]
        max_lines: u32,
        #[serde(default)]
        justify: Justification,
        data: String,
    },
    Barcode {
        x: u32,
        y: u32,
        kind: LabelBarcode,
        #[serde(default = "default_bar_height")]
        height: u32,
        /// Print the human readable line
        #[serde(default = "yes")]
        readable: bool,
        /// QR module size
        #[serde(default = "default_magnification")]
        magnification: u8,
        data: String,
    },
    /// Rectangle outline; a zero width or height draws a line
    #[serde(rename = "box")]
    Rect {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        #[serde(default = "one")]
        thickness: u32,
    },
}

impl LabelField {
    fn origin(&self) -> (u32, u32) {
        match self {
            LabelField::Text { x, y, .. }
            | LabelField::Barcode { x, y, .. }
            | LabelField::Rect { x, y, .. } => (*x, *y),
        }
    }
}

/// A label to print.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelData {
    pub width_dots: u32,
    pub height_dots: u32,
    #[serde(default = "one")]
    pub copies: u32,
    /// Darkness adjustment, -30..=30
    #[serde(default)]
    pub darkness: Option<i8>,
    pub fields: Vec<LabelField>,
}

impl LabelData {
    /// Render the label to ZPL.
    pub fn render(&self) -> Result<Vec<u8>, CompileError> {
        if self.width_dots == 0 || self.height_dots == 0 {
            return Err(CompileError::Payload(format!(
                "label size must be positive, got {}x{} dots",
                self.width_dots, self.height_dots
            )));
        }

        let mut zpl = LabelWriter::start();
        zpl.print_width(self.width_dots).label_length(self.height_dots);
        if let Some(level) = self.darkness {
            zpl.darkness(level);
        }

        for (index, field) in self.fields.iter().enumerate() {
            let (x, y) = field.origin();
            if x >= self.width_dots || y >= self.height_dots {
                warn!(index, x, y, "label field starts outside the label");
            }
            match field {
                LabelField::Text {
                    height,
                    width,
                    orientation,
                    block_width,
                    max_lines,
                    justify,
                    data,
                    ..
                } => {
                    let font = FieldFont {
                        height: *height,
                        width: *width,
                        orientation: *orientation,
                    };
                    let block = block_width.map(|width| FieldBlock {
                        width,
                        max_lines: *max_lines,
                        justification: *justify,
                    });
                    zpl.text(x, y, font, block, data);
                }
                LabelField::Barcode {
                    kind,
                    height,
                    readable,
                    magnification,
                    data,
                    ..
                } => {
                    validate_barcode(index, *kind, data)?;
                    match kind {
                        LabelBarcode::Code128 => zpl.code128(x, y, *height, *readable, data),
                        LabelBarcode::Code39 => zpl.code39(x, y, *height, *readable, data),
                        LabelBarcode::Ean13 => zpl.ean13(x, y, *height, *readable, data),
                        LabelBarcode::Qr => zpl.qr(x, y, *magnification, data),
                    };
                }
                LabelField::Rect {
                    width,
                    height,
                    thickness,
                    ..
                } => {
                    zpl.graphic_box(x, y, *width, *height, *thickness);
                }
            }
        }

        zpl.quantity(self.copies);
        let bytes = zpl.finish();
        debug!(fields = self.fields.len(), bytes = bytes.len(), "rendered label");
        Ok(bytes)
    }
}

fn validate_barcode(index: usize, kind: LabelBarcode, data: &str) -> Result<(), CompileError> {
    let ok = match kind {
        LabelBarcode::Ean13 => {
            (12..=13).contains(&data.len()) && data.bytes().all(|b| b.is_ascii_digit())
        }
        LabelBarcode::Code39 => data
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase() || b" $%+-./".contains(&b)),
        LabelBarcode::Code128 | LabelBarcode::Qr => true,
    };
    if data.is_empty() || !ok {
        return Err(CompileError::Payload(format!(
            "field {}: '{}' is not valid {:?} data",
            index, data, kind
        )));
    }
    Ok(())
}
