//! # ZPL Label Commands
//!
//! Command builders for Zebra Programming Language label printers. Unlike
//! ESC/POS, ZPL is coordinate based: every field is placed with an origin
//! (`^FO x,y`) and closed with `^FS`.
//!
//! ```text
//! ^XA                  start of label
//! ^PW400^LL300         print width / label length (dots)
//! ^FO20,20^A0N,40,40^FH^FDHello^FS
//! ^FO20,80^BY2^BCN,80,Y,N,N^FH^FD12345^FS
//! ^PQ1                 quantity
//! ^XZ                  end of label
//! ```
//!
//! Field data is always sent with `^FH` so that `^`, `~` and `_` can be
//! escaped as `_5E`, `_7E` and `_5F`.

/// Field orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Normal,
    Rotated90,
    Inverted,
    Rotated270,
}

impl Orientation {
    fn code(self) -> char {
        match self {
            Orientation::Normal => 'N',
            Orientation::Rotated90 => 'R',
            Orientation::Inverted => 'I',
            Orientation::Rotated270 => 'B',
        }
    }
}

/// Text justification inside a field block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

impl Justification {
    fn code(self) -> char {
        match self {
            Justification::Left => 'L',
            Justification::Center => 'C',
            Justification::Right => 'R',
            Justification::Justified => 'J',
        }
    }
}

/// Scalable font selection for a text field, sizes in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFont {
    pub height: u32,
    /// 0 scales the width with the height
    pub width: u32,
    pub orientation: Orientation,
}

/// `^FB` field block: wraps text into `max_lines` lines of `width` dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBlock {
    pub width: u32,
    pub max_lines: u32,
    pub justification: Justification,
}

/// Escape field data for use after `^FH` (default `_` hex indicator).
///
/// ```
/// use tillprint::protocol::zpl::escape_field;
///
/// assert_eq!(escape_field("50% ^off_"), "50% _5Eoff_5F");
/// ```
pub fn escape_field(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for ch in data.chars() {
        match ch {
            '^' => out.push_str("_5E"),
            '~' => out.push_str("_7E"),
            '_' => out.push_str("_5F"),
            _ => out.push(ch),
        }
    }
    out
}

/// Incremental ZPL label writer.
#[derive(Debug, Default)]
pub struct LabelWriter {
    buf: String,
}

impl LabelWriter {
    /// Start a label (`^XA`), with `^CI28` selecting UTF-8 field data.
    pub fn start() -> Self {
        Self {
            buf: String::from("^XA^CI28\n"),
        }
    }

    /// `^PW` print width in dots
    pub fn print_width(&mut self, dots: u32) -> &mut Self {
        self.buf.push_str(&format!("^PW{}\n", dots));
        self
    }

    /// `^LL` label length in dots
    pub fn label_length(&mut self, dots: u32) -> &mut Self {
        self.buf.push_str(&format!("^LL{}\n", dots));
        self
    }

    /// `^MD` darkness adjustment (-30..=30)
    pub fn darkness(&mut self, level: i8) -> &mut Self {
        self.buf.push_str(&format!("^MD{}\n", level.clamp(-30, 30)));
        self
    }

    /// Scalable font text field (`^A0`), optionally wrapped in a field
    /// block (`^FB`) for multi-line justified text.
    pub fn text(
        &mut self,
        x: u32,
        y: u32,
        font: FieldFont,
        block: Option<FieldBlock>,
        data: &str,
    ) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^A0{},{},{}",
            x,
            y,
            font.orientation.code(),
            font.height,
            font.width
        ));
        if let Some(block) = block {
            self.buf.push_str(&format!(
                "^FB{},{},0,{}",
                block.width,
                block.max_lines.max(1),
                block.justification.code()
            ));
        }
        self.buf
            .push_str(&format!("^FH^FD{}^FS\n", escape_field(data)));
        self
    }

    /// Code 128 barcode (`^BC`).
    pub fn code128(&mut self, x: u32, y: u32, height: u32, readable: bool, data: &str) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^BY2^BCN,{},{},N,N^FH^FD{}^FS\n",
            x,
            y,
            height,
            yes_no(readable),
            escape_field(data)
        ));
        self
    }

    /// Code 39 barcode (`^B3`).
    pub fn code39(&mut self, x: u32, y: u32, height: u32, readable: bool, data: &str) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^BY2^B3N,N,{},{},N^FH^FD{}^FS\n",
            x,
            y,
            height,
            yes_no(readable),
            escape_field(data)
        ));
        self
    }

    /// EAN-13 barcode (`^BE`).
    pub fn ean13(&mut self, x: u32, y: u32, height: u32, readable: bool, data: &str) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^BY2^BEN,{},{},N^FD{}^FS\n",
            x,
            y,
            height,
            yes_no(readable),
            data
        ));
        self
    }

    /// QR code (`^BQ`, model 2, error correction M).
    pub fn qr(&mut self, x: u32, y: u32, magnification: u8, data: &str) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^BQN,2,{}^FH^FDMA,{}^FS\n",
            x,
            y,
            magnification.clamp(1, 10),
            escape_field(data)
        ));
        self
    }

    /// Graphic box (`^GB`); a zero width or height draws a line.
    pub fn graphic_box(&mut self, x: u32, y: u32, width: u32, height: u32, thickness: u32) -> &mut Self {
        self.buf.push_str(&format!(
            "^FO{},{}^GB{},{},{}^FS\n",
            x,
            y,
            width,
            height,
            thickness.max(1)
        ));
        self
    }

    /// `^PQ` print quantity
    pub fn quantity(&mut self, copies: u32) -> &mut Self {
        self.buf.push_str(&format!("^PQ{}\n", copies.max(1)));
        self
    }

    /// Close the label (`^XZ`) and return the command bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push_str("^XZ\n");
        self.buf.into_bytes()
    }
}

fn yes_no(flag: bool) -> char {
    if flag { 'Y' } else { 'N' }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a^b~c_d"), "a_5Eb_7Ec_5Fd");
    }

    #[test]
    fn test_minimal_label() {
        let bytes = LabelWriter::start().finish();
        assert_eq!(String::from_utf8(bytes).unwrap(), "^XA^CI28\n^XZ\n");
    }

    #[test]
    fn test_fields() {
        let font = FieldFont {
            height: 40,
            width: 40,
            orientation: Orientation::Normal,
        };
        let mut w = LabelWriter::start();
        w.print_width(400)
            .label_length(300)
            .text(20, 20, font, None, "Hello")
            .code128(20, 80, 80, true, "12345")
            .graphic_box(0, 0, 400, 300, 2)
            .quantity(2);
        let zpl = String::from_utf8(w.finish()).unwrap();

        assert!(zpl.starts_with("^XA^CI28\n^PW400\n^LL300\n"));
        assert!(zpl.contains("^FO20,20^A0N,40,40^FH^FDHello^FS\n"));
        assert!(zpl.contains("^FO20,80^BY2^BCN,80,Y,N,N^FH^FD12345^FS\n"));
        assert!(zpl.contains("^FO0,0^GB400,300,2^FS\n"));
        assert!(zpl.ends_with("^PQ2\n^XZ\n"));
    }

    #[test]
    fn test_field_block_text() {
        let font = FieldFont {
            height: 30,
            width: 0,
            orientation: Orientation::Rotated90,
        };
        let block = FieldBlock {
            width: 300,
            max_lines: 2,
            justification: Justification::Center,
        };
        let mut w = LabelWriter::start();
        w.text(10, 10, font, Some(block), "Organic ~ Beans");
        let zpl = String::from_utf8(w.finish()).unwrap();
        assert!(zpl.contains("^FO10,10^A0R,30,0^FB300,2,0,C^FH^FDOrganic _7E Beans^FS\n"));
    }

    #[test]
    fn test_darkness_is_clamped() {
        let mut w = LabelWriter::start();
        w.darkness(100);
        let zpl = String::from_utf8(w.finish()).unwrap();
        assert!(zpl.contains("^MD30\n"));
    }
}
