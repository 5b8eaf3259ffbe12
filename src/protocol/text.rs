//! # ESC/POS Text Styling Commands
//!
//! Text formatting commands for ESC/POS receipt printers.
//!
//! | Style | Command | Effect |
//! |-------|---------|--------|
//! | Alignment | ESC a n | left / center / right |
//! | Print mode | ESC ! n | character size (also clears font, bold, underline) |
//! | Underline | ESC - n | off / 1 dot / 2 dots |
//! | Bold | ESC E n | emphasized |
//! | Font | ESC M n | font A (12×24) / font B (9×17) |
//! | Color | ESC r n | black / red (two-color printers) |
//!
//! ## Command Interaction
//!
//! `ESC !` rewrites the whole print-mode byte, which resets the font, bold
//! and underline state on real hardware. Style commands are therefore always
//! sent size first; see [`crate::style::StyleStack::to_device_commands`].

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | ASCII   | ESC a n  |
/// | Hex     | 1B 61 n  |
///
/// Takes effect at the start of the next line.
///
/// ```
/// use tillprint::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// CHARACTER SIZE (PRINT MODE)
// ============================================================================

/// Character size presets reachable through `ESC !`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSize {
    #[default]
    Normal,
    DoubleHeight,
    DoubleWidth,
    /// Double width and double height
    Double,
}

impl CharSize {
    /// Whether each character occupies two columns.
    pub fn is_double_width(self) -> bool {
        matches!(self, CharSize::DoubleWidth | CharSize::Double)
    }

    fn mode_bits(self) -> u8 {
        match self {
            CharSize::Normal => 0x00,
            CharSize::DoubleHeight => 0x10,
            CharSize::DoubleWidth => 0x20,
            CharSize::Double => 0x30,
        }
    }
}

/// # Select Print Mode (ESC ! n)
///
/// Bit 4 doubles the height, bit 5 doubles the width. All other mode bits
/// (font, emphasis, underline) are written as zero.
///
/// ```
/// use tillprint::protocol::text::{size, CharSize};
///
/// assert_eq!(size(CharSize::Double), vec![0x1B, 0x21, 0x30]);
/// ```
pub fn size(s: CharSize) -> Vec<u8> {
    vec![ESC, b'!', s.mode_bits()]
}

// ============================================================================
// UNDERLINE
// ============================================================================

/// Underline thickness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Underline {
    #[default]
    Off = 0,
    /// 1 dot thick
    On = 1,
    /// 2 dots thick
    Double = 2,
}

/// # Turn Underline Mode On/Off (ESC - n)
pub fn underline(mode: Underline) -> Vec<u8> {
    vec![ESC, b'-', mode as u8]
}

// ============================================================================
// EMPHASIS (BOLD)
// ============================================================================

/// # Turn Emphasized Mode On/Off (ESC E n)
///
/// ```
/// use tillprint::protocol::text::bold;
///
/// assert_eq!(bold(true), vec![0x1B, 0x45, 0x01]);
/// assert_eq!(bold(false), vec![0x1B, 0x45, 0x00]);
/// ```
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(enabled)]
}

// ============================================================================
// FONT SELECTION
// ============================================================================

/// Available fonts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Font {
    /// Font A: 12×24 dots, 48 columns on 80mm paper
    #[default]
    A = 0,
    /// Font B: 9×17 dots, 64 columns on 80mm paper
    B = 1,
}

/// # Select Character Font (ESC M n)
pub fn font(f: Font) -> Vec<u8> {
    vec![ESC, b'M', f as u8]
}

// ============================================================================
// COLOR
// ============================================================================

/// Print color on two-color printers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Black = 0,
    Red = 1,
}

/// # Select Print Color (ESC r n)
pub fn color(c: Color) -> Vec<u8> {
    vec![ESC, b'r', c as u8]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_size() {
        assert_eq!(size(CharSize::Normal), vec![0x1B, 0x21, 0x00]);
        assert_eq!(size(CharSize::DoubleHeight), vec![0x1B, 0x21, 0x10]);
        assert_eq!(size(CharSize::DoubleWidth), vec![0x1B, 0x21, 0x20]);
        assert_eq!(size(CharSize::Double), vec![0x1B, 0x21, 0x30]);
    }

    #[test]
    fn test_double_width_detection() {
        assert!(CharSize::Double.is_double_width());
        assert!(CharSize::DoubleWidth.is_double_width());
        assert!(!CharSize::DoubleHeight.is_double_width());
        assert!(!CharSize::Normal.is_double_width());
    }

    #[test]
    fn test_underline() {
        assert_eq!(underline(Underline::Off), vec![0x1B, 0x2D, 0x00]);
        assert_eq!(underline(Underline::On), vec![0x1B, 0x2D, 0x01]);
        assert_eq!(underline(Underline::Double), vec![0x1B, 0x2D, 0x02]);
    }

    #[test]
    fn test_font_and_color() {
        assert_eq!(font(Font::A), vec![0x1B, 0x4D, 0x00]);
        assert_eq!(font(Font::B), vec![0x1B, 0x4D, 0x01]);
        assert_eq!(color(Color::Black), vec![0x1B, 0x72, 0x00]);
        assert_eq!(color(Color::Red), vec![0x1B, 0x72, 0x01]);
    }
}
