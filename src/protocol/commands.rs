//! # ESC/POS Control Commands
//!
//! Printer control commands shared by every ESC/POS receipt printer:
//! initialization, cutter, paper feed and cash drawer pulses.
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`, `HT`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `ESC p m t1 t2`, `GS V m n`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding:
//! - `u16` value 0x1234 is sent as bytes `[0x34, 0x12]`

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte (0x1B)
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix (0x1D)
///
/// Used for cutter, graphics, barcodes and character size commands.
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print the line buffer and advance one line
pub const LF: u8 = 0x0A;

/// NUL - Terminator for function A barcode data
pub const NUL: u8 = 0x00;

/// Feed applied by the cut-with-feed commands, in vertical motion units.
///
/// Moves the last printed line past the cutter blade.
pub const CUT_FEED: u8 = 96;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets text formatting, alignment and
/// character size to the power-on defaults.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ```
/// use tillprint::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

// ============================================================================
// CUTTER CONTROL
// ============================================================================

/// # Full Cut at Current Position (GS V 0)
///
/// Cuts without feeding; may cut through the last printed line.
#[inline]
pub fn cut_full() -> Vec<u8> {
    vec![GS, b'V', 0]
}

/// # Partial Cut at Current Position (GS V 1)
///
/// Leaves a small hinge connecting the receipt to the roll.
#[inline]
pub fn cut_partial() -> Vec<u8> {
    vec![GS, b'V', 1]
}

/// # Feed, Then Full Cut (GS V 65 n)
///
/// Feeds `n` vertical motion units so the last line clears the blade, then
/// cuts. This is the cut used at the end of every receipt.
///
/// | Format  | Bytes      |
/// |---------|------------|
/// | ASCII   | GS V A n   |
/// | Hex     | 1D 56 41 n |
///
/// ```
/// use tillprint::protocol::commands;
///
/// assert_eq!(commands::cut_full_feed(), vec![0x1D, 0x56, 0x41, 96]);
/// ```
#[inline]
pub fn cut_full_feed() -> Vec<u8> {
    vec![GS, b'V', 65, CUT_FEED]
}

/// # Feed, Then Partial Cut (GS V 66 n)
#[inline]
pub fn cut_partial_feed() -> Vec<u8> {
    vec![GS, b'V', 66, CUT_FEED]
}

// ============================================================================
// PAPER FEED
// ============================================================================

/// # Print and Feed n Lines (ESC d n)
#[inline]
pub fn feed_lines(n: u8) -> Vec<u8> {
    vec![ESC, b'd', n]
}

// ============================================================================
// CASH DRAWER
// ============================================================================

/// Drawer kick-out connector pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerPin {
    /// Connector pin 2 (`m = 0`)
    Pin2 = 0,
    /// Connector pin 5 (`m = 1`)
    Pin5 = 1,
}

/// # Generate Drawer Pulse (ESC p m t1 t2)
///
/// Drives the drawer solenoid on the selected pin. `t1` is the on time and
/// `t2` the off time, both in 2 ms units.
///
/// Drawers are wired to either pin, so callers pulse both
/// (see [`open_drawer`]).
///
/// | Format  | Bytes             |
/// |---------|-------------------|
/// | ASCII   | ESC p m t1 t2     |
/// | Hex     | 1B 70 m 19 FA     |
#[inline]
pub fn drawer_pulse(pin: DrawerPin) -> Vec<u8> {
    vec![ESC, b'p', pin as u8, 25, 250]
}

/// Pulse both drawer pins, pin 2 first.
pub fn open_drawer() -> Vec<u8> {
    let mut out = drawer_pulse(DrawerPin::Pin2);
    out.extend(drawer_pulse(DrawerPin::Pin5));
    out
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ```
/// use tillprint::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(576), [0x40, 0x02]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_cuts() {
        assert_eq!(cut_full(), vec![0x1D, 0x56, 0x00]);
        assert_eq!(cut_partial(), vec![0x1D, 0x56, 0x01]);
        assert_eq!(cut_full_feed(), vec![0x1D, 0x56, 0x41, CUT_FEED]);
        assert_eq!(cut_partial_feed(), vec![0x1D, 0x56, 0x42, CUT_FEED]);
    }

    #[test]
    fn test_feed_lines() {
        assert_eq!(feed_lines(3), vec![0x1B, 0x64, 0x03]);
    }

    #[test]
    fn test_drawer_pulse() {
        assert_eq!(drawer_pulse(DrawerPin::Pin2), vec![0x1B, 0x70, 0, 25, 250]);
        assert_eq!(drawer_pulse(DrawerPin::Pin5), vec![0x1B, 0x70, 1, 25, 250]);
    }

    #[test]
    fn test_open_drawer_pulses_both_pins() {
        let cmd = open_drawer();
        assert_eq!(cmd.len(), 10);
        assert_eq!(&cmd[..5], drawer_pulse(DrawerPin::Pin2).as_slice());
        assert_eq!(&cmd[5..], drawer_pulse(DrawerPin::Pin5).as_slice());
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0x00FF), [0xFF, 0x00]);
        assert_eq!(u16_le(0xFF00), [0x00, 0xFF]);
        assert_eq!(u16_le(576), [0x40, 0x02]);
    }
}
