//! # ESC/POS Raster Graphics
//!
//! Raster bit image printing (`GS v 0`), used for logos embedded in receipts.
//!
//! ## Bit Packing
//!
//! Graphics data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! ```text
//! Byte value 0xF0 = 11110000 = ████░░░░
//! Byte value 0xAA = 10101010 = █░█░█░█░
//! ```

use super::commands::{GS, u16_le};

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | GS v 0 m xL xH yL yH d1...dk |
/// | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
///
/// ## Parameters
///
/// - `m`: 0 = normal density
/// - `xL, xH`: width in **bytes**, little-endian
/// - `yL, yH`: height in dots, little-endian
/// - `d1...dk`: row-major image data, k = width_bytes × height
///
/// ```
/// use tillprint::protocol::graphics;
///
/// let data = vec![0xAA; 4 * 10];
/// let cmd = graphics::raster(4, 10, &data);
///
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 4, 0, 10, 0]);
/// assert_eq!(cmd.len(), 8 + 40);
/// ```
pub fn raster(width_bytes: u16, height: u16, data: &[u8]) -> Vec<u8> {
    debug_assert!(
        data.len() == width_bytes as usize * height as usize,
        "Raster data length mismatch. Expected {} ({} bytes × {} rows), got {}",
        width_bytes as usize * height as usize,
        width_bytes,
        height,
        data.len()
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend_from_slice(&[GS, b'v', b'0', 0, xl, xh, yl, yh]);
    cmd.extend_from_slice(data);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_header_little_endian() {
        let data = vec![0u8; 72 * 300];
        let cmd = raster(72, 300, &data);
        // 300 = 0x012C
        assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 72, 0, 0x2C, 0x01]);
        assert_eq!(cmd.len(), 8 + data.len());
    }

    #[test]
    fn test_raster_data_follows_header() {
        let data = vec![0xFF, 0x00, 0xAA, 0x55];
        let cmd = raster(2, 2, &data);
        assert_eq!(&cmd[8..], data.as_slice());
    }
}
