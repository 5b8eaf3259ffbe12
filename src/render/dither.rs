//! # Bayer 8x8 Ordered Dithering
//!
//! Reduces a grayscale intensity field to 1-bit dots for raster printing.
//! Only logos go through this path, so a fixed threshold matrix is enough:
//! deterministic, no error propagation, and rows can be processed in
//! parallel.
//!
//! For each pixel position (x, y):
//!
//! 1. Look up a threshold from the matrix at (x mod 8, y mod 8)
//! 2. Print black if the pixel's intensity is above it
//!
//! ```
//! use tillprint::render::dither;
//!
//! let row = vec![true, true, false, false, true, false, true, false];
//! assert_eq!(dither::pack_row(&row), vec![0b11001010]);
//! ```

use rayon::prelude::*;

/// Bayer 8x8 dithering matrix, values 0-63.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Dithering threshold for a pixel position, in (0, 1).
///
/// `(matrix_value + 0.5) / 64` keeps full black printing and full white
/// blank at every position.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Whether a dot is printed for `intensity` (0.0 = white, 1.0 = black).
///
/// ```
/// use tillprint::render::dither::should_print;
///
/// assert!(should_print(0, 0, 1.0));
/// assert!(!should_print(0, 0, 0.0));
/// ```
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Pack a row of dots into bytes, MSB = leftmost dot.
///
/// A row that is not a multiple of 8 is padded with white on the right.
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    bytes
}

/// Dither an intensity function into packed raster rows.
///
/// Rows are computed in parallel; the output is row-major with
/// `ceil(width / 8) * height` bytes.
///
/// ```
/// use tillprint::render::dither::generate_raster;
///
/// let data = generate_raster(64, 100, |x, _y| x as f32 / 64.0);
/// assert_eq!(data.len(), 8 * 100);
/// ```
pub fn generate_raster<F>(width: usize, height: usize, intensity_fn: F) -> Vec<u8>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let rows: Vec<Vec<u8>> = (0..height)
        .into_par_iter()
        .map(|y| {
            let row: Vec<bool> = (0..width)
                .map(|x| should_print(x, y, intensity_fn(x, y)))
                .collect();
            pack_row(&row)
        })
        .collect();
    rows.concat()
}
