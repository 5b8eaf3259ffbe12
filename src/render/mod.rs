//! # Raster Rendering
//!
//! Image support for receipts.
//!
//! - [`dither`]: Bayer 8x8 ordered dithering and bit packing
//! - [`raster`]: `data:` image decoding, padding and the content-hash cache

pub mod dither;
pub mod raster;
