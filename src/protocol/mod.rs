//! # Printer Command Languages
//!
//! Low-level command builders for the two device families the engine drives.
//!
//! ## Module Structure
//!
//! - [`commands`]: ESC/POS control (init, cut, feed, drawer pulses)
//! - [`text`]: ESC/POS text styling (alignment, size, bold, underline, font, color)
//! - [`graphics`]: ESC/POS raster images
//! - [`barcode`]: ESC/POS 1D barcodes
//! - [`cp437`]: text encoding for the default ESC/POS code page
//! - [`zpl`]: ZPL label fields for Zebra label printers
//!
//! ## Usage Example
//!
//! ```
//! use tillprint::protocol::{commands, text, cp437};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(text::align(text::Alignment::Center));
//! data.extend(text::bold(true));
//! data.extend(cp437::encode("RECEIPT\n"));
//! data.extend(text::bold(false));
//! data.extend(commands::cut_full_feed());
//!
//! assert_eq!(&data[..2], &[0x1B, 0x40]);
//! ```

pub mod barcode;
pub mod commands;
pub mod cp437;
pub mod graphics;
pub mod text;
pub mod zpl;
