//! # Tillprint - Point of Sale Print Engine
//!
//! Tillprint drives USB receipt printers (ESC/POS) and label printers (ZPL)
//! from a till. It provides:
//!
//! - **Markup compiler**: a small receipt markup with inherited styles,
//!   compiled deterministically to ESC/POS bytes
//! - **Renderers**: structured receipts, labels and a self-test page
//! - **Job service**: one queue and driver thread per device, tolerant of
//!   unplugged printers and stale jobs
//! - **Transport**: USB printers over bulk transfers, plus an in-memory device
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tillprint::{
//!     printer::PrinterConfig,
//!     service::{JobRequest, PrinterService, ServiceConfig},
//!     transport::UsbTransport,
//! };
//!
//! let mut service = PrinterService::new(ServiceConfig::default());
//! service.add_printer("till", PrinterConfig::EPSON_TM_T20.config(), Arc::new(UsbTransport::new()))?;
//!
//! service.submit(
//!     "till",
//!     JobRequest::MarkupReceipt(r#"<receipt><h1>Hello</h1><p>World</p></receipt>"#.into()),
//! )?;
//! service.wait_idle(Duration::from_secs(10));
//! println!("{:?}", service.status("till")?);
//!
//! # Ok::<(), tillprint::TillprintError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`markup`] | Receipt markup parser and compiler |
//! | [`style`] | Inherited style attributes |
//! | [`protocol`] | ESC/POS and ZPL command builders |
//! | [`render`] | Dithering and raster images |
//! | [`receipt`] | Structured receipt data |
//! | [`label`] | Structured label data |
//! | [`selftest`] | Self-test page |
//! | [`printer`] | Printer profiles and render strategies |
//! | [`service`] | Job queue, driver loop, status |
//! | [`transport`] | Communication backends |
//! | [`error`] | Error types |

pub mod error;
pub mod label;
pub mod markup;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod render;
pub mod selftest;
pub mod service;
pub mod style;
pub mod transport;

// Re-exports for convenience
pub use error::TillprintError;
pub use markup::MarkupCompiler;
pub use printer::PrinterConfig;
pub use service::{JobRequest, PrinterService};
