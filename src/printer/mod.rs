//! # Printer Module
//!
//! Device profiles and the per-protocol rendering behind them.
//!
//! ## Modules
//!
//! - [`config`]: Printer hardware profiles
//! - [`strategy`]: Job rendering per protocol

pub mod config;
pub mod strategy;

pub use config::{PrinterConfig, Profile, Protocol};
pub use strategy::{EscPosStrategy, RenderStrategy, ZplStrategy};
