//! # Printer Configuration
//!
//! Hardware profiles for the printers tillprint drives.
//!
//! ## Supported Printers
//!
//! | Model | Protocol | USB id | Columns | Width (dots) |
//! |-------|----------|--------|---------|--------------|
//! | Epson TM-T20 | ESC/POS | 04b8:0e15 | 48 | 576 |
//! | Epson TM-T88V | ESC/POS | 04b8:0202 | 48 | 576 |
//! | Star TSP100 (ESC/POS mode) | ESC/POS | 0519:0003 | 48 | 576 |
//! | Zebra GK420d | ZPL | 0a5f:0080 | - | 832 |
//!
//! ## Usage
//!
//! ```
//! use tillprint::printer::{PrinterConfig, Protocol};
//!
//! let config = PrinterConfig::EPSON_TM_T20;
//! assert_eq!(config.protocol, Protocol::EscPos);
//! println!("{} at {:04x}:{:04x}", config.name, config.vendor_id, config.product_id);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::transport::DeviceId;

/// Command language spoken by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Receipt printers: ESC/POS byte commands
    EscPos,
    /// Label printers: ZPL field language
    Zpl,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::EscPos => "ESC/POS",
            Protocol::Zpl => "ZPL",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "escpos" | "esc/pos" | "receipt" => Ok(Protocol::EscPos),
            "zpl" | "label" => Ok(Protocol::Zpl),
            other => Err(format!("Unknown protocol '{}'. Use 'escpos' or 'zpl'", other)),
        }
    }
}

/// # Printer Configuration
///
/// Static description of one device: how to find it on the bus and what it
/// can print.
///
/// - **width_chars**: columns of font A at normal size (receipt printers)
/// - **width_dots**: printable width; raster images are clamped to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Human readable name, shown on status and the self-test page
    pub name: String,

    pub protocol: Protocol,

    pub vendor_id: u16,

    pub product_id: u16,

    pub width_chars: usize,

    pub width_dots: u32,
}

/// Const form of [`PrinterConfig`] for the built-in table.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub key: &'static str,
    pub name: &'static str,
    pub protocol: Protocol,
    pub vendor_id: u16,
    pub product_id: u16,
    pub width_chars: usize,
    pub width_dots: u32,
}

impl Profile {
    pub fn config(&self) -> PrinterConfig {
        PrinterConfig {
            name: self.name.to_string(),
            protocol: self.protocol,
            vendor_id: self.vendor_id,
            product_id: self.product_id,
            width_chars: self.width_chars,
            width_dots: self.width_dots,
        }
    }
}

impl PrinterConfig {
    /// # Epson TM-T20
    ///
    /// 80mm receipt printer, the reference device.
    ///
    /// ```text
    /// ├── 4mm ──┼────── 72mm printable ──────┼── 4mm ──┤
    /// │ margin  │    576 dots / 48 columns   │ margin  │
    /// ```
    pub const EPSON_TM_T20: Profile = Profile {
        key: "tm-t20",
        name: "Epson TM-T20",
        protocol: Protocol::EscPos,
        vendor_id: 0x04b8,
        product_id: 0x0e15,
        width_chars: 48,
        width_dots: 576,
    };

    pub const EPSON_TM_T88V: Profile = Profile {
        key: "tm-t88v",
        name: "Epson TM-T88V",
        protocol: Protocol::EscPos,
        vendor_id: 0x04b8,
        product_id: 0x0202,
        width_chars: 48,
        width_dots: 576,
    };

    pub const STAR_TSP100: Profile = Profile {
        key: "tsp100",
        name: "Star TSP100",
        protocol: Protocol::EscPos,
        vendor_id: 0x0519,
        product_id: 0x0003,
        width_chars: 48,
        width_dots: 576,
    };

    /// # Zebra GK420d
    ///
    /// 104mm direct thermal label printer at 203 dpi.
    pub const ZEBRA_GK420D: Profile = Profile {
        key: "gk420d",
        name: "Zebra GK420d",
        protocol: Protocol::Zpl,
        vendor_id: 0x0a5f,
        product_id: 0x0080,
        width_chars: 0,
        width_dots: 832,
    };

    /// All built-in profiles.
    pub const BUILT_IN: [Profile; 4] = [
        Self::EPSON_TM_T20,
        Self::EPSON_TM_T88V,
        Self::STAR_TSP100,
        Self::ZEBRA_GK420D,
    ];

    /// A profile for an unlisted device.
    pub fn custom(name: impl Into<String>, protocol: Protocol, id: DeviceId) -> Self {
        let (width_chars, width_dots) = match protocol {
            Protocol::EscPos => (48, 576),
            Protocol::Zpl => (0, 812),
        };
        Self {
            name: name.into(),
            protocol,
            vendor_id: id.vendor_id,
            product_id: id.product_id,
            width_chars,
            width_dots,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        DeviceId::new(self.vendor_id, self.product_id)
    }

    /// Parse a profile string (CLI args).
    ///
    /// Formats:
    /// - a built-in key, e.g. `"tm-t20"` or `"gk420d"`
    /// - `"escpos:VVVV:PPPP"` / `"zpl:VVVV:PPPP"` with hex USB ids
    pub fn parse(s: &str) -> Result<Self, String> {
        let lower = s.to_ascii_lowercase();
        if let Some(profile) = Self::BUILT_IN.iter().find(|p| p.key == lower) {
            return Ok(profile.config());
        }

        let mut parts = lower.splitn(2, ':');
        let (Some(protocol), Some(id)) = (parts.next(), parts.next()) else {
            return Err(format!(
                "Unknown profile '{}'. Use one of [{}] or 'escpos:VVVV:PPPP'",
                s,
                Self::BUILT_IN
                    .iter()
                    .map(|p| p.key)
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        };
        let protocol: Protocol = protocol.parse()?;
        let id: DeviceId = id.parse()?;
        Ok(Self::custom(
            format!("{} printer {}", protocol, id),
            protocol,
            id,
        ))
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::EPSON_TM_T20.config()
    }
}
