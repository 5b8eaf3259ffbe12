//! # Printer Transport Layer
//!
//! Raw byte channels to printers, addressed by USB vendor/product id.
//!
//! ## Available Transports
//!
//! - [`usb`]: USB printers by vendor/product id, bulk OUT transfers
//! - [`memory`]: In-memory device for tests and dry runs
//!
//! A [`Transport`] opens one [`Session`] per job. Sessions are wrapped in a
//! [`SessionGuard`] so they are closed on every exit path.
//!
//! ```
//! use tillprint::transport::{memory::MemoryTransport, DeviceId, SessionGuard, Transport};
//!
//! let transport = MemoryTransport::connected();
//! let mut session = SessionGuard::new(transport.open(DeviceId::new(0x04b8, 0x0e15))?);
//! session.write_all(b"\x1b@hello\n")?;
//! drop(session);
//! assert_eq!(transport.written(), vec![b"\x1b@hello\n".to_vec()]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod memory;
pub mod usb;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{PrintError, TransportError};

pub use memory::MemoryTransport;
pub use usb::UsbTransport;

/// USB vendor/product pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Parses `VVVV:PPPP` in hex, as printed by `lsusb`.
impl FromStr for DeviceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor, product) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid device id '{}', expected VVVV:PPPP", s))?;
        let hex = |part: &str| {
            u16::from_str_radix(part.trim(), 16)
                .map_err(|_| format!("Invalid hex id '{}' in '{}'", part, s))
        };
        Ok(Self::new(hex(vendor)?, hex(product)?))
    }
}

/// Opens sessions to devices.
pub trait Transport: Send + Sync {
    /// Open the device. A missing device is [`TransportError::NotFound`].
    fn open(&self, id: DeviceId) -> Result<Box<dyn Session>, TransportError>;
}

/// One open channel to a device.
pub trait Session: Send {
    /// Write bytes, returning how many the device accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Release the device. Called exactly once by [`SessionGuard`].
    fn close(&mut self);

    /// Short description for status messages, e.g. the device node.
    fn describe(&self) -> String;
}

/// Closes the wrapped session when dropped.
pub struct SessionGuard {
    session: Box<dyn Session>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self { session }
    }

    /// Write a whole job. A short write is reported as
    /// [`PrintError::PartialWrite`] and never retried.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), PrintError> {
        if data.is_empty() {
            return Ok(());
        }
        let written = self.session.write(data)?;
        if written != data.len() {
            warn!(written, expected = data.len(), "short write");
            return Err(PrintError::PartialWrite {
                written,
                expected: data.len(),
            });
        }
        debug!(bytes = written, device = %self.session.describe(), "wrote job");
        Ok(())
    }
}

impl Deref for SessionGuard {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
    }
}
