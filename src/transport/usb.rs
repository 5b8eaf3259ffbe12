//! # USB Printer Transport
//!
//! Talks to printers directly over USB through `nusb`: the device is found
//! by vendor/product id, its printer interface is claimed (detaching the
//! kernel `usblp` driver on Linux) and jobs go out as bulk OUT transfers.
//!
//! ```text
//! list_devices ─► 04b8:0e15 ─► open ─► interface 0 (class 7) ─► bulk OUT 0x01
//! ```
//!
//! ## Chunked Writes
//!
//! Large jobs (raster logos) are sent in chunks with a small delay in
//! between so slow printers can drain their input buffer. A chunk the
//! device only partly accepts ends the write; the caller sees the short
//! count.
//!
//! ## Permissions
//!
//! On Linux the user needs write access to the device node, usually
//! through a udev rule:
//!
//! ```text
//! SUBSYSTEM=="usb", ATTR{idVendor}=="04b8", MODE="0660", GROUP="lp"
//! ```

use std::io;
use std::thread;
use std::time::Duration;

use futures_lite::future::block_on;
use nusb::transfer::{Direction, EndpointType};
use nusb::{DeviceInfo, Interface};
use tracing::{debug, info, trace, warn};

use super::{DeviceId, Session, Transport};
use crate::error::TransportError;

/// USB class code for printers
pub const PRINTER_CLASS: u8 = 7;

/// Vendors whose receipt printers often report a vendor specific class
pub const KNOWN_VENDORS: [u16; 2] = [0x04b8, 0x0519];

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// A USB device that looks like a printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub id: DeviceId,
    pub bus: u8,
    pub address: u8,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    /// Device or one of its interfaces reports the printer class
    pub printer_class: bool,
}

impl UsbDevice {
    fn from_info(info: &DeviceInfo) -> Self {
        Self {
            id: DeviceId::new(info.vendor_id(), info.product_id()),
            bus: info.bus_number(),
            address: info.device_address(),
            manufacturer: info.manufacturer_string().map(str::to_string),
            product: info.product_string().map(str::to_string),
            printer_class: has_printer_class(info.class(), info.interfaces().map(|i| i.class())),
        }
    }

    /// Whether the device is worth offering as a printer.
    pub fn is_candidate(&self) -> bool {
        self.printer_class || KNOWN_VENDORS.contains(&self.id.vendor_id)
    }

    /// Bus location, e.g. `001:004`.
    pub fn location(&self) -> String {
        format!("{:03}:{:03}", self.bus, self.address)
    }

    pub fn describe(&self) -> String {
        let name = match (&self.manufacturer, &self.product) {
            (Some(m), Some(p)) => format!("{} {}", m, p),
            (None, Some(p)) => p.clone(),
            (Some(m), None) => m.clone(),
            (None, None) => "Unknown device".to_string(),
        };
        format!("{} ({})", name, self.id)
    }
}

fn has_printer_class(device_class: u8, interface_classes: impl IntoIterator<Item = u8>) -> bool {
    device_class == PRINTER_CLASS || interface_classes.into_iter().any(|c| c == PRINTER_CLASS)
}

/// List attached printers.
///
/// A device qualifies when the device or any interface has class 7, or the
/// vendor is Epson or Star.
pub fn discover() -> Vec<UsbDevice> {
    let devices = match nusb::list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "could not enumerate USB devices");
            return Vec::new();
        }
    };
    let mut found: Vec<UsbDevice> = devices
        .map(|info| UsbDevice::from_info(&info))
        .filter(UsbDevice::is_candidate)
        .collect();
    found.sort_by_key(|d| (d.bus, d.address));
    trace!(count = found.len(), "discovered USB printers");
    found
}

/// A bulk OUT endpoint on the first alternate setting of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OutEndpoint {
    interface: u8,
    class: u8,
    address: u8,
}

/// Prefer an endpoint on a printer-class interface, else the first one.
fn pick_endpoint(candidates: &[OutEndpoint]) -> Option<OutEndpoint> {
    candidates
        .iter()
        .find(|e| e.class == PRINTER_CLASS)
        .or_else(|| candidates.first())
        .copied()
}

/// # USB Printer Transport
///
/// ```no_run
/// use tillprint::transport::{DeviceId, SessionGuard, Transport, UsbTransport};
/// use tillprint::protocol::commands;
///
/// let usb = UsbTransport::new();
/// let mut session = SessionGuard::new(usb.open(DeviceId::new(0x04b8, 0x0e15))?);
/// session.write_all(&commands::init())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct UsbTransport {
    chunk_size: usize,
    chunk_delay: Duration,
}

impl Default for UsbTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbTransport {
    pub fn new() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        }
    }

    /// Set the chunk size for large writes. Default is 4096 bytes.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Set the delay between chunks. Default is 2ms.
    pub fn set_chunk_delay(&mut self, delay: Duration) {
        self.chunk_delay = delay;
    }
}

fn io_error(context: &str, e: impl std::fmt::Display) -> TransportError {
    TransportError::Io(format!("{}: {}", context, e))
}

impl Transport for UsbTransport {
    fn open(&self, id: DeviceId) -> Result<Box<dyn Session>, TransportError> {
        let not_found = TransportError::NotFound {
            vendor_id: id.vendor_id,
            product_id: id.product_id,
        };
        let info = nusb::list_devices()
            .map_err(|e| io_error("Failed to enumerate USB devices", e))?
            .find(|info| info.vendor_id() == id.vendor_id && info.product_id() == id.product_id)
            .ok_or_else(|| not_found.clone())?;
        let device = UsbDevice::from_info(&info);

        let handle = match info.open() {
            Ok(handle) => handle,
            // unplugged between enumeration and open
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found),
            Err(e) => return Err(io_error("Failed to open device", e)),
        };
        let config = handle
            .active_configuration()
            .map_err(|e| io_error("Failed to read configuration", e))?;
        let candidates: Vec<OutEndpoint> = config
            .interface_alt_settings()
            .filter(|alt| alt.alternate_setting() == 0)
            .flat_map(|alt| {
                let interface = alt.interface_number();
                let class = alt.class();
                alt.endpoints()
                    .filter(|ep| {
                        ep.direction() == Direction::Out
                            && ep.transfer_type() == EndpointType::Bulk
                    })
                    .map(move |ep| OutEndpoint {
                        interface,
                        class,
                        address: ep.address(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let endpoint = pick_endpoint(&candidates).ok_or_else(|| {
            TransportError::Io(format!("{} has no bulk OUT endpoint", device.describe()))
        })?;

        let interface = handle
            .detach_and_claim_interface(endpoint.interface)
            .map_err(|e| io_error("Failed to claim interface", e))?;
        info!(
            %id,
            location = %device.location(),
            interface = endpoint.interface,
            endpoint = endpoint.address,
            "opened USB printer"
        );

        Ok(Box::new(UsbSession {
            interface: Some(interface),
            endpoint: endpoint.address,
            device,
            chunk_size: self.chunk_size,
            chunk_delay: self.chunk_delay,
        }))
    }
}

struct UsbSession {
    interface: Option<Interface>,
    endpoint: u8,
    device: UsbDevice,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl Session for UsbSession {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let interface = self
            .interface
            .as_ref()
            .ok_or_else(|| TransportError::Io("session already closed".into()))?;

        let mut written = 0;
        for (i, chunk) in data.chunks(self.chunk_size).enumerate() {
            if i > 0 && !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
            // TODO: bulk transfers have no timeout; a printer that stops
            // reading (cover open) blocks here until it is unplugged.
            let completion = block_on(interface.bulk_out(self.endpoint, chunk.to_vec()));
            completion
                .status
                .map_err(|e| io_error("Write failed", e))?;
            let n = completion.data.actual_length();
            written += n;
            if n < chunk.len() {
                break;
            }
        }
        Ok(written)
    }

    fn close(&mut self) {
        // dropping the interface releases the claim
        if self.interface.take().is_some() {
            debug!(device = %self.device.describe(), "closed USB printer");
        }
    }

    fn describe(&self) -> String {
        format!("{} at {}", self.device.describe(), self.device.location())
    }
}

impl Drop for UsbSession {
    fn drop(&mut self) {
        self.close();
    }
}
