//! # Error Types
//!
//! This module defines the error taxonomy used throughout tillprint.
//!
//! | Error | Origin | Driver policy |
//! |-------|--------|---------------|
//! | [`TransportError::NotFound`] | device missing | requeue, keep probing |
//! | [`TransportError::Io`] | bus/device fault | requeue unchanged |
//! | [`CompileError`] | bad document | error stub + cut, never retried |
//! | [`PrintError::PartialWrite`] | short write | dropped, status message |
//! | [`RenderError::Unsupported`] | wrong protocol | dropped, status message |
//!
//! None of these ever escape the driver loop; they end up as status messages.

use thiserror::Error;

use crate::service::JobKind;

/// Failures reported by a [`Transport`](crate::transport::Transport) capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No device with the requested vendor/product id is attached.
    #[error("Device {vendor_id:04x}:{product_id:04x} not found")]
    NotFound { vendor_id: u16, product_id: u16 },

    /// The device exists but the bus or the device faulted.
    #[error("Device I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

/// A document could not be compiled into device commands.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The markup is not well formed.
    #[error("Malformed markup at byte {offset}: {message}")]
    Markup { offset: usize, message: String },

    /// The markup uses an element outside the supported vocabulary.
    #[error("Unsupported element <{0}>")]
    UnsupportedElement(String),

    /// An element is missing data it needs or carries unusable data.
    #[error("Invalid <{element}>: {message}")]
    InvalidElement {
        element: &'static str,
        message: String,
    },

    /// An embedded image could not be decoded or converted.
    #[error("Image error: {0}")]
    Image(String),

    /// A structured payload (receipt or label) is inconsistent.
    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// A failed compilation together with the bytes that must still reach the
/// device: everything emitted before the fault, a visible error block and a
/// paper cut.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct CompileFailure {
    pub error: CompileError,
    pub stub: Vec<u8>,
}

/// Why a job could not be turned into bytes.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The device protocol has no rendering for this job kind.
    #[error("{kind:?} jobs are not supported by {protocol} printers")]
    Unsupported {
        kind: JobKind,
        protocol: &'static str,
    },

    /// The document or payload failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileFailure),
}

/// Outcome of sending a rendered job to an open device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    /// The device accepted fewer bytes than were sent.
    #[error("A part of the ticket was not printed ({written} of {expected} bytes written)")]
    PartialWrite { written: usize, expected: usize },

    /// The transport faulted mid-write.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Main error type for the binary and service setup.
#[derive(Debug, Error)]
pub enum TillprintError {
    /// Invalid configuration or command-line input
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown device name
    #[error("No printer named '{0}' is configured")]
    UnknownDevice(String),

    /// Payload could not be parsed
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Compilation failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Transport failure outside the driver loop
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Jobs were still queued when the wait ended
    #[error("Printer did not finish within {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
