//! # In-Memory Transport
//!
//! A device that records what it is sent. Tests plug and unplug it and
//! inject faults through a shared handle.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{DeviceId, Session, Transport};
use crate::error::TransportError;

#[derive(Debug)]
enum WriteFault {
    Io(String),
    Short(usize),
}

#[derive(Debug, Default)]
struct State {
    connected: bool,
    jobs: Vec<Vec<u8>>,
    open_sessions: usize,
    opens: usize,
    open_faults: VecDeque<String>,
    write_faults: VecDeque<WriteFault>,
}

/// Shared handle; clones observe the same device.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    /// A plugged-in device.
    pub fn connected() -> Self {
        let transport = Self::default();
        transport.set_connected(true);
        transport
    }

    /// An unplugged device; every open is `NotFound`.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// The next open fails with an I/O error.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state.lock().open_faults.push_back(message.into());
    }

    /// The next write fails with an I/O error.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.state
            .lock()
            .write_faults
            .push_back(WriteFault::Io(message.into()));
    }

    /// The next write only accepts `accepted` bytes.
    pub fn fail_next_write_with_short(&self, accepted: usize) {
        self.state
            .lock()
            .write_faults
            .push_back(WriteFault::Short(accepted));
    }

    /// Bytes received, one entry per session that wrote anything.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().jobs.clone()
    }

    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().jobs)
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions
    }

    /// Successful opens so far.
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }
}

impl Transport for MemoryTransport {
    fn open(&self, id: DeviceId) -> Result<Box<dyn Session>, TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotFound {
                vendor_id: id.vendor_id,
                product_id: id.product_id,
            });
        }
        if let Some(message) = state.open_faults.pop_front() {
            return Err(TransportError::Io(message));
        }
        state.open_sessions += 1;
        state.opens += 1;
        trace!(%id, "memory session opened");
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            id,
            buffer: Vec::new(),
            closed: false,
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<State>>,
    id: DeviceId,
    buffer: Vec<u8>,
    closed: bool,
}

impl Session for MemorySession {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let fault = {
            let mut state = self.state.lock();
            if !state.connected {
                return Err(TransportError::Io("device unplugged".into()));
            }
            state.write_faults.pop_front()
        };
        match fault {
            Some(WriteFault::Io(message)) => Err(TransportError::Io(message)),
            Some(WriteFault::Short(accepted)) => {
                let accepted = accepted.min(data.len());
                self.buffer.extend_from_slice(&data[..accepted]);
                Ok(accepted)
            }
            None => {
                self.buffer.extend_from_slice(data);
                Ok(data.len())
            }
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.state.lock();
        state.open_sessions -= 1;
        if !self.buffer.is_empty() {
            state.jobs.push(std::mem::take(&mut self.buffer));
        }
    }

    fn describe(&self) -> String {
        format!("memory device {}", self.id)
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.close();
    }
}
