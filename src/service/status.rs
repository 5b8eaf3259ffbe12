//! Device status with a de-duplicated message log.
//!
//! Only the driver loop writes; everybody else reads cloned snapshots.
//!
//! - Same state: a message is appended unless it repeats the last one.
//! - New state: the log restarts with the new message.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceState::Connecting => "connecting",
            DeviceState::Connected => "connected",
            DeviceState::Disconnected => "disconnected",
            DeviceState::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    pub state: DeviceState,
    pub messages: Vec<String>,
}

impl DeviceStatus {
    pub fn last_message(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self {
            state: DeviceState::Connecting,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct StatusTracker {
    device: String,
    status: Mutex<DeviceStatus>,
}

impl StatusTracker {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            status: Mutex::new(DeviceStatus::default()),
        }
    }

    /// Record `state` with an optional message (empty means none).
    pub fn set(&self, state: DeviceState, message: &str) {
        let mut status = self.status.lock();
        if status.state == state {
            if message.is_empty() || status.last_message() == Some(message) {
                return;
            }
            status.messages.push(message.to_string());
        } else {
            status.state = state;
            status.messages.clear();
            if !message.is_empty() {
                status.messages.push(message.to_string());
            }
        }
        drop(status);

        match state {
            DeviceState::Connecting | DeviceState::Connected => {
                info!(device = %self.device, %state, detail = message, "printer status")
            }
            DeviceState::Disconnected => {
                warn!(device = %self.device, %state, detail = message, "printer status")
            }
            DeviceState::Error => error!(device = %self.device, %state, detail = message, "printer status"),
        }
    }

    pub fn snapshot(&self) -> DeviceStatus {
        self.status.lock().clone()
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}
