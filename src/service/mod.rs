//! # Printer Service
//!
//! The composition root: one [`Printer`] per configured device, each with
//! its own [`JobQueue`], [`StatusTracker`] and driver thread.
//!
//! Submission is fire-and-forget. The outcome of a job is only visible
//! through [`Printer::status`].
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tillprint::printer::PrinterConfig;
//! use tillprint::service::{JobRequest, PrinterService, ServiceConfig};
//! use tillprint::transport::MemoryTransport;
//!
//! let device = MemoryTransport::connected();
//! let mut service = PrinterService::new(ServiceConfig {
//!     poll_interval: Duration::from_millis(5),
//!     ..ServiceConfig::default()
//! });
//! service.add_printer("till", PrinterConfig::EPSON_TM_T20.config(), Arc::new(device.clone()))?;
//!
//! service.submit("till", JobRequest::CashDrawerOpen)?;
//! assert!(service.wait_idle(Duration::from_secs(5)));
//! assert_eq!(device.written().len(), 1);
//! # Ok::<(), tillprint::error::TillprintError>(())
//! ```

pub mod driver;
pub mod job;
pub mod queue;
pub mod status;

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::TillprintError;
use crate::printer::{PrinterConfig, strategy};
use crate::render::raster::RasterCache;
use crate::transport::Transport;

pub use driver::DEFAULT_POLL_INTERVAL;
pub use job::{JobKind, JobRequest, PrintJob};
pub use queue::JobQueue;
pub use status::{DeviceState, DeviceStatus, StatusTracker};

use driver::Driver;

/// Settings shared by every printer of a service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Sleep between driver iterations
    pub poll_interval: Duration,
    /// Homepage addresses printed on the self-test page
    pub addresses: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            addresses: Vec::new(),
        }
    }
}

enum Worker {
    /// Built but not started; the first submission spawns it.
    Pending(Driver),
    Running(JoinHandle<()>),
    Stopped,
}

/// Handle to one device.
pub struct Printer {
    key: String,
    config: PrinterConfig,
    queue: Arc<JobQueue>,
    status: Arc<StatusTracker>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Worker>,
}

impl Printer {
    pub fn new(
        key: impl Into<String>,
        config: PrinterConfig,
        transport: Arc<dyn Transport>,
        service: &ServiceConfig,
        images: Arc<RasterCache>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new());
        let status = Arc::new(StatusTracker::new(config.name.clone()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let driver = Driver {
            config: config.clone(),
            transport,
            strategy: strategy::for_printer(&config, images, service.addresses.clone()),
            queue: Arc::clone(&queue),
            status: Arc::clone(&status),
            shutdown: Arc::clone(&shutdown),
            poll_interval: service.poll_interval,
        };
        Self {
            key: key.into(),
            config,
            queue,
            status,
            shutdown,
            worker: Mutex::new(Worker::Pending(driver)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Queue a job and make sure the driver is running.
    pub fn submit(&self, request: JobRequest) -> Uuid {
        self.submit_job(PrintJob::new(request))
    }

    /// Queue a job that carries its own submission time, e.g. one relayed
    /// from a till that queued it while offline.
    pub fn submit_job(&self, job: PrintJob) -> Uuid {
        let id = self.queue.push(job);
        self.ensure_started();
        id
    }

    /// Start the driver thread once. Later calls do nothing.
    fn ensure_started(&self) {
        let mut worker = self.worker.lock();
        *worker = match mem::replace(&mut *worker, Worker::Stopped) {
            Worker::Pending(driver) => {
                let spawned = thread::Builder::new()
                    .name(format!("tillprint-{}", self.key))
                    .spawn(move || driver.run());
                match spawned {
                    Ok(handle) => {
                        info!(printer = %self.key, "driver thread started");
                        Worker::Running(handle)
                    }
                    Err(e) => {
                        error!(printer = %self.key, error = %e, "could not start driver thread");
                        self.status
                            .set(DeviceState::Error, "Could not start the printer worker");
                        Worker::Stopped
                    }
                }
            }
            Worker::Stopped => {
                warn!(printer = %self.key, "job submitted to a stopped printer");
                Worker::Stopped
            }
            running => running,
        };
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.snapshot()
    }

    /// User jobs not yet printed or dropped.
    pub fn outstanding(&self) -> usize {
        self.queue.outstanding()
    }

    /// Wait until every submitted job was handled. `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.queue.wait_idle(timeout)
    }

    /// Probe the device and wait for the first status that is not
    /// `Connecting`.
    pub fn refresh_status(&self, timeout: Duration) -> DeviceStatus {
        self.submit(JobRequest::Probe);
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status();
            if status.state != DeviceState::Connecting || Instant::now() >= deadline {
                return status;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Stop the driver after its current iteration and wait for it.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        let worker = mem::replace(&mut *self.worker.lock(), Worker::Stopped);
        if let Worker::Running(handle) = worker {
            if handle.join().is_err() {
                error!(printer = %self.key, "driver thread panicked");
            }
        }
    }
}

impl Drop for Printer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// All configured printers, by key.
pub struct PrinterService {
    config: ServiceConfig,
    images: Arc<RasterCache>,
    printers: BTreeMap<String, Printer>,
}

impl PrinterService {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            images: Arc::new(RasterCache::new()),
            printers: BTreeMap::new(),
        }
    }

    /// Register a device. Keys must be unique.
    pub fn add_printer(
        &mut self,
        key: &str,
        config: PrinterConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<&Printer, TillprintError> {
        if self.printers.contains_key(key) {
            return Err(TillprintError::Config(format!(
                "printer '{}' is configured twice",
                key
            )));
        }
        info!(printer = key, device = %config.name, protocol = %config.protocol, "printer added");
        let printer = Printer::new(
            key,
            config,
            transport,
            &self.config,
            Arc::clone(&self.images),
        );
        Ok(self.printers.entry(key.to_string()).or_insert(printer))
    }

    pub fn printer(&self, key: &str) -> Result<&Printer, TillprintError> {
        self.printers
            .get(key)
            .ok_or_else(|| TillprintError::UnknownDevice(key.to_string()))
    }

    pub fn printers(&self) -> impl Iterator<Item = &Printer> {
        self.printers.values()
    }

    pub fn submit(&self, device: &str, request: JobRequest) -> Result<Uuid, TillprintError> {
        Ok(self.printer(device)?.submit(request))
    }

    pub fn status(&self, device: &str) -> Result<DeviceStatus, TillprintError> {
        Ok(self.printer(device)?.status())
    }

    /// Snapshot of every printer's status.
    pub fn statuses(&self) -> Vec<(String, DeviceStatus)> {
        self.printers
            .iter()
            .map(|(key, printer)| (key.clone(), printer.status()))
            .collect()
    }

    /// Wait for every printer to go idle, sharing one deadline.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.printers.values().all(|printer| {
            printer.wait_idle(deadline.saturating_duration_since(Instant::now()))
        })
    }

    pub fn shutdown(&self) {
        for printer in self.printers.values() {
            printer.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn service() -> PrinterService {
        PrinterService::new(ServiceConfig {
            poll_interval: Duration::from_millis(2),
            addresses: vec!["http://127.0.0.1:8080".into()],
        })
    }

    #[test]
    fn test_lazy_start() {
        let mut service = service();
        let device = MemoryTransport::connected();
        service
            .add_printer("till", PrinterConfig::default(), Arc::new(device.clone()))
            .unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(device.open_count(), 0);
        assert_eq!(service.status("till").unwrap(), DeviceStatus::default());
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut service = service();
        service
            .add_printer("till", PrinterConfig::default(), Arc::new(MemoryTransport::connected()))
            .unwrap();
        assert!(matches!(
            service.add_printer("till", PrinterConfig::default(), Arc::new(MemoryTransport::connected())),
            Err(TillprintError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_device() {
        let service = service();
        assert!(matches!(
            service.submit("nope", JobRequest::StatusPrint),
            Err(TillprintError::UnknownDevice(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_routes_jobs_per_device() {
        let mut service = service();
        let till = MemoryTransport::connected();
        let labels = MemoryTransport::connected();
        service
            .add_printer("till", PrinterConfig::EPSON_TM_T20.config(), Arc::new(till.clone()))
            .unwrap();
        service
            .add_printer("labels", PrinterConfig::ZEBRA_GK420D.config(), Arc::new(labels.clone()))
            .unwrap();

        service.submit("till", JobRequest::StatusPrint).unwrap();
        service.submit("labels", JobRequest::StatusPrint).unwrap();
        assert!(service.wait_idle(Duration::from_secs(5)));

        assert!(till.written()[0].starts_with(&crate::protocol::commands::init()));
        assert!(labels.written()[0].starts_with(b"^XA"));
        let statuses = service.statuses();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|(_, s)| s.state == DeviceState::Connected));
        service.shutdown();
    }

    #[test]
    fn test_refresh_status_reports_missing_device() {
        let mut service = service();
        let printer = service
            .add_printer("till", PrinterConfig::default(), Arc::new(MemoryTransport::disconnected()))
            .unwrap();
        let status = printer.refresh_status(Duration::from_secs(5));
        assert_eq!(status.state, DeviceState::Disconnected);
        assert_eq!(status.messages, vec!["Printer Not Found".to_string()]);
    }

    #[test]
    fn test_submit_after_shutdown_is_ignored() {
        let mut service = service();
        let device = MemoryTransport::connected();
        let printer = service
            .add_printer("till", PrinterConfig::default(), Arc::new(device.clone()))
            .unwrap();
        printer.shutdown();
        printer.submit(JobRequest::CashDrawerOpen);
        assert!(!printer.wait_idle(Duration::from_millis(20)));
        assert_eq!(device.open_count(), 0);
    }
}
