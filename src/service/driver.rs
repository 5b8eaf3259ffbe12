//! # Driver Loop
//!
//! One worker per device. Each iteration takes one job and walks it through
//! the device lifecycle:
//!
//! ```text
//! dequeue ─► open ─┬─ NotFound ─► Disconnected; probe/self-test dropped, rest requeued
//!                  ├─ Io ───────► Error; requeued
//!                  └─ session ──► Connected ─► stale? drop
//!                                             └─ render ─► write ─┬─ ok
//!                                                                 ├─ Io ─► requeue
//!                                                                 └─ short ─► drop
//! close session ─► enqueue Probe ─► sleep poll interval
//! ```
//!
//! The synthetic probe keeps the status fresh while no one prints, and the
//! fixed sleep is the only back-off. A wait that times out with nothing to
//! do also enqueues a probe; the wait itself stands in for the sleep. The
//! queue holds at most one probe, so a device that stays missing does not
//! pile probes up ahead of the jobs it is holding.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::job::{JobKind, JobRequest, PrintJob};
use super::queue::JobQueue;
use super::status::{DeviceState, StatusTracker};
use crate::error::{PrintError, RenderError, TransportError};
use crate::printer::{PrinterConfig, Protocol, RenderStrategy};
use crate::protocol::commands;
use crate::transport::{DeviceId, SessionGuard, Transport};

/// Default delay between iterations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Printed after a short write so the half ticket is visibly void.
fn partial_write_notice() -> Vec<u8> {
    let mut out = b"ERROR PRINTER\n\n\n\n\n\n".to_vec();
    out.extend(commands::cut_full());
    out
}

/// Everything one worker thread owns.
pub(crate) struct Driver {
    pub(crate) config: PrinterConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) strategy: Box<dyn RenderStrategy>,
    pub(crate) queue: Arc<JobQueue>,
    pub(crate) status: Arc<StatusTracker>,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) poll_interval: Duration,
}

impl Driver {
    fn device_id(&self) -> DeviceId {
        self.config.device_id()
    }

    /// Run until shut down.
    pub(crate) fn run(self) {
        info!(device = %self.config.name, id = %self.device_id(), "driver loop started");
        while !self.shutdown.load(Ordering::Acquire) {
            let Some(job) = self.queue.dequeue_timeout(self.poll_interval) else {
                self.queue.enqueue(JobRequest::Probe);
                continue;
            };
            self.handle(job, Utc::now());
            self.queue.enqueue(JobRequest::Probe);
            thread::sleep(self.poll_interval);
        }
        info!(device = %self.config.name, "driver loop stopped");
    }

    /// One iteration. The session, if any, is closed before the job is
    /// marked finished.
    pub(crate) fn handle(&self, job: PrintJob, now: DateTime<Utc>) {
        let kind = job.kind();
        let mut session = match self.transport.open(self.device_id()) {
            Ok(session) => SessionGuard::new(session),
            Err(TransportError::NotFound { .. }) => {
                self.status
                    .set(DeviceState::Disconnected, "Printer Not Found");
                if kind.dropped_when_missing() {
                    self.queue.finish(&job);
                } else {
                    debug!(id = %job.id, %kind, "device missing, requeueing");
                    self.queue.requeue(job);
                }
                return;
            }
            Err(err @ TransportError::Io(_)) => {
                self.status.set(DeviceState::Error, &err.to_string());
                self.retry(job);
                return;
            }
        };

        self.status.set(
            DeviceState::Connected,
            &format!("Connected to {}", self.config.name),
        );

        if kind == JobKind::Probe {
            return;
        }
        if job.is_stale(now) {
            warn!(
                id = %job.id,
                %kind,
                age_secs = job.age(now).as_secs(),
                "dropping stale job"
            );
            drop(session);
            self.queue.finish(&job);
            return;
        }

        let bytes = match self.strategy.render(&job.request) {
            Ok(bytes) => bytes,
            Err(RenderError::Compile(failure)) => {
                error!(id = %job.id, %kind, error = %failure.error, "compile failed");
                if let Err(e) = session.write_all(&failure.stub) {
                    warn!(id = %job.id, error = %e, "could not print error stub");
                }
                drop(session);
                self.status.set(DeviceState::Error, &failure.error.to_string());
                self.queue.finish(&job);
                return;
            }
            Err(err @ RenderError::Unsupported { .. }) => {
                drop(session);
                self.status.set(DeviceState::Error, &err.to_string());
                self.queue.finish(&job);
                return;
            }
        };

        let written = session.write_all(&bytes);
        if matches!(written, Err(PrintError::PartialWrite { .. }))
            && self.config.protocol == Protocol::EscPos
        {
            if let Err(e) = session.write(&partial_write_notice()) {
                warn!(id = %job.id, error = %e, "could not print partial write notice");
            }
        }
        // Closed before the job is finished so waiters see the whole output.
        drop(session);

        match written {
            Ok(()) => {
                info!(id = %job.id, %kind, bytes = bytes.len(), "printed");
                self.queue.finish(&job);
            }
            Err(err @ PrintError::PartialWrite { .. }) => {
                self.status.set(DeviceState::Error, &err.to_string());
                self.queue.finish(&job);
            }
            Err(PrintError::Transport(err)) => {
                self.status.set(DeviceState::Error, &err.to_string());
                self.retry(job);
            }
        }
    }

    /// Requeue after an I/O fault. Probes are not retried; the loop
    /// enqueues a fresh one every iteration.
    fn retry(&self, job: PrintJob) {
        if job.kind() == JobKind::Probe {
            return;
        }
        debug!(id = %job.id, kind = %job.kind(), "I/O fault, requeueing");
        self.queue.requeue(job);
    }
}
