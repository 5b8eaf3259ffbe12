//! FIFO job queue with a single consumer.
//!
//! Producers never block. The consumer blocks in [`JobQueue::dequeue`]
//! until a job exists. Outstanding user jobs are counted so callers can
//! wait for the device to go idle.
//!
//! At most one probe waits in the queue at a time. Further probes are
//! dropped until the waiting one is dequeued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use tracing::trace;
use uuid::Uuid;

use super::job::{JobKind, JobRequest, PrintJob};

#[derive(Debug)]
pub struct JobQueue {
    tx: Sender<PrintJob>,
    rx: Receiver<PrintJob>,
    outstanding: Mutex<usize>,
    idle: Condvar,
    probe_pending: AtomicBool,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
            probe_pending: AtomicBool::new(false),
        }
    }

    /// Stamp `request` with the current time and append it.
    pub fn enqueue(&self, request: JobRequest) -> Uuid {
        self.push(PrintJob::new(request))
    }

    /// Append a job built elsewhere, e.g. with a backdated timestamp.
    pub fn push(&self, job: PrintJob) -> Uuid {
        let id = job.id;
        if job.kind() == JobKind::Probe && self.probe_pending.swap(true, Ordering::AcqRel) {
            trace!(%id, "probe already queued");
            return id;
        }
        if job.kind().is_user_job() {
            *self.outstanding.lock() += 1;
        }
        trace!(%id, kind = %job.kind(), "enqueued");
        self.send(job);
        id
    }

    /// Put a job back at the tail, unchanged.
    pub fn requeue(&self, job: PrintJob) {
        trace!(id = %job.id, kind = %job.kind(), "requeued");
        self.send(job);
    }

    fn send(&self, job: PrintJob) {
        // The queue owns both ends, so the channel cannot be disconnected.
        let _ = self.tx.send(job);
    }

    /// Block until a job exists.
    pub fn dequeue(&self) -> Option<PrintJob> {
        self.rx.recv().ok().map(|job| self.taken(job))
    }

    /// Block up to `timeout` for a job.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<PrintJob> {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => Some(self.taken(job)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn taken(&self, job: PrintJob) -> PrintJob {
        if job.kind() == JobKind::Probe {
            self.probe_pending.store(false, Ordering::Release);
        }
        job
    }

    /// Record that a job reached a terminal outcome (printed, dropped or
    /// failed).
    pub fn finish(&self, job: &PrintJob) {
        if !job.kind().is_user_job() {
            return;
        }
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }

    /// Jobs waiting in the channel, probes included.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// User jobs submitted and not yet finished.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Wait until every user job has finished. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            if self.idle.wait_until(&mut outstanding, deadline).timed_out() {
                return *outstanding == 0;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = JobQueue::new();
        queue.enqueue(JobRequest::MarkupReceipt("a".into()));
        queue.enqueue(JobRequest::CashDrawerOpen);
        queue.enqueue(JobRequest::MarkupReceipt("b".into()));
        let kinds: Vec<_> = (0..3)
            .map(|_| queue.dequeue().unwrap().request)
            .collect();
        assert_eq!(
            kinds,
            vec![
                JobRequest::MarkupReceipt("a".into()),
                JobRequest::CashDrawerOpen,
                JobRequest::MarkupReceipt("b".into()),
            ]
        );
    }

    #[test]
    fn test_requeue_goes_to_tail_unchanged() {
        let queue = JobQueue::new();
        queue.enqueue(JobRequest::StatusPrint);
        queue.enqueue(JobRequest::CashDrawerOpen);
        let first = queue.dequeue().unwrap();
        let snapshot = first.clone();
        queue.requeue(first);
        assert_eq!(queue.dequeue().unwrap().kind(), JobKind::CashDrawerOpen);
        assert_eq!(queue.dequeue().unwrap(), snapshot);
    }

    #[test]
    fn test_no_deduplication() {
        let queue = JobQueue::new();
        queue.enqueue(JobRequest::CashDrawerOpen);
        queue.enqueue(JobRequest::CashDrawerOpen);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.outstanding(), 2);
    }

    #[test]
    fn test_probes_are_not_outstanding() {
        let queue = JobQueue::new();
        queue.enqueue(JobRequest::Probe);
        assert_eq!(queue.outstanding(), 0);
        assert!(queue.wait_idle(Duration::ZERO));
    }

    #[test]
    fn test_probes_are_coalesced() {
        let queue = JobQueue::new();
        queue.enqueue(JobRequest::Probe);
        queue.enqueue(JobRequest::MarkupReceipt("a".into()));
        queue.enqueue(JobRequest::Probe);
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue().unwrap().kind(), JobKind::Probe);
        queue.enqueue(JobRequest::Probe);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue().unwrap().kind(), JobKind::MarkupReceipt);
        assert_eq!(queue.dequeue().unwrap().kind(), JobKind::Probe);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_timeout_on_empty() {
        let queue = JobQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue_timeout(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_wait_idle() {
        let queue = Arc::new(JobQueue::new());
        queue.enqueue(JobRequest::StatusPrint);
        assert!(!queue.wait_idle(Duration::from_millis(10)));

        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let job = queue.dequeue().unwrap();
                queue.finish(&job);
            })
        };
        assert!(queue.wait_idle(Duration::from_secs(5)));
        worker.join().unwrap();
        assert_eq!(queue.outstanding(), 0);
    }
}
