//! Print jobs and their staleness rules.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::label::LabelData;
use crate::receipt::ReceiptData;

/// Receipts and labels older than this are never printed.
pub const PRINT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// A drawer kick older than this would surprise whoever is at the till.
pub const DRAWER_MAX_AGE: Duration = Duration::from_secs(12);

/// What to do, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Receipt(ReceiptData),
    /// Raw receipt markup
    MarkupReceipt(String),
    Label(LabelData),
    CashDrawerOpen,
    /// Print the self-test page
    StatusPrint,
    /// Internal: open the device once to refresh the status
    Probe,
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Receipt(_) => JobKind::Receipt,
            JobRequest::MarkupReceipt(_) => JobKind::MarkupReceipt,
            JobRequest::Label(_) => JobKind::Label,
            JobRequest::CashDrawerOpen => JobKind::CashDrawerOpen,
            JobRequest::StatusPrint => JobKind::StatusPrint,
            JobRequest::Probe => JobKind::Probe,
        }
    }
}

/// Payload-free discriminant of [`JobRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Receipt,
    MarkupReceipt,
    Label,
    CashDrawerOpen,
    StatusPrint,
    Probe,
}

impl JobKind {
    /// Age after which the job is dropped instead of printed. `None` for
    /// jobs that never go stale.
    pub fn max_age(self) -> Option<Duration> {
        match self {
            JobKind::Receipt | JobKind::MarkupReceipt | JobKind::Label => Some(PRINT_MAX_AGE),
            JobKind::CashDrawerOpen => Some(DRAWER_MAX_AGE),
            JobKind::StatusPrint | JobKind::Probe => None,
        }
    }

    /// Kinds the driver gives up on while the device is missing.
    pub fn dropped_when_missing(self) -> bool {
        matches!(self, JobKind::Probe | JobKind::StatusPrint)
    }

    /// Submitted by a caller, as opposed to the driver's own probes.
    pub fn is_user_job(self) -> bool {
        self != JobKind::Probe
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Receipt => "receipt",
            JobKind::MarkupReceipt => "markup receipt",
            JobKind::Label => "label",
            JobKind::CashDrawerOpen => "cash drawer",
            JobKind::StatusPrint => "status print",
            JobKind::Probe => "probe",
        };
        f.write_str(name)
    }
}

/// A queued job. Requeueing moves the job unchanged, so its age keeps
/// counting from the first submission.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub id: Uuid,
    pub enqueued_at: DateTime<Utc>,
    pub request: JobRequest,
}

impl PrintJob {
    pub fn new(request: JobRequest) -> Self {
        Self::at(Utc::now(), request)
    }

    pub fn at(enqueued_at: DateTime<Utc>, request: JobRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            enqueued_at,
            request,
        }
    }

    pub fn kind(&self) -> JobKind {
        self.request.kind()
    }

    /// Time since submission. Clock steps backwards count as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.enqueued_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.kind()
            .max_age()
            .is_some_and(|max| self.age(now) > max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_receipt_staleness_boundary() {
        let now = Utc::now();
        let job = PrintJob::at(now - TimeDelta::seconds(3600), JobRequest::MarkupReceipt("x".into()));
        assert!(!job.is_stale(now));
        let job = PrintJob::at(now - TimeDelta::seconds(3601), JobRequest::MarkupReceipt("x".into()));
        assert!(job.is_stale(now));
    }

    #[test]
    fn test_drawer_staleness() {
        let now = Utc::now();
        assert!(!PrintJob::at(now - TimeDelta::seconds(12), JobRequest::CashDrawerOpen).is_stale(now));
        assert!(PrintJob::at(now - TimeDelta::seconds(13), JobRequest::CashDrawerOpen).is_stale(now));
    }

    #[test]
    fn test_status_print_never_stale() {
        let now = Utc::now();
        let job = PrintJob::at(now - TimeDelta::days(30), JobRequest::StatusPrint);
        assert!(!job.is_stale(now));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let now = Utc::now();
        let job = PrintJob::at(now + TimeDelta::seconds(30), JobRequest::CashDrawerOpen);
        assert_eq!(job.age(now), Duration::ZERO);
        assert!(!job.is_stale(now));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(JobRequest::Probe.kind(), JobKind::Probe);
        assert!(JobKind::Probe.dropped_when_missing());
        assert!(JobKind::StatusPrint.dropped_when_missing());
        assert!(!JobKind::Receipt.dropped_when_missing());
        assert!(!JobKind::Probe.is_user_job());
        assert_eq!(JobKind::CashDrawerOpen.to_string(), "cash drawer");
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(PrintJob::new(JobRequest::Probe).id, PrintJob::new(JobRequest::Probe).id);
    }
}
