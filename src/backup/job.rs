// dbvault/src/backup/job.rs
use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Progress of a single job. Variants are declared in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobStatus {
    Started,
    Dumped,
    Archived,
    Uploaded,
    CleanedUp,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::CleanedUp | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    Dump,
    Archive,
    Upload,
}

impl fmt::Display for JobStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStep::Dump => "dump",
            JobStep::Archive => "archive",
            JobStep::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// One end-to-end execution of dump, archive, upload and cleanup.
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub id: Uuid,
    pub requested_at: DateTime<Local>,
    pub requester: String,
    dump_path: Option<PathBuf>,
    archive_path: Option<PathBuf>,
    remote_locator: Option<String>,
    status: JobStatus,
    failed_step: Option<JobStep>,
}

impl BackupJob {
    pub fn new(requester: impl Into<String>) -> Self {
        BackupJob {
            id: Uuid::new_v4(),
            requested_at: Local::now(),
            requester: requester.into(),
            dump_path: None,
            archive_path: None,
            remote_locator: None,
            status: JobStatus::Started,
            failed_step: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn failed_step(&self) -> Option<JobStep> {
        self.failed_step
    }

    pub fn remote_locator(&self) -> Option<&str> {
        self.remote_locator.as_deref()
    }

    /// Local artifacts recorded so far, in creation order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.dump_path
            .iter()
            .chain(self.archive_path.iter())
            .cloned()
            .collect()
    }

    pub(crate) fn mark_dumped(&mut self, path: PathBuf) {
        debug_assert!(self.dump_path.is_none());
        self.dump_path = Some(path);
        self.advance(JobStatus::Dumped);
    }

    pub(crate) fn mark_archived(&mut self, path: PathBuf) {
        debug_assert!(self.archive_path.is_none());
        self.archive_path = Some(path);
        self.advance(JobStatus::Archived);
    }

    pub(crate) fn mark_uploaded(&mut self, locator: String) {
        debug_assert!(self.remote_locator.is_none());
        self.remote_locator = Some(locator);
        self.advance(JobStatus::Uploaded);
    }

    pub(crate) fn mark_cleaned_up(&mut self) {
        self.advance(JobStatus::CleanedUp);
    }

    pub(crate) fn mark_failed(&mut self, step: JobStep) {
        debug_assert!(!self.status.is_terminal(), "job {} already finished", self.id);
        self.failed_step = Some(step);
        self.status = JobStatus::Failed;
    }

    fn advance(&mut self, next: JobStatus) {
        debug_assert!(
            !self.status.is_terminal() && next > self.status,
            "invalid transition {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }
}
