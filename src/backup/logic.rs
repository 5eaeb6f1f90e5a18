// dbvault/src/backup/logic.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::archive::{Archiver, ZipArchiver};
use super::cleanup::cleanup;
use super::db_dump::{Dumper, MysqlDumper};
use super::job::{BackupJob, JobStep};
use super::s3_upload::{S3Uploader, Uploader};
use crate::config::{ConnectionConfig, StorageTarget};
use crate::errors::ArchiveError;
use crate::report::{JobLog, OpsLog, Reporter};

/// The only failure text the requester ever sees; causes go to the durable log.
pub const FAILURE_NOTICE: &str = "An error occurred during the backup process.";

/// The three fallible steps of a job.
pub struct PipelineSteps {
    pub dumper: Arc<dyn Dumper>,
    pub archiver: Arc<dyn Archiver>,
    pub uploader: Arc<dyn Uploader>,
}

impl PipelineSteps {
    /// `mysqldump` (or the configured wrapper), zip archiving and S3 uploads.
    pub fn production(dump_command: Option<Vec<String>>) -> Self {
        PipelineSteps {
            dumper: Arc::new(MysqlDumper::new(dump_command)),
            archiver: Arc::new(ZipArchiver),
            uploader: Arc::new(S3Uploader),
        }
    }
}

/// Runs one job through dump, archive, upload and cleanup.
pub struct Orchestrator {
    steps: PipelineSteps,
    log: Arc<dyn OpsLog>,
    connection: Arc<ConnectionConfig>,
    storage: Arc<StorageTarget>,
    work_dir: PathBuf,
}

impl Orchestrator {
    pub fn new(
        steps: PipelineSteps,
        connection: Arc<ConnectionConfig>,
        storage: Arc<StorageTarget>,
        work_dir: PathBuf,
        log: Arc<dyn OpsLog>,
    ) -> Self {
        Orchestrator {
            steps,
            log,
            connection,
            storage,
            work_dir,
        }
    }

    pub fn log(&self) -> Arc<dyn OpsLog> {
        Arc::clone(&self.log)
    }

    /// Drives `job` to a terminal state. Every local artifact the job produced,
    /// including partial output from a failed step, is removed before returning.
    pub async fn run(&self, mut job: BackupJob, reporter: &dyn Reporter) -> BackupJob {
        let log = JobLog::new(self.log.as_ref(), job.id.to_string());

        // Started -> Dumped
        let dump_path = match self.steps.dumper.dump(&self.connection, &self.work_dir, &log).await {
            Ok(path) => path,
            Err(e) => {
                let leftover = e.partial_output().map(Path::to_path_buf);
                return self.fail(job, JobStep::Dump, &e, leftover, reporter, &log);
            }
        };
        job.mark_dumped(dump_path.clone());
        announce(
            reporter,
            &log,
            &format!("Databases dumped to: {}", dump_path.display()),
        );

        // Dumped -> Archived
        let archive_path = match self.archive(&dump_path).await {
            Ok(path) => path,
            Err(e) => {
                let leftover = e.partial_output().map(Path::to_path_buf);
                return self.fail(job, JobStep::Archive, &e, leftover, reporter, &log);
            }
        };
        job.mark_archived(archive_path.clone());
        announce(
            reporter,
            &log,
            &format!("Dump compressed to: {}", archive_path.display()),
        );

        // Archived -> Uploaded
        let locator = match self.steps.uploader.upload(&archive_path, &self.storage).await {
            Ok(locator) => locator,
            Err(e) => return self.fail(job, JobStep::Upload, &e, None, reporter, &log),
        };
        job.mark_uploaded(locator.clone());
        reporter.send_message("Backup uploaded to object storage.");
        log.info(&format!(
            "Uploaded {} to bucket {}: {}",
            archive_path.display(),
            self.storage.container_name,
            locator
        ));

        // Uploaded -> CleanedUp
        remove_artifacts(&job.artifacts(), &log);
        job.mark_cleaned_up();
        announce(
            reporter,
            &log,
            &format!("Backup completed successfully: {}", locator),
        );
        job
    }

    async fn archive(&self, dump_path: &Path) -> Result<PathBuf, ArchiveError> {
        let archiver = Arc::clone(&self.steps.archiver);
        let source = dump_path.to_path_buf();
        // Named up front so a panicking task still leaves a path to clean up.
        let archive_path = archiver.archive_path(&self.work_dir);
        let destination = archive_path.clone();
        match tokio::task::spawn_blocking(move || archiver.archive_into(&source, &destination)).await {
            Ok(result) => result.map(|()| archive_path),
            Err(e) => Err(ArchiveError::Aborted {
                archive: archive_path,
                reason: e.to_string(),
            }),
        }
    }

    fn fail(
        &self,
        mut job: BackupJob,
        step: JobStep,
        error: &dyn std::error::Error,
        leftover: Option<PathBuf>,
        reporter: &dyn Reporter,
        log: &dyn OpsLog,
    ) -> BackupJob {
        job.mark_failed(step);
        log.severe(&format!("Backup failed during {} step: {}", step, error));
        reporter.send_message(FAILURE_NOTICE);

        let mut artifacts = job.artifacts();
        artifacts.extend(leftover);
        remove_artifacts(&artifacts, log);
        job
    }
}

fn announce(reporter: &dyn Reporter, log: &dyn OpsLog, message: &str) {
    reporter.send_message(message);
    log.info(message);
}

fn remove_artifacts(paths: &[PathBuf], log: &dyn OpsLog) {
    if paths.is_empty() {
        return;
    }
    let removed = cleanup(paths, log);
    let listing = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    log.info(&format!(
        "Local files removed ({} of {}): {}",
        removed,
        paths.len(),
        listing
    ));
}
