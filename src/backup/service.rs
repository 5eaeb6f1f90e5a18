// dbvault/src/backup/service.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::job::BackupJob;
use super::logic::Orchestrator;
use crate::report::{OpsLog, Reporter};

/// Command names that admit a backup job.
pub const BACKUP_COMMANDS: &[&str] = &["backup", "1"];

pub const ACKNOWLEDGEMENT: &str = "Backup process started...";

struct JobRequest {
    job: BackupJob,
    reporter: Arc<dyn Reporter>,
    done: oneshot::Sender<BackupJob>,
}

pub enum Dispatch {
    Admitted(JobTicket),
    NotRecognized,
}

/// Handle for an admitted job.
pub struct JobTicket {
    pub job_id: Uuid,
    rx: oneshot::Receiver<BackupJob>,
}

impl JobTicket {
    /// Waits for the job to reach a terminal state.
    pub async fn wait(self) -> Result<BackupJob> {
        self.rx
            .await
            .with_context(|| format!("Backup worker stopped before job {} finished", self.job_id))
    }
}

/// Accepts backup commands and hands them to a single background worker.
///
/// Jobs admitted while another is running wait in the queue and run one at a
/// time, in admission order.
pub struct BackupService {
    tx: mpsc::UnboundedSender<JobRequest>,
    log: Arc<dyn OpsLog>,
}

impl BackupService {
    /// Spawns the worker. It exits once every `BackupService` handle is dropped
    /// and the queue has drained.
    pub fn start(orchestrator: Orchestrator) -> (Self, JoinHandle<()>) {
        let log = orchestrator.log();
        let (tx, mut rx) = mpsc::unbounded_channel::<JobRequest>();

        let worker = tokio::spawn(async move {
            while let Some(request) = rx.recv().await {
                let job = orchestrator.run(request.job, request.reporter.as_ref()).await;
                // The requester may have stopped waiting; the job is already finished.
                let _ = request.done.send(job);
            }
        });

        (BackupService { tx, log }, worker)
    }

    /// Entry point for the command surface: only the backup command is recognized.
    pub fn dispatch(
        &self,
        command: &str,
        requester: &str,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Dispatch> {
        let command = command.trim().to_ascii_lowercase();
        if !BACKUP_COMMANDS.contains(&command.as_str()) {
            return Ok(Dispatch::NotRecognized);
        }
        self.trigger(requester, reporter).map(Dispatch::Admitted)
    }

    /// Admits a job and returns without waiting for any of its steps.
    pub fn trigger(&self, requester: &str, reporter: Arc<dyn Reporter>) -> Result<JobTicket> {
        if self.tx.is_closed() {
            anyhow::bail!("Backup worker is not running");
        }

        let job = BackupJob::new(requester);
        let job_id = job.id;
        let (done, rx) = oneshot::channel();

        reporter.send_message(ACKNOWLEDGEMENT);
        self.log.info(&format!(
            "[job {}] Backup process started by: {}",
            job_id, requester
        ));

        self.tx
            .send(JobRequest {
                job,
                reporter,
                done,
            })
            .map_err(|_| anyhow::anyhow!("Backup worker is not running"))?;

        Ok(JobTicket { job_id, rx })
    }
}
