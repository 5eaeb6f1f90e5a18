mod logic; // Orchestration of the dump -> archive -> upload -> cleanup sequence
mod service; // Command surface and background worker
pub(crate) mod archive; // Zip archive creation
pub(crate) mod cleanup; // Best-effort removal of local artifacts
pub(crate) mod db_dump; // mysqldump invocation
pub(crate) mod job; // Per-invocation job state
pub(crate) mod s3_upload; // S3 interactions

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::report::OpsLog;

pub use job::JobStatus;
pub use logic::{Orchestrator, PipelineSteps};
pub use service::{BackupService, Dispatch};

/// Builds the backup service from the loaded configuration and starts its worker.
pub fn start_backup_service(
    app_config: &AppConfig,
    log: Arc<dyn OpsLog>,
) -> (BackupService, tokio::task::JoinHandle<()>) {
    let orchestrator = Orchestrator::new(
        PipelineSteps::production(app_config.dump_command.clone()),
        Arc::new(app_config.connection.clone()),
        Arc::new(app_config.storage.clone()),
        app_config.work_dir.clone(),
        log,
    );

    BackupService::start(orchestrator)
}
