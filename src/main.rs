//! Database Backup Tool
//!
//! Dumps the configured MySQL server, zips the dump, uploads it to S3-compatible
//! storage and removes the local files.

// dbvault/src/main.rs
mod backup;
mod config;
mod errors;
mod report;
mod utils;

use anyhow::{Context, Result};
use backup::{BackupService, Dispatch, JobStatus};
use config::{AppConfig, SecretOverrides};
use report::{ChannelReporter, TracingLog};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Main entry point for the backup tool
#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(true) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the requested job finished successfully.
async fn run_app() -> Result<bool> {
    dotenv::dotenv().ok();

    let config_path = env::var("DBVAULT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let app_config = AppConfig::load_from_json(&config_path, &SecretOverrides::from_env())
        .context(format!(
            "Failed to load application configuration from {}",
            config_path.display()
        ))?;

    let _log_guard = utils::logging::init_logging(&app_config.log_dir)?;
    tracing::info!(
        work_dir = %app_config.work_dir.display(),
        bucket = %app_config.storage.container_name,
        "dbvault starting"
    );

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };
    let requester = env::var("USER").unwrap_or_else(|_| "console".to_string());

    let (service, worker) = backup::start_backup_service(&app_config, Arc::new(TracingLog));
    let (reporter, mut messages) = ChannelReporter::new();
    let printer = tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            println!("{}", message);
        }
    });

    let succeeded = run_command(&service, &choice, &requester, Arc::new(reporter)).await;

    // Closing the queue lets the worker and the printer wind down.
    drop(service);
    worker.await.context("Backup worker panicked")?;
    printer.await.context("Message printer panicked")?;

    succeeded
}

async fn run_command(
    service: &BackupService,
    choice: &str,
    requester: &str,
    reporter: Arc<ChannelReporter>,
) -> Result<bool> {
    match service.dispatch(choice, requester, reporter)? {
        Dispatch::Admitted(ticket) => {
            let job = ticket.wait().await?;
            let elapsed = chrono::Local::now() - job.requested_at;
            tracing::info!(
                job = %job.id,
                requester = %job.requester,
                status = ?job.status(),
                failed_step = ?job.failed_step(),
                locator = job.remote_locator().unwrap_or("-"),
                elapsed_secs = elapsed.num_seconds(),
                "backup job finished"
            );
            Ok(job.status() == JobStatus::CleanedUp)
        }
        Dispatch::NotRecognized => {
            println!("❌ Unknown command '{}'. Enter '1' or 'backup'.", choice);
            anyhow::bail!("Invalid operation choice");
        }
    }
}

/// Prompts the user for the command to run
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Take Backup (or type 'backup')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
