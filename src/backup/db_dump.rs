// dbvault/src/backup/db_dump.rs
use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::config::ConnectionConfig;
use crate::errors::DumpError;
use crate::report::OpsLog;
use crate::utils::{file_timestamp, find_dump_executable};

#[async_trait]
pub trait Dumper: Send + Sync {
    /// Dumps every database visible to `config` into a new file under `destination_dir`.
    async fn dump(
        &self,
        config: &ConnectionConfig,
        destination_dir: &Path,
        log: &dyn OpsLog,
    ) -> Result<PathBuf, DumpError>;
}

/// Runs `mysqldump` (or a configured wrapper command) and writes its output to disk.
///
/// Only stdout lands in the dump file; stderr is streamed to the operational log.
#[derive(Debug, Clone, Default)]
pub struct MysqlDumper {
    command: Option<Vec<String>>,
}

impl MysqlDumper {
    /// `command` is the program followed by any leading arguments; `None` looks
    /// up `mysqldump` on PATH at dump time.
    pub fn new(command: Option<Vec<String>>) -> Self {
        MysqlDumper { command }
    }

    fn resolve_command(&self) -> Result<(String, Vec<String>), DumpError> {
        match self.command.as_deref() {
            Some([program, leading @ ..]) => Ok((program.clone(), leading.to_vec())),
            _ => {
                let path = find_dump_executable()?;
                Ok((path.to_string_lossy().into_owned(), Vec::new()))
            }
        }
    }
}

/// Connection arguments appended after any configured leading arguments.
pub fn dump_args(config: &ConnectionConfig) -> Vec<String> {
    let mut args = vec![
        "-h".to_string(),
        config.host.clone(),
        "-P".to_string(),
        config.port.to_string(),
        "-u".to_string(),
        config.username.clone(),
        format!("--password={}", config.secret),
    ];
    match &config.database_selector {
        Some(db) => {
            args.push("--databases".to_string());
            args.push(db.clone());
        }
        None => args.push("--all-databases".to_string()),
    }
    args
}

#[async_trait]
impl Dumper for MysqlDumper {
    async fn dump(
        &self,
        config: &ConnectionConfig,
        destination_dir: &Path,
        log: &dyn OpsLog,
    ) -> Result<PathBuf, DumpError> {
        let (program, leading_args) = self.resolve_command()?;

        tokio::fs::create_dir_all(destination_dir)
            .await
            .map_err(|source| DumpError::CreateFile {
                path: destination_dir.to_path_buf(),
                source,
            })?;

        let dump_path = destination_dir.join(format!("dump_{}.sql", file_timestamp()));
        let dump_file = File::create(&dump_path).map_err(|source| DumpError::CreateFile {
            path: dump_path.clone(),
            source,
        })?;

        log.info(&format!(
            "Running {} for {}@{}:{} into {}",
            program,
            config.username,
            config.host,
            config.port,
            dump_path.display()
        ));

        let mut child = Command::new(&program)
            .args(&leading_args)
            .args(dump_args(config))
            .stdin(Stdio::null())
            .stdout(Stdio::from(dump_file))
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DumpError::Spawn {
                program: program.clone(),
                dump_path: dump_path.clone(),
                source,
            })?;

        let status = match child.stderr.take() {
            Some(stderr) => supervise(&mut child, stderr, log).await,
            None => child.wait().await,
        }
        .map_err(|source| DumpError::Io {
            dump_path: dump_path.clone(),
            source,
        })?;

        if !status.success() {
            return Err(DumpError::Exit {
                exit_code: status.code(),
                dump_path,
            });
        }

        log.info(&format!("Dump written to {}", dump_path.display()));
        Ok(dump_path)
    }
}

/// Streams `diagnostics` into the log until EOF, then waits for `child`.
///
/// If reading fails, the child is killed and reaped before the error is returned,
/// so nothing keeps writing into a dump file that is about to be removed.
async fn supervise<R>(child: &mut Child, diagnostics: R, log: &dyn OpsLog) -> io::Result<ExitStatus>
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = forward_lines(diagnostics, log).await {
        if let Err(kill_err) = child.kill().await {
            log.severe(&format!("Failed to stop dump tool after read error: {}", kill_err));
        }
        return Err(e);
    }
    child.wait().await
}

async fn forward_lines<R>(diagnostics: R, log: &dyn OpsLog) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(diagnostics);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end();
        if !text.is_empty() {
            log.info(text);
        }
    }
}
