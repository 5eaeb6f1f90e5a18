//! Fakes for driving the pipeline without a database or object store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use super::archive::{Archiver, ZipArchiver};
use super::db_dump::Dumper;
use super::s3_upload::{Uploader, object_key, object_locator};
use crate::config::{ConnectionConfig, StorageTarget};
use crate::errors::{ArchiveError, DumpError, UploadError};
use crate::report::OpsLog;

pub fn connection() -> ConnectionConfig {
    ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port: 3306,
        username: "backup".to_string(),
        secret: "hunter2".to_string(),
        database_selector: None,
    }
}

pub fn storage() -> StorageTarget {
    StorageTarget {
        endpoint_url: "https://objects.example.com".to_string(),
        region: "eu-west-1".to_string(),
        access_key_id: "AKIA".to_string(),
        secret_access_key: "s3-secret".to_string(),
        container_name: "nightly".to_string(),
    }
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy)]
pub enum DumpBehavior {
    Succeed,
    ExitWith(i32),
    /// Reports success but deletes the file before returning.
    Vanish,
}

pub struct ScriptedDumper {
    behavior: DumpBehavior,
    calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedDumper {
    pub fn new(behavior: DumpBehavior) -> Self {
        ScriptedDumper {
            behavior,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Each dump waits for one permit on `gate` before writing anything.
    pub fn gated(behavior: DumpBehavior, gate: Arc<Semaphore>) -> Self {
        ScriptedDumper {
            gate: Some(gate),
            ..ScriptedDumper::new(behavior)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dumper for ScriptedDumper {
    async fn dump(
        &self,
        _config: &ConnectionConfig,
        destination_dir: &Path,
        log: &dyn OpsLog,
    ) -> Result<PathBuf, DumpError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let result = (|| -> Result<PathBuf, DumpError> {
            std::fs::create_dir_all(destination_dir).map_err(|source| DumpError::CreateFile {
                path: destination_dir.to_path_buf(),
                source,
            })?;
            let dump_path = destination_dir.join(format!("dump_test_{call}.sql"));
            std::fs::write(&dump_path, "CREATE DATABASE shop;\n").map_err(|source| {
                DumpError::CreateFile {
                    path: dump_path.clone(),
                    source,
                }
            })?;
            log.info("mysqldump: fake output line");
            match self.behavior {
                DumpBehavior::Succeed => Ok(dump_path),
                DumpBehavior::ExitWith(code) => Err(DumpError::Exit {
                    exit_code: Some(code),
                    dump_path,
                }),
                DumpBehavior::Vanish => {
                    let _ = std::fs::remove_file(&dump_path);
                    Ok(dump_path)
                }
            }
        })();

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveBehavior {
    Succeed,
    /// Writes a few bytes, then returns a write error.
    FailAfterPartialWrite,
    /// Writes a few bytes, then panics.
    PanicAfterPartialWrite,
}

/// Real zip archiving with a call counter, or a failure after a partial write.
pub struct CountingArchiver {
    behavior: ArchiveBehavior,
    calls: AtomicUsize,
}

impl CountingArchiver {
    pub fn new(behavior: ArchiveBehavior) -> Self {
        CountingArchiver {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn working() -> Self {
        CountingArchiver::new(ArchiveBehavior::Succeed)
    }

    pub fn failing() -> Self {
        CountingArchiver::new(ArchiveBehavior::FailAfterPartialWrite)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Archiver for CountingArchiver {
    fn archive_path(&self, destination_dir: &Path) -> PathBuf {
        ZipArchiver.archive_path(destination_dir)
    }

    fn archive_into(&self, source_file: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior == ArchiveBehavior::Succeed {
            return ZipArchiver.archive_into(source_file, archive_path);
        }
        if let Err(source) = std::fs::write(archive_path, b"PK") {
            return Err(ArchiveError::Write {
                path: archive_path.to_path_buf(),
                source,
            });
        }
        if self.behavior == ArchiveBehavior::PanicAfterPartialWrite {
            panic!("archiver crashed mid-write");
        }
        Err(ArchiveError::Write {
            path: archive_path.to_path_buf(),
            source: std::io::Error::other("no space left on device"),
        })
    }
}

/// In-memory object store keyed by object name.
pub struct MemoryUploader {
    failure: Option<String>,
    calls: AtomicUsize,
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryUploader {
    pub fn working() -> Self {
        MemoryUploader {
            failure: None,
            calls: AtomicUsize::new(0),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn unreachable(cause: &str) -> Self {
        MemoryUploader {
            failure: Some(cause.to_string()),
            ..MemoryUploader::working()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl Uploader for MemoryUploader {
    async fn upload(&self, local_file: &Path, target: &StorageTarget) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(local_file)
            .map_err(|_| UploadError::NotFound(local_file.to_path_buf()))?;
        let key = object_key(local_file)?;
        if let Some(cause) = &self.failure {
            return Err(UploadError::Transport {
                bucket: target.container_name.clone(),
                key,
                source: cause.clone().into(),
            });
        }
        let locator = object_locator(target, &key)?;
        self.objects.lock().unwrap().insert(key, bytes);
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_uploader_overwrites_same_name() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let file = scratch.path().join("backup_same.zip");
        let uploader = MemoryUploader::working();

        std::fs::write(&file, "v1")?;
        let first = uploader.upload(&file, &storage()).await?;
        std::fs::write(&file, "v2")?;
        let second = uploader.upload(&file, &storage()).await?;

        assert_eq!(first, second);
        assert_eq!(uploader.object_names(), vec!["backup_same.zip".to_string()]);
        assert_eq!(uploader.objects.lock().unwrap()["backup_same.zip"], b"v2".to_vec());
        Ok(())
    }
}
