// dbvault/src/errors.rs
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Dump executable not found: {0}")]
    ToolNotFound(String),

    #[error("Failed to prepare dump file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start dump tool {program}: {source}")]
    Spawn {
        program: String,
        dump_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running dump tool: {source}")]
    Io {
        dump_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dump tool failed with exit code {}", display_exit_code(.exit_code))]
    Exit {
        exit_code: Option<i32>,
        dump_path: PathBuf,
    },
}

impl DumpError {
    /// The dump file left behind by the failed run, if one was created.
    pub fn partial_output(&self) -> Option<&Path> {
        match self {
            DumpError::ToolNotFound(_) | DumpError::CreateFile { .. } => None,
            DumpError::Spawn { dump_path, .. }
            | DumpError::Io { dump_path, .. }
            | DumpError::Exit { dump_path, .. } => Some(dump_path),
        }
    }
}

fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to read archive source {path}: {source}")]
    Read {
        path: PathBuf,
        archive: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode archive {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive task for {archive} aborted: {reason}")]
    Aborted { archive: PathBuf, reason: String },
}

impl ArchiveError {
    /// The archive file that was created before the failure, if any.
    pub fn partial_output(&self) -> Option<&Path> {
        match self {
            ArchiveError::Write { path, .. }
            | ArchiveError::Encode { path, .. }
            | ArchiveError::Aborted { archive: path, .. } => Some(path),
            ArchiveError::Read { archive, .. } => archive.as_deref(),
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File to upload does not exist: {0}")]
    NotFound(PathBuf),

    #[error("Invalid storage target: {0}")]
    InvalidTarget(String),

    #[error("Failed to upload {key} to bucket {bucket}: {source}")]
    Transport {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Error, Debug)]
#[error("Failed to remove {path}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
