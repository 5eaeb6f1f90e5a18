// dbvault/src/backup/archive.rs
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::errors::ArchiveError;
use crate::utils::file_timestamp;

const COPY_BUFFER_SIZE: usize = 4096;

pub trait Archiver: Send + Sync {
    /// Where the next archive under `destination_dir` will be written.
    fn archive_path(&self, destination_dir: &Path) -> PathBuf;

    /// Compresses `source_file` into a new single-entry archive at `archive_path`.
    fn archive_into(&self, source_file: &Path, archive_path: &Path) -> Result<(), ArchiveError>;

    /// Compresses `source_file` into a new single-entry archive under `destination_dir`.
    fn archive(&self, source_file: &Path, destination_dir: &Path) -> Result<PathBuf, ArchiveError> {
        let archive_path = self.archive_path(destination_dir);
        self.archive_into(source_file, &archive_path)?;
        Ok(archive_path)
    }
}

/// Writes `backup_<timestamp>.zip` archives with one deflated entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn archive_path(&self, destination_dir: &Path) -> PathBuf {
        destination_dir.join(format!("backup_{}.zip", file_timestamp()))
    }

    fn archive_into(&self, source_file: &Path, archive_path: &Path) -> Result<(), ArchiveError> {
        create_zip_archive(source_file, archive_path)
    }
}

/// Creates a ZIP archive at `archive_dest_path` holding `source_file` under its
/// base name only.
///
/// The source is opened before the archive is created, so a missing source
/// never leaves an empty archive behind.
pub fn create_zip_archive(source_file: &Path, archive_dest_path: &Path) -> Result<(), ArchiveError> {
    let read_err = |source| ArchiveError::Read {
        path: source_file.to_path_buf(),
        archive: None,
        source,
    };
    let write_err = |source| ArchiveError::Write {
        path: archive_dest_path.to_path_buf(),
        source,
    };

    let mut source = File::open(source_file).map_err(read_err)?;
    let source_len = source.metadata().map_err(read_err)?.len();
    let entry_name = source_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            read_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "archive source has no file name",
            ))
        })?;

    let archive_file = File::create(archive_dest_path).map_err(write_err)?;
    let mut zip = ZipWriter::new(BufWriter::new(archive_file));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(source_len >= u64::from(u32::MAX));
    zip.start_file(entry_name, options)
        .map_err(|source| ArchiveError::Encode {
            path: archive_dest_path.to_path_buf(),
            source,
        })?;

    let mut buffer = [0u8; COPY_BUFFER_SIZE];
    loop {
        let len = match source.read(&mut buffer) {
            Ok(0) => break,
            Ok(len) => len,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(ArchiveError::Read {
                    path: source_file.to_path_buf(),
                    archive: Some(archive_dest_path.to_path_buf()),
                    source: e,
                });
            }
        };
        zip.write_all(&buffer[..len]).map_err(write_err)?;
    }

    let mut writer = zip.finish().map_err(|source| ArchiveError::Encode {
        path: archive_dest_path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(write_err)?;

    Ok(())
}
