// dbvault/src/backup/cleanup.rs
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::errors::CleanupError;
use crate::report::OpsLog;

/// Removes each path independently. Missing paths are fine; other failures are
/// logged and otherwise ignored. Returns how many files were actually deleted.
pub fn cleanup(paths: &[PathBuf], log: &dyn OpsLog) -> usize {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                let err = CleanupError {
                    path: path.clone(),
                    source,
                };
                log.severe(&err.to_string());
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::testing::MemoryLog;
    use std::fs;

    #[test]
    fn removes_existing_and_skips_missing() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        let present = scratch.path().join("dump.sql");
        fs::write(&present, "data")?;
        let missing = scratch.path().join("backup.zip");
        let log = MemoryLog::default();

        let removed = cleanup(&[missing, present.clone()], &log);

        assert_eq!(removed, 1);
        assert!(!present.exists());
        assert!(log.entries().is_empty());
        Ok(())
    }

    #[test]
    fn failure_on_one_path_does_not_stop_the_next() -> anyhow::Result<()> {
        let scratch = tempfile::tempdir()?;
        // A directory cannot be removed with remove_file.
        let stubborn = scratch.path().join("not-a-file");
        fs::create_dir(&stubborn)?;
        let later = scratch.path().join("backup.zip");
        fs::write(&later, "zip")?;
        let log = MemoryLog::default();

        let removed = cleanup(&[stubborn.clone(), later.clone()], &log);

        assert_eq!(removed, 1);
        assert!(!later.exists());
        assert!(stubborn.exists());
        assert_eq!(log.severe_entries().len(), 1);
        assert!(log.severe_entries()[0].contains("not-a-file"));
        Ok(())
    }
}
