pub mod logging;

use chrono::Local;
use std::path::PathBuf;
use which::which;

use crate::errors::DumpError;

const DUMP_EXECUTABLE: &str = "mysqldump";

/// Finds the mysqldump executable in the system PATH.
pub fn find_dump_executable() -> Result<PathBuf, DumpError> {
    which(DUMP_EXECUTABLE).map_err(|e| {
        DumpError::ToolNotFound(format!(
            "{} not found in PATH ({}). Install the MySQL client tools or set dump_command in config.json.",
            DUMP_EXECUTABLE, e
        ))
    })
}

/// Timestamp used to qualify artifact file names, e.g. `20261019_142501`.
pub fn file_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
