//! Application log file
//!
//! Plain-text lines appended to `<LOG_DIR>/app.log`. Each call writes the
//! message followed by a newline; no level, timestamp or structured fields
//! are added. The file is never rotated.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::error::{AppError, Result};

pub const LOG_FILE_NAME: &str = "app.log";

pub struct FileLogger {
    path: PathBuf,
    writer: Mutex<RollingFileAppender>,
}

impl FileLogger {
    /// Create `dir` if needed and open `dir/app.log` for append
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| AppError::LogDir {
            dir: dir.to_path_buf(),
            source,
        })?;

        let writer = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_NAME)
            .build(dir)?;

        Ok(Self {
            path: dir.join(LOG_FILE_NAME),
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Write failures are reported on the console and the
    /// line is dropped.
    pub fn log_line(&self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        let mut writer = self.writer.lock();
        if let Err(e) = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.flush())
        {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to append to application log, line dropped"
            );
        }
    }
}
