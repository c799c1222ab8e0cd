//! Append-only CSV record of every answered question.
//!
//! Columns: `timestamp,question,response`. Timestamps are local time. Rows are
//! written under a mutex so concurrent front-ends never interleave.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;

const HEADER: [&str; 3] = ["timestamp", "question", "response"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub question: String,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct QaLogger {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl QaLogger {
    /// Create parent directories and, for a new file, the header row.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let fresh = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if fresh {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(HEADER).map_err(csv_error)?;
            writer.flush()?;
            debug!(path = %path.display(), "qa log created");
        }

        Ok(Self { path, lock: Arc::new(Mutex::new(())) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one exchange. Failures are logged and swallowed so a broken
    /// log never costs the user their answer.
    pub fn log_qa(&self, question: &str, response: &str) {
        if let Err(e) = self.append(question, response) {
            warn!(path = %self.path.display(), error = %e, "failed to write qa log");
        }
    }

    fn append(&self, question: &str, response: &str) -> Result<(), AppError> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record([timestamp.as_str(), question, response]).map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }

    /// Every logged row, oldest first. A missing file reads as empty.
    pub fn entries(&self) -> Result<Vec<LogEntry>, AppError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_error)?;
        reader
            .deserialize()
            .collect::<Result<Vec<LogEntry>, _>>()
            .map_err(csv_error)
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::Io(std::io::Error::other(e))
}
