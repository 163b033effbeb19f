/// Debug session logging: one structured entry per invocation
use crate::types::{ExecutionReport, Result, RunError};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::SystemTime;

/// File name of the append-only session log, created next to the
/// working directory when `--debug` is set.
pub const SESSION_LOG_NAME: &str = "runbox-session.log";

/// One session log entry: the resolved commands, per-stage exit codes,
/// elapsed time, and captured output of a single invocation.
#[derive(Debug, Serialize)]
pub struct SessionEntry<'a> {
    pub invocation_id: String,
    pub timestamp: SystemTime,
    pub argv: Vec<String>,
    pub report: &'a ExecutionReport,
}

/// Append-only session logger. Only instantiated when `--debug` was
/// requested; failure to open the log is a configuration error, not a
/// silent no-op.
pub struct SessionLogger {
    path: PathBuf,
    invocation_id: String,
}

impl SessionLogger {
    pub fn new(path: Option<PathBuf>) -> Self {
        SessionLogger {
            path: path.unwrap_or_else(|| PathBuf::from(SESSION_LOG_NAME)),
            invocation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one JSON line for this invocation, regardless of its
    /// success or failure.
    pub fn append(&self, report: &ExecutionReport) -> Result<()> {
        let entry = SessionEntry {
            invocation_id: self.invocation_id.clone(),
            timestamp: SystemTime::now(),
            argv: std::env::args().collect(),
            report,
        };
        let line = serde_json::to_string(&entry).map_err(|e| RunError::Config {
            key: self.path.display().to_string(),
            message: format!("failed to serialize session entry: {}", e),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RunError::Config {
                key: self.path.display().to_string(),
                message: format!("failed to open session log: {}", e),
            })?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
