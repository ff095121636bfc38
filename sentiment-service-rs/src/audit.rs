//! Structured audit log
//!
//! Three JSON-lines files under the configured log directory:
//!
//! - `lifecycle.log`: startup, shutdown and model state changes
//! - `predictions.log`: one record per classified text
//! - `errors.log`: sanitized `error_handling_rs::Error` records
//!
//! Each file rotates by size into `<name>.1 … <name>.N`, oldest discarded.
//! Audit writes never fail the caller: I/O errors become `tracing` warnings.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::Prediction;
use config_rs::LogConfig;
use error_handling_rs::{log_structured_error, sanitize_error, truncate_chars, Error};

pub const LIFECYCLE_LOG: &str = "lifecycle.log";
pub const PREDICTIONS_LOG: &str = "predictions.log";
pub const ERRORS_LOG: &str = "errors.log";

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub dir: PathBuf,
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub input_truncate_chars: usize,
}

impl From<&LogConfig> for AuditConfig {
    fn from(config: &LogConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_file_bytes: config.max_file_bytes,
            max_files: config.max_files,
            input_truncate_chars: config.input_truncate_chars,
        }
    }
}

/// One line of `predictions.log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub input_text: String,
    /// Length of the full input in characters
    pub input_length: usize,
    pub prediction: Option<String>,
    pub confidence: Option<f64>,
    pub latency_ms: f64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct LifecycleRecord<'a> {
    timestamp: DateTime<Utc>,
    level: &'static str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct ErrorRecord<'a> {
    timestamp: DateTime<Utc>,
    context: &'a str,
    error: Error,
}

/// Append-only file that rotates once it would grow past `max_bytes`
struct RotatingFile {
    path: PathBuf,
    file: Option<File>,
    written: u64,
    max_bytes: u64,
    max_files: usize,
}

impl RotatingFile {
    fn open(path: PathBuf, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file: Some(file),
            written,
            max_bytes,
            max_files,
        })
    }

    fn generation(&self, n: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }

        if self.file.is_none() {
            self.file = Some(open_append(&self.path)?);
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "audit file closed"))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.written += len;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        let oldest = self.generation(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for n in (1..self.max_files).rev() {
            let from = self.generation(n);
            if from.exists() {
                fs::rename(&from, self.generation(n + 1))?;
            }
        }
        if self.path.exists() {
            fs::rename(&self.path, self.generation(1))?;
        }

        self.file = Some(open_append(&self.path)?);
        self.written = 0;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub struct AuditLog {
    dir: PathBuf,
    lifecycle: Mutex<RotatingFile>,
    predictions: Mutex<RotatingFile>,
    errors: Mutex<RotatingFile>,
    input_truncate_chars: usize,
}

impl AuditLog {
    /// Creates the directory and opens (or continues) all three sinks
    pub fn open(config: &AuditConfig) -> io::Result<Self> {
        fs::create_dir_all(&config.dir)?;
        let sink = |name: &str| {
            RotatingFile::open(config.dir.join(name), config.max_file_bytes, config.max_files)
                .map(Mutex::new)
        };

        Ok(Self {
            dir: config.dir.clone(),
            lifecycle: sink(LIFECYCLE_LOG)?,
            predictions: sink(PREDICTIONS_LOG)?,
            errors: sink(ERRORS_LOG)?,
            input_truncate_chars: config.input_truncate_chars,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_lifecycle(&self, message: &str) {
        info!(target: "lifecycle", "{}", message);
        let record = LifecycleRecord {
            timestamp: Utc::now(),
            level: "INFO",
            message,
        };
        self.append(&self.lifecycle, &record);
    }

    /// Records the outcome of one classification; `prediction` is `None` on failure
    pub fn log_prediction(
        &self,
        request_id: &str,
        text: &str,
        prediction: Option<&Prediction>,
        latency_ms: f64,
        error: Option<&str>,
    ) {
        let record = PredictionRecord {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            input_text: truncate_chars(text, self.input_truncate_chars),
            input_length: text.chars().count(),
            prediction: prediction.map(|p| p.sentiment.to_string()),
            confidence: prediction.map(|p| p.confidence),
            latency_ms,
            success: error.is_none() && prediction.is_some(),
            error: error.map(str::to_string),
        };
        self.append(&self.predictions, &record);
    }

    /// Writes a sanitized copy of `error` and mirrors it to `tracing`
    pub fn log_error(&self, context: &str, error: &Error) {
        let sanitized = sanitize_error(error);
        log_structured_error(&sanitized);
        let record = ErrorRecord {
            timestamp: Utc::now(),
            context,
            error: sanitized,
        };
        self.append(&self.errors, &record);
    }

    pub fn flush(&self) {
        for sink in [&self.lifecycle, &self.predictions, &self.errors] {
            let mut file = lock(sink);
            if let Err(e) = file.flush() {
                warn!(sink = %file.path.display(), error = %e, "Failed to flush audit log");
            }
        }
    }

    fn append<T: Serialize>(&self, sink: &Mutex<RotatingFile>, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize audit record");
                return;
            }
        };

        let mut file = lock(sink);
        if let Err(e) = file.write_line(&line) {
            warn!(sink = %file.path.display(), error = %e, "Failed to write audit record");
        }
    }
}

fn lock(sink: &Mutex<RotatingFile>) -> MutexGuard<'_, RotatingFile> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
