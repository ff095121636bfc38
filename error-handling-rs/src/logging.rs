//! # Structured Logging
//!
//! Installs the process-wide `tracing` subscriber and provides the helpers
//! used to tie log lines to a request's correlation ID.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};
use uuid::Uuid;

use crate::types::{Error, ErrorKind, Result, Severity};

// Flag to track if logging has been initialized
static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// The service name, used for the application log file name
    pub service_name: String,
    /// Whether console output is JSON instead of human-readable text
    pub json_format: bool,
    /// Directory for the daily-rolling JSON application log
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            service_name: "sentiment-service".to_string(),
            json_format: false,
            log_dir: None,
        }
    }
}

/// Initializes the structured logging system.
///
/// Returns the file writer guard when a log directory is configured; the
/// caller must hold it until shutdown so buffered lines are flushed. Calling
/// this more than once is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    if LOGGING_INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(None);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level)));

    let json_console = config.json_format.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
    });
    let text_console = (!config.json_format).then(|| fmt::layer().with_target(true));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(filter)
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            LOGGING_INITIALIZED.store(false, Ordering::SeqCst);
            Error::new(ErrorKind::Initialization, format!("Failed to set global subscriber: {}", e))
        })?;

    tracing::info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Structured logging initialized"
    );

    Ok(guard)
}

/// Generates a new correlation ID
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span carrying the correlation ID; everything logged inside it is tagged
pub fn request_span(correlation_id: &str) -> tracing::Span {
    tracing::info_span!("request", request_id = %correlation_id)
}

/// Logs an error at the level matching its severity
pub fn log_structured_error(error: &Error) {
    let correlation_id = error.correlation_id.as_deref().unwrap_or("unknown");

    match error.severity {
        Severity::Critical | Severity::Major => tracing::error!(
            error_id = %error.id,
            error_kind = %error.kind,
            correlation_id = %correlation_id,
            severity = %error.severity,
            context = ?error.context,
            "{}",
            error.message
        ),
        Severity::Minor => tracing::warn!(
            error_id = %error.id,
            error_kind = %error.kind,
            correlation_id = %correlation_id,
            "{}",
            error.message
        ),
        Severity::Info => tracing::info!(
            error_id = %error.id,
            error_kind = %error.kind,
            correlation_id = %correlation_id,
            "{}",
            error.message
        ),
    }
}
