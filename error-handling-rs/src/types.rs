//! # Standardized Error Types
//!
//! The error record shared by every part of the sentiment service. Request
//! handlers keep their own `thiserror` enums; this type is what ends up in the
//! error log, with an id and correlation id attached.

use std::error::Error as StdError;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A type alias for Result with the error type defaulting to our Error
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, recorded for traceability only
    Info,
    /// Recovered locally, caller unaffected
    Minor,
    /// The request failed
    Major,
    /// The service cannot serve requests
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Minor => write!(f, "MINOR"),
            Severity::Major => write!(f, "MAJOR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Major
    }
}

/// Categorizes the failures the prediction pipeline can run into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad request shape or length
    Validation,
    /// The classifier has not been loaded
    ModelUnavailable,
    /// An enhancement provider failed; carries the provider name
    Enhancement(String),
    /// An operation exceeded its deadline
    Timeout,
    /// Credentials rejected by an external API
    Authentication,
    /// Quota or rate limit exhausted on an external API
    RateLimit,
    /// A payload could not be parsed
    Parsing,
    /// Configuration could not be resolved
    Configuration,
    /// Startup or shutdown step failed
    Initialization,
    /// Input/output error
    IO,
    /// Unexpected failure anywhere in the pipeline
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "Validation Error"),
            ErrorKind::ModelUnavailable => write!(f, "Model Unavailable Error"),
            ErrorKind::Enhancement(provider) => write!(f, "Enhancement Provider Error ({})", provider),
            ErrorKind::Timeout => write!(f, "Timeout Error"),
            ErrorKind::Authentication => write!(f, "Authentication Error"),
            ErrorKind::RateLimit => write!(f, "Rate Limit Error"),
            ErrorKind::Parsing => write!(f, "Parsing Error"),
            ErrorKind::Configuration => write!(f, "Configuration Error"),
            ErrorKind::Initialization => write!(f, "Initialization Error"),
            ErrorKind::IO => write!(f, "I/O Error"),
            ErrorKind::Internal => write!(f, "Internal Server Error"),
        }
    }
}

impl ErrorKind {
    /// Short machine-readable code used in log records
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::ModelUnavailable => "model_unavailable",
            ErrorKind::Enhancement(_) => "enhancement_provider_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Authentication => "authentication_error",
            ErrorKind::RateLimit => "rate_limited",
            ErrorKind::Parsing => "parse_error",
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Initialization => "initialization_error",
            ErrorKind::IO => "io_error",
            ErrorKind::Internal => "internal_error",
        }
    }

    /// Default severity for errors of this kind
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorKind::Validation => Severity::Info,
            ErrorKind::Enhancement(_)
            | ErrorKind::Timeout
            | ErrorKind::Authentication
            | ErrorKind::RateLimit
            | ErrorKind::Parsing => Severity::Minor,
            ErrorKind::IO | ErrorKind::Internal => Severity::Major,
            ErrorKind::ModelUnavailable
            | ErrorKind::Configuration
            | ErrorKind::Initialization => Severity::Critical,
        }
    }
}

/// Structured error record
///
/// `Clone` drops the opaque `cause`, keeping clones serialization-friendly.
#[derive(Debug, Serialize, Deserialize)]
pub struct Error {
    /// A unique identifier for this error instance
    pub id: Uuid,
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// The time when the error occurred
    pub timestamp: DateTime<Utc>,
    /// Error severity level
    pub severity: Severity,
    /// Correlation ID for request tracing
    pub correlation_id: Option<String>,
    /// Additional context as key-value pairs
    #[serde(default)]
    pub context: serde_json::Map<String, serde_json::Value>,
    /// Underlying cause (not serialized)
    #[serde(skip)]
    pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind.clone(),
            message: self.message.clone(),
            timestamp: self.timestamp,
            severity: self.severity,
            correlation_id: self.correlation_id.clone(),
            context: self.context.clone(),
            cause: None,
        }
    }
}

impl Error {
    /// Creates a new error with the specified kind and message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        let severity = kind.default_severity();
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
            severity,
            correlation_id: None,
            context: serde_json::Map::new(),
            cause: None,
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn model_unavailable() -> Self {
        Self::new(ErrorKind::ModelUnavailable, "Model not loaded")
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Sets the error severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attaches the request correlation ID
    pub fn with_correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Adds context information to the error
    pub fn context<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.context.insert(key.into(), value);
        }
        self
    }

    /// Chains this error with its cause
    pub fn cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Copy of this error with sensitive fragments removed from the message
    /// and from string context values
    pub fn sanitize(&self) -> Self {
        crate::sanitization::sanitize_error(self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.kind, self.message)?;

        if let Some(correlation_id) = &self.correlation_id {
            write!(f, " [CorrelationID: {}]", correlation_id)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::IO, err.to_string()).cause(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Parsing, format!("JSON error: {}", err)).cause(err)
    }
}
