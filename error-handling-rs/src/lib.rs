//! # Error Handling Framework
//!
//! Shared error handling for the sentiment service workspace:
//!
//! - A structured error record with kind, severity and correlation ID
//! - `tracing` subscriber setup with an optional rolling JSON log file
//! - Sanitization of messages before they leave the process
//! - Ordered fallback chains with per-attempt deadlines

pub mod fallback;
pub mod logging;
pub mod sanitization;
pub mod types;

// Re-export commonly used types
pub use fallback::{first_success, FallbackResult};
pub use logging::{generate_correlation_id, init_logging, log_structured_error, request_span, LoggingConfig};
pub use sanitization::{client_message, sanitize_error, sanitize_message, truncate_chars};
pub use types::{Error, ErrorKind, Result, Severity};
