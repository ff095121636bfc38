//! # Fallback Strategies
//!
//! Ordered candidate chains: each candidate is attempted in turn under a hard
//! deadline and the first success wins. The caller supplies the terminal step
//! that cannot fail.

use std::future::Future;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::types::{Error, ErrorKind, Result};

/// Result of a fallback chain
#[derive(Debug, Clone)]
pub enum FallbackResult<T> {
    /// The first candidate succeeded
    Primary(T),
    /// A later candidate succeeded after the ones before it failed
    Fallback(T),
    /// Every candidate failed, in attempt order
    Failure(Vec<Error>),
}

impl<T> FallbackResult<T> {
    /// Returns the value, or the result of `terminal` when every candidate failed
    pub fn or_else_terminal<F>(self, terminal: F) -> T
    where
        F: FnOnce(Vec<Error>) -> T,
    {
        match self {
            FallbackResult::Primary(value) | FallbackResult::Fallback(value) => value,
            FallbackResult::Failure(errors) => terminal(errors),
        }
    }
}

/// Attempts `candidates` in order, each bounded by `attempt_timeout`.
///
/// A candidate that errors or exceeds the deadline is recorded and the next
/// one is tried. An empty candidate list yields `Failure(vec![])`.
pub async fn first_success<C, T, F, Fut>(
    operation: &str,
    candidates: Vec<C>,
    attempt_timeout: Duration,
    mut attempt: F,
) -> FallbackResult<T>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut errors = Vec::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let started = Instant::now();
        counter!("fallback_attempts_total", 1, "operation" => operation.to_string());

        let outcome = match tokio::time::timeout(attempt_timeout, attempt(candidate)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::new(
                ErrorKind::Timeout,
                format!("{} attempt {} timed out after {}ms", operation, index, attempt_timeout.as_millis()),
            )),
        };
        histogram!("fallback_attempt_duration_seconds", started.elapsed().as_secs_f64());

        match outcome {
            Ok(value) => {
                debug!(operation, attempt = index, "fallback candidate succeeded");
                return if index == 0 {
                    FallbackResult::Primary(value)
                } else {
                    FallbackResult::Fallback(value)
                };
            }
            Err(error) => {
                warn!(
                    operation,
                    attempt = index,
                    error_kind = %error.kind,
                    "fallback candidate failed: {}",
                    error.message
                );
                counter!("fallback_failures_total", 1, "operation" => operation.to_string());
                errors.push(error);
            }
        }
    }

    FallbackResult::Failure(errors)
}
