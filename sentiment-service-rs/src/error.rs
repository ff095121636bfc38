// sentiment-service-rs/src/error.rs
//
// Request-level failures and their HTTP shapes:
//   422 {"detail": [{"loc": [...], "msg": ..., "type": ...}]}
//   503 {"detail": "Model not loaded"}
//   500 {"detail": "<Operation> failed: <message>"}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::validation::FieldError;
use error_handling_rs::client_message;

pub const PREDICTION_OPERATION: &str = "Prediction";
pub const BATCH_OPERATION: &str = "Batch prediction";
pub const REQUEST_OPERATION: &str = "Request";

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("request validation failed ({} error(s))", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("{operation} failed: {message}")]
    Internal { operation: &'static str, message: String },
}

impl PredictError {
    /// Internal failure with a sanitized, single-line message
    pub fn internal(operation: &'static str, message: &str) -> Self {
        PredictError::Internal {
            operation,
            message: client_message(message),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            PredictError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            PredictError::Validation(errors) => json!({ "detail": errors }),
            other => json!({ "detail": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PredictError::Validation(vec![]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(PredictError::ModelUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            PredictError::internal(BATCH_OPERATION, "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_sanitized() {
        let err = PredictError::internal(
            PREDICTION_OPERATION,
            "upstream said: Authorization: Bearer abc.def.ghi\nstack trace here",
        );
        let text = err.to_string();
        assert!(text.starts_with("Prediction failed: "));
        assert!(!text.contains("abc.def.ghi"));
        assert!(!text.contains("stack trace"));
    }

    #[test]
    fn test_model_unavailable_detail() {
        assert_eq!(PredictError::ModelUnavailable.to_string(), "Model not loaded");
    }
}
