//! Request Validation
//!
//! Requests are checked in two passes. A JSON Schema (draft 7) rejects
//! structurally wrong bodies: missing fields, wrong types, unknown providers.
//! Typed rules then enforce the text and batch length limits, which count
//! Unicode scalar values rather than bytes. Every failure becomes a
//! field-level `FieldError` and the whole request is answered with 422.

use axum::extract::rejection::JsonRejection;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::PredictError;
use crate::models::{BatchPredictionRequest, PredictionRequest};

/// Maximum request body size (1 MiB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;
pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_BATCH_ITEMS: usize = 100;

lazy_static::lazy_static! {
    /// Schema for a single prediction request
    pub static ref PREDICT_REQUEST_SCHEMA: JSONSchema = {
        let schema = json!({
            "type": "object",
            "required": ["text"],
            "properties": {
                "text": { "type": "string" },
                "enhanced": { "type": "boolean" },
                "return_probabilities": { "type": "boolean" },
                "request_id": { "type": ["string", "null"] },
                "llm_provider": { "enum": ["groq", "gemini", "auto", "offline", null] }
            }
        });

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .expect("Invalid schema")
    };

    /// Schema for a batch prediction request
    pub static ref BATCH_REQUEST_SCHEMA: JSONSchema = {
        let schema = json!({
            "type": "object",
            "required": ["texts"],
            "properties": {
                "texts": { "type": "array", "items": { "type": "string" } },
                "enhanced": { "type": "boolean" },
                "return_probabilities": { "type": "boolean" },
                "request_id": { "type": ["string", "null"] },
                "llm_provider": { "enum": ["groq", "gemini", "auto", "offline", null] }
            }
        });

        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .expect("Invalid schema")
    };
}

/// One entry of a 422 `detail` list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Path to the offending value, starting with "body"
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub error_type: String,
}

impl FieldError {
    pub fn new(loc: Vec<Value>, msg: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            error_type: error_type.into(),
        }
    }
}

/// Structural pass for `POST /api/v1/predict`; length rules run in the service
pub fn parse_prediction_request(
    payload: Result<axum::Json<Value>, JsonRejection>,
) -> Result<PredictionRequest, PredictError> {
    parse_with_schema(payload, &PREDICT_REQUEST_SCHEMA)
}

/// Structural pass for `POST /api/v1/predict/batch`
pub fn parse_batch_request(
    payload: Result<axum::Json<Value>, JsonRejection>,
) -> Result<BatchPredictionRequest, PredictError> {
    parse_with_schema(payload, &BATCH_REQUEST_SCHEMA)
}

fn parse_with_schema<T: DeserializeOwned>(
    payload: Result<axum::Json<Value>, JsonRejection>,
    schema: &JSONSchema,
) -> Result<T, PredictError> {
    let axum::Json(value) = payload.map_err(|rejection| {
        PredictError::Validation(vec![FieldError::new(
            vec![json!("body")],
            rejection.body_text(),
            "json_invalid",
        )])
    })?;

    validate_json_schema(schema, &value).map_err(PredictError::Validation)?;

    serde_json::from_value(value).map_err(|e| {
        PredictError::Validation(vec![FieldError::new(vec![json!("body")], e.to_string(), "value_error")])
    })
}

/// Validates `value` against `schema`, collecting every violation
pub fn validate_json_schema(schema: &JSONSchema, value: &Value) -> Result<(), Vec<FieldError>> {
    let result = schema.validate(value);
    if let Err(errors) = result {
        let details: Vec<FieldError> = errors
            .map(|err| {
                let mut loc = vec![json!("body")];
                loc.extend(pointer_segments(&err.instance_path.to_string()));

                let error_type = match &err.kind {
                    ValidationErrorKind::Required { property } => {
                        loc.push(property.clone());
                        "missing"
                    }
                    ValidationErrorKind::Type { .. } => "type_error",
                    ValidationErrorKind::Enum { .. } => "enum",
                    _ => "value_error",
                };
                FieldError::new(loc, err.to_string(), error_type)
            })
            .collect();

        return Err(details);
    }
    Ok(())
}

// "/texts/3" -> ["texts", 3]
fn pointer_segments(pointer: &str) -> Vec<Value> {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.parse::<u64>() {
            Ok(index) => json!(index),
            Err(_) => json!(segment.replace("~1", "/").replace("~0", "~")),
        })
        .collect()
}

/// Length and content rules for a single text
pub fn validate_text(text: &str, loc: Vec<Value>) -> Option<FieldError> {
    let chars = text.chars().count();
    if chars == 0 {
        return Some(FieldError::new(loc, "String should have at least 1 character", "string_too_short"));
    }
    if chars > MAX_TEXT_CHARS {
        return Some(FieldError::new(
            loc,
            format!("String should have at most {} characters", MAX_TEXT_CHARS),
            "string_too_long",
        ));
    }
    if text.trim().is_empty() {
        return Some(FieldError::new(loc, "Text cannot be empty or whitespace only", "value_error"));
    }
    None
}

pub fn validate_prediction_request(request: &PredictionRequest) -> Result<(), Vec<FieldError>> {
    match validate_text(&request.text, vec![json!("body"), json!("text")]) {
        Some(error) => Err(vec![error]),
        None => Ok(()),
    }
}

pub fn validate_batch_request(request: &BatchPredictionRequest) -> Result<(), Vec<FieldError>> {
    let count = request.texts.len();
    let loc = vec![json!("body"), json!("texts")];
    if count == 0 {
        return Err(vec![FieldError::new(
            loc,
            "List should have at least 1 item after validation, not 0",
            "too_short",
        )]);
    }
    if count > MAX_BATCH_ITEMS {
        return Err(vec![FieldError::new(
            loc,
            format!(
                "List should have at most {} items after validation, not {}",
                MAX_BATCH_ITEMS, count
            ),
            "too_long",
        )]);
    }

    let errors: Vec<FieldError> = request
        .texts
        .iter()
        .enumerate()
        .filter_map(|(i, text)| validate_text(text, vec![json!("body"), json!("texts"), json!(i)]))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> PredictionRequest {
        PredictionRequest {
            text: text.to_string(),
            enhanced: false,
            return_probabilities: false,
            request_id: None,
            llm_provider: None,
        }
    }

    fn batch(texts: Vec<String>) -> BatchPredictionRequest {
        BatchPredictionRequest {
            texts,
            enhanced: false,
            return_probabilities: false,
            request_id: None,
            llm_provider: None,
        }
    }

    #[test]
    fn test_text_length_bounds() {
        assert!(validate_prediction_request(&single("a")).is_ok());
        assert!(validate_prediction_request(&single(&"x".repeat(5000))).is_ok());

        let errors = validate_prediction_request(&single(&"x".repeat(5001))).unwrap_err();
        assert_eq!(errors[0].error_type, "string_too_long");
        assert_eq!(errors[0].loc, vec![json!("body"), json!("text")]);

        let errors = validate_prediction_request(&single("")).unwrap_err();
        assert_eq!(errors[0].error_type, "string_too_short");
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 5000 three-byte characters
        assert!(validate_prediction_request(&single(&"好".repeat(5000))).is_ok());
    }

    #[test]
    fn test_whitespace_only_rejected() {
        let errors = validate_prediction_request(&single(" \n\t ")).unwrap_err();
        assert_eq!(errors[0].msg, "Text cannot be empty or whitespace only");
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(validate_batch_request(&batch(vec!["ok".into(); 100])).is_ok());

        let errors = validate_batch_request(&batch(vec![])).unwrap_err();
        assert_eq!(errors[0].error_type, "too_short");

        let errors = validate_batch_request(&batch(vec!["ok".into(); 101])).unwrap_err();
        assert_eq!(errors[0].error_type, "too_long");
    }

    #[test]
    fn test_batch_item_errors_carry_index() {
        let errors =
            validate_batch_request(&batch(vec!["fine".into(), "   ".into(), "".into()])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].loc, vec![json!("body"), json!("texts"), json!(1)]);
        assert_eq!(errors[1].loc, vec![json!("body"), json!("texts"), json!(2)]);
    }

    #[test]
    fn test_schema_reports_missing_and_mistyped_fields() {
        let errors = validate_json_schema(&PREDICT_REQUEST_SCHEMA, &json!({"enhanced": true})).unwrap_err();
        assert_eq!(errors[0].error_type, "missing");
        assert_eq!(errors[0].loc, vec![json!("body"), json!("text")]);

        let errors = validate_json_schema(&BATCH_REQUEST_SCHEMA, &json!({"texts": ["a", 5]})).unwrap_err();
        assert_eq!(errors[0].loc, vec![json!("body"), json!("texts"), json!(1)]);
        assert_eq!(errors[0].error_type, "type_error");
    }

    #[test]
    fn test_schema_rejects_unknown_provider() {
        let errors = validate_json_schema(
            &PREDICT_REQUEST_SCHEMA,
            &json!({"text": "hi", "llm_provider": "openai"}),
        )
        .unwrap_err();
        assert_eq!(errors[0].error_type, "enum");
        assert_eq!(errors[0].loc, vec![json!("body"), json!("llm_provider")]);

        assert!(validate_json_schema(&PREDICT_REQUEST_SCHEMA, &json!({"text": "hi", "llm_provider": null})).is_ok());
    }

    #[test]
    fn test_long_request_ids_are_accepted() {
        let long_id = "r".repeat(200);
        assert!(validate_json_schema(&PREDICT_REQUEST_SCHEMA, &json!({"text": "good", "request_id": long_id})).is_ok());
        assert!(validate_json_schema(
            &BATCH_REQUEST_SCHEMA,
            &json!({"texts": ["good"], "request_id": long_id})
        )
        .is_ok());
    }
}
