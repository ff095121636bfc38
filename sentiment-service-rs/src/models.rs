// sentiment-service-rs/src/models.rs
//
// Request and response bodies of the HTTP API. Optional response fields are
// serialized as `null` rather than omitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{ModelInfo, Probabilities, Sentiment};
use crate::enhancer::{BatchInsights, EnhancementResult, LanguageInfo, ProviderPreference};
use crate::metrics::MetricsSnapshot;

/// POST /api/v1/predict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
    #[serde(default)]
    pub enhanced: bool,
    #[serde(default)]
    pub return_probabilities: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<ProviderPreference>,
}

/// POST /api/v1/predict/batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub enhanced: bool,
    #[serde(default)]
    pub return_probabilities: bool,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub llm_provider: Option<ProviderPreference>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub probabilities: Option<Probabilities>,
    pub latency_ms: f64,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub enhanced_analysis: Option<EnhancementResult>,
    pub language_info: Option<LanguageInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<PredictionResponse>,
    pub total_latency_ms: f64,
    pub batch_insights: Option<BatchInsights>,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" once the model is loaded, "unhealthy" otherwise
    pub status: &'static str,
    pub model_loaded: bool,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub model_info: ModelInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: PredictionRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(!request.enhanced);
        assert!(!request.return_probabilities);
        assert_eq!(request.request_id, None);
        assert_eq!(request.llm_provider, None);

        let request: BatchPredictionRequest =
            serde_json::from_str(r#"{"texts": ["a"], "llm_provider": "offline"}"#).unwrap();
        assert_eq!(request.llm_provider, Some(ProviderPreference::Offline));
    }

    #[test]
    fn test_response_serializes_nulls() {
        let response = PredictionResponse {
            sentiment: Sentiment::Positive,
            confidence: 0.9,
            probabilities: None,
            latency_ms: 1.5,
            request_id: "r".into(),
            timestamp: Utc::now(),
            enhanced_analysis: None,
            language_info: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["sentiment"], "positive");
        assert!(json["probabilities"].is_null());
        assert!(json["enhanced_analysis"].is_null());
        assert!(json.as_object().unwrap().contains_key("language_info"));
    }
}
