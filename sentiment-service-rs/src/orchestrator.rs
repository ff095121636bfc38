// sentiment-service-rs/src/orchestrator.rs
//
// Request pipeline: Validate -> Classify -> Enhance -> Record -> Respond.
//
// Validation failures touch neither metrics nor the prediction log. A model
// that is not loaded short-circuits to 503 with only an error-log entry.
// Every completed classification, successful or not, is recorded once in
// the metrics collector and in the prediction log (one line per text).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, Instrument};

use crate::audit::AuditLog;
use crate::classifier::{round_to, ClassifierError, Prediction, Sentiment, SentimentModel};
use crate::enhancer::{EnhancementResult, EnhancementSelector, LanguageInfo};
use crate::error::{PredictError, BATCH_OPERATION, PREDICTION_OPERATION};
use crate::metrics::MetricsCollector;
use crate::models::{BatchPredictionRequest, BatchPredictionResponse, PredictionRequest, PredictionResponse};
use crate::validation::{validate_batch_request, validate_prediction_request};
use error_handling_rs::{generate_correlation_id, request_span, Error};

/// Upper bound on concurrent per-item enhancements in a batch
pub const ENHANCE_CONCURRENCY: usize = 8;

const BATCH_ID_PREFIX: &str = "batch";

pub struct PredictionService {
    model: Arc<dyn SentimentModel>,
    selector: Arc<EnhancementSelector>,
    metrics: Arc<MetricsCollector>,
    audit: Arc<AuditLog>,
}

impl PredictionService {
    pub fn new(
        model: Arc<dyn SentimentModel>,
        selector: Arc<EnhancementSelector>,
        metrics: Arc<MetricsCollector>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            model,
            selector,
            metrics,
            audit,
        }
    }

    pub fn model(&self) -> &Arc<dyn SentimentModel> {
        &self.model
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn selector(&self) -> &Arc<EnhancementSelector> {
        &self.selector
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub async fn predict(&self, request: PredictionRequest) -> Result<PredictionResponse, PredictError> {
        let started = Instant::now();
        let request_id = resolve_request_id(request.request_id.as_deref());
        let span = request_span(&request_id);

        self.predict_inner(request, request_id, started).instrument(span).await
    }

    async fn predict_inner(
        &self,
        request: PredictionRequest,
        request_id: String,
        started: Instant,
    ) -> Result<PredictionResponse, PredictError> {
        validate_prediction_request(&request).map_err(PredictError::Validation)?;

        if !self.model.is_loaded() {
            return Err(self.model_unavailable(&request_id, "predict"));
        }

        let preference = request.llm_provider.unwrap_or_default();
        let language_info: Option<LanguageInfo> = if request.enhanced {
            Some(self.selector.detect_language(&request.text, preference).await)
        } else {
            None
        };
        let classify_text = language_info
            .as_ref()
            .map(|info| info.translated_text.as_str())
            .unwrap_or(request.text.as_str());

        let prediction = match self.model.predict(classify_text) {
            Ok(prediction) => prediction,
            Err(ClassifierError::ModelUnavailable) => {
                return Err(self.model_unavailable(&request_id, "predict"))
            }
            Err(e) => {
                let message = e.to_string();
                let latency = started.elapsed();
                self.metrics.record(false, latency);
                self.audit
                    .log_prediction(&request_id, &request.text, None, to_ms(latency), Some(&message));
                self.audit.log_error(
                    "predict",
                    &Error::internal(message.as_str()).with_correlation_id(request_id.as_str()),
                );
                return Err(PredictError::internal(PREDICTION_OPERATION, &message));
            }
        };
        debug!(sentiment = %prediction.sentiment, confidence = prediction.confidence, "classified");

        let enhanced_analysis: Option<EnhancementResult> = if request.enhanced {
            Some(
                self.selector
                    .enhance(&request.text, prediction.sentiment, prediction.confidence, preference)
                    .await,
            )
        } else {
            None
        };

        let latency = started.elapsed();
        let latency_ms = to_ms(latency);
        self.metrics.record(true, latency);
        self.audit
            .log_prediction(&request_id, &request.text, Some(&prediction), latency_ms, None);
        info!(
            sentiment = %prediction.sentiment,
            latency_ms,
            enhanced = request.enhanced,
            "prediction completed"
        );

        Ok(build_response(
            &prediction,
            request.return_probabilities,
            latency_ms,
            request_id,
            enhanced_analysis,
            language_info,
        ))
    }

    pub async fn predict_batch(
        &self,
        request: BatchPredictionRequest,
    ) -> Result<BatchPredictionResponse, PredictError> {
        let started = Instant::now();
        let request_id = resolve_request_id(request.request_id.as_deref());
        let span = request_span(&request_id);

        self.predict_batch_inner(request, request_id, started).instrument(span).await
    }

    async fn predict_batch_inner(
        &self,
        request: BatchPredictionRequest,
        request_id: String,
        started: Instant,
    ) -> Result<BatchPredictionResponse, PredictError> {
        validate_batch_request(&request).map_err(PredictError::Validation)?;

        if !self.model.is_loaded() {
            return Err(self.model_unavailable(&request_id, "predict_batch"));
        }

        let prefix = request
            .request_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(BATCH_ID_PREFIX);
        let item_id = |index: usize| format!("{}_{}", prefix, index);

        let mut classified: Vec<(Prediction, f64)> = Vec::with_capacity(request.texts.len());
        for (index, text) in request.texts.iter().enumerate() {
            let item_started = Instant::now();
            match self.model.predict(text) {
                Ok(prediction) => {
                    let item_ms = to_ms(item_started.elapsed());
                    self.audit
                        .log_prediction(&item_id(index), text, Some(&prediction), item_ms, None);
                    classified.push((prediction, item_ms));
                }
                Err(ClassifierError::ModelUnavailable) => {
                    return Err(self.model_unavailable(&request_id, "predict_batch"))
                }
                Err(e) => {
                    let message = e.to_string();
                    self.metrics.record(false, started.elapsed());
                    self.audit.log_prediction(
                        &item_id(index),
                        text,
                        None,
                        to_ms(item_started.elapsed()),
                        Some(&message),
                    );
                    self.audit.log_error(
                        "predict_batch",
                        &Error::internal(message.as_str())
                            .with_correlation_id(request_id.as_str())
                            .context("item", index as u64),
                    );
                    return Err(PredictError::internal(BATCH_OPERATION, &message));
                }
            }
        }

        let preference = request.llm_provider.unwrap_or_default();
        let (analyses, batch_insights) = if request.enhanced {
            let labels: Vec<(Sentiment, f64)> = classified
                .iter()
                .map(|(prediction, _)| (prediction.sentiment, prediction.confidence))
                .collect();
            let items: Vec<(String, (Sentiment, f64))> =
                request.texts.iter().cloned().zip(labels.iter().copied()).collect();

            let analyses: Vec<Option<EnhancementResult>> = stream::iter(items)
                .map(|(text, (sentiment, confidence))| async move {
                    Some(self.selector.enhance(&text, sentiment, confidence, preference).await)
                })
                .buffered(ENHANCE_CONCURRENCY)
                .collect()
                .await;

            let insights = self
                .selector
                .batch_insights(&request.texts, &labels, preference)
                .await;
            (analyses, Some(insights))
        } else {
            (vec![None; classified.len()], None)
        };

        let predictions: Vec<PredictionResponse> = classified
            .iter()
            .zip(analyses)
            .enumerate()
            .map(|(index, ((prediction, item_ms), analysis))| {
                build_response(
                    prediction,
                    request.return_probabilities,
                    *item_ms,
                    item_id(index),
                    analysis,
                    None,
                )
            })
            .collect();

        let total = started.elapsed();
        self.metrics.record(true, total);
        info!(
            items = predictions.len(),
            total_latency_ms = to_ms(total),
            enhanced = request.enhanced,
            "batch prediction completed"
        );

        Ok(BatchPredictionResponse {
            predictions,
            total_latency_ms: to_ms(total),
            batch_insights,
            request_id,
        })
    }

    fn model_unavailable(&self, request_id: &str, operation: &str) -> PredictError {
        self.audit
            .log_error(operation, &Error::model_unavailable().with_correlation_id(request_id));
        PredictError::ModelUnavailable
    }
}

fn resolve_request_id(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_correlation_id)
}

fn to_ms(latency: Duration) -> f64 {
    round_to(latency.as_secs_f64() * 1000.0, 2)
}

fn build_response(
    prediction: &Prediction,
    return_probabilities: bool,
    latency_ms: f64,
    request_id: String,
    enhanced_analysis: Option<EnhancementResult>,
    language_info: Option<LanguageInfo>,
) -> PredictionResponse {
    PredictionResponse {
        sentiment: prediction.sentiment,
        confidence: prediction.confidence,
        probabilities: return_probabilities.then_some(prediction.probabilities),
        latency_ms,
        request_id,
        timestamp: Utc::now(),
        enhanced_analysis,
        language_info,
    }
}
