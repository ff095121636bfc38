// sentiment-service-rs/src/api.rs
// HTTP surface of the sentiment service
//
// Routes:
//   GET  /                        service descriptor
//   GET  /health                  liveness and model state
//   GET  /metrics                 request counters and model info
//   GET  /metrics/prometheus      Prometheus text exposition
//   POST /metrics/reset           zero the counters
//   POST /api/v1/predict          single prediction
//   POST /api/v1/predict/batch    batch prediction

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use error_handling_rs::{generate_correlation_id, Error, Severity};

use crate::audit::AuditLog;
use crate::error::{PredictError, BATCH_OPERATION, PREDICTION_OPERATION, REQUEST_OPERATION};
use crate::models::{BatchPredictionResponse, HealthResponse, MetricsResponse, PredictionResponse};
use crate::orchestrator::PredictionService;
use crate::validation::{parse_batch_request, parse_prediction_request, MAX_PAYLOAD_SIZE};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    /// Present when the Prometheus recorder was installed
    pub prometheus: Option<PrometheusHandle>,
    pub service_name: String,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            service,
            prometheus,
            service_name: "sentiment-service".to_string(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let audit = state.service.audit().clone();
    let on_panic = |operation: &'static str| {
        CatchPanicLayer::custom(PanicResponder {
            operation,
            audit: audit.clone(),
        })
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/prometheus", get(prometheus_handler))
        .route("/metrics/reset", post(reset_metrics_handler))
        .route(
            "/api/v1/predict",
            post(predict_handler).layer(on_panic(PREDICTION_OPERATION)),
        )
        .route(
            "/api/v1/predict/batch",
            post(batch_predict_handler).layer(on_panic(BATCH_OPERATION)),
        )
        .layer(on_panic(REQUEST_OPERATION))
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET / - Root endpoint
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<String> = state
        .service
        .selector()
        .configured_providers()
        .iter()
        .map(|kind| kind.to_string())
        .collect();

    Json(json!({
        "service": state.service_name,
        "version": VERSION,
        "model": state.service.model().name(),
        "llm_providers": providers,
        "endpoints": {
            "health": "GET /health",
            "metrics": "GET /metrics",
            "prometheus": "GET /metrics/prometheus",
            "reset_metrics": "POST /metrics/reset",
            "predict": "POST /api/v1/predict",
            "predict_batch": "POST /api/v1/predict/batch"
        }
    }))
}

/// GET /health - Health check endpoint
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.service.model().is_loaded();
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "unhealthy" },
        model_loaded,
        version: VERSION,
        timestamp: Utc::now(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        metrics: state.service.metrics().snapshot(),
        model_info: state.service.model().info(),
    })
}

async fn reset_metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    state.service.metrics().reset();
    info!("Metrics reset by operator request");
    metrics_handler(State(state)).await
}

async fn prometheus_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Prometheus exporter not enabled" })),
        )
            .into_response(),
    }
}

/// POST /api/v1/predict
async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let request = parse_prediction_request(payload)?;
    state.service.predict(request).await.map(Json)
}

/// POST /api/v1/predict/batch
async fn batch_predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BatchPredictionResponse>, PredictError> {
    let request = parse_batch_request(payload)?;
    state.service.predict_batch(request).await.map(Json)
}

/// Turns a handler panic into the route's 500 body and an `errors.log` entry
#[derive(Clone)]
struct PanicResponder {
    operation: &'static str,
    audit: Arc<AuditLog>,
}

impl ResponseForPanic for PanicResponder {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(&mut self, panic: Box<dyn Any + Send + 'static>) -> Response {
        let message = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic".to_string()
        };

        let err = Error::internal(format!("Handler panicked: {}", message))
            .severity(Severity::Critical)
            .with_correlation_id(generate_correlation_id())
            .context("operation", self.operation);
        self.audit.log_error("panic", &err);

        PredictError::internal(self.operation, &message).into_response()
    }
}
