//! sentiment-service-rs/src/lib.rs
//! Sentiment prediction service: a lexicon classifier behind an HTTP API,
//! optional LLM-written explanations with an offline fallback, request
//! metrics and a rotating JSON audit log.

pub mod api;
pub mod audit;
pub mod classifier;
pub mod enhancer;
pub mod error;
pub mod metrics;
pub mod models;
pub mod orchestrator;
pub mod validation;

pub use api::{router, AppState};
pub use audit::{AuditConfig, AuditLog};
pub use classifier::{LexiconModel, Prediction, Sentiment, SentimentModel};
pub use enhancer::{EnhancementSelector, OfflineEnhancer};
pub use error::PredictError;
pub use metrics::MetricsCollector;
pub use orchestrator::PredictionService;
