// sentiment-service-rs/src/classifier/mod.rs
//
// Sentiment classifier seam. The orchestrator only sees `SentimentModel`;
// the bundled implementation is the lexicon model in `lexicon.rs`.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod lexicon;

pub use lexicon::{Lexicon, LexiconModel};

/// Closed set of labels produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-class probabilities; the two values sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub positive: f64,
    pub negative: f64,
}

impl Probabilities {
    /// Builds the distribution from p(positive), rounded to four decimals
    pub fn from_positive(p_positive: f64) -> Self {
        let positive = round_to(p_positive.clamp(0.0, 1.0), 4);
        Self {
            positive,
            negative: round_to(1.0 - positive, 4),
        }
    }

    pub fn label(&self) -> Sentiment {
        if self.positive >= self.negative {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        }
    }

    pub fn max(&self) -> f64 {
        self.positive.max(self.negative)
    }
}

/// Output of a single classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub sentiment: Sentiment,
    /// Always equal to `probabilities.max()`
    pub confidence: f64,
    pub probabilities: Probabilities,
}

impl From<Probabilities> for Prediction {
    fn from(probabilities: Probabilities) -> Self {
        Self {
            sentiment: probabilities.label(),
            confidence: probabilities.max(),
            probabilities,
        }
    }
}

/// Static description reported by `/metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub device: String,
    pub status: String,
    pub framework: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A loaded-once sentiment model shared by every request
#[async_trait]
pub trait SentimentModel: Send + Sync {
    fn name(&self) -> &str;

    fn is_loaded(&self) -> bool;

    /// One-time startup cost; calling it again on a loaded model is a no-op
    async fn load(&self) -> Result<(), ClassifierError>;

    async fn unload(&self);

    /// Classifies already-trimmed text. CPU-bound and deterministic.
    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError>;

    fn info(&self) -> ModelInfo;
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
