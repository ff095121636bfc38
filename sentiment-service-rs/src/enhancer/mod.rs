// sentiment-service-rs/src/enhancer/mod.rs
//
// Explanation layer on top of a classification.
//
// Remote providers (Groq, Gemini) expose one capability, prompt in and text
// out. Prompt construction and response parsing live in `prompts.rs`, so
// every provider yields the same `EnhancementResult`. The selector walks the
// candidates and ends with the offline fallback, which cannot fail.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use error_handling_rs::{Error, ErrorKind};

pub mod gemini;
pub mod groq;
pub mod offline;
pub mod prompts;
pub mod selector;

pub use gemini::GeminiProvider;
pub use groq::GroqProvider;
pub use offline::OfflineEnhancer;
pub use selector::EnhancementSelector;

/// Explanation attached to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResult {
    pub explanation: String,
    pub key_phrases: Vec<String>,
    pub reasoning: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_phrases_detailed: Vec<KeyPhrase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    /// Strategy that produced this result
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPhrase {
    pub phrase: String,
    pub sentiment: String,
    pub score: f64,
}

/// Label distribution of a batch, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentTrends {
    pub positive: f64,
    pub negative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInsights {
    pub summary: String,
    pub trends: SentimentTrends,
    /// "evenly split" or "dominant <label>"
    pub skew: String,
    pub patterns: Vec<String>,
    pub recommendation: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub language: String,
    pub is_english: bool,
    pub translated_text: String,
}

/// Remote provider identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Caller's choice of enhancement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderPreference {
    #[default]
    Auto,
    Groq,
    Gemini,
    Offline,
}

impl ProviderPreference {
    /// Provider pinned by this preference, if any
    pub fn pinned(&self) -> Option<ProviderKind> {
        match self {
            ProviderPreference::Groq => Some(ProviderKind::Groq),
            ProviderPreference::Gemini => Some(ProviderKind::Gemini),
            ProviderPreference::Auto | ProviderPreference::Offline => None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Classifies a non-success HTTP response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = error_handling_rs::truncate_chars(body.trim(), 300);
        match status.as_u16() {
            401 | 403 => ProviderError::Authentication(format!("{}: {}", status, body)),
            // Gemini reports a bad key as 400 INVALID_ARGUMENT
            400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
                ProviderError::Authentication(format!("{}: {}", status, body))
            }
            429 => ProviderError::QuotaExceeded(format!("{}: {}", status, body)),
            500..=599 => ProviderError::Server(format!("{}: {}", status, body)),
            _ => ProviderError::MalformedResponse(format!("unexpected status {}: {}", status, body)),
        }
    }

    /// Classifies a transport-level failure
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(timeout)
        } else if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Network(err.without_url().to_string())
        }
    }

    /// Structured record for the fallback chain and error log
    pub fn into_error(self, provider: ProviderKind) -> Error {
        let kind = match &self {
            ProviderError::Timeout(_) => ErrorKind::Timeout,
            ProviderError::Authentication(_) => ErrorKind::Authentication,
            ProviderError::QuotaExceeded(_) => ErrorKind::RateLimit,
            ProviderError::MalformedResponse(_) => ErrorKind::Parsing,
            _ => ErrorKind::Enhancement(provider.to_string()),
        };
        Error::new(kind, format!("{}: {}", provider, self)).context("provider", provider.as_str())
    }
}

/// A remote LLM completion endpoint
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether credentials are present; unconfigured providers are skipped
    fn is_configured(&self) -> bool;

    /// Sends `prompt` and returns the model's raw text reply
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
