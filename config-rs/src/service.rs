// config-rs/src/service.rs
// Typed service configuration

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::{bind_address_from, env_lookup, flag_or, parse_or};

pub const SERVICE_ENV_PREFIX: &str = "SENTIMENT";
pub const DEFAULT_PORT: u16 = 8000;

/// Hard upper bound on a single enhancement provider call
pub const MAX_LLM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Everything the service reads from its environment
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    pub bind_address: SocketAddr,
    pub model: ModelConfig,
    pub llm: LlmConfig,
    pub logging: LogConfig,
    pub insights: InsightThresholds,
    /// Install the Prometheus recorder and serve `/metrics/prometheus`
    pub prometheus_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_name: String,
    /// Optional JSON lexicon merged over the built-in one
    pub lexicon_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().map_or(false, |key| !key.trim().is_empty())
    }
}

// api keys never reach logs through Debug
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub groq: ProviderConfig,
    pub gemini: ProviderConfig,
    /// Provider names tried by `auto`, in order
    pub provider_order: Vec<String>,
    /// Per-attempt deadline, at most `MAX_LLM_TIMEOUT_SECS`
    pub request_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
    pub dir: PathBuf,
    /// Size at which an audit sink rotates
    pub max_file_bytes: u64,
    /// Historical generations kept per sink
    pub max_files: usize,
    /// Characters of input text kept in prediction records
    pub input_truncate_chars: usize,
}

/// Cut points used by batch insights and mixed-sentiment detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightThresholds {
    /// Majority share (percent) below which a batch is "evenly split"
    pub skew_pct: f64,
    /// Share (percent) at which the summary calls a label overwhelming
    pub dominant_pct: f64,
    /// Probability margin below which a prediction counts as mixed
    pub mixed_margin: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            skew_pct: 60.0,
            dominant_pct: 70.0,
            mixed_margin: 0.30,
        }
    }
}

impl ServiceConfig {
    /// Resolves the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Resolves the configuration from an arbitrary key lookup
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model = ModelConfig {
            model_name: non_empty("MODEL_NAME").unwrap_or_else(|| "sentiment-lexicon-en-v1".to_string()),
            lexicon_path: non_empty("LEXICON_PATH").map(PathBuf::from),
        };

        let timeout_secs: u64 = parse_or(&lookup, "LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS);
        if timeout_secs > MAX_LLM_TIMEOUT_SECS || timeout_secs == 0 {
            log::warn!(
                "LLM_TIMEOUT_SECS={} outside 1..={}, clamping",
                timeout_secs,
                MAX_LLM_TIMEOUT_SECS
            );
        }

        let provider_order: Vec<String> = non_empty("LLM_PROVIDER_ORDER")
            .unwrap_or_else(|| "groq,gemini".to_string())
            .split(',')
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty())
            .collect();

        let llm = LlmConfig {
            groq: ProviderConfig {
                api_key: non_empty("GROQ_API_KEY"),
                api_url: non_empty("GROQ_API_URL")
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1/chat/completions".to_string()),
                model: non_empty("GROQ_MODEL").unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
            },
            gemini: ProviderConfig {
                api_key: non_empty("GOOGLE_API_KEY"),
                api_url: non_empty("GEMINI_API_URL")
                    .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
                model: non_empty("GEMINI_MODEL").unwrap_or_else(|| "gemini-pro".to_string()),
            },
            provider_order,
            request_timeout: Duration::from_secs(timeout_secs.clamp(1, MAX_LLM_TIMEOUT_SECS)),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.3),
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 1000),
        };

        let logging = LogConfig {
            level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            json: flag_or(&lookup, "LOG_JSON", false),
            dir: PathBuf::from(non_empty("LOG_DIR").unwrap_or_else(|| "logs".to_string())),
            max_file_bytes: parse_or(&lookup, "LOG_MAX_BYTES", 10 * 1024 * 1024),
            max_files: parse_or(&lookup, "LOG_MAX_FILES", 5),
            input_truncate_chars: parse_or(&lookup, "LOG_INPUT_TRUNCATE", 200),
        };
        if logging.max_file_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LOG_MAX_BYTES",
                reason: "must be greater than zero".to_string(),
            });
        }
        if logging.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LOG_MAX_FILES",
                reason: "at least one generation must be kept".to_string(),
            });
        }

        let defaults = InsightThresholds::default();
        let insights = InsightThresholds {
            skew_pct: parse_or(&lookup, "INSIGHT_SKEW_THRESHOLD", defaults.skew_pct),
            dominant_pct: parse_or(&lookup, "INSIGHT_DOMINANT_THRESHOLD", defaults.dominant_pct),
            mixed_margin: parse_or(&lookup, "MIXED_SENTIMENT_MARGIN", defaults.mixed_margin),
        };
        if !(0.0..=1.0).contains(&insights.mixed_margin) {
            return Err(ConfigError::InvalidValue {
                key: "MIXED_SENTIMENT_MARGIN",
                reason: format!("{} is not a probability margin", insights.mixed_margin),
            });
        }

        Ok(Self {
            service_name: "sentiment-service".to_string(),
            bind_address: bind_address_from(&lookup, SERVICE_ENV_PREFIX, DEFAULT_PORT),
            model,
            llm,
            logging,
            insights,
            prometheus_enabled: flag_or(&lookup, "METRICS_PROMETHEUS", true),
        })
    }
}
