// sentiment-service-rs/src/enhancer/selector.rs
//
// Chooses which strategy produces an enhancement. Remote providers are tried
// as an ordered fallback chain; the offline enhancer is the terminal step, so
// every public method here returns a value and never an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::prompts::{self, GeneratedInsights};
use super::{
    BatchInsights, EnhancementProvider, EnhancementResult, GeminiProvider, GroqProvider,
    LanguageInfo, OfflineEnhancer, ProviderKind, ProviderPreference,
};
use crate::classifier::Sentiment;
use config_rs::ServiceConfig;
use error_handling_rs::{first_success, log_structured_error, Error};

pub struct EnhancementSelector {
    /// Every registered provider, configured or not
    providers: Vec<Arc<dyn EnhancementProvider>>,
    /// Providers tried by `auto`, in priority order
    auto_order: Vec<ProviderKind>,
    offline: OfflineEnhancer,
    attempt_timeout: Duration,
}

impl EnhancementSelector {
    /// `providers` doubles as the `auto` priority order
    pub fn new(
        providers: Vec<Arc<dyn EnhancementProvider>>,
        offline: OfflineEnhancer,
        attempt_timeout: Duration,
    ) -> Self {
        let auto_order = providers.iter().map(|p| p.kind()).collect();
        Self {
            providers,
            auto_order,
            offline,
            attempt_timeout,
        }
    }

    /// Selector that never leaves the process
    pub fn offline_only(offline: OfflineEnhancer) -> Self {
        Self::new(Vec::new(), offline, Duration::from_secs(1))
    }

    /// Builds both remote providers and orders `auto` by `LLM_PROVIDER_ORDER`
    pub fn from_config(config: &ServiceConfig) -> Self {
        let llm = &config.llm;
        let mut providers: Vec<Arc<dyn EnhancementProvider>> = Vec::new();

        match GroqProvider::new(&llm.groq, llm.temperature, llm.max_tokens, llm.request_timeout) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => warn!(provider = "groq", error = %e, "Failed to initialize enhancement provider"),
        }
        match GeminiProvider::new(&llm.gemini, llm.temperature, llm.max_tokens, llm.request_timeout) {
            Ok(provider) => providers.push(Arc::new(provider)),
            Err(e) => warn!(provider = "gemini", error = %e, "Failed to initialize enhancement provider"),
        }

        let mut auto_order = Vec::new();
        for name in &llm.provider_order {
            match name.parse::<ProviderKind>() {
                Ok(kind) if !auto_order.contains(&kind) => auto_order.push(kind),
                Ok(_) => {}
                Err(e) => warn!("Ignoring LLM_PROVIDER_ORDER entry: {}", e),
            }
        }

        let selector = Self {
            providers,
            auto_order,
            offline: OfflineEnhancer::new(config.insights),
            attempt_timeout: llm.request_timeout,
        };
        info!(
            configured = ?selector.configured_providers(),
            order = ?selector.auto_order,
            timeout_ms = selector.attempt_timeout.as_millis() as u64,
            "Enhancement selector ready"
        );
        selector
    }

    pub fn offline(&self) -> &OfflineEnhancer {
        &self.offline
    }

    /// Providers that have credentials, in registration order
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .map(|p| p.kind())
            .collect()
    }

    /// Remote providers to attempt for `preference`, in order
    pub fn candidates(&self, preference: ProviderPreference) -> Vec<Arc<dyn EnhancementProvider>> {
        let order: Vec<ProviderKind> = match preference {
            ProviderPreference::Offline => return Vec::new(),
            ProviderPreference::Auto => self.auto_order.clone(),
            pinned => pinned.pinned().into_iter().collect(),
        };

        order
            .into_iter()
            .filter_map(|kind| self.providers.iter().find(|p| p.kind() == kind))
            .filter(|p| p.is_configured())
            .cloned()
            .collect()
    }

    pub async fn enhance(
        &self,
        text: &str,
        sentiment: Sentiment,
        confidence: f64,
        preference: ProviderPreference,
    ) -> EnhancementResult {
        let prompt = prompts::explanation_prompt(text, sentiment, confidence);

        first_success("enhance", self.candidates(preference), self.attempt_timeout, |provider| {
            let prompt = &prompt;
            async move {
                let kind = provider.kind();
                provider
                    .complete(prompt)
                    .await
                    .and_then(|raw| prompts::parse_explanation(&raw, kind))
                    .map_err(|e| e.into_error(kind))
            }
        })
        .await
        .or_else_terminal(|errors| {
            note_failures("enhance", &errors);
            self.offline.explain(text, sentiment, confidence)
        })
    }

    /// Batch-level insight; `trends` and `skew` are always computed locally
    pub async fn batch_insights(
        &self,
        texts: &[String],
        labels: &[(Sentiment, f64)],
        preference: ProviderPreference,
    ) -> BatchInsights {
        let local = self.offline.batch_insights(labels);
        let prompt = prompts::batch_insights_prompt(texts, labels);

        let generated: Option<(GeneratedInsights, ProviderKind)> = first_success(
            "batch_insights",
            self.candidates(preference),
            self.attempt_timeout,
            |provider| {
                let prompt = &prompt;
                async move {
                    let kind = provider.kind();
                    provider
                        .complete(prompt)
                        .await
                        .and_then(|raw| prompts::parse_batch_insights(&raw))
                        .map(|insights| Some((insights, kind)))
                        .map_err(|e| e.into_error(kind))
                }
            },
        )
        .await
        .or_else_terminal(|errors| {
            note_failures("batch_insights", &errors);
            None
        });

        match generated {
            Some((insights, kind)) => BatchInsights {
                summary: insights.summary,
                trends: local.trends,
                skew: local.skew,
                patterns: if insights.patterns.is_empty() {
                    local.patterns
                } else {
                    insights.patterns
                },
                recommendation: insights
                    .recommendation
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or(local.recommendation),
                provider: kind.to_string(),
            },
            None => local,
        }
    }

    pub async fn detect_language(&self, text: &str, preference: ProviderPreference) -> LanguageInfo {
        let prompt = prompts::language_prompt(text);

        first_success("detect_language", self.candidates(preference), self.attempt_timeout, |provider| {
            let prompt = &prompt;
            async move {
                let kind = provider.kind();
                provider
                    .complete(prompt)
                    .await
                    .and_then(|raw| prompts::parse_language(&raw, text))
                    .map_err(|e| e.into_error(kind))
            }
        })
        .await
        .or_else_terminal(|errors| {
            note_failures("detect_language", &errors);
            self.offline.detect_language(text)
        })
    }
}

fn note_failures(operation: &str, errors: &[Error]) {
    if errors.is_empty() {
        debug!(operation, "no remote provider attempted, using offline enhancer");
        return;
    }
    for error in errors {
        log_structured_error(error);
    }
    warn!(
        operation,
        attempts = errors.len(),
        "All enhancement providers failed, using offline enhancer"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::enhancer::ProviderError;
    use config_rs::InsightThresholds;

    enum Reply {
        Text(&'static str),
        Fail(ProviderError),
        Hang,
    }

    struct FakeProvider {
        kind: ProviderKind,
        configured: bool,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(kind: ProviderKind, reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                kind,
                configured: true,
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn unconfigured(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                configured: false,
                reply: Reply::Fail(ProviderError::NotConfigured),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EnhancementProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail(err) => Err(err.clone()),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
            }
        }
    }

    const EXPLANATION: &str = r#"{"explanation": "Clearly upbeat.", "key_phrases": ["amazing"], "reasoning": "r", "suggestions": []}"#;

    fn selector(providers: Vec<Arc<dyn EnhancementProvider>>) -> EnhancementSelector {
        EnhancementSelector::new(
            providers,
            OfflineEnhancer::new(InsightThresholds::default()),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_auto_falls_through_to_second_provider() {
        let groq = FakeProvider::new(ProviderKind::Groq, Reply::Fail(ProviderError::Server("500".into())));
        let gemini = FakeProvider::new(ProviderKind::Gemini, Reply::Text(EXPLANATION));
        let selector = selector(vec![groq.clone(), gemini.clone()]);

        let result = selector
            .enhance("This is amazing!", Sentiment::Positive, 0.97, ProviderPreference::Auto)
            .await;

        assert_eq!(result.provider, "gemini");
        assert_eq!(result.explanation, "Clearly upbeat.");
        assert_eq!(groq.calls(), 1);
        assert_eq!(gemini.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_end_offline() {
        let groq = FakeProvider::new(ProviderKind::Groq, Reply::Fail(ProviderError::Authentication("401".into())));
        let gemini = FakeProvider::new(ProviderKind::Gemini, Reply::Text("not json at all"));
        let selector = selector(vec![groq, gemini]);

        let result = selector
            .enhance("Terrible and overpriced", Sentiment::Negative, 0.95, ProviderPreference::Auto)
            .await;

        assert_eq!(result.provider, "offline");
        assert!(!result.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_pinned_provider_skips_others() {
        let groq = FakeProvider::new(ProviderKind::Groq, Reply::Text(EXPLANATION));
        let gemini = FakeProvider::new(ProviderKind::Gemini, Reply::Fail(ProviderError::QuotaExceeded("429".into())));
        let selector = selector(vec![groq.clone(), gemini.clone()]);

        let result = selector
            .enhance("fine", Sentiment::Positive, 0.6, ProviderPreference::Gemini)
            .await;

        assert_eq!(result.provider, "offline");
        assert_eq!(groq.calls(), 0);
        assert_eq!(gemini.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_preference_never_calls_out() {
        let groq = FakeProvider::new(ProviderKind::Groq, Reply::Text(EXPLANATION));
        let selector = selector(vec![groq.clone()]);

        let result = selector
            .enhance("great", Sentiment::Positive, 0.9, ProviderPreference::Offline)
            .await;

        assert_eq!(result.provider, "offline");
        assert_eq!(groq.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_providers_are_not_attempted() {
        let groq = FakeProvider::unconfigured(ProviderKind::Groq);
        let gemini = FakeProvider::new(ProviderKind::Gemini, Reply::Text(EXPLANATION));
        let selector = selector(vec![groq.clone(), gemini]);

        assert_eq!(selector.configured_providers(), vec![ProviderKind::Gemini]);
        let result = selector
            .enhance("great", Sentiment::Positive, 0.9, ProviderPreference::Auto)
            .await;
        assert_eq!(result.provider, "gemini");
        assert_eq!(groq.calls(), 0);
    }

    #[tokio::test]
    async fn test_hanging_provider_is_bounded_by_timeout() {
        let groq = FakeProvider::new(ProviderKind::Groq, Reply::Hang);
        let selector = selector(vec![groq]);

        let started = std::time::Instant::now();
        let result = selector
            .enhance("great", Sentiment::Positive, 0.9, ProviderPreference::Auto)
            .await;

        assert_eq!(result.provider, "offline");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_batch_insights_keeps_local_numbers() {
        let groq = FakeProvider::new(
            ProviderKind::Groq,
            Reply::Text(r#"{"summary": "Mostly happy customers.", "patterns": [], "recommendation": "Keep going"}"#),
        );
        let selector = selector(vec![groq]);
        let texts = vec!["Great!".to_string(), "Terrible".to_string(), "Okay".to_string()];
        let labels = [
            (Sentiment::Positive, 0.99),
            (Sentiment::Negative, 0.99),
            (Sentiment::Positive, 0.55),
        ];

        let insights = selector
            .batch_insights(&texts, &labels, ProviderPreference::Auto)
            .await;

        assert_eq!(insights.provider, "groq");
        assert_eq!(insights.summary, "Mostly happy customers.");
        assert_eq!(insights.recommendation, "Keep going");
        assert_eq!(insights.trends.positive, 66.7);
        assert_eq!(insights.skew, "dominant positive");
        // empty provider patterns fall back to the computed ones
        assert_eq!(insights.patterns[0], "Customer satisfaction themes in 2 reviews");
    }

    #[tokio::test]
    async fn test_detect_language_falls_back_to_script_heuristic() {
        let selector = selector(vec![]);
        let info = selector
            .detect_language("Отличный товар", ProviderPreference::Auto)
            .await;
        assert_eq!(info.language, "ru");
        assert_eq!(info.translated_text, "Отличный товар");
    }

    #[tokio::test]
    async fn test_detect_language_uses_provider_translation() {
        let gemini = FakeProvider::new(
            ProviderKind::Gemini,
            Reply::Text(r#"{"language": "fr", "is_english": false, "translated_text": "Very good product"}"#),
        );
        let selector = selector(vec![gemini]);
        let info = selector
            .detect_language("Très bon produit", ProviderPreference::Gemini)
            .await;
        assert_eq!(info.language, "fr");
        assert_eq!(info.translated_text, "Very good product");
    }
}
