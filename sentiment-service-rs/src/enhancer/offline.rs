// sentiment-service-rs/src/enhancer/offline.rs
//
// Offline enhancement: templated explanations, keyword-based key phrases and
// suggestions, batch insights and script-based language detection. Every
// function here is pure; the same input always yields the same output.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{BatchInsights, EnhancementResult, LanguageInfo, SentimentTrends};
use crate::classifier::{round_to, Sentiment};
use config_rs::InsightThresholds;

pub const PROVIDER_NAME: &str = "offline";

pub const HIGH_CONFIDENCE: f64 = 0.9;
pub const MEDIUM_CONFIDENCE: f64 = 0.7;
pub const MAX_KEY_PHRASES: usize = 5;
pub const MAX_SUGGESTIONS: usize = 3;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?").unwrap());

const POSITIVE_KEYWORDS: &[&str] = &[
    "amazing", "love", "loved", "excellent", "great", "wonderful", "fantastic", "awesome",
    "perfect", "best", "happy", "delighted", "recommend", "good", "brilliant", "outstanding",
    "beautiful", "enjoyed", "impressive", "satisfied",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "terrible", "worst", "awful", "disappointed", "disappointing", "waste", "horrible", "poor",
    "bad", "hate", "broken", "useless", "rude", "slow", "expensive", "overpriced", "defective",
    "frustrating", "unhelpful", "late",
];

const GENERIC_SUGGESTIONS: &[&str] = &[
    "Consider addressing the specific concerns mentioned",
    "Follow up with the customer to understand their experience better",
    "Review processes related to the negative feedback",
    "Implement improvements based on feedback",
];

/// Negative-indicator category detected by keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Price,
    Quality,
    Service,
    Delivery,
}

impl Concern {
    /// Detection order
    pub const ALL: [Concern; 4] = [Concern::Price, Concern::Quality, Concern::Service, Concern::Delivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            Concern::Price => "price",
            Concern::Quality => "quality",
            Concern::Service => "service",
            Concern::Delivery => "delivery",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Concern::Price => &[
                "price", "prices", "pricing", "expensive", "overpriced", "cost", "costs", "costly",
                "money", "refund", "fee", "fees", "charged", "value",
            ],
            Concern::Quality => &[
                "quality", "broken", "defective", "faulty", "damaged", "flimsy", "cheap", "poor",
                "stopped", "broke", "breaks",
            ],
            Concern::Service => &[
                "service", "support", "staff", "rude", "unhelpful", "wait", "waited", "waiting",
                "ignored", "response", "customer",
            ],
            Concern::Delivery => &[
                "delivery", "shipping", "shipped", "late", "delayed", "arrived", "package", "lost",
                "courier",
            ],
        }
    }

    fn suggestions(&self) -> &'static [&'static str] {
        match self {
            Concern::Price => &[
                "Review pricing against the value customers perceive",
                "Offer clearer pricing or a refund path for dissatisfied customers",
            ],
            Concern::Quality => &[
                "Investigate the reported quality defects with the product team",
                "Tighten quality checks before shipping",
            ],
            Concern::Service => &[
                "Follow up personally with the customer to resolve the service issue",
                "Review support response times and staff training",
            ],
            Concern::Delivery => &[
                "Check the delivery partner's performance for late or lost orders",
                "Provide proactive shipping updates to customers",
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

impl ConfidenceBucket {
    fn of(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE {
            ConfidenceBucket::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    fn adverb(&self) -> &'static str {
        match self {
            ConfidenceBucket::High => "strongly",
            ConfidenceBucket::Medium => "moderately",
            ConfidenceBucket::Low => "mildly",
        }
    }
}

/// Deterministic stand-in for the remote providers
#[derive(Debug, Clone, Default)]
pub struct OfflineEnhancer {
    thresholds: InsightThresholds,
}

impl OfflineEnhancer {
    pub fn new(thresholds: InsightThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &InsightThresholds {
        &self.thresholds
    }

    pub fn explain(&self, text: &str, sentiment: Sentiment, confidence: f64) -> EnhancementResult {
        let tokens = tokenize(text);
        let keywords = matched_keywords(&tokens, sentiment);
        let bucket = ConfidenceBucket::of(confidence);
        let pct = confidence * 100.0;

        let mut explanation = match bucket {
            ConfidenceBucket::High | ConfidenceBucket::Medium => format!(
                "The text expresses a {} {} sentiment ({:.1}% confidence).",
                bucket.adverb(),
                sentiment,
                pct
            ),
            ConfidenceBucket::Low => format!(
                "The text leans {}, but the signal is weak ({:.1}% confidence) and may be mixed.",
                sentiment, pct
            ),
        };
        if !keywords.is_empty() {
            let cited: Vec<String> = keywords.iter().take(3).map(|k| format!("\"{}\"", k)).collect();
            explanation.push_str(&format!(" Words such as {} drive this assessment.", join_list(&cited)));
        }

        let key_phrases = if keywords.is_empty() {
            placeholder_phrases(sentiment)
        } else {
            keywords.iter().take(MAX_KEY_PHRASES).cloned().collect()
        };

        let concerns = match sentiment {
            Sentiment::Negative => detect_concerns(&tokens),
            Sentiment::Positive => Vec::new(),
        };

        let suggestions = match sentiment {
            Sentiment::Positive => Vec::new(),
            Sentiment::Negative if concerns.is_empty() => GENERIC_SUGGESTIONS
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|s| s.to_string())
                .collect(),
            Sentiment::Negative => concerns
                .iter()
                .flat_map(|c| c.suggestions())
                .take(MAX_SUGGESTIONS)
                .map(|s| s.to_string())
                .collect(),
        };

        let mut reasoning = if keywords.is_empty() {
            format!(
                "No explicit {} keywords were found; the classification reflects the overall wording.",
                sentiment
            )
        } else {
            format!(
                "Classified as {} because the text contains {} {} indicator{}: {}.",
                sentiment,
                keywords.len(),
                sentiment,
                if keywords.len() == 1 { "" } else { "s" },
                keywords.join(", ")
            )
        };
        if !concerns.is_empty() {
            let names: Vec<&str> = concerns.iter().map(|c| c.as_str()).collect();
            reasoning.push_str(&format!(" Concerns detected: {}.", names.join(", ")));
        }

        EnhancementResult {
            explanation,
            key_phrases,
            reasoning,
            suggestions,
            key_phrases_detailed: Vec::new(),
            tone: Some(format!("{} {}", bucket.adverb(), sentiment)),
            provider: PROVIDER_NAME.to_string(),
        }
    }

    pub fn batch_insights(&self, items: &[(Sentiment, f64)]) -> BatchInsights {
        let total = items.len();
        let positive = items.iter().filter(|(s, _)| *s == Sentiment::Positive).count();
        let negative = total - positive;
        let (trends, skew) = self.trends_and_skew(items);

        let summary = if trends.positive > self.thresholds.dominant_pct {
            format!(
                "Overwhelmingly positive sentiment across {} texts ({:.1}% positive)",
                total, trends.positive
            )
        } else if trends.negative > self.thresholds.dominant_pct {
            format!(
                "Predominantly negative sentiment across {} texts ({:.1}% negative); critical feedback needs attention",
                total, trends.negative
            )
        } else if positive > negative {
            format!(
                "Generally positive sentiment with mixed feedback across {} texts ({:.1}% positive, {:.1}% negative)",
                total, trends.positive, trends.negative
            )
        } else if negative > positive {
            format!(
                "Leaning negative with mixed sentiment across {} texts ({:.1}% negative, {:.1}% positive)",
                total, trends.negative, trends.positive
            )
        } else {
            format!(
                "Evenly split sentiment across {} texts ({:.1}% positive, {:.1}% negative)",
                total, trends.positive, trends.negative
            )
        };

        let mut patterns = Vec::new();
        if positive > 0 {
            patterns.push(format!("Customer satisfaction themes in {} reviews", positive));
        }
        if negative > 0 {
            patterns.push(format!("Service/product concerns in {} reviews", negative));
        }
        let mixed = items
            .iter()
            .filter(|(_, confidence)| is_mixed(*confidence, self.thresholds.mixed_margin))
            .count();
        if mixed > 0 {
            patterns.push(format!(
                "{} of {} texts show mixed sentiment (probability margin below {:.0}%)",
                mixed,
                total,
                self.thresholds.mixed_margin * 100.0
            ));
        }
        if total >= 5 {
            patterns.push("Diverse feedback across multiple touchpoints".to_string());
        }

        BatchInsights {
            summary,
            trends,
            skew,
            patterns,
            recommendation: default_recommendation(negative > 0),
            provider: PROVIDER_NAME.to_string(),
        }
    }

    /// Label percentages and skew classification; also used when a provider
    /// writes the rest of the insight
    pub fn trends_and_skew(&self, items: &[(Sentiment, f64)]) -> (SentimentTrends, String) {
        let total = items.len();
        if total == 0 {
            return (SentimentTrends { positive: 0.0, negative: 0.0 }, "evenly split".to_string());
        }

        let positive = items.iter().filter(|(s, _)| *s == Sentiment::Positive).count();
        let trends = SentimentTrends {
            positive: round_to(positive as f64 / total as f64 * 100.0, 1),
            negative: round_to((total - positive) as f64 / total as f64 * 100.0, 1),
        };

        let (majority, majority_pct) = if trends.positive >= trends.negative {
            (Sentiment::Positive, trends.positive)
        } else {
            (Sentiment::Negative, trends.negative)
        };
        let skew = if majority_pct < self.thresholds.skew_pct {
            "evenly split".to_string()
        } else {
            format!("dominant {}", majority)
        };

        (trends, skew)
    }

    /// Script-range language guess; text is never translated offline
    pub fn detect_language(&self, text: &str) -> LanguageInfo {
        let language = if text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
            "zh"
        } else if text.chars().any(|c| ('\u{0600}'..='\u{06ff}').contains(&c)) {
            "ar"
        } else if text.chars().any(|c| ('\u{0400}'..='\u{04ff}').contains(&c)) {
            "ru"
        } else {
            "en"
        };

        LanguageInfo {
            language: language.to_string(),
            is_english: language == "en",
            translated_text: text.to_string(),
        }
    }
}

/// True when the two class probabilities are closer than `margin`
pub fn is_mixed(confidence: f64, margin: f64) -> bool {
    (2.0 * confidence - 1.0) < margin
}

pub(crate) fn default_recommendation(has_negative: bool) -> String {
    if has_negative {
        "Focus on addressing negative feedback while maintaining positive experiences".to_string()
    } else {
        "Continue current practices to maintain positive sentiment".to_string()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

fn matched_keywords(tokens: &[String], sentiment: Sentiment) -> Vec<String> {
    let list = match sentiment {
        Sentiment::Positive => POSITIVE_KEYWORDS,
        Sentiment::Negative => NEGATIVE_KEYWORDS,
    };
    let mut matched: Vec<String> = Vec::new();
    for token in tokens {
        if list.contains(&token.as_str()) && !matched.contains(token) {
            matched.push(token.clone());
        }
    }
    matched
}

fn detect_concerns(tokens: &[String]) -> Vec<Concern> {
    Concern::ALL
        .into_iter()
        .filter(|concern| tokens.iter().any(|t| concern.keywords().contains(&t.as_str())))
        .collect()
}

fn placeholder_phrases(sentiment: Sentiment) -> Vec<String> {
    let phrases: [&str; 2] = match sentiment {
        Sentiment::Positive => ["positive language", "enthusiastic tone"],
        Sentiment::Negative => ["negative language", "critical tone"],
    };
    phrases.iter().map(|p| p.to_string()).collect()
}

fn join_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enhancer() -> OfflineEnhancer {
        OfflineEnhancer::new(InsightThresholds::default())
    }

    #[test]
    fn test_explain_positive_is_exact() {
        let result = enhancer().explain("I love it, the service was great and I love the staff", Sentiment::Positive, 0.9876);

        assert_eq!(
            result.explanation,
            "The text expresses a strongly positive sentiment (98.8% confidence). Words such as \"love\" and \"great\" drive this assessment."
        );
        assert_eq!(result.key_phrases, vec!["love", "great"]);
        assert!(result.suggestions.is_empty());
        assert_eq!(
            result.reasoning,
            "Classified as positive because the text contains 2 positive indicators: love, great."
        );
        assert_eq!(result.tone.as_deref(), Some("strongly positive"));
        assert_eq!(result.provider, "offline");
    }

    #[test]
    fn test_explain_is_pure() {
        let e = enhancer();
        let a = e.explain("Terrible support, very slow delivery", Sentiment::Negative, 0.95);
        let b = e.explain("Terrible support, very slow delivery", Sentiment::Negative, 0.95);
        assert_eq!(a, b);
    }

    #[test]
    fn test_negative_suggestions_follow_category_order() {
        // delivery mentioned before price in the text; price still comes first
        let result = enhancer().explain(
            "The package arrived late and it was overpriced",
            Sentiment::Negative,
            0.8,
        );

        assert_eq!(result.key_phrases, vec!["late", "overpriced"]);
        assert_eq!(
            result.suggestions,
            vec![
                "Review pricing against the value customers perceive",
                "Offer clearer pricing or a refund path for dissatisfied customers",
                "Check the delivery partner's performance for late or lost orders",
            ]
        );
        assert!(result.reasoning.ends_with("Concerns detected: price, delivery."));
        assert!(result.explanation.starts_with("The text expresses a moderately negative sentiment (80.0% confidence)."));
    }

    #[test]
    fn test_negative_without_category_uses_generic_suggestions() {
        let result = enhancer().explain("Meh. Not for me.", Sentiment::Negative, 0.6);

        assert_eq!(result.key_phrases, vec!["negative language", "critical tone"]);
        assert_eq!(result.suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(result.suggestions[0], GENERIC_SUGGESTIONS[0]);
        assert_eq!(
            result.explanation,
            "The text leans negative, but the signal is weak (60.0% confidence) and may be mixed."
        );
        assert_eq!(result.tone.as_deref(), Some("mildly negative"));
    }

    #[test]
    fn test_key_phrases_capped_and_ordered() {
        let result = enhancer().explain(
            "best perfect good great amazing excellent wonderful",
            Sentiment::Positive,
            0.99,
        );
        assert_eq!(result.key_phrases, vec!["best", "perfect", "good", "great", "amazing"]);
    }

    #[test]
    fn test_batch_insights_majority_positive() {
        let items = [
            (Sentiment::Positive, 0.98),
            (Sentiment::Negative, 0.99),
            (Sentiment::Positive, 0.62),
        ];
        let insights = enhancer().batch_insights(&items);

        assert_eq!(insights.trends, SentimentTrends { positive: 66.7, negative: 33.3 });
        assert_eq!(insights.skew, "dominant positive");
        assert_eq!(
            insights.summary,
            "Generally positive sentiment with mixed feedback across 3 texts (66.7% positive, 33.3% negative)"
        );
        assert_eq!(
            insights.patterns,
            vec![
                "Customer satisfaction themes in 2 reviews",
                "Service/product concerns in 1 reviews",
                "1 of 3 texts show mixed sentiment (probability margin below 30%)",
            ]
        );
        assert_eq!(
            insights.recommendation,
            "Focus on addressing negative feedback while maintaining positive experiences"
        );
    }

    #[test]
    fn test_batch_insights_even_split_and_overwhelming() {
        let e = enhancer();
        let split = e.batch_insights(&[(Sentiment::Positive, 0.9), (Sentiment::Negative, 0.9)]);
        assert_eq!(split.skew, "evenly split");
        assert_eq!(
            split.summary,
            "Evenly split sentiment across 2 texts (50.0% positive, 50.0% negative)"
        );

        let all_good: Vec<_> = (0..5).map(|_| (Sentiment::Positive, 0.95)).collect();
        let insights = e.batch_insights(&all_good);
        assert_eq!(insights.summary, "Overwhelmingly positive sentiment across 5 texts (100.0% positive)");
        assert_eq!(insights.skew, "dominant positive");
        assert_eq!(insights.patterns.last().unwrap(), "Diverse feedback across multiple touchpoints");
        assert_eq!(insights.recommendation, "Continue current practices to maintain positive sentiment");
    }

    #[test]
    fn test_dominant_summary_needs_more_than_threshold() {
        let e = enhancer();
        let mut items: Vec<_> = (0..7).map(|_| (Sentiment::Positive, 0.95)).collect();
        items.extend((0..3).map(|_| (Sentiment::Negative, 0.95)));
        let insights = e.batch_insights(&items);
        assert_eq!(insights.trends.positive, 70.0);
        assert!(insights.summary.starts_with("Generally positive sentiment with mixed feedback"));

        let mut items: Vec<_> = (0..7).map(|_| (Sentiment::Negative, 0.95)).collect();
        items.extend((0..3).map(|_| (Sentiment::Positive, 0.95)));
        let insights = e.batch_insights(&items);
        assert!(insights.summary.starts_with("Leaning negative with mixed sentiment"));

        items.push((Sentiment::Negative, 0.95));
        let insights = e.batch_insights(&items);
        assert!(insights.summary.starts_with("Predominantly negative sentiment"));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let e = OfflineEnhancer::new(InsightThresholds {
            skew_pct: 70.0,
            ..InsightThresholds::default()
        });
        let (_, skew) = e.trends_and_skew(&[
            (Sentiment::Negative, 0.9),
            (Sentiment::Negative, 0.9),
            (Sentiment::Positive, 0.9),
        ]);
        assert_eq!(skew, "evenly split");
    }

    #[test]
    fn test_detect_language_by_script() {
        let e = enhancer();
        assert_eq!(e.detect_language("这个产品很好").language, "zh");
        assert_eq!(e.detect_language("منتج رائع").language, "ar");
        assert_eq!(e.detect_language("Отличный товар").language, "ru");

        let english = e.detect_language("Great product");
        assert!(english.is_english);
        assert_eq!(english.translated_text, "Great product");
    }

    #[test]
    fn test_is_mixed() {
        assert!(is_mixed(0.6, 0.30));
        assert!(!is_mixed(0.65, 0.30));
        assert!(!is_mixed(0.99, 0.30));
    }
}
