// sentiment-service-rs/src/enhancer/prompts.rs
//
// Prompt construction and reply parsing shared by all remote providers.
// Replies are expected to contain one JSON object; anything before the first
// '{' or after the last '}' is ignored.

use serde::Deserialize;
use serde_json::Value;

use super::{EnhancementResult, KeyPhrase, LanguageInfo, ProviderError, ProviderKind};
use crate::classifier::Sentiment;

/// System instruction sent with chat-style requests
pub const SYSTEM_PROMPT: &str = "You are a sentiment analysis expert. Always respond with valid JSON.";

const MAX_KEY_PHRASES: usize = 5;
const MAX_SUGGESTIONS: usize = 3;
const MAX_BATCH_SAMPLES: usize = 20;

pub fn explanation_prompt(text: &str, sentiment: Sentiment, confidence: f64) -> String {
    format!(
        r#"Analyze the sentiment of the following text.

Text: {text}
Predicted sentiment: {sentiment} (confidence {confidence:.1}%)

Respond with a single JSON object with these fields:
- "explanation": 2-3 sentences explaining why the text carries this sentiment
- "key_phrases_detailed": list of objects {{"phrase": string, "sentiment": "positive"|"negative"|"neutral", "score": number between -1 and 1}} for the phrases that drive the sentiment, most important first
- "reasoning": the linguistic evidence behind the classification
- "suggestions": for negative sentiment, up to 3 concrete improvement suggestions; otherwise an empty list
- "tone": one or two words describing the tone"#,
        text = quoted(text),
        sentiment = sentiment,
        confidence = confidence * 100.0,
    )
}

pub fn batch_insights_prompt(texts: &[String], labels: &[(Sentiment, f64)]) -> String {
    let samples: Vec<String> = texts
        .iter()
        .zip(labels)
        .take(MAX_BATCH_SAMPLES)
        .enumerate()
        .map(|(i, (text, (label, confidence)))| {
            format!("{}. [{} {:.0}%] {}", i + 1, label, confidence * 100.0, quoted(text))
        })
        .collect();

    format!(
        r#"Analyze these {total} texts and their predicted sentiments:

{samples}

Respond with a single JSON object with these fields:
- "summary": one sentence describing the overall sentiment of the set
- "patterns": list of short notes on recurring themes or concerns
- "recommendation": one actionable recommendation"#,
        total = texts.len(),
        samples = samples.join("\n"),
    )
}

pub fn language_prompt(text: &str) -> String {
    format!(
        r#"Detect the language of the following text and translate it to English if needed.

Text: {text}

Respond with a single JSON object with these fields:
- "language": ISO 639-1 code of the text's language
- "is_english": true if the text is English
- "translated_text": English translation, or the original text if already English"#,
        text = quoted(text),
    )
}

/// Extracts and parses the JSON object embedded in a model reply
pub fn extract_json(raw: &str) -> Result<Value, ProviderError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let slice = match (start, end) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => {
            return Err(ProviderError::MalformedResponse(format!(
                "no JSON object in reply: {}",
                error_handling_rs::truncate_chars(raw, 120)
            )))
        }
    };
    serde_json::from_str(slice).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct RawExplanation {
    explanation: Option<String>,
    #[serde(default)]
    key_phrases: Vec<String>,
    #[serde(default)]
    key_phrases_detailed: Vec<RawKeyPhrase>,
    reasoning: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    tone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawKeyPhrase {
    phrase: String,
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    score: f64,
}

pub fn parse_explanation(raw: &str, provider: ProviderKind) -> Result<EnhancementResult, ProviderError> {
    let parsed: RawExplanation = serde_json::from_value(extract_json(raw)?)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let explanation = parsed
        .explanation
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse("missing explanation".to_string()))?;

    let key_phrases_detailed: Vec<KeyPhrase> = parsed
        .key_phrases_detailed
        .into_iter()
        .filter(|p| !p.phrase.trim().is_empty())
        .take(MAX_KEY_PHRASES)
        .map(|p| KeyPhrase {
            phrase: p.phrase.trim().to_string(),
            sentiment: p.sentiment,
            score: p.score.clamp(-1.0, 1.0),
        })
        .collect();

    let key_phrases = if parsed.key_phrases.is_empty() {
        key_phrases_detailed.iter().map(|p| p.phrase.clone()).collect()
    } else {
        parsed.key_phrases.into_iter().take(MAX_KEY_PHRASES).collect()
    };

    Ok(EnhancementResult {
        explanation,
        key_phrases,
        reasoning: parsed.reasoning.unwrap_or_default(),
        suggestions: parsed.suggestions.into_iter().take(MAX_SUGGESTIONS).collect(),
        key_phrases_detailed,
        tone: parsed.tone.filter(|t| !t.trim().is_empty()),
        provider: provider.to_string(),
    })
}

/// Provider-written parts of a batch insight; numbers are computed locally
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedInsights {
    pub summary: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    pub recommendation: Option<String>,
}

pub fn parse_batch_insights(raw: &str) -> Result<GeneratedInsights, ProviderError> {
    let parsed: GeneratedInsights = serde_json::from_value(extract_json(raw)?)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
    if parsed.summary.trim().is_empty() {
        return Err(ProviderError::MalformedResponse("empty summary".to_string()));
    }
    Ok(parsed)
}

#[derive(Debug, Deserialize)]
struct RawLanguage {
    language: String,
    is_english: Option<bool>,
    translated_text: Option<String>,
}

pub fn parse_language(raw: &str, original: &str) -> Result<LanguageInfo, ProviderError> {
    let parsed: RawLanguage = serde_json::from_value(extract_json(raw)?)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    let language = parsed.language.trim().to_ascii_lowercase();
    if language.is_empty() {
        return Err(ProviderError::MalformedResponse("empty language code".to_string()));
    }
    let is_english = parsed.is_english.unwrap_or(language == "en");
    let translated_text = parsed
        .translated_text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| original.to_string());

    Ok(LanguageInfo {
        language,
        is_english,
        translated_text,
    })
}

fn quoted(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}
