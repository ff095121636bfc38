// sentiment-service-rs/src/classifier/lexicon.rs
//
// Weighted-lexicon sentiment model.
//
// Tokens are matched against signed word weights. A negator flips (and damps)
// the sentiment words in the next few tokens, an intensifier scales the next
// sentiment word, and trailing exclamation marks add emphasis. The summed
// score goes through a logistic curve to give p(positive).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::Deserialize;

use super::{ClassifierError, ModelInfo, Prediction, Probabilities, SentimentModel};
use config_rs::ModelConfig;

/// Tokens after a negator that are affected by it
const NEGATION_WINDOW: usize = 3;
/// A negated word contributes this fraction of its weight, sign flipped
const NEGATION_DAMPING: f64 = 0.75;
/// Logistic slope applied to the raw score
const SCORE_SCALE: f64 = 1.5;
/// Per exclamation mark, capped at three
const EXCLAMATION_BOOST: f64 = 0.1;
const MIN_PROBABILITY: f64 = 0.0001;
const MAX_PROBABILITY: f64 = 0.9999;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+(?:'[a-z]+)?").unwrap());

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("amazing", 3.0), ("awesome", 3.0), ("excellent", 3.0), ("fantastic", 3.0),
    ("outstanding", 3.0), ("perfect", 2.8), ("wonderful", 2.8), ("brilliant", 2.8),
    ("superb", 2.8), ("love", 2.6), ("loved", 2.6), ("loves", 2.4), ("great", 2.4),
    ("best", 2.4), ("delighted", 2.4), ("impressive", 2.0), ("beautiful", 2.0),
    ("happy", 2.0), ("enjoyed", 2.0), ("enjoy", 1.8), ("recommend", 1.8),
    ("recommended", 1.8), ("pleased", 1.8), ("satisfied", 1.8), ("good", 1.6),
    ("helpful", 1.6), ("glad", 1.6), ("nice", 1.5), ("friendly", 1.5), ("reliable", 1.5),
    ("liked", 1.2), ("easy", 1.2), ("worth", 1.2), ("like", 1.0), ("fast", 1.0),
    ("quick", 1.0), ("thanks", 1.0), ("thank", 1.0), ("decent", 0.9), ("fine", 0.8),
    ("works", 0.8), ("okay", 0.6), ("ok", 0.6),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("terrible", -3.0), ("awful", -3.0), ("horrible", -3.0), ("worst", -3.0),
    ("disgusting", -2.8), ("useless", -2.6), ("hate", -2.6), ("hated", -2.6),
    ("pathetic", -2.6), ("disappointed", -2.5), ("disappointing", -2.5), ("poor", -2.2),
    ("bad", -2.2), ("waste", -2.2), ("wasted", -2.2), ("rude", -2.2), ("angry", -2.2),
    ("defective", -2.2), ("regret", -2.2), ("broken", -2.0), ("frustrating", -2.0),
    ("frustrated", -2.0), ("unhappy", -2.0), ("unhelpful", -2.0), ("fail", -2.0),
    ("failed", -2.0), ("fails", -2.0), ("avoid", -2.0), ("annoying", -1.8),
    ("overpriced", -1.8), ("ignored", -1.8), ("boring", -1.6), ("sad", -1.6),
    ("wrong", -1.6), ("mediocre", -1.4), ("lost", -1.4), ("complaint", -1.4),
    ("slow", -1.2), ("late", -1.2), ("delayed", -1.2), ("refund", -1.2),
    ("problem", -1.2), ("problems", -1.2), ("difficult", -1.2), ("expensive", -1.0),
    ("issue", -1.0), ("issues", -1.0), ("cheap", -0.8),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "without", "hardly",
    "don't", "doesn't", "didn't", "isn't", "wasn't", "aren't", "weren't", "won't",
    "wouldn't", "can't", "cannot", "couldn't", "shouldn't", "dont", "doesnt", "didnt",
    "isnt", "wasnt", "cant", "wont",
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5), ("really", 1.4), ("extremely", 1.8), ("so", 1.3), ("super", 1.5),
    ("incredibly", 1.7), ("absolutely", 1.6), ("totally", 1.4), ("completely", 1.5),
    ("highly", 1.5), ("quite", 1.2), ("truly", 1.4), ("utterly", 1.7),
];

/// Word weights plus the modifier vocabularies
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    pub words: HashMap<String, f64>,
    #[serde(default)]
    pub negators: HashSet<String>,
    #[serde(default)]
    pub intensifiers: HashMap<String, f64>,
}

impl Lexicon {
    /// The bundled English lexicon
    pub fn builtin() -> Self {
        Self {
            words: POSITIVE_WORDS
                .iter()
                .chain(NEGATIVE_WORDS)
                .map(|(word, weight)| (word.to_string(), *weight))
                .collect(),
            negators: NEGATORS.iter().map(|word| word.to_string()).collect(),
            intensifiers: INTENSIFIERS
                .iter()
                .map(|(word, factor)| (word.to_string(), *factor))
                .collect(),
        }
    }

    /// Built-in lexicon extended (and overridden) by a JSON file
    pub async fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClassifierError::Load(format!("{}: {}", path.display(), e)))?;
        let overlay: Lexicon = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::Load(format!("{}: {}", path.display(), e)))?;

        if let Some((word, _)) = overlay
            .words
            .iter()
            .chain(overlay.intensifiers.iter())
            .find(|(_, weight)| !weight.is_finite())
        {
            return Err(ClassifierError::Load(format!("non-finite weight for '{}'", word)));
        }

        let mut lexicon = Self::builtin();
        lexicon.merge(overlay);
        Ok(lexicon)
    }

    fn merge(&mut self, other: Lexicon) {
        let lower = |s: String| s.to_lowercase();
        self.words.extend(other.words.into_iter().map(|(k, v)| (lower(k), v)));
        self.negators.extend(other.negators.into_iter().map(lower));
        self.intensifiers
            .extend(other.intensifiers.into_iter().map(|(k, v)| (lower(k), v)));
    }

    /// Signed sentiment score; positive values lean positive
    pub fn score(&self, text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let mut score = 0.0;
        let mut negation_left = 0usize;
        let mut boost = 1.0;

        for token in TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()) {
            if self.negators.contains(token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(factor) = self.intensifiers.get(token) {
                boost *= factor;
                continue;
            }
            if let Some(weight) = self.words.get(token) {
                let mut contribution = weight * boost;
                if negation_left > 0 {
                    contribution *= -NEGATION_DAMPING;
                }
                score += contribution;
                boost = 1.0;
            }
            negation_left = negation_left.saturating_sub(1);
        }

        let exclamations = text.matches('!').count().min(3) as f64;
        score * (1.0 + EXCLAMATION_BOOST * exclamations)
    }

    /// p(positive) for `text`, clamped away from 0 and 1
    pub fn positive_probability(&self, text: &str) -> f64 {
        let logit = SCORE_SCALE * self.score(text);
        let p = 1.0 / (1.0 + (-logit).exp());
        p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
    }
}

/// `SentimentModel` backed by a `Lexicon`
pub struct LexiconModel {
    name: String,
    source: Option<PathBuf>,
    lexicon: OnceCell<Lexicon>,
    loaded: AtomicBool,
}

impl LexiconModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            lexicon: OnceCell::new(),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn with_lexicon_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            ..Self::new(name)
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        match &config.lexicon_path {
            Some(path) => Self::with_lexicon_file(config.model_name.clone(), path.clone()),
            None => Self::new(config.model_name.clone()),
        }
    }
}

#[async_trait]
impl SentimentModel for LexiconModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    async fn load(&self) -> Result<(), ClassifierError> {
        if self.lexicon.get().is_none() {
            let lexicon = match &self.source {
                Some(path) => Lexicon::from_file(path).await?,
                None => Lexicon::builtin(),
            };
            tracing::info!(
                model = %self.name,
                words = lexicon.words.len(),
                source = ?self.source,
                "lexicon loaded"
            );
            // a concurrent load may have won; either copy is identical
            let _ = self.lexicon.set(lexicon);
        }
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn unload(&self) {
        self.loaded.store(false, Ordering::Release);
    }

    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        if !self.is_loaded() {
            return Err(ClassifierError::ModelUnavailable);
        }
        let lexicon = self.lexicon.get().ok_or(ClassifierError::ModelUnavailable)?;
        if text.trim().is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let p_positive = lexicon.positive_probability(text);
        Ok(Prediction::from(Probabilities::from_positive(p_positive)))
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.name.clone(),
            device: "cpu".to_string(),
            status: if self.is_loaded() { "loaded" } else { "not_loaded" }.to_string(),
            framework: "lexicon".to_string(),
        }
    }
}
