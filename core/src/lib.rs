//! keypredict-core
//!
//! Autocorrect, word completion and next-word prediction for a multilingual
//! software keyboard. Works over Latin scripts and the major Indic scripts,
//! including Roman-typed input for transliterating languages.
//!
//! Public API:
//! - `Engine` - the service object callers construct once and share
//! - `DictionaryStore` - lazily loaded per-language dictionaries
//! - `Suggestion` / `Source` - ranked results and their provenance
//! - `LanguageDetector` - statistical language identification
//! - `Transliterator`, `LearningStore`, `AssetSource` - collaborator seams
//! - `Config` - tunable limits, thresholds and scoring weights
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod error;
pub use error::DictionaryError;

pub mod grapheme;
pub use grapheme::{segment, Script};

pub mod distance;
pub use distance::{character_distance, grapheme_distance};

pub mod keyboard;
pub use keyboard::KeyboardLayout;

pub mod language;
pub use language::LanguageProfile;

pub mod dictionary;
pub use dictionary::{Dictionary, LoadReport, NOT_FOUND_RANK};

pub mod assets;
pub use assets::{AssetKind, AssetSource, DirectoryAssets, MemoryAssets};

pub mod store;
pub use store::{DictionaryStore, LoadHandle, LoadOutcome};

pub mod detect;
pub use detect::LanguageDetector;

pub mod phonetic;

pub mod translit;
pub use translit::{TableTransliterator, Transliterator};

pub mod userdict;
pub use userdict::{InMemoryUserDict, LearningStore, RedbUserDict, UserDict};

pub mod candidate;
pub use candidate::{Source, Suggestion};

pub mod scorer;
pub use scorer::{ScoreInput, Scorer, ScoringWeights};

pub mod ranker;

pub mod generator;
pub use generator::{CandidateGenerator, RawCandidate};

pub mod predict;
pub use predict::{ContextSignals, Predictor, TextContext};

pub mod engine;
pub use engine::{Engine, EngineStats, SuggestionBatch};

/// Engine-wide configuration.
///
/// Every field has a working default; hosts usually only override the load
/// caps and, occasionally, the scoring weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    // Loading
    /// Maximum number of word-list entries kept per language
    pub max_words_per_language: usize,
    /// Maximum number of bigram (and trigram) entries kept per language
    pub max_ngrams_per_language: usize,

    // Candidate generation
    /// Largest edit distance at which a dictionary word is still a correction
    pub max_correction_distance: usize,
    /// Hard cap on raw candidates produced for one query, before scoring
    pub max_generated_candidates: usize,
    /// Number of prefix completions gathered on the dictionary path
    pub prefix_match_limit: usize,
    /// Number of dictionary words scanned for edit-distance neighbours
    pub neighbor_scan_limit: usize,
    /// Result count for front ends that let the user omit one
    pub default_suggestion_limit: usize,
    /// Score given to the transliterator's primary output
    pub primary_transliteration_score: f64,

    // Ranking
    /// Diminishing-returns factor applied when several sources agree on a word
    pub agreement_factor: f64,
    /// Merged predictions scoring below this are dropped
    pub min_prediction_score: f64,
    /// Scoring weights for correction candidates
    pub weights: ScoringWeights,

    // Language detection
    /// Minimum normalized confidence for a detection to be trusted
    pub min_detection_confidence: f64,
    /// Texts shorter than this (in chars) fall back to the default language
    pub min_detection_length: usize,
    /// Extra margin over `min_detection_confidence` required before suggesting a switch
    pub switch_margin: f64,
    /// Language returned when detection is not confident
    pub default_language: String,

    // Prediction
    /// Per-language common words used to pad short next-word lists
    pub fallback_words: BTreeMap<String, Vec<String>>,

    // Cache
    /// Maximum number of cached suggestion lists
    pub max_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let mut fallback_words = BTreeMap::new();
        fallback_words.insert(
            "en".to_string(),
            ["the", "and", "to", "a", "of", "in", "is", "it", "you", "that"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        );
        Self {
            max_words_per_language: 50_000,
            max_ngrams_per_language: 100_000,
            max_correction_distance: 2,
            max_generated_candidates: 50,
            prefix_match_limit: 20,
            neighbor_scan_limit: 1000,
            default_suggestion_limit: 5,
            primary_transliteration_score: 100.0,
            agreement_factor: 0.1,
            min_prediction_score: 0.1,
            weights: ScoringWeights::default(),
            min_detection_confidence: 0.6,
            min_detection_length: 3,
            switch_margin: 1.2,
            default_language: "en".to_string(),
            fallback_words,
            max_cache_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Fallback common words for a language, or the default language's list.
    pub fn fallback_words_for(&self, language: &str) -> &[String] {
        self.fallback_words
            .get(language)
            .or_else(|| self.fallback_words.get(&self.default_language))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the fallback list for one language.
    pub fn set_fallback_words(&mut self, language: &str, words: Vec<String>) {
        self.fallback_words.insert(language.to_string(), words);
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Normalize and lowercase a typed token or context word.
    pub fn normalize_token(s: &str) -> String {
        normalize(s).to_lowercase()
    }

    /// True if every char is printable ASCII (the Roman input range).
    pub fn is_roman_input(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| (' '..='~').contains(&c))
    }
}
