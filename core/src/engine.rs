// core/src/engine.rs
//
// The caller-facing service object. One `Engine` owns the dictionary store,
// the language detector and the optional collaborators, and is shared by
// reference between the keyboard's input and UI threads.

use ahash::AHashMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;
use tracing::{debug, info};

use crate::assets::{AssetSource, DirectoryAssets};
use crate::candidate::{Source, Suggestion};
use crate::detect::LanguageDetector;
use crate::dictionary::Dictionary;
use crate::distance::{character_distance, is_single_transposition};
use crate::error::DictionaryError;
use crate::generator::CandidateGenerator;
use crate::language::LanguageProfile;
use crate::predict::{ContextSignals, Predictor};
use crate::ranker;
use crate::scorer::{ScoreInput, Scorer};
use crate::store::{DictionaryStore, LoadHandle};
use crate::translit::Transliterator;
use crate::userdict::LearningStore;
use crate::utils;
use crate::Config;

/// Learned corrections shorter than this are ignored.
const MIN_LEARNED_TYPO_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    typed: String,
    context: Vec<String>,
    language: String,
    limit: usize,
    epoch: u64,
    learning_generation: u64,
}

/// Counters reported by `Engine::stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_entries: usize,
    pub loaded_languages: Vec<String>,
}

/// Suggestions tagged with the query generation that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionBatch {
    pub generation: u64,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct CorrectionsFile {
    corrections: BTreeMap<String, String>,
}

pub struct Engine {
    config: Config,
    store: DictionaryStore,
    detector: LanguageDetector,
    transliterator: Option<Arc<dyn Transliterator>>,
    learning: Option<Arc<dyn LearningStore>>,
    /// language -> typo -> correction, taught at runtime
    corrections: RwLock<AHashMap<String, AHashMap<String, String>>>,
    enabled: RwLock<Vec<String>>,
    cache: Mutex<LruCache<CacheKey, Vec<Suggestion>>>,
    generation: AtomicU64,
    queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("transliterator", &self.transliterator.is_some())
            .field("learning", &self.learning.is_some())
            .finish()
    }
}

impl Engine {
    /// Create an engine reading dictionaries from `source`. Nothing is
    /// loaded until `load_language` is called.
    pub fn new(config: Config, source: Arc<dyn AssetSource>) -> Self {
        let store = DictionaryStore::new(
            source,
            config.max_words_per_language,
            config.max_ngrams_per_language,
        );
        let detector = LanguageDetector::from_config(&config);
        let capacity = NonZeroUsize::new(config.max_cache_size).unwrap_or(NonZeroUsize::MIN);
        let enabled = vec![config.default_language.clone()];
        Self {
            config,
            store,
            detector,
            transliterator: None,
            learning: None,
            corrections: RwLock::new(AHashMap::new()),
            enabled: RwLock::new(enabled),
            cache: Mutex::new(LruCache::new(capacity)),
            generation: AtomicU64::new(0),
            queries: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    /// Engine over a directory of `{code}_words.txt`-style files.
    pub fn from_directory<P: AsRef<Path>>(config: Config, root: P) -> Self {
        Self::new(config, Arc::new(DirectoryAssets::new(root)))
    }

    pub fn with_transliterator(mut self, transliterator: Arc<dyn Transliterator>) -> Self {
        self.transliterator = Some(transliterator);
        self
    }

    pub fn with_learning_store(mut self, store: Arc<dyn LearningStore>) -> Self {
        self.learning = Some(store);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    fn cache(&self) -> MutexGuard<'_, LruCache<CacheKey, Vec<Suggestion>>> {
        self.cache.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ========== Loading ==========

    pub fn load_language(&self, code: &str) -> LoadHandle {
        self.store.load_language(code)
    }

    pub fn is_loaded(&self, code: &str) -> bool {
        self.store.is_loaded(code)
    }

    /// Drop a language's tables, cancelling an in-flight load.
    pub fn unload_language(&self, code: &str) -> bool {
        self.store.unload_language(code)
    }

    /// Languages considered for cross-language suggestions and switch hints.
    pub fn set_enabled_languages<I, S>(&self, languages: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list: Vec<String> = languages
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        *self.enabled.write().unwrap_or_else(|p| p.into_inner()) = list;
        self.clear_cache();
    }

    pub fn enabled_languages(&self) -> Vec<String> {
        self.enabled.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    // ========== Corrections ==========

    /// Teach a typo -> correction pair for one language.
    ///
    /// Pairs that only differ in case, and typos shorter than three chars,
    /// are ignored. Returns whether the pair was stored.
    pub fn learn_correction(&self, original: &str, corrected: &str, language: &str) -> bool {
        let original = utils::normalize_token(original);
        let corrected = utils::normalize_token(corrected);
        if original == corrected
            || corrected.is_empty()
            || original.chars().count() < MIN_LEARNED_TYPO_LEN
        {
            return false;
        }
        let lang = language.trim().to_lowercase();
        debug!(language = %lang, %original, %corrected, "learned correction");
        self.corrections
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .entry(lang)
            .or_default()
            .insert(original, corrected);
        self.clear_cache();
        true
    }

    /// Load corrections from a `{"corrections": {"typo": "fix", ...}}` document.
    pub fn load_corrections_json(&self, json: &str, language: &str) -> Result<usize, DictionaryError> {
        let file: CorrectionsFile = serde_json::from_str(json)?;
        let lang = language.trim().to_lowercase();
        let count = file.corrections.len();
        {
            let mut all = self.corrections.write().unwrap_or_else(|p| p.into_inner());
            let table = all.entry(lang.clone()).or_default();
            for (typo, fix) in file.corrections {
                table.insert(utils::normalize_token(&typo), utils::normalize(&fix));
            }
        }
        info!(language = %lang, count, "loaded corrections");
        self.clear_cache();
        Ok(count)
    }

    /// `load_corrections_json` on a file.
    pub fn load_corrections_file<P: AsRef<Path>>(&self, path: P, language: &str) -> Result<usize, DictionaryError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DictionaryError::io(path.as_ref().display().to_string(), e))?;
        self.load_corrections_json(&text, language)
    }

    fn learned_correction(&self, typo: &str, language: &str) -> Option<String> {
        self.corrections
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(language)
            .and_then(|t| t.get(typo).cloned())
    }

    // ========== Suggestions ==========

    /// Ranked corrections and completions for `typed`.
    ///
    /// `context` holds the preceding words, oldest first. Languages that are
    /// not loaded yield no dictionary suggestions.
    pub fn suggest(&self, typed: &str, context: &[String], language: &str, limit: usize) -> Vec<Suggestion> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        let typed = utils::normalize_token(typed);
        if typed.is_empty() || limit == 0 {
            return Vec::new();
        }
        let lang = language.trim().to_lowercase();
        let context: Vec<String> = context
            .iter()
            .map(|w| utils::normalize_token(w))
            .filter(|w| !w.is_empty())
            .collect();

        let key = CacheKey {
            typed: typed.clone(),
            context: context.clone(),
            language: lang.clone(),
            limit,
            epoch: self.store.epoch(),
            learning_generation: self.learning.as_deref().map(|s| s.generation()).unwrap_or(0),
        };
        if let Some(hit) = self.cache().get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return hit.clone();
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let started = Instant::now();
        let result = self.compute_suggestions(&typed, &context, &lang, limit);
        debug!(
            language = %lang,
            typed = %typed,
            results = result.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "suggest"
        );
        self.cache().put(key, result.clone());
        result
    }

    fn compute_suggestions(&self, typed: &str, context: &[String], lang: &str, limit: usize) -> Vec<Suggestion> {
        let profile = LanguageProfile::or_default(lang);
        let dictionary = self.store.dictionary(lang);
        let learning = self.learning.as_deref();

        let learned = self.corrections.read().unwrap_or_else(|p| p.into_inner());
        let raw = CandidateGenerator::new(&self.config, &profile, dictionary.as_deref())
            .with_transliterator(self.transliterator.as_deref())
            .with_learning(learning)
            .with_learned_corrections(learned.get(lang))
            .generate(typed);
        drop(learned);

        let scorer = Scorer::new(&self.config.weights, dictionary.as_deref(), learning);
        let mut scored: Vec<Suggestion> = raw
            .into_iter()
            .map(|c| {
                let score = c.fixed_score.unwrap_or_else(|| {
                    scorer.score(&ScoreInput {
                        candidate: &c.word,
                        typed: c.scored_against.as_deref().unwrap_or(typed),
                        context,
                        profile: &profile,
                        edit_distance: c.edit_distance,
                        via_transliteration: c.via_transliteration,
                        exact: c.exact,
                    })
                });
                Suggestion::new(c.word, score, c.source, c.edit_distance)
            })
            .collect();

        if let Some(dict) = dictionary.as_deref() {
            if let Some(s) = self.cross_language(typed, context, dict) {
                scored.push(s);
            }
        }
        ranker::aggregate(scored, limit, self.config.agreement_factor, None)
    }

    /// A word the target dictionary lacks but another enabled language has.
    fn cross_language(&self, typed: &str, context: &[String], dict: &Dictionary) -> Option<Suggestion> {
        if dict.contains(typed) {
            return None;
        }
        let other = self.detector.detect_word_language(typed)?;
        if other == dict.language() || !self.enabled_languages().contains(&other) {
            return None;
        }
        let other_dict = self.store.dictionary(&other)?;
        if !other_dict.contains(typed) {
            return None;
        }
        let profile = LanguageProfile::or_default(&other);
        let score = Scorer::new(&self.config.weights, Some(other_dict.as_ref()), self.learning.as_deref()).score(
            &ScoreInput {
                candidate: typed,
                typed,
                context,
                profile: &profile,
                edit_distance: 0,
                via_transliteration: false,
                exact: false,
            },
        );
        debug!(word = typed, language = %other, "cross-language match");
        Some(Suggestion::new(typed, score, Source::CrossLanguage, 0))
    }

    /// Start a new query generation. Results tagged with an older
    /// generation are stale once this returns.
    pub fn begin_query(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// `suggest` under a fresh query generation.
    pub fn suggest_batch(&self, typed: &str, context: &[String], language: &str, limit: usize) -> SuggestionBatch {
        let generation = self.begin_query();
        SuggestionBatch {
            generation,
            suggestions: self.suggest(typed, context, language, limit),
        }
    }

    /// The single best replacement for `input`, unless the user rejected it.
    pub fn best_suggestion(&self, input: &str, language: &str) -> Option<String> {
        let typed = utils::normalize_token(input);
        let lang = language.trim().to_lowercase();
        let best = self.suggest(&typed, &[], &lang, 1).into_iter().next()?;
        let rejected = self
            .learning
            .as_deref()
            .map(|s| s.is_blacklisted(&lang, &typed, &best.word))
            .unwrap_or(false);
        if rejected {
            debug!(typed = %typed, word = %best.word, "best suggestion blacklisted");
            return None;
        }
        Some(best.word)
    }

    /// How sure the engine is that `suggestion` is what the user meant by
    /// `input`, in `[0, 1]`.
    pub fn confidence(&self, input: &str, suggestion: &str, language: &str) -> f64 {
        let input = utils::normalize_token(input);
        let suggestion = utils::normalize_token(suggestion);
        if input.is_empty() || suggestion.is_empty() {
            return 0.0;
        }
        if input == suggestion {
            return 1.0;
        }
        let lang = language.trim().to_lowercase();
        let known = self.learned_correction(&input, &lang).or_else(|| self.store.direct_correction(&lang, &input));
        if known.as_deref() == Some(suggestion.as_str()) {
            return 0.8;
        }
        if is_single_transposition(&input, &suggestion) {
            return 0.85;
        }

        let input_len = input.chars().count();
        let suggestion_len = suggestion.chars().count();
        let distance = character_distance(&input, &suggestion);
        let base = 1.0 - distance as f64 / input_len.max(suggestion_len) as f64;
        let typo_bonus = match distance {
            1 if input_len == suggestion_len => 0.3,
            1 => 0.2,
            2 if input_len >= 4 => 0.15,
            _ => 0.0,
        };
        let length_penalty = if input_len.abs_diff(suggestion_len) > 2 { 0.1 } else { 0.0 };
        (base + typo_bonus - length_penalty).clamp(0.0, 1.0)
    }

    // ========== Prediction ==========

    fn predictor<'a>(&'a self, lang: &'a str, dictionary: Option<&'a Dictionary>) -> Predictor<'a> {
        Predictor::new(&self.config, lang, dictionary).with_learning(self.learning.as_deref())
    }

    /// Words likely to follow `previous`.
    pub fn next_word_predictions(&self, language: &str, previous: &[String], limit: usize) -> Vec<Suggestion> {
        let lang = language.trim().to_lowercase();
        let dictionary = self.store.dictionary(&lang);
        self.predictor(&lang, dictionary.as_deref())
            .next_words(previous, limit)
    }

    /// Completions of a partial word.
    pub fn complete(&self, prefix: &str, language: &str, limit: usize) -> Vec<Suggestion> {
        let lang = language.trim().to_lowercase();
        let dictionary = self.store.dictionary(&lang);
        let raw = self.predictor(&lang, dictionary.as_deref()).completions(prefix);
        ranker::aggregate(
            raw,
            limit,
            self.config.agreement_factor,
            Some(self.config.min_prediction_score),
        )
    }

    /// Completions and context predictions for the word being typed.
    pub fn predictions(&self, current: &str, previous: &[String], language: &str, limit: usize) -> Vec<Suggestion> {
        let lang = language.trim().to_lowercase();
        let dictionary = self.store.dictionary(&lang);
        self.predictor(&lang, dictionary.as_deref())
            .predictions(current, previous, limit)
    }

    /// Predictions at char offset `cursor` of `text`.
    pub fn contextual_predictions(&self, text: &str, cursor: usize, language: &str, limit: usize) -> Vec<Suggestion> {
        let lang = language.trim().to_lowercase();
        let dictionary = self.store.dictionary(&lang);
        self.predictor(&lang, dictionary.as_deref())
            .contextual(text, cursor, limit)
    }

    /// Predictions adjusted for typing speed and time of day.
    pub fn smart_predictions(
        &self,
        current: &str,
        previous: &[String],
        language: &str,
        signals: &ContextSignals,
        limit: usize,
    ) -> Vec<Suggestion> {
        let lang = language.trim().to_lowercase();
        let dictionary = self.store.dictionary(&lang);
        self.predictor(&lang, dictionary.as_deref())
            .smart(current, previous, signals, limit)
    }

    // ========== Language detection ==========

    pub fn detect_language(&self, text: &str) -> String {
        self.detector.detect_language(text)
    }

    pub fn language_confidences(&self, text: &str) -> BTreeMap<String, f64> {
        self.detector.confidences(text)
    }

    /// An enabled language to switch to, judging by recently typed text.
    pub fn suggest_language_switch(&self, recent_text: &str, current: &str) -> Option<String> {
        let enabled = self.enabled_languages();
        self.detector
            .suggest_switch(recent_text, &current.trim().to_lowercase(), &enabled)
    }

    // ========== Cache ==========

    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cached_entries: self.cache().len(),
            loaded_languages: self.store.loaded_languages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, MemoryAssets};
    use crate::userdict::InMemoryUserDict;

    fn engine() -> Engine {
        let assets = MemoryAssets::new()
            .with("en", AssetKind::Words, "the 1\nhello 10\nhelp 5\nworld 30\n")
            .with("en", AssetKind::Bigrams, "hello world 20\n");
        let e = Engine::new(Config::default(), Arc::new(assets));
        assert!(e.load_language("en").wait().is_success());
        e
    }

    #[test]
    fn repeated_query_hits_cache() {
        let e = engine();
        let a = e.suggest("helo", &[], "en", 5);
        let b = e.suggest("helo", &[], "en", 5);
        assert_eq!(a, b);
        let stats = e.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cached_entries, 1);

        e.clear_cache();
        assert_eq!(e.stats().cached_entries, 0);
    }

    #[test]
    fn learned_correction_becomes_direct_suggestion() {
        let e = engine();
        assert!(e.learn_correction("wrold", "world", "en"));
        let out = e.suggest("wrold", &[], "en", 5);
        assert_eq!(out[0].word, "world");
        assert_eq!(out[0].source, Source::Direct);

        assert!(!e.learn_correction("ab", "abc", "en"));
        assert!(!e.learn_correction("Hello", "hello", "en"));
    }

    #[test]
    fn corrections_json() {
        let e = engine();
        let n = e
            .load_corrections_json(r#"{"corrections": {"Teh": "the", "hte": "the"}}"#, "en")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(e.suggest("teh", &[], "en", 5)[0].word, "the");
        assert!(e.load_corrections_json("{\"nope\": 1}", "en").is_err());
    }

    #[test]
    fn confidence_levels() {
        let e = engine();
        assert_eq!(e.confidence("hello", "Hello", "en"), 1.0);
        assert_eq!(e.confidence("", "hello", "en"), 0.0);
        assert_eq!(e.confidence("teh", "the", "en"), 0.85);
        e.learn_correction("plz", "please", "en");
        assert_eq!(e.confidence("plz", "please", "en"), 0.8);
        // one substitution in five letters: 0.8 + 0.3, clamped
        assert_eq!(e.confidence("hallo", "hello", "en"), 1.0);
        let far = e.confidence("xyz", "hello", "en");
        assert!(far < 0.5);
    }

    #[test]
    fn best_suggestion_respects_blacklist() {
        let store = Arc::new(InMemoryUserDict::new());
        let assets = MemoryAssets::new().with("en", AssetKind::Words, "hello 1\n");
        let e = Engine::new(Config::default(), Arc::new(assets)).with_learning_store(store.clone());
        e.load_language("en").wait();
        assert_eq!(e.best_suggestion("helo", "en").as_deref(), Some("hello"));

        store.blacklist_correction("en", "helo", "hello");
        assert_eq!(e.best_suggestion("helo", "en"), None);
    }

    #[test]
    fn learning_store_writes_invalidate_cached_suggestions() {
        let store = Arc::new(InMemoryUserDict::new());
        let assets = MemoryAssets::new()
            .with("en", AssetKind::Words, "the 1
")
            .with("en", AssetKind::Corrections, "teh the
");
        let e = Engine::new(Config::default(), Arc::new(assets)).with_learning_store(store.clone());
        e.load_language("en").wait();
        assert_eq!(e.suggest("teh", &[], "en", 5)[0].source, Source::Direct);

        store.blacklist_correction("en", "teh", "the");
        let out = e.suggest("teh", &[], "en", 5);
        assert!(out.iter().all(|s| s.source != Source::Direct));
        assert_eq!(e.best_suggestion("teh", "en"), None);
        assert_eq!(e.stats().cache_hits, 0);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        let e = engine();
        assert!(e.suggest("hel", &[], "en", 0).is_empty());
        assert!(e.next_word_predictions("en", &[], 0).is_empty());
        assert!(e.complete("he", "en", 0).is_empty());
        assert!(e.predictions("he", &[], "en", 0).is_empty());
        assert!(e.contextual_predictions("say he", 6, "en", 0).is_empty());
    }

    #[test]
    fn transliterated_candidates_are_scored_in_native_script() {
        struct Fixed;
        impl Transliterator for Fixed {
            fn transliterate(&self, _roman: &str, _language: &str) -> Option<String> {
                Some("नमस्ते".to_string())
            }
        }
        // both one grapheme from the transliteration, at the same rank;
        // only the first matches its length
        let assets = MemoryAssets::new().with("hi", AssetKind::Words, "नमस्त 10
नमस्तेजी 10
");
        let e = Engine::new(Config::default(), Arc::new(assets)).with_transliterator(Arc::new(Fixed));
        assert!(e.load_language("hi").wait().is_success());

        let out = e.suggest("namaste", &[], "hi", 5);
        assert!(out.iter().any(|s| s.word == "नमस्ते" && s.source == Source::Transliteration));
        let pos = |w: &str| out.iter().position(|s| s.word == w).expect("native neighbour");
        assert!(pos("नमस्त") < pos("नमस्तेजी"));
        assert_eq!(out[pos("नमस्त")].edit_distance, 1);
        assert_eq!(out[pos("नमस्तेजी")].edit_distance, 1);
    }

    #[test]
    fn generations_mark_stale_results() {
        let e = engine();
        let first = e.suggest_batch("hel", &[], "en", 3);
        assert!(e.is_current(first.generation));
        let second = e.begin_query();
        assert!(!e.is_current(first.generation));
        assert!(e.is_current(second));
    }

    #[test]
    fn unloaded_language_is_empty() {
        let e = engine();
        assert!(e.suggest("hola", &[], "es", 5).is_empty());
        assert!(e.suggest("", &[], "en", 5).is_empty());
        assert!(e.unload_language("en"));
        assert!(e.suggest("helo", &[], "en", 5).is_empty());
    }
}
