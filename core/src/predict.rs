//! Word completion and next-word prediction.
//!
//! Prediction scores live on a different scale from correction scores: every
//! source produces a value around `0.3..2.0` and the merged list is cut at
//! `Config::min_prediction_score`.
//!
//! Sources:
//! - dictionary completions, priced by prefix coverage and frequency rank
//! - learned-word completions from the learning store
//! - bigram followers of the last word and trigram followers of the last two
//! - learned bigrams from the learning store
//! - a per-language fallback list, used only to pad short next-word lists

use tracing::debug;

use crate::candidate::{Source, Suggestion};
use crate::dictionary::{Dictionary, NOT_FOUND_RANK};
use crate::grapheme;
use crate::ranker;
use crate::scorer::frequency_term;
use crate::userdict::LearningStore;
use crate::utils;
use crate::Config;

/// Dictionary completions gathered per query.
const COMPLETION_LIMIT: usize = 15;
/// Learned-word completions gathered per query.
const USER_COMPLETION_LIMIT: usize = 5;
const BIGRAM_LIMIT: usize = 10;
const TRIGRAM_LIMIT: usize = 8;
const USER_LIMIT: usize = 8;
/// Upper bound on the merged prediction list.
pub const MAX_PREDICTIONS: usize = 8;
/// Score given to padding words from the fallback list.
pub const FALLBACK_SCORE: f64 = 0.3;
/// Dictionary words ranked below this count as common.
const COMMON_RANK: u32 = 100;

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Share of `word` already typed, `0.3` at most. Zero without a prefix.
fn length_bonus(prefix: &str, word: &str) -> f64 {
    if prefix.is_empty() {
        return 0.0;
    }
    let word_len = char_len(word).max(1);
    (char_len(prefix) as f64 / word_len as f64).min(0.3)
}

fn coverage(prefix: &str, word: &str) -> f64 {
    char_len(prefix) as f64 / char_len(word).max(1) as f64
}

fn completion_score(prefix: &str, word: &str, rank: u32) -> f64 {
    let frequency = frequency_term(rank) / 100.0;
    let common = if rank != NOT_FOUND_RANK && rank < COMMON_RANK {
        0.2
    } else {
        0.0
    };
    coverage(prefix, word) * 0.3 + frequency * 0.5 + common + 0.2
}

fn user_completion_score(prefix: &str, word: &str, count: u64) -> f64 {
    let frequency = (count as f64 / 100.0).min(1.0);
    coverage(prefix, word) * 0.3 + frequency * 0.4 + 0.3 + 0.3
}

fn bigram_score(count: u32, prefix: &str, word: &str) -> f64 {
    (count as f64 / 1000.0).min(1.0) + length_bonus(prefix, word) + 0.4
}

fn trigram_score(count: u32, prefix: &str, word: &str) -> f64 {
    (count as f64 / 500.0).min(1.0) + length_bonus(prefix, word) + 0.6
}

fn user_score(count: u64, prefix: &str, word: &str) -> f64 {
    (count as f64 / 100.0).min(1.0) + 0.3 + length_bonus(prefix, word) + 0.3
}

const MORNING_WORDS: &[&str] = &["good", "morning", "hello", "hi"];
const AFTERNOON_WORDS: &[&str] = &["lunch", "meeting", "work"];
const EVENING_WORDS: &[&str] = &["dinner", "evening", "night", "bye"];

/// Signals about how and when the user is typing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContextSignals {
    /// Average milliseconds between keystrokes
    pub typing_speed: Option<u64>,
    /// Local hour of day, 0-23
    pub hour: Option<u8>,
}

impl ContextSignals {
    pub fn new(typing_speed: u64, hour: u8) -> Self {
        Self {
            typing_speed: Some(typing_speed),
            hour: Some(hour),
        }
    }

    /// Score multiplier for one word.
    pub fn multiplier(&self, word: &str) -> f64 {
        let mut m = 1.0;
        match self.typing_speed {
            Some(ms) if ms < 100 => m *= 1.1,
            Some(ms) if ms > 300 => m *= 0.9,
            _ => {}
        }
        let (words, boost) = match self.hour {
            Some(6..=11) => (MORNING_WORDS, 1.2),
            Some(12..=17) => (AFTERNOON_WORDS, 1.1),
            Some(18..=23) => (EVENING_WORDS, 1.2),
            _ => return m,
        };
        if words.contains(&word) {
            m *= boost;
        }
        m
    }

    /// Rescale and re-sort a ranked list.
    pub fn apply(&self, mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
        for s in suggestions.iter_mut() {
            s.score *= self.multiplier(&s.word);
        }
        suggestions.sort_by(ranker::compare);
        suggestions
    }
}

/// The words around a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextContext {
    /// Word being typed at the cursor, possibly empty
    pub current_word: String,
    /// Completed words of the current sentence, oldest first
    pub previous_words: Vec<String>,
    /// Every word of the current sentence up to the cursor
    pub all_words: Vec<String>,
}

fn clean_word(word: &str) -> String {
    word.chars()
        .filter(|&c| c.is_alphanumeric() || c == '_' || grapheme::is_combining_mark(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split `text` around `cursor` (a char offset, clamped to the text).
///
/// Only the sentence containing the cursor is considered; sentences end at
/// `.`, `!` or `?`. Punctuation is stripped from words and they are
/// lowercased.
pub fn parse_context(text: &str, cursor: usize) -> TextContext {
    let end = text
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let before = &text[..end];
    if before.is_empty() {
        return TextContext::default();
    }

    let sentence_start = before
        .rfind(|c: char| matches!(c, '.' | '!' | '?'))
        .map(|i| i + 1)
        .unwrap_or(0);
    let all_words: Vec<String> = before[sentence_start..]
        .split_whitespace()
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .collect();

    let tail = match before.rfind(' ') {
        Some(i) => &before[i + 1..],
        None => before,
    };
    let current_word = clean_word(tail);

    let mut previous_words = all_words.clone();
    if previous_words.last() == Some(&current_word) {
        previous_words.pop();
    }
    TextContext {
        current_word,
        previous_words,
        all_words,
    }
}

/// Predictions for one language.
pub struct Predictor<'a> {
    config: &'a Config,
    language: &'a str,
    dictionary: Option<&'a Dictionary>,
    learning: Option<&'a dyn LearningStore>,
}

impl<'a> Predictor<'a> {
    pub fn new(config: &'a Config, language: &'a str, dictionary: Option<&'a Dictionary>) -> Self {
        Self {
            config,
            language,
            dictionary,
            learning: None,
        }
    }

    pub fn with_learning(mut self, store: Option<&'a dyn LearningStore>) -> Self {
        self.learning = store;
        self
    }

    /// Unmerged completions of `prefix` from the dictionary and the learning store.
    pub fn completions(&self, prefix: &str) -> Vec<Suggestion> {
        let prefix = utils::normalize_token(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        if let Some(dict) = self.dictionary {
            for (word, rank) in dict.prefix_matches(&prefix, COMPLETION_LIMIT) {
                let score = completion_score(&prefix, &word, rank);
                out.push(Suggestion::prediction(word, score, Source::Completion));
            }
        }
        if let Some(store) = self.learning {
            for (word, count) in store.words_with_prefix(self.language, &prefix, USER_COMPLETION_LIMIT) {
                let score = user_completion_score(&prefix, &word, count);
                out.push(Suggestion::prediction(word, score, Source::UserCompletion));
            }
        }
        out
    }

    /// Followers of the last word that start with `prefix`.
    pub fn bigram_predictions(&self, previous: &[String], prefix: &str) -> Vec<Suggestion> {
        let (Some(dict), Some(last)) = (self.dictionary, previous.last()) else {
            return Vec::new();
        };
        dict.bigram_followers(last)
            .iter()
            .filter(|e| e.word.starts_with(prefix))
            .take(BIGRAM_LIMIT)
            .map(|e| {
                let score = bigram_score(e.count, prefix, &e.word);
                Suggestion::prediction(e.word.clone(), score, Source::Bigram)
            })
            .collect()
    }

    /// Followers of the last two words that start with `prefix`.
    pub fn trigram_predictions(&self, previous: &[String], prefix: &str) -> Vec<Suggestion> {
        let n = previous.len();
        let Some(dict) = self.dictionary.filter(|_| n >= 2) else {
            return Vec::new();
        };
        dict.trigram_followers(&previous[n - 2], &previous[n - 1])
            .iter()
            .filter(|e| e.word.starts_with(prefix))
            .take(TRIGRAM_LIMIT)
            .map(|e| {
                let score = trigram_score(e.count, prefix, &e.word);
                Suggestion::prediction(e.word.clone(), score, Source::Trigram)
            })
            .collect()
    }

    /// Learned words matching `prefix`, or the most used ones without a prefix.
    pub fn learned_word_predictions(&self, prefix: &str) -> Vec<Suggestion> {
        let Some(store) = self.learning else {
            return Vec::new();
        };
        let words = if prefix.is_empty() {
            store.top_words(self.language, USER_LIMIT)
        } else {
            store.words_with_prefix(self.language, prefix, USER_LIMIT)
        };
        words
            .into_iter()
            .map(|(word, count)| {
                let score = user_score(count, prefix, &word);
                Suggestion::prediction(word, score, Source::UserLearned)
            })
            .collect()
    }

    /// Words the user has typed after the last word.
    pub fn learned_follower_predictions(&self, previous: &[String], prefix: &str) -> Vec<Suggestion> {
        let (Some(store), Some(last)) = (self.learning, previous.last()) else {
            return Vec::new();
        };
        store
            .learned_followers(self.language, last, USER_LIMIT)
            .into_iter()
            .filter(|(word, _)| word.starts_with(prefix))
            .map(|(word, count)| {
                let score = user_score(count, prefix, &word);
                Suggestion::prediction(word, score, Source::UserLearned)
            })
            .collect()
    }

    /// Completions and context predictions for the word being typed, merged.
    pub fn predictions(&self, current: &str, previous: &[String], limit: usize) -> Vec<Suggestion> {
        let current = utils::normalize_token(current);
        let previous: Vec<String> = previous.iter().map(|w| utils::normalize_token(w)).collect();

        let mut all = self.completions(&current);
        all.extend(self.bigram_predictions(&previous, &current));
        all.extend(self.trigram_predictions(&previous, &current));
        all.extend(self.learned_word_predictions(&current));
        all.extend(self.learned_follower_predictions(&previous, &current));
        debug!(language = self.language, current = %current, raw = all.len(), "predictions");

        let limit = limit.min(MAX_PREDICTIONS);
        ranker::aggregate(
            all,
            limit,
            self.config.agreement_factor,
            Some(self.config.min_prediction_score),
        )
    }

    /// Words likely to follow `previous`, padded from the fallback list.
    pub fn next_words(&self, previous: &[String], limit: usize) -> Vec<Suggestion> {
        let previous: Vec<String> = previous.iter().map(|w| utils::normalize_token(w)).collect();

        let mut all: Vec<Suggestion> = self.bigram_predictions(&previous, "");
        all.truncate(limit);
        let mut trigrams = self.trigram_predictions(&previous, "");
        trigrams.truncate(limit);
        all.extend(trigrams);
        all.extend(self.learned_follower_predictions(&previous, ""));

        let mut out = ranker::aggregate(
            all,
            limit,
            self.config.agreement_factor,
            Some(self.config.min_prediction_score),
        );
        for word in self.config.fallback_words_for(self.language) {
            if out.len() >= limit {
                break;
            }
            if !out.iter().any(|s| &s.word == word) {
                out.push(Suggestion::prediction(word.clone(), FALLBACK_SCORE, Source::Common));
            }
        }
        out.sort_by(ranker::compare);
        out
    }

    /// Predictions at a cursor position inside `text`.
    pub fn contextual(&self, text: &str, cursor: usize, limit: usize) -> Vec<Suggestion> {
        let ctx = parse_context(text, cursor);
        self.predictions(&ctx.current_word, &ctx.previous_words, limit)
    }

    /// `predictions` adjusted for typing speed and time of day.
    pub fn smart(
        &self,
        current: &str,
        previous: &[String],
        signals: &ContextSignals,
        limit: usize,
    ) -> Vec<Suggestion> {
        signals.apply(self.predictions(current, previous, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryBuilder;
    use crate::userdict::InMemoryUserDict;
    use std::io::Cursor;

    fn dict() -> Dictionary {
        let mut b = DictionaryBuilder::new("en");
        b.read_words(Cursor::new(
            "the 1\nhello 10\nhelp 5\nhelmet 300\nworld 30\nthere 40\nhow 20\nare 8\nyou 3\n",
        ))
        .unwrap();
        b.read_bigrams(Cursor::new("hello world 120\nhello there 40\nhow are 500\n"))
            .unwrap();
        b.read_trigrams(Cursor::new("how are you 300\n")).unwrap();
        b.build().unwrap()
    }

    fn words(v: &[Suggestion]) -> Vec<&str> {
        v.iter().map(|s| s.word.as_str()).collect()
    }

    #[test]
    fn completions_cover_dictionary_and_learned_words() {
        let cfg = Config::default();
        let d = dict();
        let store = InMemoryUserDict::new();
        store.learn_with_count("en", "helicopter", 3);
        let p = Predictor::new(&cfg, "en", Some(&d)).with_learning(Some(&store));

        let c = p.completions("hel");
        assert!(c.iter().any(|s| s.word == "hello" && s.source == Source::Completion));
        assert!(c
            .iter()
            .any(|s| s.word == "helicopter" && s.source == Source::UserCompletion));
        assert!(p.completions("").is_empty());
    }

    #[test]
    fn frequent_completion_scores_higher() {
        let hello = completion_score("hel", "hello", 10);
        let helmet = completion_score("hel", "helmet", 300);
        assert!(hello > helmet);
    }

    #[test]
    fn trigram_outranks_bigram() {
        let cfg = Config::default();
        let d = dict();
        let p = Predictor::new(&cfg, "en", Some(&d));
        let previous = vec!["how".to_string(), "are".to_string()];
        let out = p.next_words(&previous, 5);
        assert_eq!(out[0].word, "you");
        assert_eq!(out[0].source, Source::Trigram);
    }

    #[test]
    fn next_words_follow_bigrams_then_pad() {
        let cfg = Config::default();
        let d = dict();
        let p = Predictor::new(&cfg, "en", Some(&d));
        let out = p.next_words(&["hello".to_string()], 5);
        assert_eq!(&words(&out)[..2], &["world", "there"]);
        assert_eq!(out.len(), 5);
        assert!(out[2..].iter().all(|s| s.source == Source::Common));
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn no_context_gives_fallback_words() {
        let cfg = Config::default();
        let p = Predictor::new(&cfg, "en", None);
        let out = p.next_words(&[], 3);
        assert_eq!(words(&out), vec!["and", "the", "to"]);
        assert!(out.iter().all(|s| s.score == FALLBACK_SCORE));
    }

    #[test]
    fn configured_fallback_list_is_used() {
        let mut cfg = Config::default();
        cfg.set_fallback_words("hi", vec!["है".to_string(), "और".to_string()]);
        let p = Predictor::new(&cfg, "hi", None);
        let out = p.next_words(&[], 5);
        assert_eq!(out.len(), 2);
        assert!(out.iter().any(|s| s.word == "है"));
    }

    #[test]
    fn learned_followers_are_predicted() {
        let cfg = Config::default();
        let d = dict();
        let store = InMemoryUserDict::new();
        store.learn_bigram("en", "hello", "friend");
        let p = Predictor::new(&cfg, "en", Some(&d)).with_learning(Some(&store));
        let out = p.next_words(&["hello".to_string()], 5);
        assert!(out
            .iter()
            .any(|s| s.word == "friend" && s.source == Source::UserLearned));
    }

    #[test]
    fn prefix_filters_followers() {
        let cfg = Config::default();
        let d = dict();
        let p = Predictor::new(&cfg, "en", Some(&d));
        let out = p.predictions("th", &["hello".to_string()], 5);
        assert_eq!(out[0].word, "there");
        assert!(out.iter().all(|s| s.word.starts_with("th")));
        assert!(out.len() <= MAX_PREDICTIONS);
    }

    #[test]
    fn parse_context_uses_current_sentence() {
        let text = "I went home. How are yo";
        let ctx = parse_context(text, text.chars().count());
        assert_eq!(ctx.current_word, "yo");
        assert_eq!(ctx.previous_words, vec!["how", "are"]);
        assert_eq!(ctx.all_words, vec!["how", "are", "yo"]);

        let ctx = parse_context("Hello, world! ", 14);
        assert_eq!(ctx.current_word, "");
        assert!(ctx.previous_words.is_empty());

        let ctx = parse_context("say hello there", 9);
        assert_eq!(ctx.current_word, "hello");
        assert_eq!(ctx.previous_words, vec!["say"]);

        assert_eq!(parse_context("", 4), TextContext::default());
    }

    #[test]
    fn signals_boost_time_of_day_words() {
        let morning = ContextSignals {
            typing_speed: None,
            hour: Some(8),
        };
        assert!((morning.multiplier("morning") - 1.2).abs() < 1e-9);
        assert_eq!(morning.multiplier("dinner"), 1.0);

        let fast_at_night = ContextSignals::new(50, 3);
        assert!((fast_at_night.multiplier("anything") - 1.1).abs() < 1e-9);
        let slow_evening = ContextSignals::new(400, 19);
        assert!((slow_evening.multiplier("night") - 0.9 * 1.2).abs() < 1e-9);
    }
}
