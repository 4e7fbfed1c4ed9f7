// core/tests/prediction.rs
//
// Integration tests for completion and next-word prediction.
//
// Tests cover:
// - next-word predictions from bigrams and trigrams
// - fallback padding when n-gram data is short
// - completions from dictionary and learned words
// - cursor-based contextual prediction
// - typing-speed and time-of-day adjustments

use keypredict_core::predict::{parse_context, FALLBACK_SCORE, MAX_PREDICTIONS};
use keypredict_core::{
    AssetKind, Config, ContextSignals, Engine, InMemoryUserDict, MemoryAssets, Source,
};
use std::sync::Arc;

fn words(v: &[keypredict_core::Suggestion]) -> Vec<&str> {
    v.iter().map(|s| s.word.as_str()).collect()
}

fn engine_with(store: Option<Arc<InMemoryUserDict>>) -> Engine {
    let assets = MemoryAssets::new()
        .with(
            "en",
            AssetKind::Words,
            "the 1\nhow 20\nare 8\nyou 3\ngood 60\nmorning 200\nmore 90\nmost 95\n",
        )
        .with("en", AssetKind::Bigrams, "how are 800\ngood morning 300\nare you 50\nare we 5\n")
        .with("en", AssetKind::Trigrams, "how are you 400\n");
    let mut e = Engine::new(Config::default(), Arc::new(assets));
    if let Some(store) = store {
        e = e.with_learning_store(store);
    }
    assert!(e.load_language("en").wait().is_success());
    e
}

#[test]
fn bigram_next_word() {
    let e = engine_with(None);
    let out = e.next_word_predictions("en", &["good".to_string()], 3);
    assert_eq!(out[0].word, "morning");
    assert_eq!(out[0].source, Source::Bigram);
    assert!(!out[0].is_correction);
    assert_eq!(out.len(), 3);
}

#[test]
fn trigram_beats_bigram_for_same_context() {
    let e = engine_with(None);
    let previous = vec!["how".to_string(), "are".to_string()];
    let out = e.next_word_predictions("en", &previous, 5);
    assert_eq!(out[0].word, "you");
    assert_eq!(out[0].source, Source::Trigram);
    let we = out.iter().position(|s| s.word == "we").expect("bigram follower");
    assert!(we > 0);
}

#[test]
fn empty_context_pads_with_fallback_words() {
    let e = engine_with(None);
    let out = e.next_word_predictions("en", &[], 4);
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|s| s.source == Source::Common && s.score == FALLBACK_SCORE));
    let fallback = &Config::default().fallback_words["en"];
    assert!(out.iter().all(|s| fallback.contains(&s.word)));
}

#[test]
fn unloaded_language_still_gets_fallback() {
    let e = engine_with(None);
    let out = e.next_word_predictions("xx", &["anything".to_string()], 2);
    assert_eq!(out.len(), 2);
}

#[test]
fn completion_ranks_frequent_words_first() {
    let e = engine_with(None);
    let out = e.complete("mo", "en", 5);
    assert_eq!(words(&out)[..3], ["more", "most", "morning"]);
    assert!(out.iter().all(|s| s.source == Source::Completion));
}

#[test]
fn learned_words_complete_and_predict() {
    let store = Arc::new(InMemoryUserDict::new());
    store.learn_with_count("en", "mojito", 40);
    store.learn_bigram("en", "good", "night");
    let e = engine_with(Some(store));

    let out = e.complete("mo", "en", 8);
    assert!(out
        .iter()
        .any(|s| s.word == "mojito" && s.source == Source::UserCompletion));

    let out = e.next_word_predictions("en", &["good".to_string()], 5);
    assert!(out
        .iter()
        .any(|s| s.word == "night" && s.source == Source::UserLearned));
}

#[test]
fn predictions_merge_sources_and_cap() {
    let e = engine_with(None);
    let out = e.predictions("yo", &["how".to_string(), "are".to_string()], "en", 20);
    assert_eq!(out[0].word, "you");
    assert!(out.len() <= MAX_PREDICTIONS);
    assert!(out.iter().all(|s| s.score >= Config::default().min_prediction_score));
}

#[test]
fn contextual_predictions_use_cursor() {
    let e = engine_with(None);
    let text = "Fine thanks. How are y";
    let ctx = parse_context(text, text.chars().count());
    assert_eq!(ctx.current_word, "y");
    assert_eq!(ctx.previous_words, vec!["how", "are"]);

    let out = e.contextual_predictions(text, text.chars().count(), "en", 3);
    assert_eq!(out[0].word, "you");
}

#[test]
fn morning_signals_boost_greetings() {
    let e = engine_with(None);
    let previous = vec!["good".to_string()];
    let plain = e.predictions("", &previous, "en", 5);
    let smart = e.smart_predictions("", &previous, "en", &ContextSignals::new(200, 8), 5);

    let score = |v: &[keypredict_core::Suggestion], w: &str| {
        v.iter().find(|s| s.word == w).map(|s| s.score).unwrap_or(0.0)
    };
    assert!((score(&smart, "morning") - score(&plain, "morning") * 1.2).abs() < 1e-9);
}
