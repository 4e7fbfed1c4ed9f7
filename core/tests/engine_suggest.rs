// core/tests/engine_suggest.rs
//
// End-to-end suggestion tests through the public Engine API.
//
// Tests cover:
// - typo correction ranks single edits above double edits
// - exact dictionary words come first and are not corrections
// - result limits and score ordering
// - bigram context boosts
// - transliteration for Roman-typed Hindi
// - grapheme distance for native-script typos
// - cross-language suggestions from other enabled languages

use keypredict_core::{AssetKind, Config, Engine, MemoryAssets, Source, TableTransliterator};
use std::sync::Arc;

const EN_WORDS: &str = "\
the 1
and 2
you 3
help 5
hello 10
world 30
hold 40
held 50
hell 80
helmet 300
there 45
";

fn assets() -> MemoryAssets {
    MemoryAssets::new()
        .with("en", AssetKind::Words, EN_WORDS)
        .with("en", AssetKind::Bigrams, "hello world 20\nhello there 5\n")
        .with("en", AssetKind::Trigrams, "say hello world 4\n")
        .with("hi", AssetKind::Words, "नमस्ते 1\nनमस्कार 2\nदोस्त 3\nकिताब 4\n")
        .with("de", AssetKind::Words, "und 1\nder 2\ndie 3\n")
}

fn engine() -> Engine {
    let e = Engine::new(Config::default(), Arc::new(assets()))
        .with_transliterator(Arc::new(TableTransliterator::with_builtin_tables()));
    for lang in ["en", "hi"] {
        assert!(e.load_language(lang).wait().is_success());
    }
    e
}

#[test]
fn typo_prefers_single_edit() {
    let e = engine();
    let out = e.suggest("helo", &[], "en", 5);
    assert!(!out.is_empty());

    let hello = out.iter().position(|s| s.word == "hello").expect("hello suggested");
    assert_eq!(out[hello].edit_distance, 1);
    assert!(out[hello].is_correction);
    for (i, s) in out.iter().enumerate() {
        if s.edit_distance == 2 {
            assert!(i > hello, "{} ranked above hello", s.word);
        }
    }
}

#[test]
fn exact_word_comes_first() {
    let e = engine();
    for word in ["help", "hello", "helmet", "world"] {
        let out = e.suggest(word, &[], "en", 5);
        assert_eq!(out[0].word, word);
        assert_eq!(out[0].source, Source::Exact);
        assert!(!out[0].is_correction);
    }
}

#[test]
fn case_and_whitespace_are_normalized() {
    let e = engine();
    let out = e.suggest("  Hello ", &[], "en", 3);
    assert_eq!(out[0].word, "hello");
    assert!(!out[0].is_correction);
}

#[test]
fn results_respect_limit_and_order() {
    let e = engine();
    for typed in ["h", "he", "hel", "helo", "wrld", "teh", "xyzzy"] {
        for limit in [1, 3, 5] {
            let out = e.suggest(typed, &[], "en", limit);
            assert!(out.len() <= limit, "{} returned {} results", typed, out.len());
            assert!(out.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
    for typed in ["hel", "hello", "helo"] {
        assert!(e.suggest(typed, &[], "en", 0).is_empty());
    }
    assert!(e.next_word_predictions("en", &["hello".to_string()], 0).is_empty());
}

#[test]
fn bigram_context_boosts_score() {
    let e = engine();
    let score = |context: &[String]| {
        e.suggest("wrld", context, "en", 5)
            .into_iter()
            .find(|s| s.word == "world")
            .map(|s| s.score)
            .expect("world suggested")
    };
    let plain = score(&[]);
    let boosted = score(&["hello".to_string()]);
    let both = score(&["say".to_string(), "hello".to_string()]);
    assert!(boosted > plain);
    assert!(both > boosted);
}

#[test]
fn roman_input_is_transliterated() {
    let e = engine();
    let out = e.suggest("namaste", &[], "hi", 5);
    assert_eq!(out[0].word, "नमस्ते");
    assert_eq!(out[0].source, Source::Transliteration);

    let out = e.suggest("dost", &[], "hi", 5);
    assert_eq!(out[0].word, "दोस्त");
}

#[test]
fn native_typo_uses_grapheme_distance() {
    let e = engine();
    // missing virama: one grapheme off
    let out = e.suggest("नमसते", &[], "hi", 5);
    let hit = out.iter().find(|s| s.word == "नमस्ते").expect("corrected");
    assert_eq!(hit.edit_distance, 1);
}

#[test]
fn unknown_language_yields_nothing() {
    let e = engine();
    assert!(e.suggest("hello", &[], "xx", 5).is_empty());
    assert!(!e.load_language("xx").wait().is_success());
    assert!(!e.is_loaded("xx"));
}

#[test]
fn other_enabled_language_contributes() {
    let e = engine();
    assert!(e.load_language("de").wait().is_success());

    let out = e.suggest("und", &[], "en", 5);
    assert!(!out.iter().any(|s| s.source == Source::CrossLanguage));

    e.set_enabled_languages(["en", "de"]);
    let out = e.suggest("und", &[], "en", 5);
    assert!(out
        .iter()
        .any(|s| s.word == "und" && s.source == Source::CrossLanguage));
}

#[test]
fn best_suggestion_and_confidence() {
    let e = engine();
    assert_eq!(e.best_suggestion("wrold", "en").as_deref(), Some("world"));
    assert_eq!(e.best_suggestion("", "en"), None);
    assert!(e.confidence("wrold", "world", "en") >= 0.85);
    assert!(e.confidence("wrold", "helmet", "en") < 0.5);
}
