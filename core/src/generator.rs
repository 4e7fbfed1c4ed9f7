//! Raw candidate generation for one typed token in one language.
//!
//! Two paths:
//! - transliteration: the language is typed in Roman letters and a
//!   transliterator is available; candidates are the transliteration itself
//!   plus dictionary words within the grapheme-distance bound of it.
//! - dictionary: exact entry, direct corrections, prefix completions,
//!   edit-distance neighbours and phonetic rewrites.
//!
//! Candidates are unscored here; the `Scorer` prices them afterwards.

use ahash::{AHashMap, AHashSet};
use tracing::{debug, warn};

use crate::candidate::Source;
use crate::dictionary::Dictionary;
use crate::distance::{distance_for, grapheme_distance};
use crate::grapheme;
use crate::language::LanguageProfile;
use crate::phonetic;
use crate::translit::Transliterator;
use crate::userdict::LearningStore;
use crate::utils;
use crate::Config;

/// An unscored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    pub word: String,
    pub source: Source,
    pub edit_distance: usize,
    pub via_transliteration: bool,
    /// The typed text is this dictionary word
    pub exact: bool,
    /// Score to use instead of the scorer's (primary transliteration output)
    pub fixed_score: Option<f64>,
    /// Text to score against instead of the typed token: the native
    /// transliteration on the transliteration path
    pub scored_against: Option<String>,
}

impl RawCandidate {
    fn new(word: impl Into<String>, source: Source, edit_distance: usize) -> Self {
        Self {
            word: word.into(),
            source,
            edit_distance,
            via_transliteration: false,
            exact: false,
            fixed_score: None,
            scored_against: None,
        }
    }
}

fn units(profile: &LanguageProfile, s: &str) -> usize {
    if profile.script.uses_graphemes() {
        grapheme::grapheme_count(s)
    } else {
        s.chars().count()
    }
}

pub struct CandidateGenerator<'a> {
    config: &'a Config,
    profile: &'a LanguageProfile,
    dictionary: Option<&'a Dictionary>,
    transliterator: Option<&'a dyn Transliterator>,
    learning: Option<&'a dyn LearningStore>,
    learned_corrections: Option<&'a AHashMap<String, String>>,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(config: &'a Config, profile: &'a LanguageProfile, dictionary: Option<&'a Dictionary>) -> Self {
        Self {
            config,
            profile,
            dictionary,
            transliterator: None,
            learning: None,
            learned_corrections: None,
        }
    }

    pub fn with_transliterator(mut self, t: Option<&'a dyn Transliterator>) -> Self {
        self.transliterator = t;
        self
    }

    pub fn with_learning(mut self, store: Option<&'a dyn LearningStore>) -> Self {
        self.learning = store;
        self
    }

    /// Typo -> correction pairs taught at runtime, checked before the dictionary's own table.
    pub fn with_learned_corrections(mut self, corrections: Option<&'a AHashMap<String, String>>) -> Self {
        self.learned_corrections = corrections;
        self
    }

    /// True if `typed` should go through the transliterator.
    pub fn uses_transliteration(&self, typed: &str) -> bool {
        self.profile.transliterating && utils::is_roman_input(typed) && self.transliterator.is_some()
    }

    /// Generate candidates for a normalized token.
    pub fn generate(&self, typed: &str) -> Vec<RawCandidate> {
        if typed.is_empty() {
            return Vec::new();
        }
        let mut out = if self.uses_transliteration(typed) {
            match self.transliteration_candidates(typed) {
                Some(c) => c,
                None => {
                    debug!(language = self.profile.code, typed, "transliteration failed, using dictionary");
                    self.dictionary_candidates(typed)
                }
            }
        } else {
            self.dictionary_candidates(typed)
        };
        out.truncate(self.config.max_generated_candidates);
        out
    }

    fn transliteration_candidates(&self, typed: &str) -> Option<Vec<RawCandidate>> {
        let native = self
            .transliterator?
            .transliterate(typed, self.profile.code)
            .filter(|s| !s.is_empty())?;

        let mut out = Vec::new();
        let mut primary = RawCandidate::new(native.clone(), Source::Transliteration, 0);
        primary.via_transliteration = true;
        primary.fixed_score = Some(self.config.primary_transliteration_score);
        primary.scored_against = Some(native.clone());
        out.push(primary);

        if let Some(dict) = self.dictionary {
            let max = self.config.max_correction_distance;
            let native_len = grapheme::grapheme_count(&native);
            for word in dict.words_by_rank().iter().take(self.config.neighbor_scan_limit) {
                if grapheme::grapheme_count(word).abs_diff(native_len) > max {
                    continue;
                }
                let d = grapheme_distance(&native, word);
                if d <= max {
                    let mut c = RawCandidate::new(word.clone(), Source::Transliteration, d);
                    c.via_transliteration = true;
                    c.scored_against = Some(native.clone());
                    out.push(c);
                }
            }
        }
        Some(out)
    }

    fn direct_corrections(&self, typed: &str) -> Vec<String> {
        let mut fixes: Vec<String> = Vec::new();
        if let Some(fix) = self.learned_corrections.and_then(|m| m.get(typed)) {
            fixes.push(fix.clone());
        }
        if let Some(fix) = self.dictionary.and_then(|d| d.direct_correction(typed)) {
            if !fixes.iter().any(|f| f == fix) {
                fixes.push(fix.to_string());
            }
        }
        fixes.retain(|fix| {
            let blocked = self
                .learning
                .map(|s| s.is_blacklisted(self.profile.code, typed, fix))
                .unwrap_or(false);
            if blocked {
                debug!(typed, correction = %fix, "correction blacklisted");
            }
            !blocked && fix != typed
        });
        fixes
    }

    fn dictionary_candidates(&self, typed: &str) -> Vec<RawCandidate> {
        let mut out = Vec::new();
        let dict = match self.dictionary {
            Some(d) => d,
            None => {
                warn!(language = self.profile.code, "no dictionary loaded");
                for fix in self.direct_corrections(typed) {
                    let d = distance_for(self.profile.script, typed, &fix);
                    out.push(RawCandidate::new(fix, Source::Direct, d));
                }
                return out;
            }
        };

        let script = self.profile.script;
        let max = self.config.max_correction_distance;
        let mut seen: AHashSet<String> = AHashSet::new();

        let exact = dict.contains(typed);
        if exact {
            let mut c = RawCandidate::new(typed, Source::Exact, 0);
            c.exact = true;
            out.push(c);
            seen.insert(typed.to_string());
        } else {
            for fix in self.direct_corrections(typed) {
                let d = distance_for(script, typed, &fix);
                out.push(RawCandidate::new(fix, Source::Direct, d));
            }
        }

        for (word, _) in dict.prefix_matches(typed, self.config.prefix_match_limit + 1) {
            if word != typed && seen.insert(word.clone()) {
                out.push(RawCandidate::new(word, Source::Completion, 0));
            }
        }

        let typed_len = units(self.profile, typed);
        for word in dict.words_by_rank().iter().take(self.config.neighbor_scan_limit) {
            if seen.contains(word) || units(self.profile, word).abs_diff(typed_len) > max {
                continue;
            }
            let d = distance_for(script, typed, word);
            if (1..=max).contains(&d) {
                seen.insert(word.clone());
                out.push(RawCandidate::new(word.clone(), Source::EditDistance, d));
            }
        }

        if !exact {
            for variant in phonetic::variants(typed, self.profile.code) {
                for (word, _) in dict.prefix_matches(&variant, 10) {
                    if word == typed || seen.contains(&word) || !phonetic::sounds_alike(typed, &word) {
                        continue;
                    }
                    let d = distance_for(script, typed, &word);
                    seen.insert(word.clone());
                    out.push(RawCandidate::new(word, Source::Phonetic, d));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryBuilder;
    use crate::translit::TableTransliterator;
    use crate::userdict::InMemoryUserDict;
    use std::io::Cursor;

    fn en() -> Dictionary {
        let mut b = DictionaryBuilder::new("en");
        b.read_words(Cursor::new(
            "the 1\nhello 10\nhelp 5\nhelmet 300\nheld 50\nphone 80\nworld 30\n",
        ))
        .unwrap();
        b.read_corrections(Cursor::new("teh the\n")).unwrap();
        b.build().unwrap()
    }

    fn hi() -> Dictionary {
        let mut b = DictionaryBuilder::new("hi");
        b.read_words(Cursor::new("नमस्ते 1\nनमस्कार 2\nदोस्त 3\n")).unwrap();
        b.build().unwrap()
    }

    fn find<'c>(c: &'c [RawCandidate], word: &str) -> Option<&'c RawCandidate> {
        c.iter().find(|r| r.word == word)
    }

    #[test]
    fn exact_word_is_not_a_correction() {
        let cfg = Config::default();
        let d = en();
        let p = LanguageProfile::or_default("en");
        let c = CandidateGenerator::new(&cfg, &p, Some(&d)).generate("help");
        assert_eq!(c[0].source, Source::Exact);
        assert!(c[0].exact);
        assert_eq!(c.iter().filter(|r| r.word == "help").count(), 1);
    }

    #[test]
    fn misspelling_finds_neighbours_and_completions() {
        let cfg = Config::default();
        let d = en();
        let p = LanguageProfile::or_default("en");
        let c = CandidateGenerator::new(&cfg, &p, Some(&d)).generate("helo");
        assert_eq!(find(&c, "hello").map(|r| r.edit_distance), Some(1));
        assert_eq!(find(&c, "help").map(|r| r.edit_distance), Some(1));
        assert!(find(&c, "world").is_none());

        let c = CandidateGenerator::new(&cfg, &p, Some(&d)).generate("hel");
        assert_eq!(find(&c, "helmet").map(|r| r.source), Some(Source::Completion));
    }

    #[test]
    fn direct_corrections_respect_blacklist() {
        let cfg = Config::default();
        let d = en();
        let p = LanguageProfile::or_default("en");
        let c = CandidateGenerator::new(&cfg, &p, Some(&d)).generate("teh");
        assert_eq!(c[0].source, Source::Direct);
        assert_eq!(c[0].word, "the");

        let store = InMemoryUserDict::new();
        store.blacklist_correction("en", "teh", "the");
        let c = CandidateGenerator::new(&cfg, &p, Some(&d))
            .with_learning(Some(&store))
            .generate("teh");
        assert!(c.iter().all(|r| r.source != Source::Direct));
    }

    #[test]
    fn phonetic_rewrite() {
        // ph -> f is two edits; keep it out of the neighbour scan
        let mut cfg = Config::default();
        cfg.max_correction_distance = 1;
        let d = en();
        let p = LanguageProfile::or_default("en");
        let c = CandidateGenerator::new(&cfg, &p, Some(&d)).generate("fone");
        assert_eq!(find(&c, "phone").map(|r| r.source), Some(Source::Phonetic));
    }

    #[test]
    fn transliteration_path_for_roman_hindi() {
        let cfg = Config::default();
        let d = hi();
        let p = LanguageProfile::or_default("hi");
        let t = TableTransliterator::with_builtin_tables();
        let g = CandidateGenerator::new(&cfg, &p, Some(&d)).with_transliterator(Some(&t));
        assert!(g.uses_transliteration("namaste"));
        assert!(!g.uses_transliteration("नमस्ते"));

        let c = g.generate("namaste");
        assert_eq!(c[0].word, "नमस्ते");
        assert_eq!(c[0].fixed_score, Some(cfg.primary_transliteration_score));
        assert!(c.iter().all(|r| r.via_transliteration));
        assert!(c.iter().all(|r| r.scored_against.as_deref() == Some("नमस्ते")));
        assert!(find(&c[1..], "नमस्ते").is_some());
    }

    #[test]
    fn failed_transliteration_falls_back() {
        let cfg = Config::default();
        let d = hi();
        let p = LanguageProfile::or_default("hi");
        let t = TableTransliterator::with_builtin_tables();
        // 'x' has no mapping
        let c = CandidateGenerator::new(&cfg, &p, Some(&d))
            .with_transliterator(Some(&t))
            .generate("xyz");
        assert!(c.iter().all(|r| !r.via_transliteration));
    }

    #[test]
    fn missing_dictionary_yields_nothing() {
        let cfg = Config::default();
        let p = LanguageProfile::or_default("en");
        assert!(CandidateGenerator::new(&cfg, &p, None).generate("helo").is_empty());
    }

    #[test]
    fn generation_is_capped() {
        let mut cfg = Config::default();
        cfg.max_generated_candidates = 2;
        let d = en();
        let p = LanguageProfile::or_default("en");
        assert!(CandidateGenerator::new(&cfg, &p, Some(&d)).generate("hel").len() <= 2);
    }
}
