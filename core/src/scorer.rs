//! Multi-factor scoring of correction and completion candidates.
//!
//! A score is a base offset plus weighted terms:
//!
//! ```text
//! score = base
//!       + frequency   * max(0, 100 - rank / 10)
//!       - edit        * edit_distance
//!       - keyboard    * proximity_penalty(typed, candidate)
//!       - length      * |graphemes(candidate) - graphemes(typed)|
//!       + bigram      * min(count(prev, candidate), bigram_cap)
//!       + trigram     * min(count(prev2, prev, candidate), trigram_cap)
//!       + transliteration            (candidate came from the transliteration path)
//!       + script_purity              (Indic language, candidate fully native)
//!       + exact_match                (typed text is this dictionary word)
//!       + user_learned * (0.8 + min(0.05 * usage, 0.5))
//! ```
//!
//! The exact-match bonus is larger than every boost a non-exact word can
//! collect, so a correctly typed word always ranks first.

use serde::{Deserialize, Serialize};

use crate::dictionary::{Dictionary, NOT_FOUND_RANK};
use crate::grapheme;
use crate::language::LanguageProfile;
use crate::userdict::LearningStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base: f64,
    pub frequency: f64,
    pub edit_distance: f64,
    pub keyboard: f64,
    pub length: f64,
    pub bigram: f64,
    pub bigram_cap: f64,
    pub trigram: f64,
    pub trigram_cap: f64,
    pub transliteration: f64,
    pub script_purity: f64,
    pub exact_match: f64,
    pub user_learned: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 100.0,
            frequency: 0.2,
            edit_distance: 25.0,
            keyboard: 0.2,
            length: 0.1,
            bigram: 0.5,
            bigram_cap: 50.0,
            trigram: 0.4,
            trigram_cap: 50.0,
            transliteration: 5.0,
            script_purity: 3.0,
            exact_match: 100.0,
            user_learned: 10.0,
        }
    }
}

/// Frequency term before weighting: 100 for the most common word, falling
/// by one per ten ranks, never negative.
pub fn frequency_term(rank: u32) -> f64 {
    if rank == NOT_FOUND_RANK {
        return 0.0;
    }
    (100.0 - rank as f64 / 10.0).max(0.0)
}

/// Multiplier for words the user has typed `usage` times.
pub fn user_learned_factor(usage: u64) -> f64 {
    if usage == 0 {
        return 0.0;
    }
    0.8 + (0.05 * usage as f64).min(0.5)
}

/// Everything known about one candidate at scoring time.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub candidate: &'a str,
    pub typed: &'a str,
    /// Preceding words, oldest first
    pub context: &'a [String],
    pub profile: &'a LanguageProfile,
    pub edit_distance: usize,
    pub via_transliteration: bool,
    pub exact: bool,
}

/// Scores candidates against one language's data.
pub struct Scorer<'a> {
    weights: &'a ScoringWeights,
    dictionary: Option<&'a Dictionary>,
    learning: Option<&'a dyn LearningStore>,
}

impl<'a> Scorer<'a> {
    pub fn new(
        weights: &'a ScoringWeights,
        dictionary: Option<&'a Dictionary>,
        learning: Option<&'a dyn LearningStore>,
    ) -> Self {
        Self {
            weights,
            dictionary,
            learning,
        }
    }

    pub fn score(&self, input: &ScoreInput<'_>) -> f64 {
        let w = self.weights;
        let mut score = w.base;

        let rank = self
            .dictionary
            .map(|d| d.frequency_rank(input.candidate))
            .unwrap_or(NOT_FOUND_RANK);
        score += w.frequency * frequency_term(rank);

        score -= w.edit_distance * input.edit_distance as f64;
        score -= w.keyboard * input.profile.layout.proximity_penalty(input.typed, input.candidate);

        let len_diff = grapheme::grapheme_count(input.candidate)
            .abs_diff(grapheme::grapheme_count(input.typed));
        score -= w.length * len_diff as f64;

        if let Some(dict) = self.dictionary {
            let n = input.context.len();
            if n >= 1 {
                let count = dict.bigram_frequency(&input.context[n - 1], input.candidate) as f64;
                score += w.bigram * count.min(w.bigram_cap);
            }
            if n >= 2 {
                let count = dict.trigram_frequency(
                    &input.context[n - 2],
                    &input.context[n - 1],
                    input.candidate,
                ) as f64;
                score += w.trigram * count.min(w.trigram_cap);
            }
        }

        if input.via_transliteration {
            score += w.transliteration;
        }
        if input.profile.is_indic() && grapheme::is_native(input.candidate, input.profile.script) {
            score += w.script_purity;
        }
        if input.exact {
            score += w.exact_match;
        }
        if let Some(store) = self.learning {
            let usage = store.usage_count(input.profile.code, input.candidate);
            score += w.user_learned * user_learned_factor(usage);
        }
        score
    }
}
