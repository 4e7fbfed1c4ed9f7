//! Suggestion types returned to callers.

use serde::{Deserialize, Serialize};

/// Where a suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// The typed text is itself a dictionary word
    Exact,
    /// Looked up in a typo -> correction table
    Direct,
    /// Dictionary word starting with the typed text
    Completion,
    /// Dictionary word within the edit-distance bound
    EditDistance,
    /// Found through a sound-preserving spelling rewrite
    Phonetic,
    /// Produced by, or close to, the transliterated input
    Transliteration,
    /// Found in another enabled language's dictionary
    CrossLanguage,
    /// Boosted by the preceding words
    Context,
    Bigram,
    Trigram,
    /// A word the user has typed before
    UserLearned,
    /// Learned word starting with the typed text
    UserCompletion,
    /// Padding from the fallback common-word list
    Common,
}

impl Source {
    /// Preference when several sources produce the same word; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            Source::Exact => 13,
            Source::Direct => 12,
            Source::UserLearned => 11,
            Source::Transliteration => 10,
            Source::Trigram => 9,
            Source::Bigram => 8,
            Source::Context => 7,
            Source::Completion => 6,
            Source::UserCompletion => 5,
            Source::EditDistance => 4,
            Source::Phonetic => 3,
            Source::CrossLanguage => 2,
            Source::Common => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Exact => "exact",
            Source::Direct => "direct",
            Source::Completion => "completion",
            Source::EditDistance => "edit_distance",
            Source::Phonetic => "phonetic",
            Source::Transliteration => "transliteration",
            Source::CrossLanguage => "cross_language",
            Source::Context => "context",
            Source::Bigram => "bigram",
            Source::Trigram => "trigram",
            Source::UserLearned => "user_learned",
            Source::UserCompletion => "user_completion",
            Source::Common => "common",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked suggestion. Higher scores are better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub word: String,
    pub score: f64,
    pub source: Source,
    pub edit_distance: usize,
    /// True if accepting this would change what the user typed
    pub is_correction: bool,
}

impl Suggestion {
    pub fn new<T: Into<String>>(word: T, score: f64, source: Source, edit_distance: usize) -> Self {
        Suggestion {
            word: word.into(),
            score,
            source,
            edit_distance,
            is_correction: edit_distance > 0,
        }
    }

    /// A prediction or completion: never flagged as a correction.
    pub fn prediction<T: Into<String>>(word: T, score: f64, source: Source) -> Self {
        Suggestion {
            word: word.into(),
            score,
            source,
            edit_distance: 0,
            is_correction: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_flag_follows_distance() {
        assert!(Suggestion::new("hello", 1.0, Source::EditDistance, 1).is_correction);
        assert!(!Suggestion::new("hello", 1.0, Source::Exact, 0).is_correction);
        assert!(!Suggestion::prediction("world", 0.5, Source::Bigram).is_correction);
    }

    #[test]
    fn exact_outranks_everything() {
        let all = [
            Source::Direct,
            Source::Completion,
            Source::EditDistance,
            Source::Phonetic,
            Source::Transliteration,
            Source::CrossLanguage,
            Source::Context,
            Source::Bigram,
            Source::Trigram,
            Source::UserLearned,
            Source::UserCompletion,
            Source::Common,
        ];
        for s in all {
            assert!(Source::Exact.priority() > s.priority(), "{}", s);
        }
    }
}
