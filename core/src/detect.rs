//! Statistical language identification.
//!
//! Each language gets a score from three signals over the lowercased text:
//! share of characters in the language's alphabet (weight 0.3), share of
//! words in its common-word list (0.4), and idiom/suffix pattern hits per
//! word (0.3). Scores are normalized so the best language has confidence 1.0.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::Config;

const CHARSET_WEIGHT: f64 = 0.3;
const COMMON_WORD_WEIGHT: f64 = 0.4;
const PATTERN_WEIGHT: f64 = 0.3;

struct LanguageRules {
    code: &'static str,
    charset: Regex,
    common_words: &'static [&'static str],
    patterns: Vec<Regex>,
}

fn rules(
    code: &'static str,
    charset: &str,
    common_words: &'static [&'static str],
    patterns: &[&str],
) -> Option<LanguageRules> {
    let charset = Regex::new(charset).ok()?;
    let patterns = patterns.iter().filter_map(|p| Regex::new(p).ok()).collect();
    Some(LanguageRules {
        code,
        charset,
        common_words,
        patterns,
    })
}

static RULES: Lazy<Vec<LanguageRules>> = Lazy::new(|| {
    [
        rules(
            "en",
            r"[a-zA-Z]",
            &["the", "and", "to", "of", "a", "in", "is", "it", "you", "that", "he", "was", "for", "on", "are", "as", "with", "his", "they", "i"],
            &[
                r"\b(the|and|that|with|have|this|will|you|from|they|know|want|been|good|much|some)\b",
                r"ing\b",
                r"tion\b",
                r"'s\b",
                r"n't\b",
            ],
        ),
        rules(
            "es",
            r"[a-zA-ZñÑáéíóúüÁÉÍÓÚÜ¿¡]",
            &["el", "la", "de", "que", "y", "a", "en", "un", "es", "se", "no", "te", "lo", "le", "da", "su", "por", "son", "con", "para"],
            &[
                r"\b(que|con|por|para|una|del|los|las|sus|muy|más|también|donde|cuando)\b",
                r"ción\b",
                r"ando\b",
                r"endo\b",
                r"¿.*?\?",
                r"¡.*?!",
            ],
        ),
        rules(
            "fr",
            r"[a-zA-ZàâäéèêëïîôöùûüÿçÀÂÄÉÈÊËÏÎÔÖÙÛÜŸÇ]",
            &["le", "de", "et", "à", "un", "il", "être", "en", "avoir", "que", "pour", "dans", "ce", "son", "une", "sur", "avec", "ne", "se"],
            &[
                r"\b(que|avec|pour|dans|sur|par|tout|bien|plus|sans|sous|entre|depuis)\b",
                r"tion\b",
                r"ment\b",
                r"eux\b",
                r"euse\b",
            ],
        ),
        rules(
            "de",
            r"[a-zA-ZäöüßÄÖÜ]",
            &["der", "die", "und", "in", "den", "von", "zu", "das", "mit", "sich", "des", "auf", "für", "ist", "im", "dem", "nicht", "ein", "eine", "als"],
            &[
                r"\b(und|der|die|das|den|dem|des|ein|eine|eines|einem|einen|nicht|auch|nur|noch|schon)\b",
                r"ung\b",
                r"heit\b",
                r"keit\b",
                r"lich\b",
            ],
        ),
        rules(
            "pt",
            r"[a-zA-ZãõáéíóúâêîôûàÃÕÁÉÍÓÚÂÊÎÔÛÀ]",
            &["o", "a", "de", "e", "do", "da", "em", "um", "para", "é", "com", "não", "uma", "os", "no", "se", "na", "por", "mais", "as"],
            &[
                r"\b(que|com|por|para|uma|dos|das|seu|sua|muito|mais|também|onde|quando)\b",
                r"ção\b",
                r"ando\b",
                r"endo\b",
                r"mente\b",
            ],
        ),
        rules(
            "it",
            r"[a-zA-ZàèéìíîòóùúÀÈÉÌÍÎÒÓÙÚ]",
            &["il", "di", "che", "e", "la", "un", "a", "per", "non", "in", "una", "si", "è", "da", "con", "i", "su", "le", "del", "lo"],
            &[
                r"\b(che|con|per|una|del|dei|delle|suo|sua|molto|più|anche|dove|quando)\b",
                r"zione\b",
                r"ando\b",
                r"endo\b",
                r"mente\b",
            ],
        ),
        rules(
            "hi",
            r"[\x{0900}-\x{097F}]",
            &["का", "में", "की", "और", "को", "है", "से", "पर", "एक", "यह", "वह", "कि", "जो", "तो", "ही", "भी", "या", "थे", "हैं", "था"],
            &[r"है\b", r"में\b", r"को\b", r"से\b", r"और\b"],
        ),
        rules("bn", r"[\x{0980}-\x{09FF}]", &[], &[]),
        rules("gu", r"[\x{0A80}-\x{0AFF}]", &[], &[]),
        rules("ta", r"[\x{0B80}-\x{0BFF}]", &[], &[]),
        rules("te", r"[\x{0C00}-\x{0C7F}]", &[], &[]),
        rules("kn", r"[\x{0C80}-\x{0CFF}]", &[], &[]),
        rules("ml", r"[\x{0D00}-\x{0D7F}]", &[], &[]),
        rules(
            "ar",
            r"[\x{0621}-\x{064A}]",
            &["في", "من", "إلى", "على", "أن", "هذا", "هذه", "التي", "الذي", "كان", "لم", "قد", "كل", "بعد", "عند", "أول", "غير", "بين", "حيث", "خلال"],
            &[r"\bال", r"ين\b", r"ون\b", r"ها\b", r"هم\b"],
        ),
        rules(
            "ru",
            r"[а-яё]",
            &["в", "и", "не", "на", "я", "быть", "с", "он", "а", "как", "по", "это", "она", "к", "но", "они", "мы", "что", "за", "из"],
            &[
                r"\b(что|как|все|еще|уже|только|очень|здесь|там|где|когда)\b",
                r"ость\b",
                r"ение\b",
                r"ание\b",
                r"ный\b",
            ],
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Language identification over short typed text.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    min_confidence: f64,
    min_length: usize,
    switch_margin: f64,
    default_language: String,
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LanguageDetector {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_confidence: config.min_detection_confidence,
            min_length: config.min_detection_length,
            switch_margin: config.switch_margin,
            default_language: config.default_language.clone(),
        }
    }

    /// Codes this detector can score, in tie-break order.
    pub fn supported_languages() -> Vec<&'static str> {
        RULES.iter().map(|r| r.code).collect()
    }

    fn score(text: &str, rules: &LanguageRules) -> f64 {
        let words: Vec<&str> = text.split_whitespace().collect();
        let total_words = words.len().max(1) as f64;
        let total_chars = text.chars().count().max(1) as f64;

        let charset_hits = rules.charset.find_iter(text).count() as f64;
        let common_hits = words
            .iter()
            .filter(|w| rules.common_words.contains(w))
            .count() as f64;
        let pattern_hits: usize = rules.patterns.iter().map(|p| p.find_iter(text).count()).sum();

        charset_hits / total_chars * CHARSET_WEIGHT
            + common_hits / total_words * COMMON_WORD_WEIGHT
            + pattern_hits as f64 / total_words * PATTERN_WEIGHT
    }

    /// Normalized confidence per language; the best entry is 1.0.
    ///
    /// Empty text yields only the default language at 1.0.
    pub fn confidences(&self, text: &str) -> BTreeMap<String, f64> {
        let clean = text.trim().to_lowercase();
        let mut out = BTreeMap::new();
        if clean.is_empty() {
            out.insert(self.default_language.clone(), 1.0);
            return out;
        }

        for rules in RULES.iter() {
            out.insert(rules.code.to_string(), Self::score(&clean, rules));
        }
        let max = out.values().cloned().fold(0.0_f64, f64::max);
        if max > 0.0 {
            for v in out.values_mut() {
                *v /= max;
            }
        }
        out
    }

    /// Best language and its confidence, ties resolved in rule order.
    fn best(&self, text: &str) -> (String, f64) {
        let confidences = self.confidences(text);
        let mut best = (self.default_language.clone(), 0.0);
        for rules in RULES.iter() {
            if let Some(&c) = confidences.get(rules.code) {
                if c > best.1 {
                    best = (rules.code.to_string(), c);
                }
            }
        }
        best
    }

    /// Most likely language, or the default when the text is too short or
    /// no language reaches the confidence threshold.
    pub fn detect_language(&self, text: &str) -> String {
        if text.chars().count() < self.min_length {
            return self.default_language.clone();
        }
        let (code, confidence) = self.best(text);
        if confidence >= self.min_confidence {
            debug!(language = %code, confidence, "detected language");
            code
        } else {
            self.default_language.clone()
        }
    }

    /// Language to switch to, if the recent text strongly suggests one.
    pub fn suggest_switch(
        &self,
        recent_text: &str,
        current: &str,
        enabled: &[String],
    ) -> Option<String> {
        if recent_text.chars().count() < self.min_length * 3 {
            return None;
        }
        let detected = self.detect_language(recent_text);
        let confidence = self.confidences(recent_text).get(&detected).copied().unwrap_or(0.0);
        if detected != current
            && confidence > self.min_confidence * self.switch_margin
            && enabled.iter().any(|e| *e == detected)
        {
            debug!(from = current, to = %detected, "suggesting language switch");
            Some(detected)
        } else {
            None
        }
    }

    /// Up to `n` languages by descending confidence.
    pub fn top_languages(&self, text: &str, n: usize) -> Vec<(String, f64)> {
        let mut all: Vec<(String, f64)> = self.confidences(text).into_iter().collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(n);
        all
    }

    pub fn is_text_in_language(&self, text: &str, code: &str, min_confidence: f64) -> bool {
        self.confidences(text).get(code).copied().unwrap_or(0.0) >= min_confidence
    }

    /// Guess the language of one word from its alphabet and the common-word
    /// lists. `None` for words shorter than two characters or with no signal.
    pub fn detect_word_language(&self, word: &str) -> Option<String> {
        let len = word.chars().count();
        if len < 2 {
            return None;
        }
        let lower = word.to_lowercase();
        let mut best: Option<(&'static str, usize)> = None;
        for rules in RULES.iter() {
            let mut score = rules.charset.find_iter(word).count();
            if rules.common_words.contains(&lower.as_str()) {
                score += len * 2;
            }
            if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((rules.code, score));
            }
        }
        best.map(|(code, _)| code.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(RULES.len(), 15);
        let en = RULES.iter().find(|r| r.code == "en").unwrap();
        assert_eq!(en.patterns.len(), 5);
        let es = RULES.iter().find(|r| r.code == "es").unwrap();
        assert_eq!(es.patterns.len(), 6);
    }

    #[test]
    fn short_or_empty_text_defaults_to_english() {
        let d = LanguageDetector::default();
        assert_eq!(d.detect_language(""), "en");
        assert_eq!(d.detect_language("a"), "en");
        assert_eq!(d.confidences("").get("en"), Some(&1.0));
    }

    #[test]
    fn confidences_are_normalized() {
        let d = LanguageDetector::default();
        let c = d.confidences("the cat is on the mat");
        let max = c.values().cloned().fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-9);
        assert!(c.values().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn word_language() {
        let d = LanguageDetector::default();
        assert_eq!(d.detect_word_language("नमस्ते").as_deref(), Some("hi"));
        assert_eq!(d.detect_word_language("und").as_deref(), Some("de"));
        assert_eq!(d.detect_word_language("x"), None);
        assert_eq!(d.detect_word_language("12"), None);
    }
}
