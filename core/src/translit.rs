//! Roman-to-native transliteration.
//!
//! `Transliterator` is the seam hosts plug their own converter into. The
//! bundled `TableTransliterator` does greedy longest-match over per-language
//! tables of consonants and vowels, attaching vowel signs to the preceding
//! consonant and joining consonant clusters with the script's virama.

use ahash::AHashMap;

/// Converts Roman-letter input to a language's native script.
pub trait Transliterator: Send + Sync {
    /// `None` when the language is unsupported or the input cannot be mapped.
    fn transliterate(&self, roman: &str, language: &str) -> Option<String>;
}

/// Mapping tables for one script.
#[derive(Debug, Clone, Default)]
pub struct TransliterationTable {
    consonants: AHashMap<String, String>,
    /// roman vowel -> (independent form, dependent sign)
    vowels: AHashMap<String, (String, String)>,
    virama: char,
    max_key: usize,
}

impl TransliterationTable {
    pub fn new(virama: char) -> Self {
        Self {
            virama,
            ..Self::default()
        }
    }

    pub fn consonant(mut self, roman: &str, native: &str) -> Self {
        self.max_key = self.max_key.max(roman.len());
        self.consonants.insert(roman.to_string(), native.to_string());
        self
    }

    pub fn vowel(mut self, roman: &str, independent: &str, sign: &str) -> Self {
        self.max_key = self.max_key.max(roman.len());
        self.vowels
            .insert(roman.to_string(), (independent.to_string(), sign.to_string()));
        self
    }

    fn longest<'a, V>(&self, map: &'a AHashMap<String, V>, rest: &str) -> Option<(&'a V, usize)> {
        (1..=self.max_key.min(rest.len()))
            .rev()
            .find_map(|len| map.get(&rest[..len]).map(|v| (v, len)))
    }

    /// Convert lowercase ASCII letters; `None` on any unmapped letter.
    pub fn convert(&self, roman: &str) -> Option<String> {
        let input = roman.trim().to_ascii_lowercase();
        if input.is_empty() || !input.bytes().all(|b| b.is_ascii_lowercase()) {
            return None;
        }

        let mut out = String::new();
        let mut after_consonant = false;
        let mut i = 0;
        while i < input.len() {
            let rest = &input[i..];
            if let Some((native, len)) = self.longest(&self.consonants, rest) {
                if after_consonant {
                    out.push(self.virama);
                }
                out.push_str(native);
                after_consonant = true;
                i += len;
            } else if let Some(((independent, sign), len)) = self.longest(&self.vowels, rest) {
                out.push_str(if after_consonant { sign } else { independent });
                after_consonant = false;
                i += len;
            } else {
                return None;
            }
        }
        Some(out)
    }

    /// Devanagari (Hindi, Marathi).
    pub fn devanagari() -> Self {
        let mut t = Self::new('\u{094D}');
        for (r, n) in [
            ("k", "क"), ("kh", "ख"), ("g", "ग"), ("gh", "घ"), ("c", "क"), ("ch", "च"),
            ("chh", "छ"), ("j", "ज"), ("jh", "झ"), ("t", "त"), ("th", "थ"), ("d", "द"),
            ("dh", "ध"), ("n", "न"), ("p", "प"), ("ph", "फ"), ("f", "फ"), ("b", "ब"),
            ("bh", "भ"), ("m", "म"), ("y", "य"), ("r", "र"), ("l", "ल"), ("v", "व"),
            ("w", "व"), ("sh", "श"), ("s", "स"), ("h", "ह"), ("q", "क"), ("z", "ज\u{093C}"),
        ] {
            t = t.consonant(r, n);
        }
        for (r, ind, sign) in [
            ("a", "अ", ""), ("aa", "आ", "ा"), ("i", "इ", "ि"), ("ee", "ई", "ी"),
            ("ii", "ई", "ी"), ("u", "उ", "ु"), ("oo", "ऊ", "ू"), ("uu", "ऊ", "ू"),
            ("e", "ए", "े"), ("ai", "ऐ", "ै"), ("o", "ओ", "ो"), ("au", "औ", "ौ"),
        ] {
            t = t.vowel(r, ind, sign);
        }
        t
    }

    /// Telugu.
    pub fn telugu() -> Self {
        let mut t = Self::new('\u{0C4D}');
        for (r, n) in [
            ("k", "క"), ("kh", "ఖ"), ("g", "గ"), ("gh", "ఘ"), ("c", "క"), ("ch", "చ"),
            ("chh", "ఛ"), ("j", "జ"), ("jh", "ఝ"), ("t", "త"), ("th", "థ"), ("d", "ద"),
            ("dh", "ధ"), ("n", "న"), ("p", "ప"), ("ph", "ఫ"), ("f", "ఫ"), ("b", "బ"),
            ("bh", "భ"), ("m", "మ"), ("y", "య"), ("r", "ర"), ("l", "ల"), ("v", "వ"),
            ("w", "వ"), ("sh", "శ"), ("s", "స"), ("h", "హ"),
        ] {
            t = t.consonant(r, n);
        }
        for (r, ind, sign) in [
            ("a", "అ", ""), ("aa", "ఆ", "ా"), ("i", "ఇ", "ి"), ("ee", "ఈ", "ీ"),
            ("ii", "ఈ", "ీ"), ("u", "ఉ", "ు"), ("oo", "ఊ", "ూ"), ("uu", "ఊ", "ూ"),
            ("e", "ఎ", "ె"), ("ai", "ఐ", "ై"), ("o", "ఒ", "ొ"), ("au", "ఔ", "ౌ"),
        ] {
            t = t.vowel(r, ind, sign);
        }
        t
    }
}

/// Table-driven transliterator keyed by language code.
#[derive(Debug, Clone, Default)]
pub struct TableTransliterator {
    tables: AHashMap<String, TransliterationTable>,
}

impl TableTransliterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables for Hindi, Marathi and Telugu.
    pub fn with_builtin_tables() -> Self {
        let mut t = Self::new();
        t.insert_table("hi", TransliterationTable::devanagari());
        t.insert_table("mr", TransliterationTable::devanagari());
        t.insert_table("te", TransliterationTable::telugu());
        t
    }

    pub fn insert_table(&mut self, language: &str, table: TransliterationTable) {
        self.tables.insert(language.to_string(), table);
    }

    pub fn supports(&self, language: &str) -> bool {
        self.tables.contains_key(language)
    }
}

impl Transliterator for TableTransliterator {
    fn transliterate(&self, roman: &str, language: &str) -> Option<String> {
        self.tables.get(language)?.convert(roman)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hindi_words() {
        let t = TableTransliterator::with_builtin_tables();
        assert_eq!(t.transliterate("namaste", "hi").as_deref(), Some("नमस्ते"));
        assert_eq!(t.transliterate("dost", "hi").as_deref(), Some("दोस्त"));
        assert_eq!(t.transliterate("kitaab", "hi").as_deref(), Some("किताब"));
        assert_eq!(t.transliterate("aap", "hi").as_deref(), Some("आप"));
    }

    #[test]
    fn telugu_word() {
        let t = TableTransliterator::with_builtin_tables();
        assert_eq!(t.transliterate("amma", "te").as_deref(), Some("అమ్మ"));
    }

    #[test]
    fn unsupported_input() {
        let t = TableTransliterator::with_builtin_tables();
        assert_eq!(t.transliterate("hello", "fr"), None);
        assert_eq!(t.transliterate("नमस्ते", "hi"), None);
        assert_eq!(t.transliterate("", "hi"), None);
        assert_eq!(t.transliterate("x", "hi"), None);
    }
}
