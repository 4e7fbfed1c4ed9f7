//! Grapheme segmentation for Indic scripts.
//!
//! A cluster is one base codepoint followed by any number of combining marks
//! (matras, signs, viramas). The mark ranges are listed per script so the
//! behaviour is identical on every platform regardless of the Unicode tables
//! the host ships.

use serde::{Deserialize, Serialize};

/// Writing systems the engine knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Devanagari,
    Bengali,
    Gujarati,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Arabic,
    Cyrillic,
    Other,
}

impl Script {
    /// Script of a single codepoint.
    pub fn of(c: char) -> Script {
        match c as u32 {
            0x0900..=0x097F => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0A80..=0x0AFF => Script::Gujarati,
            0x0B80..=0x0BFF => Script::Tamil,
            0x0C00..=0x0C7F => Script::Telugu,
            0x0C80..=0x0CFF => Script::Kannada,
            0x0D00..=0x0D7F => Script::Malayalam,
            0x0600..=0x06FF => Script::Arabic,
            0x0400..=0x04FF => Script::Cyrillic,
            0x0041..=0x005A | 0x0061..=0x007A | 0x00C0..=0x024F => Script::Latin,
            _ => Script::Other,
        }
    }

    pub fn is_indic(self) -> bool {
        matches!(
            self,
            Script::Devanagari
                | Script::Bengali
                | Script::Gujarati
                | Script::Tamil
                | Script::Telugu
                | Script::Kannada
                | Script::Malayalam
        )
    }

    /// True for scripts where edit distance is measured in graphemes.
    pub fn uses_graphemes(self) -> bool {
        self.is_indic()
    }
}

/// True if `c` attaches to the preceding base character.
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        // Devanagari
        0x0901..=0x0903 | 0x093A..=0x094F | 0x0951..=0x0957 | 0x0962..=0x0963
        // Bengali
        | 0x0981..=0x0983 | 0x09BC..=0x09CD | 0x09D7 | 0x09E2..=0x09E3
        // Gujarati
        | 0x0A81..=0x0A83 | 0x0ABC..=0x0ACD | 0x0AE2..=0x0AE3
        // Tamil
        | 0x0B82..=0x0B83 | 0x0BBE..=0x0BC2 | 0x0BC6..=0x0BCD | 0x0BD7
        // Telugu
        | 0x0C00..=0x0C04 | 0x0C3E..=0x0C4C | 0x0C55..=0x0C56 | 0x0C62..=0x0C63
        // Kannada
        | 0x0C81..=0x0C83 | 0x0CBC..=0x0CCD | 0x0CD5..=0x0CD6 | 0x0CE2..=0x0CE3
        // Malayalam
        | 0x0D00..=0x0D03 | 0x0D3E..=0x0D4D | 0x0D57 | 0x0D62..=0x0D63
    )
}

/// Virama (halant) codepoints, which join the next consonant into a conjunct.
pub fn is_virama(c: char) -> bool {
    matches!(
        c as u32,
        0x094D | 0x09CD | 0x0ACD | 0x0B4D | 0x0BCD | 0x0C4D | 0x0CCD | 0x0D4D
    )
}

/// Split `text` into grapheme clusters.
///
/// Concatenating the returned slices yields `text` again. A combining mark
/// with no preceding base forms a cluster of its own.
pub fn segment(text: &str) -> Vec<&str> {
    let mut clusters = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, c) in text.char_indices() {
        if start.is_some() && is_combining_mark(c) {
            continue;
        }
        if let Some(s) = start {
            clusters.push(&text[s..idx]);
        }
        start = Some(idx);
    }
    if let Some(s) = start {
        clusters.push(&text[s..]);
    }
    clusters
}

pub fn grapheme_count(text: &str) -> usize {
    segment(text).len()
}

/// Dominant script of `text`, ignoring digits, punctuation and whitespace.
///
/// Returns `Script::Other` for text with no classifiable letters.
pub fn detect_script(text: &str) -> Script {
    let mut counts: Vec<(Script, usize)> = Vec::new();
    for c in text.chars() {
        let s = Script::of(c);
        if s == Script::Other {
            continue;
        }
        match counts.iter_mut().find(|(k, _)| *k == s) {
            Some((_, n)) => *n += 1,
            None => counts.push((s, 1)),
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(s, _)| s)
        .unwrap_or(Script::Other)
}

pub fn contains_indic(text: &str) -> bool {
    text.chars().any(|c| Script::of(c).is_indic())
}

/// True if every letter of `text` belongs to `script`.
///
/// Whitespace, digits and ASCII punctuation are ignored. Empty text is not native.
pub fn is_native(text: &str, script: Script) -> bool {
    let mut seen = false;
    for c in text.chars() {
        if c.is_whitespace() || c.is_ascii_digit() || c.is_ascii_punctuation() {
            continue;
        }
        if Script::of(c) != script {
            return false;
        }
        seen = true;
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_devanagari_with_matras() {
        // न + म + स् + ते : the virama binds to स, the matra to त
        let parts = segment("नमस्ते");
        assert_eq!(parts, vec!["न", "म", "स्", "ते"]);
        assert_eq!(parts.concat(), "नमस्ते");
    }

    #[test]
    fn segments_latin_per_char() {
        assert_eq!(segment("abc"), vec!["a", "b", "c"]);
        assert!(segment("").is_empty());
    }

    #[test]
    fn leading_mark_forms_own_cluster() {
        let parts = segment("\u{093F}क");
        assert_eq!(parts, vec!["\u{093F}", "क"]);
    }

    #[test]
    fn telugu_and_tamil_clusters() {
        assert_eq!(segment("తెలుగు"), vec!["తె", "లు", "గు"]);
        assert_eq!(segment("தமிழ்"), vec!["த", "மி", "ழ்"]);
    }

    #[test]
    fn rarer_marks_stay_attached() {
        // Devanagari oe sign, Tamil au length mark, Kannada length mark,
        // Malayalam combining anusvara above
        assert_eq!(segment("क\u{093A}"), vec!["क\u{093A}"]);
        assert_eq!(segment("क\u{0955}ख"), vec!["क\u{0955}", "ख"]);
        assert_eq!(segment("க\u{0BC6}\u{0BD7}"), vec!["க\u{0BC6}\u{0BD7}"]);
        assert_eq!(segment("ಕ\u{0CD5}"), vec!["ಕ\u{0CD5}"]);
        assert_eq!(segment("ക\u{0D00}"), vec!["ക\u{0D00}"]);
    }

    #[test]
    fn reconstructs_mixed_text() {
        let text = "hello किताब world";
        assert_eq!(segment(text).concat(), text);
    }

    #[test]
    fn script_detection() {
        assert_eq!(detect_script("hello"), Script::Latin);
        assert_eq!(detect_script("नमस्ते"), Script::Devanagari);
        assert_eq!(detect_script("123 !"), Script::Other);
        assert!(contains_indic("abc क"));
        assert!(!contains_indic("abc"));
    }

    #[test]
    fn native_check() {
        assert!(is_native("नमस्ते दोस्त", Script::Devanagari));
        assert!(!is_native("नमस्ते dost", Script::Devanagari));
        assert!(!is_native("", Script::Devanagari));
    }

    #[test]
    fn viramas() {
        assert!(is_virama('\u{094D}'));
        assert!(is_virama('\u{0C4D}'));
        assert!(!is_virama('क'));
    }
}
