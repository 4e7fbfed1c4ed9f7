//! Phonetic rewrite rules and Soundex keys.
//!
//! Rewrites cover spelling confusions that keep the sound: `ph`/`f` in
//! English, `b`/`v` in Spanish, dropped accents in French, `ß` and umlaut
//! spellings in German.

/// Spelling variants of `word` under the language's sound-preserving rules.
///
/// The input itself is never returned; duplicates are removed.
pub fn variants(word: &str, language: &str) -> Vec<String> {
    let lower = word.to_lowercase();
    let rules: &[(&str, &str)] = match language {
        "en" => &[("ph", "f"), ("f", "ph"), ("c", "k"), ("k", "c"), ("s", "z"), ("z", "s")],
        "es" => &[("b", "v"), ("v", "b"), ("s", "z"), ("z", "s")],
        "fr" => &[("é", "e"), ("è", "e"), ("ê", "e"), ("ç", "c"), ("à", "a")],
        "de" => &[("ß", "ss"), ("ss", "ß"), ("ä", "ae"), ("ö", "oe"), ("ü", "ue"), ("ae", "ä"), ("oe", "ö"), ("ue", "ü")],
        _ => &[],
    };

    let mut out: Vec<String> = Vec::new();
    for (from, to) in rules {
        if !lower.contains(from) {
            continue;
        }
        let v = lower.replace(from, to);
        if v != lower && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

fn code(c: char) -> Option<char> {
    match c.to_ascii_uppercase() {
        'B' | 'F' | 'P' | 'V' => Some('1'),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some('2'),
        'D' | 'T' => Some('3'),
        'L' => Some('4'),
        'M' | 'N' => Some('5'),
        'R' => Some('6'),
        _ => None,
    }
}

/// Classic four-character Soundex (first letter kept, zero padded).
pub fn soundex(word: &str) -> String {
    let mut chars = word.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return String::new(),
    };
    let mut out: String = first.to_uppercase().collect();
    let mut last = code(first);
    for c in chars {
        let digit = code(c);
        if let Some(d) = digit {
            if last != Some(d) {
                out.push(d);
            }
        }
        last = digit;
        if out.chars().count() >= 4 {
            break;
        }
    }
    while out.chars().count() < 4 {
        out.push('0');
    }
    out.chars().take(4).collect()
}

/// True if both words share a Soundex key, treating first letters of the
/// same sound class (`f`/`p`, `c`/`k`) as equal.
pub fn sounds_alike(a: &str, b: &str) -> bool {
    let (ka, kb) = (soundex(a), soundex(b));
    if ka.is_empty() || kb.is_empty() {
        return false;
    }
    if ka == kb {
        return true;
    }
    let first_a = a.chars().next().and_then(code);
    let first_b = b.chars().next().and_then(code);
    first_a.is_some() && first_a == first_b && ka[1..] == kb[1..]
}
