//! Edit distances over codepoints and over grapheme clusters.
//!
//! Both use the optimal-string-alignment variant of Damerau-Levenshtein:
//! insert, delete, substitute and adjacent transposition each cost 1.

use crate::grapheme::{self, Script};

/// Edit distance between two sequences of comparable units.
fn osa_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let cols = b.len() + 1;
    let mut dp = vec![0usize; (a.len() + 1) * cols];
    for i in 0..=a.len() {
        dp[i * cols] = i;
    }
    for j in 0..=b.len() {
        dp[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            let mut best = (dp[(i - 1) * cols + j] + 1)
                .min(dp[i * cols + j - 1] + 1)
                .min(dp[(i - 1) * cols + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(dp[(i - 2) * cols + j - 2] + 1);
            }
            dp[i * cols + j] = best;
        }
    }
    dp[a.len() * cols + b.len()]
}

/// Distance counted in Unicode scalar values.
pub fn character_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    osa_distance(&a, &b)
}

/// Distance counted in grapheme clusters, so a vowel-sign change on an Indic
/// consonant costs 1 rather than the number of codepoints touched.
pub fn grapheme_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a = grapheme::segment(a);
    let b = grapheme::segment(b);
    osa_distance(&a, &b)
}

/// Grapheme-level similarity in `[0, 1]`; two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = grapheme::grapheme_count(a).max(grapheme::grapheme_count(b));
    if max_len == 0 {
        return 1.0;
    }
    1.0 - grapheme_distance(a, b) as f64 / max_len as f64
}

/// Distance in the units appropriate for `script`.
pub fn distance_for(script: Script, a: &str, b: &str) -> usize {
    if script.uses_graphemes() {
        grapheme_distance(a, b)
    } else {
        character_distance(a, b)
    }
}

/// True if `b` is `a` with exactly one pair of adjacent characters swapped.
pub fn is_single_transposition(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len() != b.len() || a.len() < 2 {
        return false;
    }
    let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
    diffs.len() == 2
        && diffs[1] == diffs[0] + 1
        && a[diffs[0]] == b[diffs[1]]
        && a[diffs[1]] == b[diffs[0]]
}
