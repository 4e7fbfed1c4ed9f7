//! Merging and ordering of scored candidates.
//!
//! Candidates for the same word are combined: scores are summed and, when
//! more than one source agreed, multiplied by `1 + ln(n) * k`. The merged
//! entry keeps the highest-priority source and the smallest edit distance.

use ahash::AHashMap;
use std::cmp::Ordering;

use crate::candidate::Suggestion;

struct Group {
    representative: Suggestion,
    total: f64,
    count: usize,
}

/// Descending score, then fewer edits, then lexicographic word.
pub fn compare(a: &Suggestion, b: &Suggestion) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.edit_distance.cmp(&b.edit_distance))
        .then_with(|| a.word.cmp(&b.word))
}

/// Merge duplicates, sort, apply the optional score floor and truncate.
pub fn aggregate(
    candidates: Vec<Suggestion>,
    limit: usize,
    agreement_factor: f64,
    min_score: Option<f64>,
) -> Vec<Suggestion> {
    let mut groups: AHashMap<String, Group> = AHashMap::new();
    for cand in candidates {
        match groups.get_mut(&cand.word) {
            Some(g) => {
                g.total += cand.score;
                g.count += 1;
                let edit_distance = g.representative.edit_distance.min(cand.edit_distance);
                if cand.source.priority() > g.representative.source.priority() {
                    g.representative = cand;
                }
                g.representative.edit_distance = edit_distance;
            }
            None => {
                groups.insert(
                    cand.word.clone(),
                    Group {
                        total: cand.score,
                        count: 1,
                        representative: cand,
                    },
                );
            }
        }
    }

    let mut merged: Vec<Suggestion> = groups
        .into_values()
        .map(|g| {
            let mut s = g.representative;
            s.score = if g.count > 1 {
                g.total * (1.0 + (g.count as f64).ln() * agreement_factor)
            } else {
                g.total
            };
            if s.edit_distance == 0 {
                s.is_correction = false;
            }
            s
        })
        .filter(|s| min_score.map(|m| s.score >= m).unwrap_or(true))
        .collect();

    merged.sort_by(compare);
    merged.truncate(limit);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Source;

    #[test]
    fn duplicates_sum_with_agreement_bonus() {
        let out = aggregate(
            vec![
                Suggestion::prediction("world", 0.5, Source::Bigram),
                Suggestion::prediction("world", 0.7, Source::Trigram),
                Suggestion::prediction("word", 1.0, Source::Bigram),
            ],
            5,
            0.1,
            None,
        );
        assert_eq!(out[0].word, "world");
        let expected = 1.2 * (1.0 + 2f64.ln() * 0.1);
        assert!((out[0].score - expected).abs() < 1e-9);
        assert_eq!(out[0].source, Source::Trigram);
    }

    #[test]
    fn ties_prefer_fewer_edits_then_alphabetical() {
        let out = aggregate(
            vec![
                Suggestion::new("help", 10.0, Source::EditDistance, 1),
                Suggestion::new("hell", 10.0, Source::EditDistance, 1),
                Suggestion::new("held", 10.0, Source::EditDistance, 2),
            ],
            5,
            0.1,
            None,
        );
        let words: Vec<&str> = out.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["hell", "help", "held"]);
    }

    #[test]
    fn limit_and_floor() {
        let cands: Vec<Suggestion> = (0..10)
            .map(|i| Suggestion::prediction(format!("w{}", i), i as f64 / 10.0, Source::Bigram))
            .collect();
        let out = aggregate(cands, 3, 0.1, Some(0.1));
        assert_eq!(out.len(), 3);
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score));

        let cands: Vec<Suggestion> = (0..10)
            .map(|i| Suggestion::prediction(format!("w{}", i), i as f64 / 10.0, Source::Bigram))
            .collect();
        let out = aggregate(cands, 20, 0.1, Some(0.1));
        assert_eq!(out.len(), 9);
    }
}
