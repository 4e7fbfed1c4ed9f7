//! Physical key adjacency for Latin keyboard layouts.
//!
//! Used to make "fat finger" substitutions (a key next to the intended one)
//! cheaper than arbitrary substitutions when scoring corrections.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyboardLayout {
    Qwerty,
    Azerty,
    Qwertz,
    /// Native-script layouts: no adjacency table, no proximity penalty.
    Native,
}

static QWERTY: &[(char, &str)] = &[
    ('q', "wa"), ('w', "qes"), ('e', "wrd"), ('r', "etf"), ('t', "ryg"),
    ('y', "tuh"), ('u', "yij"), ('i', "uok"), ('o', "ipl"), ('p', "ol"),
    ('a', "qsz"), ('s', "awdx"), ('d', "sefc"), ('f', "drgv"), ('g', "fthb"),
    ('h', "gyjn"), ('j', "hukm"), ('k', "jil"), ('l', "kop"),
    ('z', "asx"), ('x', "zsdc"), ('c', "xdfv"), ('v', "cfgb"), ('b', "vghn"),
    ('n', "bhjm"), ('m', "njk"),
];

static AZERTY: &[(char, &str)] = &[
    ('a', "zq"), ('z', "aes"), ('e', "zrd"), ('r', "etf"), ('t', "ryg"),
    ('y', "tuh"), ('u', "yij"), ('i', "uok"), ('o', "ipl"), ('p', "ol"),
    ('q', "asw"), ('s', "qzdx"), ('d', "sefc"), ('f', "drgv"), ('g', "fthb"),
    ('h', "gyjn"), ('j', "huk"), ('k', "jil"), ('l', "kopm"), ('m', "lp"),
    ('w', "qsx"), ('x', "wsdc"), ('c', "xdfv"), ('v', "cfgb"), ('b', "vghn"),
    ('n', "bhj"),
];

static QWERTZ: &[(char, &str)] = &[
    ('q', "wa"), ('w', "qes"), ('e', "wrd"), ('r', "etf"), ('t', "rzg"),
    ('z', "tuh"), ('u', "zij"), ('i', "uok"), ('o', "ipl"), ('p', "ol"),
    ('a', "qsy"), ('s', "awdx"), ('d', "sefc"), ('f', "drgv"), ('g', "fthb"),
    ('h', "gzjn"), ('j', "hukm"), ('k', "jil"), ('l', "kop"),
    ('y', "asx"), ('x', "ysdc"), ('c', "xdfv"), ('v', "cfgb"), ('b', "vghn"),
    ('n', "bhjm"), ('m', "njk"),
];

/// Cost of an aligned mismatch between neighbouring keys.
pub const NEIGHBOR_COST: f64 = 0.3;
/// Cost of an aligned mismatch between unrelated keys.
pub const MISMATCH_COST: f64 = 1.0;

impl KeyboardLayout {
    fn table(self) -> Option<&'static [(char, &'static str)]> {
        match self {
            KeyboardLayout::Qwerty => Some(QWERTY),
            KeyboardLayout::Azerty => Some(AZERTY),
            KeyboardLayout::Qwertz => Some(QWERTZ),
            KeyboardLayout::Native => None,
        }
    }

    /// Keys physically adjacent to `key` (lowercase).
    pub fn neighbors(self, key: char) -> &'static str {
        let key = key.to_ascii_lowercase();
        self.table()
            .and_then(|t| t.iter().find(|(k, _)| *k == key))
            .map(|(_, n)| *n)
            .unwrap_or("")
    }

    pub fn are_neighbors(self, a: char, b: char) -> bool {
        self.neighbors(a).contains(b.to_ascii_lowercase())
    }

    /// Sum of per-position mismatch costs between `typed` and `candidate`.
    ///
    /// Only positions present in both words are compared; length differences
    /// are penalised separately by the scorer.
    pub fn proximity_penalty(self, typed: &str, candidate: &str) -> f64 {
        if self.table().is_none() {
            return 0.0;
        }
        typed
            .chars()
            .zip(candidate.chars())
            .map(|(a, b)| {
                let (a, b) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
                if a == b {
                    0.0
                } else if self.are_neighbors(a, b) {
                    NEIGHBOR_COST
                } else {
                    MISMATCH_COST
                }
            })
            .sum()
    }
}
