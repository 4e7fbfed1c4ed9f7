//! One language's immutable word, n-gram and correction tables.
//!
//! A `Dictionary` is built once by `DictionaryBuilder` from line-oriented
//! text sources (or decoded from a bincode snapshot) and never mutated
//! afterwards. The store shares it behind an `Arc`.
//!
//! Text formats, one entry per line, whitespace separated:
//! - words:       `word rank` (lower rank = more common; a bare word gets its zero-based line number)
//! - bigrams:     `w1 w2 count`
//! - trigrams:    `w1 w2 w3 count`
//! - corrections: `typo correction`
//!
//! Blank lines and lines starting with `#` are ignored. Anything else that
//! does not parse is skipped and counted in `LoadReport::malformed`.

use ahash::AHashMap;
use std::collections::BinaryHeap;
use fst::automaton::Str;
use fst::{Automaton, IntoStreamer, Map, Streamer};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::DictionaryError;
use crate::utils::normalize_token;

/// Rank reported for words that are not in the dictionary.
pub const NOT_FOUND_RANK: u32 = u32::MAX;

/// A follower word and how often it was observed after its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramEntry {
    pub word: String,
    pub count: u32,
}

/// Counters gathered while building a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub words: usize,
    pub bigrams: usize,
    pub trigrams: usize,
    pub corrections: usize,
    /// Lines that could not be parsed and were skipped
    pub malformed: usize,
    /// True if any table hit its configured cap
    pub truncated: bool,
}

/// Flat serializable form of a dictionary, used for bincode snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionarySnapshot {
    pub language: String,
    pub words: Vec<(String, u32)>,
    pub bigrams: Vec<(String, String, u32)>,
    pub trigrams: Vec<(String, String, String, u32)>,
    pub corrections: Vec<(String, String)>,
}

pub struct Dictionary {
    language: String,
    words: AHashMap<String, u32>,
    /// Words ordered by ascending rank, ties broken lexicographically
    by_rank: Vec<String>,
    /// word -> rank, for prefix streaming
    index: Map<Vec<u8>>,
    bigrams: AHashMap<String, Vec<NgramEntry>>,
    trigrams: AHashMap<(String, String), Vec<NgramEntry>>,
    corrections: AHashMap<String, String>,
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("language", &self.language)
            .field("words", &self.words.len())
            .field("bigram_contexts", &self.bigrams.len())
            .field("trigram_contexts", &self.trigrams.len())
            .field("corrections", &self.corrections.len())
            .finish()
    }
}

impl Dictionary {
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn frequency_rank(&self, word: &str) -> u32 {
        self.words.get(word).copied().unwrap_or(NOT_FOUND_RANK)
    }

    /// All words, most common first.
    pub fn words_by_rank(&self) -> &[String] {
        &self.by_rank
    }

    /// Up to `limit` words starting with `prefix`, ascending rank.
    pub fn prefix_matches(&self, prefix: &str, limit: usize) -> Vec<(String, u32)> {
        if limit == 0 {
            return Vec::new();
        }
        let matcher = Str::new(prefix).starts_with();
        let mut stream = self.index.search(matcher).into_stream();
        // max-heap of the best `limit` so far; the top is the worst kept entry
        let mut best: BinaryHeap<(u32, String)> = BinaryHeap::with_capacity(limit + 1);
        while let Some((key, rank)) = stream.next() {
            let Ok(word) = std::str::from_utf8(key) else {
                continue;
            };
            let rank = rank as u32;
            if best.len() == limit {
                if let Some((worst_rank, worst)) = best.peek() {
                    if (rank, word) >= (*worst_rank, worst.as_str()) {
                        continue;
                    }
                }
            }
            best.push((rank, word.to_string()));
            if best.len() > limit {
                best.pop();
            }
        }
        best.into_sorted_vec()
            .into_iter()
            .map(|(rank, word)| (word, rank))
            .collect()
    }

    pub fn bigram_frequency(&self, w1: &str, w2: &str) -> u32 {
        self.bigrams
            .get(w1)
            .and_then(|f| f.iter().find(|e| e.word == w2))
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Words seen after `w1`, highest count first.
    pub fn bigram_followers(&self, w1: &str) -> &[NgramEntry] {
        self.bigrams.get(w1).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn trigram_frequency(&self, w1: &str, w2: &str, w3: &str) -> u32 {
        self.trigram_followers(w1, w2)
            .iter()
            .find(|e| e.word == w3)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Words seen after the pair `(w1, w2)`, highest count first.
    pub fn trigram_followers(&self, w1: &str, w2: &str) -> &[NgramEntry] {
        self.trigrams
            .get(&(w1.to_string(), w2.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn direct_correction(&self, typo: &str) -> Option<&str> {
        self.corrections.get(typo).map(|s| s.as_str())
    }

    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }

    pub fn bigram_count(&self) -> usize {
        self.bigrams.values().map(|v| v.len()).sum()
    }

    pub fn trigram_count(&self) -> usize {
        self.trigrams.values().map(|v| v.len()).sum()
    }

    /// Flatten into the serializable snapshot form.
    pub fn to_snapshot(&self) -> DictionarySnapshot {
        let words = self
            .by_rank
            .iter()
            .map(|w| (w.clone(), self.frequency_rank(w)))
            .collect();
        let mut bigrams = Vec::new();
        for (w1, followers) in &self.bigrams {
            for e in followers {
                bigrams.push((w1.clone(), e.word.clone(), e.count));
            }
        }
        bigrams.sort();
        let mut trigrams = Vec::new();
        for ((w1, w2), followers) in &self.trigrams {
            for e in followers {
                trigrams.push((w1.clone(), w2.clone(), e.word.clone(), e.count));
            }
        }
        trigrams.sort();
        let mut corrections: Vec<(String, String)> = self
            .corrections
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        corrections.sort();

        DictionarySnapshot {
            language: self.language.clone(),
            words,
            bigrams,
            trigrams,
            corrections,
        }
    }

    /// Rebuild a dictionary (including its prefix index) from a snapshot.
    pub fn from_snapshot(snapshot: DictionarySnapshot) -> Result<Self, DictionaryError> {
        let mut builder = DictionaryBuilder::new(&snapshot.language);
        builder.read_snapshot(snapshot)?;
        builder.build()
    }

    /// Decode a bincode snapshot from any reader.
    pub fn read_snapshot<R: Read>(reader: R) -> Result<Self, DictionaryError> {
        let snapshot: DictionarySnapshot = bincode::deserialize_from(reader)?;
        Self::from_snapshot(snapshot)
    }

    /// Save to a bincode file.
    pub fn save_bincode<P: AsRef<Path>>(&self, path: P) -> Result<(), DictionaryError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| DictionaryError::io(path.display().to_string(), e))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &self.to_snapshot())?;
        Ok(())
    }

    /// Load from a bincode file produced by `save_bincode`.
    pub fn load_bincode<P: AsRef<Path>>(path: P) -> Result<Self, DictionaryError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DictionaryError::io(path.display().to_string(), e))?;
        Self::read_snapshot(BufReader::new(file))
    }
}

/// Accumulates entries, then freezes them into a `Dictionary`.
pub struct DictionaryBuilder {
    language: String,
    words: AHashMap<String, u32>,
    bigrams: AHashMap<String, Vec<NgramEntry>>,
    trigrams: AHashMap<(String, String), Vec<NgramEntry>>,
    corrections: AHashMap<String, String>,
    max_words: usize,
    max_ngrams: usize,
    cancel: Option<Arc<AtomicBool>>,
    report: LoadReport,
}

impl DictionaryBuilder {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            words: AHashMap::new(),
            bigrams: AHashMap::new(),
            trigrams: AHashMap::new(),
            corrections: AHashMap::new(),
            max_words: usize::MAX,
            max_ngrams: usize::MAX,
            cancel: None,
            report: LoadReport::default(),
        }
    }

    /// Cap the word table and each n-gram table.
    pub fn with_caps(mut self, max_words: usize, max_ngrams: usize) -> Self {
        self.max_words = max_words;
        self.max_ngrams = max_ngrams;
        self
    }

    /// Abort parsing with `DictionaryError::Cancelled` once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    fn check_cancelled(&self) -> Result<(), DictionaryError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Acquire) => {
                Err(DictionaryError::Cancelled(self.language.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Insert a word, keeping the lower rank on duplicates.
    pub fn insert_word(&mut self, word: String, rank: u32) {
        self.words
            .entry(word)
            .and_modify(|r| *r = (*r).min(rank))
            .or_insert(rank);
    }

    pub fn insert_bigram(&mut self, w1: String, w2: String, count: u32) {
        let followers = self.bigrams.entry(w1).or_default();
        match followers.iter_mut().find(|e| e.word == w2) {
            Some(e) => e.count = e.count.saturating_add(count),
            None => followers.push(NgramEntry { word: w2, count }),
        }
    }

    pub fn insert_trigram(&mut self, w1: String, w2: String, w3: String, count: u32) {
        let followers = self.trigrams.entry((w1, w2)).or_default();
        match followers.iter_mut().find(|e| e.word == w3) {
            Some(e) => e.count = e.count.saturating_add(count),
            None => followers.push(NgramEntry { word: w3, count }),
        }
    }

    pub fn insert_correction(&mut self, typo: String, correction: String) {
        self.corrections.insert(typo, correction);
    }

    /// Take the entries of a decoded snapshot, under the same caps and
    /// cancellation checks as the text readers. Capped tables keep their
    /// most common entries.
    pub fn read_snapshot(&mut self, snapshot: DictionarySnapshot) -> Result<(), DictionaryError> {
        let mut words = snapshot.words;
        words.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        self.cap(&mut words, self.max_words);
        for (word, rank) in words {
            self.check_cancelled()?;
            self.insert_word(word, rank);
        }
        self.report.words = self.words.len();

        let mut bigrams = snapshot.bigrams;
        bigrams.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| (&a.0, &a.1).cmp(&(&b.0, &b.1))));
        self.cap(&mut bigrams, self.max_ngrams);
        self.report.bigrams = bigrams.len();
        for (w1, w2, count) in bigrams {
            self.check_cancelled()?;
            self.insert_bigram(w1, w2, count);
        }

        let mut trigrams = snapshot.trigrams;
        trigrams.sort_by(|a, b| b.3.cmp(&a.3).then_with(|| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2))));
        self.cap(&mut trigrams, self.max_ngrams);
        self.report.trigrams = trigrams.len();
        for (w1, w2, w3, count) in trigrams {
            self.check_cancelled()?;
            self.insert_trigram(w1, w2, w3, count);
        }

        self.report.corrections = snapshot.corrections.len();
        for (typo, fix) in snapshot.corrections {
            self.check_cancelled()?;
            self.insert_correction(typo, fix);
        }
        Ok(())
    }

    fn cap<T>(&mut self, entries: &mut Vec<T>, max: usize) {
        if entries.len() > max {
            entries.truncate(max);
            self.report.truncated = true;
        }
    }

    /// Parse a word list. Returns the number of entries accepted.
    pub fn read_words<R: BufRead>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let mut accepted = 0;
        for (ordinal, line) in reader.lines().enumerate() {
            self.check_cancelled()?;
            let line = line.map_err(|e| DictionaryError::io("word list", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if self.words.len() >= self.max_words {
                self.report.truncated = true;
                break;
            }
            let mut parts = line.split_whitespace();
            let word = parts.next().map(normalize_token);
            let rank = match parts.next() {
                Some(r) => r.parse::<u32>().ok(),
                None => u32::try_from(ordinal).ok(),
            };
            match (word, rank, parts.next()) {
                (Some(w), Some(r), None) if !w.is_empty() => {
                    self.insert_word(w, r);
                    accepted += 1;
                }
                _ => self.report.malformed += 1,
            }
        }
        self.report.words = self.words.len();
        Ok(accepted)
    }

    /// Parse a bigram list (`w1 w2 count`).
    pub fn read_bigrams<R: BufRead>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let mut accepted = 0;
        for line in reader.lines() {
            self.check_cancelled()?;
            let line = line.map_err(|e| DictionaryError::io("bigram list", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if accepted >= self.max_ngrams {
                self.report.truncated = true;
                break;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [w1, w2, count] => match count.parse::<u32>() {
                    Ok(c) => {
                        self.insert_bigram(normalize_token(w1), normalize_token(w2), c);
                        accepted += 1;
                    }
                    Err(_) => self.report.malformed += 1,
                },
                _ => self.report.malformed += 1,
            }
        }
        self.report.bigrams = accepted;
        Ok(accepted)
    }

    /// Parse a trigram list (`w1 w2 w3 count`).
    pub fn read_trigrams<R: BufRead>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let mut accepted = 0;
        for line in reader.lines() {
            self.check_cancelled()?;
            let line = line.map_err(|e| DictionaryError::io("trigram list", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if accepted >= self.max_ngrams {
                self.report.truncated = true;
                break;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [w1, w2, w3, count] => match count.parse::<u32>() {
                    Ok(c) => {
                        self.insert_trigram(
                            normalize_token(w1),
                            normalize_token(w2),
                            normalize_token(w3),
                            c,
                        );
                        accepted += 1;
                    }
                    Err(_) => self.report.malformed += 1,
                },
                _ => self.report.malformed += 1,
            }
        }
        self.report.trigrams = accepted;
        Ok(accepted)
    }

    /// Parse a corrections list (`typo correction`; the correction may contain spaces).
    pub fn read_corrections<R: BufRead>(&mut self, reader: R) -> Result<usize, DictionaryError> {
        let mut accepted = 0;
        for line in reader.lines() {
            self.check_cancelled()?;
            let line = line.map_err(|e| DictionaryError::io("corrections list", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once(char::is_whitespace) {
                Some((typo, fix)) if !fix.trim().is_empty() => {
                    self.insert_correction(normalize_token(typo), fix.trim().to_string());
                    accepted += 1;
                }
                _ => self.report.malformed += 1,
            }
        }
        self.report.corrections = accepted;
        Ok(accepted)
    }

    /// Freeze into an immutable dictionary.
    pub fn build(self) -> Result<Dictionary, DictionaryError> {
        self.check_cancelled()?;

        let mut sorted: Vec<(&String, u32)> = self.words.iter().map(|(w, r)| (w, *r)).collect();
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        let by_rank: Vec<String> = sorted.iter().map(|(w, _)| (*w).clone()).collect();

        sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
        let index = Map::from_iter(sorted.into_iter().map(|(w, r)| (w.as_str(), r as u64)))?;

        let mut bigrams = self.bigrams;
        for followers in bigrams.values_mut() {
            followers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        }
        let mut trigrams = self.trigrams;
        for followers in trigrams.values_mut() {
            followers.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        }

        Ok(Dictionary {
            language: self.language,
            words: self.words,
            by_rank,
            index,
            bigrams,
            trigrams,
            corrections: self.corrections,
        })
    }
}
