//! User learning store.
//!
//! The engine only reads from a `LearningStore`: words the user has typed,
//! word pairs they tend to type together, and corrections they rejected.
//! Hosts write to it through the concrete types below.
//!
//! Two backends:
//! - `InMemoryUserDict`: thread-safe maps, used for tests and ephemeral sessions.
//! - `RedbUserDict`: persistent storage in a `redb` database.
//!
//! Every record is keyed per language. Composite keys join their parts with
//! U+001F so a prefix scan on `lang + sep + prefix` stays within one language.
use ahash::{AHashMap, AHashSet};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::warn;

const SEP: char = '\u{1f}';

fn key(parts: &[&str]) -> String {
    let mut k = String::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            k.push(SEP);
        }
        k.push_str(p);
    }
    k
}

fn last_part(k: &str) -> &str {
    k.rsplit(SEP).next().unwrap_or(k)
}

fn sort_by_count(mut entries: Vec<(String, u64)>, limit: usize) -> Vec<(String, u64)> {
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

/// Read access to what the user has taught the keyboard.
pub trait LearningStore: Send + Sync {
    /// Most used learned words, highest count first.
    fn top_words(&self, language: &str, limit: usize) -> Vec<(String, u64)>;

    fn usage_count(&self, language: &str, word: &str) -> u64;

    fn has_learned_word(&self, language: &str, word: &str) -> bool {
        self.usage_count(language, word) > 0
    }

    /// Learned words starting with `prefix`, highest count first.
    fn words_with_prefix(&self, language: &str, prefix: &str, limit: usize) -> Vec<(String, u64)>;

    /// Words the user typed after `previous`, highest count first.
    fn learned_followers(&self, language: &str, previous: &str, limit: usize) -> Vec<(String, u64)>;

    /// True if the user rejected replacing `original` with `corrected`.
    fn is_blacklisted(&self, language: &str, original: &str, corrected: &str) -> bool;

    /// Changes after every write. Results derived from the store stay valid
    /// while it holds still.
    fn generation(&self) -> u64;
}

#[derive(Debug, Default)]
struct UserData {
    words: AHashMap<String, u64>,
    bigrams: AHashMap<String, u64>,
    blacklist: AHashSet<String>,
    generation: u64,
}

/// A thread-safe in-memory learning store.
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserDict {
    inner: Arc<RwLock<UserData>>,
}

impl InMemoryUserDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn a word: increment its count by 1.
    pub fn learn(&self, language: &str, word: &str) {
        self.learn_with_count(language, word, 1);
    }

    /// Learn a word with a custom increment (imports, batch updates).
    pub fn learn_with_count(&self, language: &str, word: &str, delta: u64) {
        if delta == 0 || word.is_empty() {
            return;
        }
        if let Ok(mut data) = self.inner.write() {
            let entry = data.words.entry(key(&[language, word])).or_insert(0);
            *entry = entry.saturating_add(delta);
            data.generation += 1;
        }
    }

    /// Record that `next` was typed right after `previous`.
    pub fn learn_bigram(&self, language: &str, previous: &str, next: &str) {
        if let Ok(mut data) = self.inner.write() {
            let entry = data.bigrams.entry(key(&[language, previous, next])).or_insert(0);
            *entry = entry.saturating_add(1);
            data.generation += 1;
        }
    }

    pub fn blacklist_correction(&self, language: &str, original: &str, corrected: &str) {
        if let Ok(mut data) = self.inner.write() {
            data.blacklist.insert(key(&[language, original, corrected]));
            data.generation += 1;
        }
    }

    pub fn remove_blacklist(&self, language: &str, original: &str, corrected: &str) {
        if let Ok(mut data) = self.inner.write() {
            data.blacklist.remove(&key(&[language, original, corrected]));
            data.generation += 1;
        }
    }

    /// Merge another in-memory store into this one (summing counts).
    pub fn merge_from(&self, other: &InMemoryUserDict) {
        let src = other.snapshot_raw();
        if let Ok(mut dst) = self.inner.write() {
            for (k, v) in src.words {
                let entry = dst.words.entry(k).or_insert(0);
                *entry = entry.saturating_add(v);
            }
            for (k, v) in src.bigrams {
                let entry = dst.bigrams.entry(k).or_insert(0);
                *entry = entry.saturating_add(v);
            }
            dst.blacklist.extend(src.blacklist);
            dst.generation += 1;
        }
    }

    fn snapshot_raw(&self) -> UserData {
        match self.inner.read() {
            Ok(data) => UserData {
                words: data.words.clone(),
                bigrams: data.bigrams.clone(),
                blacklist: data.blacklist.clone(),
                generation: data.generation,
            },
            Err(_) => UserData::default(),
        }
    }

    /// All learned words for a language with their counts.
    pub fn snapshot(&self, language: &str) -> Vec<(String, u64)> {
        self.scan_words(language, "")
    }

    fn scan_words(&self, language: &str, prefix: &str) -> Vec<(String, u64)> {
        let start = key(&[language, prefix]);
        match self.inner.read() {
            Ok(data) => data
                .words
                .iter()
                .filter(|(k, _)| k.starts_with(&start))
                .map(|(k, v)| (last_part(k).to_string(), *v))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl LearningStore for InMemoryUserDict {
    fn top_words(&self, language: &str, limit: usize) -> Vec<(String, u64)> {
        sort_by_count(self.scan_words(language, ""), limit)
    }

    fn usage_count(&self, language: &str, word: &str) -> u64 {
        match self.inner.read() {
            Ok(data) => data.words.get(&key(&[language, word])).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    fn words_with_prefix(&self, language: &str, prefix: &str, limit: usize) -> Vec<(String, u64)> {
        sort_by_count(self.scan_words(language, prefix), limit)
    }

    fn learned_followers(&self, language: &str, previous: &str, limit: usize) -> Vec<(String, u64)> {
        let mut start = key(&[language, previous]);
        start.push(SEP);
        let found = match self.inner.read() {
            Ok(data) => data
                .bigrams
                .iter()
                .filter(|(k, _)| k.starts_with(&start))
                .map(|(k, v)| (last_part(k).to_string(), *v))
                .collect(),
            Err(_) => Vec::new(),
        };
        sort_by_count(found, limit)
    }

    fn is_blacklisted(&self, language: &str, original: &str, corrected: &str) -> bool {
        match self.inner.read() {
            Ok(data) => data.blacklist.contains(&key(&[language, original, corrected])),
            Err(_) => false,
        }
    }

    fn generation(&self) -> u64 {
        match self.inner.read() {
            Ok(data) => data.generation,
            Err(_) => 0,
        }
    }
}

/// Redb-backed learning store.
///
/// Each write is its own transaction; reads use short read transactions.
#[derive(Clone)]
pub struct RedbUserDict {
    db: Arc<Database>,
    path: PathBuf,
    /// bumped after each committed write
    generation: Arc<AtomicU64>,
}

impl std::fmt::Debug for RedbUserDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbUserDict").field("path", &self.path).finish()
    }
}

impl RedbUserDict {
    const WORDS: TableDefinition<'static, &'static str, u64> = TableDefinition::new("user_words");
    const BIGRAMS: TableDefinition<'static, &'static str, u64> = TableDefinition::new("user_bigrams");
    const BLACKLIST: TableDefinition<'static, &'static str, u64> = TableDefinition::new("blacklist");

    /// Create or open a database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, redb::Error> {
        if let Some(parent) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let db = Database::create(path.as_ref())?;
        // create the tables up front so read transactions never miss them
        let txn = db.begin_write()?;
        {
            txn.open_table(Self::WORDS)?;
            txn.open_table(Self::BIGRAMS)?;
            txn.open_table(Self::BLACKLIST)?;
        }
        txn.commit()?;
        Ok(Self {
            db: Arc::new(db),
            path: path.as_ref().to_path_buf(),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn add(&self, table: TableDefinition<'static, &'static str, u64>, k: &str, delta: u64) -> Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(table)?;
            let current = t.get(k)?.map(|v| v.value()).unwrap_or(0);
            t.insert(k, current.saturating_add(delta))?;
        }
        txn.commit()?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn get(&self, table: TableDefinition<'static, &'static str, u64>, k: &str) -> Result<u64, redb::Error> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        Ok(t.get(k)?.map(|v| v.value()).unwrap_or(0))
    }

    fn scan(&self, table: TableDefinition<'static, &'static str, u64>, start: &str) -> Result<Vec<(String, u64)>, redb::Error> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        let mut out = Vec::new();
        for item in t.range(start..)? {
            let (k, v) = item?;
            let k = k.value();
            if !k.starts_with(start) {
                break;
            }
            out.push((last_part(k).to_string(), v.value()));
        }
        Ok(out)
    }

    pub fn learn(&self, language: &str, word: &str) -> Result<(), redb::Error> {
        self.learn_with_count(language, word, 1)
    }

    pub fn learn_with_count(&self, language: &str, word: &str, delta: u64) -> Result<(), redb::Error> {
        if delta == 0 || word.is_empty() {
            return Ok(());
        }
        self.add(Self::WORDS, &key(&[language, word]), delta)
    }

    pub fn learn_bigram(&self, language: &str, previous: &str, next: &str) -> Result<(), redb::Error> {
        self.add(Self::BIGRAMS, &key(&[language, previous, next]), 1)
    }

    pub fn blacklist_correction(&self, language: &str, original: &str, corrected: &str) -> Result<(), redb::Error> {
        self.add(Self::BLACKLIST, &key(&[language, original, corrected]), 1)
    }

    pub fn remove_blacklist(&self, language: &str, original: &str, corrected: &str) -> Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(Self::BLACKLIST)?;
            t.remove(key(&[language, original, corrected]).as_str())?;
        }
        txn.commit()?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// All learned words for a language with their counts.
    pub fn snapshot(&self, language: &str) -> Result<Vec<(String, u64)>, redb::Error> {
        self.scan(Self::WORDS, &key(&[language, ""]))
    }

    fn logged<T: Default>(result: Result<T, redb::Error>) -> T {
        match result {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "learning store read failed");
                T::default()
            }
        }
    }
}

impl LearningStore for RedbUserDict {
    fn top_words(&self, language: &str, limit: usize) -> Vec<(String, u64)> {
        sort_by_count(Self::logged(self.snapshot(language)), limit)
    }

    fn usage_count(&self, language: &str, word: &str) -> u64 {
        Self::logged(self.get(Self::WORDS, &key(&[language, word])))
    }

    fn words_with_prefix(&self, language: &str, prefix: &str, limit: usize) -> Vec<(String, u64)> {
        sort_by_count(
            Self::logged(self.scan(Self::WORDS, &key(&[language, prefix]))),
            limit,
        )
    }

    fn learned_followers(&self, language: &str, previous: &str, limit: usize) -> Vec<(String, u64)> {
        let mut start = key(&[language, previous]);
        start.push(SEP);
        sort_by_count(Self::logged(self.scan(Self::BIGRAMS, &start)), limit)
    }

    fn is_blacklisted(&self, language: &str, original: &str, corrected: &str) -> bool {
        Self::logged(self.get(Self::BLACKLIST, &key(&[language, original, corrected]))) > 0
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Backend switch for hosts that pick the store at runtime.
#[derive(Clone, Debug)]
pub enum UserDict {
    InMemory(InMemoryUserDict),
    Redb(RedbUserDict),
}

impl UserDict {
    pub fn new_in_memory() -> Self {
        UserDict::InMemory(InMemoryUserDict::new())
    }

    pub fn new_redb<P: AsRef<Path>>(path: P) -> Result<Self, redb::Error> {
        Ok(UserDict::Redb(RedbUserDict::new(path)?))
    }

    pub fn learn(&self, language: &str, word: &str) {
        match self {
            UserDict::InMemory(m) => m.learn(language, word),
            UserDict::Redb(r) => {
                if let Err(e) = r.learn(language, word) {
                    warn!(error = %e, "failed to persist learned word");
                }
            }
        }
    }

    pub fn learn_bigram(&self, language: &str, previous: &str, next: &str) {
        match self {
            UserDict::InMemory(m) => m.learn_bigram(language, previous, next),
            UserDict::Redb(r) => {
                if let Err(e) = r.learn_bigram(language, previous, next) {
                    warn!(error = %e, "failed to persist learned bigram");
                }
            }
        }
    }

    pub fn blacklist_correction(&self, language: &str, original: &str, corrected: &str) {
        match self {
            UserDict::InMemory(m) => m.blacklist_correction(language, original, corrected),
            UserDict::Redb(r) => {
                if let Err(e) = r.blacklist_correction(language, original, corrected) {
                    warn!(error = %e, "failed to persist blacklist entry");
                }
            }
        }
    }

    fn store(&self) -> &dyn LearningStore {
        match self {
            UserDict::InMemory(m) => m,
            UserDict::Redb(r) => r,
        }
    }
}

impl LearningStore for UserDict {
    fn top_words(&self, language: &str, limit: usize) -> Vec<(String, u64)> {
        self.store().top_words(language, limit)
    }

    fn usage_count(&self, language: &str, word: &str) -> u64 {
        self.store().usage_count(language, word)
    }

    fn words_with_prefix(&self, language: &str, prefix: &str, limit: usize) -> Vec<(String, u64)> {
        self.store().words_with_prefix(language, prefix, limit)
    }

    fn learned_followers(&self, language: &str, previous: &str, limit: usize) -> Vec<(String, u64)> {
        self.store().learned_followers(language, previous, limit)
    }

    fn is_blacklisted(&self, language: &str, original: &str, corrected: &str) -> bool {
        self.store().is_blacklisted(language, original, corrected)
    }

    fn generation(&self) -> u64 {
        self.store().generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_learn_and_count() {
        let d = InMemoryUserDict::new();
        assert_eq!(d.usage_count("en", "hello"), 0);
        d.learn("en", "hello");
        d.learn_with_count("en", "hello", 4);
        assert_eq!(d.usage_count("en", "hello"), 5);
        assert!(d.has_learned_word("en", "hello"));
        assert!(!d.has_learned_word("fr", "hello"));
    }

    #[test]
    fn prefix_and_top_words_are_per_language() {
        let d = InMemoryUserDict::new();
        d.learn_with_count("en", "hello", 3);
        d.learn_with_count("en", "help", 5);
        d.learn_with_count("en", "world", 9);
        d.learn_with_count("de", "hallo", 2);

        let hel: Vec<String> = d.words_with_prefix("en", "hel", 10).into_iter().map(|(w, _)| w).collect();
        assert_eq!(hel, vec!["help", "hello"]);
        assert_eq!(d.top_words("en", 1)[0].0, "world");
        assert_eq!(d.top_words("de", 10).len(), 1);
    }

    #[test]
    fn followers_and_blacklist() {
        let d = InMemoryUserDict::new();
        d.learn_bigram("en", "good", "morning");
        d.learn_bigram("en", "good", "morning");
        d.learn_bigram("en", "good", "night");
        d.learn_bigram("en", "goodbye", "friend");
        let f = d.learned_followers("en", "good", 5);
        assert_eq!(f, vec![("morning".to_string(), 2), ("night".to_string(), 1)]);

        d.blacklist_correction("en", "teh", "the");
        assert!(d.is_blacklisted("en", "teh", "the"));
        d.remove_blacklist("en", "teh", "the");
        assert!(!d.is_blacklisted("en", "teh", "the"));
    }

    #[test]
    fn writes_bump_generation() {
        let d = InMemoryUserDict::new();
        let g0 = d.generation();
        d.learn("en", "hello");
        let g1 = d.generation();
        assert!(g1 > g0);
        d.usage_count("en", "hello");
        d.top_words("en", 5);
        assert_eq!(d.generation(), g1);
        d.blacklist_correction("en", "teh", "the");
        assert!(d.generation() > g1);

        let dir = tempfile::tempdir().unwrap();
        let r = RedbUserDict::new(dir.path().join("g.redb")).unwrap();
        let g0 = r.generation();
        r.learn_bigram("en", "good", "night").unwrap();
        assert!(r.generation() > g0);
        let g1 = r.generation();
        r.remove_blacklist("en", "teh", "the").unwrap();
        assert!(r.generation() > g1);
    }

    #[test]
    fn in_memory_merge() {
        let a = InMemoryUserDict::new();
        let b = InMemoryUserDict::new();
        a.learn_with_count("en", "a", 2);
        b.learn_with_count("en", "a", 3);
        b.learn_with_count("en", "b", 1);
        a.merge_from(&b);
        assert_eq!(a.usage_count("en", "a"), 5);
        assert_eq!(a.usage_count("en", "b"), 1);
    }

    #[test]
    fn enum_dispatches_to_backend() {
        let u = UserDict::new_in_memory();
        u.learn("hi", "नमस्ते");
        u.learn_bigram("hi", "नमस्ते", "दोस्त");
        assert_eq!(u.usage_count("hi", "नमस्ते"), 1);
        assert_eq!(u.learned_followers("hi", "नमस्ते", 3).len(), 1);
    }
}
