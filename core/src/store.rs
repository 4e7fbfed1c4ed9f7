//! Lazily loaded per-language dictionaries.
//!
//! Each `load_language` call runs the parse on its own named thread. The
//! finished `Dictionary` is installed with one swap under the write lock, so
//! readers see either no dictionary or a complete one. At most one load per
//! language is in flight; repeated calls share its `LoadHandle`.

use ahash::AHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::assets::{build_dictionary, AssetSource};
use crate::dictionary::{Dictionary, LoadReport, NOT_FOUND_RANK};
use crate::error::DictionaryError;

/// How a load request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(LoadReport),
    /// The language was already installed; no work was done.
    AlreadyLoaded,
    Failed(String),
    /// The load was cancelled by `unload_language` and installed nothing.
    Cancelled,
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_) | LoadOutcome::AlreadyLoaded)
    }
}

/// Future-style handle for one load. Cloning shares the same slot.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    language: String,
    slot: Arc<(Mutex<Option<LoadOutcome>>, Condvar)>,
}

impl LoadHandle {
    fn pending(language: &str) -> Self {
        Self {
            language: language.to_string(),
            slot: Arc::new((Mutex::new(None), Condvar::new())),
        }
    }

    fn resolved(language: &str, outcome: LoadOutcome) -> Self {
        let handle = Self::pending(language);
        handle.resolve(outcome);
        handle
    }

    fn resolve(&self, outcome: LoadOutcome) {
        let (lock, cvar) = &*self.slot;
        let mut guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        if guard.is_none() {
            *guard = Some(outcome);
        }
        cvar.notify_all();
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Outcome if the load has finished.
    pub fn try_outcome(&self) -> Option<LoadOutcome> {
        let (lock, _) = &*self.slot;
        lock.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_finished(&self) -> bool {
        self.try_outcome().is_some()
    }

    /// Block until the load resolves.
    pub fn wait(&self) -> LoadOutcome {
        let (lock, cvar) = &*self.slot;
        let mut guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = cvar.wait(guard).unwrap_or_else(|p| p.into_inner());
        }
    }

    /// Block for at most `timeout`; `None` if the load is still running.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<LoadOutcome> {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.slot;
        let mut guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            if let Some(outcome) = guard.as_ref() {
                return Some(outcome.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard = cvar
                .wait_timeout(guard, deadline - now)
                .map(|(g, _)| g)
                .unwrap_or_else(|p| p.into_inner().0);
        }
    }
}

struct InFlight {
    id: u64,
    cancel: Arc<AtomicBool>,
    handle: LoadHandle,
}

#[derive(Default)]
struct StoreState {
    loaded: AHashMap<String, Arc<Dictionary>>,
    loading: AHashMap<String, InFlight>,
    next_id: u64,
}

/// Shared, thread-safe registry of loaded dictionaries.
#[derive(Clone)]
pub struct DictionaryStore {
    source: Arc<dyn AssetSource>,
    state: Arc<RwLock<StoreState>>,
    epoch: Arc<AtomicU64>,
    max_words: usize,
    max_ngrams: usize,
}

impl std::fmt::Debug for DictionaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("loaded", &self.loaded_languages())
            .field("epoch", &self.epoch())
            .finish()
    }
}

fn read(state: &RwLock<StoreState>) -> RwLockReadGuard<'_, StoreState> {
    state.read().unwrap_or_else(|p| p.into_inner())
}

fn write(state: &RwLock<StoreState>) -> RwLockWriteGuard<'_, StoreState> {
    state.write().unwrap_or_else(|p| p.into_inner())
}

fn language_key(code: &str) -> String {
    code.trim().to_lowercase()
}

impl DictionaryStore {
    pub fn new(source: Arc<dyn AssetSource>, max_words: usize, max_ngrams: usize) -> Self {
        Self {
            source,
            state: Arc::new(RwLock::new(StoreState::default())),
            epoch: Arc::new(AtomicU64::new(0)),
            max_words,
            max_ngrams,
        }
    }

    // ========== Lifecycle ==========

    /// Start loading `code` in the background.
    ///
    /// Idempotent: while the language is loaded or loading this returns a
    /// handle to the existing state and starts nothing.
    pub fn load_language(&self, code: &str) -> LoadHandle {
        let lang = language_key(code);
        let mut state = write(&self.state);

        if state.loaded.contains_key(&lang) {
            return LoadHandle::resolved(&lang, LoadOutcome::AlreadyLoaded);
        }
        if let Some(inflight) = state.loading.get(&lang) {
            return inflight.handle.clone();
        }

        state.next_id += 1;
        let id = state.next_id;
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = LoadHandle::pending(&lang);
        state.loading.insert(
            lang.clone(),
            InFlight {
                id,
                cancel: cancel.clone(),
                handle: handle.clone(),
            },
        );
        drop(state);

        let worker = self.clone();
        let worker_handle = handle.clone();
        let worker_lang = lang.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("dict-load-{}", lang))
            .spawn(move || {
                let outcome = worker.run_load(&worker_lang, id, cancel);
                worker_handle.resolve(outcome);
            });

        if let Err(e) = spawned {
            warn!(language = %lang, error = %e, "failed to spawn loader thread");
            self.finish_failed(&lang, id);
            handle.resolve(LoadOutcome::Failed(e.to_string()));
        }
        handle
    }

    fn run_load(&self, lang: &str, id: u64, cancel: Arc<AtomicBool>) -> LoadOutcome {
        let started = Instant::now();
        debug!(language = lang, "loading dictionary");
        let result = build_dictionary(
            self.source.as_ref(),
            lang,
            self.max_words,
            self.max_ngrams,
            cancel.clone(),
        );

        match result {
            Ok((dict, report)) => {
                let mut state = write(&self.state);
                let current = state.loading.get(lang).map(|f| f.id) == Some(id);
                if !current || cancel.load(Ordering::Acquire) {
                    debug!(language = lang, "discarding cancelled load");
                    return LoadOutcome::Cancelled;
                }
                state.loading.remove(lang);
                state.loaded.insert(lang.to_string(), Arc::new(dict));
                self.epoch.fetch_add(1, Ordering::AcqRel);
                info!(
                    language = lang,
                    words = report.words,
                    bigrams = report.bigrams,
                    malformed = report.malformed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "dictionary loaded"
                );
                if report.malformed > 0 {
                    warn!(language = lang, skipped = report.malformed, "skipped malformed lines");
                }
                LoadOutcome::Loaded(report)
            }
            Err(DictionaryError::Cancelled(_)) => {
                self.finish_failed(lang, id);
                debug!(language = lang, "load cancelled");
                LoadOutcome::Cancelled
            }
            Err(e) => {
                self.finish_failed(lang, id);
                warn!(language = lang, error = %e, "dictionary not loaded");
                LoadOutcome::Failed(e.to_string())
            }
        }
    }

    fn finish_failed(&self, lang: &str, id: u64) {
        let mut state = write(&self.state);
        if state.loading.get(lang).map(|f| f.id) == Some(id) {
            state.loading.remove(lang);
        }
    }

    /// Install an already built dictionary, replacing any previous one.
    pub fn install(&self, dictionary: Dictionary) {
        let lang = language_key(dictionary.language());
        let mut state = write(&self.state);
        if let Some(inflight) = state.loading.remove(&lang) {
            inflight.cancel.store(true, Ordering::Release);
        }
        state.loaded.insert(lang, Arc::new(dictionary));
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop a language's tables and cancel any in-flight load.
    ///
    /// Returns true if anything was loaded or loading.
    pub fn unload_language(&self, code: &str) -> bool {
        let lang = language_key(code);
        let mut state = write(&self.state);
        let mut changed = false;
        if let Some(inflight) = state.loading.remove(&lang) {
            inflight.cancel.store(true, Ordering::Release);
            changed = true;
        }
        if state.loaded.remove(&lang).is_some() {
            changed = true;
        }
        if changed {
            self.epoch.fetch_add(1, Ordering::AcqRel);
            debug!(language = %lang, "language unloaded");
        }
        changed
    }

    // ========== State ==========

    pub fn is_loaded(&self, code: &str) -> bool {
        read(&self.state).loaded.contains_key(&language_key(code))
    }

    pub fn is_loading(&self, code: &str) -> bool {
        read(&self.state).loading.contains_key(&language_key(code))
    }

    /// Loaded language codes, sorted.
    pub fn loaded_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = read(&self.state).loaded.keys().cloned().collect();
        langs.sort();
        langs
    }

    /// Counter bumped on every install and unload.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Shared reference to a loaded dictionary.
    pub fn dictionary(&self, code: &str) -> Option<Arc<Dictionary>> {
        read(&self.state).loaded.get(&language_key(code)).cloned()
    }

    // ========== Queries ==========

    pub fn word_count(&self, code: &str) -> usize {
        self.dictionary(code).map(|d| d.word_count()).unwrap_or(0)
    }

    pub fn candidates_by_prefix(&self, prefix: &str, code: &str, limit: usize) -> Vec<String> {
        match self.dictionary(code) {
            Some(d) => d.prefix_matches(prefix, limit).into_iter().map(|(w, _)| w).collect(),
            None => Vec::new(),
        }
    }

    pub fn all_words(&self, code: &str) -> Vec<String> {
        self.dictionary(code)
            .map(|d| d.words_by_rank().to_vec())
            .unwrap_or_default()
    }

    pub fn frequency_rank(&self, code: &str, word: &str) -> u32 {
        self.dictionary(code)
            .map(|d| d.frequency_rank(word))
            .unwrap_or(NOT_FOUND_RANK)
    }

    pub fn bigram_frequency(&self, code: &str, w1: &str, w2: &str) -> u32 {
        self.dictionary(code)
            .map(|d| d.bigram_frequency(w1, w2))
            .unwrap_or(0)
    }

    pub fn trigram_frequency(&self, code: &str, w1: &str, w2: &str, w3: &str) -> u32 {
        self.dictionary(code)
            .map(|d| d.trigram_frequency(w1, w2, w3))
            .unwrap_or(0)
    }

    pub fn direct_correction(&self, code: &str, typo: &str) -> Option<String> {
        self.dictionary(code)
            .and_then(|d| d.direct_correction(typo).map(|s| s.to_string()))
    }

    pub fn contains(&self, code: &str, word: &str) -> bool {
        self.dictionary(code).map(|d| d.contains(word)).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetKind, MemoryAssets};

    fn store() -> DictionaryStore {
        let assets = MemoryAssets::new()
            .with("en", AssetKind::Words, "the 1\nhello 10\nhelp 5\n")
            .with("en", AssetKind::Bigrams, "say hello 3\n");
        DictionaryStore::new(Arc::new(assets), 1000, 1000)
    }

    #[test]
    fn load_then_query() {
        let s = store();
        assert!(!s.is_loaded("en"));
        let outcome = s.load_language("en").wait();
        assert!(matches!(outcome, LoadOutcome::Loaded(_)));
        assert!(s.is_loaded("EN"));
        assert_eq!(s.candidates_by_prefix("hel", "en", 5), vec!["help", "hello"]);
        assert_eq!(s.all_words("en")[0], "the");
        assert_eq!(s.bigram_frequency("en", "say", "hello"), 3);
        assert_eq!(s.frequency_rank("en", "zzz"), NOT_FOUND_RANK);
    }

    #[test]
    fn second_load_is_a_noop() {
        let s = store();
        s.load_language("en").wait();
        let epoch = s.epoch();
        assert_eq!(s.load_language("en").wait(), LoadOutcome::AlreadyLoaded);
        assert_eq!(s.epoch(), epoch);
    }

    #[test]
    fn missing_language_fails_softly() {
        let s = store();
        let outcome = s.load_language("xx").wait();
        assert!(matches!(outcome, LoadOutcome::Failed(_)));
        assert!(!s.is_loaded("xx"));
        assert!(!s.is_loading("xx"));
        assert!(s.candidates_by_prefix("a", "xx", 5).is_empty());
    }

    #[test]
    fn unload_bumps_epoch() {
        let s = store();
        s.load_language("en").wait();
        let before = s.epoch();
        assert!(s.unload_language("en"));
        assert!(!s.is_loaded("en"));
        assert!(s.epoch() > before);
        assert!(!s.unload_language("en"));
    }
}
