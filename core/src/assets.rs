//! Where dictionary data comes from.
//!
//! The engine never touches the filesystem directly; it asks an
//! `AssetSource` for readers. `DirectoryAssets` serves plain text files (or a
//! precompiled bincode snapshot) from one directory, `MemoryAssets` serves
//! strings registered at runtime and is what the tests use.

use ahash::AHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dictionary::{Dictionary, DictionaryBuilder, DictionarySnapshot, LoadReport};
use crate::error::DictionaryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Words,
    Bigrams,
    Trigrams,
    Corrections,
}

impl AssetKind {
    pub fn suffix(self) -> &'static str {
        match self {
            AssetKind::Words => "words",
            AssetKind::Bigrams => "bigrams",
            AssetKind::Trigrams => "trigrams",
            AssetKind::Corrections => "corrections",
        }
    }
}

pub type AssetReader = Box<dyn BufRead + Send>;

/// Provider of per-language text assets.
pub trait AssetSource: Send + Sync {
    /// Open one asset. `Ok(None)` means the asset does not exist.
    fn open(&self, language: &str, kind: AssetKind) -> Result<Option<AssetReader>, DictionaryError>;

    /// Open a precompiled bincode snapshot, if the source has one.
    fn open_snapshot(&self, _language: &str) -> Result<Option<Box<dyn Read + Send>>, DictionaryError> {
        Ok(None)
    }
}

/// Plain files in a single directory:
/// `{code}_words.txt`, `{code}_bigrams.txt`, `{code}_trigrams.txt`,
/// `{code}_corrections.txt` and `{code}.dict.bin`.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
}

impl DirectoryAssets {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn text_path(&self, language: &str, kind: AssetKind) -> PathBuf {
        self.root.join(format!("{}_{}.txt", language, kind.suffix()))
    }

    pub fn snapshot_path(&self, language: &str) -> PathBuf {
        self.root.join(format!("{}.dict.bin", language))
    }

    fn open_file(path: &Path) -> Result<Option<File>, DictionaryError> {
        match File::open(path) {
            Ok(f) => Ok(Some(f)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DictionaryError::io(path.display().to_string(), e)),
        }
    }
}

impl AssetSource for DirectoryAssets {
    fn open(&self, language: &str, kind: AssetKind) -> Result<Option<AssetReader>, DictionaryError> {
        let path = self.text_path(language, kind);
        Ok(Self::open_file(&path)?.map(|f| Box::new(BufReader::new(f)) as AssetReader))
    }

    fn open_snapshot(&self, language: &str) -> Result<Option<Box<dyn Read + Send>>, DictionaryError> {
        let path = self.snapshot_path(language);
        Ok(Self::open_file(&path)?.map(|f| Box::new(BufReader::new(f)) as Box<dyn Read + Send>))
    }
}

/// In-memory assets keyed by language and kind.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    texts: AHashMap<(String, AssetKind), Arc<str>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: &str, kind: AssetKind, text: &str) {
        self.texts.insert((language.to_string(), kind), Arc::from(text));
    }

    /// Builder-style `insert`.
    pub fn with(mut self, language: &str, kind: AssetKind, text: &str) -> Self {
        self.insert(language, kind, text);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, language: &str, kind: AssetKind) -> Result<Option<AssetReader>, DictionaryError> {
        Ok(self
            .texts
            .get(&(language.to_string(), kind))
            .map(|t| Box::new(Cursor::new(t.as_bytes().to_vec())) as AssetReader))
    }
}

/// Build a language's dictionary from `source`.
///
/// A snapshot, when present, wins over the text files. Both are subject to
/// the caps. Without a snapshot the word list is required; the n-gram and
/// correction lists are optional.
pub fn build_dictionary(
    source: &dyn AssetSource,
    language: &str,
    max_words: usize,
    max_ngrams: usize,
    cancel: Arc<AtomicBool>,
) -> Result<(Dictionary, LoadReport), DictionaryError> {
    let mut builder = DictionaryBuilder::new(language)
        .with_caps(max_words, max_ngrams)
        .with_cancel(cancel);

    if let Some(reader) = source.open_snapshot(language)? {
        let snapshot: DictionarySnapshot = bincode::deserialize_from(reader)?;
        builder.read_snapshot(snapshot)?;
        let report = builder.report().clone();
        info!(language, words = report.words, truncated = report.truncated, "loaded dictionary snapshot");
        return Ok((builder.build()?, report));
    }

    let words = source
        .open(language, AssetKind::Words)?
        .ok_or_else(|| DictionaryError::MissingWordList(language.to_string()))?;
    builder.read_words(words)?;

    for kind in [AssetKind::Bigrams, AssetKind::Trigrams, AssetKind::Corrections] {
        match source.open(language, kind)? {
            Some(reader) => {
                match kind {
                    AssetKind::Bigrams => builder.read_bigrams(reader)?,
                    AssetKind::Trigrams => builder.read_trigrams(reader)?,
                    _ => builder.read_corrections(reader)?,
                };
            }
            None => debug!(language, kind = kind.suffix(), "optional asset missing"),
        }
    }

    let report = builder.report().clone();
    let dict = builder.build()?;
    Ok((dict, report))
}
