//! Errors raised while loading or persisting linguistic data.
//!
//! Query paths never surface these; they are logged and turned into empty
//! results. Loaders, snapshot helpers and the CLI see them directly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("word list for '{0}' is missing")]
    MissingWordList(String),

    #[error("i/o error reading {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build prefix index: {0}")]
    Index(#[from] fst::Error),

    #[error("invalid dictionary snapshot: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("invalid corrections json: {0}")]
    Corrections(#[from] serde_json::Error),

    #[error("load of '{0}' was cancelled")]
    Cancelled(String),
}

impl DictionaryError {
    pub(crate) fn io(what: impl Into<String>, source: std::io::Error) -> Self {
        DictionaryError::Io {
            what: what.into(),
            source,
        }
    }
}
