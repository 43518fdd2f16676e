//! Text cleaning building blocks.

/// Word lemmatization back-ends.
pub mod lemmatizer;
/// The per-comment normalization pipeline.
pub mod normalizer;
/// English stopword set with the sentiment allowlist.
pub mod stopwords;

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while building or running the normalizer.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Character filter failed to compile.
    #[error("invalid character filter: {0}")]
    Pattern(#[from] regex::Error),
    /// A resource file could not be read.
    #[error("reading resource {path:?}: {source}")]
    Resource {
        /// Resource path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A resource file line could not be parsed.
    #[error("{path:?} line {line}: {reason}")]
    InvalidResource {
        /// Resource path.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
    /// The lemmatizer rejected a word.
    #[error("lemmatizing {word:?}: {reason}")]
    Lemmatize {
        /// Word being reduced.
        word: String,
        /// Back-end failure description.
        reason: String,
    },
}
