#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Preprocessing stage: cleans raw YouTube comments for the sentiment model.

/// Comment normalization (stopwords, lemmatization, character filtering).
#[path = "../text/main.rs"]
pub mod text;

/// CSV dataset loading, column normalization and persistence.
#[path = "../dataset.rs"]
pub mod dataset;

/// Stage wiring from raw CSVs to interim CSVs.
#[path = "../stage.rs"]
pub mod stage;

pub use dataset::{save_processed, ColumnStats, CommentTable, DatasetError};
pub use stage::{PreprocessingReport, PreprocessingSettings, PreprocessingStage};
pub use text::{
    lemmatizer::{Lemmatizer, RuleLemmatizer},
    normalizer::CommentNormalizer,
    stopwords::{StopwordSet, RETAINED_WORDS},
    NormalizeError,
};
