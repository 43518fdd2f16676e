use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared_logging::StageLogger;

use crate::{
    dataset::{save_processed, ColumnStats, CommentTable},
    text::{
        lemmatizer::RuleLemmatizer, normalizer::CommentNormalizer, stopwords::StopwordSet,
    },
};

/// Settings for the preprocessing stage (`[preprocessing]` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreprocessingSettings {
    /// Directory holding the raw CSVs.
    pub raw_dir: PathBuf,
    /// Directory receiving the processed CSVs.
    pub interim_dir: PathBuf,
    /// Raw training file name.
    pub train_file: String,
    /// Raw test file name.
    pub test_file: String,
    /// Processed training file name.
    pub train_output: String,
    /// Processed test file name.
    pub test_output: String,
    /// Column holding the comment text.
    pub text_column: String,
    /// Error log written by this stage.
    pub error_log: PathBuf,
    /// Extra stopwords, one per line.
    pub extra_stopwords: Option<PathBuf>,
    /// Extra lemma exceptions, `inflected<TAB>lemma` per line.
    pub lemma_exceptions: Option<PathBuf>,
}

impl Default for PreprocessingSettings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./data/raw"),
            interim_dir: PathBuf::from("./data/interim"),
            train_file: "train.csv".into(),
            test_file: "test.csv".into(),
            train_output: "train_processed.csv".into(),
            test_output: "test_processed.csv".into(),
            text_column: "clean_comment".into(),
            error_log: PathBuf::from("preprocessing_errors.log"),
            extra_stopwords: None,
            lemma_exceptions: None,
        }
    }
}

impl PreprocessingSettings {
    /// Builds the normalizer, loading any extra resource files.
    pub fn build_normalizer(&self) -> Result<CommentNormalizer<RuleLemmatizer>> {
        let mut stopwords = StopwordSet::english();
        if let Some(path) = &self.extra_stopwords {
            stopwords
                .extend_from_path(path)
                .with_context(|| format!("loading stopwords from {}", path.display()))?;
        }
        let mut lemmatizer = RuleLemmatizer::new();
        if let Some(path) = &self.lemma_exceptions {
            lemmatizer
                .extend_from_path(path)
                .with_context(|| format!("loading lemma exceptions from {}", path.display()))?;
        }
        Ok(CommentNormalizer::new(stopwords, lemmatizer)?)
    }
}

/// Summary of one preprocessing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessingReport {
    /// Training column counters.
    pub train: ColumnStats,
    /// Test column counters.
    pub test: ColumnStats,
    /// Written training file.
    pub train_output: PathBuf,
    /// Written test file.
    pub test_output: PathBuf,
}

/// Raw CSVs in, normalized CSVs out.
#[derive(Debug, Clone)]
pub struct PreprocessingStage {
    settings: PreprocessingSettings,
    logger: StageLogger,
}

impl PreprocessingStage {
    /// Logger name used by this stage.
    pub const LOGGER_NAME: &'static str = "data_preprocessing";

    /// Creates the stage.
    #[must_use]
    pub const fn new(settings: PreprocessingSettings, logger: StageLogger) -> Self {
        Self { settings, logger }
    }

    /// Stage settings.
    #[must_use]
    pub const fn settings(&self) -> &PreprocessingSettings {
        &self.settings
    }

    /// Loads, normalizes and saves both datasets.
    pub fn run(&self) -> Result<PreprocessingReport> {
        let settings = &self.settings;
        self.logger.debug("Starting data preprocessing...");
        let normalizer = settings
            .build_normalizer()?
            .with_logger(self.logger.clone());

        let mut train = CommentTable::load(settings.raw_dir.join(&settings.train_file))?;
        let mut test = CommentTable::load(settings.raw_dir.join(&settings.test_file))?;
        self.logger.debug("Data loaded successfully");

        let train_stats = train.normalize_column(&settings.text_column, &normalizer)?;
        let test_stats = test.normalize_column(&settings.text_column, &normalizer)?;

        let [train_output, test_output] = save_processed(
            &train,
            &test,
            &settings.interim_dir,
            [settings.train_output.as_str(), settings.test_output.as_str()],
            Some(&self.logger),
        )?;
        Ok(PreprocessingReport {
            train: train_stats,
            test: test_stats,
            train_output,
            test_output,
        })
    }
}
