use std::{
    fs,
    path::{Path, PathBuf},
};

use csv::{Reader, StringRecord, Writer};
use shared_logging::StageLogger;
use thiserror::Error;

use crate::text::{lemmatizer::Lemmatizer, normalizer::CommentNormalizer};

/// Errors raised while reading, normalizing or writing a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// CSV could not be opened or parsed.
    #[error("reading {path:?}: {source}")]
    Read {
        /// Dataset path.
        path: PathBuf,
        /// CSV error.
        #[source]
        source: csv::Error,
    },
    /// CSV could not be written.
    #[error("writing {path:?}: {source}")]
    Write {
        /// Output path.
        path: PathBuf,
        /// CSV error.
        #[source]
        source: csv::Error,
    },
    /// Filesystem failure outside the CSV codec.
    #[error("io error on {path:?}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The text column is not in the header.
    #[error("column {column:?} not found in {path:?}")]
    MissingColumn {
        /// Requested column.
        column: String,
        /// Dataset the column was looked up in.
        path: PathBuf,
    },
}

/// Counters reported after normalizing a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnStats {
    /// Rows visited.
    pub rows: usize,
    /// Rows whose text was kept unchanged because cleaning failed.
    pub fallbacks: usize,
}

/// Headed CSV table with every field kept as text.
#[derive(Debug, Clone)]
pub struct CommentTable {
    source: PathBuf,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CommentTable {
    /// Reads a CSV file with a header row.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let read_err = |source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = Reader::from_path(path).map_err(read_err)?;
        let headers = reader.headers().map_err(read_err)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;
        Ok(Self {
            source: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Builds a table in memory.
    #[must_use]
    pub fn from_parts(
        source: impl Into<PathBuf>,
        headers: StringRecord,
        rows: Vec<StringRecord>,
    ) -> Self {
        Self {
            source: source.into(),
            headers,
            rows,
        }
    }

    /// Header row.
    #[must_use]
    pub const fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Data rows.
    #[must_use]
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` in the header.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|name| name == column)
    }

    /// Values of `column`, row by row.
    pub fn column(&self, column: &str) -> Result<Vec<&str>, DatasetError> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|row| row.get(idx).unwrap_or("")).collect())
    }

    /// Rewrites every value of `column` through the normalizer.
    ///
    /// A missing column aborts the whole batch; failures on single rows keep the
    /// original text and are counted in [`ColumnStats::fallbacks`].
    pub fn normalize_column<L: Lemmatizer>(
        &mut self,
        column: &str,
        normalizer: &CommentNormalizer<L>,
    ) -> Result<ColumnStats, DatasetError> {
        let logger = normalizer.logger();
        let idx = match self.require_column(column) {
            Ok(idx) => idx,
            Err(err) => {
                if let Some(logger) = logger {
                    logger.error(format!("Error during text normalization: {err}"));
                }
                return Err(err);
            }
        };

        let mut stats = ColumnStats::default();
        for row in &mut self.rows {
            let (cleaned, fell_back) = normalizer.normalize_counted(row.get(idx).unwrap_or(""));
            if fell_back {
                stats.fallbacks += 1;
            }
            *row = row
                .iter()
                .enumerate()
                .map(|(pos, field)| if pos == idx { cleaned.as_str() } else { field })
                .collect();
            stats.rows += 1;
        }
        if let Some(logger) = logger {
            logger.debug("Text normalization completed");
        }
        Ok(stats)
    }

    /// Writes the table as CSV (header included, no index column).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let write_err = |source| DatasetError::Write {
            path: path.to_path_buf(),
            source,
        };
        let mut writer = Writer::from_path(path).map_err(write_err)?;
        writer.write_record(&self.headers).map_err(write_err)?;
        for row in &self.rows {
            writer.write_record(row).map_err(write_err)?;
        }
        writer.flush().map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn require_column(&self, column: &str) -> Result<usize, DatasetError> {
        self.column_index(column)
            .ok_or_else(|| DatasetError::MissingColumn {
                column: column.to_string(),
                path: self.source.clone(),
            })
    }
}

/// Writes the processed train/test tables into `interim_dir`, creating it first.
///
/// Returns the two output paths in `[train, test]` order.
pub fn save_processed(
    train: &CommentTable,
    test: &CommentTable,
    interim_dir: &Path,
    file_names: [&str; 2],
    logger: Option<&StageLogger>,
) -> Result<[PathBuf; 2], DatasetError> {
    let result = write_interim(train, test, interim_dir, file_names, logger);
    if let (Err(err), Some(logger)) = (&result, logger) {
        logger.error(format!("Error occurred while saving data: {err}"));
    }
    result
}

fn write_interim(
    train: &CommentTable,
    test: &CommentTable,
    interim_dir: &Path,
    [train_name, test_name]: [&str; 2],
    logger: Option<&StageLogger>,
) -> Result<[PathBuf; 2], DatasetError> {
    let debug = |message: String| {
        if let Some(logger) = logger {
            logger.debug(message);
        }
    };
    debug(format!("Creating directory {}", interim_dir.display()));
    fs::create_dir_all(interim_dir).map_err(|source| DatasetError::Io {
        path: interim_dir.to_path_buf(),
        source,
    })?;
    debug(format!(
        "Directory {} created or already exists",
        interim_dir.display()
    ));

    let train_path = interim_dir.join(train_name);
    let test_path = interim_dir.join(test_name);
    train.save(&train_path)?;
    test.save(&test_path)?;
    debug(format!("Processed data saved to {}", interim_dir.display()));
    Ok([train_path, test_path])
}
