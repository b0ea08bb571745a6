use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parquet file not found: {0}")]
    ParquetNotFound(PathBuf),

    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("corrupt document {path}: {reason}")]
    CorruptDocument { path: PathBuf, reason: String },

    #[error("missing column {0:?}")]
    MissingColumn(String),

    #[error("invalid value in column {column:?}: {value:?}")]
    InvalidValue { column: String, value: String },

    #[error("pdf extraction failed: {0}")]
    Extraction(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] votelens_core::CoreError),
}

impl StoreError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
