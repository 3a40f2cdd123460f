use std::path::PathBuf;

use polars::error::PolarsError;
use thiserror::Error;

/// Errors raised while collecting, assembling and evaluating stock data
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("data file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("required column {0} not found")]
    MissingColumn(String),

    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("not enough price data: need {needed} rows, found {found}")]
    NotEnoughData { needed: usize, found: usize },

    #[error("window size must be at least 1")]
    InvalidWindow,

    #[error("unknown indicator {0:?}")]
    UnknownIndicator(String),

    #[error("unknown normalization method {0:?}")]
    UnknownNormalization(String),

    #[error("no prediction pairs to evaluate")]
    EmptyEvaluation,

    #[error("cache entry {0} is corrupt: {1}")]
    CorruptCache(String, String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
