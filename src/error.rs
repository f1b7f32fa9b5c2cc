// src/error.rs

use thiserror::Error;

/// Raised only when the input cannot be treated as text at all.
///
/// A field that cannot be found is never an error; it shows up in
/// `ParsedOrder::missing_fields` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("order export is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Failures from the SQLite order store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored JSON could not be (de)serialized: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
