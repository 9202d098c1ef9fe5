//! Errors for conditions callers are not expected to handle
//!
//! Rejected keys, corrupt records and authority failures are values
//! (`bool`, `Option`, `GenerationOutcome`), not errors.

use snapcode_crypto::{CipherError, RecordError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Image rejected: {0}")]
    Image(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("no home directory; set SNAPCODE_DATA_DIR")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, CoreError>;
