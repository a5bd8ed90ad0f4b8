//! Error types for ingestion, the layer store and snapshot storage.

use thiserror::Error;

/// Failure while fetching or decoding a service-record dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("HTTP error {status} fetching {url}")]
    Http { status: u16, url: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("data file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid service date code {0:?} (expected 7 digits)")]
    InvalidDate(String),
}

/// Failure while reading or writing a persisted store snapshot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot corrupt: {0}")]
    Corrupt(String),
}

/// Failure reported by [`crate::LayerStore`] mutations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("stale response for group {group:?}: ticket {ticket}, latest {latest}")]
    StaleResponse {
        group: String,
        ticket: u64,
        latest: u64,
    },

    #[error("layer group not found: {0}")]
    GroupNotFound(String),

    #[error("duplicate layer id: {0}")]
    DuplicateLayerId(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// True when the error only means a newer request superseded this one.
    pub fn is_stale(&self) -> bool {
        matches!(self, StoreError::StaleResponse { .. })
    }
}
