// Error types for the airlock gateway.
// Covers network transport failures, cache store errors, and offline misses.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AirlockError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("offline and no cached copy of {url}")]
    Offline { url: String },

    #[error("cache directory could not be determined for this platform")]
    NoCacheDir,

    #[error("invalid request method: {0}")]
    InvalidMethod(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AirlockError>;
