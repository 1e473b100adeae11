use thiserror::Error;

/// Programmer/environment failures: setup and persistence problems, never
/// the ordinary "this citation didn't verify" outcome (that is always a
/// [`crate::model::VerificationResult`] with `status = ERROR`, not an `Err`).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("cache database error: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
}
