//! Error types for the forecast pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the forecast pipeline.
///
/// Coverage gaps (an event window with zero documents) are deliberately not
/// an error: they are surfaced as flags on the output row and counted in
/// the run summary.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed event calendar. Fatal, aborts the run.
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// One bad document. Logged and skipped, never fatal.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A dataset partition lacks enough positive examples. Fatal before
    /// training.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Classifier or calibration failure surfaced through the prediction
    /// interface.
    #[error("Model error: {0}")]
    Model(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a schedule error.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Error::Schedule(msg.into())
    }

    /// Create an invalid-document error.
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Error::InvalidDocument(msg.into())
    }

    /// Create an insufficient-data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a model error.
    pub fn model(msg: impl Into<String>) -> Self {
        Error::Model(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }
}
