//! Error types for the txt-history-analytics library.
//!
//! Only source-level failures abort an analysis run. Per-message problems
//! (undecodable payloads, empty rows, reactions) are counted in
//! [`IngestDiagnostics`](crate::normalizer::IngestDiagnostics) instead of
//! being raised, and structured-container parse errors stay inside the
//! decoder.

use thiserror::Error;

/// Errors that can abort an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The upstream row source could not be opened or read
    #[error("Message source unavailable: {0}")]
    SourceUnavailable(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization errors
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A spawned ingest or analysis task failed to complete
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with `AnalysisError`
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<anyhow::Error> for AnalysisError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl AnalysisError {
    /// True when the error means the run could not read its input at all.
    #[must_use]
    pub const fn is_source_failure(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }
}
