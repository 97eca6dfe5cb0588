use std::path::PathBuf;

use thiserror::Error;

use crate::types::IndexReport;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The named collection has never been created (or was deleted).
    #[error("Collection not found: {collection}")]
    NotFound { collection: String },

    /// The embedding endpoint could not be reached or kept failing after retries.
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding model not found: {model} (try `ollama pull {model}`)")]
    ModelNotFound { model: String },

    /// The service answered but the payload is unusable (wrong count, NaN, empty).
    #[error("Malformed embedding response: {0}")]
    MalformedEmbedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fatal error raised mid-run, carrying the counters reached before the abort.
    #[error("Indexing aborted after {} files / {} chunks: {source}", report.files_indexed, report.chunks_written)]
    Aborted {
        report: Box<IndexReport>,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn not_found(collection: impl Into<String>) -> Self {
        Self::NotFound { collection: collection.into() }
    }

    /// True for a missing collection, also when wrapped inside an abort.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Aborted { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Partial progress of an aborted run, if this error carries one.
    pub fn partial_report(&self) -> Option<&IndexReport> {
        match self {
            Self::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
