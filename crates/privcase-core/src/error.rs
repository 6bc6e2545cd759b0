//! Error types for the privcase pipeline

use std::path::PathBuf;

/// Result type alias using the pipeline's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pipeline operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured local model artifact does not exist
    #[error("model artifact missing: {0:?}")]
    ArtifactMissing(PathBuf),

    /// A candidate artifact could not be fully fetched from the store
    #[error("model artifact incomplete: {0}")]
    ArtifactIncomplete(String),

    /// A downloaded artifact failed its load self-test
    #[error("model artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// The store contains no model folders at all
    #[error("no model artifact available in store")]
    NoArtifactAvailable,

    /// Model loading or tensor errors
    #[error("model error: {0}")]
    Model(String),

    /// A single row's inference call failed
    #[error("prediction error: {0}")]
    Prediction(String),

    /// Input or output data failed its structural contract
    #[error("schema violation: {0}")]
    Schema(String),

    /// A warehouse write exhausted its retries
    #[error("warehouse write failed: {0}")]
    Write(String),

    /// Blob store listing/fetch errors
    #[error("store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new prediction error
    pub fn prediction(msg: impl Into<String>) -> Self {
        Self::Prediction(msg.into())
    }

    /// Create a new schema violation error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a new warehouse write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new incomplete-artifact error
    pub fn artifact_incomplete(msg: impl Into<String>) -> Self {
        Self::ArtifactIncomplete(msg.into())
    }

    /// Create a new corrupt-artifact error
    pub fn artifact_corrupt(msg: impl Into<String>) -> Self {
        Self::ArtifactCorrupt(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for errors that abort an ingestion attempt but must not
    /// abort serving from the previously installed artifact.
    pub fn is_ingest_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ArtifactIncomplete(_) | Self::ArtifactCorrupt(_) | Self::NoArtifactAvailable
        )
    }
}
