//! Privcase Core
//!
//! Shared types, error handling, and warehouse schema contracts for the
//! privcase batch inference pipeline.

pub mod error;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    CaseLabel, CaseRecord, InferenceRunLog, PredictionResult, RunStatus, ValidatedEmbedding,
};
