//! Privcase Pipeline
//!
//! The batch inference path: embedding validation, dimension adaptation,
//! chunked prediction with per-row isolation, output formatting, and the
//! top-level run orchestration.

pub mod adapt;
pub mod format;
pub mod predict;
pub mod run;
pub mod validate;

pub use adapt::{truncate_to_dim, AdaptReport};
pub use format::format_predictions;
pub use predict::{predict_batch, BatchReport, RowOutcome};
pub use run::{run_pipeline, RunOptions, RunOutcome};
pub use validate::{check_embedding_model, validate_embeddings, ValidationReport};
