//! Embedding validation
//!
//! Each record's embedding must be present, exactly the expected width, and
//! NaN-free. A failing record is silently excluded and counted; one
//! malformed embedding must not abort a multi-thousand-row batch.

use metrics::counter;
use privcase_core::{CaseRecord, ValidatedEmbedding};
use tracing::{debug, info, warn};

/// Result of validating a batch of records
#[derive(Debug)]
pub struct ValidationReport {
    pub valid: Vec<ValidatedEmbedding>,
    pub dropped: usize,
}

/// Filter records down to well-formed embeddings.
///
/// Checks run in order per record, short-circuiting: vector present, length
/// equals `expected_dim` exactly, no NaN component. An empty input yields an
/// empty output with zero drops.
pub fn validate_embeddings(records: &[CaseRecord], expected_dim: usize) -> ValidationReport {
    let mut valid = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        let Some(vector) = record.embedding_vector.as_ref() else {
            debug!(case_id = %record.case_id, "dropped: embedding missing");
            dropped += 1;
            continue;
        };
        if vector.len() != expected_dim {
            debug!(
                case_id = %record.case_id,
                len = vector.len(),
                expected_dim,
                "dropped: bad shape"
            );
            dropped += 1;
            continue;
        }
        if vector.iter().any(|v| v.is_nan()) {
            debug!(case_id = %record.case_id, "dropped: contains NaNs");
            dropped += 1;
            continue;
        }
        valid.push(ValidatedEmbedding {
            case_id: record.case_id.clone(),
            vector: vector.clone(),
            timestamp: record.timestamp,
        });
    }

    counter!("privcase_validation_dropped_total").increment(dropped as u64);
    info!(valid = valid.len(), dropped, "embedding validation complete");
    ValidationReport { valid, dropped }
}

/// Advisory check that the embedder which produced the vectors matches the
/// one the model was trained against. A mismatch is logged, not fatal.
pub fn check_embedding_model(expected: &str, actual: &str) {
    if expected != actual {
        warn!(expected, actual, "embedding model mismatch");
    }
}
