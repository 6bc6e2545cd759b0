//! Embedding dimension adaptation
//!
//! The upstream embedding producer and the deployed model's input width can
//! drift independently (588-wide combined embeddings against a 584-wide
//! trained model has been observed). Over-long vectors are truncated to the
//! model's width; under-long vectors are dropped, since padding would
//! fabricate signal. This is a stopgap data repair, not a permanent
//! contract; retire it once the embedder and model agree on a width again.

use privcase_core::ValidatedEmbedding;
use tracing::{debug, info};

/// Result of adapting a batch to the model's width
#[derive(Debug)]
pub struct AdaptReport {
    pub adapted: Vec<ValidatedEmbedding>,
    pub dropped_short: usize,
}

/// Bring every vector to exactly `target_dim` components.
///
/// A vector already at `target_dim` passes through unchanged.
pub fn truncate_to_dim(rows: Vec<ValidatedEmbedding>, target_dim: usize) -> AdaptReport {
    let total = rows.len();
    let mut adapted = Vec::with_capacity(total);
    let mut dropped_short = 0usize;

    for mut row in rows {
        if row.vector.len() >= target_dim {
            row.vector.truncate(target_dim);
            adapted.push(row);
        } else {
            debug!(
                case_id = %row.case_id,
                len = row.vector.len(),
                target_dim,
                "dropped: embedding too short to adapt"
            );
            dropped_short += 1;
        }
    }

    info!(
        adapted = adapted.len(),
        dropped_short, target_dim, "truncated embeddings to model dimensions"
    );
    AdaptReport {
        adapted,
        dropped_short,
    }
}
