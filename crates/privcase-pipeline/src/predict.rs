//! Chunked batch prediction
//!
//! Drives the model cache over validated embeddings in bounded-size chunks.
//! Chunking bounds memory and gives a natural progress unit; it has no
//! effect on correctness since rows are independent. A per-row failure is
//! captured as a typed outcome, counted, and excluded; it never aborts the
//! batch. Row order is preserved within each chunk.

use metrics::counter;
use privcase_core::{Error, PredictionResult, Result, ValidatedEmbedding};
use privcase_model::ModelCache;
use tracing::{debug, error, info};

/// Outcome of predicting one row
#[derive(Debug)]
pub enum RowOutcome {
    Predicted(PredictionResult),
    Failed { case_id: String, reason: String },
}

/// Result of a batch prediction pass
#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<PredictionResult>,
    pub failed: usize,
}

/// Predict every row, isolating per-row failures.
///
/// Fails up front when the model cannot be loaded at all or `chunk_size` is
/// zero; those are run-level faults, not row-level ones.
pub fn predict_batch(
    cache: &ModelCache,
    rows: &[ValidatedEmbedding],
    chunk_size: usize,
) -> Result<BatchReport> {
    if chunk_size == 0 {
        return Err(Error::config("chunk_size must be positive"));
    }
    cache.ensure_loaded()?;

    let total_chunks = rows.len().div_ceil(chunk_size);
    let mut results = Vec::with_capacity(rows.len());
    let mut failed = 0usize;

    for (index, chunk) in rows.chunks(chunk_size).enumerate() {
        debug!(
            chunk = index + 1,
            total_chunks,
            rows = chunk.len(),
            "predicting chunk"
        );
        for row in chunk {
            match predict_row(cache, row) {
                RowOutcome::Predicted(result) => results.push(result),
                RowOutcome::Failed { case_id, reason } => {
                    error!(%case_id, %reason, "prediction failed for case");
                    failed += 1;
                }
            }
        }
    }

    counter!("privcase_predictions_total").increment(results.len() as u64);
    counter!("privcase_prediction_failures_total").increment(failed as u64);
    info!(successful = results.len(), failed, "prediction complete");
    Ok(BatchReport { results, failed })
}

fn predict_row(cache: &ModelCache, row: &ValidatedEmbedding) -> RowOutcome {
    match cache.predict_one(&row.case_id, &row.vector) {
        Ok(result) => RowOutcome::Predicted(result),
        Err(e) => RowOutcome::Failed {
            case_id: row.case_id.clone(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use privcase_model::{LinearClassifier, ModelSettings};

    fn cache_with_model(dir: &std::path::Path, dim: usize) -> ModelCache {
        let mut settings = ModelSettings::default();
        settings.classifier_path = dir.join("model.safetensors");
        settings.metadata_path = dir.join("metadata.json");

        let mut weight = vec![-0.5f32; dim];
        weight.extend(vec![0.5f32; dim]);
        LinearClassifier::from_weights(weight, vec![0.0, 0.0], dim)
            .unwrap()
            .save(&settings.classifier_path)
            .unwrap();
        ModelCache::new(settings)
    }

    fn row(case_id: &str, len: usize) -> ValidatedEmbedding {
        ValidatedEmbedding {
            case_id: case_id.to_string(),
            vector: vec![1.0; len],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn one_malformed_row_among_n_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with_model(dir.path(), 4);

        let mut rows: Vec<ValidatedEmbedding> = (0..9).map(|i| row(&format!("ok-{i}"), 4)).collect();
        // a bad width reaching this stage must not abort the batch
        rows.insert(4, row("malformed", 2));

        let report = predict_batch(&cache, &rows, 3).unwrap();
        assert_eq!(report.results.len(), 9);
        assert_eq!(report.failed, 1);
        assert!(report.results.iter().all(|r| r.case_id != "malformed"));
    }

    #[test]
    fn preserves_row_order_within_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with_model(dir.path(), 4);

        let rows: Vec<ValidatedEmbedding> = (0..7).map(|i| row(&format!("case-{i}"), 4)).collect();
        let report = predict_batch(&cache, &rows, 3).unwrap();

        let ids: Vec<&str> = report.results.iter().map(|r| r.case_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["case-0", "case-1", "case-2", "case-3", "case-4", "case-5", "case-6"]
        );
    }

    #[test]
    fn empty_batch_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with_model(dir.path(), 4);
        let report = predict_batch(&cache, &[], 100).unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn zero_chunk_size_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with_model(dir.path(), 4);
        assert!(matches!(
            predict_batch(&cache, &[], 0).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn missing_model_aborts_the_batch_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = ModelSettings::default();
        settings.classifier_path = dir.path().join("absent.safetensors");
        let cache = ModelCache::new(settings);

        let err = predict_batch(&cache, &[row("a", 4)], 10).unwrap_err();
        assert!(matches!(err, Error::ArtifactMissing(_)));
    }
}
