//! Pipeline orchestration
//!
//! One invocation: load a partition, validate and adapt embeddings, predict
//! in chunks, format, write, and record exactly one monitoring row. Per-row
//! failures stay local; per-run failures propagate after the run log is
//! written with status `error`.

use crate::{adapt, format, predict, validate};
use chrono::{NaiveDate, Utc};
use privcase_core::schema;
use privcase_core::{CaseRecord, InferenceRunLog, Result, RunStatus};
use privcase_model::ModelCache;
use privcase_warehouse::{with_backoff, RunLogger, RunParams, Warehouse};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Knobs for one pipeline invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Calendar date selecting the processed slice of upstream data
    pub partition_date: NaiveDate,

    /// Maximum rows per prediction chunk
    pub chunk_size: usize,

    /// Suppress warehouse writes, log previews instead
    pub dry_run: bool,

    /// Width the upstream embedder produces; None means "whatever the
    /// loaded model expects", skipping the adapter entirely
    pub upstream_dim: Option<usize>,

    /// Cap on rows loaded from one partition
    pub row_limit: Option<usize>,

    /// Attempt budget for warehouse writes
    pub max_retries: u32,
}

/// What a finished run reports back
#[derive(Debug)]
pub struct RunOutcome {
    pub run_log: InferenceRunLog,
    pub rows_written: usize,
}

#[derive(Debug, Default)]
struct RunStats {
    total: u64,
    passed: u64,
    failed_rows: u64,
    rows_written: u64,
}

/// Execute one pipeline run and record its monitoring row.
///
/// The run log is written on both success and failure; a failure to write
/// the log itself is logged and swallowed so it cannot mask the run result.
pub async fn run_pipeline(
    cache: &ModelCache,
    warehouse: &dyn Warehouse,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let started = Instant::now();
    info!(
        partition = %options.partition_date,
        dry_run = options.dry_run,
        "starting privcase pipeline"
    );

    let mut stats = RunStats::default();
    let result = execute(cache, warehouse, options, &mut stats).await;
    let duration = started.elapsed().as_secs_f64();

    let settings = cache.settings();
    let (status, error_message) = match &result {
        Ok(()) if stats.rows_written > 0 => (RunStatus::Success, None),
        Ok(()) => (RunStatus::Empty, None),
        Err(e) => (RunStatus::Error, Some(e.to_string())),
    };
    let notes = if stats.failed_rows > 0 {
        format!(
            "pipeline run with status: {status} ({} prediction failures)",
            stats.failed_rows
        )
    } else {
        format!("pipeline run with status: {status}")
    };

    let run_log = RunLogger::build(RunParams {
        partition_date: options.partition_date,
        model_version: settings.model_version.clone(),
        embedding_model: settings.embedding_model.clone(),
        status,
        total_cases: stats.total,
        passed_validation: stats.passed,
        dropped_cases: stats.total - stats.passed,
        notes,
        processing_duration_seconds: duration,
        error_message,
    });

    let logger = RunLogger::new(warehouse, options.dry_run, options.max_retries);
    if let Err(e) = logger.log_run(&run_log).await {
        warn!(error = %e, "failed to write inference run log");
    } else {
        match logger.verify(&run_log.run_id).await {
            Ok(true) => debug!(run_id = %run_log.run_id, "run log verified"),
            Ok(false) => warn!(run_id = %run_log.run_id, "run log not found after write"),
            Err(e) => warn!(error = %e, "run log verification failed"),
        }
    }

    match result {
        Ok(()) => {
            info!(
                status = %run_log.status,
                rows_written = stats.rows_written,
                "pipeline finished"
            );
            Ok(RunOutcome {
                run_log,
                rows_written: stats.rows_written as usize,
            })
        }
        Err(e) => {
            error!(error = %e, "pipeline failed");
            Err(e)
        }
    }
}

async fn execute(
    cache: &ModelCache,
    warehouse: &dyn Warehouse,
    options: &RunOptions,
    stats: &mut RunStats,
) -> Result<()> {
    // Ingestion
    let raw = warehouse
        .load_partition(options.partition_date, options.row_limit)
        .await?;
    schema::input_schema().validate_rows(&raw)?;
    let records = raw
        .into_iter()
        .map(serde_json::from_value::<CaseRecord>)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    stats.total = records.len() as u64;
    info!(rows = records.len(), "loaded partition rows");

    // Preprocessing: embeddings are precomputed, only validated and adapted
    let artifact = cache.ensure_loaded()?;
    validate::check_embedding_model(&cache.settings().embedding_model, &artifact.embedding_model);
    let model_dim = artifact.classifier.input_dim();
    let upstream_dim = options.upstream_dim.unwrap_or(model_dim);
    let report = validate::validate_embeddings(&records, upstream_dim);
    let mut valid = report.valid;
    if upstream_dim != model_dim {
        let adapted = adapt::truncate_to_dim(valid, model_dim);
        valid = adapted.adapted;
    }
    stats.passed = valid.len() as u64;

    // Inference
    let batch = predict::predict_batch(cache, &valid, options.chunk_size)?;
    stats.failed_rows = batch.failed as u64;

    // Postprocessing
    let ingestion_time = Utc::now();
    let rows = format::format_predictions(batch.results, ingestion_time)?;

    // Output
    if options.dry_run {
        info!(rows = rows.len(), "[dry run] would write predictions to output table");
        for row in rows.iter().take(5) {
            info!(preview = %row, "[dry run] sample row");
        }
        stats.rows_written = rows.len() as u64;
        return Ok(());
    }

    if rows.is_empty() {
        info!("no predictions produced for partition");
    } else {
        with_backoff("prediction write", options.max_retries, || {
            warehouse.append_predictions(&rows)
        })
        .await?;
        info!(rows = rows.len(), "predictions written to output table");

        // advisory post-write verification
        match warehouse.count_predictions_since(ingestion_time).await {
            Ok(count) if count >= rows.len() => debug!(count, "output write verified"),
            Ok(count) => warn!(
                count,
                expected = rows.len(),
                "output verification found fewer rows than written"
            ),
            Err(e) => warn!(error = %e, "output verification failed"),
        }
    }
    stats.rows_written = rows.len() as u64;
    Ok(())
}
