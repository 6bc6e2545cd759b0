//! Inference run logging
//!
//! One monitoring row per pipeline invocation, schema-validated and written
//! with retry. In dry-run mode the row is logged instead of written.

use crate::retry::with_backoff;
use crate::warehouse::Warehouse;
use chrono::{NaiveDate, Utc};
use privcase_core::schema;
use privcase_core::{InferenceRunLog, Result, RunStatus};
use tracing::info;
use uuid::Uuid;

/// Inputs for one run-log row
#[derive(Debug, Clone)]
pub struct RunParams {
    pub partition_date: NaiveDate,
    pub model_version: String,
    pub embedding_model: String,
    pub status: RunStatus,
    pub total_cases: u64,
    pub passed_validation: u64,
    pub dropped_cases: u64,
    pub notes: String,
    pub processing_duration_seconds: f64,
    pub error_message: Option<String>,
}

/// Writes monitoring rows for pipeline runs
pub struct RunLogger<'a> {
    warehouse: &'a dyn Warehouse,
    dry_run: bool,
    max_attempts: u32,
}

impl<'a> RunLogger<'a> {
    pub fn new(warehouse: &'a dyn Warehouse, dry_run: bool, max_attempts: u32) -> Self {
        Self {
            warehouse,
            dry_run,
            max_attempts,
        }
    }

    /// Stamp a run-log row with a fresh run id and the current time.
    pub fn build(params: RunParams) -> InferenceRunLog {
        let runtime_ts = Utc::now();
        InferenceRunLog {
            run_id: Uuid::new_v4().to_string(),
            model_version: params.model_version,
            embedding_model: params.embedding_model,
            partition_date: params.partition_date,
            runtime_ts,
            status: params.status,
            total_cases: params.total_cases,
            passed_validation: params.passed_validation,
            dropped_cases: params.dropped_cases,
            notes: params.notes,
            ingestion_time: runtime_ts,
            processing_duration_seconds: params.processing_duration_seconds,
            error_message: params.error_message,
        }
    }

    /// Validate and persist one run-log row.
    pub async fn log_run(&self, log: &InferenceRunLog) -> Result<()> {
        let row = serde_json::to_value(log)?;
        schema::run_log_schema().validate_rows(std::slice::from_ref(&row))?;

        if self.dry_run {
            info!(
                run_id = %log.run_id,
                partition = %log.partition_date,
                status = %log.status,
                "[dry run] would log inference run"
            );
            return Ok(());
        }

        with_backoff("run log insert", self.max_attempts, || {
            self.warehouse.append_run_log(&row)
        })
        .await?;

        info!(
            run_id = %log.run_id,
            status = %log.status,
            total_cases = log.total_cases,
            "inference run logged"
        );
        Ok(())
    }

    /// Confirm the monitoring row landed; advisory only.
    pub async fn verify(&self, run_id: &str) -> Result<bool> {
        if self.dry_run {
            info!("[dry run] skipping run log verification");
            return Ok(true);
        }
        self.warehouse.run_log_exists(run_id).await
    }
}
