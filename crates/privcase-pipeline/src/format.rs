//! Output formatting
//!
//! Stamps each prediction with its ingestion time, serializes rows in the
//! output table's fixed column order, and validates them against the output
//! schema before anything is persisted.

use chrono::{DateTime, Utc};
use privcase_core::schema;
use privcase_core::{PredictionResult, Result};
use serde_json::Value;
use tracing::info;

/// Finalize predictions for persistence.
pub fn format_predictions(
    mut results: Vec<PredictionResult>,
    ingestion_time: DateTime<Utc>,
) -> Result<Vec<Value>> {
    for result in &mut results {
        result.ingestion_time = Some(ingestion_time);
    }

    let rows = results
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    schema::output_schema().validate_rows(&rows)?;

    info!(rows = rows.len(), "formatted prediction output, ready for persistence");
    Ok(rows)
}
