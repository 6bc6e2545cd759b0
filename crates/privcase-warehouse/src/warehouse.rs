//! Warehouse access
//!
//! Partition reads, append-only prediction writes, and monitoring-log
//! writes live behind a trait; the JSON-lines filesystem implementation
//! mirrors the warehouse's append-only load-job semantics (a batch is
//! serialized in full before a single append, so a bad record fails the
//! whole job and never leaves a partial write).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use privcase_core::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Read and append operations over the case warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Load the raw partition rows for one calendar date.
    ///
    /// A missing partition is an empty batch, not an error.
    async fn load_partition(&self, partition: NaiveDate, row_limit: Option<usize>)
        -> Result<Vec<Value>>;

    /// Append formatted prediction rows, all-or-nothing.
    async fn append_predictions(&self, rows: &[Value]) -> Result<()>;

    /// Append one monitoring-log row.
    async fn append_run_log(&self, row: &Value) -> Result<()>;

    /// Count prediction rows ingested at or after `since`, for post-write
    /// verification.
    async fn count_predictions_since(&self, since: DateTime<Utc>) -> Result<usize>;

    /// Whether a monitoring row exists for `run_id`.
    async fn run_log_exists(&self, run_id: &str) -> Result<bool>;
}

/// JSON-lines filesystem warehouse
///
/// Tables are `<root>/<table>.jsonl` files; partitions are
/// `<root>/<source_prefix>_<YYYYMMDD>.jsonl` files.
pub struct JsonlWarehouse {
    root: PathBuf,
    source_prefix: String,
    output_table: String,
    monitoring_table: String,
}

impl JsonlWarehouse {
    pub fn new(
        root: impl Into<PathBuf>,
        source_prefix: impl Into<String>,
        output_table: impl Into<String>,
        monitoring_table: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            source_prefix: source_prefix.into(),
            output_table: output_table.into(),
            monitoring_table: monitoring_table.into(),
        }
    }

    fn partition_path(&self, partition: NaiveDate) -> PathBuf {
        let stamp = partition.format("%Y%m%d");
        self.root.join(format!("{}_{stamp}.jsonl", self.source_prefix))
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.root.join(format!("{table}.jsonl"))
    }

    /// Serialize a whole batch up front, then append it in one write.
    async fn append_rows(&self, table: &str, rows: &[Value]) -> Result<()> {
        let path = self.table_path(table);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::write(format!("{table}: {e}")))?;
        }

        let mut batch = String::new();
        for row in rows {
            let line = serde_json::to_string(row)
                .map_err(|e| Error::write(format!("{table}: unserializable row: {e}")))?;
            batch.push_str(&line);
            batch.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::write(format!("{table}: {e}")))?;
        file.write_all(batch.as_bytes())
            .await
            .map_err(|e| Error::write(format!("{table}: {e}")))?;
        file.flush()
            .await
            .map_err(|e| Error::write(format!("{table}: {e}")))?;

        debug!(table, rows = rows.len(), "rows appended");
        Ok(())
    }

    async fn read_table(&self, table: &str) -> Result<Vec<Value>> {
        read_jsonl(&self.table_path(table), None).await
    }
}

#[async_trait]
impl Warehouse for JsonlWarehouse {
    async fn load_partition(
        &self,
        partition: NaiveDate,
        row_limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let path = self.partition_path(partition);
        if !path.exists() {
            warn!(partition = %partition, path = %path.display(), "partition not found, treating as empty");
            return Ok(Vec::new());
        }
        let rows = read_jsonl(&path, row_limit).await?;
        info!(partition = %partition, rows = rows.len(), "partition loaded");
        Ok(rows)
    }

    async fn append_predictions(&self, rows: &[Value]) -> Result<()> {
        self.append_rows(&self.output_table, rows).await
    }

    async fn append_run_log(&self, row: &Value) -> Result<()> {
        self.append_rows(&self.monitoring_table, std::slice::from_ref(row))
            .await
    }

    async fn count_predictions_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let rows = self.read_table(&self.output_table).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("ingestion_time")?.as_str())
            .filter_map(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .filter(|ts| *ts >= since)
            .count())
    }

    async fn run_log_exists(&self, run_id: &str) -> Result<bool> {
        let rows = self.read_table(&self.monitoring_table).await?;
        Ok(rows
            .iter()
            .any(|row| row.get("run_id").and_then(Value::as_str) == Some(run_id)))
    }
}

async fn read_jsonl(path: &Path, row_limit: Option<usize>) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::store(format!("failed to read {}: {e}", path.display())))?;

    let mut rows = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Value = serde_json::from_str(line)
            .map_err(|e| Error::schema(format!("{}: bad row: {e}", path.display())))?;
        rows.push(row);
        if row_limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
    }
    Ok(rows)
}
