//! End-to-end pipeline tests against a filesystem warehouse

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use privcase_core::{Error, Result, RunStatus};
use privcase_model::{LinearClassifier, ModelCache, ModelSettings};
use privcase_pipeline::{run_pipeline, RunOptions};
use privcase_warehouse::{JsonlWarehouse, Warehouse};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

fn partition() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 29).unwrap()
}

fn options() -> RunOptions {
    RunOptions {
        partition_date: partition(),
        chunk_size: 32,
        dry_run: false,
        upstream_dim: None,
        row_limit: None,
        max_retries: 3,
    }
}

fn seed_model(dir: &Path, dim: usize) -> ModelCache {
    let mut settings = ModelSettings::default();
    settings.classifier_path = dir.join("models/model.safetensors");
    settings.metadata_path = dir.join("models/metadata.json");
    settings.model_version = "v20250729_092253".to_string();

    let mut weight = vec![-0.5f32; dim];
    weight.extend(vec![0.5f32; dim]);
    LinearClassifier::from_weights(weight, vec![0.0, 0.0], dim)
        .unwrap()
        .save(&settings.classifier_path)
        .unwrap();
    ModelCache::new(settings)
}

fn record(case_id: &str, vector: Value) -> Value {
    json!({
        "case_id": case_id,
        "embedding_vector": vector,
        "timestamp": "2025-07-29T08:00:00Z"
    })
}

fn seed_partition(root: &Path, rows: &[Value]) {
    let lines = rows
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(root.join("case_snapshot_20250729.jsonl"), lines).unwrap();
}

fn warehouse(root: &Path) -> JsonlWarehouse {
    JsonlWarehouse::new(root, "case_snapshot", "predictions", "monitoring_logs")
}

fn read_table(root: &Path, table: &str) -> Vec<Value> {
    let path = root.join(format!("{table}.jsonl"));
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn embedding(dim: usize, seed: usize) -> Value {
    let vector: Vec<f64> = (0..dim)
        .map(|i| (((seed + i) % 13) as f64 - 6.0) / 10.0)
        .collect();
    json!(vector)
}

#[tokio::test]
async fn end_to_end_yields_one_row_per_record() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 584);
    let wh = warehouse(dir.path());

    let rows: Vec<Value> = (0..100)
        .map(|i| record(&format!("CASE-{i:03}"), embedding(584, i)))
        .collect();
    seed_partition(dir.path(), &rows);

    let outcome = run_pipeline(&cache, &wh, &options()).await.unwrap();
    assert_eq!(outcome.run_log.status, RunStatus::Success);
    assert_eq!(outcome.run_log.total_cases, 100);
    assert_eq!(outcome.run_log.passed_validation, 100);
    assert_eq!(outcome.run_log.dropped_cases, 0);
    assert_eq!(outcome.rows_written, 100);

    let written = read_table(dir.path(), "predictions");
    assert_eq!(written.len(), 100);
    for row in &written {
        let confidence = row.get("confidence").and_then(Value::as_f64).unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        let label = row.get("predicted_label").and_then(Value::as_str).unwrap();
        assert!(label == "NOT_PC" || label == "PC");
        assert_eq!(
            row.get("model_version").and_then(Value::as_str).unwrap(),
            "v20250729_092253"
        );
    }

    let logs = read_table(dir.path(), "monitoring_logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].get("status").and_then(Value::as_str).unwrap(), "success");
}

#[tokio::test]
async fn drifted_embeddings_are_truncated_to_the_model_width() {
    let dir = tempfile::tempdir().unwrap();
    // model trained at 584, upstream produces 588-wide combined embeddings
    let cache = seed_model(dir.path(), 584);
    let wh = warehouse(dir.path());

    let rows: Vec<Value> = (0..10)
        .map(|i| record(&format!("CASE-{i}"), embedding(588, i)))
        .collect();
    seed_partition(dir.path(), &rows);

    let mut opts = options();
    opts.upstream_dim = Some(588);

    let outcome = run_pipeline(&cache, &wh, &opts).await.unwrap();
    assert_eq!(outcome.run_log.status, RunStatus::Success);
    assert_eq!(outcome.rows_written, 10);
}

#[tokio::test]
async fn malformed_rows_are_dropped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = warehouse(dir.path());

    let rows = vec![
        record("ok-1", embedding(8, 1)),
        record("too-short", embedding(5, 2)),
        record("too-long", embedding(10, 4)),
        record("no-embedding", Value::Null),
        record("ok-2", embedding(8, 3)),
    ];
    seed_partition(dir.path(), &rows);

    let outcome = run_pipeline(&cache, &wh, &options()).await.unwrap();
    assert_eq!(outcome.run_log.total_cases, 5);
    assert_eq!(outcome.run_log.passed_validation, 2);
    assert_eq!(outcome.run_log.dropped_cases, 3);
    assert_eq!(outcome.rows_written, 2);
}

#[tokio::test]
async fn empty_partition_logs_status_empty() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = warehouse(dir.path());

    let outcome = run_pipeline(&cache, &wh, &options()).await.unwrap();
    assert_eq!(outcome.run_log.status, RunStatus::Empty);
    assert_eq!(outcome.rows_written, 0);

    let logs = read_table(dir.path(), "monitoring_logs");
    assert_eq!(logs[0].get("status").and_then(Value::as_str).unwrap(), "empty");
}

#[tokio::test]
async fn dry_run_writes_nothing_but_reports_success() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = warehouse(dir.path());

    let rows: Vec<Value> = (0..3)
        .map(|i| record(&format!("CASE-{i}"), embedding(8, i)))
        .collect();
    seed_partition(dir.path(), &rows);

    let mut opts = options();
    opts.dry_run = true;

    let outcome = run_pipeline(&cache, &wh, &opts).await.unwrap();
    assert_eq!(outcome.run_log.status, RunStatus::Success);
    assert_eq!(outcome.rows_written, 3);

    assert!(read_table(dir.path(), "predictions").is_empty());
    assert!(read_table(dir.path(), "monitoring_logs").is_empty());
}

#[tokio::test]
async fn schema_violation_fails_the_run_and_logs_error_status() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = warehouse(dir.path());

    // missing the required timestamp column
    let rows = vec![json!({"case_id": "CASE-0", "embedding_vector": [0.1]})];
    seed_partition(dir.path(), &rows);

    let err = run_pipeline(&cache, &wh, &options()).await.unwrap_err();
    assert!(matches!(err, Error::Schema(_)));

    let logs = read_table(dir.path(), "monitoring_logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].get("status").and_then(Value::as_str).unwrap(), "error");
    assert!(logs[0].get("error_message").and_then(Value::as_str).is_some());
}

/// Warehouse wrapper that fails the first N prediction writes.
struct FlakyWarehouse {
    inner: JsonlWarehouse,
    failures_left: AtomicU32,
    write_calls: AtomicU32,
}

impl FlakyWarehouse {
    fn new(inner: JsonlWarehouse, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
            write_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Warehouse for FlakyWarehouse {
    async fn load_partition(
        &self,
        partition: NaiveDate,
        row_limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.inner.load_partition(partition, row_limit).await
    }

    async fn append_predictions(&self, rows: &[Value]) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::write("simulated load job failure"));
        }
        self.inner.append_predictions(rows).await
    }

    async fn append_run_log(&self, row: &Value) -> Result<()> {
        self.inner.append_run_log(row).await
    }

    async fn count_predictions_since(&self, since: DateTime<Utc>) -> Result<usize> {
        self.inner.count_predictions_since(since).await
    }

    async fn run_log_exists(&self, run_id: &str) -> Result<bool> {
        self.inner.run_log_exists(run_id).await
    }
}

#[tokio::test(start_paused = true)]
async fn write_succeeding_on_the_final_attempt_is_a_success() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = FlakyWarehouse::new(warehouse(dir.path()), 2);

    let rows: Vec<Value> = (0..4)
        .map(|i| record(&format!("CASE-{i}"), embedding(8, i)))
        .collect();
    seed_partition(dir.path(), &rows);

    let outcome = run_pipeline(&cache, &wh, &options()).await.unwrap();
    assert_eq!(outcome.run_log.status, RunStatus::Success);
    assert_eq!(wh.write_calls.load(Ordering::SeqCst), 3);

    // a single underlying append, no duplicate rows
    assert_eq!(read_table(dir.path(), "predictions").len(), 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_write_retries_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cache = seed_model(dir.path(), 8);
    let wh = FlakyWarehouse::new(warehouse(dir.path()), u32::MAX);

    let rows = vec![record("CASE-0", embedding(8, 0))];
    seed_partition(dir.path(), &rows);

    let err = run_pipeline(&cache, &wh, &options()).await.unwrap_err();
    assert!(matches!(err, Error::Write(_)));
    assert_eq!(wh.write_calls.load(Ordering::SeqCst), 3);

    assert!(read_table(dir.path(), "predictions").is_empty());
    let logs = read_table(dir.path(), "monitoring_logs");
    assert_eq!(logs[0].get("status").and_then(Value::as_str).unwrap(), "error");
}
