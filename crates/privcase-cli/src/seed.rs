//! Synthetic data generation for local dry runs
//!
//! Writes one versioned model folder into the store and one sample
//! partition into the warehouse, so `privcase daily --partition <date>`
//! works end to end without production access.

use crate::config::AppConfig;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use privcase_model::{LinearClassifier, ModelMetadata, METADATA_OBJECT, MODEL_OBJECT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::info;

pub fn seed(config: &AppConfig, partition: &NaiveDate, records: usize, dim: usize) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    let stamp = partition.format("%Y%m%d");

    // one versioned model folder, stamped with the partition date
    let version = format!("v{stamp}_120000");
    let folder = config.store.root.join(&version);
    let weight: Vec<f32> = (0..2 * dim).map(|_| rng.gen_range(-0.5f32..0.5f32)).collect();
    LinearClassifier::from_weights(weight, vec![0.0, 0.0], dim)?
        .save(folder.join(MODEL_OBJECT))?;
    ModelMetadata {
        model_version: None,
        embedding_model: Some("all-MiniLM-L6-v2".to_string()),
        classifier: Some("LogisticRegression".to_string()),
        trained_on: Some(Utc::now().to_rfc3339()),
        labels: None,
    }
    .save(folder.join(METADATA_OBJECT))?;
    info!(version = %version, dim, "seeded model folder");

    // one sample partition of case records
    let event_time = partition
        .and_hms_opt(8, 0, 0)
        .expect("valid time of day")
        .and_utc();
    let lines: Vec<String> = (0..records)
        .map(|i| {
            let vector: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0f32..1.0f32)).collect();
            json!({
                "case_id": format!("CASE-{i:05}"),
                "embedding_vector": vector,
                "timestamp": event_time.to_rfc3339(),
            })
            .to_string()
        })
        .collect();

    std::fs::create_dir_all(&config.warehouse.root)?;
    let partition_path = config
        .warehouse
        .root
        .join(format!("{}_{stamp}.jsonl", config.warehouse.source_prefix));
    std::fs::write(&partition_path, lines.join("\n"))?;
    info!(
        records,
        partition = %partition_path.display(),
        "seeded sample partition"
    );

    Ok(())
}
