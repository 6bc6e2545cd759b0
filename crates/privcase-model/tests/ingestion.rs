//! Ingestion integration tests against a filesystem-backed store

use chrono::NaiveDate;
use privcase_core::Error;
use privcase_model::{
    FsModelStore, LinearClassifier, ModelCache, ModelIngestor, ModelMetadata, ModelSettings,
    METADATA_OBJECT, MODEL_OBJECT,
};
use std::path::{Path, PathBuf};

struct Harness {
    _dir: tempfile::TempDir,
    store_root: PathBuf,
    settings_path: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store_root = dir.path().join("store");
        let settings_path = dir.path().join("model.yaml");

        // active artifact paths live under the harness dir, not the defaults
        let mut settings = ModelSettings::default();
        settings.classifier_path = dir.path().join("models/model.safetensors");
        settings.metadata_path = dir.path().join("models/metadata.json");
        settings.save(&settings_path).unwrap();

        Self {
            _dir: dir,
            store_root,
            settings_path,
        }
    }

    fn ingestor(&self) -> ModelIngestor<FsModelStore> {
        ModelIngestor::new(FsModelStore::new(&self.store_root), &self.settings_path)
    }

    fn settings(&self) -> ModelSettings {
        ModelSettings::load(&self.settings_path).unwrap()
    }

    fn seed_version(&self, name: &str, input_dim: usize, metadata: Option<ModelMetadata>) {
        let folder = self.store_root.join(name);
        std::fs::create_dir_all(&folder).unwrap();
        classifier(input_dim).save(folder.join(MODEL_OBJECT)).unwrap();
        if let Some(metadata) = metadata {
            metadata.save(folder.join(METADATA_OBJECT)).unwrap();
        }
    }
}

fn classifier(input_dim: usize) -> LinearClassifier {
    let mut weight = vec![-0.5f32; input_dim];
    weight.extend(vec![0.5f32; input_dim]);
    LinearClassifier::from_weights(weight, vec![0.0, 0.0], input_dim).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 29).unwrap()
}

fn read_bytes(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn prefers_todays_folder_unless_forced_to_latest() {
    let harness = Harness::new();
    // a folder stamped past today can exist when clocks disagree
    harness.seed_version("v20250730_120000", 4, Some(ModelMetadata::default()));
    harness.seed_version("v20250729_092253", 6, Some(ModelMetadata::default()));

    let report = harness.ingestor().ingest_latest(false, today()).await.unwrap();
    assert_eq!(report.version, "v20250729_092253");
    assert_eq!(report.input_dim, 6);

    let report = harness.ingestor().ingest_latest(true, today()).await.unwrap();
    assert_eq!(report.version, "v20250730_120000");
}

#[tokio::test]
async fn check_today_returns_greatest_same_day_candidate() {
    let harness = Harness::new();
    harness.seed_version("v20250729_092110", 4, Some(ModelMetadata::default()));
    harness.seed_version("v20250729_092253", 4, Some(ModelMetadata::default()));
    harness.seed_version("v20250728_235959", 4, Some(ModelMetadata::default()));

    let ingestor = harness.ingestor();
    let stamp = ingestor.check_today(today()).await.unwrap().unwrap();
    assert_eq!(stamp.name(), "v20250729_092253");

    let none = ingestor
        .check_today(NaiveDate::from_ymd_opt(2025, 7, 30).unwrap())
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn falls_back_to_latest_when_today_is_absent() {
    let harness = Harness::new();
    harness.seed_version("v20250727_080000", 4, Some(ModelMetadata::default()));
    harness.seed_version("v20250728_120000", 4, Some(ModelMetadata::default()));

    let report = harness.ingestor().ingest_latest(false, today()).await.unwrap();
    assert_eq!(report.version, "v20250728_120000");
}

#[tokio::test]
async fn empty_store_reports_no_artifact_available() {
    let harness = Harness::new();
    let err = harness.ingestor().ingest_latest(true, today()).await.unwrap_err();
    assert!(matches!(err, Error::NoArtifactAvailable));
    assert!(err.is_ingest_recoverable());
}

#[tokio::test]
async fn unrecognized_folder_name_fails_loudly() {
    let harness = Harness::new();
    harness.seed_version("v20250728_120000", 4, Some(ModelMetadata::default()));
    std::fs::create_dir_all(harness.store_root.join("latest")).unwrap();

    let err = harness.ingestor().ingest_latest(true, today()).await.unwrap_err();
    assert!(err.to_string().contains("latest"));
}

#[tokio::test]
async fn missing_sidecar_never_overwrites_the_active_artifact() {
    let harness = Harness::new();
    harness.seed_version("v20250728_120000", 4, Some(ModelMetadata::default()));
    let report = harness.ingestor().ingest_latest(true, today()).await.unwrap();
    let active_before = read_bytes(&report.model_path);

    // newer candidate without its metadata sidecar
    harness.seed_version("v20250729_092253", 6, None);

    let err = harness.ingestor().ingest_latest(true, today()).await.unwrap_err();
    assert!(matches!(err, Error::ArtifactIncomplete(_)));
    assert!(err.is_ingest_recoverable());

    let active_after = read_bytes(&report.model_path);
    assert_eq!(active_before, active_after);
    assert_eq!(harness.settings().model_version, "v20250728_120000");
}

#[tokio::test]
async fn corrupt_weights_never_overwrite_the_active_artifact() {
    let harness = Harness::new();
    harness.seed_version("v20250728_120000", 4, Some(ModelMetadata::default()));
    let report = harness.ingestor().ingest_latest(true, today()).await.unwrap();
    let active_before = read_bytes(&report.model_path);

    let folder = harness.store_root.join("v20250729_092253");
    std::fs::create_dir_all(&folder).unwrap();
    std::fs::write(folder.join(MODEL_OBJECT), b"not a safetensors file").unwrap();
    ModelMetadata::default().save(folder.join(METADATA_OBJECT)).unwrap();

    let err = harness.ingestor().ingest_latest(true, today()).await.unwrap_err();
    assert!(matches!(err, Error::ArtifactCorrupt(_)));

    assert_eq!(read_bytes(&report.model_path), active_before);
}

#[tokio::test]
async fn install_updates_settings_from_the_sidecar() {
    let harness = Harness::new();
    harness.seed_version(
        "v20250729_092253",
        4,
        Some(ModelMetadata {
            model_version: None,
            embedding_model: Some("all-MiniLM-L6-v2+tfidf".to_string()),
            classifier: Some("LogisticRegression".to_string()),
            trained_on: Some("2025-07-29T09:22:53Z".to_string()),
            labels: None,
        }),
    );

    harness.ingestor().ingest_latest(true, today()).await.unwrap();

    let settings = harness.settings();
    // no version in the sidecar, so the folder name stands
    assert_eq!(settings.model_version, "v20250729_092253");
    assert_eq!(settings.embedding_model, "all-MiniLM-L6-v2+tfidf");
    assert_eq!(settings.trained_on.as_deref(), Some("2025-07-29T09:22:53Z"));
}

#[tokio::test]
async fn cache_serves_the_old_model_until_invalidated() {
    let harness = Harness::new();
    harness.seed_version("v20250728_120000", 4, Some(ModelMetadata::default()));
    harness.ingestor().ingest_latest(true, today()).await.unwrap();

    let cache = ModelCache::new(harness.settings());
    assert_eq!(cache.expected_dim().unwrap(), 4);

    harness.seed_version("v20250729_092253", 6, Some(ModelMetadata::default()));
    harness.ingestor().ingest_latest(true, today()).await.unwrap();

    // ingestion and cache refresh are decoupled operations
    assert_eq!(cache.expected_dim().unwrap(), 4);
    cache.invalidate();
    assert_eq!(cache.expected_dim().unwrap(), 6);
}
