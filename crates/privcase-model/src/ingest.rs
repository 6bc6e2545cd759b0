//! Model ingestion
//!
//! Discovers the newest artifact in the versioned store, stages it locally,
//! verifies it loads, and atomically installs it over the active artifact.
//! The active model is never left in a partially-written state: a candidate
//! missing either object, or failing the load self-test, aborts before any
//! file at the active location is touched.
//!
//! Ingestion and cache refresh are deliberately decoupled: callers invoke
//! `ModelCache::invalidate` after a successful ingest, and treat a failed
//! ingest as "continue serving the existing model".

use crate::artifact::{LinearClassifier, ModelMetadata};
use crate::settings::ModelSettings;
use crate::store::{ModelStore, METADATA_OBJECT, MODEL_OBJECT};
use crate::version::VersionStamp;
use chrono::NaiveDate;
use privcase_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a successful ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Installed version (store folder name)
    pub version: String,

    /// Where the active classifier now lives
    pub model_path: PathBuf,

    /// Input width of the installed classifier
    pub input_dim: usize,
}

/// Pulls model artifacts from a store into the active local location
pub struct ModelIngestor<S> {
    store: S,
    settings_path: PathBuf,
}

impl<S: ModelStore> ModelIngestor<S> {
    pub fn new(store: S, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            settings_path: settings_path.into(),
        }
    }

    /// All parseable version stamps in the store.
    ///
    /// A folder name outside the `v<YYYYMMDD>_<HHMMSS>` convention is an
    /// error: silently excluding it from the sort could hide the newest
    /// model.
    async fn list_stamps(&self) -> Result<Vec<VersionStamp>> {
        self.store
            .list_versions()
            .await?
            .iter()
            .map(|name| VersionStamp::parse(name))
            .collect()
    }

    /// The greatest same-day candidate, if any folder is stamped `today`.
    pub async fn check_today(&self, today: NaiveDate) -> Result<Option<VersionStamp>> {
        let latest_today = self
            .list_stamps()
            .await?
            .into_iter()
            .filter(|stamp| stamp.date() == today)
            .max();
        match &latest_today {
            Some(stamp) => info!(version = %stamp, "found today's model folder"),
            None => info!(%today, "no model folder found for today"),
        }
        Ok(latest_today)
    }

    /// The chronologically greatest candidate across all folders.
    pub async fn get_latest(&self) -> Result<Option<VersionStamp>> {
        let stamps = self.list_stamps().await?;
        if stamps.is_empty() {
            warn!("no model folders found in store");
        }
        Ok(stamps.into_iter().max())
    }

    /// Ingest the preferred candidate: today's folder unless `force_latest`,
    /// falling back to the overall latest.
    ///
    /// Fails with `NoArtifactAvailable` when the store has no folders;
    /// callers keep serving the previously installed model.
    pub async fn ingest_latest(&self, force_latest: bool, today: NaiveDate) -> Result<IngestReport> {
        info!("starting model ingestion from store");

        let candidate = if force_latest {
            self.get_latest().await?
        } else {
            match self.check_today(today).await? {
                Some(stamp) => Some(stamp),
                None => {
                    info!("falling back to latest available model");
                    self.get_latest().await?
                }
            }
        };

        let stamp = candidate.ok_or(Error::NoArtifactAvailable)?;
        self.install(&stamp).await
    }

    /// Stage, verify, and atomically install one candidate.
    async fn install(&self, stamp: &VersionStamp) -> Result<IngestReport> {
        let version = stamp.name();

        // both required objects must exist before anything is downloaded
        for object in [MODEL_OBJECT, METADATA_OBJECT] {
            if !self.store.exists(version, object).await? {
                return Err(Error::artifact_incomplete(format!(
                    "{version}/{object} not found in store"
                )));
            }
        }

        let staging = tempfile::tempdir()?;
        let staged_model = staging.path().join(MODEL_OBJECT);
        let staged_metadata = staging.path().join(METADATA_OBJECT);
        self.store.fetch(version, MODEL_OBJECT, &staged_model).await?;
        self.store
            .fetch(version, METADATA_OBJECT, &staged_metadata)
            .await?;

        // load self-test: a corrupt download must never replace a working model
        let classifier = LinearClassifier::load(&staged_model)
            .map_err(|e| Error::artifact_corrupt(format!("{version}: {e}")))?;
        let metadata = ModelMetadata::load(&staged_metadata)
            .map_err(|e| Error::artifact_corrupt(format!("{version}: invalid metadata sidecar: {e}")))?;

        let mut settings = ModelSettings::load(&self.settings_path)?;
        install_file(&staged_model, &settings.classifier_path)?;
        install_file(&staged_metadata, &settings.metadata_path)?;

        settings.model_version = metadata.model_version.unwrap_or_else(|| version.to_string());
        if let Some(embedding_model) = metadata.embedding_model {
            settings.embedding_model = embedding_model;
        }
        if let Some(classifier_type) = metadata.classifier {
            settings.classifier_type = classifier_type;
        }
        settings.trained_on = metadata.trained_on;
        settings.save(&self.settings_path)?;

        info!(
            version,
            input_dim = classifier.input_dim(),
            model_path = %settings.classifier_path.display(),
            "model ingested"
        );
        Ok(IngestReport {
            version: version.to_string(),
            model_path: settings.classifier_path,
            input_dim: classifier.input_dim(),
        })
    }
}

/// Copy a staged file next to its destination, then rename over it.
///
/// The rename keeps readers from ever observing a half-written artifact.
fn install_file(staged: &Path, active: &Path) -> Result<()> {
    if let Some(parent) = active.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp_name = active
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| Error::config(format!("invalid artifact path: {}", active.display())))?;
    tmp_name.push(".tmp");
    let tmp = active.with_file_name(tmp_name);

    std::fs::copy(staged, &tmp)?;
    std::fs::rename(&tmp, active)?;
    Ok(())
}
