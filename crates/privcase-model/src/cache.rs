//! Process-wide model cache
//!
//! One shared, lazily-initialized, explicitly-invalidatable handle to the
//! active classifier. The cache is either Unloaded or Loaded; `invalidate`
//! is the only Loaded -> Unloaded edge (no expiry).
//!
//! The batch job runs with at most one producer (scheduled ingestion) and
//! one consumer (prediction) active at a time, serialized by the operator's
//! scheduler. The slot is still kept behind a read-write lock so a future
//! concurrent server can reuse the cache by swapping the guarded `Arc`.

use crate::artifact::LoadedArtifact;
use crate::settings::ModelSettings;
use chrono::Utc;
use parking_lot::RwLock;
use privcase_core::{Error, PredictionResult, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Cached handle to the active classifier and its metadata
pub struct ModelCache {
    settings: ModelSettings,
    slot: RwLock<Option<Arc<LoadedArtifact>>>,
}

impl ModelCache {
    /// Create an Unloaded cache over the given settings.
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            slot: RwLock::new(None),
        }
    }

    /// The settings this cache reads the artifact from
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Whether an artifact is currently resident
    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Load the artifact if Unloaded; no-op when already Loaded.
    ///
    /// Fails with `ArtifactMissing` when the configured path does not exist.
    pub fn ensure_loaded(&self) -> Result<Arc<LoadedArtifact>> {
        if let Some(artifact) = self.slot.read().as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let mut slot = self.slot.write();
        // another caller may have loaded while we waited for the write lock
        if let Some(artifact) = slot.as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(LoadedArtifact::load(&self.settings)?);
        info!(
            model_version = %artifact.model_version,
            embedding_model = %artifact.embedding_model,
            input_dim = artifact.classifier.input_dim(),
            "model loaded into cache"
        );
        *slot = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Force the cache back to Unloaded, discarding the resident artifact.
    ///
    /// Called after ingestion installs a new artifact so the next
    /// prediction picks it up.
    pub fn invalidate(&self) {
        let was_loaded = self.slot.write().take().is_some();
        if was_loaded {
            info!("model cache invalidated");
        } else {
            debug!("model cache invalidated while already unloaded");
        }
    }

    /// The input width the resident artifact expects
    pub fn expected_dim(&self) -> Result<usize> {
        Ok(self.ensure_loaded()?.classifier.input_dim())
    }

    /// Classify one embedding vector, loading the artifact on demand.
    pub fn predict_one(&self, case_id: &str, vector: &[f32]) -> Result<PredictionResult> {
        let artifact = self.ensure_loaded()?;
        let (index, confidence) = artifact.classifier.predict(vector)?;
        let predicted_label = artifact
            .labels
            .get(index)
            .copied()
            .ok_or_else(|| Error::prediction(format!("class index {index} has no label")))?;

        Ok(PredictionResult {
            case_id: case_id.to_string(),
            predicted_label,
            subtype_label: None,
            confidence,
            model_version: artifact.model_version.clone(),
            embedding_model: artifact.embedding_model.clone(),
            inference_timestamp: Utc::now(),
            prediction_notes: format!("{} {}", artifact.classifier_type, artifact.model_version),
            ingestion_time: None,
        })
    }
}
