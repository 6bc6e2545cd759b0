//! Local model settings
//!
//! A small YAML document recording where the active artifact lives and the
//! fallback tags used when the metadata sidecar is absent. The ingestor
//! rewrites it after a successful install.

use privcase_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for the locally installed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Path to the active classifier weights
    #[serde(default = "default_classifier_path")]
    pub classifier_path: PathBuf,

    /// Path to the active metadata sidecar
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Model version tag; overridden by the sidecar when present
    #[serde(default = "default_model_version")]
    pub model_version: String,

    /// Tag of the upstream embedder producing compatible vectors
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Classifier family tag, provenance only
    #[serde(default = "default_classifier_type")]
    pub classifier_type: String,

    /// Training timestamp, provenance only
    #[serde(default)]
    pub trained_on: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            classifier_path: default_classifier_path(),
            metadata_path: default_metadata_path(),
            model_version: default_model_version(),
            embedding_model: default_embedding_model(),
            classifier_type: default_classifier_type(),
            trained_on: None,
        }
    }
}

impl ModelSettings {
    /// Load settings from a YAML file, falling back to defaults when the
    /// file does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("invalid model settings {}: {e}", path.display())))
    }

    /// Persist settings as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::config(format!("failed to serialize model settings: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn default_classifier_path() -> PathBuf {
    PathBuf::from("models/model.safetensors")
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("models/metadata.json")
}

fn default_model_version() -> String {
    "v0.1".to_string()
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_classifier_type() -> String {
    "LogisticRegression".to_string()
}
