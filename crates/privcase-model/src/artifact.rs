//! Model artifact loading and inference
//!
//! The deployed classifier is a linear head over precomputed embeddings:
//! a `(num_labels, input_dim)` weight matrix and a `num_labels` bias vector
//! stored as safetensors, with a JSON metadata sidecar describing version
//! and provenance. The expected input width is a property of the loaded
//! weights, not a constant duplicated across call sites.

use crate::settings::ModelSettings;
use candle_core::{DType, Device, Tensor, D};
use privcase_core::{CaseLabel, Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Metadata sidecar stored next to the classifier weights
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelMetadata {
    /// Version tag; falls back to the store folder name when absent
    #[serde(default)]
    pub model_version: Option<String>,

    /// Upstream embedder tag
    #[serde(default)]
    pub embedding_model: Option<String>,

    /// Classifier family, e.g. "LogisticRegression"
    #[serde(default)]
    pub classifier: Option<String>,

    /// Training timestamp, provenance only
    #[serde(default)]
    pub trained_on: Option<String>,

    /// Label names in class-index order; defaults to the binary label set
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

impl ModelMetadata {
    /// Read a sidecar file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a sidecar file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

/// Linear classifier head over embedding vectors
#[derive(Debug)]
pub struct LinearClassifier {
    weight: Tensor,
    bias: Tensor,
    input_dim: usize,
    num_labels: usize,
}

impl LinearClassifier {
    /// Load classifier weights from a safetensors file.
    ///
    /// Also serves as the ingestor's integrity self-test: anything that
    /// fails here must never replace a working model.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ArtifactMissing(path.to_path_buf()));
        }

        let tensors = candle_core::safetensors::load(path, &Device::Cpu)
            .map_err(|e| Error::artifact_corrupt(format!("{}: {e}", path.display())))?;

        let weight = named_tensor(&tensors, "weight", path)?;
        let bias = named_tensor(&tensors, "bias", path)?;
        Self::from_tensors(weight, bias)
    }

    /// Build a classifier from raw weights, laid out row-major as
    /// `(num_labels, input_dim)`.
    pub fn from_weights(weight: Vec<f32>, bias: Vec<f32>, input_dim: usize) -> Result<Self> {
        let num_labels = bias.len();
        if num_labels == 0 || input_dim == 0 || weight.len() != num_labels * input_dim {
            return Err(Error::model(format!(
                "inconsistent weight shape: {} weights for {num_labels} labels x {input_dim} features",
                weight.len()
            )));
        }
        let weight = Tensor::from_vec(weight, (num_labels, input_dim), &Device::Cpu)
            .map_err(tensor_err)?;
        let bias = Tensor::from_vec(bias, num_labels, &Device::Cpu).map_err(tensor_err)?;
        Self::from_tensors(weight, bias)
    }

    fn from_tensors(weight: Tensor, bias: Tensor) -> Result<Self> {
        let weight = weight.to_dtype(DType::F32).map_err(tensor_err)?;
        let bias = bias.to_dtype(DType::F32).map_err(tensor_err)?;

        let (num_labels, input_dim) = weight
            .dims2()
            .map_err(|e| Error::artifact_corrupt(format!("weight tensor is not a matrix: {e}")))?;
        let bias_len = bias
            .dims1()
            .map_err(|e| Error::artifact_corrupt(format!("bias tensor is not a vector: {e}")))?;
        if bias_len != num_labels {
            return Err(Error::artifact_corrupt(format!(
                "bias length {bias_len} does not match {num_labels} labels"
            )));
        }

        Ok(Self {
            weight,
            bias,
            input_dim,
            num_labels,
        })
    }

    /// Persist weights as safetensors. Used by artifact tooling and tests;
    /// training itself happens elsewhere.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tensors = HashMap::from([
            ("weight".to_string(), self.weight.clone()),
            ("bias".to_string(), self.bias.clone()),
        ]);
        candle_core::safetensors::save(&tensors, path)
            .map_err(|e| Error::model(format!("failed to save weights {}: {e}", path.display())))
    }

    /// Expected input width, read from the weight matrix shape
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Number of output classes
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Softmax posterior probabilities across classes.
    pub fn predict_proba(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.input_dim {
            return Err(Error::prediction(format!(
                "expected {} features, got {}",
                self.input_dim,
                vector.len()
            )));
        }

        let x = Tensor::from_vec(vector.to_vec(), (1, self.input_dim), &Device::Cpu)
            .map_err(tensor_err)?;
        let logits = x
            .matmul(&self.weight.t().map_err(tensor_err)?)
            .map_err(tensor_err)?
            .broadcast_add(&self.bias)
            .map_err(tensor_err)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)
            .map_err(tensor_err)?
            .squeeze(0)
            .map_err(tensor_err)?;
        probs.to_vec1::<f32>().map_err(tensor_err)
    }

    /// Predict the class index and its posterior probability.
    ///
    /// Confidence is the maximum class posterior, not a margin or raw score.
    pub fn predict(&self, vector: &[f32]) -> Result<(usize, f64)> {
        let probs = self.predict_proba(vector)?;
        let (index, confidence) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| Error::prediction("classifier produced no class probabilities"))?;
        Ok((index, f64::from(*confidence)))
    }
}

fn named_tensor(tensors: &HashMap<String, Tensor>, name: &str, path: &Path) -> Result<Tensor> {
    tensors
        .get(name)
        .cloned()
        .ok_or_else(|| Error::artifact_corrupt(format!("{}: missing tensor '{name}'", path.display())))
}

fn tensor_err(e: candle_core::Error) -> Error {
    Error::model(e.to_string())
}

/// A fully resolved artifact: classifier plus effective metadata.
///
/// Either fully loaded or absent; there is no partially-loaded state
/// visible to callers.
#[derive(Debug)]
pub struct LoadedArtifact {
    pub classifier: LinearClassifier,
    pub model_version: String,
    pub embedding_model: String,
    pub classifier_type: String,
    pub trained_on: Option<String>,
    pub labels: Vec<CaseLabel>,
}

impl LoadedArtifact {
    /// Load the active artifact described by `settings`.
    ///
    /// Metadata resolution order: sidecar values override settings defaults;
    /// with no sidecar the settings values are used as-is.
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let classifier = LinearClassifier::load(&settings.classifier_path)?;

        let metadata = if settings.metadata_path.exists() {
            ModelMetadata::load(&settings.metadata_path)?
        } else {
            ModelMetadata::default()
        };

        let labels = resolve_labels(metadata.labels.as_deref(), classifier.num_labels())?;

        Ok(Self {
            classifier,
            model_version: metadata
                .model_version
                .unwrap_or_else(|| settings.model_version.clone()),
            embedding_model: metadata
                .embedding_model
                .unwrap_or_else(|| settings.embedding_model.clone()),
            classifier_type: metadata
                .classifier
                .unwrap_or_else(|| settings.classifier_type.clone()),
            trained_on: metadata.trained_on.or_else(|| settings.trained_on.clone()),
            labels,
        })
    }
}

fn resolve_labels(names: Option<&[String]>, num_labels: usize) -> Result<Vec<CaseLabel>> {
    let labels = match names {
        Some(names) => names
            .iter()
            .map(|n| n.parse::<CaseLabel>())
            .collect::<Result<Vec<_>>>()?,
        None => CaseLabel::ALL.to_vec(),
    };
    if labels.len() != num_labels {
        return Err(Error::model(format!(
            "classifier has {num_labels} classes but {} labels are declared",
            labels.len()
        )));
    }
    Ok(labels)
}
