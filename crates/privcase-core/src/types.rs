//! Core data types for the privcase pipeline

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One input unit: a case with its precomputed text embedding.
///
/// Produced by upstream ingestion and consumed read-only by the core.
/// The embedding is optional because the upstream join can miss; the
/// validator drops such rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Unique, stable case identifier
    pub case_id: String,

    /// Fixed-length numeric embedding, absent on an upstream join miss
    pub embedding_vector: Option<Vec<f32>>,

    /// Event time of the case
    pub timestamp: DateTime<Utc>,
}

/// A case record whose embedding passed dimensionality and numeric checks.
///
/// Invariant: `vector.len()` equals the width it was validated against and
/// no component is NaN. Only the validator (and the dimension adapter)
/// construct these.
#[derive(Debug, Clone)]
pub struct ValidatedEmbedding {
    pub case_id: String,
    pub vector: Vec<f32>,
    pub timestamp: DateTime<Utc>,
}

/// The fixed classification label set.
///
/// Binary in current scope; reserved for multi-class expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseLabel {
    /// Not a privacy case
    #[serde(rename = "NOT_PC")]
    NotPc,

    /// Privacy case
    #[serde(rename = "PC")]
    Pc,
}

impl CaseLabel {
    /// All labels, in class-index order
    pub const ALL: [CaseLabel; 2] = [CaseLabel::NotPc, CaseLabel::Pc];

    /// Wire representation of the label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotPc => "NOT_PC",
            Self::Pc => "PC",
        }
    }

    /// Map a classifier class index to its label
    pub fn from_class_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for CaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseLabel {
    type Err = crate::Error;

    /// Accepts both the wire labels and raw class indices, which older
    /// artifacts emit ("0"/"1").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_PC" | "0" => Ok(Self::NotPc),
            "PC" | "1" => Ok(Self::Pc),
            other => Err(crate::Error::schema(format!("unknown label: {other}"))),
        }
    }
}

/// One output record per successfully predicted case.
///
/// Field order matches the output table column order; keep in sync with
/// `schema::output_schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub case_id: String,

    pub predicted_label: CaseLabel,

    /// Reserved for future multi-class expansion, always None in current scope
    pub subtype_label: Option<String>,

    /// Maximum class posterior probability, in [0, 1]
    pub confidence: f64,

    pub model_version: String,

    pub embedding_model: String,

    pub inference_timestamp: DateTime<Utc>,

    /// Free-text provenance
    pub prediction_notes: String,

    /// Set by the output formatter just before persistence
    pub ingestion_time: Option<DateTime<Utc>>,
}

/// Outcome status of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The run produced at least one output row
    Success,

    /// The run succeeded mechanically but produced zero output rows;
    /// informational, not an error
    Empty,

    /// The run failed
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Empty => "empty",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitoring row per pipeline invocation.
///
/// Created once at the end of a run, never updated. Field order matches the
/// monitoring table column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRunLog {
    /// Globally unique run identifier
    pub run_id: String,

    pub model_version: String,

    pub embedding_model: String,

    /// Calendar date selecting the processed slice of upstream data
    pub partition_date: NaiveDate,

    pub runtime_ts: DateTime<Utc>,

    pub status: RunStatus,

    pub total_cases: u64,

    pub passed_validation: u64,

    pub dropped_cases: u64,

    pub notes: String,

    pub ingestion_time: DateTime<Utc>,

    pub processing_duration_seconds: f64,

    pub error_message: Option<String>,
}
