//! Privcase Model
//!
//! The serving side of the privcase pipeline: the classifier artifact and
//! its metadata sidecar, the lazily-initialized model cache, and the
//! ingestion path that keeps the local artifact in sync with the versioned
//! blob store.

pub mod artifact;
pub mod cache;
pub mod ingest;
pub mod settings;
pub mod store;
pub mod version;

pub use artifact::{LinearClassifier, LoadedArtifact, ModelMetadata};
pub use cache::ModelCache;
pub use ingest::{IngestReport, ModelIngestor};
pub use settings::ModelSettings;
pub use store::{FsModelStore, ModelStore, METADATA_OBJECT, MODEL_OBJECT};
pub use version::VersionStamp;
