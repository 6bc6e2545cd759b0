//! Blob-store access for model artifacts
//!
//! The store exposes versioned folders, each holding exactly two required
//! objects: the classifier weights and the metadata sidecar. Listing and
//! fetch mechanics live behind a trait; the filesystem implementation
//! mirrors the bucket layout as plain directories.

use async_trait::async_trait;
use privcase_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Classifier weights object name within a version folder
pub const MODEL_OBJECT: &str = "model.safetensors";

/// Metadata sidecar object name within a version folder
pub const METADATA_OBJECT: &str = "metadata.json";

/// Listing and fetch operations over a versioned model store
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// List version folder names. An empty store is not an error.
    async fn list_versions(&self) -> Result<Vec<String>>;

    /// Whether an object exists within a version folder.
    async fn exists(&self, version: &str, object: &str) -> Result<bool>;

    /// Fetch one object into a local destination path.
    async fn fetch(&self, version: &str, object: &str, dest: &Path) -> Result<()>;
}

/// Filesystem-backed model store
pub struct FsModelStore {
    root: PathBuf,
}

impl FsModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory holding the version folders
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, version: &str, object: &str) -> PathBuf {
        self.root.join(version).join(object)
    }
}

#[async_trait]
impl ModelStore for FsModelStore {
    async fn list_versions(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| Error::store(format!("failed to list {}: {e}", self.root.display())))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::store(format!("failed to list {}: {e}", self.root.display())))?
        {
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                versions.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(versions)
    }

    async fn exists(&self, version: &str, object: &str) -> Result<bool> {
        let path = self.object_path(version, object);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::store(format!("failed to stat {}: {e}", path.display())))
    }

    async fn fetch(&self, version: &str, object: &str, dest: &Path) -> Result<()> {
        let src = self.object_path(version, object);
        tokio::fs::copy(&src, dest)
            .await
            .map_err(|e| Error::store(format!("failed to fetch {}: {e}", src.display())))?;
        Ok(())
    }
}
