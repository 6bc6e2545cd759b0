//! Application configuration
//!
//! Loaded from a YAML file with environment-variable overlay; CLI flags are
//! applied last by the caller. Model version/embedding tags resolve in a
//! separate settings file owned by the ingestor (sidecar metadata overrides
//! those in turn).

use privcase_warehouse::JsonlWarehouse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the privcase binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model blob store
    #[serde(default)]
    pub store: StoreConfig,

    /// Case warehouse
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Local model settings
    #[serde(default)]
    pub models: ModelsConfig,

    /// Runtime knobs
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Load configuration from file and environment overlay.
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Ok(root) = std::env::var("PRIVCASE_STORE_ROOT") {
            config.store.root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("PRIVCASE_WAREHOUSE_ROOT") {
            config.warehouse.root = PathBuf::from(root);
        }
        if let Ok(dry_run) = std::env::var("PRIVCASE_DRY_RUN") {
            config.runtime.dry_run = matches!(dry_run.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

/// Model blob store location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the versioned model folders
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

/// Case warehouse tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Directory holding the warehouse tables
    #[serde(default = "default_warehouse_root")]
    pub root: PathBuf,

    /// Partition file prefix for the case snapshot
    #[serde(default = "default_source_prefix")]
    pub source_prefix: String,

    /// Prediction output table
    #[serde(default = "default_output_table")]
    pub output_table: String,

    /// Monitoring table for run logs
    #[serde(default = "default_monitoring_table")]
    pub monitoring_table: String,

    /// Cap on rows loaded from one partition
    #[serde(default)]
    pub row_limit: Option<usize>,
}

impl WarehouseConfig {
    /// Open the warehouse these settings describe.
    pub fn open(&self) -> JsonlWarehouse {
        JsonlWarehouse::new(
            &self.root,
            self.source_prefix.as_str(),
            self.output_table.as_str(),
            self.monitoring_table.as_str(),
        )
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            root: default_warehouse_root(),
            source_prefix: default_source_prefix(),
            output_table: default_output_table(),
            monitoring_table: default_monitoring_table(),
            row_limit: None,
        }
    }
}

/// Where the ingestor-owned model settings live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
        }
    }
}

/// Runtime knobs for pipeline runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Suppress warehouse writes, log previews instead
    #[serde(default)]
    pub dry_run: bool,

    /// Rows per prediction chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Width the upstream embedder produces; unset means "whatever the
    /// loaded model expects"
    #[serde(default)]
    pub upstream_embedding_dim: Option<usize>,

    /// Attempt budget for warehouse writes
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            chunk_size: default_chunk_size(),
            upstream_embedding_dim: None,
            max_retries: default_max_retries(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from("store/pcc-models")
}

fn default_warehouse_root() -> PathBuf {
    PathBuf::from("warehouse")
}

fn default_source_prefix() -> String {
    "case_snapshot".to_string()
}

fn default_output_table() -> String {
    "pcc_predictions".to_string()
}

fn default_monitoring_table() -> String {
    "pcc_monitoring_logs".to_string()
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("models/model.yaml")
}

fn default_chunk_size() -> usize {
    2000
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = AppConfig::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.runtime.chunk_size, 2000);
        assert_eq!(config.runtime.max_retries, 3);
        assert!(!config.runtime.dry_run);
        assert_eq!(config.warehouse.output_table, "pcc_predictions");
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "runtime:\n  dry_run: true\n  upstream_embedding_dim: 588\n",
        )
        .unwrap();

        let config = AppConfig::load(path.to_str().unwrap()).unwrap();
        assert!(config.runtime.dry_run);
        assert_eq!(config.runtime.upstream_embedding_dim, Some(588));
        assert_eq!(config.runtime.chunk_size, 2000);
    }
}
