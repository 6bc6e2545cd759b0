//! Privcase CLI
//!
//! Batch inference runner for the privacy case classifier: run one
//! partition through the pipeline, pull the newest model artifact from the
//! store, or do both on the daily schedule.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use privcase_model::{FsModelStore, IngestReport, ModelCache, ModelIngestor, ModelSettings};
use privcase_pipeline::{run_pipeline, RunOptions};
use tracing::{info, warn};

mod config;
mod seed;

use config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "privcase")]
#[command(about = "Privacy case batch inference pipeline", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Perform all computation but suppress warehouse writes
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the batch inference pipeline for one partition
    Run {
        /// Partition date in YYYYMMDD format
        #[arg(short, long)]
        partition: String,

        /// Rows per prediction chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Cap on rows loaded from the partition
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Pull the newest model artifact from the store
    Ingest {
        /// Take the latest model regardless of date
        #[arg(long)]
        force_latest: bool,
    },

    /// Ingest the newest model, then run the pipeline; a failed ingest
    /// keeps serving the active model
    Daily {
        /// Partition date in YYYYMMDD format
        #[arg(short, long)]
        partition: String,

        /// Take the latest model regardless of date
        #[arg(long)]
        force_latest: bool,
    },

    /// Generate a synthetic model artifact and sample partition for local
    /// dry runs
    Seed {
        /// Partition date in YYYYMMDD format
        #[arg(short, long)]
        partition: String,

        /// Number of sample case records
        #[arg(long, default_value_t = 100)]
        records: usize,

        /// Embedding width of the generated model and records
        #[arg(long, default_value_t = 584)]
        dim: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::load(&cli.config)?;
    if cli.dry_run {
        config.runtime.dry_run = true;
    }
    info!(config = %cli.config, dry_run = config.runtime.dry_run, "privcase starting");

    match &cli.command {
        Command::Run {
            partition,
            chunk_size,
            limit,
        } => run(&config, partition, *chunk_size, *limit).await,
        Command::Ingest { force_latest } => {
            match ingest(&config, *force_latest).await? {
                Some(report) => {
                    info!(version = %report.version, "model ingestion complete");
                    Ok(())
                }
                None => anyhow::bail!("no model ingested"),
            }
        }
        Command::Daily {
            partition,
            force_latest,
        } => {
            if ingest(&config, *force_latest).await?.is_none() {
                warn!("continuing with the active model");
            }
            run(&config, partition, None, None).await
        }
        Command::Seed {
            partition,
            records,
            dim,
        } => seed::seed(&config, &parse_partition(partition)?, *records, *dim),
    }
}

async fn run(
    config: &AppConfig,
    partition: &str,
    chunk_size: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    let partition_date = parse_partition(partition)?;
    let settings = ModelSettings::load(&config.models.settings_path)?;
    let cache = ModelCache::new(settings);
    let warehouse = config.warehouse.open();

    let options = RunOptions {
        partition_date,
        chunk_size: chunk_size.unwrap_or(config.runtime.chunk_size),
        dry_run: config.runtime.dry_run,
        upstream_dim: config.runtime.upstream_embedding_dim,
        row_limit: limit.or(config.warehouse.row_limit),
        max_retries: config.runtime.max_retries,
    };

    let outcome = run_pipeline(&cache, &warehouse, &options).await?;
    info!(
        run_id = %outcome.run_log.run_id,
        status = %outcome.run_log.status,
        rows = outcome.rows_written,
        "run complete"
    );
    Ok(())
}

/// Ingest the preferred candidate. Returns None when the attempt failed in
/// a way that keeps the active model serviceable.
async fn ingest(config: &AppConfig, force_latest: bool) -> Result<Option<IngestReport>> {
    let store = FsModelStore::new(&config.store.root);
    let ingestor = ModelIngestor::new(store, &config.models.settings_path);

    match ingestor.ingest_latest(force_latest, Utc::now().date_naive()).await {
        Ok(report) => Ok(Some(report)),
        Err(e) if e.is_ingest_recoverable() => {
            warn!(error = %e, "model ingestion skipped, keeping the active model");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_partition(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| anyhow::anyhow!("invalid partition date '{s}' (expected YYYYMMDD): {e}"))
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
