//! HDP Transform - one-shot transform stage entry point.
//!
//! Fetches the latest raw WHO life expectancy snapshot from staging,
//! normalizes it, and bulk-loads it into the warehouse. Zero-argument:
//! everything is configured through the environment.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use hdp_common::logging::{init_logging, LogConfig};
use hdp_transform::config::Config;
use hdp_transform::pipeline;
use hdp_transform::staging::StagingStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hdp-transform")]
#[command(author, version, about = "Transform staged WHO life expectancy data into the warehouse")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    let _cli = Cli::parse();

    // Initialize logging; environment variables take precedence.
    let log_config = LogConfig::from_env_or(LogConfig {
        log_file_prefix: "hdp-transform".to_string(),
        filter_directives: Some("hdp_transform=debug,sqlx=warn,aws_sdk_s3=warn".to_string()),
        ..LogConfig::default()
    })?;
    init_logging(&log_config)?;

    info!("Starting HDP transform job");

    let config = Config::load()?;
    info!(
        "Configuration loaded - bucket {}, prefix {}",
        config.staging.bucket, config.dataset_prefix
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;
    info!("Warehouse connection pool established");

    sqlx::migrate!("../../migrations").run(&pool).await?;

    let staging = StagingStore::new(config.staging.clone()).await?;

    let report = pipeline::run(&config, &staging, &pool).await?;

    info!(
        "Run complete: {} row(s) written from {} ({} format)",
        report.rows_written, report.object_key, report.format
    );

    Ok(())
}
