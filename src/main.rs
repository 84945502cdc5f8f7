//! PlateKarma - tag event processing and progression engine
//!
//! Drivers tag other vehicles by license plate, positive or negative,
//! spending a per-polarity credit per tag and earning experience, levels,
//! and badges. This binary wires the engine together: it opens the SQLite
//! store, runs schema migrations, serves a submission channel through the
//! pipeline, and logs a periodic analytics summary. Transport (UI/API) is
//! a separate layer that holds the submission sender.

pub mod analytics;
pub mod config;
pub mod engine;

use analytics::AnalyticsEngine;
use config::Config;
use engine::ingestion::{start_submission_ingestion, SubmissionRequest};
use engine::{SqliteTagStore, TagPipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env();

    log::info!("🚀 Starting PlateKarma engine");
    log::info!("📊 Configuration:");
    log::info!("   Database: {}", config.db_path);
    log::info!("   Schema dir: {}", config.schema_dir);
    log::info!("   Submission buffer: {}", config.channel_buffer);
    log::info!("   Analytics cache TTL: {}s", config.analytics_cache_ttl_secs);
    log::info!("   UTC offset: {}s", config.utc_offset_secs);

    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let store = Arc::new(SqliteTagStore::open_with_schema(
        &config.db_path,
        &config.schema_dir,
    )?);

    let pipeline = TagPipeline::new(store.clone());
    let (submission_tx, submission_rx) =
        mpsc::channel::<SubmissionRequest>(config.channel_buffer);
    let ingestion = tokio::spawn(start_submission_ingestion(submission_rx, pipeline));

    let analytics = AnalyticsEngine::new(
        store.clone(),
        Duration::from_secs(config.analytics_cache_ttl_secs),
        config.local_tz(),
    );
    let report_interval_secs = config.analytics_interval_secs;
    let summary_task = tokio::spawn(async move {
        let mut timer = interval(Duration::from_secs(report_interval_secs));
        loop {
            timer.tick().await;
            match analytics.summary().await {
                Ok(summary) => {
                    log::info!(
                        "📊 Tags: {} total ({}% positive), {} today, {} last 7d",
                        summary.total,
                        summary.positive_pct,
                        summary.today,
                        summary.last_7_days
                    );
                }
                Err(e) => log::warn!("⚠️  Analytics summary unavailable: {}", e),
            }
        }
    });

    // The submission sender is the attach point for the transport layer
    // (out of scope here); keeping it alive keeps the engine accepting.
    let _submission_tx = submission_tx;

    log::info!("✅ PlateKarma engine ready");
    tokio::signal::ctrl_c().await?;
    log::info!("🛑 Shutdown signal received");

    summary_task.abort();
    drop(_submission_tx);
    ingestion.await?;

    Ok(())
}
