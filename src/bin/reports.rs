//! Reports Binary - one-shot analytics over the tag-event history
//!
//! Computes every aggregated view once against the configured database
//! and writes the report to the log.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin reports
//! ```
//!
//! ## Environment Variables
//!
//! - PLATEKARMA_DB_PATH - SQLite database path (default: data/platekarma.db)
//! - PLATEKARMA_SCHEMA_DIR - Schema directory (default: sql)
//! - REPORT_TOP_N - Truncation for ranked views (default: 5)
//! - PLATEKARMA_UTC_OFFSET_SECS - Local-time offset for histograms
//! - RUST_LOG - Logging level (optional, default: info)

use platekarma::analytics::{AnalyticsEngine, SortDirection};
use platekarma::config::Config;
use platekarma::engine::SqliteTagStore;
use std::sync::Arc;
use std::time::Duration;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = Config::from_env();
    let top_n: usize = std::env::var("REPORT_TOP_N")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);

    log::info!("🚀 PlateKarma analytics report");
    log::info!("   Database: {}", config.db_path);
    log::info!("   Top-N: {}", top_n);

    let store = Arc::new(SqliteTagStore::open_with_schema(
        &config.db_path,
        &config.schema_dir,
    )?);
    let analytics = AnalyticsEngine::new(store, Duration::from_secs(0), config.local_tz());

    let summary = analytics.summary().await?;
    log::info!(
        "📊 Totals: {} tags ({} positive / {} negative, {}% positive)",
        summary.total,
        summary.positive,
        summary.negative,
        summary.positive_pct
    );
    log::info!(
        "   Windows: {} today, {} last 7d, {} last 30d",
        summary.today,
        summary.last_7_days,
        summary.last_30_days
    );

    let plates = analytics
        .plate_leaderboard(None, SortDirection::Desc, None)
        .await?;
    log::info!("🏆 Most tagged plates:");
    for entry in plates.iter().take(top_n) {
        log::info!("   {} - {} tags", entry.plate, entry.count);
    }

    let ranks = analytics.experience_leaderboard(SortDirection::Desc).await?;
    log::info!("🏆 Experience leaders:");
    for entry in ranks.iter().take(top_n) {
        log::info!(
            "   {} - {} exp (level {})",
            entry.user_id,
            entry.experience,
            entry.level
        );
    }

    let taggers = analytics.top_taggers(top_n, None).await?;
    log::info!("🏷️  Most active taggers:");
    for entry in &taggers {
        log::info!("   {} - {} tags", entry.user_id, entry.count);
    }

    let reasons = analytics.top_reasons(top_n, None).await?;
    log::info!("💬 Top reasons:");
    for entry in &reasons {
        log::info!("   {:?} - {} tags", entry.reason, entry.count);
    }

    let regions = analytics.region_breakdown().await?;
    log::info!("🗺️  Regions:");
    for stats in &regions {
        log::info!(
            "   {} - {} tags (+{} / -{})",
            stats.region,
            stats.total,
            stats.positive,
            stats.negative
        );
    }

    let (hours, peak_hour) = analytics.hour_histogram().await?;
    match peak_hour {
        Some(hour) => log::info!(
            "⏰ Peak hour: {:02}:00 ({} tags)",
            hour,
            hours[hour]
        ),
        None => log::info!("⏰ Peak hour: no tagged events yet"),
    }

    let (days, peak_day) = analytics.weekday_histogram().await?;
    match peak_day {
        Some(day) => log::info!(
            "📅 Peak weekday (trailing 7d): {} ({} tags)",
            WEEKDAYS[day],
            days[day]
        ),
        None => log::info!("📅 Peak weekday: no events in the trailing window"),
    }

    Ok(())
}
