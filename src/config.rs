//! Service configuration from environment variables

use chrono::FixedOffset;
use std::env;

/// Configuration for the PlateKarma runtime
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: String,

    /// Directory holding ordered schema migration files
    pub schema_dir: String,

    /// Channel buffer size for submission ingestion
    pub channel_buffer: usize,

    /// Analytics snapshot cache TTL in seconds
    pub analytics_cache_ttl_secs: u64,

    /// Interval between periodic analytics summary logs in seconds
    pub analytics_interval_secs: u64,

    /// Credits seeded at registration
    pub starting_positive_credits: i64,
    pub starting_negative_credits: i64,

    /// Offset from UTC used for local-time bucketing, in seconds
    pub utc_offset_secs: i32,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PLATEKARMA_DB_PATH` (default: data/platekarma.db)
    /// - `PLATEKARMA_SCHEMA_DIR` (default: sql)
    /// - `SUBMISSION_CHANNEL_BUFFER` (default: 1024)
    /// - `ANALYTICS_CACHE_TTL_SECS` (default: 30)
    /// - `ANALYTICS_REPORT_INTERVAL_SECS` (default: 60)
    /// - `STARTING_POSITIVE_CREDITS` (default: 5)
    /// - `STARTING_NEGATIVE_CREDITS` (default: 5)
    /// - `PLATEKARMA_UTC_OFFSET_SECS` (default: host local offset)
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("PLATEKARMA_DB_PATH")
                .unwrap_or_else(|_| "data/platekarma.db".to_string()),

            schema_dir: env::var("PLATEKARMA_SCHEMA_DIR").unwrap_or_else(|_| "sql".to_string()),

            channel_buffer: env::var("SUBMISSION_CHANNEL_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024),

            analytics_cache_ttl_secs: env::var("ANALYTICS_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),

            analytics_interval_secs: env::var("ANALYTICS_REPORT_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),

            starting_positive_credits: env::var("STARTING_POSITIVE_CREDITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            starting_negative_credits: env::var("STARTING_NEGATIVE_CREDITS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            utc_offset_secs: env::var("PLATEKARMA_UTC_OFFSET_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(host_utc_offset_secs),
        }
    }

    /// Fixed offset for local-time analytics bucketing
    pub fn local_tz(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
    }
}

fn host_utc_offset_secs() -> i32 {
    use chrono::Offset;
    chrono::Local::now().offset().fix().local_minus_utc()
}
