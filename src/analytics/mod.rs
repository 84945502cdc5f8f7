//! Aggregation Engine - derived views over the tag-event history
//!
//! Read-only: consumes the full event history and user roster, never
//! mutates source data, and can run concurrently with in-flight
//! submissions. Views reflect a snapshot bounded by a cache TTL.
//!
//! ```text
//! TagStore (list_tag_events, list_users)
//!     ↓
//! AnalyticsEngine::snapshot()  (TTL cache, stale fallback)
//!     ↓
//! leaderboard / rankings / geo / histogram / rollup
//!     ↓
//! ranked + bucketed report rows
//! ```
//!
//! ## Module organization
//!
//! - `leaderboard` - Plate and experience rankings with sort direction
//! - `rankings` - Top-N taggers and reasons
//! - `geo` - Bounding-box region clustering (first match wins)
//! - `histogram` - Hour-of-day and trailing-week weekday buckets
//! - `rollup` - Totals, percentage splits, rolling windows
//! - `cache` - TTL snapshot cache

pub mod cache;
pub mod geo;
pub mod histogram;
pub mod leaderboard;
pub mod rankings;
pub mod rollup;

pub use cache::TtlCache;
pub use geo::{classify, region_breakdown, Region, RegionStats, REGIONS};
pub use histogram::{day_of_week, hour_of_day, peak_bucket, WEEKDAY_WINDOW_DAYS};
pub use leaderboard::{
    experience_leaderboard, plate_leaderboard, ExperienceRank, PlateCount, SortDirection,
};
pub use rankings::{top_reasons, top_taggers, ReasonCount, TaggerCount, DEFAULT_TOP_N};
pub use rollup::{percentage, summarize, RollupSummary};

use crate::engine::store::{EventFilter, StoreError, TagStore};
use crate::engine::types::{TagEvent, TagPolarity, User};
use chrono::FixedOffset;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Analytics-layer failures
#[derive(Debug)]
pub enum AnalyticsError {
    /// Store unavailable and no cached snapshot to fall back to
    Store(StoreError),
}

impl std::fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyticsError::Store(e) => write!(f, "analytics source unavailable: {}", e),
        }
    }
}

impl std::error::Error for AnalyticsError {}

/// Immutable input snapshot the pure aggregation functions run over
#[derive(Debug, Clone)]
pub struct AnalyticsSnapshot {
    pub events: Vec<TagEvent>,
    pub users: Vec<User>,
}

/// Serves aggregated views from TTL-cached store snapshots
pub struct AnalyticsEngine {
    store: Arc<dyn TagStore>,
    cache: Mutex<TtlCache<Arc<AnalyticsSnapshot>>>,
    tz: FixedOffset,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TagStore>, cache_ttl: Duration, tz: FixedOffset) -> Self {
        Self::new_with_timestamp_fn(store, cache_ttl, tz, Box::new(|| chrono::Utc::now().timestamp()))
    }

    pub fn new_with_timestamp_fn(
        store: Arc<dyn TagStore>,
        cache_ttl: Duration,
        tz: FixedOffset,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            store,
            cache: Mutex::new(TtlCache::new(cache_ttl)),
            tz,
            now_fn,
        }
    }

    /// Load a snapshot, preferring the fresh cache; on store failure the
    /// last stale snapshot is served with a warning.
    pub async fn snapshot(&self) -> Result<Arc<AnalyticsSnapshot>, AnalyticsError> {
        if let Some(fresh) = self.cache.lock().unwrap().get() {
            return Ok(fresh);
        }

        let loaded = self.load_snapshot().await;

        match loaded {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.cache.lock().unwrap().put(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                if let Some(stale) = self.cache.lock().unwrap().get_stale() {
                    log::warn!("⚠️  Store unavailable, serving stale analytics snapshot: {}", e);
                    return Ok(stale);
                }
                Err(AnalyticsError::Store(e))
            }
        }
    }

    async fn load_snapshot(&self) -> Result<AnalyticsSnapshot, StoreError> {
        let events = self.store.list_tag_events(&EventFilter::all()).await?;
        let users = self.store.list_users().await?;
        log::debug!(
            "📥 Analytics snapshot loaded: {} events, {} users",
            events.len(),
            users.len()
        );
        Ok(AnalyticsSnapshot { events, users })
    }

    /// Snapshot events at or after `cutoff`
    fn events_since(snapshot: &AnalyticsSnapshot, cutoff: i64) -> Vec<TagEvent> {
        snapshot
            .events
            .iter()
            .filter(|e| e.created_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Leaderboard of tagged plates, optionally filtered by polarity and
    /// a time-window lower bound
    pub async fn plate_leaderboard(
        &self,
        polarity: Option<TagPolarity>,
        direction: SortDirection,
        since: Option<i64>,
    ) -> Result<Vec<PlateCount>, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        match since {
            Some(cutoff) => Ok(leaderboard::plate_leaderboard(
                &Self::events_since(&snapshot, cutoff),
                polarity,
                direction,
            )),
            None => Ok(leaderboard::plate_leaderboard(&snapshot.events, polarity, direction)),
        }
    }

    /// Leaderboard of users by cumulative experience
    pub async fn experience_leaderboard(
        &self,
        direction: SortDirection,
    ) -> Result<Vec<ExperienceRank>, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        Ok(leaderboard::experience_leaderboard(&snapshot.users, direction))
    }

    /// Most active taggers, truncated to `n`, optionally windowed
    pub async fn top_taggers(
        &self,
        n: usize,
        since: Option<i64>,
    ) -> Result<Vec<TaggerCount>, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        match since {
            Some(cutoff) => Ok(rankings::top_taggers(&Self::events_since(&snapshot, cutoff), n)),
            None => Ok(rankings::top_taggers(&snapshot.events, n)),
        }
    }

    /// Most common reasons, truncated to `n`, optionally windowed
    pub async fn top_reasons(
        &self,
        n: usize,
        since: Option<i64>,
    ) -> Result<Vec<ReasonCount>, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        match since {
            Some(cutoff) => Ok(rankings::top_reasons(&Self::events_since(&snapshot, cutoff), n)),
            None => Ok(rankings::top_reasons(&snapshot.events, n)),
        }
    }

    /// Per-region totals with the positive/negative split
    pub async fn region_breakdown(&self) -> Result<Vec<RegionStats>, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        Ok(geo::region_breakdown(&snapshot.events))
    }

    /// Hour-of-day histogram (local time) plus its peak bucket
    pub async fn hour_histogram(&self) -> Result<([u64; 24], Option<usize>), AnalyticsError> {
        let snapshot = self.snapshot().await?;
        let buckets = histogram::hour_of_day(&snapshot.events, self.tz);
        let peak = histogram::peak_bucket(&buckets);
        Ok((buckets, peak))
    }

    /// Trailing-week weekday histogram (Monday-first) plus its peak bucket
    pub async fn weekday_histogram(&self) -> Result<([u64; 7], Option<usize>), AnalyticsError> {
        let snapshot = self.snapshot().await?;
        let buckets = histogram::day_of_week(&snapshot.events, self.tz, (self.now_fn)());
        let peak = histogram::peak_bucket(&buckets);
        Ok((buckets, peak))
    }

    /// Headline totals, splits, and rolling windows
    pub async fn summary(&self) -> Result<RollupSummary, AnalyticsError> {
        let snapshot = self.snapshot().await?;
        Ok(rollup::summarize(&snapshot.events, self.tz, (self.now_fn)()))
    }
}

#[cfg(test)]
pub mod test_support {
    use crate::engine::types::{Balances, PlateRef, TagEvent, TagPolarity, User};

    /// Helper to create a test tag event
    pub fn make_event(
        id: &str,
        jurisdiction: &str,
        plate: &str,
        polarity: TagPolarity,
        created_at: i64,
    ) -> TagEvent {
        TagEvent {
            id: id.to_string(),
            target: PlateRef::normalize(jurisdiction, plate),
            creator_id: "creator_1".to_string(),
            polarity,
            reason: "test reason".to_string(),
            created_at,
            location: None,
        }
    }

    /// Helper to create a test user with empty history
    pub fn make_user(id: &str) -> User {
        User::new(
            id,
            None,
            Balances {
                positive_credits: 5,
                negative_credits: 5,
            },
            1700000000,
        )
    }
}
