//! TTL cache for analytics snapshots

use std::time::{Duration, Instant};

/// Single-slot cache with a time-to-live.
///
/// Aggregated views are pure functions of a snapshot, so callers accept
/// results up to one TTL stale. The stale value is kept after expiry as a
/// fallback for store outages.
pub struct TtlCache<T> {
    entry: Option<(T, Instant)>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// Cached value if still within the TTL
    pub fn get(&self) -> Option<T> {
        match &self.entry {
            Some((value, stored_at)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    /// Cached value regardless of age (store-outage fallback)
    pub fn get_stale(&self) -> Option<T> {
        self.entry.as_ref().map(|(value, _)| value.clone())
    }

    pub fn put(&mut self, value: T) {
        self.entry = Some((value, Instant::now()));
    }
}
