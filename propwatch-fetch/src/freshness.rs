//! Freshness bookkeeping
//!
//! A source is stale when it has never succeeded, or when its last success
//! is older than twice its refresh interval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use propwatch_core::STALE_FACTOR;

/// Staleness verdict for a last-success time against a refresh interval
pub fn is_stale_at(
    last_success: Option<DateTime<Utc>>,
    refresh_interval: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some(last) = last_success else {
        return true;
    };
    match (now - last).to_std() {
        Ok(age) => age > refresh_interval.saturating_mul(STALE_FACTOR),
        // Success recorded in the future: not stale
        Err(_) => false,
    }
}

/// Last-success clock for one source
#[derive(Debug)]
pub struct FreshnessTracker {
    refresh_interval: Duration,
    last_success: RwLock<Option<DateTime<Utc>>>,
}

impl FreshnessTracker {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            last_success: RwLock::new(None),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn record_success(&self, at: DateTime<Utc>) {
        *self.last_success.write() = Some(at);
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.read()
    }

    /// Time since the last success; `None` if there never was one
    pub fn data_age_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_success().map(|last| now - last)
    }

    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.data_age_at(Utc::now())
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        is_stale_at(self.last_success(), self.refresh_interval, now)
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }
}
