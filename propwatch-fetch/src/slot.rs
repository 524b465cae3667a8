//! Cache slots
//!
//! Each source owns one slot holding an immutable snapshot. Writers build a
//! complete new snapshot and swap the pointer; readers clone the `Arc` and
//! never see a half-written value. The lock is held only for the swap.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::freshness;

/// What a source last produced, with its provenance
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<T> {
    pub value: T,
    /// Provider label, suffixed with "(Degraded)" for placeholder values
    pub source_label: String,
    /// Last time the source returned real data
    pub last_success_at: Option<DateTime<Utc>>,
    /// Produced by the fallback path rather than a live fetch
    pub serving_stale: bool,
    /// Placeholder value: the source has never produced real data
    pub degraded: bool,
    #[serde(skip)]
    pub refresh_interval: Duration,
    pub written_at: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    /// Real data exists (possibly stale)
    pub fn has_data(&self) -> bool {
        self.last_success_at.is_some() && !self.degraded
    }

    pub fn data_age_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_success_at.map(|last| now - last)
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        freshness::is_stale_at(self.last_success_at, self.refresh_interval, now)
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    /// The value, only if it came from a real fetch
    pub fn real_value(&self) -> Option<&T> {
        self.has_data().then_some(&self.value)
    }
}

/// Single-writer, multi-reader holder of a source's latest snapshot
#[derive(Debug)]
pub struct CacheSlot<T> {
    id: String,
    current: RwLock<Option<Arc<Snapshot<T>>>>,
}

impl<T> CacheSlot<T> {
    /// Slots start empty
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            current: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn load(&self) -> Option<Arc<Snapshot<T>>> {
        self.current.read().clone()
    }

    /// Replace the snapshot wholesale and return the stored pointer
    pub fn store(&self, snapshot: Snapshot<T>) -> Arc<Snapshot<T>> {
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }
}
