//! Resilient fetch pipeline
//!
//! Every external source implements [`SourceClient`] with only its
//! wire-specific `do_fetch`. [`ResilientSource`] wraps a client with the
//! shared plumbing:
//! 1. Ask the circuit breaker; if open, skip straight to fallback
//! 2. Run `do_fetch` under a per-attempt timeout inside the retry policy
//! 3. On success, swap a fresh snapshot into the cache slot
//! 4. On failure, serve the last real snapshot marked stale, or a degraded
//!    default if the source never produced data
//!
//! `fetch` never returns an error; callers always get a snapshot annotated
//! with its freshness.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use propwatch_core::DEGRADED_MARKER;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{BreakerConfig, CacheSlot, CircuitBreaker, CircuitState, FetchError, FreshnessTracker, RetryPolicy, Snapshot};

/// Per-call context handed to `do_fetch`
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// Zero-based attempt number within this fetch
    pub attempt: u32,
    /// Response bodies larger than this are rejected
    pub max_response_bytes: u64,
}

/// Wire-specific half of a source
#[async_trait]
pub trait SourceClient: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    /// Short machine name, e.g. "noaa-swpc"
    fn name(&self) -> &str;

    /// Human-readable provider label, e.g. "NOAA SWPC"
    fn source_label(&self) -> &str;

    /// One live attempt against the provider
    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError>;

    /// Placeholder served when the source has never produced data
    fn default_value(&self) -> Self::Output;
}

/// Static parameters of a pipeline
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub slot_id: String,
    pub refresh_interval: Duration,
    pub attempt_timeout: Duration,
    pub max_response_bytes: u64,
}

impl SourceSettings {
    pub fn new(slot_id: &str, refresh_interval: Duration) -> Self {
        Self {
            slot_id: slot_id.to_string(),
            refresh_interval,
            attempt_timeout: Duration::from_secs(15),
            max_response_bytes: 2 * 1024 * 1024,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, bytes: u64) -> Self {
        self.max_response_bytes = bytes;
        self
    }
}

/// Status view of one source
#[derive(Debug, Clone, Serialize)]
pub struct SourceHealth {
    pub name: String,
    pub source_label: String,
    pub slot_id: String,
    pub breaker: CircuitState,
    pub last_success_at: Option<DateTime<Utc>>,
    pub data_age_secs: Option<i64>,
    pub refresh_interval_secs: u64,
    pub is_stale: bool,
    pub serving_stale: bool,
    pub consecutive_fallbacks: u32,
}

/// A source client wrapped with breaker, retry, cache and freshness
pub struct ResilientSource<C: SourceClient> {
    client: C,
    settings: SourceSettings,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    freshness: FreshnessTracker,
    slot: Arc<CacheSlot<C::Output>>,
    serving_stale: AtomicBool,
    consecutive_fallbacks: AtomicU32,
}

impl<C: SourceClient> ResilientSource<C> {
    pub fn new(client: C, settings: SourceSettings, breaker: BreakerConfig, retry: RetryPolicy) -> Self {
        let breaker = CircuitBreaker::new(client.name(), breaker);
        let freshness = FreshnessTracker::new(settings.refresh_interval);
        let slot = Arc::new(CacheSlot::new(&settings.slot_id));

        Self {
            client,
            settings,
            breaker,
            retry,
            freshness,
            slot,
            serving_stale: AtomicBool::new(false),
            consecutive_fallbacks: AtomicU32::new(0),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn name(&self) -> &str {
        self.client.name()
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Current slot contents without fetching
    pub fn snapshot(&self) -> Option<Arc<Snapshot<C::Output>>> {
        self.slot.load()
    }

    /// Fetch live data, falling back to cached or degraded values
    pub async fn fetch(&self) -> Arc<Snapshot<C::Output>> {
        let result = if self.breaker.try_acquire() {
            self.fetch_live().await
        } else {
            Err(FetchError::BreakerOpen)
        };

        match result {
            Ok(value) => self.commit(value),
            Err(e) => {
                if !matches!(e, FetchError::BreakerOpen) {
                    self.breaker.record_failure();
                }
                self.fall_back(&e)
            }
        }
    }

    async fn fetch_live(&self) -> Result<C::Output, FetchError> {
        let max_response_bytes = self.settings.max_response_bytes;
        self.retry
            .run(self.client.name(), self.settings.attempt_timeout, |attempt| {
                let ctx = FetchContext {
                    attempt,
                    max_response_bytes,
                };
                async move { self.client.do_fetch(&ctx).await }
            })
            .await
    }

    fn commit(&self, value: C::Output) -> Arc<Snapshot<C::Output>> {
        let now = Utc::now();
        self.freshness.record_success(now);
        self.breaker.record_success();
        self.serving_stale.store(false, Ordering::SeqCst);

        let fallbacks = self.consecutive_fallbacks.swap(0, Ordering::SeqCst);
        if fallbacks > 0 {
            info!("{} recovered after {} fallback(s)", self.name(), fallbacks);
        } else {
            debug!("{} refreshed", self.name());
        }

        self.slot.store(Snapshot {
            value,
            source_label: self.client.source_label().to_string(),
            last_success_at: Some(now),
            serving_stale: false,
            degraded: false,
            refresh_interval: self.settings.refresh_interval,
            written_at: now,
        })
    }

    fn fall_back(&self, error: &FetchError) -> Arc<Snapshot<C::Output>> {
        let now = Utc::now();
        self.serving_stale.store(true, Ordering::SeqCst);
        let fallbacks = self.consecutive_fallbacks.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = match self.slot.load() {
            Some(previous) if previous.has_data() => {
                warn!(
                    "{} fetch failed ({}), serving cached data from {:?}",
                    self.name(),
                    error,
                    previous.last_success_at
                );
                Snapshot {
                    serving_stale: true,
                    written_at: now,
                    ..(*previous).clone()
                }
            }
            _ => {
                warn!(
                    "{} fetch failed ({}), no data yet; serving degraded default (fallback #{})",
                    self.name(),
                    error,
                    fallbacks
                );
                Snapshot {
                    value: self.client.default_value(),
                    source_label: format!("{} ({})", self.client.source_label(), DEGRADED_MARKER),
                    last_success_at: None,
                    serving_stale: true,
                    degraded: true,
                    refresh_interval: self.settings.refresh_interval,
                    written_at: now,
                }
            }
        };

        self.slot.store(snapshot)
    }

    pub fn last_successful_refresh(&self) -> Option<DateTime<Utc>> {
        self.freshness.last_success()
    }

    /// Time since the last success; `None` if the source never succeeded
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.freshness.data_age()
    }

    pub fn is_stale(&self) -> bool {
        self.freshness.is_stale()
    }

    /// Whether the most recent `fetch` used the fallback path
    pub fn is_serving_stale_data(&self) -> bool {
        self.serving_stale.load(Ordering::SeqCst)
    }

    pub fn health(&self) -> SourceHealth {
        SourceHealth {
            name: self.client.name().to_string(),
            source_label: self.client.source_label().to_string(),
            slot_id: self.settings.slot_id.clone(),
            breaker: self.breaker.state(),
            last_success_at: self.last_successful_refresh(),
            data_age_secs: self.data_age().map(|age| age.num_seconds()),
            refresh_interval_secs: self.settings.refresh_interval.as_secs(),
            is_stale: self.is_stale(),
            serving_stale: self.is_serving_stale_data(),
            consecutive_fallbacks: self.consecutive_fallbacks.load(Ordering::SeqCst),
        }
    }
}

/// Object-safe view of a pipeline, for schedulers and status listings
#[async_trait]
pub trait Refreshable: Send + Sync {
    fn name(&self) -> &str;

    fn refresh_interval(&self) -> Duration;

    /// Run one `fetch`, discarding the snapshot
    async fn refresh(&self);

    fn health(&self) -> SourceHealth;
}

#[async_trait]
impl<C: SourceClient> Refreshable for ResilientSource<C> {
    fn name(&self) -> &str {
        self.client.name()
    }

    fn refresh_interval(&self) -> Duration {
        self.settings.refresh_interval
    }

    async fn refresh(&self) {
        self.fetch().await;
    }

    fn health(&self) -> SourceHealth {
        ResilientSource::health(self)
    }
}
