//! Per-source circuit breaker
//!
//! # States
//! - Closed: calls pass through, outcomes fill a count-based sliding window
//! - Open: calls are short-circuited without touching the source
//! - Half-Open: a limited number of probe calls test recovery
//!
//! # Transitions
//! ```text
//! Closed → Open:      window holds >= minimum_calls and failure rate > threshold
//! Open → Half-Open:   cool-down elapsed (checked on the next admission)
//! Half-Open → Closed: all probes reported, failure rate <= threshold
//! Half-Open → Open:   all probes reported, failure rate > threshold
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Circuit breaker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Number of most recent outcomes considered
    pub window_size: usize,
    /// Outcomes required in the window before the breaker may open
    pub minimum_calls: usize,
    /// Failure rate (0.0 - 1.0) that must be exceeded to open
    pub failure_rate_threshold: f64,
    /// Time spent open before probing
    #[serde(with = "secs")]
    pub cool_down: Duration,
    /// Probe calls admitted while half-open
    pub half_open_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 4,
            failure_rate_threshold: 0.5,
            cool_down: Duration::from_secs(120),
            half_open_probes: 1,
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF-OPEN",
        };
        f.pad(label)
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// true = failure, most recent at the back
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    probes_admitted: u32,
    probe_failures: u32,
    probe_successes: u32,
    rejected: u64,
}

impl Inner {
    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let failures = self.window.iter().filter(|f| **f).count();
        failures as f64 / self.window.len() as f64
    }

    fn reset_probes(&mut self) {
        self.probes_admitted = 0;
        self.probe_failures = 0;
        self.probe_successes = 0;
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub failure_rate: f64,
    pub window_len: usize,
    pub rejected: u64,
}

/// Failure-rate gate for one source
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: &str, config: BreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: VecDeque::new(),
                opened_at: None,
                probes_admitted: 0,
                probe_failures: 0,
                probe_successes: 0,
                rejected: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock();
        BreakerStats {
            state: inner.state,
            failure_rate: inner.failure_rate(),
            window_len: inner.window.len(),
            rejected: inner.rejected,
        }
    }

    /// Ask to make a live call; `false` means short-circuit
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at) >= self.config.cool_down)
                    .unwrap_or(true);
                if cooled {
                    info!("Breaker {} half-open, probing", self.name);
                    inner.state = CircuitState::HalfOpen;
                    inner.reset_probes();
                    inner.probes_admitted = 1;
                    true
                } else {
                    inner.rejected += 1;
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probes_admitted < self.config.half_open_probes.max(1) {
                    inner.probes_admitted += 1;
                    true
                } else {
                    inner.rejected += 1;
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.record_at(false, Instant::now());
    }

    pub fn record_failure(&self) {
        self.record_at(true, Instant::now());
    }

    pub fn record_at(&self, failure: bool, now: Instant) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failure);
                while inner.window.len() > self.config.window_size.max(1) {
                    inner.window.pop_front();
                }
                let rate = inner.failure_rate();
                if inner.window.len() >= self.config.minimum_calls
                    && rate > self.config.failure_rate_threshold
                {
                    warn!(
                        "Breaker {} opened: failure rate {:.0}% over {} calls",
                        self.name,
                        rate * 100.0,
                        inner.window.len()
                    );
                    self.open(&mut inner, now);
                }
            }
            CircuitState::HalfOpen => {
                if failure {
                    inner.probe_failures += 1;
                } else {
                    inner.probe_successes += 1;
                }
                let completed = inner.probe_failures + inner.probe_successes;
                if completed >= self.config.half_open_probes.max(1) {
                    let rate = f64::from(inner.probe_failures) / f64::from(completed);
                    if rate > self.config.failure_rate_threshold {
                        warn!("Breaker {} re-opened: probes failed", self.name);
                        self.open(&mut inner, now);
                    } else {
                        info!("Breaker {} closed: source recovered", self.name);
                        inner.state = CircuitState::Closed;
                        inner.window.clear();
                        inner.opened_at = None;
                        inner.reset_probes();
                    }
                }
            }
            // Outcomes of calls admitted before opening do not extend the cool-down
            CircuitState::Open => {}
        }
    }

    fn open(&self, inner: &mut Inner, now: Instant) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(now);
        inner.window.clear();
        inner.reset_probes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            BreakerConfig {
                window_size: 4,
                minimum_calls: 4,
                failure_rate_threshold: 0.5,
                cool_down: Duration::from_secs(30),
                half_open_probes: 2,
            },
        )
    }

    #[test]
    fn test_starts_closed() {
        let b = breaker();
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.try_acquire());
    }

    #[test]
    fn test_opens_when_rate_exceeds_threshold() {
        let b = breaker();
        let t0 = Instant::now();

        // 2 of 4 = 50%: not strictly above threshold
        b.record_at(false, t0);
        b.record_at(true, t0);
        b.record_at(false, t0);
        b.record_at(true, t0);
        assert_eq!(b.state(), CircuitState::Closed);

        // Window slides to [true, false, true, true] = 75%
        b.record_at(true, t0);
        assert_eq!(b.state(), CircuitState::Open);
        assert!(!b.try_acquire_at(t0 + Duration::from_secs(1)));
        assert_eq!(b.stats().rejected, 1);
    }

    #[test]
    fn test_needs_minimum_calls() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..3 {
            b.record_at(true, t0);
        }
        assert_eq!(b.state(), CircuitState::Closed);
        b.record_at(true, t0);
        assert_eq!(b.state(), CircuitState::Open);
    }

    #[test]
    fn test_half_open_after_cool_down_then_close() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..4 {
            b.record_at(true, t0);
        }
        assert!(!b.try_acquire_at(t0 + Duration::from_secs(29)));

        let later = t0 + Duration::from_secs(30);
        assert!(b.try_acquire_at(later));
        assert_eq!(b.state(), CircuitState::HalfOpen);
        assert!(b.try_acquire_at(later));
        // Only two probes admitted
        assert!(!b.try_acquire_at(later));

        b.record_at(false, later);
        assert_eq!(b.state(), CircuitState::HalfOpen);
        b.record_at(false, later);
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(b.try_acquire_at(later));
    }

    #[test]
    fn test_half_open_failed_probes_reopen() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..4 {
            b.record_at(true, t0);
        }

        let later = t0 + Duration::from_secs(31);
        assert!(b.try_acquire_at(later));
        assert!(b.try_acquire_at(later));
        b.record_at(true, later);
        b.record_at(true, later);
        assert_eq!(b.state(), CircuitState::Open);

        // Cool-down restarts from the re-open
        assert!(!b.try_acquire_at(later + Duration::from_secs(10)));
        assert!(b.try_acquire_at(later + Duration::from_secs(30)));
    }

    #[test]
    fn test_half_open_mixed_probes_at_threshold_close() {
        let b = breaker();
        let t0 = Instant::now();
        for _ in 0..4 {
            b.record_at(true, t0);
        }

        let later = t0 + Duration::from_secs(30);
        assert!(b.try_acquire_at(later));
        assert!(b.try_acquire_at(later));
        b.record_at(true, later);
        b.record_at(false, later);
        // 1 of 2 failed = 50%, not above threshold
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn test_config_deserializes_secs() {
        let cfg: BreakerConfig = serde_json::from_str(r#"{"cool_down": 45, "window_size": 6}"#).unwrap();
        assert_eq!(cfg.cool_down, Duration::from_secs(45));
        assert_eq!(cfg.window_size, 6);
        assert_eq!(cfg.minimum_calls, 4);
    }
}
