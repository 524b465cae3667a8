//! Park and summit activations
//!
//! An activation is an operator on the air from a POTA park or SOTA summit,
//! reported through spotting networks. Its priority decays quickly: a spot
//! from five minutes ago is actionable, one from an hour ago is history.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decay::{minutes_between, piecewise_linear, truncate_score};
use crate::error::{check_non_empty, check_range, ValidationError};
use crate::{Scoreable, MAX_SCORE};

/// Age in minutes up to which a spot counts as live
pub const FRESH_SPOT_MINUTES: f64 = 5.0;

/// Age in minutes up to which a spot is still worth chasing
pub const FAVORABLE_SPOT_MINUTES: f64 = 15.0;

/// Score knots over spot age in minutes
const SPOT_DECAY: &[(f64, f64)] = &[
    (FRESH_SPOT_MINUTES, 100.0),
    (FAVORABLE_SPOT_MINUTES, 80.0),
    (30.0, 20.0),
    (60.0, 0.0),
];

/// Highest frequency accepted for a spot (kHz)
const MAX_FREQUENCY_KHZ: f64 = 300_000_000.0;

/// Activation programme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationKind {
    /// Parks on the Air
    Pota,
    /// Summits on the Air
    Sota,
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pota => write!(f, "POTA"),
            Self::Sota => write!(f, "SOTA"),
        }
    }
}

/// Where the activator is operating from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationLocation {
    Park {
        /// Park reference, e.g. "US-1234"
        reference: String,
        name: String,
    },
    Summit {
        /// Summit reference, e.g. "W7W/KG-001"
        reference: String,
        name: String,
        points: Option<u32>,
    },
}

impl ActivationLocation {
    pub fn reference(&self) -> &str {
        match self {
            Self::Park { reference, .. } | Self::Summit { reference, .. } => reference,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Park { name, .. } | Self::Summit { name, .. } => name,
        }
    }

    /// Programme implied by the location variant
    pub fn kind(&self) -> ActivationKind {
        match self {
            Self::Park { .. } => ActivationKind::Pota,
            Self::Summit { .. } => ActivationKind::Sota,
        }
    }
}

/// A single on-air activation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activation {
    callsign: String,
    kind: ActivationKind,
    frequency_khz: f64,
    mode: String,
    spotted_at: Option<DateTime<Utc>>,
    last_seen_at: DateTime<Utc>,
    qso_count: u32,
    location: ActivationLocation,
}

impl Activation {
    /// Start building an activation for `callsign` at `location`
    pub fn builder(callsign: &str, location: ActivationLocation) -> ActivationBuilder {
        ActivationBuilder::new(callsign, location)
    }

    pub fn callsign(&self) -> &str {
        &self.callsign
    }

    pub fn kind(&self) -> ActivationKind {
        self.kind
    }

    pub fn frequency_khz(&self) -> f64 {
        self.frequency_khz
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn spotted_at(&self) -> Option<DateTime<Utc>> {
        self.spotted_at
    }

    pub fn last_seen_at(&self) -> DateTime<Utc> {
        self.last_seen_at
    }

    pub fn qso_count(&self) -> u32 {
        self.qso_count
    }

    pub fn location(&self) -> &ActivationLocation {
        &self.location
    }

    /// Minutes since the spot; `None` without a spot time
    pub fn spot_age_minutes(&self, now: DateTime<Utc>) -> Option<f64> {
        self.spotted_at.map(|spotted| minutes_between(spotted, now))
    }

    /// Spotted within the last five minutes (or in the future)
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.spot_age_minutes(now)
            .is_some_and(|age| age <= FRESH_SPOT_MINUTES)
    }

    /// Key used to collapse repeated spots of the same activation
    fn dedup_key(&self) -> (String, String) {
        (
            self.callsign.to_ascii_uppercase(),
            self.location.reference().to_ascii_uppercase(),
        )
    }
}

impl Scoreable for Activation {
    fn score_at(&self, now: DateTime<Utc>) -> u8 {
        match self.spot_age_minutes(now) {
            None => 0,
            Some(age) if age <= FRESH_SPOT_MINUTES => MAX_SCORE,
            Some(age) => truncate_score(piecewise_linear(SPOT_DECAY, age)),
        }
    }

    fn is_favorable_at(&self, now: DateTime<Utc>) -> bool {
        self.spot_age_minutes(now)
            .is_some_and(|age| age <= FAVORABLE_SPOT_MINUTES)
    }
}

/// Builder for activations
pub struct ActivationBuilder {
    callsign: String,
    location: ActivationLocation,
    frequency_khz: f64,
    mode: String,
    spotted_at: Option<DateTime<Utc>>,
    last_seen_at: Option<DateTime<Utc>>,
    qso_count: u32,
}

impl ActivationBuilder {
    pub fn new(callsign: &str, location: ActivationLocation) -> Self {
        Self {
            callsign: callsign.trim().to_ascii_uppercase(),
            location,
            frequency_khz: 0.0,
            mode: String::new(),
            spotted_at: None,
            last_seen_at: None,
            qso_count: 0,
        }
    }

    pub fn frequency_khz(mut self, khz: f64) -> Self {
        self.frequency_khz = khz;
        self
    }

    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = mode.trim().to_ascii_uppercase();
        self
    }

    pub fn spotted_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.spotted_at = at;
        self
    }

    pub fn last_seen_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen_at = Some(at);
        self
    }

    pub fn qso_count(mut self, count: u32) -> Self {
        self.qso_count = count;
        self
    }

    pub fn build(self) -> Result<Activation, ValidationError> {
        check_non_empty("callsign", &self.callsign)?;
        check_non_empty("reference", self.location.reference())?;
        check_range("frequency_khz", self.frequency_khz, 0.0, MAX_FREQUENCY_KHZ)?;

        // Without a separate observation time, the spot is the last sighting
        let last_seen_at = self
            .last_seen_at
            .or(self.spotted_at)
            .unwrap_or_else(Utc::now);

        Ok(Activation {
            callsign: self.callsign,
            kind: self.location.kind(),
            frequency_khz: self.frequency_khz,
            mode: self.mode,
            spotted_at: self.spotted_at,
            last_seen_at,
            qso_count: self.qso_count,
            location: self.location,
        })
    }
}

/// Aggregate view over all current activations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationsSummary {
    activations: Vec<Activation>,
    counts: HashMap<ActivationKind, usize>,
    last_updated: DateTime<Utc>,
}

/// Per-activation contribution to the summary score
const SUMMARY_POINTS_PER_ACTIVATION: usize = 3;

/// Bonus when at least one activation is live
const SUMMARY_FRESH_BONUS: u32 = 10;

/// Activation count from which the summary is favorable
const SUMMARY_FAVORABLE_COUNT: usize = 5;

impl ActivationsSummary {
    /// Collapse repeated spots and order by most recent spot first.
    ///
    /// Repeated spots of one callsign at one reference keep the newest spot
    /// time, the latest sighting, and the highest QSO count.
    pub fn new(activations: Vec<Activation>, last_updated: DateTime<Utc>) -> Self {
        let mut by_key: HashMap<(String, String), Activation> = HashMap::new();
        let mut order: Vec<(String, String)> = Vec::new();

        for activation in activations {
            let key = activation.dedup_key();
            match by_key.get_mut(&key) {
                Some(existing) => {
                    let last_seen_at = existing.last_seen_at.max(activation.last_seen_at);
                    let qso_count = existing.qso_count.max(activation.qso_count);
                    if activation.spotted_at > existing.spotted_at {
                        *existing = activation;
                    }
                    existing.last_seen_at = last_seen_at;
                    existing.qso_count = qso_count;
                }
                None => {
                    order.push(key.clone());
                    by_key.insert(key, activation);
                }
            }
        }

        let mut activations: Vec<Activation> = order
            .into_iter()
            .filter_map(|key| by_key.remove(&key))
            .collect();
        // None sorts below every Some, so unspotted entries land last
        activations.sort_by(|a, b| b.spotted_at.cmp(&a.spotted_at));

        let mut counts = HashMap::new();
        for activation in &activations {
            *counts.entry(activation.kind).or_insert(0) += 1;
        }

        Self {
            activations,
            counts,
            last_updated,
        }
    }

    /// An empty summary (used when no spot feed has produced data)
    pub fn empty(last_updated: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), last_updated)
    }

    pub fn activations(&self) -> &[Activation] {
        &self.activations
    }

    pub fn total(&self) -> usize {
        self.activations.len()
    }

    pub fn count(&self, kind: ActivationKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }
}

impl Scoreable for ActivationsSummary {
    fn score_at(&self, now: DateTime<Utc>) -> u8 {
        if self.activations.is_empty() {
            return 0;
        }

        let base = (self.total() * SUMMARY_POINTS_PER_ACTIVATION).min(usize::from(MAX_SCORE)) as u32;
        let bonus = if self.activations.iter().any(|a| a.is_fresh(now)) {
            SUMMARY_FRESH_BONUS
        } else {
            0
        };

        (base + bonus).min(u32::from(MAX_SCORE)) as u8
    }

    fn is_favorable_at(&self, _now: DateTime<Utc>) -> bool {
        self.total() >= SUMMARY_FAVORABLE_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn park(reference: &str) -> ActivationLocation {
        ActivationLocation::Park {
            reference: reference.to_string(),
            name: "Test Park".to_string(),
        }
    }

    fn spotted(callsign: &str, reference: &str, at: Option<DateTime<Utc>>) -> Activation {
        Activation::builder(callsign, park(reference))
            .frequency_khz(14_062.0)
            .mode("cw")
            .spotted_at(at)
            .build()
            .unwrap()
    }

    #[test]
    fn test_activation_score_decay() {
        let now = Utc::now();
        let at = |minutes: i64| spotted("K1ABC", "US-0001", Some(now - Duration::minutes(minutes)));

        assert_eq!(at(0).score_at(now), 100);
        assert_eq!(at(5).score_at(now), 100);
        assert_eq!(at(10).score_at(now), 90);
        assert_eq!(at(15).score_at(now), 80);
        assert_eq!(at(30).score_at(now), 20);
        assert_eq!(at(45).score_at(now), 10);
        assert_eq!(at(60).score_at(now), 0);
        assert_eq!(at(240).score_at(now), 0);
    }

    #[test]
    fn test_activation_score_edge_cases() {
        let now = Utc::now();
        let future = spotted("K1ABC", "US-0001", Some(now + Duration::minutes(3)));
        let unknown = spotted("K1ABC", "US-0001", None);

        assert_eq!(future.score_at(now), 100);
        assert_eq!(unknown.score_at(now), 0);
        assert!(!unknown.is_favorable_at(now));
    }

    #[test]
    fn test_activation_score_is_monotonic() {
        let now = Utc::now();
        let mut previous = u8::MAX;
        for seconds in (0..=4_000).step_by(30) {
            let a = spotted("K1ABC", "US-0001", Some(now - Duration::seconds(seconds)));
            let score = a.score_at(now);
            assert!(score <= previous, "score rose at {}s", seconds);
            previous = score;
        }
    }

    #[test]
    fn test_activation_favorable_boundary() {
        let now = Utc::now();
        let at_limit = spotted("K1ABC", "US-0001", Some(now - Duration::minutes(15)));
        let past_limit = spotted("K1ABC", "US-0001", Some(now - Duration::minutes(15) - Duration::seconds(1)));

        assert!(at_limit.is_favorable_at(now));
        assert!(!past_limit.is_favorable_at(now));
    }

    #[test]
    fn test_activation_validation() {
        let empty = Activation::builder("  ", park("US-0001")).frequency_khz(7_030.0).build();
        assert_eq!(empty, Err(ValidationError::Empty("callsign")));

        let no_ref = Activation::builder("K1ABC", park("")).frequency_khz(7_030.0).build();
        assert_eq!(no_ref, Err(ValidationError::Empty("reference")));

        let bad_freq = Activation::builder("K1ABC", park("US-0001"))
            .frequency_khz(f64::INFINITY)
            .build();
        assert!(bad_freq.is_err());
    }

    #[test]
    fn test_activation_kind_follows_location() {
        let summit = ActivationLocation::Summit {
            reference: "W7W/KG-001".to_string(),
            name: "Mount Test".to_string(),
            points: Some(10),
        };
        let a = Activation::builder("w7abc", summit).frequency_khz(14_285.0).build().unwrap();

        assert_eq!(a.kind(), ActivationKind::Sota);
        assert_eq!(a.callsign(), "W7ABC");
        assert_eq!(a.kind().to_string(), "SOTA");
    }

    #[test]
    fn test_summary_score() {
        let now = Utc::now();
        let old: Vec<Activation> = (0..10)
            .map(|i| spotted(&format!("K{}ABC", i), "US-0001", Some(now - Duration::minutes(20))))
            .collect();

        let summary = ActivationsSummary::new(old.clone(), now);
        assert_eq!(summary.score_at(now), 30);
        assert!(summary.is_favorable_at(now));

        let mut with_fresh = old;
        with_fresh[3] = spotted("K3ABC", "US-0001", Some(now - Duration::minutes(2)));
        let summary = ActivationsSummary::new(with_fresh, now);
        assert_eq!(summary.score_at(now), 40);

        let many: Vec<Activation> = (0..40)
            .map(|i| spotted(&format!("K{}AAA", i), "US-0002", Some(now)))
            .collect();
        assert_eq!(ActivationsSummary::new(many, now).score_at(now), 100);
    }

    #[test]
    fn test_summary_empty_and_small() {
        let now = Utc::now();
        let empty = ActivationsSummary::empty(now);
        assert_eq!(empty.score_at(now), 0);
        assert!(!empty.is_favorable_at(now));

        let four: Vec<Activation> = (0..4)
            .map(|i| spotted(&format!("N{}X", i), "US-0003", Some(now)))
            .collect();
        assert!(!ActivationsSummary::new(four, now).is_favorable_at(now));
    }

    #[test]
    fn test_summary_dedup_and_order() {
        let now = Utc::now();
        let older = spotted("K1ABC", "US-0001", Some(now - Duration::minutes(12)));
        let newer = Activation::builder("k1abc", park("us-0001"))
            .frequency_khz(7_074.0)
            .mode("ft8")
            .spotted_at(Some(now - Duration::minutes(1)))
            .qso_count(4)
            .build()
            .unwrap();
        let other = spotted("W2XYZ", "US-0099", Some(now - Duration::minutes(6)));
        let unspotted = spotted("N3QQQ", "US-0500", None);

        let summary = ActivationsSummary::new(vec![unspotted, older, other, newer], now);

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count(ActivationKind::Pota), 3);
        assert_eq!(summary.count(ActivationKind::Sota), 0);

        let calls: Vec<&str> = summary.activations().iter().map(|a| a.callsign()).collect();
        assert_eq!(calls, vec!["K1ABC", "W2XYZ", "N3QQQ"]);
        assert_eq!(summary.activations()[0].mode(), "FT8");
        assert_eq!(summary.activations()[0].qso_count(), 4);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let now = Utc::now();
        let a = spotted("K1ABC", "US-0001", Some(now - Duration::minutes(7)));
        assert_eq!(a.score_at(now), a.score_at(now));
        assert_eq!(a.is_favorable_at(now), a.is_favorable_at(now));
    }
}
