//! Meteor showers
//!
//! A shower has a visibility window (weeks) and a peak window (hours to a
//! day or two). Status is derived purely from where `now` falls relative to
//! the visibility window. Active showers score on a Gaussian around the peak
//! midpoint, scaled by the zenithal hourly rate; upcoming showers score on
//! lead time.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::decay::{gaussian, hours, piecewise_linear, truncate_score};
use crate::error::{check_non_empty, ValidationError};
use crate::Scoreable;

/// Width of the Gaussian around the peak midpoint (hours)
const PEAK_SIGMA_HOURS: f64 = 36.0;

/// Added to the ZHR before applying the Gaussian factor
const ZHR_BASELINE: f64 = 50.0;

/// Gaussian factor above which an active shower counts as near peak
const NEAR_PEAK_FACTOR: f64 = 0.5;

/// Lead time within which an upcoming shower is favorable (hours)
const FAVORABLE_LEAD_HOURS: f64 = 12.0;

/// Peak end within this many hours counts as ending soon
const ENDING_SOON_HOURS: i64 = 6;

/// Upcoming score knots over lead time in hours
const LEAD_DECAY: &[(f64, f64)] = &[(0.0, 70.0), (6.0, 60.0), (24.0, 60.0), (72.0, 30.0)];

/// Score for showers more than three days out
const DISTANT_SCORE: u8 = 15;

/// Lifecycle of a shower relative to its visibility window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeteorStatus {
    Upcoming,
    Active,
    Ended,
}

impl fmt::Display for MeteorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Upcoming => "UPCOMING",
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
        };
        f.pad(label)
    }
}

/// Dates bounding a shower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShowerWindow {
    pub visibility_start: DateTime<Utc>,
    pub peak_start: DateTime<Utc>,
    pub peak_end: DateTime<Utc>,
    pub visibility_end: DateTime<Utc>,
}

/// An annual meteor shower occurrence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeteorShower {
    name: String,
    code: String,
    window: ShowerWindow,
    peak_zhr: u32,
    parent_body: Option<String>,
    info_url: Option<String>,
}

impl MeteorShower {
    /// Requires visibility_start <= peak_start <= peak_end <= visibility_end
    pub fn new(
        name: &str,
        code: &str,
        window: ShowerWindow,
        peak_zhr: u32,
        parent_body: Option<String>,
        info_url: Option<String>,
    ) -> Result<Self, ValidationError> {
        check_non_empty("name", name)?;
        check_non_empty("code", code)?;

        let ordered = window.visibility_start <= window.peak_start
            && window.peak_start <= window.peak_end
            && window.peak_end <= window.visibility_end;
        if !ordered {
            return Err(ValidationError::InvalidWindow(format!(
                "{}: visibility {} .. {}, peak {} .. {}",
                code,
                window.visibility_start,
                window.visibility_end,
                window.peak_start,
                window.peak_end
            )));
        }

        Ok(Self {
            name: name.trim().to_string(),
            code: code.trim().to_ascii_uppercase(),
            window,
            peak_zhr,
            parent_body,
            info_url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn window(&self) -> &ShowerWindow {
        &self.window
    }

    pub fn peak_zhr(&self) -> u32 {
        self.peak_zhr
    }

    pub fn parent_body(&self) -> Option<&str> {
        self.parent_body.as_deref()
    }

    pub fn info_url(&self) -> Option<&str> {
        self.info_url.as_deref()
    }

    pub fn status(&self, now: DateTime<Utc>) -> MeteorStatus {
        if now < self.window.visibility_start {
            MeteorStatus::Upcoming
        } else if now > self.window.visibility_end {
            MeteorStatus::Ended
        } else {
            MeteorStatus::Active
        }
    }

    /// Midpoint of the peak window
    pub fn peak_midpoint(&self) -> DateTime<Utc> {
        self.window.peak_start + (self.window.peak_end - self.window.peak_start) / 2
    }

    pub fn is_at_peak(&self, now: DateTime<Utc>) -> bool {
        self.window.peak_start <= now && now <= self.window.peak_end
    }

    /// Active with the peak window closing within the next few hours
    pub fn is_ending_soon(&self, now: DateTime<Utc>) -> bool {
        if self.status(now) != MeteorStatus::Active {
            return false;
        }
        let remaining = self.window.peak_end - now;
        remaining >= Duration::zero() && remaining <= Duration::hours(ENDING_SOON_HOURS)
    }

    /// Signed time until the peak midpoint; negative once it has passed
    pub fn time_to_peak(&self, now: DateTime<Utc>) -> Duration {
        self.peak_midpoint() - now
    }

    /// Gaussian closeness to the peak midpoint in (0, 1]
    fn peak_factor(&self, now: DateTime<Utc>) -> f64 {
        gaussian(hours(self.time_to_peak(now)).abs(), PEAK_SIGMA_HOURS)
    }

    fn lead_hours(&self, now: DateTime<Utc>) -> f64 {
        hours(self.window.visibility_start - now)
    }
}

impl Scoreable for MeteorShower {
    fn score_at(&self, now: DateTime<Utc>) -> u8 {
        match self.status(now) {
            MeteorStatus::Ended => 0,
            MeteorStatus::Upcoming => {
                let lead = self.lead_hours(now);
                match LEAD_DECAY.last() {
                    Some(&(last, _)) if lead > last => DISTANT_SCORE,
                    _ => truncate_score(piecewise_linear(LEAD_DECAY, lead)),
                }
            }
            // Scores closeness to the peak, not visibility. A shower visible
            // weeks ahead of its peak drops from the lead score to near zero
            // when it turns active and climbs back as the peak approaches.
            MeteorStatus::Active => {
                let strength = ZHR_BASELINE + f64::from(self.peak_zhr);
                truncate_score(self.peak_factor(now) * strength)
            }
        }
    }

    fn is_favorable_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_at_peak(now) {
            return true;
        }
        match self.status(now) {
            MeteorStatus::Active => self.peak_factor(now) >= NEAR_PEAK_FACTOR,
            MeteorStatus::Upcoming => self.lead_hours(now) <= FAVORABLE_LEAD_HOURS,
            MeteorStatus::Ended => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Perseid-like shower with the peak midpoint at 12 Aug 12:00 UTC
    fn perseids() -> MeteorShower {
        let at = |m: u32, d: u32, h: u32| Utc.with_ymd_and_hms(2026, m, d, h, 0, 0).unwrap();
        MeteorShower::new(
            "Perseids",
            "per",
            ShowerWindow {
                visibility_start: at(7, 17, 0),
                peak_start: at(8, 12, 0),
                peak_end: at(8, 13, 0),
                visibility_end: at(8, 24, 0),
            },
            100,
            Some("109P/Swift-Tuttle".to_string()),
            None,
        )
        .unwrap()
    }

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_status_transitions() {
        let s = perseids();
        assert_eq!(s.status(at(7, 1, 0)), MeteorStatus::Upcoming);
        assert_eq!(s.status(at(7, 17, 0)), MeteorStatus::Active);
        assert_eq!(s.status(at(8, 12, 12)), MeteorStatus::Active);
        assert_eq!(s.status(at(8, 24, 0)), MeteorStatus::Active);
        assert_eq!(s.status(at(8, 25, 0)), MeteorStatus::Ended);
        assert_eq!(s.code(), "PER");
    }

    #[test]
    fn test_score_follows_peak_not_visibility() {
        let s = perseids();
        let before_visible = s.score_at(at(7, 16, 23));
        assert!(before_visible >= 60);
        assert!(s.is_favorable_at(at(7, 16, 23)));

        // Visible more than three weeks before the peak
        assert_eq!(s.score_at(at(7, 17, 0)), 0);
        assert!(!s.is_favorable_at(at(7, 17, 0)));

        assert!(s.score_at(at(8, 12, 12)) > before_visible);
    }

    #[test]
    fn test_ended_scores_zero() {
        let s = perseids();
        let now = at(9, 1, 0);
        assert_eq!(s.score_at(now), 0);
        assert!(!s.is_favorable_at(now));
    }

    #[test]
    fn test_upcoming_scores_by_lead_time() {
        let s = perseids();
        let start = s.window().visibility_start;

        let within_6h = s.score_at(start - Duration::hours(3));
        let lead_30h = s.score_at(start - Duration::hours(30));
        let lead_70h = s.score_at(start - Duration::hours(70));
        let lead_10d = s.score_at(start - Duration::days(10));

        assert!(within_6h >= 60);
        assert!((30..=60).contains(&lead_30h));
        assert!((30..=60).contains(&lead_70h));
        assert!(lead_30h >= lead_70h);
        assert_eq!(lead_10d, 15);
    }

    #[test]
    fn test_upcoming_monotonic_in_lead() {
        let s = perseids();
        let start = s.window().visibility_start;
        let mut previous = u8::MAX;
        for h in 1..200 {
            let score = s.score_at(start - Duration::hours(h));
            assert!(score <= previous, "score rose at lead {}h", h);
            previous = score;
        }
    }

    #[test]
    fn test_active_gaussian_around_midpoint() {
        let s = perseids();
        let mid = s.peak_midpoint();
        assert_eq!(mid, at(8, 12, 12));

        // Saturates near the midpoint for a strong shower
        assert_eq!(s.score_at(mid), 100);
        assert_eq!(s.score_at(mid + Duration::hours(24)), 100);

        let two_days_off = s.score_at(mid + Duration::hours(48));
        let three_days_off = s.score_at(mid - Duration::hours(72));
        assert!(two_days_off < 100);
        assert!(three_days_off < two_days_off);
        assert_eq!(s.score_at(mid - Duration::hours(48)), two_days_off);
    }

    #[test]
    fn test_weak_shower_does_not_saturate() {
        let mut s = perseids();
        s.peak_zhr = 5;
        assert_eq!(s.score_at(s.peak_midpoint()), 55);
    }

    #[test]
    fn test_favorability() {
        let s = perseids();
        let start = s.window().visibility_start;

        assert!(s.is_favorable_at(at(8, 12, 6)));
        assert!(s.is_favorable_at(s.peak_midpoint() + Duration::hours(30)));
        assert!(!s.is_favorable_at(at(7, 20, 0)));
        assert!(s.is_favorable_at(start - Duration::hours(10)));
        assert!(!s.is_favorable_at(start - Duration::hours(13)));
    }

    #[test]
    fn test_peak_helpers() {
        let s = perseids();
        assert!(s.is_at_peak(at(8, 12, 0)));
        assert!(s.is_at_peak(at(8, 13, 0)));
        assert!(!s.is_at_peak(at(8, 13, 1)));

        assert!(s.is_ending_soon(at(8, 12, 20)));
        assert!(!s.is_ending_soon(at(8, 12, 6)));
        assert!(!s.is_ending_soon(at(8, 14, 0)));

        assert_eq!(s.time_to_peak(s.peak_midpoint()), Duration::zero());
        assert!(s.time_to_peak(at(8, 1, 0)) > Duration::zero());
        assert!(s.time_to_peak(at(8, 20, 0)) < Duration::zero());
    }

    #[test]
    fn test_rejects_unordered_window() {
        let window = ShowerWindow {
            visibility_start: at(8, 1, 0),
            peak_start: at(7, 1, 0),
            peak_end: at(8, 2, 0),
            visibility_end: at(8, 10, 0),
        };
        let result = MeteorShower::new("Bad", "BAD", window, 10, None, None);
        assert!(matches!(result, Err(ValidationError::InvalidWindow(_))));
    }
}
