//! Decay curves shared by the per-entity score formulas
//!
//! Scores fall off with age in one of two shapes:
//! - Piecewise linear: interpolate between (x, value) knots, flat outside
//! - Gaussian: e^(-d² / 2σ²) around a centre point

use chrono::{DateTime, Duration, Utc};

use crate::MAX_SCORE;

/// Tolerance absorbed before truncating a raw score
const TRUNCATE_EPSILON: f64 = 1e-9;

/// Interpolate `x` over knots sorted by ascending x.
///
/// Values left of the first knot take the first value, right of the last
/// knot the last value.
pub fn piecewise_linear(knots: &[(f64, f64)], x: f64) -> f64 {
    let Some(&(first_x, first_v)) = knots.first() else {
        return 0.0;
    };
    if x <= first_x {
        return first_v;
    }

    for pair in knots.windows(2) {
        let (x0, v0) = pair[0];
        let (x1, v1) = pair[1];
        if x <= x1 {
            if x1 <= x0 {
                return v1;
            }
            return v0 + (x - x0) / (x1 - x0) * (v1 - v0);
        }
    }

    knots.last().map(|&(_, v)| v).unwrap_or(0.0)
}

/// Gaussian factor in (0, 1] for a distance from the centre
pub fn gaussian(distance: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if distance == 0.0 { 1.0 } else { 0.0 };
    }
    (-(distance * distance) / (2.0 * sigma * sigma)).exp()
}

/// Clamp a raw score into [0, 100] and truncate toward zero
pub fn truncate_score(raw: f64) -> u8 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    let max = f64::from(MAX_SCORE);
    (raw + TRUNCATE_EPSILON).floor().min(max) as u8
}

/// Fractional minutes from `from` to `to` (negative if `to` is earlier)
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Fractional hours of a signed duration
pub fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / 3_600_000.0
}
