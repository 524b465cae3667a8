//! HF band conditions

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decay::truncate_score;
use crate::error::{check_non_empty, check_range, ValidationError};
use crate::Scoreable;

/// Confidence above which a GOOD band is highlighted
const FAVORABLE_CONFIDENCE: f64 = 0.5;

/// Reported propagation quality of a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BandRating {
    Good,
    Fair,
    Poor,
    Unknown,
}

impl BandRating {
    /// Score weight of the rating at full confidence
    pub fn weight(self) -> u8 {
        match self {
            Self::Good => 100,
            Self::Fair => 60,
            Self::Poor => 20,
            Self::Unknown => 0,
        }
    }

    /// Parse a feed label, case-insensitively; anything unrecognised is Unknown
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "good" => Self::Good,
            "fair" => Self::Fair,
            "poor" => Self::Poor,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for BandRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Good => "GOOD",
            Self::Fair => "FAIR",
            Self::Poor => "POOR",
            Self::Unknown => "UNKNOWN",
        };
        f.pad(label)
    }
}

/// Propagation verdict for one band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandCondition {
    band: String,
    rating: BandRating,
    confidence: f64,
    notes: Option<String>,
}

impl BandCondition {
    /// Confidence must lie in [0, 1]
    pub fn new(
        band: &str,
        rating: BandRating,
        confidence: f64,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        check_non_empty("band", band)?;
        check_range("confidence", confidence, 0.0, 1.0)?;

        Ok(Self {
            band: band.trim().to_string(),
            rating,
            confidence,
            notes,
        })
    }

    pub fn band(&self) -> &str {
        &self.band
    }

    pub fn rating(&self) -> BandRating {
        self.rating
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Scoreable for BandCondition {
    fn score_at(&self, _now: DateTime<Utc>) -> u8 {
        truncate_score(f64::from(self.rating.weight()) * self.confidence)
    }

    fn is_favorable_at(&self, _now: DateTime<Utc>) -> bool {
        self.rating == BandRating::Good && self.confidence > FAVORABLE_CONFIDENCE
    }
}
