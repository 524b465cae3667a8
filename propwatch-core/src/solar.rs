//! Solar and geomagnetic indices
//!
//! HF propagation improves with solar flux (more ionisation of the F layer)
//! and degrades with geomagnetic disturbance (K- and A-index). The score
//! blends the three so that it never falls as flux rises and never rises as
//! K climbs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decay::truncate_score;
use crate::error::{check_non_empty, check_range, ValidationError};
use crate::Scoreable;

/// Flux at which the flux component starts counting
const FLUX_FLOOR: f64 = 60.0;

/// Flux at which the flux component saturates
const FLUX_CEILING: f64 = 200.0;

/// A-index at which the A component bottoms out
const A_INDEX_CEILING: f64 = 50.0;

const FLUX_WEIGHT: f64 = 50.0;
const K_WEIGHT: f64 = 35.0;
const A_WEIGHT: f64 = 15.0;

/// Geomagnetic disturbance derived from the K-index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeomagneticActivity {
    Quiet,
    Unsettled,
    Active,
    Storm,
    SevereStorm,
}

impl GeomagneticActivity {
    pub fn from_k_index(k: f64) -> Self {
        match k {
            k if k < 3.0 => Self::Quiet,
            k if k < 5.0 => Self::Unsettled,
            k if k < 7.0 => Self::Active,
            k if k < 9.0 => Self::Storm,
            _ => Self::SevereStorm,
        }
    }
}

impl fmt::Display for GeomagneticActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Quiet => "Quiet",
            Self::Unsettled => "Unsettled",
            Self::Active => "Active",
            Self::Storm => "Storm",
            Self::SevereStorm => "Severe Storm",
        };
        f.pad(label)
    }
}

/// Coarse solar flux bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolarFluxLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl SolarFluxLevel {
    pub fn from_flux(sfi: f64) -> Self {
        match sfi {
            s if s < 70.0 => Self::VeryLow,
            s if s < 100.0 => Self::Low,
            s if s < 150.0 => Self::Moderate,
            s if s < 200.0 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

impl fmt::Display for SolarFluxLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        };
        f.pad(label)
    }
}

/// One reading of the solar indices from a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarIndices {
    pub(crate) solar_flux: f64,
    pub(crate) a_index: f64,
    pub(crate) k_index: f64,
    pub(crate) sunspot_number: Option<u32>,
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) source: String,
}

impl SolarIndices {
    /// Flux in [0, 1000], A in [0, 400], K in [0, 9]
    pub fn new(
        solar_flux: f64,
        a_index: f64,
        k_index: f64,
        sunspot_number: Option<u32>,
        timestamp: DateTime<Utc>,
        source: &str,
    ) -> Result<Self, ValidationError> {
        check_range("solar_flux", solar_flux, 0.0, 1000.0)?;
        check_range("a_index", a_index, 0.0, 400.0)?;
        check_range("k_index", k_index, 0.0, 9.0)?;
        check_non_empty("source", source)?;

        Ok(Self {
            solar_flux,
            a_index,
            k_index,
            sunspot_number,
            timestamp,
            source: source.to_string(),
        })
    }

    pub fn solar_flux(&self) -> f64 {
        self.solar_flux
    }

    pub fn a_index(&self) -> f64 {
        self.a_index
    }

    pub fn k_index(&self) -> f64 {
        self.k_index
    }

    pub fn sunspot_number(&self) -> Option<u32> {
        self.sunspot_number
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn geomagnetic_activity(&self) -> GeomagneticActivity {
        GeomagneticActivity::from_k_index(self.k_index)
    }

    pub fn solar_flux_level(&self) -> SolarFluxLevel {
        SolarFluxLevel::from_flux(self.solar_flux)
    }
}

impl Scoreable for SolarIndices {
    fn score_at(&self, _now: DateTime<Utc>) -> u8 {
        let flux = ((self.solar_flux - FLUX_FLOOR) / (FLUX_CEILING - FLUX_FLOOR)).clamp(0.0, 1.0);
        let quiet = (1.0 - self.k_index / 9.0).clamp(0.0, 1.0);
        let calm = (1.0 - self.a_index / A_INDEX_CEILING).clamp(0.0, 1.0);

        truncate_score(flux * FLUX_WEIGHT + quiet * K_WEIGHT + calm * A_WEIGHT)
    }

    fn is_favorable_at(&self, _now: DateTime<Utc>) -> bool {
        self.solar_flux > 100.0 && self.k_index < 4.0 && self.a_index < 20.0
    }
}
