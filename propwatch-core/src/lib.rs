//! propwatch Core - Entities and time-decay scoring for HF propagation data
//!
//! This crate provides the foundational primitives:
//! - Scoreable entities (activations, band conditions, solar indices,
//!   meteor showers, contests) validated at construction
//! - Decay helpers shared by the per-entity score formulas
//! - Ranking of scored entities for display
//! - Field-level merge of solar indices from independent providers

pub mod error;
pub mod decay;
pub mod scoring;
pub mod activation;
pub mod band;
pub mod solar;
pub mod meteor;
pub mod contest;
pub mod merge;

pub use error::*;
pub use scoring::*;
pub use activation::*;
pub use band::*;
pub use solar::*;
pub use meteor::*;
pub use contest::*;
pub use merge::*;

/// Upper bound of every score
pub const MAX_SCORE: u8 = 100;

/// Data is stale once its age exceeds this multiple of the refresh interval
pub const STALE_FACTOR: u32 = 2;

/// Marker appended to a source label when no real data was ever obtained
pub const DEGRADED_MARKER: &str = "Degraded";
