//! propwatch Runtime
//!
//! Wires the source adapters into resilient pipelines and keeps them
//! current:
//! - [`AppConfig`]: TOML configuration with defaults for every field
//! - [`PropagationHub`]: one pipeline per enabled source, periodic refresh
//! - [`Dashboard`]: merged, ranked read-side view over the cache slots

pub mod config;
pub mod dashboard;
pub mod hub;

pub use config::*;
pub use dashboard::*;
pub use hub::*;
