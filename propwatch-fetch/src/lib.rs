//! propwatch Fetch Layer
//!
//! Provides the resilient fetch pipeline every external source runs behind:
//! - Per-attempt timeout and bounded retry with backoff
//! - Per-source circuit breaker
//! - Swap-on-write cache slots with stale/degraded fallback
//! - Freshness bookkeeping against each source's refresh interval
//! - HTTP helpers with response size limits

pub mod error;
pub mod freshness;
pub mod breaker;
pub mod retry;
pub mod slot;
pub mod pipeline;
pub mod http;

pub use error::*;
pub use freshness::*;
pub use breaker::*;
pub use retry::*;
pub use slot::*;
pub use pipeline::*;
pub use http::*;
