//! propwatch Sources
//!
//! One adapter per external feed, each implementing
//! [`propwatch_fetch::SourceClient`]:
//! - **NOAA SWPC**: solar flux, planetary K/A-index, sunspot number
//! - **HamQSL**: solar indices plus calculated HF band conditions
//! - **POTA** / **SOTA**: live activation spots
//! - **Contest calendar**: WA7BNM RSS of upcoming contests
//! - **Meteor calendar**: built-in annual shower table
//!
//! Adapters only know their wire format; timeout, retry, breaker and
//! fallback come from the pipeline they run behind.

pub mod parse;
pub mod noaa;
pub mod hamqsl;
pub mod pota;
pub mod sota;
pub mod contests;
pub mod meteors;

pub use noaa::*;
pub use hamqsl::*;
pub use pota::*;
pub use sota::*;
pub use contests::*;
pub use meteors::*;
