//! NOAA Space Weather Prediction Center
//!
//! Three JSON products make up one reading:
//! - `products/summary/10cm-flux.json`: latest 10.7 cm flux
//! - `products/noaa-planetary-k-index.json`: 3-hourly Kp with running A
//! - `json/solar-cycle/swpc_observed_ssn.json`: daily sunspot number
//!
//! Flux and K-index are required. The sunspot product is optional; if it
//! fails the reading is still produced without a sunspot number.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use propwatch_core::SolarIndices;
use propwatch_fetch::{get_text, FetchContext, FetchError, SourceClient};

use crate::parse::{number, parse_utc};

pub const NOAA_BASE_URL: &str = "https://services.swpc.noaa.gov";
pub const NOAA_LABEL: &str = "NOAA SWPC";

const FLUX_PATH: &str = "/products/summary/10cm-flux.json";
const KINDEX_PATH: &str = "/products/noaa-planetary-k-index.json";
const SUNSPOT_PATH: &str = "/json/solar-cycle/swpc_observed_ssn.json";

/// Solar indices from NOAA SWPC
pub struct NoaaSwpcClient {
    http: Client,
    base_url: String,
}

impl NoaaSwpcClient {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, NOAA_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SourceClient for NoaaSwpcClient {
    type Output = Option<SolarIndices>;

    fn name(&self) -> &str {
        "noaa-swpc"
    }

    fn source_label(&self) -> &str {
        NOAA_LABEL
    }

    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        let limit = ctx.max_response_bytes;
        let (flux_url, kindex_url, sunspot_url) =
            (self.url(FLUX_PATH), self.url(KINDEX_PATH), self.url(SUNSPOT_PATH));

        let (flux, kindex, sunspots) = tokio::join!(
            get_text(&self.http, &flux_url, limit),
            get_text(&self.http, &kindex_url, limit),
            get_text(&self.http, &sunspot_url, limit),
        );

        let flux = parse_flux(&flux?)?;
        let kp = parse_kindex(&kindex?)?;
        let sunspot_number = match sunspots {
            Ok(body) => parse_sunspots(&body),
            Err(e) => {
                debug!("NOAA sunspot product unavailable: {}", e);
                None
            }
        };

        let timestamp = flux.timestamp.max(kp.timestamp);
        let indices = SolarIndices::new(
            flux.value,
            kp.a_index,
            kp.k_index,
            sunspot_number,
            timestamp,
            NOAA_LABEL,
        )?;

        Ok(Some(indices))
    }

    fn default_value(&self) -> Self::Output {
        None
    }
}

#[derive(Debug, PartialEq)]
struct FluxReading {
    value: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
struct KpReading {
    k_index: f64,
    a_index: f64,
    timestamp: DateTime<Utc>,
}

fn parse_flux(body: &str) -> Result<FluxReading, FetchError> {
    let doc: Value = serde_json::from_str(body)?;

    let value = doc
        .get("Flux")
        .and_then(number)
        .ok_or_else(|| FetchError::validation("10cm-flux: missing Flux"))?;
    let timestamp = doc
        .get("TimeStamp")
        .and_then(Value::as_str)
        .and_then(parse_utc)
        .ok_or_else(|| FetchError::validation("10cm-flux: missing or bad TimeStamp"))?;

    Ok(FluxReading { value, timestamp })
}

/// Newest row of the planetary K-index product.
///
/// The product has shipped both as an array of arrays with a header row
/// and as an array of objects; both are accepted.
fn parse_kindex(body: &str) -> Result<KpReading, FetchError> {
    let doc: Value = serde_json::from_str(body)?;
    let rows = doc
        .as_array()
        .ok_or_else(|| FetchError::validation("k-index: expected an array"))?;

    let readings = rows.iter().filter_map(|row| match row {
        Value::Array(cols) => Some(KpReading {
            timestamp: cols.first().and_then(Value::as_str).and_then(parse_utc)?,
            k_index: cols.get(1).and_then(number)?,
            a_index: cols.get(2).and_then(number)?,
        }),
        Value::Object(fields) => Some(KpReading {
            timestamp: fields.get("time_tag").and_then(Value::as_str).and_then(parse_utc)?,
            k_index: fields.get("Kp").or_else(|| fields.get("kp_index")).and_then(number)?,
            a_index: fields.get("a_running").and_then(number)?,
        }),
        _ => None,
    });

    readings
        .max_by_key(|r| r.timestamp)
        .ok_or_else(|| FetchError::validation("k-index: no usable rows"))
}

fn parse_sunspots(body: &str) -> Option<u32> {
    let doc: Value = serde_json::from_str(body).ok()?;

    doc.as_array()?
        .iter()
        .filter_map(|row| {
            let date = row.get("Obsdate").and_then(Value::as_str).and_then(parse_utc)?;
            let ssn = row.get("swpc_ssn").and_then(number)?;
            Some((date, ssn))
        })
        .max_by_key(|(date, _)| *date)
        .filter(|(_, ssn)| *ssn >= 0.0)
        .map(|(_, ssn)| ssn.round() as u32)
}
