//! Parks on the Air spot feed
//!
//! `GET https://api.pota.app/spot/activator` returns a JSON array of the
//! current activator spots. Individual spots that fail validation are
//! dropped; a body that is not a spot array fails the whole fetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use propwatch_core::{Activation, ActivationLocation};
use propwatch_fetch::{get_json, FetchContext, FetchError, SourceClient};

use crate::parse::{number, parse_utc};

pub const POTA_URL: &str = "https://api.pota.app/spot/activator";
pub const POTA_LABEL: &str = "POTA";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PotaSpot {
    #[serde(default)]
    activator: Option<String>,
    #[serde(default)]
    frequency: Value,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    park_name: Option<String>,
    #[serde(default)]
    spot_time: Option<String>,
    #[serde(default)]
    count: Option<u32>,
}

/// Live park activations
pub struct PotaClient {
    http: Client,
    url: String,
}

impl PotaClient {
    pub fn new(http: Client) -> Self {
        Self::with_url(http, POTA_URL)
    }

    pub fn with_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SourceClient for PotaClient {
    type Output = Vec<Activation>;

    fn name(&self) -> &str {
        "pota"
    }

    fn source_label(&self) -> &str {
        POTA_LABEL
    }

    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        let spots: Vec<PotaSpot> = get_json(&self.http, &self.url, ctx.max_response_bytes).await?;
        Ok(convert_spots(spots, Utc::now()))
    }

    fn default_value(&self) -> Self::Output {
        Vec::new()
    }
}

fn convert_spots(spots: Vec<PotaSpot>, observed_at: DateTime<Utc>) -> Vec<Activation> {
    let total = spots.len();
    let activations: Vec<_> = spots
        .into_iter()
        .filter_map(|spot| match convert_spot(spot, observed_at) {
            Ok(activation) => Some(activation),
            Err(e) => {
                debug!("Dropping POTA spot: {}", e);
                None
            }
        })
        .collect();

    debug!("POTA: {} of {} spots usable", activations.len(), total);
    activations
}

fn convert_spot(spot: PotaSpot, observed_at: DateTime<Utc>) -> Result<Activation, FetchError> {
    let activator = spot
        .activator
        .ok_or_else(|| FetchError::validation("missing activator"))?;
    let reference = spot
        .reference
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| FetchError::validation(format!("{}: missing park reference", activator)))?;
    let frequency_khz = number(&spot.frequency)
        .ok_or_else(|| FetchError::validation(format!("{}: unreadable frequency", activator)))?;

    let name = spot
        .name
        .or(spot.park_name)
        .unwrap_or_default();
    let location = ActivationLocation::Park {
        reference: reference.trim().to_ascii_uppercase(),
        name,
    };

    let activation = Activation::builder(&activator, location)
        .frequency_khz(frequency_khz)
        .mode(spot.mode.as_deref().unwrap_or_default())
        .spotted_at(spot.spot_time.as_deref().and_then(parse_utc))
        .last_seen_at(observed_at)
        .qso_count(spot.count.unwrap_or(0))
        .build()?;

    Ok(activation)
}
