//! Summits on the Air spot feed
//!
//! SOTAwatch reports frequency in MHz and describes the summit in one
//! free-text field ("Mount Si, 1270m, 4 Points"); both are normalised here.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use propwatch_core::{Activation, ActivationLocation};
use propwatch_fetch::{get_json, FetchContext, FetchError, SourceClient};

use crate::parse::{number, parse_utc};

pub const SOTA_URL: &str = "https://api2.sota.org.uk/api/spots/-1/all";
pub const SOTA_LABEL: &str = "SOTA";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SotaSpot {
    #[serde(default)]
    time_stamp: Option<String>,
    #[serde(default)]
    activator_callsign: Option<String>,
    #[serde(default)]
    association_code: Option<String>,
    #[serde(default)]
    summit_code: Option<String>,
    #[serde(default)]
    summit_details: Option<String>,
    #[serde(default)]
    frequency: Value,
    #[serde(default)]
    mode: Option<String>,
}

/// Live summit activations
pub struct SotaClient {
    http: Client,
    url: String,
}

impl SotaClient {
    pub fn new(http: Client) -> Self {
        Self::with_url(http, SOTA_URL)
    }

    pub fn with_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SourceClient for SotaClient {
    type Output = Vec<Activation>;

    fn name(&self) -> &str {
        "sota"
    }

    fn source_label(&self) -> &str {
        SOTA_LABEL
    }

    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        let spots: Vec<SotaSpot> = get_json(&self.http, &self.url, ctx.max_response_bytes).await?;
        Ok(convert_spots(spots, Utc::now()))
    }

    fn default_value(&self) -> Self::Output {
        Vec::new()
    }
}

static POINTS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*points?").unwrap());

/// Summit name and activation points from the details field
fn split_details(details: &str) -> (String, Option<u32>) {
    let name = details.split(',').next().unwrap_or_default().trim().to_string();
    let points = POINTS_REGEX
        .captures(details)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());
    (name, points)
}

fn convert_spots(spots: Vec<SotaSpot>, observed_at: DateTime<Utc>) -> Vec<Activation> {
    spots
        .into_iter()
        .filter_map(|spot| match convert_spot(spot, observed_at) {
            Ok(activation) => Some(activation),
            Err(e) => {
                debug!("Dropping SOTA spot: {}", e);
                None
            }
        })
        .collect()
}

fn convert_spot(spot: SotaSpot, observed_at: DateTime<Utc>) -> Result<Activation, FetchError> {
    let callsign = spot
        .activator_callsign
        .ok_or_else(|| FetchError::validation("missing activator callsign"))?;
    let (association, summit) = match (spot.association_code, spot.summit_code) {
        (Some(a), Some(s)) if !a.trim().is_empty() && !s.trim().is_empty() => (a, s),
        _ => return Err(FetchError::validation(format!("{}: missing summit reference", callsign))),
    };
    let frequency_mhz = number(&spot.frequency)
        .ok_or_else(|| FetchError::validation(format!("{}: unreadable frequency", callsign)))?;

    let (name, points) = spot
        .summit_details
        .as_deref()
        .map(split_details)
        .unwrap_or_default();
    let reference = format!(
        "{}/{}",
        association.trim().to_ascii_uppercase(),
        summit.trim().to_ascii_uppercase()
    );

    let activation = Activation::builder(
        &callsign,
        ActivationLocation::Summit { reference, name, points },
    )
    .frequency_khz(frequency_mhz * 1000.0)
    .mode(spot.mode.as_deref().unwrap_or_default())
    .spotted_at(spot.time_stamp.as_deref().and_then(parse_utc))
    .last_seen_at(observed_at)
    .build()?;

    Ok(activation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use propwatch_core::ActivationKind;

    const SAMPLE: &str = r#"[
        {"id":901,"userID":42,"timeStamp":"2026-10-18T20:10:00","comments":"QRV now","callsign":"W7SPOT",
         "associationCode":"W7W","summitCode":"KG-001","activatorCallsign":"k7xyz/p","activatorName":"Sam",
         "frequency":"14.062","mode":"cw","summitDetails":"Mount Si, 1270m, 4 Points","highlightColor":null},
        {"id":902,"timeStamp":"2026-10-18T19:40:00","associationCode":"G","summitCode":"LD-001",
         "activatorCallsign":"M0ABC","frequency":"7.032","mode":"CW","summitDetails":"Scafell Pike, 978m, 10 Points"},
        {"id":903,"timeStamp":"2026-10-18T19:00:00","associationCode":"G","summitCode":"LD-002",
         "activatorCallsign":"M0DEF","frequency":"QRT","mode":"CW"}
    ]"#;

    fn observed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 20, 12, 0).unwrap()
    }

    #[test]
    fn test_convert_sample() {
        let spots: Vec<SotaSpot> = serde_json::from_str(SAMPLE).unwrap();
        let activations = convert_spots(spots, observed_at());
        assert_eq!(activations.len(), 2);

        let first = &activations[0];
        assert_eq!(first.callsign(), "K7XYZ/P");
        assert_eq!(first.kind(), ActivationKind::Sota);
        assert!((first.frequency_khz() - 14062.0).abs() < 1e-6);
        assert_eq!(first.location().reference(), "W7W/KG-001");
        assert_eq!(first.location().name(), "Mount Si");
        assert_eq!(first.spotted_at(), Some(Utc.with_ymd_and_hms(2026, 10, 18, 20, 10, 0).unwrap()));
        match first.location() {
            ActivationLocation::Summit { points, .. } => assert_eq!(*points, Some(4)),
            other => panic!("unexpected location {:?}", other),
        }
    }

    #[test]
    fn test_split_details() {
        assert_eq!(split_details("Scafell Pike, 978m, 10 Points"), ("Scafell Pike".to_string(), Some(10)));
        assert_eq!(split_details("Hill, 300m, 1 point"), ("Hill".to_string(), Some(1)));
        assert_eq!(split_details("Unnamed"), ("Unnamed".to_string(), None));
    }

    #[test]
    fn test_missing_details() {
        let spot: SotaSpot = serde_json::from_str(
            r#"{"activatorCallsign":"M0ABC","associationCode":"G","summitCode":"LD-001","frequency":7.032}"#,
        )
        .unwrap();
        let activation = convert_spot(spot, observed_at()).unwrap();
        assert_eq!(activation.location().name(), "");
        assert_eq!(activation.spotted_at(), None);
    }

    #[test]
    fn test_null_association_drops_only_that_spot() {
        let body = r#"[
            {"associationCode":"W7W","summitCode":"KG-001","activatorCallsign":"K7XYZ","frequency":"14.062"},
            {"associationCode":null,"summitCode":"LD-001","activatorCallsign":"M0ABC","frequency":"7.032"},
            {"associationCode":"G","summitCode":"LD-002","activatorCallsign":null,"frequency":"7.032"},
            {"associationCode":"G","summitCode":"LD-003","activatorCallsign":"G4XYZ","frequency":"10.118"}
        ]"#;
        let spots: Vec<SotaSpot> = serde_json::from_str(body).unwrap();
        assert_eq!(spots.len(), 4);

        let activations = convert_spots(spots, observed_at());
        let references: Vec<_> = activations.iter().map(|a| a.location().reference()).collect();
        assert_eq!(references, vec!["W7W/KG-001", "G/LD-003"]);
    }
}
