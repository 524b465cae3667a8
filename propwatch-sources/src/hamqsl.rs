//! HamQSL solar XML (N0NBH)
//!
//! One document carries both the solar indices and the calculated HF band
//! conditions (`<calculatedconditions><band name=".." time="day|night">`).
//! The document is parsed with `scraper`; only the tags below are read.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;

use propwatch_core::{BandCondition, BandRating, SolarIndices};
use propwatch_fetch::{get_text, FetchContext, FetchError, SourceClient};

pub const HAMQSL_URL: &str = "https://www.hamqsl.com/solarxml.php";
pub const HAMQSL_LABEL: &str = "HamQSL";

/// HamQSL publishes ratings without a confidence, so every band gets this
pub const HAMQSL_BAND_CONFIDENCE: f64 = 0.8;

/// Everything one HamQSL document yields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationReport {
    pub solar: Option<SolarIndices>,
    pub bands: Vec<BandCondition>,
}

/// Solar indices and band conditions from HamQSL
pub struct HamQslClient {
    http: Client,
    url: String,
}

impl HamQslClient {
    pub fn new(http: Client) -> Self {
        Self::with_url(http, HAMQSL_URL)
    }

    pub fn with_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SourceClient for HamQslClient {
    type Output = PropagationReport;

    fn name(&self) -> &str {
        "hamqsl"
    }

    fn source_label(&self) -> &str {
        HAMQSL_LABEL
    }

    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        let body = get_text(&self.http, &self.url, ctx.max_response_bytes).await?;
        parse_report(&body, Utc::now())
    }

    fn default_value(&self) -> Self::Output {
        PropagationReport::default()
    }
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::validation(format!("bad selector {}: {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_text(document: &Html, tag: &str) -> Result<Option<String>, FetchError> {
    let sel = selector(tag)?;
    Ok(document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty()))
}

fn first_number(document: &Html, tag: &str) -> Result<Option<f64>, FetchError> {
    Ok(first_text(document, tag)?.and_then(|s| s.parse().ok()))
}

/// "18 Oct 2026 1234 GMT"
fn parse_updated(s: &str) -> Option<DateTime<Utc>> {
    let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%d %b %Y %H%M GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a HamQSL document. `fetched_at` stands in for a missing or
/// unreadable `<updated>` stamp.
pub fn parse_report(xml: &str, fetched_at: DateTime<Utc>) -> Result<PropagationReport, FetchError> {
    let document = Html::parse_document(xml);

    let timestamp = first_text(&document, "updated")?
        .and_then(|s| parse_updated(&s))
        .unwrap_or(fetched_at);

    let flux = first_number(&document, "solarflux")?;
    let a_index = first_number(&document, "aindex")?;
    let k_index = first_number(&document, "kindex")?;
    let sunspots = first_number(&document, "sunspots")?
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u32);

    let solar = match (flux, a_index, k_index) {
        (Some(flux), Some(a), Some(k)) => Some(SolarIndices::new(flux, a, k, sunspots, timestamp, HAMQSL_LABEL)?),
        _ => {
            debug!("HamQSL document is missing solar indices");
            None
        }
    };

    let band_sel = selector("calculatedconditions band")?;
    let mut bands = Vec::new();
    for band in document.select(&band_sel) {
        let Some(name) = band.value().attr("name") else {
            continue;
        };
        let rating = BandRating::from_label(&element_text(band));
        let notes = band.value().attr("time").map(|t| t.trim().to_ascii_lowercase());
        bands.push(BandCondition::new(name, rating, HAMQSL_BAND_CONFIDENCE, notes)?);
    }

    if solar.is_none() && bands.is_empty() {
        return Err(FetchError::validation("HamQSL document has neither solar data nor band conditions"));
    }

    Ok(PropagationReport { solar, bands })
}
