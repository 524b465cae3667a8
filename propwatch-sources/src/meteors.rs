//! Built-in meteor shower calendar
//!
//! Dates follow the International Meteor Organization working list. The
//! table is annual; [`meteor_calendar`] places it on concrete years around
//! a reference time. Served through the same pipeline as the network
//! sources so freshness and health report uniformly.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use propwatch_core::{MeteorShower, MeteorStatus, ShowerWindow};
use propwatch_fetch::{FetchContext, FetchError, SourceClient};

pub const METEOR_CALENDAR_LABEL: &str = "IMO Calendar";
pub const IMO_CALENDAR_URL: &str = "https://www.imo.net/resources/calendar/";

struct ShowerEntry {
    name: &'static str,
    code: &'static str,
    /// (month, day) of first and last visibility
    visible_from: (u32, u32),
    visible_until: (u32, u32),
    /// (month, day) of maximum activity; the peak window is that UTC day
    peak: (u32, u32),
    zhr: u32,
    parent: &'static str,
}

static SHOWERS: &[ShowerEntry] = &[
    ShowerEntry { name: "Quadrantids", code: "QUA", visible_from: (12, 28), visible_until: (1, 12), peak: (1, 4), zhr: 80, parent: "2003 EH1" },
    ShowerEntry { name: "Lyrids", code: "LYR", visible_from: (4, 14), visible_until: (4, 30), peak: (4, 22), zhr: 18, parent: "C/1861 G1 (Thatcher)" },
    ShowerEntry { name: "eta Aquariids", code: "ETA", visible_from: (4, 19), visible_until: (5, 28), peak: (5, 6), zhr: 50, parent: "1P/Halley" },
    ShowerEntry { name: "Southern delta Aquariids", code: "SDA", visible_from: (7, 12), visible_until: (8, 23), peak: (7, 30), zhr: 25, parent: "96P/Machholz" },
    ShowerEntry { name: "alpha Capricornids", code: "CAP", visible_from: (7, 3), visible_until: (8, 15), peak: (7, 30), zhr: 5, parent: "169P/NEAT" },
    ShowerEntry { name: "Perseids", code: "PER", visible_from: (7, 17), visible_until: (8, 24), peak: (8, 12), zhr: 100, parent: "109P/Swift-Tuttle" },
    ShowerEntry { name: "Draconids", code: "DRA", visible_from: (10, 6), visible_until: (10, 10), peak: (10, 8), zhr: 10, parent: "21P/Giacobini-Zinner" },
    ShowerEntry { name: "Orionids", code: "ORI", visible_from: (10, 2), visible_until: (11, 7), peak: (10, 21), zhr: 20, parent: "1P/Halley" },
    ShowerEntry { name: "Leonids", code: "LEO", visible_from: (11, 6), visible_until: (11, 30), peak: (11, 17), zhr: 15, parent: "55P/Tempel-Tuttle" },
    ShowerEntry { name: "Geminids", code: "GEM", visible_from: (12, 4), visible_until: (12, 20), peak: (12, 14), zhr: 150, parent: "3200 Phaethon" },
    ShowerEntry { name: "Ursids", code: "URS", visible_from: (12, 17), visible_until: (12, 26), peak: (12, 22), zhr: 10, parent: "8P/Tuttle" },
];

fn midnight(year: i32, (month, day): (u32, u32)) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
}

/// The occurrence of `entry` whose peak falls in `year`. Visibility that
/// starts after the peak month belongs to the previous year.
fn occurrence(entry: &ShowerEntry, year: i32) -> Result<MeteorShower, FetchError> {
    let bad_date = || FetchError::validation(format!("{}: bad calendar date", entry.code));

    let from_year = if entry.visible_from > entry.peak { year - 1 } else { year };
    let until_year = if entry.visible_until < entry.peak { year + 1 } else { year };

    let peak_start = midnight(year, entry.peak).ok_or_else(bad_date)?;
    let window = ShowerWindow {
        visibility_start: midnight(from_year, entry.visible_from).ok_or_else(bad_date)?,
        peak_start,
        peak_end: peak_start + Duration::days(1),
        visibility_end: midnight(until_year, entry.visible_until).ok_or_else(bad_date)? + Duration::days(1),
    };

    Ok(MeteorShower::new(
        entry.name,
        entry.code,
        window,
        entry.zhr,
        Some(entry.parent.to_string()),
        Some(IMO_CALENDAR_URL.to_string()),
    )?)
}

/// Showers not yet ended at `now`, ordered by peak
pub fn meteor_calendar(now: DateTime<Utc>) -> Result<Vec<MeteorShower>, FetchError> {
    let mut showers = Vec::new();
    for year in [now.year(), now.year() + 1] {
        for entry in SHOWERS {
            let shower = occurrence(entry, year)?;
            if shower.status(now) != MeteorStatus::Ended {
                showers.push(shower);
            }
        }
    }

    showers.sort_by_key(|s| s.peak_midpoint());
    Ok(showers)
}

/// Meteor showers from the built-in table
#[derive(Debug, Default)]
pub struct MeteorCalendarClient;

impl MeteorCalendarClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SourceClient for MeteorCalendarClient {
    type Output = Vec<MeteorShower>;

    fn name(&self) -> &str {
        "meteors"
    }

    fn source_label(&self) -> &str {
        METEOR_CALENDAR_LABEL
    }

    async fn do_fetch(&self, _ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        meteor_calendar(Utc::now())
    }

    fn default_value(&self) -> Self::Output {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_every_entry_builds() {
        for year in 2024..=2030 {
            for entry in SHOWERS {
                assert!(occurrence(entry, year).is_ok(), "{} {}", entry.code, year);
            }
        }
    }

    #[test]
    fn test_quadrantids_span_new_year() {
        let entry = SHOWERS.iter().find(|e| e.code == "QUA").unwrap();
        let qua = occurrence(entry, 2027).unwrap();

        assert_eq!(qua.window().visibility_start, utc(2026, 12, 28));
        assert_eq!(qua.window().peak_start, utc(2027, 1, 4));
        assert_eq!(qua.window().visibility_end, utc(2027, 1, 13));
        assert_eq!(qua.status(utc(2026, 12, 30)), MeteorStatus::Active);
    }

    #[test]
    fn test_calendar_mid_october() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let showers = meteor_calendar(now).unwrap();

        // Draconids ended on Oct 10
        assert!(showers.iter().all(|s| s.status(now) != MeteorStatus::Ended));
        assert!(!showers.iter().any(|s| s.code() == "DRA" && s.window().peak_start.year() == 2026));

        let first = &showers[0];
        assert_eq!(first.code(), "ORI");
        assert_eq!(first.status(now), MeteorStatus::Active);

        // Next year's table is included
        assert!(showers.iter().any(|s| s.code() == "PER" && s.window().peak_start.year() == 2027));

        let peaks: Vec<_> = showers.iter().map(|s| s.peak_midpoint()).collect();
        assert!(peaks.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_client_fetch() {
        let client = MeteorCalendarClient::new();
        let ctx = FetchContext {
            attempt: 0,
            max_response_bytes: 1024,
        };
        let showers = client.do_fetch(&ctx).await.unwrap();
        assert!(!showers.is_empty());
        assert_eq!(client.source_label(), "IMO Calendar");
        assert!(client.default_value().is_empty());
    }
}
