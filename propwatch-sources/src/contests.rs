//! WA7BNM contest calendar RSS
//!
//! Each `<item>` carries the contest name, a details link and a schedule
//! in the description, for example:
//! - `1300Z, Oct 18 to 1259Z, Oct 19`
//! - `0200Z-0330Z, Oct 16`
//! - `0100Z-0300Z, Oct 19 and 1900Z-2100Z, Oct 19`
//!
//! The schedule has no year; it is inferred from the fetch time. For a
//! multi-session contest the first session that has not yet ended is used.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use propwatch_core::Contest;
use propwatch_fetch::{get_text, FetchContext, FetchError, SourceClient};

pub const CONTEST_CALENDAR_URL: &str = "https://www.contestcalendar.com/calendar.rss";
pub const CONTEST_CALENDAR_LABEL: &str = "WA7BNM Contest Calendar";

static ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<item>(.*?)</item>").unwrap());

static SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})Z,\s*([A-Za-z]{3})\s+(\d{1,2})\s+to\s+(\d{4})Z,\s*([A-Za-z]{3})\s+(\d{1,2})").unwrap()
});

static SAME_DAY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})Z\s*-\s*(\d{4})Z,\s*([A-Za-z]{3})\s+(\d{1,2})").unwrap());

/// Half a year either side of "now" decides which year a date belongs to
const YEAR_PIVOT_DAYS: i64 = 182;

/// Upcoming and running contests
pub struct ContestCalendarClient {
    http: Client,
    url: String,
}

impl ContestCalendarClient {
    pub fn new(http: Client) -> Self {
        Self::with_url(http, CONTEST_CALENDAR_URL)
    }

    pub fn with_url(http: Client, url: &str) -> Self {
        Self {
            http,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl SourceClient for ContestCalendarClient {
    type Output = Vec<Contest>;

    fn name(&self) -> &str {
        "contests"
    }

    fn source_label(&self) -> &str {
        CONTEST_CALENDAR_LABEL
    }

    async fn do_fetch(&self, ctx: &FetchContext) -> Result<Self::Output, FetchError> {
        let body = get_text(&self.http, &self.url, ctx.max_response_bytes).await?;
        parse_calendar(&body, Utc::now())
    }

    fn default_value(&self) -> Self::Output {
        Vec::new()
    }
}

/// Parse the RSS document relative to `now`
pub fn parse_calendar(rss: &str, now: DateTime<Utc>) -> Result<Vec<Contest>, FetchError> {
    if !rss.contains("<rss") && !rss.contains("<channel") {
        return Err(FetchError::validation("contest calendar: not an RSS document"));
    }

    let mut contests = Vec::new();
    for item in ITEM_REGEX.captures_iter(rss) {
        let body = &item[1];
        let Some(title) = tag_text(body, "title") else {
            continue;
        };
        let description = tag_text(body, "description").unwrap_or_default();

        let Some((start, end)) = parse_schedule(&description, now) else {
            debug!("Unreadable schedule for {}: {:?}", title, description);
            continue;
        };

        match Contest::new(&title, start, end, tag_text(body, "link")) {
            Ok(contest) => contests.push(contest),
            Err(e) => debug!("Dropping contest {}: {}", title, e),
        }
    }

    Ok(contests)
}

fn tag_text(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let len = body[start..].find(&close)?;

    let raw = body[start..start + len].trim();
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(raw);
    let text = unescape(raw.trim());

    (!text.is_empty()).then_some(text)
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// First session in `description` that has not ended by `now`, or the
/// last session if all have ended
fn parse_schedule(description: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let sessions: Vec<_> = description
        .split(" and ")
        .filter_map(|segment| parse_session(segment, now))
        .collect();

    sessions
        .iter()
        .find(|(_, end)| *end > now)
        .or(sessions.last())
        .copied()
}

fn parse_session(segment: &str, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if let Some(caps) = SPAN_REGEX.captures(segment) {
        let start = nearest(now, |year| at(year, &caps[2], &caps[3], &caps[1]))?;
        let end = after(start, |year| at(year, &caps[5], &caps[6], &caps[4]))?;
        return Some((start, end));
    }

    if let Some(caps) = SAME_DAY_REGEX.captures(segment) {
        let start = nearest(now, |year| at(year, &caps[3], &caps[4], &caps[1]))?;
        let end = after(start, |year| at(year, &caps[3], &caps[4], &caps[2]))?;
        return Some((start, end));
    }

    None
}

/// The year placement of a month/day closest to `now`
fn nearest<F>(now: DateTime<Utc>, build: F) -> Option<DateTime<Utc>>
where
    F: Fn(i32) -> Option<DateTime<Utc>>,
{
    let candidate = build(now.year())?;
    let pivot = Duration::days(YEAR_PIVOT_DAYS);

    if candidate < now - pivot {
        build(now.year() + 1)
    } else if candidate > now + pivot {
        build(now.year() - 1)
    } else {
        Some(candidate)
    }
}

/// The first year placement not before `start`, so Dec 31 to Jan 1 works.
/// Zero-length sessions come back equal to `start` and fail `Contest::new`.
fn after<F>(start: DateTime<Utc>, build: F) -> Option<DateTime<Utc>>
where
    F: Fn(i32) -> Option<DateTime<Utc>>,
{
    let same_year = build(start.year())?;
    if same_year >= start {
        return Some(same_year);
    }
    build(start.year() + 1)
}

/// `hhmm` may be "2400", meaning midnight at the end of the day
fn at(year: i32, month: &str, day: &str, hhmm: &str) -> Option<DateTime<Utc>> {
    let month = month_number(month)?;
    let day: u32 = day.parse().ok()?;
    let hour: u32 = hhmm.get(0..2)?.parse().ok()?;
    let minute: u32 = hhmm.get(2..4)?.parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let (date, hour) = if hour == 24 && minute == 0 {
        (date.succ_opt()?, 0)
    } else {
        (date, hour)
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

    Some(date.and_time(time).and_utc())
}

fn month_number(abbrev: &str) -> Option<u32> {
    let month = match abbrev.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
