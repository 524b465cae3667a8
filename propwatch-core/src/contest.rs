//! Radio contests

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::decay::{hours, piecewise_linear, truncate_score};
use crate::error::{check_non_empty, ValidationError};
use crate::{Scoreable, MAX_SCORE};

/// Upcoming score knots over lead time in hours
const LEAD_DECAY: &[(f64, f64)] = &[(0.0, 90.0), (24.0, 50.0), (168.0, 10.0)];

/// Score for contests more than a week out
const DISTANT_SCORE: u8 = 5;

/// Lead time within which an upcoming contest is favorable
const FAVORABLE_LEAD_HOURS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    Upcoming,
    Running,
    Ended,
}

impl fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Upcoming => "UPCOMING",
            Self::Running => "RUNNING",
            Self::Ended => "ENDED",
        };
        f.pad(label)
    }
}

/// A scheduled operating event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contest {
    name: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    info_url: Option<String>,
}

impl Contest {
    pub fn new(
        name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        info_url: Option<String>,
    ) -> Result<Self, ValidationError> {
        check_non_empty("name", name)?;
        if end <= start {
            return Err(ValidationError::InvalidWindow(format!(
                "{}: ends {} before it starts {}",
                name, end, start
            )));
        }

        Ok(Self {
            name: name.trim().to_string(),
            start,
            end,
            info_url,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn info_url(&self) -> Option<&str> {
        self.info_url.as_deref()
    }

    pub fn status(&self, now: DateTime<Utc>) -> ContestStatus {
        if now < self.start {
            ContestStatus::Upcoming
        } else if now >= self.end {
            ContestStatus::Ended
        } else {
            ContestStatus::Running
        }
    }

    pub fn time_to_start(&self, now: DateTime<Utc>) -> Duration {
        self.start - now
    }
}

impl Scoreable for Contest {
    fn score_at(&self, now: DateTime<Utc>) -> u8 {
        match self.status(now) {
            ContestStatus::Ended => 0,
            ContestStatus::Running => MAX_SCORE,
            ContestStatus::Upcoming => {
                let lead = hours(self.time_to_start(now));
                match LEAD_DECAY.last() {
                    Some(&(last, _)) if lead > last => DISTANT_SCORE,
                    _ => truncate_score(piecewise_linear(LEAD_DECAY, lead)),
                }
            }
        }
    }

    fn is_favorable_at(&self, now: DateTime<Utc>) -> bool {
        match self.status(now) {
            ContestStatus::Running => true,
            ContestStatus::Upcoming => {
                self.time_to_start(now) <= Duration::hours(FAVORABLE_LEAD_HOURS)
            }
            ContestStatus::Ended => false,
        }
    }
}
