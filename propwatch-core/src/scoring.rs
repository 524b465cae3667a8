//! Time-decay scoring contract
//!
//! Every displayable entity converts its stored fields plus the current
//! instant into a bounded priority score and a favorability verdict.
//! Both are pure: the same entity evaluated at the same instant always
//! yields the same answer.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Capability shared by all displayable entities
pub trait Scoreable {
    /// Priority in [0, 100] at `now`
    fn score_at(&self, now: DateTime<Utc>) -> u8;

    /// Whether the condition is worth highlighting at `now`
    fn is_favorable_at(&self, now: DateTime<Utc>) -> bool;

    fn score(&self) -> u8 {
        self.score_at(Utc::now())
    }

    fn is_favorable(&self) -> bool {
        self.is_favorable_at(Utc::now())
    }
}

/// An entity paired with its verdict at ranking time
#[derive(Debug, Clone, Serialize)]
pub struct Ranked<T> {
    pub score: u8,
    pub favorable: bool,
    #[serde(flatten)]
    pub item: T,
}

impl<T: Scoreable> Ranked<T> {
    pub fn new(item: T, now: DateTime<Utc>) -> Self {
        Self {
            score: item.score_at(now),
            favorable: item.is_favorable_at(now),
            item,
        }
    }
}

/// Score every item at `now` and sort by descending score.
///
/// The sort is stable, so equal scores keep their input order.
pub fn rank_by_score<T, I>(items: I, now: DateTime<Utc>) -> Vec<Ranked<T>>
where
    T: Scoreable,
    I: IntoIterator<Item = T>,
{
    let mut ranked: Vec<_> = items.into_iter().map(|item| Ranked::new(item, now)).collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}
