//! Consecutive-day study streaks.
//!
//! Everything here is a pure function of a set of calendar days; the caller
//! decides which time zone turns timestamps into days and what "today" is.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, TimeZone};
use serde::Serialize;

use crate::domain::ActivityRecord;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current_streak: u32,
    pub most_recent_date: Option<NaiveDate>,
}

/// Distinct calendar days, in `tz`, on which any activity happened.
pub fn activity_days<'a, Tz, I>(records: I, tz: &Tz) -> BTreeSet<NaiveDate>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a ActivityRecord>,
{
    records
        .into_iter()
        .map(|r| r.occurred_at.with_timezone(tz).date_naive())
        .collect()
}

fn previous_day(d: NaiveDate) -> Option<NaiveDate> {
    d.checked_sub_days(Days::new(1))
}

/// Current streak ending today or yesterday.
///
/// The most recent day must be `today` or the day before, otherwise the streak
/// is broken. From there the walk goes back one day at a time and stops at the
/// first missing day.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakSummary {
    let Some(&latest) = days.iter().next_back() else {
        return StreakSummary::default();
    };

    let alive = latest == today || Some(latest) == previous_day(today);
    if !alive {
        return StreakSummary { current_streak: 0, most_recent_date: Some(latest) };
    }

    let mut streak = 1;
    let mut cursor = latest;
    while let Some(prev) = previous_day(cursor) {
        if !days.contains(&prev) {
            break;
        }
        streak += 1;
        cursor = prev;
    }

    StreakSummary { current_streak: streak, most_recent_date: Some(latest) }
}

/// Longest run of consecutive days anywhere in the set.
pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut last: Option<NaiveDate> = None;

    for &day in days {
        run = match last {
            Some(prev) if previous_day(day) == Some(prev) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        last = Some(day);
    }
    best
}
