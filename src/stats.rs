//! Building the `StatsSnapshot`.
//!
//! A snapshot comes from the record store plus the live session counters, or
//! from a remote backend summary. Both share the `SummaryTotals` shape, so the
//! dashboard and the achievement engine do not care which one they got.

use std::collections::HashSet;

use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::achievements::UnlockRecord;
use crate::domain::StatsSnapshot;
use crate::progress::{activity_records, bookmarks};
use crate::session::SessionCounters;
use crate::store::RecordStore;
use crate::streak::{activity_days, current_streak, longest_streak};
use crate::xp::total_xp;

/// The headline numbers, in the snake_case shape the backend API uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryTotals {
    pub total_xp: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
}

/// Response of the backend achievement/progress API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    #[serde(default)]
    pub summary: SummaryTotals,
    #[serde(default)]
    pub user_achievements: Vec<UnlockRecord>,
}

fn percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        0
    } else {
        part * 100 / whole
    }
}

/// Snapshot derived from stored records, with `today` and `tz` deciding the
/// streak calendar. Session counters, when present, fill the quiz fields.
pub fn snapshot_from_store<Tz: TimeZone>(
    store: &dyn RecordStore,
    counters: Option<&SessionCounters>,
    today: NaiveDate,
    tz: &Tz,
) -> StatsSnapshot {
    let records = activity_records(store, None);
    let days = activity_days(&records, tz);
    let completed: Vec<_> = records.iter().filter(|r| r.completed).collect();

    let dotpoints: HashSet<(&str, u32, &str)> = completed
        .iter()
        .map(|r| (r.subject_key.as_str(), r.module_number, r.dotpoint_id.as_str()))
        .collect();
    let subjects: HashSet<&str> = records.iter().map(|r| r.subject_key.as_str()).collect();

    let mut snapshot = StatsSnapshot {
        study_streak: i64::from(current_streak(&days, today).current_streak),
        longest_streak: i64::from(longest_streak(&days)),
        sections_completed: completed.len() as i64,
        dotpoints_completed: dotpoints.len() as i64,
        subjects_studied: subjects.len() as i64,
        total_xp: total_xp(store, None),
        bookmarks: bookmarks(store).len() as i64,
        ..Default::default()
    };

    if let Some(c) = counters {
        snapshot.correct_answers = c.correct_answers;
        snapshot.total_questions = c.total_questions;
        snapshot.accuracy_percent = percent(c.correct_answers, c.total_questions);
        snapshot.fastest_answer_ms = c.fastest_answer_ms;
        snapshot.best_combo = c.best_combo;
        snapshot.perfect_quizzes = c.perfect_quizzes;
        snapshot.bosses_defeated = c.bosses_defeated;
    }
    snapshot
}

impl SummaryTotals {
    pub fn from_snapshot(s: &StatsSnapshot) -> Self {
        Self {
            total_xp: s.total_xp,
            current_streak: s.study_streak,
            longest_streak: s.longest_streak,
        }
    }
}

impl StatsSnapshot {
    /// Overlay server-reported totals. Each total takes the larger of the two
    /// values, so a stale server response never rolls local progress back.
    pub fn merge_summary(&mut self, remote: &SummaryTotals) {
        self.total_xp = self.total_xp.max(remote.total_xp);
        self.study_streak = self.study_streak.max(remote.current_streak);
        self.longest_streak = self.longest_streak.max(remote.longest_streak).max(self.study_streak);
    }
}
