//! Achievement catalog and unlock evaluation.
//!
//! A catalog entry is plain data: a list of `(field, op, value)` conditions over
//! the `StatsSnapshot`, all of which must hold. One interpreter evaluates every
//! entry, so catalogs can be loaded from TOML and tested without the server.
//!
//! Unlocks are one-way. Once an id is in the ledger it is never evaluated again,
//! even if the stat that earned it later drops.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::domain::StatsSnapshot;
use crate::store::{keys, RecordStore, StoreExt};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Learning,
  Quiz,
  Streak,
  Speed,
  Mastery,
  Exploration,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
  #[default]
  Common,
  Rare,
  Epic,
  Legendary,
}

/// Snapshot field a condition reads.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
  CorrectAnswers,
  TotalQuestions,
  AccuracyPercent,
  StudyStreak,
  LongestStreak,
  FastestAnswerMs,
  BestCombo,
  PerfectQuizzes,
  BossesDefeated,
  SectionsCompleted,
  DotpointsCompleted,
  SubjectsStudied,
  TotalXp,
  Bookmarks,
}

impl StatField {
  /// Value of this field, or `None` while it is still unset.
  /// Only `fastest_answer_ms` has an unset state (zero), since an upper bound
  /// on it must not hold before any answer was timed.
  pub fn read(self, s: &StatsSnapshot) -> Option<i64> {
    let v = match self {
      StatField::CorrectAnswers => s.correct_answers,
      StatField::TotalQuestions => s.total_questions,
      StatField::AccuracyPercent => s.accuracy_percent,
      StatField::StudyStreak => s.study_streak,
      StatField::LongestStreak => s.longest_streak,
      StatField::FastestAnswerMs => return (s.fastest_answer_ms > 0).then_some(s.fastest_answer_ms),
      StatField::BestCombo => s.best_combo,
      StatField::PerfectQuizzes => s.perfect_quizzes,
      StatField::BossesDefeated => s.bosses_defeated,
      StatField::SectionsCompleted => s.sections_completed,
      StatField::DotpointsCompleted => s.dotpoints_completed,
      StatField::SubjectsStudied => s.subjects_studied,
      StatField::TotalXp => s.total_xp,
      StatField::Bookmarks => s.bookmarks,
    };
    Some(v)
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
  AtLeast,
  AtMost,
  Equals,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
  pub field: StatField,
  pub op: Comparison,
  pub value: i64,
}

impl Condition {
  pub fn holds(&self, snapshot: &StatsSnapshot) -> bool {
    let Some(actual) = self.field.read(snapshot) else { return false };
    match self.op {
      Comparison::AtLeast => actual >= self.value,
      Comparison::AtMost => actual <= self.value,
      Comparison::Equals => actual == self.value,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
  pub id: String,
  pub name: String,
  #[serde(default)] pub description: String,
  pub category: Category,
  #[serde(alias = "xp_reward")] pub xp_reward: i64,
  #[serde(default)] pub rarity: Rarity,
  pub conditions: Vec<Condition>,
}

impl AchievementDef {
  /// An entry with no conditions never unlocks.
  pub fn is_met(&self, snapshot: &StatsSnapshot) -> bool {
    !self.conditions.is_empty() && self.conditions.iter().all(|c| c.holds(snapshot))
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRecord {
  pub achievement_id: String,
  pub unlocked_at: DateTime<Utc>,
}

/// Drop entries whose id repeats an earlier one, keeping declaration order.
pub fn dedup_catalog(catalog: Vec<AchievementDef>) -> Vec<AchievementDef> {
  let mut seen = HashSet::new();
  catalog
    .into_iter()
    .filter(|a| {
      let fresh = seen.insert(a.id.clone());
      if !fresh {
        error!(target: "achievements", id = %a.id, "Skipping duplicate achievement id in catalog");
      }
      fresh
    })
    .collect()
}

/// Entries not yet unlocked whose conditions hold, in catalog order, stamped `now`.
pub fn evaluate(
  catalog: &[AchievementDef],
  snapshot: &StatsSnapshot,
  unlocked: &HashSet<String>,
  now: DateTime<Utc>,
) -> Vec<UnlockRecord> {
  catalog
    .iter()
    .filter(|a| !unlocked.contains(&a.id))
    .filter(|a| a.is_met(snapshot))
    .map(|a| UnlockRecord { achievement_id: a.id.clone(), unlocked_at: now })
    .collect()
}

/// Sum of `xp_reward` over catalog entries present in `unlocked`.
pub fn achievement_xp<'a, I>(catalog: &[AchievementDef], unlocked: I) -> i64
where
  I: IntoIterator<Item = &'a UnlockRecord>,
{
  let ids: HashSet<&str> = unlocked.into_iter().map(|u| u.achievement_id.as_str()).collect();
  catalog
    .iter()
    .filter(|a| ids.contains(a.id.as_str()))
    .map(|a| a.xp_reward)
    .fold(0i64, i64::saturating_add)
}

/// Persisted set of unlock records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AchievementLedger {
  records: Vec<UnlockRecord>,
}

impl AchievementLedger {
  pub fn load(store: &dyn RecordStore) -> Self {
    let records = store
      .get_json::<Vec<UnlockRecord>>(keys::UNLOCKED_ACHIEVEMENTS)
      .unwrap_or_default();
    Self { records }
  }

  pub fn records(&self) -> &[UnlockRecord] {
    &self.records
  }

  pub fn ids(&self) -> HashSet<String> {
    self.records.iter().map(|r| r.achievement_id.clone()).collect()
  }

  pub fn is_unlocked(&self, id: &str) -> bool {
    self.records.iter().any(|r| r.achievement_id == id)
  }

  /// Evaluate the catalog, append new unlocks and persist them.
  /// The returned list is what the UI should celebrate; it is empty on a re-run
  /// with unchanged stats.
  #[instrument(level = "debug", skip_all)]
  pub fn evaluate_and_record(
    &mut self,
    store: &mut dyn RecordStore,
    catalog: &[AchievementDef],
    snapshot: &StatsSnapshot,
    now: DateTime<Utc>,
  ) -> Vec<UnlockRecord> {
    let fresh = evaluate(catalog, snapshot, &self.ids(), now);
    if fresh.is_empty() {
      return fresh;
    }
    for u in &fresh {
      info!(target: "achievements", id = %u.achievement_id, "Achievement unlocked");
    }
    self.records.extend(fresh.iter().cloned());
    self.persist(store);
    fresh
  }

  /// Fold in unlocks reported by a remote backend. Existing ids keep the earlier
  /// of the two timestamps. Returns how many ids were new.
  pub fn merge_remote(&mut self, store: &mut dyn RecordStore, remote: &[UnlockRecord]) -> usize {
    let mut added = 0;
    let mut changed = false;
    for r in remote {
      match self.records.iter_mut().find(|l| l.achievement_id == r.achievement_id) {
        Some(local) => {
          if r.unlocked_at < local.unlocked_at {
            local.unlocked_at = r.unlocked_at;
            changed = true;
          }
        }
        None => {
          self.records.push(r.clone());
          added += 1;
          changed = true;
        }
      }
    }
    if changed {
      self.persist(store);
    }
    added
  }

  /// Unlocks are best-effort persisted; the in-memory ledger stays authoritative
  /// for this process either way.
  fn persist(&self, store: &mut dyn RecordStore) {
    if let Err(e) = store.put_json(keys::UNLOCKED_ACHIEVEMENTS, &self.records) {
      warn!(target: "achievements", error = %e, "Failed to persist unlocked achievements");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::default_catalog;
  use crate::store::MemoryStore;
  use chrono::TimeZone;

  fn at(h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
  }

  fn def(id: &str, field: StatField, op: Comparison, value: i64, xp: i64) -> AchievementDef {
    AchievementDef {
      id: id.into(),
      name: id.into(),
      description: String::new(),
      category: Category::Learning,
      xp_reward: xp,
      rarity: Rarity::Common,
      conditions: vec![Condition { field, op, value }],
    }
  }

  fn small_catalog() -> Vec<AchievementDef> {
    vec![
      def("first_answer", StatField::CorrectAnswers, Comparison::AtLeast, 1, 10),
      def("ten_answers", StatField::CorrectAnswers, Comparison::AtLeast, 10, 50),
      def("quick", StatField::FastestAnswerMs, Comparison::AtMost, 3000, 25),
    ]
  }

  #[test]
  fn test_evaluate_preserves_catalog_order() {
    let snapshot = StatsSnapshot { correct_answers: 12, fastest_answer_ms: 2000, ..Default::default() };
    let out = evaluate(&small_catalog(), &snapshot, &HashSet::new(), at(9));
    let ids: Vec<_> = out.iter().map(|u| u.achievement_id.as_str()).collect();
    assert_eq!(ids, vec!["first_answer", "ten_answers", "quick"]);
    assert!(out.iter().all(|u| u.unlocked_at == at(9)));
  }

  #[test]
  fn test_unset_fastest_answer_does_not_unlock_speed() {
    let snapshot = StatsSnapshot { correct_answers: 1, ..Default::default() };
    let out = evaluate(&small_catalog(), &snapshot, &HashSet::new(), at(9));
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].achievement_id, "first_answer");
  }

  #[test]
  fn test_all_conditions_must_hold() {
    let mut a = def("sharp", StatField::AccuracyPercent, Comparison::AtLeast, 90, 40);
    a.conditions.push(Condition { field: StatField::TotalQuestions, op: Comparison::AtLeast, value: 20 });

    let few = StatsSnapshot { accuracy_percent: 100, total_questions: 3, ..Default::default() };
    let many = StatsSnapshot { accuracy_percent: 95, total_questions: 20, ..Default::default() };
    assert!(!a.is_met(&few));
    assert!(a.is_met(&many));

    let empty = AchievementDef { conditions: vec![], ..a };
    assert!(!empty.is_met(&many));
  }

  #[test]
  fn test_no_double_unlock() {
    let mut store = MemoryStore::new();
    let mut ledger = AchievementLedger::load(&store);
    let catalog = small_catalog();
    let snapshot = StatsSnapshot { correct_answers: 1, ..Default::default() };

    let first = ledger.evaluate_and_record(&mut store, &catalog, &snapshot, at(9));
    let second = ledger.evaluate_and_record(&mut store, &catalog, &snapshot, at(10));
    assert_eq!(first.len() + second.len(), 1);
    assert!(second.is_empty());

    // a fresh ledger reads the persisted set back
    let reloaded = AchievementLedger::load(&store);
    assert!(reloaded.is_unlocked("first_answer"));
    assert_eq!(reloaded.records()[0].unlocked_at, at(9));
  }

  #[test]
  fn test_unlocks_are_monotone() {
    let mut store = MemoryStore::new();
    let mut ledger = AchievementLedger::default();
    let catalog = default_catalog();

    let mut previous = 0;
    for step in 0..30 {
      let snapshot = StatsSnapshot {
        correct_answers: step * 2,
        total_questions: step * 2,
        accuracy_percent: 100,
        sections_completed: step,
        study_streak: step / 3,
        longest_streak: step / 3,
        total_xp: step * 40,
        ..Default::default()
      };
      ledger.evaluate_and_record(&mut store, &catalog, &snapshot, at(1));
      assert!(ledger.records().len() >= previous);
      previous = ledger.records().len();
    }

    // stats dropping back to zero never revokes anything
    ledger.evaluate_and_record(&mut store, &catalog, &StatsSnapshot::default(), at(2));
    assert_eq!(ledger.records().len(), previous);
  }

  #[test]
  fn test_achievement_xp_counts_only_catalog_entries() {
    let catalog = small_catalog();
    let unlocked = vec![
      UnlockRecord { achievement_id: "first_answer".into(), unlocked_at: at(1) },
      UnlockRecord { achievement_id: "quick".into(), unlocked_at: at(1) },
      UnlockRecord { achievement_id: "retired".into(), unlocked_at: at(1) },
    ];
    assert_eq!(achievement_xp(&catalog, &unlocked), 35);
  }

  #[test]
  fn test_achievement_xp_saturates() {
    let catalog = vec![
      def("big", StatField::CorrectAnswers, Comparison::AtLeast, 1, i64::MAX),
      def("bigger", StatField::CorrectAnswers, Comparison::AtLeast, 2, i64::MAX),
    ];
    let unlocked = vec![
      UnlockRecord { achievement_id: "big".into(), unlocked_at: at(1) },
      UnlockRecord { achievement_id: "bigger".into(), unlocked_at: at(1) },
    ];
    assert_eq!(achievement_xp(&catalog, &unlocked), i64::MAX);
  }

  #[test]
  fn test_merge_remote_keeps_earliest_and_counts_new() {
    let mut store = MemoryStore::new();
    let mut ledger = AchievementLedger::default();
    let snapshot = StatsSnapshot { correct_answers: 1, ..Default::default() };
    ledger.evaluate_and_record(&mut store, &small_catalog(), &snapshot, at(10));

    let remote = vec![
      UnlockRecord { achievement_id: "first_answer".into(), unlocked_at: at(8) },
      UnlockRecord { achievement_id: "ten_answers".into(), unlocked_at: at(9) },
    ];
    assert_eq!(ledger.merge_remote(&mut store, &remote), 1);
    assert_eq!(ledger.records()[0].unlocked_at, at(8));
    assert_eq!(ledger.merge_remote(&mut store, &remote), 0);
    assert_eq!(AchievementLedger::load(&store).records().len(), 2);
  }

  #[test]
  fn test_dedup_catalog_keeps_first() {
    let mut catalog = small_catalog();
    catalog.push(def("quick", StatField::BestCombo, Comparison::AtLeast, 5, 999));
    let deduped = dedup_catalog(catalog);
    assert_eq!(deduped.len(), 3);
    assert_eq!(deduped[2].xp_reward, 25);
  }

  #[test]
  fn test_quota_failure_keeps_in_memory_unlocks() {
    let mut store = MemoryStore::with_quota(8);
    let mut ledger = AchievementLedger::default();
    let snapshot = StatsSnapshot { correct_answers: 1, ..Default::default() };

    let out = ledger.evaluate_and_record(&mut store, &small_catalog(), &snapshot, at(1));
    assert_eq!(out.len(), 1);
    assert!(ledger.is_unlocked("first_answer"));
    assert!(store.is_empty());
  }

  #[test]
  fn test_catalog_parses_from_toml() {
    #[derive(Deserialize)]
    struct Doc { achievements: Vec<AchievementDef> }

    let doc: Doc = toml::from_str(r#"
      [[achievements]]
      id = "bookworm"
      name = "Bookworm"
      category = "exploration"
      xp_reward = 15
      rarity = "rare"
      conditions = [{ field = "bookmarks", op = "at_least", value = 5 }]
    "#).unwrap();
    let a = &doc.achievements[0];
    assert_eq!(a.rarity, Rarity::Rare);
    assert!(a.is_met(&StatsSnapshot { bookmarks: 5, ..Default::default() }));
  }
}
