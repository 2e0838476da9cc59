//! Domain models: the content tree, progress records, bookmarks and visits,
//! and the typed stats snapshot the achievement engine reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -------- Content tree (read-only config input) --------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub key: String,
  pub name: String,
  #[serde(default)] pub modules: Vec<Module>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  pub number: u32,
  pub name: String,
  #[serde(default, alias = "inquiry_questions")] pub inquiry_questions: Vec<InquiryQuestion>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InquiryQuestion {
  pub title: String,
  #[serde(default)] pub dotpoints: Vec<Dotpoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dotpoint {
  pub id: String,
  pub title: String,
  /// Dotpoints without written content are not searchable.
  #[serde(default, alias = "has_content")] pub has_content: bool,
}

// -------- Persisted records --------

/// One completed learning section (or answered question). Superseded, never merged,
/// by a later write for the same `(subject, module, dotpoint, section)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
  pub subject_key: String,
  pub module_number: u32,
  pub dotpoint_id: String,
  pub section_id: String,
  pub completed: bool,
  #[serde(default)] pub xp_awarded: i64,
  pub occurred_at: DateTime<Utc>,
}

/// Identity shared by bookmarks and recent visits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DotpointRef {
  pub subject_key: String,
  pub module_number: u32,
  pub dotpoint_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
  #[serde(flatten)] pub target: DotpointRef,
  pub title: String,
  pub subject_name: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentVisit {
  #[serde(flatten)] pub target: DotpointRef,
  pub title: String,
  pub subject_name: String,
  pub visited_at: DateTime<Utc>,
}

// -------- Derived stats --------

/// Aggregate the achievement catalog is evaluated against. Recomputed on demand,
/// never stored. Every field defaults to zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StatsSnapshot {
  pub correct_answers: i64,
  pub total_questions: i64,
  pub accuracy_percent: i64,
  pub study_streak: i64,
  pub longest_streak: i64,
  /// Zero until a timed answer has been recorded.
  pub fastest_answer_ms: i64,
  pub best_combo: i64,
  pub perfect_quizzes: i64,
  pub bosses_defeated: i64,
  pub sections_completed: i64,
  pub dotpoints_completed: i64,
  pub subjects_studied: i64,
  pub total_xp: i64,
  pub bookmarks: i64,
}
