//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementDef, Category, Rarity, UnlockRecord};
use crate::domain::{ActivityRecord, Bookmark, DotpointRef, RecentVisit};
use crate::search::{SearchEntry, SubjectFilter};
use crate::session::SessionContext;
use crate::stats::SummaryTotals;
use crate::streak::StreakSummary;
use crate::xp::LevelProgress;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    SubmitAnswer(AnswerIn),
    CompleteSection(ActivityIn),
    FinishQuiz(QuizIn),
    Visit(VisitIn),
    Search {
        query: String,
        #[serde(default)]
        subject: SubjectFilter,
    },
    Dashboard,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Progress(ProgressOut),
    Recent {
        recent: Vec<RecentVisit>,
    },
    SearchResults {
        query: String,
        results: Vec<SearchEntry>,
    },
    Dashboard(DashboardOut),
    Error {
        message: String,
    },
}

//
// Requests
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIn {
    pub user_id: String,
}

/// A completed learning section.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityIn {
    pub subject_key: String,
    pub module_number: u32,
    pub dotpoint_id: String,
    pub section_id: String,
    #[serde(default = "default_true")]
    pub completed: bool,
    #[serde(default)]
    pub xp_awarded: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub correct: bool,
    #[serde(default)]
    pub elapsed_ms: Option<i64>,
}

/// A finished quiz or boss battle. The section is stored as progress with the awarded XP.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizIn {
    pub subject_key: String,
    pub module_number: u32,
    pub dotpoint_id: String,
    #[serde(default = "default_quiz_section")]
    pub section_id: String,
    pub correct: u32,
    pub total: u32,
    #[serde(default)]
    pub boss: bool,
    #[serde(default)]
    pub xp_awarded: i64,
}

fn default_quiz_section() -> String {
    "quiz".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkIn {
    #[serde(flatten)]
    pub target: DotpointRef,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitIn {
    #[serde(flatten)]
    pub target: DotpointRef,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct XpQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub subject: SubjectFilter,
}

//
// Responses
//

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedOut {
    pub id: String,
    pub name: String,
    pub xp_reward: i64,
    pub rarity: Rarity,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedOut {
    pub fn new(def: &AchievementDef, record: &UnlockRecord) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            xp_reward: def.xp_reward,
            rarity: def.rarity,
            unlocked_at: record.unlocked_at,
        }
    }
}

/// Reply to anything that can move stats: answers, sections, quizzes, syncs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ActivityRecord>,
    pub newly_unlocked: Vec<UnlockedOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOut {
    pub added: usize,
    pub newly_unlocked: Vec<UnlockedOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakOut {
    #[serde(flatten)]
    pub current: StreakSummary,
    pub longest_streak: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub total_xp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementOut {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub rarity: Rarity,
    pub xp_reward: i64,
    pub unlocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOut {
    /// Same shape as the remote summary, so the UI renders either.
    pub summary: SummaryTotals,
    pub most_recent_study_date: Option<chrono::NaiveDate>,
    pub xp_by_subject: BTreeMap<String, i64>,
    pub level: LevelProgress,
    pub achievements_unlocked: usize,
    pub achievements_total: usize,
    pub achievement_xp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionContext>,
}

#[derive(Serialize)]
pub struct BookmarkToggleOut {
    pub bookmarked: bool,
    pub bookmarks: Vec<Bookmark>,
}

#[derive(Serialize)]
pub struct ReloadOut {
    pub entries: usize,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
