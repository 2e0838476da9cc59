//! Explicit session context: who is studying and the live counters of this sitting.
//!
//! Created on login (or at startup for the local user) and dropped on logout.
//! Nothing reads it through a global; handlers get it from `AppState`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Counters that only exist for the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCounters {
    pub correct_answers: i64,
    pub total_questions: i64,
    /// Zero until the first timed answer.
    pub fastest_answer_ms: i64,
    pub combo: i64,
    pub best_combo: i64,
    pub perfect_quizzes: i64,
    pub bosses_defeated: i64,
}

impl SessionCounters {
    pub fn record_answer(&mut self, correct: bool, elapsed_ms: Option<i64>) {
        self.total_questions += 1;
        if correct {
            self.correct_answers += 1;
            self.combo += 1;
            self.best_combo = self.best_combo.max(self.combo);
            if let Some(ms) = elapsed_ms.filter(|ms| *ms > 0) {
                if self.fastest_answer_ms == 0 || ms < self.fastest_answer_ms {
                    self.fastest_answer_ms = ms;
                }
            }
        } else {
            self.combo = 0;
        }
    }

    /// A quiz is perfect when every question was answered correctly.
    pub fn record_quiz(&mut self, correct: u32, total: u32, boss: bool) {
        let perfect = total > 0 && correct == total;
        if perfect {
            self.perfect_quizzes += 1;
        }
        // a boss is beaten with at least half the answers right
        if boss && total > 0 && correct * 2 >= total {
            self.bosses_defeated += 1;
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub counters: SessionCounters,
}

impl SessionContext {
    pub fn start(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            started_at: now,
            counters: SessionCounters::default(),
        }
    }
}
