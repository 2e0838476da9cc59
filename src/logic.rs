//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Recording sections, answers and quizzes, then re-evaluating achievements
//!   - Dashboard, streak and XP read-outs
//!   - Bookmarks, recent visits and search
//!   - Folding in a remote backend summary

use chrono::Local;
use tracing::{debug, info, instrument};

use crate::achievements::{achievement_xp, UnlockRecord};
use crate::domain::{ActivityRecord, DotpointRef, RecentVisit};
use crate::error::ApiError;
use crate::progress::{self, bookmark_for};
use crate::protocol::*;
use crate::search::{SearchEntry, SubjectFilter};
use crate::session::SessionContext;
use crate::state::{AppState, Progress};
use crate::stats::{snapshot_from_store, RemoteSummary, SummaryTotals};
use crate::streak::{activity_days, current_streak, longest_streak};
use crate::xp::{clamp_awarded, level_for_xp, total_xp, xp_by_subject};

fn unlocked_out(state: &AppState, fresh: &[UnlockRecord]) -> Vec<UnlockedOut> {
  fresh
    .iter()
    .filter_map(|u| {
      state
        .catalog
        .iter()
        .find(|a| a.id == u.achievement_id)
        .map(|a| UnlockedOut::new(a, u))
    })
    .collect()
}

/// Build a snapshot from the store plus the session counters and run the catalog.
/// Caller holds the progress write guard.
fn evaluate_locked(state: &AppState, prog: &mut Progress, session: Option<&SessionContext>) -> Vec<UnlockedOut> {
  let snapshot = snapshot_from_store(&*prog.store, session.map(|s| &s.counters), state.today(), &Local);
  debug!(target: "achievements", ?snapshot, "Evaluating catalog");
  let fresh = prog.ledger.evaluate_and_record(&mut *prog.store, &state.catalog, &snapshot, state.now());
  unlocked_out(state, &fresh)
}

// -------- Session --------

#[instrument(level = "info", skip(state))]
pub async fn start_session(state: &AppState, user_id: &str) -> Result<SessionContext, ApiError> {
  let user_id = user_id.trim();
  if user_id.is_empty() {
    return Err(ApiError::BadRequest("userId must not be empty".into()));
  }
  let ctx = SessionContext::start(user_id, state.now());
  info!(target: "hsc_backend", session = %ctx.session_id, user = %ctx.user_id, "Session started");
  *state.session.write().await = Some(ctx.clone());
  Ok(ctx)
}

/// Returns true if a session was active.
#[instrument(level = "info", skip(state))]
pub async fn end_session(state: &AppState) -> bool {
  let ended = state.session.write().await.take();
  if let Some(ctx) = &ended {
    info!(target: "hsc_backend", session = %ctx.session_id, user = %ctx.user_id, answered = ctx.counters.total_questions, "Session ended");
  }
  ended.is_some()
}

// -------- Writes that move stats --------

#[instrument(level = "info", skip(state, input), fields(subject = %input.subject_key, dotpoint = %input.dotpoint_id, section = %input.section_id))]
pub async fn complete_section(state: &AppState, input: ActivityIn) -> ProgressOut {
  let record = ActivityRecord {
    subject_key: input.subject_key,
    module_number: input.module_number,
    dotpoint_id: input.dotpoint_id,
    section_id: input.section_id,
    completed: input.completed,
    xp_awarded: clamp_awarded(input.xp_awarded),
    occurred_at: state.now(),
  };

  let session = state.session.read().await;
  let mut prog = state.progress.write().await;
  progress::record_activity(&mut *prog.store, &record);
  let newly_unlocked = evaluate_locked(state, &mut prog, session.as_ref());
  info!(target: "progress", xp = record.xp_awarded, unlocked = newly_unlocked.len(), "Section recorded");
  ProgressOut { record: Some(record), newly_unlocked }
}

#[instrument(level = "info", skip(state, input), fields(correct = input.correct))]
pub async fn answer_question(state: &AppState, input: AnswerIn) -> Result<ProgressOut, ApiError> {
  let mut session = state.session.write().await;
  let ctx = session.as_mut().ok_or(ApiError::NoSession)?;
  ctx.counters.record_answer(input.correct, input.elapsed_ms);

  let mut prog = state.progress.write().await;
  let newly_unlocked = evaluate_locked(state, &mut prog, session.as_ref());
  Ok(ProgressOut { record: None, newly_unlocked })
}

#[instrument(level = "info", skip(state, input), fields(subject = %input.subject_key, correct = input.correct, total = input.total, boss = input.boss))]
pub async fn finish_quiz(state: &AppState, input: QuizIn) -> Result<ProgressOut, ApiError> {
  if input.correct > input.total {
    return Err(ApiError::BadRequest("correct cannot exceed total".into()));
  }

  let mut session = state.session.write().await;
  let ctx = session.as_mut().ok_or(ApiError::NoSession)?;
  ctx.counters.record_quiz(input.correct, input.total, input.boss);

  let record = ActivityRecord {
    subject_key: input.subject_key,
    module_number: input.module_number,
    dotpoint_id: input.dotpoint_id,
    section_id: input.section_id,
    completed: true,
    xp_awarded: clamp_awarded(input.xp_awarded),
    occurred_at: state.now(),
  };

  let mut prog = state.progress.write().await;
  progress::record_activity(&mut *prog.store, &record);
  let newly_unlocked = evaluate_locked(state, &mut prog, session.as_ref());
  Ok(ProgressOut { record: Some(record), newly_unlocked })
}

/// Merge a remote summary: server unlocks join the ledger, server totals feed the
/// snapshot, and anything those totals now satisfy unlocks too.
#[instrument(level = "info", skip_all, fields(remote_unlocks = remote.user_achievements.len()))]
pub async fn sync_remote(state: &AppState, remote: RemoteSummary) -> SyncOut {
  let session = state.session.read().await;
  let mut prog = state.progress.write().await;

  let Progress { store, ledger } = &mut *prog;
  let added = ledger.merge_remote(&mut **store, &remote.user_achievements);

  let mut snapshot = snapshot_from_store(&**store, session.as_ref().map(|s| &s.counters), state.today(), &Local);
  snapshot.merge_summary(&remote.summary);
  let fresh = ledger.evaluate_and_record(&mut **store, &state.catalog, &snapshot, state.now());

  info!(target: "achievements", added, unlocked = fresh.len(), "Remote summary merged");
  SyncOut { added, newly_unlocked: unlocked_out(state, &fresh) }
}

// -------- Read-outs --------

pub async fn streak(state: &AppState) -> StreakOut {
  let prog = state.progress.read().await;
  let records = progress::activity_records(&*prog.store, None);
  let days = activity_days(&records, &Local);
  StreakOut { current: current_streak(&days, state.today()), longest_streak: longest_streak(&days) }
}

pub async fn xp(state: &AppState, subject: Option<String>) -> XpOut {
  let subject = match SubjectFilter::parse(subject.as_deref()) {
    SubjectFilter::All => None,
    SubjectFilter::Subject(key) => Some(key),
  };
  let prog = state.progress.read().await;
  let total_xp = total_xp(&*prog.store, subject.as_deref());
  XpOut { subject, total_xp }
}

#[instrument(level = "info", skip(state))]
pub async fn dashboard(state: &AppState) -> DashboardOut {
  let session = state.session.read().await;
  let prog = state.progress.read().await;

  let snapshot = snapshot_from_store(&*prog.store, session.as_ref().map(|s| &s.counters), state.today(), &Local);
  let records = progress::activity_records(&*prog.store, None);
  let most_recent_study_date = current_streak(&activity_days(&records, &Local), state.today()).most_recent_date;

  DashboardOut {
    summary: SummaryTotals::from_snapshot(&snapshot),
    most_recent_study_date,
    xp_by_subject: xp_by_subject(&*prog.store),
    level: level_for_xp(snapshot.total_xp),
    achievements_unlocked: state.catalog.iter().filter(|a| prog.ledger.is_unlocked(&a.id)).count(),
    achievements_total: state.catalog.len(),
    achievement_xp: achievement_xp(&state.catalog, prog.ledger.records()),
    session: session.as_ref().cloned(),
  }
}

pub async fn achievements(state: &AppState) -> Vec<AchievementOut> {
  let prog = state.progress.read().await;
  state
    .catalog
    .iter()
    .map(|a| AchievementOut {
      id: a.id.clone(),
      name: a.name.clone(),
      description: a.description.clone(),
      category: a.category,
      rarity: a.rarity,
      xp_reward: a.xp_reward,
      unlocked_at: prog
        .ledger
        .records()
        .iter()
        .find(|r| r.achievement_id == a.id)
        .map(|r| r.unlocked_at),
    })
    .collect()
}

// -------- Bookmarks & visits --------

/// Title and subject name for a dotpoint, preferring what the client sent.
async fn describe(state: &AppState, target: &DotpointRef, title: Option<String>, subject_name: Option<String>) -> (String, String) {
  let content = state.content.read().await;
  let title = title
    .or_else(|| content.dotpoint_title(&target.subject_key, target.module_number, &target.dotpoint_id))
    .unwrap_or_else(|| target.dotpoint_id.clone());
  let subject_name = subject_name.unwrap_or_else(|| content.subject_name(&target.subject_key));
  (title, subject_name)
}

pub async fn bookmarks(state: &AppState) -> Vec<crate::domain::Bookmark> {
  let prog = state.progress.read().await;
  progress::bookmarks(&*prog.store)
}

#[instrument(level = "info", skip(state, input), fields(dotpoint = %input.target.dotpoint_id))]
pub async fn toggle_bookmark(state: &AppState, input: BookmarkIn) -> BookmarkToggleOut {
  let (title, subject_name) = describe(state, &input.target, input.title, input.subject_name).await;
  let bookmark = bookmark_for(input.target, &title, &subject_name, state.now());

  let session = state.session.read().await;
  let mut prog = state.progress.write().await;
  let bookmarked = progress::toggle_bookmark(&mut *prog.store, bookmark);
  // bookmark count is a stat too
  evaluate_locked(state, &mut prog, session.as_ref());
  BookmarkToggleOut { bookmarked, bookmarks: progress::bookmarks(&*prog.store) }
}

pub async fn recent(state: &AppState) -> Vec<RecentVisit> {
  let prog = state.progress.read().await;
  progress::recent_visits(&*prog.store)
}

#[instrument(level = "debug", skip(state, input), fields(dotpoint = %input.target.dotpoint_id))]
pub async fn visit(state: &AppState, input: VisitIn) -> Vec<RecentVisit> {
  let (title, subject_name) = describe(state, &input.target, input.title, input.subject_name).await;
  let entry = RecentVisit { target: input.target, title, subject_name, visited_at: state.now() };
  let mut prog = state.progress.write().await;
  progress::record_visit(&mut *prog.store, entry)
}

// -------- Search --------

pub async fn search(state: &AppState, query: &str, filter: &SubjectFilter) -> Vec<SearchEntry> {
  state.content.read().await.index.search(query, filter)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use crate::achievements::{AchievementDef, Category, Comparison, Condition, Rarity, StatField};
  use crate::seeds::seed_subjects;
  use crate::store::MemoryStore;

  fn section(dotpoint: &str, xp: i64) -> ActivityIn {
    ActivityIn {
      subject_key: "biology".into(),
      module_number: 5,
      dotpoint_id: dotpoint.into(),
      section_id: "notes".into(),
      completed: true,
      xp_awarded: xp,
    }
  }

  fn target(id: &str) -> DotpointRef {
    DotpointRef { subject_key: "biology".into(), module_number: 5, dotpoint_id: id.into() }
  }

  #[tokio::test]
  async fn test_first_section_unlocks_once() {
    let state = AppState::in_memory();
    let first = complete_section(&state, section("BIO-5-2-1", 20)).await;
    assert!(first.newly_unlocked.iter().any(|u| u.id == "first_steps"));

    let again = complete_section(&state, section("BIO-5-2-2", 20)).await;
    assert!(again.newly_unlocked.iter().all(|u| u.id != "first_steps"));

    let dash = dashboard(&state).await;
    assert_eq!(dash.summary.total_xp, 40);
    assert_eq!(dash.summary.current_streak, 1);
    assert_eq!(dash.xp_by_subject.get("biology"), Some(&40));
    assert!(dash.achievement_xp >= 10);
  }

  #[tokio::test]
  async fn test_oversized_xp_is_capped() {
    let state = AppState::in_memory();
    let mut big = section("BIO-5-2-1", i64::MAX);
    big.section_id = "a".into();
    let out = complete_section(&state, big).await;
    assert_eq!(out.record.map(|r| r.xp_awarded), Some(crate::xp::MAX_SECTION_XP));

    let mut again = section("BIO-5-2-1", i64::MAX);
    again.section_id = "b".into();
    complete_section(&state, again).await;

    let dash = dashboard(&state).await;
    assert_eq!(dash.summary.total_xp, 2 * crate::xp::MAX_SECTION_XP);
    assert_eq!(xp(&state, Some(" all ".into())).await.total_xp, 2 * crate::xp::MAX_SECTION_XP);
    assert_eq!(xp(&state, Some(" all ".into())).await.subject, None);
    assert_eq!(xp(&state, Some(" biology ".into())).await.subject.as_deref(), Some("biology"));
  }

  #[tokio::test]
  async fn test_answers_need_a_session() {
    let state = AppState::in_memory();
    let out = answer_question(&state, AnswerIn { correct: true, elapsed_ms: Some(1200) }).await.unwrap();
    let ids: Vec<_> = out.newly_unlocked.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["first_correct", "lightning"]);

    assert!(end_session(&state).await);
    assert!(!end_session(&state).await);
    let err = answer_question(&state, AnswerIn { correct: true, elapsed_ms: None }).await.unwrap_err();
    assert!(matches!(err, ApiError::NoSession));
  }

  #[tokio::test]
  async fn test_new_session_resets_counters() {
    let state = AppState::in_memory();
    answer_question(&state, AnswerIn { correct: false, elapsed_ms: None }).await.unwrap();
    let ctx = start_session(&state, "student-7").await.unwrap();
    assert_eq!(ctx.counters.total_questions, 0);
    assert!(start_session(&state, "  ").await.is_err());
  }

  #[tokio::test]
  async fn test_boss_quiz() {
    let state = AppState::in_memory();
    let quiz = QuizIn {
      subject_key: "biology".into(),
      module_number: 5,
      dotpoint_id: "BIO-5-2-3".into(),
      section_id: "boss".into(),
      correct: 8,
      total: 8,
      boss: true,
      xp_awarded: 100,
    };
    let out = finish_quiz(&state, quiz).await.unwrap();
    let ids: Vec<_> = out.newly_unlocked.iter().map(|u| u.id.as_str()).collect();
    assert!(ids.contains(&"perfectionist"));
    assert!(ids.contains(&"boss_slayer"));
    assert_eq!(xp(&state, Some("biology".into())).await.total_xp, 100);
  }

  #[tokio::test]
  async fn test_invalid_quiz_rejected() {
    let state = AppState::in_memory();
    let quiz = QuizIn {
      subject_key: "biology".into(),
      module_number: 5,
      dotpoint_id: "BIO-5-2-3".into(),
      section_id: "quiz".into(),
      correct: 5,
      total: 3,
      boss: false,
      xp_awarded: 0,
    };
    assert!(matches!(finish_quiz(&state, quiz).await, Err(ApiError::BadRequest(_))));
  }

  #[tokio::test]
  async fn test_bookmark_toggle_fills_titles() {
    let state = AppState::in_memory();
    let out = toggle_bookmark(&state, BookmarkIn { target: target("BIO-5-2-1"), title: None, subject_name: None }).await;
    assert!(out.bookmarked);
    assert_eq!(out.bookmarks[0].title, "Mitosis");
    assert_eq!(out.bookmarks[0].subject_name, "Biology");

    let out = toggle_bookmark(&state, BookmarkIn { target: target("BIO-5-2-1"), title: None, subject_name: None }).await;
    assert!(!out.bookmarked);
    assert!(bookmarks(&state).await.is_empty());
  }

  #[tokio::test]
  async fn test_visits_and_search() {
    let state = AppState::in_memory();
    for id in ["BIO-5-2-1", "BIO-5-2-3", "BIO-5-2-1"] {
      visit(&state, VisitIn { target: target(id), title: None, subject_name: None }).await;
    }
    let list = recent(&state).await;
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].target.dotpoint_id, "BIO-5-2-1");

    let hits = search(&state, "mitosis", &SubjectFilter::All).await;
    assert_eq!(hits[0].dotpoint_id, "BIO-5-2-1");
    assert!(search(&state, "mitosis", &SubjectFilter::Subject("chemistry".into())).await.is_empty());
  }

  #[tokio::test]
  async fn test_remote_sync_unlocks_from_totals() {
    let catalog = vec![AchievementDef {
      id: "scholar".into(),
      name: "Scholar".into(),
      description: String::new(),
      category: Category::Mastery,
      xp_reward: 250,
      rarity: Rarity::Legendary,
      conditions: vec![Condition { field: StatField::TotalXp, op: Comparison::AtLeast, value: 1000 }],
    }];
    let state = AppState::with_parts(Box::new(MemoryStore::new()), seed_subjects(), catalog);

    let remote = RemoteSummary {
      summary: SummaryTotals { total_xp: 1500, current_streak: 2, longest_streak: 4 },
      user_achievements: vec![UnlockRecord { achievement_id: "legacy".into(), unlocked_at: Utc::now() }],
    };
    let out = sync_remote(&state, remote).await;
    assert_eq!(out.added, 1);
    assert_eq!(out.newly_unlocked.len(), 1);
    assert_eq!(out.newly_unlocked[0].id, "scholar");

    // server-only ids are kept but contribute no catalog XP
    let dash = dashboard(&state).await;
    assert_eq!(dash.achievement_xp, 250);
    assert_eq!(dash.achievements_unlocked, 1);
    assert_eq!(dash.achievements_total, 1);
    assert_eq!(achievements(&state).await.len(), 1);
  }
}
