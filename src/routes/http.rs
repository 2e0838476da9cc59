//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;
use crate::stats::RemoteSummary;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(user = %body.user_id))]
pub async fn http_start_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SessionIn>,
) -> Result<impl IntoResponse, ApiError> {
  let ctx = logic::start_session(&state, &body.user_id).await?;
  Ok(Json(ctx))
}

#[instrument(level = "info", skip(state))]
pub async fn http_end_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let ended = logic::end_session(&state).await;
  Json(serde_json::json!({ "ended": ended }))
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject_key, dotpoint = %body.dotpoint_id))]
pub async fn http_post_activity(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ActivityIn>,
) -> impl IntoResponse {
  let out = logic::complete_section(&state, body).await;
  info!(target: "progress", unlocked = out.newly_unlocked.len(), "HTTP activity recorded");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(correct = body.correct))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = logic::answer_question(&state, body).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject_key, boss = body.boss))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = logic::finish_quiz(&state, body).await?;
  info!(target: "progress", unlocked = out.newly_unlocked.len(), "HTTP quiz recorded");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_dashboard(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::dashboard(&state).await)
}

#[instrument(level = "info", skip(state), fields(subject = ?q.subject))]
pub async fn http_get_xp(
  State(state): State<Arc<AppState>>,
  Query(q): Query<XpQuery>,
) -> impl IntoResponse {
  Json(logic::xp(&state, q.subject).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_streak(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::streak(&state).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_achievements(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::achievements(&state).await)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_sync(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RemoteSummary>,
) -> impl IntoResponse {
  Json(logic::sync_remote(&state, body).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_bookmarks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::bookmarks(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(dotpoint = %body.target.dotpoint_id))]
pub async fn http_toggle_bookmark(
  State(state): State<Arc<AppState>>,
  Json(body): Json<BookmarkIn>,
) -> impl IntoResponse {
  let out = logic::toggle_bookmark(&state, body).await;
  info!(target: "progress", bookmarked = out.bookmarked, total = out.bookmarks.len(), "HTTP bookmark toggled");
  Json(out)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_recent(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::recent(&state).await)
}

#[instrument(level = "info", skip(state, body), fields(dotpoint = %body.target.dotpoint_id))]
pub async fn http_post_visit(
  State(state): State<Arc<AppState>>,
  Json(body): Json<VisitIn>,
) -> impl IntoResponse {
  Json(logic::visit(&state, body).await)
}

#[instrument(level = "debug", skip(state), fields(query_len = q.q.len()))]
pub async fn http_get_search(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SearchQuery>,
) -> impl IntoResponse {
  Json(logic::search(&state, &q.q, &q.subject).await)
}

#[instrument(level = "info", skip(state))]
pub async fn http_reload_content(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let entries = state.reload_content().await?;
  Ok(Json(ReloadOut { entries }))
}
