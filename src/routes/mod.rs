//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// API routes only, without static files or layers.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route(
            "/api/v1/session",
            post(http::http_start_session).delete(http::http_end_session),
        )
        .route("/api/v1/activity", post(http::http_post_activity))
        .route("/api/v1/answer", post(http::http_post_answer))
        .route("/api/v1/quiz", post(http::http_post_quiz))
        .route("/api/v1/dashboard", get(http::http_get_dashboard))
        .route("/api/v1/xp", get(http::http_get_xp))
        .route("/api/v1/streak", get(http::http_get_streak))
        .route("/api/v1/achievements", get(http::http_get_achievements))
        .route("/api/v1/achievements/sync", post(http::http_post_sync))
        .route(
            "/api/v1/bookmarks",
            get(http::http_get_bookmarks).post(http::http_toggle_bookmark),
        )
        .route(
            "/api/v1/recent",
            get(http::http_get_recent).post(http::http_post_visit),
        )
        .route("/api/v1/search", get(http::http_get_search))
        .route("/api/v1/content/reload", post(http::http_reload_content))
        .with_state(state)
}

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers); the app only listens for its own UI
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    api_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}
