//! HSC Study · Progress Backend
//!
//! - Axum HTTP + WebSocket API over the local progress store
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   STUDY_CONFIG_PATH : TOML with the content tree and optional achievement catalog
//!   STORE_PATH        : JSON file for persisted progress (in-memory when unset)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use hsc_study::config::Settings;
use hsc_study::routes::build_router;
use hsc_study::state::AppState;
use hsc_study::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();
  let state = Arc::new(AppState::new(&settings));
  let app = build_router(state);

  let listener = TcpListener::bind(settings.addr).await?;
  info!(target: "hsc_backend", addr = %settings.addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "hsc_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "hsc_backend", "Shutdown signal received");
}
