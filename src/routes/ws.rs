//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::logic;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "hsc_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "hsc_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = reply_to_text(&txt, &state).await;
        if let Err(e) = socket.send(Message::Text(reply)).await {
          error!(target: "hsc_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      Message::Binary(_) | Message::Pong(_) => {}
    }
  }
  info!(target: "hsc_backend", "WebSocket disconnected");
}

/// Parse, dispatch, serialize.
pub async fn reply_to_text(txt: &str, state: &AppState) -> String {
  let reply_msg = match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "hsc_backend", ?incoming, "WS received");
      handle_client_ws(incoming, state).await
    }
    Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
  };

  serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::SubmitAnswer(answer) => match logic::answer_question(state, answer).await {
      Ok(out) => ServerWsMessage::Progress(out),
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::CompleteSection(activity) => {
      ServerWsMessage::Progress(logic::complete_section(state, activity).await)
    }

    ClientWsMessage::FinishQuiz(quiz) => match logic::finish_quiz(state, quiz).await {
      Ok(out) => ServerWsMessage::Progress(out),
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::Visit(v) => ServerWsMessage::Recent { recent: logic::visit(state, v).await },

    ClientWsMessage::Search { query, subject } => {
      let results = logic::search(state, &query, &subject).await;
      ServerWsMessage::SearchResults { query, results }
    }

    ClientWsMessage::Dashboard => ServerWsMessage::Dashboard(logic::dashboard(state).await),
  }
}
