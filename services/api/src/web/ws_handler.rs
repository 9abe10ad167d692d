//! services/api/src/web/ws_handler.rs
//!
//! The teacher's live attendance monitor. Each connection forwards the session
//! events addressed to its teacher until either side goes away.

use crate::web::{
    protocol::{ServerMessage, SessionEvent},
    state::AppState,
};
use attendance_core::domain::{User, UserRole};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
///
/// The role is checked before the upgrade so non-teachers always get a 403.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Response {
    if user.role != UserRole::Teacher {
        return (
            StatusCode::FORBIDDEN,
            "The live monitor is only available to teachers".to_string(),
        )
            .into_response();
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, app_state, user)),
        Err(rejection) => rejection.into_response(),
    }
}

/// The `session_started` message a monitor receives on connect, if the
/// running session belongs to `teacher_id`.
pub async fn initial_message(app_state: &AppState, teacher_id: &str) -> Option<ServerMessage> {
    let session = app_state.attendance.lock().await.active_session().cloned()?;
    match app_state.classes.get_class(&session.class_id).await {
        Ok(class) if class.teacher_id == teacher_id => {
            Some(ServerMessage::session_started(&session))
        }
        _ => None,
    }
}

/// Whether `event` belongs on the monitor of `teacher_id`.
pub fn is_addressed_to(event: &SessionEvent, teacher_id: &str) -> bool {
    event.teacher_id == teacher_id
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user: User) {
    info!("Live monitor connected for teacher: {}", user.id);

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before reading the current session so nothing falls in between.
    let mut events = app_state.events.subscribe();

    // --- 1. Initial state ---
    if let Some(message) = initial_message(&app_state, &user.id).await {
        if !send_message(&mut sender, &message).await {
            return;
        }
    }

    // --- 2. Main Loop ---
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if is_addressed_to(&event, &user.id)
                        && !send_message(&mut sender, &event.message).await
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Live monitor for {} skipped {} events.", user.id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected.");
                    break;
                }
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                Some(Ok(Message::Text(_) | Message::Binary(_))) => {
                    let reply = ServerMessage::Error {
                        message: "The live monitor does not accept messages.".to_string(),
                    };
                    if !send_message(&mut sender, &reply).await {
                        break;
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Live monitor closed for teacher: {}", user.id);
}

/// Serializes and sends one message. Returns false once the socket is unusable.
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return true;
        }
    };
    if sender.send(Message::Text(json.into())).await.is_err() {
        error!("Failed to send message to live monitor.");
        return false;
    }
    true
}
