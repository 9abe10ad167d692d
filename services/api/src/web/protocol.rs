//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket messages the server pushes to a teacher's live
//! attendance monitor. The feed is one-way: a data frame sent by the client
//! is answered with an `error` message.

use attendance_core::domain::AttendanceSession;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A session opened. Also sent on connect when one is already running.
    SessionStarted {
        session_id: Uuid,
        class_id: String,
        class_name: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },

    /// A student was recorded against the running session.
    CheckedIn {
        student_id: String,
        student_name: String,
        status: String,
    },

    /// Seconds left in the running session, sent on every ticker pass.
    Countdown { remaining_seconds: i64 },

    /// The session closed, either explicitly or because its time ran out.
    SessionEnded { class_name: String },

    /// The client sent something the monitor cannot act on.
    Error { message: String },
}

impl ServerMessage {
    pub fn session_started(session: &AttendanceSession) -> Self {
        ServerMessage::SessionStarted {
            session_id: session.id,
            class_id: session.class_id.clone(),
            class_name: session.class_name.clone(),
            start_time: session.start_time,
            end_time: session.end_time,
        }
    }
}

/// A message routed to the monitors of one teacher.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub teacher_id: String,
    pub message: ServerMessage,
}
