//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{directory, InMemoryDirectory, InMemoryNotifier, TextPayloadDecoder};
use crate::config::Config;
use crate::error::ApiError;
use crate::web::protocol::{ServerMessage, SessionEvent};
use attendance_core::domain::{AttendanceSession, Severity};
use attendance_core::manager::{AttendancePolicy, AttendanceSessionManager};
use attendance_core::ports::{
    ClassDirectory, Clock, NotificationSink, QrDecodeService, UserDirectory,
};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

/// Capacity of the live-monitor event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserDirectory>,
    pub classes: Arc<dyn ClassDirectory>,
    pub notifier: Arc<dyn NotificationSink>,
    pub decoder: Arc<dyn QrDecodeService>,
    pub clock: Arc<dyn Clock>,
    /// The single session/check-in state machine. Every operation holds the
    /// lock for its whole run.
    pub attendance: Arc<Mutex<AttendanceSessionManager>>,
    pub events: broadcast::Sender<SessionEvent>,
}

impl AppState {
    /// Wires the seeded directory, notifier and state machine together.
    pub fn new(config: Arc<Config>, clock: Arc<dyn Clock>) -> Result<Self, ApiError> {
        let late_after = chrono::Duration::from_std(config.late_after)
            .map_err(|e| ApiError::Internal(format!("LATE_AFTER_SECS is out of range: {e}")))?;
        let manager = AttendanceSessionManager::with_history(
            AttendancePolicy { late_after },
            directory::seed_history(),
        );

        let school = Arc::new(InMemoryDirectory::seeded());
        let notifier = Arc::new(InMemoryNotifier::new(config.notification_ttl, clock.clone()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            users: school.clone(),
            classes: school,
            notifier,
            decoder: Arc::new(TextPayloadDecoder),
            clock,
            attendance: Arc::new(Mutex::new(manager)),
            events,
        })
    }

    /// Pushes a message to every monitor `teacher_id` has open.
    pub fn publish(&self, teacher_id: &str, message: ServerMessage) {
        let event = SessionEvent {
            teacher_id: teacher_id.to_string(),
            message,
        };
        if self.events.send(event).is_err() {
            debug!("No live monitors connected; event dropped.");
        }
    }

    /// Tells the owning teacher a session has closed, on every channel they watch.
    pub async fn announce_session_end(&self, session: &AttendanceSession) {
        let teacher_id = match self.classes.get_class(&session.class_id).await {
            Ok(class) => class.teacher_id,
            Err(e) => {
                warn!("Could not resolve teacher for ended session {}: {}", session.id, e);
                return;
            }
        };

        self.notifier
            .notify(
                &teacher_id,
                &format!("Session for {} has ended.", session.class_name),
                Severity::Info,
            )
            .await;
        self.publish(
            &teacher_id,
            ServerMessage::SessionEnded {
                class_name: session.class_name.clone(),
            },
        );
    }
}
