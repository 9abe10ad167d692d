//! services/api/src/web/check_in.rs
//!
//! The student check-in flow: decode the scan, acquire a position, then run
//! the state machine. Every failure ends the flow with a single notification
//! to the student. Nothing is retried.

use crate::web::{protocol::ServerMessage, state::AppState};
use attendance_core::domain::{AttendanceRecord, Severity, User};
use attendance_core::manager::CheckInError;
use attendance_core::ports::GeolocationService;
use tracing::{info, warn};

pub const SCAN_FAILED_MESSAGE: &str = "Failed to scan the QR code. Try again.";
pub const CHECK_IN_SUCCESS_MESSAGE: &str = "Attendance recorded successfully!";

/// The result shown to the student.
#[derive(Debug, Clone)]
pub struct CheckInOutcome {
    pub success: bool,
    pub message: String,
    pub record: Option<AttendanceRecord>,
}

impl CheckInOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
            record: None,
        }
    }
}

pub async fn check_in_process(
    app_state: &AppState,
    student: &User,
    raw_payload: &str,
    geolocation: &dyn GeolocationService,
) -> CheckInOutcome {
    // --- 1. Decode the scan ---
    let session_code = match app_state.decoder.decode(raw_payload).await {
        Ok(code) => code,
        Err(e) => {
            warn!("Scan from {} could not be decoded: {}", student.id, e);
            app_state
                .notifier
                .notify(&student.id, SCAN_FAILED_MESSAGE, Severity::Error)
                .await;
            return CheckInOutcome::failed(SCAN_FAILED_MESSAGE.to_string());
        }
    };

    // --- 2. Acquire the position (logged, never used to gate) ---
    match geolocation.current_position().await {
        Ok(position) => info!(
            "Check-in by {} for session {} at ({}, {})",
            student.id, session_code, position.latitude, position.longitude
        ),
        Err(e) => {
            let message = format!("Failed to get location: {e}");
            warn!("{} for {}", message, student.id);
            app_state
                .notifier
                .notify(&student.id, &message, Severity::Error)
                .await;
            return CheckInOutcome::failed(message);
        }
    }

    // --- 3. Run the state machine with a single clock reading ---
    let now = app_state.clock.now();
    let (result, session_before) = {
        let mut manager = app_state.attendance.lock().await;
        let session_before = manager.active_session().cloned();
        (manager.check_in(&session_code, &student.id, now), session_before)
    };

    match result {
        Ok(record) => {
            app_state
                .notifier
                .notify(&student.id, CHECK_IN_SUCCESS_MESSAGE, Severity::Success)
                .await;
            announce_check_in(app_state, student, &record).await;
            CheckInOutcome {
                success: true,
                message: CHECK_IN_SUCCESS_MESSAGE.to_string(),
                record: Some(record),
            }
        }
        Err(e) => {
            if e == CheckInError::SessionEnded {
                if let Some(session) = &session_before {
                    app_state.announce_session_end(session).await;
                }
            }
            let message = e.to_string();
            app_state
                .notifier
                .notify(&student.id, &message, Severity::Warning)
                .await;
            CheckInOutcome::failed(message)
        }
    }
}

async fn announce_check_in(app_state: &AppState, student: &User, record: &AttendanceRecord) {
    let teacher_id = match app_state.classes.get_class(&record.class_id).await {
        Ok(class) => class.teacher_id,
        Err(e) => {
            warn!("Could not resolve teacher for class {}: {}", record.class_id, e);
            return;
        }
    };

    app_state
        .notifier
        .notify(
            &teacher_id,
            &format!("{} has checked in.", student.name),
            Severity::Success,
        )
        .await;
    app_state.publish(
        &teacher_id,
        ServerMessage::CheckedIn {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            status: record.status.as_str().to_string(),
        },
    );
}
