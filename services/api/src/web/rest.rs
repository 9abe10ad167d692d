//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::adapters::ReportedGeolocation;
use crate::web::{
    auth,
    check_in::{check_in_process, CheckInOutcome},
    protocol::ServerMessage,
    state::AppState,
};
use attendance_core::domain::{
    AttendanceRecord, AttendanceSession, Class, GeoPoint, Notification, Severity, User, UserRole,
};
use attendance_core::ports::PortError;
use attendance_core::stats::{AttendanceStats, ClassAttendance};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

type HandlerError = (StatusCode, String);

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        list_users_handler,
        list_classes_handler,
        start_session_handler,
        stop_session_handler,
        active_session_handler,
        check_in_handler,
        history_handler,
        stats_handler,
        update_location_handler,
        list_notifications_handler,
        dismiss_notification_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            UserResponse,
            ClassResponse,
            LocationPayload,
            StartSessionRequest,
            SessionResponse,
            StopSessionResponse,
            RosterEntry,
            MonitorResponse,
            CheckInRequest,
            CheckInResponse,
            RecordResponse,
            StatsResponse,
            ClassStatsResponse,
            NotificationResponse,
        )
    ),
    tags(
        (name = "Attendance API", description = "QR attendance sessions, check-ins and statistics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub student_number: Option<String>,
    pub teacher_number: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
            student_number: user.student_number,
            teacher_number: user.teacher_number,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LocationPayload {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    pub student_ids: Vec<String>,
    pub location: LocationPayload,
}

impl From<Class> for ClassResponse {
    fn from(class: Class) -> Self {
        Self {
            id: class.id,
            name: class.name,
            teacher_id: class.teacher_id,
            student_ids: class.student_ids,
            location: LocationPayload {
                latitude: class.location.latitude,
                longitude: class.location.longitude,
            },
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct StartSessionRequest {
    pub class_id: String,
    pub duration_minutes: u32,
}

/// An open session. `id` is the value to encode in the QR code.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub class_id: String,
    pub class_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

impl From<AttendanceSession> for SessionResponse {
    fn from(session: AttendanceSession) -> Self {
        Self {
            id: session.id,
            class_id: session.class_id,
            class_name: session.class_name,
            start_time: session.start_time,
            end_time: session.end_time,
            is_active: session.is_active,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StopSessionResponse {
    pub stopped: Option<SessionResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct RosterEntry {
    pub student_id: String,
    pub name: String,
    pub checked_in: bool,
}

/// The teacher's live view of the running session.
#[derive(Serialize, ToSchema)]
pub struct MonitorResponse {
    pub session: Option<SessionResponse>,
    pub remaining_seconds: Option<i64>,
    pub checked_in_count: usize,
    pub roster_size: usize,
    pub roster: Vec<RosterEntry>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// The text the scanner decoded from the QR code.
    pub qr_payload: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordResponse {
    pub id: Uuid,
    pub student_id: String,
    pub session_id: Option<Uuid>,
    pub class_id: String,
    pub class_name: String,
    pub date: NaiveDate,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub status: String,
}

impl From<&AttendanceRecord> for RecordResponse {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            id: record.id,
            student_id: record.student_id.clone(),
            session_id: record.session_id,
            class_id: record.class_id.clone(),
            class_name: record.class_name.clone(),
            date: record.date,
            checked_in_at: record.checked_in_at,
            status: record.status.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CheckInResponse {
    pub success: bool,
    pub message: String,
    pub record: Option<RecordResponse>,
}

impl From<CheckInOutcome> for CheckInResponse {
    fn from(outcome: CheckInOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message,
            record: outcome.record.as_ref().map(RecordResponse::from),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ClassStatsResponse {
    pub class_id: String,
    pub class_name: String,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub attendance_rate: f64,
}

impl From<ClassAttendance> for ClassStatsResponse {
    fn from(c: ClassAttendance) -> Self {
        Self {
            class_id: c.class_id,
            class_name: c.class_name,
            present: c.present,
            late: c.late,
            absent: c.absent,
            attendance_rate: c.attendance_rate,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_students: usize,
    pub total_teachers: usize,
    pub total_classes: usize,
    pub per_class: Vec<ClassStatsResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: u64,
    pub message: String,
    pub severity: String,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            message: n.message,
            severity: n.severity.as_str().to_string(),
            created_at: n.created_at,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn require_role(user: &User, role: UserRole) -> Result<(), HandlerError> {
    if user.role == role {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            format!("This action is only available to a {}", role.as_str()),
        ))
    }
}

fn port_failure(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
        PortError::InvalidInput(why) => (StatusCode::BAD_REQUEST, why),
        other => {
            error!("{}: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// Directory Handlers
//=========================================================================================

/// List every user that can be selected at login.
#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [UserResponse]))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let users = state
        .users
        .list_users()
        .await
        .map_err(|e| port_failure("Failed to list users", e))?;
    Ok(Json(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

/// List the classes relevant to the caller.
///
/// Teachers see the classes they teach, students the classes they are enrolled
/// in, and the administrator every class.
#[utoipa::path(
    get,
    path = "/classes",
    responses((status = 200, description = "Visible classes", body = [ClassResponse]))
)]
pub async fn list_classes_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HandlerError> {
    let classes = state
        .classes
        .list_classes()
        .await
        .map_err(|e| port_failure("Failed to list classes", e))?;

    let visible: Vec<ClassResponse> = classes
        .into_iter()
        .filter(|class| match user.role {
            UserRole::Teacher => class.teacher_id == user.id,
            UserRole::Student => class.has_student(&user.id),
            UserRole::Admin => true,
        })
        .map(ClassResponse::from)
        .collect();
    Ok(Json(visible))
}

//=========================================================================================
// Teacher Handlers
//=========================================================================================

/// Start an attendance session, replacing any session already running.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionResponse),
        (status = 400, description = "Invalid duration"),
        (status = 403, description = "Caller does not teach this class"),
        (status = 404, description = "Unknown class")
    )
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Teacher)?;

    let max = state.config.max_session_minutes;
    if req.duration_minutes == 0 || req.duration_minutes > max {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("duration_minutes must be between 1 and {max}"),
        ));
    }

    let class = state
        .classes
        .get_class(&req.class_id)
        .await
        .map_err(|e| port_failure("Failed to load class", e))?;
    if class.teacher_id != user.id {
        return Err((
            StatusCode::FORBIDDEN,
            "You do not teach this class".to_string(),
        ));
    }

    let now = state.clock.now();
    let (session, replaced) = state
        .attendance
        .lock()
        .await
        .start_session(&class, req.duration_minutes, now);

    if let Some(previous) = &replaced {
        info!("{} replaced session {}", user.name, previous.id);
        state.announce_session_end(previous).await;
    }
    state.publish(&user.id, ServerMessage::session_started(&session));
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

/// Stop the running session. Stopping when nothing is running is a no-op.
#[utoipa::path(
    delete,
    path = "/sessions/active",
    responses((status = 200, description = "Session stopped, if one was running", body = StopSessionResponse))
)]
pub async fn stop_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Teacher)?;

    let stopped = state.attendance.lock().await.stop_session();
    if let Some(session) = &stopped {
        info!("{} stopped session {}", user.name, session.id);
        state.announce_session_end(session).await;
    }

    Ok(Json(StopSessionResponse {
        stopped: stopped.map(SessionResponse::from),
    }))
}

/// Live monitor: the running session, time left and who has checked in.
#[utoipa::path(
    get,
    path = "/sessions/active",
    responses((status = 200, description = "Current monitor view", body = MonitorResponse))
)]
pub async fn active_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Teacher)?;

    let now = state.clock.now();
    let (expired, session, remaining, checked_in) = {
        let mut manager = state.attendance.lock().await;
        let expired = manager.expire_if_due(now);
        (
            expired,
            manager.active_session().cloned(),
            manager.remaining(now),
            manager.checked_in().clone(),
        )
    };
    if let Some(session) = &expired {
        state.announce_session_end(session).await;
    }

    let Some(session) = session else {
        return Ok(Json(MonitorResponse {
            session: None,
            remaining_seconds: None,
            checked_in_count: 0,
            roster_size: 0,
            roster: Vec::new(),
        }));
    };

    let class = state
        .classes
        .get_class(&session.class_id)
        .await
        .map_err(|e| port_failure("Failed to load class", e))?;
    let mut roster = Vec::with_capacity(class.student_ids.len());
    for student_id in &class.student_ids {
        let name = match state.users.get_user(student_id).await {
            Ok(student) => student.name,
            Err(_) => student_id.clone(),
        };
        roster.push(RosterEntry {
            student_id: student_id.clone(),
            name,
            checked_in: checked_in.contains(student_id),
        });
    }

    Ok(Json(MonitorResponse {
        session: Some(SessionResponse::from(session)),
        remaining_seconds: remaining.map(|r| r.num_seconds()),
        checked_in_count: checked_in.len(),
        roster_size: roster.len(),
        roster,
    }))
}

//=========================================================================================
// Student Handlers
//=========================================================================================

/// Check in with a scanned QR payload and the device position.
///
/// Business failures (expired session, duplicate check-in, ...) are reported
/// with `success = false` and a 200 status.
#[utoipa::path(
    post,
    path = "/check-in",
    request_body = CheckInRequest,
    responses((status = 200, description = "Check-in outcome", body = CheckInResponse))
)]
pub async fn check_in_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(req): Json<CheckInRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Student)?;

    let geolocation = ReportedGeolocation::new(req.latitude, req.longitude);
    let outcome = check_in_process(&state, &user, &req.qr_payload, &geolocation).await;
    Ok(Json(CheckInResponse::from(outcome)))
}

/// The caller's attendance history, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "Own records", body = [RecordResponse]))
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Student)?;

    let manager = state.attendance.lock().await;
    let records: Vec<RecordResponse> = manager
        .history_for(&user.id)
        .map(RecordResponse::from)
        .collect();
    Ok(Json(records))
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

/// School-wide totals and per-class attendance rates.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Aggregate statistics", body = StatsResponse))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Admin)?;

    let users = state
        .users
        .list_users()
        .await
        .map_err(|e| port_failure("Failed to list users", e))?;
    let classes = state
        .classes
        .list_classes()
        .await
        .map_err(|e| port_failure("Failed to list classes", e))?;

    let stats = {
        let manager = state.attendance.lock().await;
        AttendanceStats::compute(&users, &classes, manager.history())
    };

    Ok(Json(StatsResponse {
        total_students: stats.total_students,
        total_teachers: stats.total_teachers,
        total_classes: stats.total_classes,
        per_class: stats
            .per_class
            .into_iter()
            .map(ClassStatsResponse::from)
            .collect(),
    }))
}

/// Update the coordinates a class is held at.
#[utoipa::path(
    put,
    path = "/admin/classes/{id}/location",
    request_body = LocationPayload,
    params(("id" = String, Path, description = "Class id")),
    responses(
        (status = 200, description = "Location updated", body = ClassResponse),
        (status = 400, description = "Coordinates out of range"),
        (status = 404, description = "Unknown class")
    )
)]
pub async fn update_location_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(class_id): Path<String>,
    Json(req): Json<LocationPayload>,
) -> Result<impl IntoResponse, HandlerError> {
    require_role(&user, UserRole::Admin)?;

    let location = GeoPoint::new(req.latitude, req.longitude)
        .map_err(|why| (StatusCode::BAD_REQUEST, why))?;
    let class = state
        .classes
        .update_class_location(&class_id, location)
        .await
        .map_err(|e| port_failure("Failed to update class location", e))?;

    state
        .notifier
        .notify(&user.id, "Class location updated.", Severity::Success)
        .await;
    Ok(Json(ClassResponse::from(class)))
}

//=========================================================================================
// Notification Handlers
//=========================================================================================

/// The caller's notifications that have not yet expired or been dismissed.
#[utoipa::path(
    get,
    path = "/notifications",
    responses((status = 200, description = "Live notifications", body = [NotificationResponse]))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    let notifications: Vec<NotificationResponse> = state
        .notifier
        .list_for(&user.id)
        .await
        .into_iter()
        .map(NotificationResponse::from)
        .collect();
    Json(notifications)
}

/// Dismiss one of the caller's notifications.
#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    params(("id" = u64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Dismissed"),
        (status = 404, description = "No such notification")
    )
)]
pub async fn dismiss_notification_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(notification_id): Path<u64>,
) -> Result<StatusCode, HandlerError> {
    if state.notifier.dismiss(&user.id, notification_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            "Notification not found".to_string(),
        ))
    }
}
