//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the attendance system.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// The role a directory user plays. Decides which surface they get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    Student,
    Teacher,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }
}

/// A pre-seeded person who can "log in" by selecting themselves.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub student_number: Option<String>,
    pub teacher_number: Option<String>,
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting coordinates outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err("Latitude and longitude must be valid numbers.".to_string());
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err("Latitude must be between -90 and 90.".to_string());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err("Longitude must be between -180 and 180.".to_string());
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A class with its teacher, roster and the coordinates it is held at.
#[derive(Debug, Clone)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub teacher_id: String,
    pub student_ids: Vec<String>,
    pub location: GeoPoint,
}

impl Class {
    pub fn has_student(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}

/// One open attendance window. The `id` doubles as the QR payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub class_id: String,
    pub class_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }
}

/// An immutable attendance fact. Seeded history has no session or check-in time.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: String,
    pub session_id: Option<Uuid>,
    pub class_id: String,
    pub class_name: String,
    pub date: NaiveDate,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A one-shot message addressed to a single user.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub recipient: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}
