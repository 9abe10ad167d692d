//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) the attendance core depends on.
//! Directories, scanning, location and notification delivery all live behind
//! these traits so the core never touches a concrete implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Class, GeoPoint, Notification, Severity, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: &str) -> PortResult<User>;

    async fn list_users(&self) -> PortResult<Vec<User>>;
}

#[async_trait]
pub trait ClassDirectory: Send + Sync {
    async fn get_class(&self, class_id: &str) -> PortResult<Class>;

    async fn list_classes(&self) -> PortResult<Vec<Class>>;

    async fn update_class_location(&self, class_id: &str, location: GeoPoint)
        -> PortResult<Class>;
}

#[async_trait]
pub trait QrDecodeService: Send + Sync {
    /// Turns a raw scan into the opaque session code it carries.
    async fn decode(&self, raw: &str) -> PortResult<String>;
}

#[async_trait]
pub trait GeolocationService: Send + Sync {
    /// Single-shot position request. Failures are not retried.
    async fn current_position(&self) -> PortResult<GeoPoint>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Queues a message for `recipient`. Display and expiry are the sink's concern.
    async fn notify(&self, recipient: &str, message: &str, severity: Severity) -> Notification;

    async fn list_for(&self, recipient: &str) -> Vec<Notification>;

    /// Removes a notification early. Returns false if it was already gone.
    async fn dismiss(&self, recipient: &str, notification_id: u64) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
