pub mod domain;
pub mod manager;
pub mod ports;
pub mod stats;

pub use domain::{
    AttendanceRecord, AttendanceSession, AttendanceStatus, Class, GeoPoint, Notification,
    Severity, User, UserRole,
};
pub use manager::{AttendancePolicy, AttendanceSessionManager, CheckInError};
pub use ports::{
    ClassDirectory, Clock, GeolocationService, NotificationSink, PortError, PortResult,
    QrDecodeService, UserDirectory,
};
pub use stats::{AttendanceStats, ClassAttendance};
