//! services/api/src/adapters/directory.rs
//!
//! In-memory user and class directory, seeded with the demo school.
//! It implements both the `UserDirectory` and `ClassDirectory` ports.

use async_trait::async_trait;
use attendance_core::domain::{
    AttendanceRecord, AttendanceStatus, Class, GeoPoint, User, UserRole,
};
use attendance_core::ports::{ClassDirectory, PortError, PortResult, UserDirectory};
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Read-mostly directory. Only class locations can change after startup.
pub struct InMemoryDirectory {
    users: Vec<User>,
    classes: RwLock<Vec<Class>>,
}

impl InMemoryDirectory {
    pub fn new(users: Vec<User>, classes: Vec<Class>) -> Self {
        Self {
            users,
            classes: RwLock::new(classes),
        }
    }

    /// The fixture school: four students, two teachers, one admin, three classes.
    pub fn seeded() -> Self {
        Self::new(seed_users(), seed_classes())
    }
}

//=========================================================================================
// Port Implementations
//=========================================================================================

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn get_user(&self, user_id: &str) -> PortResult<User> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("user {user_id}")))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(self.users.clone())
    }
}

#[async_trait]
impl ClassDirectory for InMemoryDirectory {
    async fn get_class(&self, class_id: &str) -> PortResult<Class> {
        self.classes
            .read()
            .await
            .iter()
            .find(|c| c.id == class_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("class {class_id}")))
    }

    async fn list_classes(&self) -> PortResult<Vec<Class>> {
        Ok(self.classes.read().await.clone())
    }

    async fn update_class_location(
        &self,
        class_id: &str,
        location: GeoPoint,
    ) -> PortResult<Class> {
        let mut classes = self.classes.write().await;
        let class = classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| PortError::NotFound(format!("class {class_id}")))?;
        class.location = location;
        info!(
            "Location of class {} set to ({}, {})",
            class_id, location.latitude, location.longitude
        );
        Ok(class.clone())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn user(id: &str, name: &str, email: &str, role: UserRole, number: Option<&str>) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role,
        student_number: number.filter(|_| role == UserRole::Student).map(str::to_string),
        teacher_number: number.filter(|_| role == UserRole::Teacher).map(str::to_string),
    }
}

pub fn seed_users() -> Vec<User> {
    vec![
        user("user-1", "Budi Hartono", "budi@sekolah.id", UserRole::Student, Some("S001")),
        user("user-2", "Citra Lestari", "citra@sekolah.id", UserRole::Student, Some("S002")),
        user("user-3", "Dewi Anggraini", "dewi@sekolah.id", UserRole::Student, Some("S003")),
        user("user-4", "Eko Prasetyo", "eko@sekolah.id", UserRole::Student, Some("S004")),
        user("user-5", "Dr. Indah Permata", "indah@sekolah.id", UserRole::Teacher, Some("T01")),
        user("user-6", "Prof. Bambang Wijoyo", "bambang@sekolah.id", UserRole::Teacher, Some("T02")),
        user("user-7", "Kepala Sekolah", "admin@sekolah.id", UserRole::Admin, None),
    ]
}

pub fn seed_classes() -> Vec<Class> {
    // Jakarta
    let campus = GeoPoint {
        latitude: -6.2,
        longitude: 106.816666,
    };
    let class = |id: &str, name: &str, teacher: &str, students: &[&str]| Class {
        id: id.to_string(),
        name: name.to_string(),
        teacher_id: teacher.to_string(),
        student_ids: students.iter().map(|s| s.to_string()).collect(),
        location: campus,
    };

    vec![
        class("class-1", "Matematika Lanjutan", "user-5", &["user-1", "user-2", "user-3"]),
        class("class-2", "Fisika Kuantum", "user-6", &["user-2", "user-3", "user-4"]),
        class("class-3", "Sejarah Dunia", "user-5", &["user-1", "user-4"]),
    ]
}

/// Historical records the attendance log starts with.
pub fn seed_history() -> Vec<AttendanceRecord> {
    let record = |student: &str, day: u32, class_id: &str, class_name: &str, status| {
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: student.to_string(),
            session_id: None,
            class_id: class_id.to_string(),
            class_name: class_name.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap_or_default(),
            checked_in_at: None,
            status,
        }
    };

    vec![
        record("user-1", 20, "class-1", "Matematika Lanjutan", AttendanceStatus::Present),
        record("user-2", 21, "class-2", "Fisika Kuantum", AttendanceStatus::Present),
        record("user-1", 22, "class-1", "Matematika Lanjutan", AttendanceStatus::Absent),
        record("user-3", 23, "class-2", "Fisika Kuantum", AttendanceStatus::Present),
        record("user-4", 24, "class-3", "Sejarah Dunia", AttendanceStatus::Late),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_directory_resolves_users_and_classes() {
        let directory = InMemoryDirectory::seeded();

        let teacher = directory.get_user("user-5").await.unwrap();
        assert_eq!(teacher.role, UserRole::Teacher);
        assert_eq!(teacher.teacher_number.as_deref(), Some("T01"));
        assert!(teacher.student_number.is_none());

        let class = directory.get_class("class-2").await.unwrap();
        assert!(class.has_student("user-4"));
        assert!(!class.has_student("user-1"));

        assert!(matches!(
            directory.get_user("user-99").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn updating_a_location_is_visible_to_later_reads() {
        let directory = InMemoryDirectory::seeded();
        let location = GeoPoint::new(-7.25, 112.75).unwrap();

        directory.update_class_location("class-3", location).await.unwrap();

        assert_eq!(directory.get_class("class-3").await.unwrap().location, location);
        assert!(matches!(
            directory.update_class_location("class-9", location).await,
            Err(PortError::NotFound(_))
        ));
    }
}
