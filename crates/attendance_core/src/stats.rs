//! crates/attendance_core/src/stats.rs
//!
//! Aggregate figures for the administrator overview.

use crate::domain::{AttendanceRecord, AttendanceStatus, Class, User, UserRole};

#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttendance {
    pub class_id: String,
    pub class_name: String,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    /// Percentage of records that were present or late. Zero with no records.
    pub attendance_rate: f64,
}

impl ClassAttendance {
    pub fn total(&self) -> usize {
        self.present + self.late + self.absent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceStats {
    pub total_students: usize,
    pub total_teachers: usize,
    pub total_classes: usize,
    pub per_class: Vec<ClassAttendance>,
}

impl AttendanceStats {
    /// Builds the overview. Classes appear in directory order, each counting
    /// only the records filed under its id.
    pub fn compute<'a>(
        users: &[User],
        classes: &[Class],
        history: impl IntoIterator<Item = &'a AttendanceRecord>,
    ) -> Self {
        let mut per_class: Vec<ClassAttendance> = classes
            .iter()
            .map(|class| ClassAttendance {
                class_id: class.id.clone(),
                class_name: class.name.clone(),
                present: 0,
                late: 0,
                absent: 0,
                attendance_rate: 0.0,
            })
            .collect();

        for record in history {
            if let Some(entry) = per_class.iter_mut().find(|c| c.class_id == record.class_id) {
                match record.status {
                    AttendanceStatus::Present => entry.present += 1,
                    AttendanceStatus::Late => entry.late += 1,
                    AttendanceStatus::Absent => entry.absent += 1,
                }
            }
        }

        for entry in &mut per_class {
            let total = entry.total();
            if total > 0 {
                entry.attendance_rate = (entry.present + entry.late) as f64 * 100.0 / total as f64;
            }
        }

        let count_role = |role: UserRole| users.iter().filter(|u| u.role == role).count();

        Self {
            total_students: count_role(UserRole::Student),
            total_teachers: count_role(UserRole::Teacher),
            total_classes: classes.len(),
            per_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn user(id: &str, role: UserRole) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.test"),
            role,
            student_number: None,
            teacher_number: None,
        }
    }

    fn class(id: &str) -> Class {
        Class {
            id: id.to_string(),
            name: format!("Class {id}"),
            teacher_id: "t".to_string(),
            student_ids: Vec::new(),
            location: GeoPoint {
                latitude: 0.0,
                longitude: 0.0,
            },
        }
    }

    fn record(class_id: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: "s".to_string(),
            session_id: None,
            class_id: class_id.to_string(),
            class_name: format!("Class {class_id}"),
            date: NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
            checked_in_at: None,
            status,
        }
    }

    #[test]
    fn counts_roles_and_rates_per_class() {
        let users = vec![
            user("a", UserRole::Student),
            user("b", UserRole::Student),
            user("c", UserRole::Teacher),
            user("d", UserRole::Admin),
        ];
        let classes = vec![class("x"), class("y")];
        let history = vec![
            record("x", AttendanceStatus::Present),
            record("x", AttendanceStatus::Late),
            record("x", AttendanceStatus::Absent),
            record("x", AttendanceStatus::Present),
            record("unknown", AttendanceStatus::Present),
        ];

        let stats = AttendanceStats::compute(&users, &classes, &history);

        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_teachers, 1);
        assert_eq!(stats.total_classes, 2);
        assert_eq!(stats.per_class[0].total(), 4);
        assert_eq!(stats.per_class[0].attendance_rate, 75.0);
        assert_eq!(stats.per_class[1].total(), 0);
        assert_eq!(stats.per_class[1].attendance_rate, 0.0);
    }
}
