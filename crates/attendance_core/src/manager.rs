//! crates/attendance_core/src/manager.rs
//!
//! The session/check-in state machine. Holds the single active session, the set
//! of students checked into it, and the attendance log.
//!
//! Every operation takes the caller's `now` so one clock reading drives all of
//! the checks made by a single call.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{AttendanceRecord, AttendanceSession, AttendanceStatus, Class};

/// Why a check-in was refused. The messages are shown to the student as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckInError {
    #[error("There is no active attendance session.")]
    NoActiveSession,
    #[error("This QR code is not valid for the current session.")]
    InvalidCode,
    #[error("Attendance time for this session has ended.")]
    SessionEnded,
    #[error("You are already recorded present for this session.")]
    AlreadyCheckedIn,
}

/// Tunables for the state machine.
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    /// Check-ins strictly later than `start_time + late_after` are marked late.
    pub late_after: Duration,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            late_after: Duration::minutes(2),
        }
    }
}

#[derive(Debug)]
pub struct AttendanceSessionManager {
    policy: AttendancePolicy,
    active_session: Option<AttendanceSession>,
    checked_in: HashSet<String>,
    /// Newest first.
    history: VecDeque<AttendanceRecord>,
}

impl AttendanceSessionManager {
    pub fn new(policy: AttendancePolicy) -> Self {
        Self::with_history(policy, Vec::new())
    }

    /// Creates a manager whose log starts with `history`, newest first.
    pub fn with_history(policy: AttendancePolicy, history: Vec<AttendanceRecord>) -> Self {
        Self {
            policy,
            active_session: None,
            checked_in: HashSet::new(),
            history: history.into(),
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    /// Opens a new session for `class`. Any session already running is closed
    /// and returned alongside the new one.
    pub fn start_session(
        &mut self,
        class: &Class,
        duration_minutes: u32,
        now: DateTime<Utc>,
    ) -> (AttendanceSession, Option<AttendanceSession>) {
        let replaced = self.active_session.take();
        if let Some(previous) = &replaced {
            info!(
                "Replacing active session {} for class {}",
                previous.id, previous.class_id
            );
        }

        let session = AttendanceSession {
            id: Uuid::new_v4(),
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            start_time: now,
            end_time: now + Duration::minutes(i64::from(duration_minutes)),
            is_active: true,
        };
        self.active_session = Some(session.clone());
        self.checked_in.clear();

        info!(
            "Session {} started for class {} until {}",
            session.id, session.class_id, session.end_time
        );
        (session, replaced)
    }

    /// Closes the active session. Calling it with nothing active is a no-op.
    pub fn stop_session(&mut self) -> Option<AttendanceSession> {
        let stopped = self.active_session.take();
        if let Some(session) = &stopped {
            info!("Session {} stopped", session.id);
        }
        stopped
    }

    /// Records `student_id` against the session identified by `session_code`.
    ///
    /// The code must be the session id exactly as issued, ignoring surrounding
    /// whitespace.
    ///
    /// Checks run in a fixed order and the first failure wins. An expired
    /// session is closed by the attempt that discovers it, before the
    /// duplicate check is reached.
    pub fn check_in(
        &mut self,
        session_code: &str,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, CheckInError> {
        let session = match &self.active_session {
            Some(session) if session.is_active => session,
            _ => return Err(CheckInError::NoActiveSession),
        };

        if session_code.trim() != session.id.to_string() {
            debug!("Rejected code '{}' for session {}", session_code, session.id);
            return Err(CheckInError::InvalidCode);
        }

        if now > session.end_time {
            self.stop_session();
            return Err(CheckInError::SessionEnded);
        }

        if self.checked_in.contains(student_id) {
            return Err(CheckInError::AlreadyCheckedIn);
        }

        // A cutoff past the representable range is never reached.
        let status = match session.start_time.checked_add_signed(self.policy.late_after) {
            Some(cutoff) if now > cutoff => AttendanceStatus::Late,
            _ => AttendanceStatus::Present,
        };

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            session_id: Some(session.id),
            class_id: session.class_id.clone(),
            class_name: session.class_name.clone(),
            date: now.date_naive(),
            checked_in_at: Some(now),
            status,
        };

        self.checked_in.insert(student_id.to_string());
        self.history.push_front(record.clone());

        info!(
            "Student {} checked into session {} as {}",
            student_id,
            session.id,
            status.as_str()
        );
        Ok(record)
    }

    /// Stops the active session if its end time has passed.
    pub fn expire_if_due(&mut self, now: DateTime<Utc>) -> Option<AttendanceSession> {
        let due = matches!(&self.active_session, Some(session) if now > session.end_time);
        if due {
            self.stop_session()
        } else {
            None
        }
    }

    /// Time left in the active session, never negative.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.active_session
            .as_ref()
            .map(|session| (session.end_time - now).max(Duration::zero()))
    }

    pub fn active_session(&self) -> Option<&AttendanceSession> {
        self.active_session.as_ref()
    }

    pub fn checked_in(&self) -> &HashSet<String> {
        &self.checked_in
    }

    pub fn is_checked_in(&self, student_id: &str) -> bool {
        self.checked_in.contains(student_id)
    }

    pub fn history(&self) -> &VecDeque<AttendanceRecord> {
        &self.history
    }

    pub fn history_for<'a>(
        &'a self,
        student_id: &'a str,
    ) -> impl Iterator<Item = &'a AttendanceRecord> + 'a {
        self.history
            .iter()
            .filter(move |record| record.student_id == student_id)
    }
}

impl Default for AttendanceSessionManager {
    fn default() -> Self {
        Self::new(AttendancePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoPoint;
    use chrono::TimeZone;

    fn class_one() -> Class {
        Class {
            id: "class-1".to_string(),
            name: "Matematika Lanjutan".to_string(),
            teacher_id: "user-5".to_string(),
            student_ids: vec!["user-1".into(), "user-2".into(), "user-3".into()],
            location: GeoPoint {
                latitude: -6.2,
                longitude: 106.816666,
            },
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 25, 8, 0, 0).unwrap()
    }

    fn started() -> (AttendanceSessionManager, AttendanceSession) {
        let mut manager = AttendanceSessionManager::default();
        let (session, replaced) = manager.start_session(&class_one(), 15, t0());
        assert!(replaced.is_none());
        (manager, session)
    }

    #[test]
    fn start_session_sets_window_and_empty_check_ins() {
        let (manager, session) = started();

        assert_eq!(session.class_id, "class-1");
        assert_eq!(session.start_time, t0());
        assert_eq!(session.end_time, t0() + Duration::minutes(15));
        assert!(session.is_active);
        assert!(manager.checked_in().is_empty());
        assert_eq!(manager.active_session(), Some(&session));
    }

    #[test]
    fn early_check_in_is_present() {
        let (mut manager, session) = started();

        let record = manager
            .check_in(&session.id.to_string(), "user-1", t0() + Duration::seconds(30))
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.class_name, "Matematika Lanjutan");
        assert_eq!(record.date, t0().date_naive());
        assert_eq!(manager.history()[0].student_id, "user-1");
        assert!(manager.is_checked_in("user-1"));
    }

    #[test]
    fn second_check_in_is_refused_and_history_grows_once() {
        let (mut manager, session) = started();
        let code = session.id.to_string();

        manager
            .check_in(&code, "user-1", t0() + Duration::seconds(30))
            .unwrap();
        let second = manager.check_in(&code, "user-1", t0() + Duration::minutes(1));

        assert_eq!(second, Err(CheckInError::AlreadyCheckedIn));
        assert_eq!(manager.history().len(), 1);
    }

    #[test]
    fn check_in_after_two_minutes_is_late() {
        let (mut manager, session) = started();

        let record = manager
            .check_in(&session.id.to_string(), "user-2", t0() + Duration::minutes(3))
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[test]
    fn check_in_exactly_at_late_boundary_is_present() {
        let (mut manager, session) = started();

        let record = manager
            .check_in(&session.id.to_string(), "user-2", t0() + Duration::minutes(2))
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);

        let record = manager
            .check_in(
                &session.id.to_string(),
                "user-3",
                t0() + Duration::minutes(2) + Duration::milliseconds(1),
            )
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[test]
    fn check_in_past_end_time_closes_session() {
        let (mut manager, session) = started();

        let result = manager.check_in(
            &session.id.to_string(),
            "user-3",
            t0() + Duration::minutes(16),
        );

        assert_eq!(result, Err(CheckInError::SessionEnded));
        assert!(manager.active_session().is_none());
        assert!(manager.history().is_empty());
    }

    #[test]
    fn check_in_exactly_at_end_time_is_accepted() {
        let (mut manager, session) = started();

        let result = manager.check_in(&session.id.to_string(), "user-3", session.end_time);

        assert!(result.is_ok());
        assert!(manager.active_session().is_some());
    }

    #[test]
    fn expiry_wins_over_duplicate_check() {
        let (mut manager, session) = started();
        let code = session.id.to_string();
        manager.check_in(&code, "user-1", t0()).unwrap();

        let result = manager.check_in(&code, "user-1", t0() + Duration::minutes(20));

        assert_eq!(result, Err(CheckInError::SessionEnded));
        assert!(manager.active_session().is_none());
    }

    #[test]
    fn wrong_code_changes_nothing() {
        let (mut manager, session) = started();

        let result = manager.check_in("wrong-id", "user-4", t0() + Duration::minutes(1));

        assert_eq!(result, Err(CheckInError::InvalidCode));
        assert_eq!(manager.active_session(), Some(&session));
        assert!(manager.checked_in().is_empty());
        assert!(manager.history().is_empty());
    }

    #[test]
    fn wrong_code_is_reported_before_expiry() {
        let (mut manager, _session) = started();

        let result = manager.check_in(
            &Uuid::new_v4().to_string(),
            "user-1",
            t0() + Duration::hours(1),
        );

        assert_eq!(result, Err(CheckInError::InvalidCode));
        assert!(manager.active_session().is_some());
    }

    #[test]
    fn check_in_without_session_is_refused() {
        let mut manager = AttendanceSessionManager::default();

        let result = manager.check_in(&Uuid::new_v4().to_string(), "user-1", t0());

        assert_eq!(result, Err(CheckInError::NoActiveSession));
    }

    #[test]
    fn inactive_session_is_treated_as_absent() {
        let (mut manager, session) = started();
        if let Some(active) = manager.active_session.as_mut() {
            active.is_active = false;
        }

        let result = manager.check_in(&session.id.to_string(), "user-1", t0());

        assert_eq!(result, Err(CheckInError::NoActiveSession));
    }

    #[test]
    fn new_session_resets_check_ins() {
        let (mut manager, session) = started();
        let code = session.id.to_string();
        manager.check_in(&code, "user-1", t0()).unwrap();
        manager.check_in(&code, "user-2", t0()).unwrap();

        let (next, replaced) =
            manager.start_session(&class_one(), 10, t0() + Duration::minutes(5));

        assert_eq!(replaced, Some(session.clone()));
        assert!(manager.checked_in().is_empty());
        assert_ne!(next.id, session.id);
        assert_eq!(
            manager.check_in(&code, "user-1", t0() + Duration::minutes(5)),
            Err(CheckInError::InvalidCode)
        );
        assert!(manager
            .check_in(&next.id.to_string(), "user-1", t0() + Duration::minutes(5))
            .is_ok());
    }

    #[test]
    fn stop_session_is_idempotent() {
        let (mut manager, session) = started();

        assert_eq!(manager.stop_session(), Some(session));
        assert_eq!(manager.stop_session(), None);
        assert!(manager.active_session().is_none());
    }

    #[test]
    fn expire_if_due_only_fires_after_end() {
        let (mut manager, session) = started();

        assert!(manager.expire_if_due(session.end_time).is_none());
        assert_eq!(
            manager.expire_if_due(session.end_time + Duration::seconds(1)),
            Some(session)
        );
        assert!(manager.active_session().is_none());
    }

    #[test]
    fn remaining_is_clamped_at_zero() {
        let (manager, _session) = started();

        assert_eq!(manager.remaining(t0()), Some(Duration::minutes(15)));
        assert_eq!(
            manager.remaining(t0() + Duration::minutes(30)),
            Some(Duration::zero())
        );
        assert_eq!(AttendanceSessionManager::default().remaining(t0()), None);
    }

    #[test]
    fn history_is_newest_first_and_filterable() {
        let (mut manager, session) = started();
        let code = session.id.to_string();
        manager.check_in(&code, "user-1", t0()).unwrap();
        manager.check_in(&code, "user-2", t0() + Duration::minutes(1)).unwrap();

        assert_eq!(manager.history()[0].student_id, "user-2");
        assert_eq!(manager.history_for("user-1").count(), 1);
        assert_eq!(manager.history_for("user-4").count(), 0);
    }

    #[test]
    fn custom_late_threshold_is_honoured() {
        let mut manager = AttendanceSessionManager::new(AttendancePolicy {
            late_after: Duration::seconds(30),
        });
        let (session, _) = manager.start_session(&class_one(), 5, t0());

        let record = manager
            .check_in(&session.id.to_string(), "user-1", t0() + Duration::seconds(45))
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Late);
    }

    #[test]
    fn unreachable_late_cutoff_keeps_everyone_present() {
        let mut manager = AttendanceSessionManager::new(AttendancePolicy {
            late_after: Duration::days(100_000_000),
        });
        let (session, _) = manager.start_session(&class_one(), 5, t0());

        let record = manager
            .check_in(&session.id.to_string(), "user-1", t0() + Duration::minutes(4))
            .unwrap();

        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[test]
    fn only_the_issued_form_of_the_code_is_accepted() {
        let (mut manager, session) = started();
        let issued = session.id.to_string();
        let now = t0() + Duration::seconds(10);

        for variant in [
            issued.to_uppercase(),
            format!("{{{issued}}}"),
            format!("urn:uuid:{issued}"),
            session.id.simple().to_string(),
        ] {
            assert_eq!(
                manager.check_in(&variant, "user-1", now),
                Err(CheckInError::InvalidCode),
                "{variant}"
            );
        }

        assert!(manager.check_in(&format!("  {issued}\n"), "user-1", now).is_ok());
    }
}
