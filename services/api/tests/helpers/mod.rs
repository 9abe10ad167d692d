#![allow(dead_code)]

use api_lib::{
    adapters::ManualClock,
    config::Config,
    web::{router, state::AppState},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // not axum::ServiceExt

pub const STUDENT_BUDI: &str = "user-1";
pub const STUDENT_CITRA: &str = "user-2";
pub const STUDENT_DEWI: &str = "user-3";
pub const STUDENT_EKO: &str = "user-4";
pub const TEACHER_INDAH: &str = "user-5";
pub const TEACHER_BAMBANG: &str = "user-6";
pub const ADMIN: &str = "user-7";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 25, 8, 0, 0).unwrap()
}

/// Builds the full router over a fresh seeded state and a manual clock.
/// Notifications never auto-expire so assertions are not timing dependent.
pub fn make_test_app() -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "NOTIFICATION_TTL_SECS" => Some("0".to_string()),
        _ => None,
    })
    .expect("default config");
    let clock = Arc::new(ManualClock::new(start_time()));
    let state = Arc::new(AppState::new(Arc::new(config), clock.clone()).expect("app state"));

    TestApp {
        router: router(state.clone()),
        state,
        clock,
    }
}

impl TestApp {
    /// Sends one request as `user` (via the `x-user-id` header) and returns the
    /// status with the body parsed as JSON, or as a JSON string when it is plain text.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Starts a session for class-1 as its teacher and returns the session id.
    pub async fn start_class_one(&self, duration_minutes: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/sessions",
                Some(TEACHER_INDAH),
                Some(serde_json::json!({
                    "class_id": "class-1",
                    "duration_minutes": duration_minutes,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Checks in from Jakarta with the given payload.
    pub async fn check_in(&self, student: &str, payload: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/check-in",
                Some(student),
                Some(serde_json::json!({
                    "qr_payload": payload,
                    "latitude": -6.2,
                    "longitude": 106.816666,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    pub async fn notification_messages(&self, user: &str) -> Vec<String> {
        let (status, body) = self
            .send(Method::GET, "/notifications", Some(user), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body.as_array()
            .unwrap()
            .iter()
            .map(|n| n["message"].as_str().unwrap().to_string())
            .collect()
    }
}
