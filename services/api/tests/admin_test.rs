mod helpers;

use axum::http::{Method, StatusCode};
use helpers::*;
use serde_json::json;

fn class_stats<'a>(body: &'a serde_json::Value, class_id: &str) -> &'a serde_json::Value {
    body["per_class"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["class_id"] == class_id)
        .unwrap()
}

#[tokio::test]
async fn stats_summarise_the_seeded_school() {
    let app = make_test_app();

    let (status, body) = app.send(Method::GET, "/admin/stats", Some(ADMIN), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_students"], 4);
    assert_eq!(body["total_teachers"], 2);
    assert_eq!(body["total_classes"], 3);

    let maths = class_stats(&body, "class-1");
    assert_eq!(maths["present"], 1);
    assert_eq!(maths["absent"], 1);
    assert_eq!(maths["attendance_rate"], 50.0);
    assert_eq!(class_stats(&body, "class-3")["late"], 1);
    assert_eq!(class_stats(&body, "class-3")["attendance_rate"], 100.0);
}

#[tokio::test]
async fn stats_include_live_check_ins() {
    let app = make_test_app();
    let session_id = app.start_class_one(15).await;
    app.check_in(STUDENT_CITRA, &session_id).await;
    app.check_in(STUDENT_DEWI, &session_id).await;

    let (_, body) = app.send(Method::GET, "/admin/stats", Some(ADMIN), None).await;

    let maths = class_stats(&body, "class-1");
    assert_eq!(maths["present"], 3);
    assert_eq!(maths["attendance_rate"], 75.0);
}

#[tokio::test]
async fn stats_are_admin_only() {
    let app = make_test_app();

    let (status, _) = app.send(Method::GET, "/admin/stats", Some(TEACHER_INDAH), None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn class_location_updates_are_validated() {
    let app = make_test_app();
    let update = |class_id: &'static str, latitude: f64, longitude: f64| {
        (
            format!("/admin/classes/{class_id}/location"),
            json!({ "latitude": latitude, "longitude": longitude }),
        )
    };

    let (uri, body) = update("class-2", 91.0, 0.0);
    let (status, message) = app.send(Method::PUT, &uri, Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message, "Latitude must be between -90 and 90.");

    let (uri, body) = update("class-2", 0.0, -181.0);
    let (status, _) = app.send(Method::PUT, &uri, Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (uri, body) = update("class-9", 1.0, 1.0);
    let (status, _) = app.send(Method::PUT, &uri, Some(ADMIN), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (uri, body) = update("class-2", -7.25, 112.75);
    let (status, _) = app.send(Method::PUT, &uri, Some(STUDENT_BUDI), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn class_location_update_is_applied_and_confirmed() {
    let app = make_test_app();

    let (status, body) = app
        .send(
            Method::PUT,
            "/admin/classes/class-2/location",
            Some(ADMIN),
            Some(json!({ "latitude": -7.25, "longitude": 112.75 })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"]["latitude"], -7.25);
    assert_eq!(
        app.notification_messages(ADMIN).await,
        vec!["Class location updated.".to_string()]
    );

    let (_, classes) = app.send(Method::GET, "/classes", Some(ADMIN), None).await;
    let physics = classes
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == "class-2")
        .unwrap();
    assert_eq!(physics["location"]["longitude"], 112.75);
}

#[tokio::test]
async fn notifications_can_be_dismissed_once() {
    let app = make_test_app();
    app.send(
        Method::PUT,
        "/admin/classes/class-1/location",
        Some(ADMIN),
        Some(json!({ "latitude": 1.0, "longitude": 1.0 })),
    )
    .await;
    let (_, notifications) = app.send(Method::GET, "/notifications", Some(ADMIN), None).await;
    let id = notifications[0]["id"].as_u64().unwrap();
    let uri = format!("/notifications/{id}");

    let (status, _) = app.send(Method::DELETE, &uri, Some(STUDENT_BUDI), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.notification_messages(ADMIN).await.is_empty());
}
