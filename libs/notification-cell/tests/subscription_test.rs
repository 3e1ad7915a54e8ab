// Subscription endpoint tests: auth gating and stream hand-off.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;

use notification_cell::{create_notification_router, ChangeNotifier, SubscriberScope};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn test_app(config: &TestConfig, notifier: ChangeNotifier) -> Router {
    create_notification_router(config.to_arc(), notifier)
}

fn bearer(config: &TestConfig, user: &TestUser) -> String {
    format!(
        "Bearer {}",
        JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(1))
    )
}

#[tokio::test]
async fn subscriptions_without_a_token_are_unauthorized() {
    let config = TestConfig::default();
    let app = test_app(&config, ChangeNotifier::new());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/doctors/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn doctor_subscription_opens_an_event_stream() {
    let config = TestConfig::default();
    let notifier = ChangeNotifier::new();
    let app = test_app(&config, notifier.clone());
    let doctor_id = Uuid::new_v4();
    let user = TestUser::doctor("doctor@example.com");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/doctors/{}", doctor_id))
                .header("Authorization", bearer(&config, &user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    // The handler registered a live channel for the doctor's scope.
    assert!(notifier
        .active_scopes()
        .await
        .contains(&SubscriberScope::Doctor(doctor_id)));
}

#[tokio::test]
async fn global_stream_is_served_as_server_sent_events() {
    let config = TestConfig::default();
    let app = test_app(&config, ChangeNotifier::new());
    let user = TestUser::patient("patient@example.com");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/events")
                .header("Authorization", bearer(&config, &user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
}
