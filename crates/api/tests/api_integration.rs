//! API integration tests.
//!
//! These tests drive the full router over a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use foodtrack_api::{AppState, app};
use foodtrack_common::config::{AuthConfig, Config, DatabaseConfig, PushConfig, ServerConfig};
use foodtrack_core::{PushDeliveryError, PushTransport, SigningKey};
use foodtrack_db::entities::{
    notification::{self, NotificationCategory},
    notification_preference::{self, DEFAULT_BREAKFAST_TIME, DEFAULT_DINNER_TIME, DEFAULT_LUNCH_TIME},
    push_subscription,
};
use jsonwebtoken::{EncodingKey, Header};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value as DbValue};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";
const PUBLIC_KEY: &str = "BPublicKeyForTests";

/// Transport that accepts everything.
struct AcceptAll;

#[async_trait]
impl PushTransport for AcceptAll {
    async fn send(
        &self,
        _subscription: &push_subscription::Model,
        _payload: &[u8],
        _key: SigningKey<'_>,
    ) -> Result<(), PushDeliveryError> {
        Ok(())
    }
}

fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5252,
            url: "https://foodtrack.example.com".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: SECRET.to_string(),
        },
        push: PushConfig {
            vapid_public_key: PUBLIC_KEY.to_string(),
            ..PushConfig::default()
        },
    }
}

fn create_test_router(db: MockDatabase) -> Router {
    let state = AppState::new(
        Arc::new(db.into_connection()),
        &create_test_config(),
        Arc::new(AcceptAll),
    );
    app(state)
}

fn empty_db() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn token_for(user_id: i64) -> String {
    let claims = json!({
        "sub": user_id,
        "exp": Utc::now().timestamp() + 3600,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn authed(method: &str, uri: &str, user_id: i64) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)))
}

fn json_request(method: &str, uri: &str, user_id: i64, body: &Value) -> Request<Body> {
    authed(method, uri, user_id)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, DbValue> {
    maplit::btreemap! { "num_items" => DbValue::BigInt(Some(n)) }
}

fn notification_row(id: i64, user_id: i64) -> notification::Model {
    notification::Model {
        id,
        user_id,
        title: "Group activity".to_string(),
        body: "Someone posted in your group".to_string(),
        category: NotificationCategory::Group,
        related_type: Some("group".to_string()),
        related_id: Some(9),
        is_read: false,
        read_at: None,
        is_pushed: false,
        created_at: Utc::now().into(),
    }
}

fn preference_row(user_id: i64, push_enabled: bool) -> notification_preference::Model {
    notification_preference::Model {
        id: 1,
        user_id,
        meal_reminders: true,
        water_reminders: true,
        progress_updates: true,
        group_activity: true,
        weekly_reports: true,
        breakfast_time: DEFAULT_BREAKFAST_TIME.to_string(),
        lunch_time: DEFAULT_LUNCH_TIME.to_string(),
        dinner_time: DEFAULT_DINNER_TIME.to_string(),
        push_enabled,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/notifications/unread-count")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let app = create_test_router(empty_db());
    let forged = jsonwebtoken::encode(
        &Header::default(),
        &json!({ "sub": 1, "exp": Utc::now().timestamp() + 3600 }),
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/notifications/unread-count")
                .header(header::AUTHORIZATION, format!("Bearer {forged}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vapid_key_is_public() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/notifications/vapid-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "publicKey": PUBLIC_KEY }));
}

#[tokio::test]
async fn test_unread_count() {
    let app = create_test_router(empty_db().append_query_results([[count_row(4)]]));

    let response = app
        .oneshot(
            authed("GET", "/api/notifications/unread-count", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "count": 4 }));
}

#[tokio::test]
async fn test_list_reports_pagination() {
    let app = create_test_router(
        empty_db()
            .append_query_results([[count_row(3)]])
            .append_query_results([[notification_row(2, 7)]]),
    );

    let response = app
        .oneshot(
            authed("GET", "/api/notifications/get?page=2&per_page=1", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pages"], 3);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["notifications"][0]["id"], 2);
    assert_eq!(body["notifications"][0]["category"], "group");
    assert_eq!(body["notifications"][0]["isRead"], false);
}

#[tokio::test]
async fn test_list_with_huge_page_is_empty() {
    let app = create_test_router(empty_db().append_query_results([[count_row(3)]]));

    let response = app
        .oneshot(
            authed(
                "GET",
                "/api/notifications/get?page=9223372036854775807&per_page=100",
                7,
            )
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["notifications"], json!([]));
    assert_eq!(body["total"], 3);
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn test_mark_read_of_unknown_notification_is_not_found() {
    let app = create_test_router(
        empty_db().append_query_results([Vec::<notification::Model>::new()]),
    );

    let response = app
        .oneshot(
            authed("POST", "/api/notifications/read/99", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_all_reports_count() {
    let app = create_test_router(empty_db().append_exec_results([MockExecResult {
        last_insert_id: 0,
        rows_affected: 5,
    }]));

    let response = app
        .oneshot(
            authed("POST", "/api/notifications/read-all", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 5);
}

#[tokio::test]
async fn test_delete_foreign_notification_is_not_found() {
    let app = create_test_router(empty_db().append_exec_results([MockExecResult {
        last_insert_id: 0,
        rows_affected: 0,
    }]));

    let response = app
        .oneshot(
            authed("DELETE", "/api/notifications/12", 8)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_preferences_creates_defaults() {
    let app = create_test_router(
        empty_db()
            .append_query_results([Vec::<notification_preference::Model>::new()])
            .append_query_results([[preference_row(7, false)]]),
    );

    let response = app
        .oneshot(
            authed("GET", "/api/notifications/preferences", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["preferences"]["pushEnabled"], false);
    assert_eq!(body["preferences"]["breakfastTime"], DEFAULT_BREAKFAST_TIME);
    assert!(body.get("message").is_none());
}

#[tokio::test]
async fn test_put_preferences_applies_partial_update() {
    let updated = notification_preference::Model {
        group_activity: false,
        ..preference_row(7, true)
    };
    let app = create_test_router(
        empty_db()
            .append_query_results([[preference_row(7, true)]])
            .append_query_results([[updated]]),
    );

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/notifications/preferences",
            7,
            &json!({ "groupActivity": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Preferences saved");
    assert_eq!(body["preferences"]["groupActivity"], false);
    assert_eq!(body["preferences"]["mealReminders"], true);
}

#[tokio::test]
async fn test_put_preferences_rejects_bad_time() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/notifications/preferences",
            7,
            &json!({ "lunchTime": "25:99" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_subscribe_without_keys_is_rejected() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/notifications/subscribe",
            7,
            &json!({ "endpoint": "https://push.example.com/abc" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_subscribe_saves_and_enables_push() {
    let saved = push_subscription::Model {
        id: 3,
        user_id: 7,
        endpoint: "https://push.example.com/abc".to_string(),
        p256dh: "p256dh-key".to_string(),
        auth: "auth-secret".to_string(),
        user_agent: Some("integration".to_string()),
        created_at: Utc::now().into(),
        updated_at: None,
    };
    let app = create_test_router(
        empty_db()
            .append_query_results([Vec::<push_subscription::Model>::new()])
            .append_query_results([[saved]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]),
    );

    let request = authed("POST", "/api/notifications/subscribe", 7)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "integration")
        .body(Body::from(
            json!({
                "endpoint": "https://push.example.com/abc",
                "keys": { "p256dh": "p256dh-key", "auth": "auth-secret" }
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["message"], "Subscription saved");
}

#[tokio::test]
async fn test_unsubscribe_without_body_removes_everything() {
    let app = create_test_router(
        empty_db()
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .append_query_results([[count_row(0)]]),
    );

    let response = app
        .oneshot(
            authed("DELETE", "/api/notifications/unsubscribe", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["removed"], 2);
}

#[tokio::test]
async fn test_test_notification_reports_diagnostics() {
    let created = notification::Model {
        category: NotificationCategory::System,
        ..notification_row(11, 7)
    };
    let app = create_test_router(
        empty_db()
            // diagnostics: preferences, subscription count
            .append_query_results([Vec::<notification_preference::Model>::new()])
            .append_query_results([[count_row(0)]])
            // dispatch: insert, preference gate, unread count
            .append_query_results([[created]])
            .append_query_results([Vec::<notification_preference::Model>::new()])
            .append_query_results([[count_row(1)]]),
    );

    let response = app
        .oneshot(
            authed("POST", "/api/notifications/test", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["notification"]["id"], 11);
    assert_eq!(body["notification"]["category"], "system");
    assert_eq!(
        body["debug"],
        json!({
            "vapid_configured": false,
            "push_enabled": false,
            "subscriptions_count": 0,
            "is_pushed": false,
        })
    );
}

#[tokio::test]
async fn test_websocket_requires_token() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_websocket_rejects_bad_token() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws?token=not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_router(empty_db());

    let response = app
        .oneshot(
            authed("GET", "/api/notifications/nope/deeper", 7)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
