//! Notifications endpoints.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::Response,
    routing::{delete, get, post},
};
use foodtrack_common::AppResult;
use foodtrack_core::{
    NewNotification, NotificationPage, NotificationView, PreferencesView, SubscribeInput,
    UpdatePreferencesInput,
};
use foodtrack_db::entities::notification::NotificationCategory;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{MessageResponse, created},
};

/// Pagination query.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// List the caller's notifications, newest first.
async fn list_notifications(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<NotificationPage>> {
    let page = state
        .notification_service
        .list(user_id, query.page, query.per_page)
        .await?;
    Ok(Json(page))
}

/// Unread count response.
#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

async fn unread_count(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UnreadCountResponse>> {
    let count = state.notification_service.unread_count(user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

async fn mark_as_read(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<MessageResponse> {
    state.notification_service.mark_read(id, user_id).await?;
    Ok(MessageResponse::new("Marked as read"))
}

/// Mark all as read response.
#[derive(Serialize)]
pub struct MarkAllAsReadResponse {
    pub message: &'static str,
    pub count: u64,
}

async fn mark_all_as_read(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllAsReadResponse>> {
    let count = state.notification_service.mark_all_read(user_id).await?;
    Ok(Json(MarkAllAsReadResponse {
        message: "All notifications marked as read",
        count,
    }))
}

async fn delete_notification(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<MessageResponse> {
    state.notification_service.delete(id, user_id).await?;
    Ok(MessageResponse::new("Notification deleted"))
}

/// Preferences response.
#[derive(Serialize)]
pub struct PreferencesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub preferences: PreferencesView,
}

async fn get_preferences(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<PreferencesResponse>> {
    let preferences = state.preference_service.get_or_create(user_id).await?;
    Ok(Json(PreferencesResponse {
        message: None,
        preferences: PreferencesView::from(&preferences),
    }))
}

async fn update_preferences(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdatePreferencesInput>,
) -> AppResult<Json<PreferencesResponse>> {
    let preferences = state.preference_service.update(user_id, input).await?;
    Ok(Json(PreferencesResponse {
        message: Some("Preferences saved"),
        preferences: PreferencesView::from(&preferences),
    }))
}

async fn subscribe(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SubscribeInput>,
) -> AppResult<Response> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);

    state
        .push_notification_service
        .subscribe(user_id, input, user_agent)
        .await?;

    Ok(created(MessageResponse::new("Subscription saved")))
}

/// Optional unsubscribe body.
#[derive(Debug, Deserialize)]
struct UnsubscribeInput {
    endpoint: Option<String>,
}

/// Unsubscribe response.
#[derive(Serialize)]
pub struct UnsubscribeResponse {
    pub message: &'static str,
    pub removed: u64,
}

/// Remove one endpoint, or all of them when the body names none.
async fn unsubscribe(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<UnsubscribeResponse>> {
    let endpoint = serde_json::from_slice::<UnsubscribeInput>(&body)
        .ok()
        .and_then(|input| input.endpoint)
        .filter(|endpoint| !endpoint.is_empty());

    let removed = state
        .push_notification_service
        .unsubscribe(user_id, endpoint.as_deref())
        .await?;

    Ok(Json(UnsubscribeResponse {
        message: "Subscription removed",
        removed,
    }))
}

/// VAPID public key response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

async fn vapid_key(State(state): State<AppState>) -> Json<VapidKeyResponse> {
    Json(VapidKeyResponse {
        public_key: state.push_notification_service.public_key().to_string(),
    })
}

/// Delivery diagnostics for the test endpoint.
#[derive(Serialize)]
pub struct TestDebug {
    pub vapid_configured: bool,
    pub push_enabled: bool,
    pub subscriptions_count: u64,
    pub is_pushed: bool,
}

/// Test notification response.
#[derive(Serialize)]
pub struct TestNotificationResponse {
    pub message: &'static str,
    pub notification: NotificationView,
    pub debug: TestDebug,
}

/// Raise a `system` notification through the full pipeline and report
/// how delivery went.
async fn send_test_notification(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<TestNotificationResponse>> {
    let push_enabled = state
        .preference_service
        .find(user_id)
        .await?
        .is_some_and(|p| p.push_enabled);
    let subscriptions_count = state
        .push_notification_service
        .subscription_count(user_id)
        .await?;

    let (notification, delivery) = state
        .dispatcher
        .create_and_dispatch(NewNotification::new(
            user_id,
            "Test notification",
            "Push notifications are working!",
            NotificationCategory::System,
        ))
        .await?;

    let is_pushed = match delivery {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "Test push delivery task failed");
            false
        }),
        None => false,
    };

    let mut view = NotificationView::from(&notification);
    view.is_pushed = is_pushed;

    Ok(Json(TestNotificationResponse {
        message: "Test notification sent",
        notification: view,
        debug: TestDebug {
            vapid_configured: state.push_notification_service.is_configured(),
            push_enabled,
            subscriptions_count,
            is_pushed,
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/get", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read/{id}", post(mark_as_read))
        .route("/read-all", post(mark_all_as_read))
        .route("/{id}", delete(delete_notification))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", delete(unsubscribe))
        .route("/vapid-key", get(vapid_key))
        .route("/test", post(send_test_notification))
}
