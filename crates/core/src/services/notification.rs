//! Notification store service.

use chrono::Utc;
use foodtrack_common::{AppError, AppResult};
use foodtrack_db::{
    entities::notification::{self, NotificationCategory},
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde::Serialize;

/// Default page size for notification listings.
pub const DEFAULT_PER_PAGE: u64 = 20;
/// Largest page size a client may request.
pub const MAX_PER_PAGE: u64 = 100;

/// A notification about to be raised.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
}

impl NewNotification {
    #[must_use]
    pub fn new(
        user_id: i64,
        title: impl Into<String>,
        body: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            body: body.into(),
            category,
            related_type: None,
            related_id: None,
        }
    }

    /// Point the notification at another entity, e.g. `("group", 12)`.
    #[must_use]
    pub fn related(mut self, kind: impl Into<String>, id: i64) -> Self {
        self.related_type = Some(kind.into());
        self.related_id = Some(id);
        self
    }
}

/// Client-facing notification shape, shared by HTTP and WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub related_type: Option<String>,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub is_pushed: bool,
    pub created_at: String,
}

impl From<&notification::Model> for NotificationView {
    fn from(model: &notification::Model) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            body: model.body.clone(),
            category: model.category,
            related_type: model.related_type.clone(),
            related_id: model.related_id,
            is_read: model.is_read,
            read_at: model.read_at.map(|dt| dt.to_rfc3339()),
            is_pushed: model.is_pushed,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// One page of a user's notification history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub notifications: Vec<NotificationView>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub has_more: bool,
}

/// Clamp raw pagination parameters: page >= 1, per_page in 1..=100.
#[must_use]
pub fn normalize_pagination(page: Option<i64>, per_page: Option<i64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1) as u64;
    let per_page = per_page
        .map_or(DEFAULT_PER_PAGE, |p| p.clamp(1, MAX_PER_PAGE as i64) as u64);
    (page, per_page)
}

/// Service for persisted notifications. Every operation is scoped by owner.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self { notification_repo }
    }

    /// Persist a new unread, unpushed notification.
    pub async fn create(&self, input: NewNotification) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            user_id: Set(input.user_id),
            title: Set(input.title),
            body: Set(input.body),
            category: Set(input.category),
            related_type: Set(input.related_type),
            related_id: Set(input.related_id),
            is_read: Set(false),
            read_at: Set(None),
            is_pushed: Set(false),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        self.notification_repo.create(model).await
    }

    /// List a user's notifications newest first.
    pub async fn list(
        &self,
        user_id: i64,
        page: Option<i64>,
        per_page: Option<i64>,
    ) -> AppResult<NotificationPage> {
        let (page, per_page) = normalize_pagination(page, per_page);
        let (items, total) = self
            .notification_repo
            .find_page(user_id, page, per_page)
            .await?;

        let pages = total.div_ceil(per_page);

        Ok(NotificationPage {
            notifications: items.iter().map(NotificationView::from).collect(),
            total,
            page,
            pages,
            has_more: page < pages,
        })
    }

    /// Count unread notifications for a user.
    pub async fn unread_count(&self, user_id: i64) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Mark a notification as read.
    ///
    /// Already-read notifications are returned unchanged, so `read_at`
    /// keeps the time of the first read.
    pub async fn mark_read(&self, id: i64, user_id: i64) -> AppResult<notification::Model> {
        let notification = self
            .notification_repo
            .find_owned(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

        if notification.is_read {
            return Ok(notification);
        }

        self.notification_repo.mark_as_read(notification).await
    }

    /// Mark every unread notification of a user as read.
    pub async fn mark_all_read(&self, user_id: i64) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Delete a notification owned by the user.
    pub async fn delete(&self, id: i64, user_id: i64) -> AppResult<()> {
        let removed = self.notification_repo.delete_owned(id, user_id).await?;
        if removed == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    /// Record the Web Push outcome of a notification.
    pub async fn set_pushed(&self, id: i64, pushed: bool) -> AppResult<()> {
        self.notification_repo.set_pushed(id, pushed).await
    }
}
