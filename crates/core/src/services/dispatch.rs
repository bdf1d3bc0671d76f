//! Notification dispatcher: the single entry point for raising notifications.

use foodtrack_common::AppResult;
use foodtrack_db::entities::notification;
use tokio::task::JoinHandle;

use crate::services::{
    notification::{NewNotification, NotificationService, NotificationView},
    preference::{PreferenceService, should_push},
    push_notification::PushNotificationService,
    websocket::ConnectionRegistry,
};

/// Persists a notification, then fans it out over WebSocket and Web Push.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifications: NotificationService,
    preferences: PreferenceService,
    registry: ConnectionRegistry,
    push: PushNotificationService,
}

impl NotificationDispatcher {
    #[must_use]
    pub const fn new(
        notifications: NotificationService,
        preferences: PreferenceService,
        registry: ConnectionRegistry,
        push: PushNotificationService,
    ) -> Self {
        Self {
            notifications,
            preferences,
            registry,
            push,
        }
    }

    /// Raise a notification. Web Push, when allowed, runs in the background.
    pub async fn create_and_push(&self, input: NewNotification) -> AppResult<notification::Model> {
        let (notification, _delivery) = self.create_and_dispatch(input).await?;
        Ok(notification)
    }

    /// Like [`Self::create_and_push`], also handing back the background
    /// delivery task. Dropping the handle does not cancel delivery.
    ///
    /// Only a failure to persist is returned as an error; the delivery side
    /// is logged and otherwise ignored.
    pub async fn create_and_dispatch(
        &self,
        input: NewNotification,
    ) -> AppResult<(notification::Model, Option<JoinHandle<bool>>)> {
        let notification = self.notifications.create(input).await?;
        let user_id = notification.user_id;

        let push_allowed = match self.preferences.find(user_id).await {
            Ok(preference) => should_push(preference.as_ref(), user_id, notification.category),
            Err(e) => {
                tracing::warn!(user_id, notification_id = notification.id, error = %e, "Failed to load preferences, skipping push");
                false
            }
        };

        // WebSocket delivery ignores push preferences.
        self.registry
            .send_notification(user_id, NotificationView::from(&notification))
            .await;

        match self.notifications.unread_count(user_id).await {
            Ok(count) => {
                self.registry.send_unread_count(user_id, count).await;
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to count unread notifications");
            }
        }

        let delivery = push_allowed.then(|| {
            let push = self.push.clone();
            let pending = notification.clone();
            tokio::spawn(async move { push.send_to_user(&pending).await })
        });

        Ok((notification, delivery))
    }
}
