//! Push notification service for Web Push.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use foodtrack_common::{AppError, AppResult, config::PushConfig};
use foodtrack_db::{
    entities::{
        notification::{self, NotificationCategory},
        push_subscription,
    },
    repositories::PushSubscriptionRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, URL_SAFE_NO_PAD, VapidSignatureBuilder,
    WebPushClient, WebPushError, WebPushMessageBuilder,
};

use crate::services::{notification::NotificationService, preference::PreferenceService};

/// Configuration for VAPID (Voluntary Application Server Identification).
#[derive(Debug, Clone)]
pub struct VapidConfig {
    /// Public key handed to browsers (base64 URL-safe encoded)
    pub public_key: String,
    /// Private signing key; push delivery is disabled without it
    pub private_key: Option<String>,
    /// Subject claim (a mailto: or https: URL)
    pub subject: String,
    /// Icon shown with the notification
    pub icon: String,
    /// Badge shown with the notification
    pub badge: String,
}

impl VapidConfig {
    #[must_use]
    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            public_key: config.vapid_public_key.clone(),
            private_key: config.private_key().map(ToString::to_string),
            subject: config.subject(),
            icon: config.icon.clone(),
            badge: config.badge.clone(),
        }
    }
}

/// Key material used to sign one delivery.
#[derive(Debug, Clone, Copy)]
pub struct SigningKey<'a> {
    pub private_key: &'a str,
    pub subject: &'a str,
}

/// Outcome of a failed delivery to one subscription.
#[derive(Debug, Error)]
pub enum PushDeliveryError {
    /// The push service reported the subscription as expired (HTTP 410).
    #[error("subscription is gone")]
    Gone,

    #[error("push delivery failed: {0}")]
    Failed(String),
}

/// Sends one encrypted payload to one subscription.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &push_subscription::Model,
        payload: &[u8],
        key: SigningKey<'_>,
    ) -> Result<(), PushDeliveryError>;
}

/// `web-push` backed transport (VAPID, aes128gcm, isahc).
pub struct WebPushTransport {
    client: IsahcWebPushClient,
}

impl WebPushTransport {
    pub fn new() -> AppResult<Self> {
        let client = IsahcWebPushClient::new()
            .map_err(|e| AppError::ExternalService(format!("Failed to build push client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(
        &self,
        subscription: &push_subscription::Model,
        payload: &[u8],
        key: SigningKey<'_>,
    ) -> Result<(), PushDeliveryError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );

        let mut signature =
            VapidSignatureBuilder::from_base64(key.private_key, URL_SAFE_NO_PAD, &info)
                .map_err(classify)?;
        signature.add_claim("sub", key.subject);
        let signature = signature.build().map_err(classify)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(classify)?;

        self.client.send(message).await.map_err(classify)
    }
}

fn classify(err: WebPushError) -> PushDeliveryError {
    match err {
        WebPushError::EndpointNotValid { .. } => PushDeliveryError::Gone,
        other => PushDeliveryError::Failed(other.to_string()),
    }
}

/// Page the client opens when the notification is clicked.
#[must_use]
pub const fn url_for_category(category: NotificationCategory) -> &'static str {
    match category {
        NotificationCategory::MealReminder => "/diary",
        NotificationCategory::Progress => "/progress",
        NotificationCategory::Group => "/groups",
        NotificationCategory::WeeklyReport => "/analytics",
        NotificationCategory::Friend => "/friends",
        NotificationCategory::Fridge => "/fridge",
        NotificationCategory::WaterReminder | NotificationCategory::System => "/",
    }
}

/// JSON body delivered to the service worker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub category: NotificationCategory,
    pub notification_id: i64,
    pub url: &'static str,
}

impl PushPayload {
    #[must_use]
    pub fn new(notification: &notification::Model, vapid: &VapidConfig) -> Self {
        Self {
            title: notification.title.clone(),
            body: notification.body.clone(),
            icon: vapid.icon.clone(),
            badge: vapid.badge.clone(),
            category: notification.category,
            notification_id: notification.id,
            url: url_for_category(notification.category),
        }
    }
}

/// Browser subscription keys.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SubscriptionKeys {
    #[validate(length(min = 1, message = "p256dh key is required"))]
    pub p256dh: String,
    #[validate(length(min = 1, message = "auth key is required"))]
    pub auth: String,
}

/// Body of a subscribe request, as produced by `PushSubscription.toJSON()`.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SubscribeInput {
    #[validate(url(message = "endpoint must be a URL"))]
    pub endpoint: String,
    #[validate(nested)]
    pub keys: SubscriptionKeys,
}

/// Push notification service.
#[derive(Clone)]
pub struct PushNotificationService {
    repo: PushSubscriptionRepository,
    notifications: NotificationService,
    preferences: PreferenceService,
    transport: Arc<dyn PushTransport>,
    vapid: VapidConfig,
}

impl PushNotificationService {
    /// Create a new push notification service.
    #[must_use]
    pub fn new(
        repo: PushSubscriptionRepository,
        notifications: NotificationService,
        preferences: PreferenceService,
        transport: Arc<dyn PushTransport>,
        vapid: VapidConfig,
    ) -> Self {
        Self {
            repo,
            notifications,
            preferences,
            transport,
            vapid,
        }
    }

    /// Get VAPID public key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.vapid.public_key
    }

    /// Whether a private signing key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.vapid.private_key.is_some()
    }

    /// Register a browser endpoint, or re-point an existing one at this user.
    ///
    /// Turns the user's master push switch on.
    pub async fn subscribe(
        &self,
        user_id: i64,
        input: SubscribeInput,
        user_agent: Option<String>,
    ) -> AppResult<push_subscription::Model> {
        input.validate()?;

        let now = Utc::now();
        let saved = if let Some(existing) = self.repo.find_by_endpoint(&input.endpoint).await? {
            let mut active: push_subscription::ActiveModel = existing.into();
            active.user_id = Set(user_id);
            active.p256dh = Set(input.keys.p256dh);
            active.auth = Set(input.keys.auth);
            active.user_agent = Set(user_agent);
            active.updated_at = Set(Some(now.into()));
            self.repo.update(active).await?
        } else {
            let subscription = push_subscription::ActiveModel {
                user_id: Set(user_id),
                endpoint: Set(input.endpoint),
                p256dh: Set(input.keys.p256dh),
                auth: Set(input.keys.auth),
                user_agent: Set(user_agent),
                created_at: Set(now.into()),
                updated_at: Set(None),
                ..Default::default()
            };
            self.repo.create(subscription).await?
        };

        self.preferences.enable_push(user_id).await?;

        tracing::info!(user_id, subscription_id = saved.id, "Push subscription saved");
        Ok(saved)
    }

    /// Remove one endpoint, or every endpoint of the user when none is given.
    ///
    /// Clears the master push switch once no subscription is left.
    pub async fn unsubscribe(&self, user_id: i64, endpoint: Option<&str>) -> AppResult<u64> {
        let removed = match endpoint {
            Some(endpoint) => {
                self.repo
                    .delete_by_user_and_endpoint(user_id, endpoint)
                    .await?
            }
            None => self.repo.delete_by_user(user_id).await?,
        };

        if self.repo.count_by_user(user_id).await? == 0 {
            self.preferences.disable_push(user_id).await?;
        }

        tracing::info!(user_id, removed, "Push subscriptions removed");
        Ok(removed)
    }

    /// Number of endpoints registered for a user.
    pub async fn subscription_count(&self, user_id: i64) -> AppResult<u64> {
        self.repo.count_by_user(user_id).await
    }

    /// Deliver a notification to every endpoint of its owner.
    ///
    /// Never fails: problems are logged and reflected in the return value,
    /// which is true when at least one endpoint accepted the message.
    pub async fn send_to_user(&self, notification: &notification::Model) -> bool {
        let user_id = notification.user_id;
        let notification_id = notification.id;

        let subscriptions = match self.repo.find_by_user_id(user_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                tracing::warn!(user_id, notification_id, error = %e, "Failed to load push subscriptions");
                return false;
            }
        };

        if subscriptions.is_empty() {
            tracing::debug!(user_id, notification_id, "No push subscriptions");
            return false;
        }

        let Some(private_key) = self.vapid.private_key.as_deref() else {
            tracing::warn!(user_id, notification_id, "VAPID private key is not configured, cannot send push");
            return false;
        };
        let key = SigningKey {
            private_key,
            subject: &self.vapid.subject,
        };

        let payload = match serde_json::to_vec(&PushPayload::new(notification, &self.vapid)) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(notification_id, error = %e, "Failed to serialize push payload");
                return false;
            }
        };

        let mut sent = false;
        for subscription in &subscriptions {
            match self.transport.send(subscription, &payload, key).await {
                Ok(()) => {
                    sent = true;
                    tracing::debug!(user_id, subscription_id = subscription.id, "Push sent");
                }
                Err(PushDeliveryError::Gone) => {
                    tracing::info!(
                        user_id,
                        subscription_id = subscription.id,
                        "Push subscription expired, removing"
                    );
                    if let Err(e) = self.repo.delete(subscription.id).await {
                        tracing::warn!(subscription_id = subscription.id, error = %e, "Failed to remove expired subscription");
                    }
                }
                Err(PushDeliveryError::Failed(reason)) => {
                    tracing::warn!(
                        user_id,
                        subscription_id = subscription.id,
                        error = %reason,
                        "Failed to send push notification"
                    );
                }
            }
        }

        if let Err(e) = self.notifications.set_pushed(notification_id, sent).await {
            tracing::warn!(notification_id, error = %e, "Failed to record push outcome");
        }

        sent
    }
}
