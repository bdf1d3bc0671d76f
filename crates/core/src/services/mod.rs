//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod dispatch;
pub mod notification;
pub mod preference;
pub mod push_notification;
pub mod websocket;

pub use auth::TokenVerifier;
pub use dispatch::NotificationDispatcher;
pub use notification::{NewNotification, NotificationPage, NotificationService, NotificationView};
pub use preference::{
    PreferenceService, PreferencesView, UpdatePreferencesInput, is_category_enabled, should_push,
};
pub use push_notification::{
    PushDeliveryError, PushNotificationService, PushPayload, PushTransport, SigningKey,
    SubscribeInput, SubscriptionKeys, VapidConfig, WebPushTransport, url_for_category,
};
pub use websocket::{ConnectionId, ConnectionRegistry, RealtimeMessage};
