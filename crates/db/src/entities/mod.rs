//! Database entities.

pub mod notification;
pub mod notification_preference;
pub mod push_subscription;
pub mod user;

pub use notification::Entity as Notification;
pub use notification_preference::Entity as NotificationPreference;
pub use push_subscription::Entity as PushSubscription;
pub use user::Entity as User;
