//! Repositories wrapping the queries used by the services.

mod notification;
mod notification_preference;
mod push_subscription;

pub use notification::NotificationRepository;
pub use notification_preference::NotificationPreferenceRepository;
pub use push_subscription::PushSubscriptionRepository;
