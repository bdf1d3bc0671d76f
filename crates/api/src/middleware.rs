//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use foodtrack_common::Config;
use foodtrack_core::{
    ConnectionRegistry, NotificationDispatcher, NotificationService, PreferenceService,
    PushNotificationService, PushTransport, TokenVerifier, VapidConfig,
};
use foodtrack_db::repositories::{
    NotificationPreferenceRepository, NotificationRepository, PushSubscriptionRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub notification_service: NotificationService,
    pub preference_service: PreferenceService,
    pub push_notification_service: PushNotificationService,
    pub dispatcher: NotificationDispatcher,
    pub registry: ConnectionRegistry,
    pub token_verifier: TokenVerifier,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &Config,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let notification_repo = NotificationRepository::new(Arc::clone(&db));
        let preference_repo = NotificationPreferenceRepository::new(Arc::clone(&db));
        let subscription_repo = PushSubscriptionRepository::new(db);

        let notification_service = NotificationService::new(notification_repo);
        let preference_service = PreferenceService::new(preference_repo);
        let push_notification_service = PushNotificationService::new(
            subscription_repo,
            notification_service.clone(),
            preference_service.clone(),
            transport,
            VapidConfig::from_config(&config.push),
        );
        let registry = ConnectionRegistry::new();
        let dispatcher = NotificationDispatcher::new(
            notification_service.clone(),
            preference_service.clone(),
            registry.clone(),
            push_notification_service.clone(),
        );

        Self {
            notification_service,
            preference_service,
            push_notification_service,
            dispatcher,
            registry,
            token_verifier: TokenVerifier::new(&config.auth.jwt_secret),
        }
    }
}

/// Id of the user a request was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

/// Authentication middleware.
///
/// Attaches [`AuthenticatedUser`] when a valid bearer token is present.
/// Rejection is left to the `AuthUser` extractor so public routes still work.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    if let Some(token) = token {
        if let Ok(user_id) = state.token_verifier.verify(token) {
            req.extensions_mut().insert(AuthenticatedUser(user_id));
        }
    }

    next.run(req).await
}
