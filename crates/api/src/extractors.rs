//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use foodtrack_common::AppError;

use crate::middleware::AuthenticatedUser;

/// Authenticated user id extractor.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|user| Self(user.0))
            .ok_or(AppError::Unauthorized)
    }
}
