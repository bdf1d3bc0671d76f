//! Bearer token verification.
//!
//! Tokens are issued elsewhere; this only checks HS256 signatures and
//! expiry, then reads the user id from `sub`.

use foodtrack_common::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subject {
    Id(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Subject,
}

/// Verifies access tokens and resolves the user they belong to.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Return the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> AppResult<i64> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
                _ => tracing::debug!(error = %e, "Rejected invalid token"),
            }
            AppError::Unauthorized
        })?;

        match data.claims.sub {
            Subject::Id(id) => Ok(id),
            Subject::Text(text) => text.parse().map_err(|_| AppError::Unauthorized),
        }
    }
}
