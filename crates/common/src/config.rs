//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Bearer token verification.
    pub auth: AuthConfig,
    /// Web Push configuration.
    #[serde(default)]
    pub push: PushConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Bearer token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the token issuer.
    pub jwt_secret: String,
}

/// Web Push (VAPID) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Public key handed to browsers (URL-safe base64).
    #[serde(default)]
    pub vapid_public_key: String,
    /// Private signing key (URL-safe base64). Push is disabled when unset.
    #[serde(default)]
    pub vapid_private_key: Option<String>,
    /// Contact address sent as the VAPID `sub` claim.
    #[serde(default = "default_claims_email")]
    pub vapid_claims_email: String,
    /// Icon shown by the browser notification.
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Badge shown by the browser notification.
    #[serde(default = "default_badge")]
    pub badge: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: String::new(),
            vapid_private_key: None,
            vapid_claims_email: default_claims_email(),
            icon: default_icon(),
            badge: default_badge(),
        }
    }
}

impl PushConfig {
    /// Returns the private key if one is actually configured.
    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        self.vapid_private_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Returns the VAPID subject as a `mailto:` URI.
    #[must_use]
    pub fn subject(&self) -> String {
        if self.vapid_claims_email.starts_with("mailto:")
            || self.vapid_claims_email.starts_with("https:")
        {
            self.vapid_claims_email.clone()
        } else {
            format!("mailto:{}", self.vapid_claims_email)
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5252
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_claims_email() -> String {
    "admin@foodtrack.local".to_string()
}

fn default_icon() -> String {
    "/imgs/logo.png".to_string()
}

fn default_badge() -> String {
    "/logo192.png".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, exported into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `FOODTRACK_ENV`)
    /// 4. Environment variables with `FOODTRACK__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("FOODTRACK_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FOODTRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FOODTRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
