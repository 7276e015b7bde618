//! Authentication configuration

use std::fmt;

use warden_common::{env_parse, env_string};

pub const DEFAULT_ISSUER: &str = "app";
pub const DEFAULT_VALIDITY_MINUTES: i64 = 15;
pub const DEFAULT_COOKIE_NAME: &str = "jwt";

/// Authentication configuration
///
/// Values are kept as given; defaults are applied when the token codec
/// derives its state on first use. A missing secret is therefore not an
/// error until a token is generated or verified.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Base64 encoded symmetric signing key (`AUTH_JWT_SECRET`)
    pub jwt_secret: Option<String>,
    /// Token issuer, also the only accepted issuer on verification
    pub issuer: Option<String>,
    /// Default token validity window in minutes
    pub expiration_minutes: Option<i64>,
    /// Name of the cookie carrying the token
    pub cookie_name: Option<String>,
}

impl AuthConfig {
    /// Load from `AUTH_JWT_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: env_string("AUTH_JWT_SECRET"),
            issuer: env_string("AUTH_JWT_ISSUER"),
            expiration_minutes: env_parse("AUTH_JWT_EXPIRATION_MINS")?,
            cookie_name: env_string("AUTH_JWT_COOKIE_NAME"),
        })
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn issuer(&self) -> &str {
        self.issuer.as_deref().unwrap_or(DEFAULT_ISSUER)
    }

    pub fn expiration_minutes(&self) -> i64 {
        self.expiration_minutes.unwrap_or(DEFAULT_VALIDITY_MINUTES)
    }

    pub fn cookie_name(&self) -> &str {
        self.cookie_name.as_deref().unwrap_or(DEFAULT_COOKIE_NAME)
    }
}

impl fmt::Debug for AuthConfig {
    #[mutants::skip] // Debug output only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("expiration_minutes", &self.expiration_minutes)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}
