//! The `User` principal

use async_trait::async_trait;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use warden_auth::{AuthEntity, AuthError, EntityValidator, SqlEntity};

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: None,
            disabled: false,
            created_at: Utc::now(),
        }
    }
}

impl AuthEntity for User {
    type Id = Uuid;

    fn id(&self) -> &Uuid {
        &self.id
    }
}

impl SqlEntity for User {
    const TABLE: &'static str = "users";
}

/// Rejects disabled accounts
pub struct ActiveUserValidator;

#[async_trait]
impl EntityValidator<User> for ActiveUserValidator {
    async fn validate_entity(&self, parts: &Parts, user: &User) -> Result<(), AuthError> {
        if user.disabled {
            tracing::info!(user_id = %user.id, path = %parts.uri.path(), "Disabled user rejected");
            return Err(AuthError::forbidden("account disabled"));
        }
        Ok(())
    }
}
