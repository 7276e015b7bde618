//! Fixtures shared by the unit tests of this crate

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::entity::EntityAuth;
use crate::jwt::{Jwt, TokenOptions};
use crate::store::{AuthEntity, MemoryEntityStore};

/// base64 of `warden-test-secret-key-0123456789`
pub(crate) const TEST_SECRET: &str = "d2FyZGVuLXRlc3Qtc2VjcmV0LWtleS0wMTIzNDU2Nzg5";

/// base64 of `another-secret-key-for-forgery-01`
pub(crate) const OTHER_SECRET: &str = "YW5vdGhlci1zZWNyZXQta2V5LWZvci1mb3JnZXJ5LTAx";

pub(crate) fn test_config() -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET)
}

pub(crate) fn test_jwt() -> Jwt {
    Jwt::new(test_config())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestUser {
    pub id: i64,
    pub email: String,
    pub disabled: bool,
}

impl TestUser {
    pub fn new(id: i64, email: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

impl AuthEntity for TestUser {
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }
}

/// Resolver over an in-memory store seeded with `users`
pub(crate) async fn test_auth(
    users: Vec<TestUser>,
) -> (EntityAuth<TestUser>, MemoryEntityStore<TestUser>) {
    let store = MemoryEntityStore::<TestUser>::new();
    for user in users {
        store.insert(user).await;
    }
    let auth = EntityAuth::new(Arc::new(test_jwt()), Arc::new(store.clone()));
    (auth, store)
}

/// `Authorization` value carrying a fresh token for `subject`
pub(crate) fn bearer_for(jwt: &Jwt, subject: &str) -> String {
    let token = jwt
        .generate(&TokenOptions::new(subject))
        .expect("test token should sign");
    format!("Bearer {token}")
}
