//! Common test utilities and fixtures for integration tests
//!
//! Builds the application router over an in-memory user store, plus helpers
//! to mint tokens and read responses.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderName, Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt;
use warden_app::{create_app, AppState, User};
use warden_auth::{AuthConfig, EntityAuth, Jwt, MemoryEntityStore, TokenOptions};

/// base64 of `warden-integration-secret-0001`
pub const TEST_SECRET: &str = "d2FyZGVuLWludGVncmF0aW9uLXNlY3JldC0wMDAx";

/// base64 of `a-completely-different-key-0002`
pub const FOREIGN_SECRET: &str = "YS1jb21wbGV0ZWx5LWRpZmZlcmVudC1rZXktMDAwMg==";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::with_secret(TEST_SECRET)
}

/// Application under test
pub struct TestApp {
    pub state: AppState,
    pub store: MemoryEntityStore<User>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_auth_config())
    }

    pub fn with_config(auth_config: AuthConfig) -> Self {
        let store = MemoryEntityStore::<User>::new();
        let state = AppState::new(auth_config, Arc::new(store.clone()));
        Self { state, store }
    }

    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    pub fn users(&self) -> &EntityAuth<User> {
        &self.state.users
    }

    pub fn jwt(&self) -> &Jwt {
        self.state.users.jwt()
    }

    /// Persist a fresh active user
    pub async fn create_user(&self, email: &str) -> User {
        let user = User::new(email);
        self.store.insert(user.clone()).await;
        user
    }

    pub async fn create_disabled_user(&self, email: &str) -> User {
        let mut user = User::new(email);
        user.disabled = true;
        self.store.insert(user.clone()).await;
        user
    }

    pub fn token_for(&self, user: &User) -> String {
        self.jwt()
            .generate(&TokenOptions::new(user.id.to_string()))
            .expect("token should sign with the test secret")
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// GET request with the given headers
pub fn get(uri: &str, headers: &[(HeaderName, String)]) -> Request<Body> {
    request("GET", uri, headers)
}

pub fn request(method: &str, uri: &str, headers: &[(HeaderName, String)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn body_text(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

pub async fn body_json(response: Response) -> (StatusCode, serde_json::Value) {
    let (status, text) = body_text(response).await;
    let json = serde_json::from_str(&text).expect("JSON body");
    (status, json)
}
