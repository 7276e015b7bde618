//! Warden application composition root
//!
//! Wires the `User` entity into the authentication layer and mounts the
//! routes that use it.

pub mod handlers;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use warden_auth::{require_entity, AuthConfig, EntityAuth, EntityStore, Jwt, PgEntityStore};

pub use users::{ActiveUserValidator, User};

/// Shared application state
#[derive(Clone, FromRef)]
pub struct AppState {
    pub users: EntityAuth<User>,
}

impl AppState {
    pub fn new(auth_config: AuthConfig, store: Arc<dyn EntityStore<User>>) -> Self {
        let users = EntityAuth::new(Arc::new(Jwt::new(auth_config)), store)
            .with_validator(Arc::new(ActiveUserValidator));
        Self { users }
    }

    /// State backed by the `users` table
    pub fn with_pool(auth_config: AuthConfig, pool: PgPool) -> Self {
        Self::new(auth_config, Arc::new(PgEntityStore::<User>::new(pool)))
    }
}

/// Routes that need an authenticated, active user
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/me", get(handlers::me))
        .route("/v1/auth/token", post(handlers::reissue_token))
        .route_layer(middleware::from_fn_with_state(
            state.users.clone(),
            require_entity::<User>,
        ))
}

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/",
            get(|| async { "Warden API v0.0.1-SNAPSHOT" }),
        )
        .route("/v1/auth/session", delete(handlers::end_session))
        .route("/v1/auth/subject", get(handlers::subject))
        .merge(user_routes(&state))
        .with_state(state)
}
