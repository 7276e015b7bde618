//! HTTP handlers
//!
//! - GET /v1/me - profile of the authenticated user (behind `require_entity`)
//! - POST /v1/auth/token - issue a fresh token and session cookie (behind `require_entity`)
//! - DELETE /v1/auth/session - clear the session cookie
//! - GET /v1/auth/subject - subject id of the request token, no lookup

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use warden_auth::{AuthedSubject, Cached, CachedEntity, EntityAuth, TokenOptions};
use warden_common::Result;

use crate::users::User;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SubjectResponse {
    pub id: Uuid,
}

pub async fn me(Cached(user): CachedEntity<User>) -> Json<UserResponse> {
    Json(user.into())
}

pub async fn reissue_token(
    State(users): State<EntityAuth<User>>,
    Cached(user): CachedEntity<User>,
) -> Result<(HeaderMap, Json<SessionResponse>)> {
    let mut headers = HeaderMap::new();
    let options = TokenOptions::new(user.id.to_string()).with_id();
    let token = users.jwt().generate_cookie(&options, &mut headers)?;

    tracing::info!(user_id = %user.id, "Session token reissued");

    Ok((
        headers,
        Json(SessionResponse {
            token,
            token_type: "Bearer",
        }),
    ))
}

pub async fn end_session(State(users): State<EntityAuth<User>>) -> Result<(StatusCode, HeaderMap)> {
    let mut headers = HeaderMap::new();
    users.jwt().clear_cookie(&mut headers)?;
    Ok((StatusCode::NO_CONTENT, headers))
}

pub async fn subject(subject: AuthedSubject<User>) -> Json<SubjectResponse> {
    Json(SubjectResponse {
        id: subject.into_inner(),
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}
