//! End-to-end authentication flows through the application router

use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE},
    StatusCode,
};
use warden_auth::{AuthConfig, TokenOptions};

use crate::common::{body_json, body_text, get, request, TestApp};

mod common;

#[test_log::test(tokio::test)]
async fn test_me_with_bearer_token() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let token = app.token_for(&user);

    let response = app
        .send(get("/v1/me", &[(AUTHORIZATION, format!("Bearer {token}"))]))
        .await;
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(app.store.lookups(), 1);
}

#[test_log::test(tokio::test)]
async fn test_me_with_session_cookie() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let token = app.token_for(&user);

    let response = app
        .send(get("/v1/me", &[(COOKIE, format!("lang=en; jwt={token}"))]))
        .await;
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn test_header_credential_is_used_exclusively() {
    let app = TestApp::new();
    let from_header = app.create_user("header@example.com").await;
    let from_cookie = app.create_user("cookie@example.com").await;

    let response = app
        .send(get(
            "/v1/me",
            &[
                (AUTHORIZATION, format!("Bearer {}", app.token_for(&from_header))),
                (COOKIE, format!("jwt={}", app.token_for(&from_cookie))),
            ],
        ))
        .await;
    let (status, body) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "header@example.com");
}

#[tokio::test]
async fn test_invalid_header_does_not_fall_back_to_cookie() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;

    let response = app
        .send(get(
            "/v1/me",
            &[
                (AUTHORIZATION, "Bearer not-a-token".to_string()),
                (COOKIE, format!("jwt={}", app.token_for(&user))),
            ],
        ))
        .await;
    let (status, body) = body_text(response).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "invalid jwt");
    assert_eq!(app.store.lookups(), 0);
}

#[tokio::test]
async fn test_rejected_credentials_are_plain_401() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;

    let expired = app
        .jwt()
        .generate(&TokenOptions::new(user.id.to_string()).expires_in_minutes(-1))
        .unwrap();
    let forged = warden_auth::Jwt::new(AuthConfig::with_secret(common::FOREIGN_SECRET))
        .generate(&TokenOptions::new(user.id.to_string()))
        .unwrap();

    let cases = [
        (None, "Unauthorized"),
        (Some(format!("Bearer {expired}")), "expired jwt"),
        (Some(format!("Bearer {forged}")), "invalid jwt signature"),
    ];

    for (authorization, expected) in cases {
        let headers: Vec<_> = authorization
            .into_iter()
            .map(|value| (AUTHORIZATION, value))
            .collect();
        let (status, body) = body_text(app.send(get("/v1/me", &headers)).await).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{expected}");
        assert_eq!(body, expected);
    }
}

#[tokio::test]
async fn test_non_uuid_subject_is_unauthorized() {
    let app = TestApp::new();
    let token = app.jwt().generate(&TokenOptions::new("42")).unwrap();

    let (status, body) = body_text(
        app.send(get("/v1/me", &[(AUTHORIZATION, format!("Bearer {token}"))]))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "invalid jwt subject");
}

#[tokio::test]
async fn test_disabled_user_is_forbidden() {
    let app = TestApp::new();
    let user = app.create_disabled_user("gone@example.com").await;

    let (status, body) = body_text(
        app.send(get(
            "/v1/me",
            &[(AUTHORIZATION, format!("Bearer {}", app.token_for(&user)))],
        ))
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "account disabled");
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::new();
    let token = app
        .jwt()
        .generate(&TokenOptions::new(uuid::Uuid::new_v4().to_string()))
        .unwrap();

    let (status, body) = body_json(
        app.send(get("/v1/me", &[(AUTHORIZATION, format!("Bearer {token}"))]))
            .await,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_missing_secret_is_internal_error() {
    let app = TestApp::with_config(AuthConfig::default());

    let (status, body) = body_json(app.send(get("/v1/me", &[])).await).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "AUTH_CONFIGURATION");
}

#[tokio::test]
async fn test_each_request_loads_the_user_once() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;
    let header = (AUTHORIZATION, format!("Bearer {}", app.token_for(&user)));

    for expected in 1..=3 {
        let response = app.send(get("/v1/me", &[header.clone()])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.store.lookups(), expected);
    }
}

#[tokio::test]
async fn test_subject_route_skips_entity_lookup() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;

    let (status, body) = body_json(
        app.send(get(
            "/v1/auth/subject",
            &[(AUTHORIZATION, format!("Bearer {}", app.token_for(&user)))],
        ))
        .await,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(app.store.lookups(), 0);
}

#[tokio::test]
async fn test_subject_route_rejection_is_json() {
    let app = TestApp::new();

    let (status, body) = body_json(app.send(get("/v1/auth/subject", &[])).await).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Unauthorized");
}

#[tokio::test]
async fn test_token_route_issues_session_cookie() {
    let app = TestApp::new();
    let user = app.create_user("ada@example.com").await;

    let response = app
        .send(request(
            "POST",
            "/v1/auth/token",
            &[(AUTHORIZATION, format!("Bearer {}", app.token_for(&user)))],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let (_, body) = body_json(response).await;
    let token = body["token"].as_str().unwrap();

    assert_eq!(set_cookie, format!("jwt={token}; Path=/; HttpOnly"));
    assert_eq!(body["token_type"], "Bearer");

    let valid = app.jwt().verify(token).unwrap().into_valid().unwrap();
    assert_eq!(valid.subject, Some(user.id.to_string()));
    assert!(valid.id.is_some());

    // the new cookie authenticates on its own
    let echoed = set_cookie.split(';').next().unwrap().to_string();
    let (status, me) = body_json(app.send(get("/v1/me", &[(COOKIE, echoed)])).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@example.com");
}

#[tokio::test]
async fn test_cleared_cookie_no_longer_authenticates() {
    let app = TestApp::new();

    let response = app.send(request("DELETE", "/v1/auth/session", &[])).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(
        set_cookie,
        "jwt=invalid; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly"
    );

    let echoed = set_cookie.split(';').next().unwrap().to_string();
    let response = app.send(get("/v1/me", &[(COOKIE, echoed)])).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = body_text(app.send(get("/health", &[])).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}
