//! Credential extraction from request headers

use std::borrow::Cow;

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use regex::Regex;

/// Where a request credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    BearerHeader,
    Cookie,
}

/// Raw, unverified token taken from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub source: CredentialSource,
    pub token: String,
}

/// Matcher for `<name>=<value>` inside a `Cookie` header
pub fn cookie_pattern(cookie_name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(^|;)[ ]*{}=([^;]+)", regex::escape(cookie_name)))
}

/// Token from `Authorization: Bearer <token>`
///
/// The prefix is matched on raw bytes so a non-ASCII token still counts as a
/// bearer candidate; it is decoded lossily and then fails verification.
pub fn bearer_token(headers: &HeaderMap) -> Option<Cow<'_, str>> {
    let token = headers
        .get(AUTHORIZATION)?
        .as_bytes()
        .strip_prefix(b"Bearer ")?;
    Some(String::from_utf8_lossy(token))
}

/// Token from the session cookie
pub fn cookie_token<'a>(headers: &'a HeaderMap, pattern: &Regex) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| pattern.captures(raw)?.get(2))
        .map(|value| value.as_str())
}

/// Pick the request's credential
///
/// The bearer header is used whenever it is present, valid or not; the
/// cookie is only read when there is no bearer token at all.
pub fn extract_credential(headers: &HeaderMap, cookie_pattern: &Regex) -> Option<Credential> {
    if let Some(token) = bearer_token(headers) {
        return Some(Credential {
            source: CredentialSource::BearerHeader,
            token: token.into_owned(),
        });
    }

    cookie_token(headers, cookie_pattern).map(|token| Credential {
        source: CredentialSource::Cookie,
        token: token.to_string(),
    })
}
