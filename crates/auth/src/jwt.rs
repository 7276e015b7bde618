//! JWT issuance, verification and cookie helpers
//!
//! Verification never throws for the three expected failure stages. A token
//! is classified as
//!
//! 1. not decodable: header or payload cannot be parsed,
//! 2. badly signed: decodable, but signature or algorithm check fails,
//! 3. expired: signature valid, but `exp` passed or `nbf` not reached.
//!
//! Each stage implies the previous ones passed. Anything else (an issuer
//! outside the allow-list, for instance) is returned as `AuthError::Token`.

use std::sync::OnceLock;

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use regex::Regex;
use uuid::Uuid;

use crate::claims::{Audience, Claims};
use crate::config::AuthConfig;
use crate::credentials::{cookie_pattern, extract_credential, CredentialSource};
use crate::error::AuthError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Cookie expiry used to force deletion on the client
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Standard alphabet, padding optional
const SECRET_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Options for a single token
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    pub subject: String,
    /// Overrides the configured issuer
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Attach a random token id (`jti`)
    pub enable_id: bool,
    /// Absolute expiry, wins over `expiry_minutes`
    pub expires_at: Option<DateTime<Utc>>,
    /// Relative expiry, wins over the configured default
    pub expiry_minutes: Option<i64>,
}

impl TokenOptions {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_id(mut self) -> Self {
        self.enable_id = true;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn expires_in_minutes(mut self, minutes: i64) -> Self {
        self.expiry_minutes = Some(minutes);
        self
    }
}

/// Claims of a token that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidToken {
    pub subject: Option<String>,
    pub id: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Stage at which verification failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Undecodable,
    BadSignature,
    Expired,
}

impl TokenRejection {
    pub fn is_decodable(&self) -> bool {
        !matches!(self, TokenRejection::Undecodable)
    }

    /// `None` when the signature was never checked
    pub fn is_signature_valid(&self) -> Option<bool> {
        match self {
            TokenRejection::Undecodable => None,
            TokenRejection::BadSignature => Some(false),
            TokenRejection::Expired => Some(true),
        }
    }

    /// `None` when expiry was never checked
    pub fn is_not_expired(&self) -> Option<bool> {
        match self {
            TokenRejection::Expired => Some(false),
            TokenRejection::Undecodable | TokenRejection::BadSignature => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TokenRejection::Undecodable => "invalid jwt",
            TokenRejection::BadSignature => "invalid jwt signature",
            TokenRejection::Expired => "expired jwt",
        }
    }
}

/// Outcome of verifying a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtValidation {
    Valid(ValidToken),
    Invalid(TokenRejection),
}

impl JwtValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, JwtValidation::Valid(_))
    }

    pub fn into_valid(self) -> Option<ValidToken> {
        match self {
            JwtValidation::Valid(token) => Some(token),
            JwtValidation::Invalid(_) => None,
        }
    }
}

/// The credential chosen for a request and its verification outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub source: CredentialSource,
    pub validation: JwtValidation,
}

/// Keys, validation rules and cookie matcher derived from `AuthConfig`
struct JwtState {
    issuer: String,
    validity_minutes: i64,
    cookie_name: String,
    cookie_pattern: Regex,
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    decode_only: Validation,
}

impl JwtState {
    fn derive(config: &AuthConfig) -> Result<Self, AuthError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AuthError::Configuration("AUTH_JWT_SECRET is not configured".into()))?;

        let key = SECRET_ENGINE.decode(secret.trim()).map_err(|e| {
            AuthError::Configuration(format!("AUTH_JWT_SECRET is not valid base64: {e}"))
        })?;
        if key.is_empty() {
            return Err(AuthError::Configuration(
                "AUTH_JWT_SECRET decodes to an empty key".into(),
            ));
        }

        let cookie_name = config.cookie_name().to_string();
        let cookie_pattern = cookie_pattern(&cookie_name).map_err(|e| {
            AuthError::Configuration(format!("AUTH_JWT_COOKIE_NAME is not usable: {e}"))
        })?;

        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[config.issuer()]);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.validate_aud = false;

        let mut decode_only = Validation::new(ALGORITHM);
        decode_only.insecure_disable_signature_validation();
        decode_only.validate_exp = false;
        decode_only.validate_aud = false;
        decode_only.required_spec_claims.clear();

        tracing::debug!(
            issuer = config.issuer(),
            cookie_name = %cookie_name,
            validity_minutes = config.expiration_minutes(),
            "JWT state derived"
        );

        Ok(Self {
            issuer: config.issuer().to_string(),
            validity_minutes: config.expiration_minutes(),
            cookie_name,
            cookie_pattern,
            header: Header::new(ALGORITHM),
            encoding_key: EncodingKey::from_secret(&key),
            decoding_key: DecodingKey::from_secret(&key),
            validation,
            decode_only,
        })
    }

    fn expiration_timestamp(&self, options: &TokenOptions, now: DateTime<Utc>) -> i64 {
        if let Some(at) = options.expires_at {
            return at.timestamp();
        }
        let minutes = options.expiry_minutes.unwrap_or(self.validity_minutes);
        now.timestamp().saturating_add(minutes.saturating_mul(60))
    }
}

/// Token codec for one application
///
/// Cheap to construct; the signing state is derived from the configuration
/// on first use and kept for the lifetime of the value. Share it behind an
/// `Arc`.
pub struct Jwt {
    config: AuthConfig,
    state: OnceLock<JwtState>,
}

impl Jwt {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            state: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    fn state(&self) -> Result<&JwtState, AuthError> {
        if let Some(state) = self.state.get() {
            return Ok(state);
        }
        let state = JwtState::derive(&self.config)?;
        Ok(self.state.get_or_init(|| state))
    }

    /// Sign a new token
    pub fn generate(&self, options: &TokenOptions) -> Result<String, AuthError> {
        let state = self.state()?;

        if options.subject.is_empty() {
            return Err(AuthError::InvalidClaims("subject is required".into()));
        }

        let now = Utc::now();
        let claims = Claims {
            iss: Some(
                options
                    .issuer
                    .clone()
                    .unwrap_or_else(|| state.issuer.clone()),
            ),
            aud: options.audience.clone().map(Audience::Single),
            sub: Some(options.subject.clone()),
            exp: state.expiration_timestamp(options, now),
            iat: Some(now.timestamp()),
            jti: options.enable_id.then(|| Uuid::new_v4().to_string()),
        };

        Ok(encode(&state.header, &claims, &state.encoding_key)?)
    }

    /// Sign a new token and set it as the session cookie
    pub fn generate_cookie(
        &self,
        options: &TokenOptions,
        headers: &mut HeaderMap,
    ) -> Result<String, AuthError> {
        let token = self.generate(options)?;
        let cookie = format!("{}={}; Path=/; HttpOnly", self.state()?.cookie_name, token);
        headers.insert(SET_COOKIE, cookie_header(cookie)?);
        Ok(token)
    }

    /// Overwrite the session cookie with an already expired one
    pub fn clear_cookie(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let cookie = format!(
            "{}=invalid; Path=/; Expires={}; HttpOnly",
            self.state()?.cookie_name,
            EPOCH_EXPIRES
        );
        headers.insert(SET_COOKIE, cookie_header(cookie)?);
        Ok(())
    }

    /// Verify a token and classify the outcome
    pub fn verify(&self, token: &str) -> Result<JwtValidation, AuthError> {
        let state = self.state()?;

        if let Err(e) = decode::<Claims>(token, &state.decoding_key, &state.decode_only) {
            tracing::debug!(error = %e, "JWT is not decodable");
            return Ok(JwtValidation::Invalid(TokenRejection::Undecodable));
        }

        let claims = match decode::<Claims>(token, &state.decoding_key, &state.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                let rejection = match e.kind() {
                    ErrorKind::InvalidToken
                    | ErrorKind::Base64(_)
                    | ErrorKind::Json(_)
                    | ErrorKind::Utf8(_) => TokenRejection::Undecodable,
                    ErrorKind::InvalidSignature
                    | ErrorKind::InvalidAlgorithm
                    | ErrorKind::MissingAlgorithm => TokenRejection::BadSignature,
                    ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => {
                        TokenRejection::Expired
                    }
                    _ => {
                        tracing::warn!(error = %e, "JWT verification failed unexpectedly");
                        return Err(AuthError::Token(e));
                    }
                };
                tracing::debug!(error = %e, ?rejection, "JWT rejected");
                return Ok(JwtValidation::Invalid(rejection));
            }
        };

        Ok(JwtValidation::Valid(ValidToken {
            subject: claims.sub,
            id: claims.jti,
            issued_at: claims.iat.and_then(|iat| DateTime::from_timestamp(iat, 0)),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }))
    }

    /// Pick the request credential and verify it
    ///
    /// A bearer header takes strict precedence: when present, the cookie is
    /// not consulted even if the bearer token turns out invalid.
    pub fn inspect_request(&self, headers: &HeaderMap) -> Result<Option<RequestToken>, AuthError> {
        let state = self.state()?;

        let Some(credential) = extract_credential(headers, &state.cookie_pattern) else {
            return Ok(None);
        };

        let validation = self.verify(&credential.token)?;
        Ok(Some(RequestToken {
            source: credential.source,
            validation,
        }))
    }

    /// The request's token, if it carries a valid one
    pub fn verify_request(&self, headers: &HeaderMap) -> Result<Option<ValidToken>, AuthError> {
        Ok(self
            .inspect_request(headers)?
            .and_then(|inspected| inspected.validation.into_valid()))
    }
}

fn cookie_header(cookie: String) -> Result<HeaderValue, AuthError> {
    HeaderValue::try_from(cookie).map_err(|e| {
        AuthError::Configuration(format!("AUTH_JWT_COOKIE_NAME yields an invalid cookie: {e}"))
    })
}
