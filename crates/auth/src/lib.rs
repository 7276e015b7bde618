//! Entity authentication for axum services
//!
//! Issues and verifies HS256 JWTs, picks the request credential (bearer
//! header, then session cookie), and resolves the authenticated domain
//! entity once per request through a request-scoped cache. Exposed as the
//! `require_entity` middleware and as extractors generic over any state `S`
//! where `EntityAuth<E>: FromRef<S>`.

mod cache;
mod claims;
mod config;
mod credentials;
mod entity;
mod error;
mod extractors;
mod jwt;
mod middleware;
mod store;

#[cfg(test)]
mod testing;

pub use cache::{CacheError, CacheKey, CacheSlot, RequestCache};
pub use claims::{Audience, Claims};
pub use config::{AuthConfig, DEFAULT_COOKIE_NAME, DEFAULT_ISSUER, DEFAULT_VALIDITY_MINUTES};
pub use credentials::{extract_credential, Credential, CredentialSource};
pub use entity::{EntityAuth, EntitySlot, EntityValidator, SubjectSlot, ENTITY_ID};
pub use error::AuthError;
pub use extractors::{AuthedEntity, AuthedSubject, Cached, CachedEntity};
pub use jwt::{Jwt, JwtValidation, RequestToken, TokenOptions, TokenRejection, ValidToken};
pub use middleware::require_entity;
pub use store::{AuthEntity, EntityStore, MemoryEntityStore, PgEntityStore, SqlEntity};
