//! Request to entity resolution
//!
//! `EntityAuth<E>` maps an inbound request to the authenticated `E`:
//!
//! ```text
//! START -> CREDENTIAL_EXTRACTED -> SUBJECT_RESOLVED -> ENTITY_LOADED -> VALIDATED | REJECTED
//! ```
//!
//! Both the subject id and the loaded entity are memoized in the request's
//! `RequestCache`, so the middleware and any number of extractors in the
//! same request verify the token and hit the store once.
//!
//! Routers expose it through axum's nested state pattern:
//! ```ignore
//! impl FromRef<AppState> for EntityAuth<User> {
//!     fn from_ref(state: &AppState) -> Self {
//!         state.users.clone()
//!     }
//! }
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{request::Parts, HeaderMap};

use crate::cache::{CacheKey, CacheSlot, RequestCache};
use crate::error::AuthError;
use crate::jwt::{Jwt, JwtValidation};
use crate::store::{AuthEntity, EntityStore};

/// Purpose tag of the subject id slot
pub const ENTITY_ID: &str = "EntityId";

/// Extra checks on a loaded entity, run by the middleware
///
/// Return `AuthError::Forbidden` (or another HTTP-classified error) to reject
/// the request.
#[async_trait]
pub trait EntityValidator<E: AuthEntity>: Send + Sync {
    async fn validate_entity(&self, parts: &Parts, entity: &E) -> Result<(), AuthError>;
}

/// Cache slot of the authenticated entity
pub struct EntitySlot<E>(PhantomData<fn() -> E>);

impl<E: AuthEntity> CacheSlot for EntitySlot<E> {
    type Value = E;

    fn key() -> CacheKey {
        CacheKey::of::<E>()
    }
}

/// Cache slot of the subject id taken from the token
pub struct SubjectSlot<E>(PhantomData<fn() -> E>);

impl<E: AuthEntity> CacheSlot for SubjectSlot<E> {
    type Value = E::Id;

    fn key() -> CacheKey {
        CacheKey::composite::<E>(ENTITY_ID)
    }
}

/// Resolves the authenticated `E` of a request
pub struct EntityAuth<E: AuthEntity> {
    jwt: Arc<Jwt>,
    store: Arc<dyn EntityStore<E>>,
    validator: Option<Arc<dyn EntityValidator<E>>>,
}

impl<E: AuthEntity> Clone for EntityAuth<E> {
    fn clone(&self) -> Self {
        Self {
            jwt: Arc::clone(&self.jwt),
            store: Arc::clone(&self.store),
            validator: self.validator.clone(),
        }
    }
}

impl<E: AuthEntity> EntityAuth<E> {
    pub fn new(jwt: Arc<Jwt>, store: Arc<dyn EntityStore<E>>) -> Self {
        Self {
            jwt,
            store,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn EntityValidator<E>>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn jwt(&self) -> &Jwt {
        &self.jwt
    }

    /// Subject id of the request's token
    pub async fn resolve_subject_id(
        &self,
        headers: &HeaderMap,
        cache: &RequestCache,
    ) -> Result<E::Id, AuthError> {
        cache
            .get_or_compute(&SubjectSlot::<E>::key(), || async {
                self.subject_from_headers(headers)
            })
            .await
    }

    fn subject_from_headers(&self, headers: &HeaderMap) -> Result<E::Id, AuthError> {
        let Some(inspected) = self.jwt.inspect_request(headers)? else {
            tracing::debug!("Request carries no credential");
            return Err(AuthError::unauthorized("Unauthorized"));
        };

        let token = match inspected.validation {
            JwtValidation::Valid(token) => token,
            JwtValidation::Invalid(rejection) => {
                tracing::debug!(source = ?inspected.source, ?rejection, "Credential rejected");
                return Err(AuthError::unauthorized(rejection.message()));
            }
        };

        let subject = token
            .subject
            .filter(|subject| !subject.is_empty())
            .ok_or_else(|| AuthError::bad_request("no jwt subject"))?;

        subject.parse::<E::Id>().map_err(|_| {
            tracing::debug!(subject = %subject, "JWT subject is not a valid entity id");
            AuthError::unauthorized("invalid jwt subject")
        })
    }

    /// The entity of the request, loaded by primary key
    ///
    /// `id` skips token resolution. A missing row surfaces as
    /// `AuthError::Store(RepositoryError::NotFound)`.
    pub async fn resolve_entity(
        &self,
        headers: &HeaderMap,
        cache: &RequestCache,
        id: Option<E::Id>,
    ) -> Result<E, AuthError> {
        cache
            .get_or_compute(&EntitySlot::<E>::key(), || async move {
                let id = match id {
                    Some(id) => id,
                    None => self.resolve_subject_id(headers, cache).await?,
                };

                let entity = self.store.find_by_id(&id).await.inspect_err(|e| {
                    tracing::debug!(error = %e, entity_id = %id, "Entity lookup failed");
                })?;

                Ok(entity)
            })
            .await
    }

    /// Resolve the entity and run the validator, if any
    pub async fn authenticate(&self, parts: &Parts, cache: &RequestCache) -> Result<E, AuthError> {
        let entity = self.resolve_entity(&parts.headers, cache, None).await?;

        if let Some(validator) = &self.validator {
            validator.validate_entity(parts, &entity).await?;
        }

        Ok(entity)
    }
}
