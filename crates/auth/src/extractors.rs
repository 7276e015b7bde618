//! Axum extractors for authenticated entities
//!
//! Generic over any state `S` where `EntityAuth<E>: FromRef<S>`.
//! All extractors share the request's `RequestCache`, so behind
//! `require_entity` they reuse what the middleware already resolved.

use std::convert::Infallible;
use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};

use crate::cache::{CacheSlot, RequestCache};
use crate::entity::{EntityAuth, EntitySlot};
use crate::error::AuthError;
use crate::store::AuthEntity;

impl<S> FromRequestParts<S> for RequestCache
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(RequestCache::from_extensions(&mut parts.extensions))
    }
}

/// The authenticated entity
///
/// Resolves on its own when no middleware ran. Failures use the JSON error
/// response, with a missing entity as 404.
#[derive(Debug, Clone)]
pub struct AuthedEntity<E>(pub E);

impl<S, E> FromRequestParts<S> for AuthedEntity<E>
where
    E: AuthEntity,
    EntityAuth<E>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth = EntityAuth::<E>::from_ref(state);
        let cache = RequestCache::from_extensions(&mut parts.extensions);

        let entity = auth.resolve_entity(&parts.headers, &cache, None).await?;
        Ok(AuthedEntity(entity))
    }
}

/// Primary key of the authenticated entity, without loading it
pub struct AuthedSubject<E: AuthEntity>(pub E::Id, PhantomData<fn() -> E>);

impl<E: AuthEntity> AuthedSubject<E> {
    pub fn id(&self) -> &E::Id {
        &self.0
    }

    pub fn into_inner(self) -> E::Id {
        self.0
    }
}

impl<S, E> FromRequestParts<S> for AuthedSubject<E>
where
    E: AuthEntity,
    EntityAuth<E>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let auth = EntityAuth::<E>::from_ref(state);
        let cache = RequestCache::from_extensions(&mut parts.extensions);

        let id = auth.resolve_subject_id(&parts.headers, &cache).await?;
        Ok(AuthedSubject(id, PhantomData))
    }
}

/// A value an earlier step of the request already put in the cache
///
/// Fails with a 500 when the slot is empty, which means the route is missing
/// the middleware that fills it. Use `Option<Cached<K>>` for slots that may
/// legitimately be empty.
pub struct Cached<K: CacheSlot>(pub K::Value);

/// The entity cached by `require_entity`
pub type CachedEntity<E> = Cached<EntitySlot<E>>;

impl<S, K> FromRequestParts<S> for Cached<K>
where
    K: CacheSlot,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let cache = RequestCache::from_extensions(&mut parts.extensions);
        let value = cache.get_or_err::<K::Value>(&K::key())?;
        Ok(Cached(value))
    }
}

impl<S, K> OptionalFromRequestParts<S> for Cached<K>
where
    K: CacheSlot,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Option<Self>, Self::Rejection> {
        let cache = RequestCache::from_extensions(&mut parts.extensions);
        Ok(cache.get::<K::Value>(&K::key()).map(Cached))
    }
}
