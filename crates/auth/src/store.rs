//! Entity lookup by primary key
//!
//! The resolver only needs "find exactly one or report not found". Stores
//! return `RepositoryError::NotFound` for a missing row and leave the HTTP
//! translation to the caller.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres};
use tokio::sync::RwLock;
use warden_common::RepositoryError;

/// A domain type that can be the principal of a token
pub trait AuthEntity: Clone + Send + Sync + 'static {
    /// Primary key, parsed from the token subject
    type Id: FromStr + fmt::Display + Clone + Send + Sync + 'static;

    fn id(&self) -> &Self::Id;
}

/// Loads entities by primary key
#[async_trait]
pub trait EntityStore<E: AuthEntity>: Send + Sync {
    async fn find_by_id(&self, id: &E::Id) -> Result<E, RepositoryError>;
}

/// An entity stored in a PostgreSQL table
pub trait SqlEntity: AuthEntity + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
}

/// `EntityStore` over a PostgreSQL pool
///
/// Uses runtime `sqlx::query_as` so any `SqlEntity` can be loaded without
/// per-entity query macros.
pub struct PgEntityStore<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PgEntityStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PgEntityStore<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<E> EntityStore<E> for PgEntityStore<E>
where
    E: SqlEntity,
    E::Id: for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>,
{
    async fn find_by_id(&self, id: &E::Id) -> Result<E, RepositoryError> {
        let sql = select_by_id::<E>();

        let entity: Option<E> = sqlx::query_as(&sql)
            .bind(id.clone())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, table = E::TABLE, id = %id, "Failed to load entity");
                RepositoryError::Connection(e)
            })?;

        entity.ok_or(RepositoryError::NotFound)
    }
}

fn select_by_id<E: SqlEntity>() -> String {
    format!(
        "SELECT * FROM {} WHERE {} = $1",
        E::TABLE,
        E::PRIMARY_KEY
    )
}

/// In-memory `EntityStore` for tests and local development
///
/// Counts lookups so callers can assert how often the store was hit.
pub struct MemoryEntityStore<E> {
    entities: Arc<RwLock<HashMap<String, E>>>,
    lookups: Arc<AtomicUsize>,
}

impl<E: AuthEntity> MemoryEntityStore<E> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn insert(&self, entity: E) {
        self.entities
            .write()
            .await
            .insert(entity.id().to_string(), entity);
    }

    pub async fn remove(&self, id: &E::Id) -> Option<E> {
        self.entities.write().await.remove(&id.to_string())
    }

    /// Number of `find_by_id` calls so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<E: AuthEntity> Default for MemoryEntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for MemoryEntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
            lookups: Arc::clone(&self.lookups),
        }
    }
}

#[async_trait]
impl<E: AuthEntity> EntityStore<E> for MemoryEntityStore<E> {
    async fn find_by_id(&self, id: &E::Id) -> Result<E, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.entities
            .read()
            .await
            .get(&id.to_string())
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}
