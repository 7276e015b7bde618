//! Request-scoped memoization
//!
//! A `RequestCache` lives in the request extensions and is dropped with the
//! request. Values are resolved at most once per key: concurrent lookups of
//! a key that is still resolving wait for the first resolution instead of
//! running the resolver again.
//!
//! Keys come in two namespaces. Type keys (`CacheKey::of::<T>()`) are held
//! by `TypeId`; named and composite keys share a flat map. A resolver must
//! not look up its own key, it would wait on itself.

use std::any::{type_name, Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::http::Extensions;
use tokio::sync::OnceCell;

type CachedValue = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<CachedValue>>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Request does not contain cached value [{0}]")]
    Missing(String),

    #[error("Cached value [{key}] is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyKind {
    Named(Cow<'static, str>),
    Composite {
        owner: TypeTag,
        purpose: &'static str,
    },
    Type(TypeTag),
}

/// Identifies one cache slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(KeyKind);

impl CacheKey {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        CacheKey(KeyKind::Named(name.into()))
    }

    /// Slot owned by a type
    pub fn of<T: 'static>() -> Self {
        CacheKey(KeyKind::Type(TypeTag::of::<T>()))
    }

    /// Slot for a (type, purpose) pair
    ///
    /// Every call site naming the same pair gets the same slot.
    pub fn composite<T: 'static>(purpose: &'static str) -> Self {
        CacheKey(KeyKind::Composite {
            owner: TypeTag::of::<T>(),
            purpose,
        })
    }

    pub fn is_type_key(&self) -> bool {
        matches!(self.0, KeyKind::Type(_))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            KeyKind::Named(name) => f.write_str(name),
            KeyKind::Composite { owner, purpose } => write!(f, "{}_{}", owner.name, purpose),
            KeyKind::Type(tag) => f.write_str(tag.name),
        }
    }
}

/// A cache slot with a statically known value type
///
/// Used by the `Cached` extractor to read values some earlier step of the
/// request put into the cache.
pub trait CacheSlot {
    type Value: Clone + Send + Sync + 'static;

    fn key() -> CacheKey;
}

#[derive(Default)]
struct Slots {
    flat: HashMap<CacheKey, Slot>,
    by_type: HashMap<TypeId, Slot>,
}

/// Per-request value store
#[derive(Clone, Default)]
pub struct RequestCache {
    slots: Arc<Mutex<Slots>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache attached to a request, attaching a fresh one if needed
    pub fn from_extensions(extensions: &mut Extensions) -> Self {
        if let Some(cache) = extensions.get::<RequestCache>() {
            return cache.clone();
        }
        let cache = RequestCache::new();
        extensions.insert(cache.clone());
        cache
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.lock();
        match &key.0 {
            KeyKind::Type(tag) => slots.by_type.entry(tag.id).or_default().clone(),
            _ => slots.flat.entry(key.clone()).or_default().clone(),
        }
    }

    fn existing_slot(&self, key: &CacheKey) -> Option<Slot> {
        let slots = self.lock();
        match &key.0 {
            KeyKind::Type(tag) => slots.by_type.get(&tag.id).cloned(),
            _ => slots.flat.get(key).cloned(),
        }
    }

    /// Return the cached value for `key`, resolving it first if needed
    ///
    /// A failed resolution leaves the slot empty; the next lookup runs the
    /// resolver again.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &CacheKey, resolver: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = self.slot(key);
        let value = slot
            .get_or_try_init(|| async {
                let value = resolver().await?;
                tracing::trace!(key = %key, "request cache populated");
                Ok::<CachedValue, E>(Arc::new(value))
            })
            .await?;

        downcast::<T>(key, value).map_err(E::from)
    }

    /// The cached value, if `key` has been resolved in this request
    pub fn get<T: Clone + 'static>(&self, key: &CacheKey) -> Option<T> {
        let slot = self.existing_slot(key)?;
        let value = slot.get()?;
        value.downcast_ref::<T>().cloned()
    }

    /// The cached value, or an error when no earlier step resolved it
    pub fn get_or_err<T: Clone + 'static>(&self, key: &CacheKey) -> Result<T, CacheError> {
        let slot = self
            .existing_slot(key)
            .ok_or_else(|| CacheError::Missing(key.to_string()))?;
        let value = slot
            .get()
            .ok_or_else(|| CacheError::Missing(key.to_string()))?;
        downcast::<T>(key, value)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.existing_slot(key)
            .is_some_and(|slot| slot.initialized())
    }
}

impl fmt::Debug for RequestCache {
    #[mutants::skip] // Debug output only
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.lock();
        f.debug_struct("RequestCache")
            .field("flat", &slots.flat.len())
            .field("by_type", &slots.by_type.len())
            .finish()
    }
}

fn downcast<T: Clone + 'static>(key: &CacheKey, value: &CachedValue) -> Result<T, CacheError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| CacheError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
