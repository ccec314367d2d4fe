use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::{Container, Error, Instance, Key};

struct Lazy {
    key: Key,
    value: OnceLock<Instance>,
    // Cleared once the value is cached so the handle stops retaining the graph.
    pending: Mutex<Option<Container>>,
}

/// Type-erased lazy handle.
///
/// The first successful [`get`](LazyInstance::get) resolves the key through the
/// container captured at creation and caches the result; a failed attempt
/// keeps the container so the next call retries. Threads racing on the first
/// call all observe the first cached value.
#[derive(Clone)]
pub struct LazyInstance {
    inner: Arc<Lazy>,
}

impl LazyInstance {
    pub(crate) fn new(container: Container, key: Key) -> Self {
        Self {
            inner: Arc::new(Lazy {
                key,
                value: OnceLock::new(),
                pending: Mutex::new(Some(container)),
            }),
        }
    }

    pub fn key(&self) -> Key {
        self.inner.key
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.value.get().is_some()
    }

    pub fn get(&self) -> Result<Instance, Error> {
        if let Some(v) = self.inner.value.get() {
            return Ok(v.clone());
        }
        // Not held while resolving: a re-entry from this thread must reach the
        // adapter cycle check.
        let container = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(container) = container else {
            return match self.inner.value.get() {
                Some(v) => Ok(v.clone()),
                None => Err(Error::InstantiationFailure {
                    type_name: self.inner.key.type_name(),
                    reason: "lazy handle lost its container".into(),
                }),
            };
        };
        let instance = container.resolve_key(&self.inner.key)?;
        let instance = self.inner.value.get_or_init(|| instance).clone();
        *self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(instance)
    }

    /// Returns `true` while the handle still references its container.
    pub fn is_attached(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for LazyInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInstance")
            .field("key", &self.inner.key)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Deferred dependency on `T`.
///
/// Declaring a `Handle<T>` constructor parameter postpones resolution of `T`
/// until the first call to [`get`](Handle::get). Later calls return the cached
/// value without consulting the container.
///
/// # Examples
///
/// ```rust
/// use keystone::{ContainerBuilder, Handle, Injectable, TypeRegistry};
/// use std::sync::Arc;
///
/// #[derive(Injectable)]
/// struct Index;
///
/// #[derive(Injectable)]
/// struct Search {
///     index: Handle<Index>,
/// }
///
/// let registry = Arc::new(TypeRegistry::new().with::<Index>().with::<Search>());
/// let mut builder = ContainerBuilder::new(registry);
/// builder.bind_type::<Index>()?;
/// builder.bind_type::<Search>()?;
/// let container = builder.build()?;
///
/// let search = container.resolve::<Search>()?;
/// assert!(!search.index.is_resolved());
/// let _index: Arc<Index> = search.index.get()?;
/// assert!(search.index.is_resolved());
/// # Ok::<(), keystone::Error>(())
/// ```
pub struct Handle<T> {
    inner: LazyInstance,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T>
where
    T: Any + Send + Sync,
{
    pub fn new(inner: LazyInstance) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> Result<Arc<T>, Error> {
        self.inner
            .get()?
            .downcast::<T>()
            .map_err(|_| Error::TypeMismatch {
                key: self.inner.key(),
                expected: type_name::<T>(),
            })
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.is_resolved()
    }

    pub fn key(&self) -> Key {
        self.inner.key()
    }

    pub fn as_lazy(&self) -> &LazyInstance {
        &self.inner
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.inner).finish()
    }
}
