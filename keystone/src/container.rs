use std::any::{Any, type_name};
use std::collections::{HashMap, hash_map};
use std::mem::take;
use std::sync::Arc;

use crate::{
    Arguments, BindingPoint, ComponentAdapter, Constructor, ConstructorAdapter, Diagnostics, Error,
    Instance, Key, LogDiagnostics, Parameter, ResolutionContext, StdError, TypeIntrospector,
};

/// Immutable registry of bindings, chained to an optional parent.
///
/// Lookups fall back to the parent when a key is not bound locally, so a
/// child container overrides the bindings of its parent without removing
/// them. Containers are cheap to clone and safe to share between threads.
///
/// # Examples
///
/// ```rust
/// use keystone::{Container, Injectable, Key, TypeRegistry};
/// use std::sync::Arc;
///
/// #[derive(Injectable)]
/// struct Settings;
///
/// #[derive(Injectable)]
/// struct Server {
///     settings: Arc<Settings>,
/// }
///
/// let registry = Arc::new(TypeRegistry::new().with::<Settings>().with::<Server>());
/// let mut builder = Container::builder(registry);
/// builder.bind_type::<Settings>()?.force_singleton()?;
/// builder.bind_type::<Server>()?;
/// let app = builder.build()?;
///
/// let mut builder = app.child_builder();
/// builder.bind(Key::of::<u16>())?.to_value(8080u16)?;
/// let request = builder.build()?;
///
/// let server = request.resolve::<Server>()?;
/// assert!(Arc::ptr_eq(&server.settings, &app.resolve::<Settings>()?));
/// assert_eq!(*request.resolve::<u16>()?, 8080);
/// # Ok::<(), keystone::Error>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    adapters: HashMap<Key, Arc<dyn ComponentAdapter>>,
    parent: Option<Container>,
    introspector: Arc<dyn TypeIntrospector>,
    diagnostics: Arc<dyn Diagnostics>,
    root: bool,
}

impl Container {
    /// Creates the root sentinel that anchors a chain of containers.
    ///
    /// The root holds no bindings and refuses every resolve operation.
    pub fn root(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self::root_with(introspector, Arc::new(LogDiagnostics))
    }

    pub fn root_with(
        introspector: Arc<dyn TypeIntrospector>,
        diagnostics: Arc<dyn Diagnostics>,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                adapters: HashMap::new(),
                parent: None,
                introspector,
                diagnostics,
                root: true,
            }),
        }
    }

    /// Creates a builder of a parent-less container.
    pub fn builder(introspector: Arc<dyn TypeIntrospector>) -> ContainerBuilder {
        ContainerBuilder::new(introspector)
    }

    /// Creates a builder of a nested scope whose parent is this container.
    pub fn child_builder(&self) -> ContainerBuilder {
        ContainerBuilder {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
            introspector: self.inner.introspector.clone(),
            diagnostics: self.inner.diagnostics.clone(),
            built: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.inner.root
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn introspector(&self) -> &Arc<dyn TypeIntrospector> {
        &self.inner.introspector
    }

    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.inner.diagnostics
    }

    /// Keys bound in this container, excluding its parents.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.adapters.keys().copied().collect()
    }

    /// Returns `true` if the key is bound here or in any parent.
    pub fn has_binding(&self, key: &Key) -> bool {
        self.adapter(key).is_some()
    }

    /// Finds the adapter bound to the key, walking up the parents.
    pub fn adapter(&self, key: &Key) -> Option<Arc<dyn ComponentAdapter>> {
        let mut container = Some(self);
        while let Some(current) = container {
            if let Some(adapter) = current.inner.adapters.get(key) {
                return Some(adapter.clone());
            }
            container = current.parent();
        }
        None
    }

    /// Resolves the instance of `T` bound to `Key::of::<T>()`.
    pub fn resolve<T>(&self) -> Result<Arc<T>, Error>
    where
        T: Any + Send + Sync,
    {
        self.resolve_as(&Key::of::<T>())
    }

    /// Resolves the key and downcasts the instance to `T`.
    pub fn resolve_as<T>(&self, key: &Key) -> Result<Arc<T>, Error>
    where
        T: Any + Send + Sync,
    {
        downcast(key, self.resolve_key(key)?)
    }

    /// Resolves the instance bound to the key.
    pub fn resolve_key(&self, key: &Key) -> Result<Instance, Error> {
        self.ensure_not_root("resolve")?;
        self.resolve_in(key, &mut ResolutionContext::new())
    }

    pub(crate) fn resolve_in(
        &self,
        key: &Key,
        ctx: &mut ResolutionContext,
    ) -> Result<Instance, Error> {
        if let Some(adapter) = self.inner.adapters.get(key) {
            return adapter.instance(self, ctx);
        }
        match &self.inner.parent {
            Some(parent) => parent.resolve_in(key, ctx),
            None => Err(Error::UnboundKey(*key)),
        }
    }

    /// Returns the cached instance of the key if it was already constructed.
    pub fn instance_if_created(&self, key: &Key) -> Result<Option<Instance>, Error> {
        self.ensure_not_root("instance_if_created")?;
        Ok(self.adapter(key).and_then(|v| v.instance_if_created()))
    }

    /// Constructs a `T` that has no binding, resolving its dependencies here.
    ///
    /// The instance is never cached.
    pub fn unbound_instance<T>(&self) -> Result<Arc<T>, Error>
    where
        T: Any + Send + Sync,
    {
        let key = Key::of::<T>();
        downcast(&key, self.unbound_instance_key(&key)?)
    }

    pub fn unbound_instance_key(&self, implementation: &Key) -> Result<Instance, Error> {
        self.ensure_not_root("unbound_instance")?;
        let adapter = ConstructorAdapter::new(*implementation, *implementation);
        adapter.instance(self, &mut ResolutionContext::new())
    }

    /// Constructs a `T` from an explicit signature and factory.
    pub fn unbound_instance_with<T, F>(
        &self,
        params: Vec<Parameter>,
        factory: F,
    ) -> Result<Arc<T>, Error>
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<T, StdError> + Send + Sync + 'static,
    {
        self.ensure_not_root("unbound_instance")?;
        let key = Key::of::<T>();
        let mut adapter = ConstructorAdapter::new(key, key);
        adapter.set_signature(Constructor::new(params, factory));
        downcast(&key, adapter.instance(self, &mut ResolutionContext::new())?)
    }

    fn ensure_not_root(&self, operation: &'static str) -> Result<(), Error> {
        if self.inner.root {
            return Err(Error::Unsupported(operation));
        }
        Ok(())
    }
}

fn downcast<T>(key: &Key, instance: Instance) -> Result<Arc<T>, Error>
where
    T: Any + Send + Sync,
{
    instance.downcast::<T>().map_err(|_| Error::TypeMismatch {
        key: *key,
        expected: type_name::<T>(),
    })
}

/// Collects binding points and freezes them into a [`Container`].
pub struct ContainerBuilder {
    bindings: HashMap<Key, BindingPoint>,
    parent: Option<Container>,
    introspector: Arc<dyn TypeIntrospector>,
    diagnostics: Arc<dyn Diagnostics>,
    built: bool,
}

impl ContainerBuilder {
    /// Creates a builder of a parent-less container.
    pub fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
            introspector,
            diagnostics: Arc::new(LogDiagnostics),
            built: false,
        }
    }

    /// Replaces the diagnostics sink of the container being built.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn set_diagnostics(&mut self, diagnostics: Arc<dyn Diagnostics>) -> &mut Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Registers a new binding point for the key.
    ///
    /// Binding the same key twice fails with [`Error::DuplicateBinding`].
    pub fn bind(&mut self, key: Key) -> Result<&mut BindingPoint, Error> {
        if self.built {
            return Err(Error::BuilderConsumed);
        }
        match self.bindings.entry(key) {
            hash_map::Entry::Occupied(_) => Err(Error::DuplicateBinding(key)),
            hash_map::Entry::Vacant(v) => Ok(v.insert(BindingPoint::new(key))),
        }
    }

    /// Registers a new binding point for `Key::of::<T>()`.
    pub fn bind_type<T>(&mut self) -> Result<&mut BindingPoint, Error>
    where
        T: ?Sized + 'static,
    {
        self.bind(Key::of::<T>())
    }

    pub fn has_binding(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn parent(&self) -> Option<&Container> {
        self.parent.as_ref()
    }

    /// Freezes the collected bindings into a container.
    ///
    /// The builder cannot be used afterwards.
    pub fn build(&mut self) -> Result<Container, Error> {
        if self.built {
            return Err(Error::BuilderConsumed);
        }
        self.built = true;
        let adapters: HashMap<_, _> = take(&mut self.bindings)
            .into_iter()
            .map(|(key, point)| (key, point.into_adapter()))
            .collect();
        tracing::debug!(
            bindings = adapters.len(),
            nested = self.parent.is_some(),
            "Container built"
        );
        Ok(Container {
            inner: Arc::new(ContainerInner {
                adapters,
                parent: self.parent.take(),
                introspector: self.introspector.clone(),
                diagnostics: self.diagnostics.clone(),
                root: false,
            }),
        })
    }
}
