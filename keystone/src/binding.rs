use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    Arguments, ComponentAdapter, Constructor, ConstructorAdapter, Error, Instance, Key, Parameter,
    StdError, SupplierAdapter, ValueAdapter,
};

enum Binding {
    Constructor(ConstructorAdapter),
    Value(ValueAdapter),
    Supplier(SupplierAdapter),
}

/// Single-use configurator of the adapter bound to one key.
///
/// A fresh binding point builds the key's own type through its constructors.
/// The first successful `to_*` call locks the point; any further `to_*` call
/// fails with [`Error::AlreadyBound`]. The remaining configuration calls can
/// be combined freely but require a constructor-based binding.
///
/// # Examples
///
/// ```rust
/// use keystone::{ContainerBuilder, Key, TypeRegistry};
/// use std::sync::Arc;
///
/// let mut builder = ContainerBuilder::new(Arc::new(TypeRegistry::new()));
/// builder.bind(Key::of::<String>())?.to_value("hello".to_string())?;
/// assert!(builder.bind(Key::of::<String>()).is_err());
///
/// let container = builder.build()?;
/// assert_eq!(container.resolve::<String>()?.as_str(), "hello");
/// # Ok::<(), keystone::Error>(())
/// ```
pub struct BindingPoint {
    key: Key,
    binding: Binding,
    locked: bool,
}

impl BindingPoint {
    pub(crate) fn new(key: Key) -> Self {
        Self {
            key,
            binding: Binding::Constructor(ConstructorAdapter::new(key, key)),
            locked: false,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Binds the key to a pre-built value; nothing is ever constructed.
    pub fn to_value<T>(&mut self, value: T) -> Result<&mut Self, Error>
    where
        T: Any + Send + Sync,
    {
        self.to_instance(Arc::new(value))
    }

    /// Binds the key to an already shared instance.
    pub fn to_instance(&mut self, instance: Instance) -> Result<&mut Self, Error> {
        self.lock()?;
        self.binding = Binding::Value(ValueAdapter::new(self.key, instance));
        Ok(self)
    }

    /// Builds `implementation` whenever the key is resolved.
    pub fn to_key(&mut self, implementation: Key) -> Result<&mut Self, Error> {
        self.lock()?;
        self.constructor_mut()?.retarget(implementation);
        Ok(self)
    }

    /// Defers to `supplier` every time the key is resolved.
    pub fn to_supplier<T, F>(&mut self, supplier: F) -> Result<&mut Self, Error>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.lock()?;
        self.binding = Binding::Supplier(SupplierAdapter::new(
            self.key,
            Arc::new(move || Arc::new(supplier()) as Instance),
        ));
        Ok(self)
    }

    /// Caches the constructed instance regardless of the long-lived marker.
    pub fn force_singleton(&mut self) -> Result<&mut Self, Error> {
        self.constructor_mut()?.force_singleton();
        Ok(self)
    }

    /// Transforms every freshly built instance before it is cached or returned.
    pub fn factory<F>(&mut self, remap: F) -> Result<&mut Self, Error>
    where
        F: Fn(Instance) -> Result<Instance, StdError> + Send + Sync + 'static,
    {
        self.constructor_mut()?.set_remap(Arc::new(remap));
        Ok(self)
    }

    /// Invokes `listener` with the construction start time and the new instance.
    ///
    /// Listener failures are reported and swallowed, except [`crate::Cancelled`]
    /// which aborts the resolution.
    pub fn on_injected<F>(&mut self, listener: F) -> Result<&mut Self, Error>
    where
        F: Fn(Instant, &Instance) -> Result<(), StdError> + Send + Sync + 'static,
    {
        self.constructor_mut()?.set_listener(Arc::new(listener));
        Ok(self)
    }

    /// Replaces constructor introspection with an explicit signature.
    pub fn with_constructor_signature<T, F>(
        &mut self,
        params: Vec<Parameter>,
        factory: F,
    ) -> Result<&mut Self, Error>
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<T, StdError> + Send + Sync + 'static,
    {
        self.constructor_mut()?
            .set_signature(Constructor::new(params, factory));
        Ok(self)
    }

    pub(crate) fn into_adapter(self) -> Arc<dyn ComponentAdapter> {
        match self.binding {
            Binding::Constructor(v) => Arc::new(v),
            Binding::Value(v) => Arc::new(v),
            Binding::Supplier(v) => Arc::new(v),
        }
    }

    fn lock(&mut self) -> Result<(), Error> {
        if self.locked {
            return Err(Error::AlreadyBound(self.key));
        }
        self.locked = true;
        Ok(())
    }

    fn constructor_mut(&mut self) -> Result<&mut ConstructorAdapter, Error> {
        match &mut self.binding {
            Binding::Constructor(v) => Ok(v),
            _ => Err(Error::WrongAdapterKind {
                key: self.key,
                expected: "constructor-based",
            }),
        }
    }
}
