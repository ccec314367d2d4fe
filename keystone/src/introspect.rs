//! Compile-time type introspection.
//!
//! The container never inspects types at runtime. Instead every implementation
//! type describes its constructors through the [`Injectable`] trait (usually
//! generated by `#[derive(Injectable)]` or `#[injectable]`) and the description
//! is served to the container by a [`TypeIntrospector`].
//!
//! # Examples
//!
//! A hand-written registration table:
//!
//! ```rust
//! use keystone::{Constructor, Injectable, Parameter, TypeRegistry};
//! use std::sync::Arc;
//!
//! struct Clock;
//!
//! struct Scheduler {
//!     clock: Arc<Clock>,
//! }
//!
//! impl Injectable for Clock {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(vec![], |_| Ok(Clock))]
//!     }
//! }
//!
//! impl Injectable for Scheduler {
//!     fn constructors() -> Vec<Constructor> {
//!         vec![Constructor::new(vec![Parameter::direct::<Clock>()], |mut args| {
//!             Ok(Scheduler {
//!                 clock: args.instance()?,
//!             })
//!         })]
//!     }
//! }
//!
//! let registry = TypeRegistry::new().with::<Clock>().with::<Scheduler>();
//! assert_eq!(registry.len(), 2);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::{Arguments, Error, Key, Parameter, StdError};

/// Type-erased component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(Arguments) -> Result<Instance, StdError> + Send + Sync>;

/// Formal parameter list of a constructor, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<Parameter>);

impl Signature {
    pub fn params(&self) -> &[Parameter] {
        &self.0
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(")")
    }
}

/// A way to build an implementation type from resolved arguments.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<Parameter>,
    designated: bool,
    factory: Factory,
}

impl Constructor {
    /// Creates a constructor whose factory returns the component by value.
    pub fn new<T, F>(params: Vec<Parameter>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<T, StdError> + Send + Sync + 'static,
    {
        Self::erased(params, move |args| {
            factory(args).map(|v| Arc::new(v) as Instance)
        })
    }

    /// Creates a constructor whose factory returns an already shared component.
    pub fn shared<T, F>(params: Vec<Parameter>, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arguments) -> Result<Arc<T>, StdError> + Send + Sync + 'static,
    {
        Self::erased(params, move |args| factory(args).map(|v| v as Instance))
    }

    /// Creates a constructor from a type-erased factory.
    pub fn erased<F>(params: Vec<Parameter>, factory: F) -> Self
    where
        F: Fn(Arguments) -> Result<Instance, StdError> + Send + Sync + 'static,
    {
        Self {
            params,
            designated: false,
            factory: Arc::new(factory),
        }
    }

    /// Flags this constructor as the designated injection point.
    pub fn designated(mut self) -> Self {
        self.designated = true;
        self
    }

    pub fn is_designated(&self) -> bool {
        self.designated
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn signature(&self) -> Signature {
        Signature(self.params.clone())
    }

    pub(crate) fn invoke(&self, args: Arguments) -> Result<Instance, StdError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("signature", &self.signature().to_string())
            .field("designated", &self.designated)
            .finish()
    }
}

/// Trait for types the container knows how to construct.
///
/// Implementations are normally generated by `#[derive(Injectable)]` or by the
/// `#[injectable]` attribute on an impl block.
pub trait Injectable: Send + Sync + 'static {
    /// Constructors in declaration order.
    fn constructors() -> Vec<Constructor>;

    /// Returns `true` if the type is long-lived and cached by default.
    fn long_lived() -> bool {
        false
    }
}

/// Capability that describes implementation types to the container.
pub trait TypeIntrospector: Send + Sync {
    /// Enumerates the constructors of an implementation type.
    fn constructors(&self, implementation: &Key) -> Result<Vec<Constructor>, Error>;

    /// Returns `true` if the implementation type carries the long-lived marker.
    fn is_long_lived(&self, implementation: &Key) -> bool;
}

#[derive(Clone)]
struct TypeInfo {
    constructors: Vec<Constructor>,
    long_lived: bool,
}

/// Registration table of injectable types.
///
/// The registry is shared between containers and accepts new registrations at
/// any time, so that scopes created later can reach types registered late.
#[derive(Default)]
pub struct TypeRegistry {
    types: DashMap<TypeId, TypeInfo>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the injectable type `T`, replacing a previous registration.
    pub fn register<T>(&self) -> &Self
    where
        T: Injectable,
    {
        self.register_with(Key::of::<T>(), T::constructors(), T::long_lived())
    }

    /// Registers a hand-written constructor table for an implementation type.
    pub fn register_with(
        &self,
        implementation: Key,
        constructors: Vec<Constructor>,
        long_lived: bool,
    ) -> &Self {
        self.types.insert(
            implementation.type_id(),
            TypeInfo {
                constructors,
                long_lived,
            },
        );
        self
    }

    /// Registers the injectable type `T` and returns the registry.
    pub fn with<T>(self) -> Self
    where
        T: Injectable,
    {
        self.register::<T>();
        self
    }

    pub fn is_registered(&self, implementation: &Key) -> bool {
        self.types.contains_key(&implementation.type_id())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeIntrospector for TypeRegistry {
    fn constructors(&self, implementation: &Key) -> Result<Vec<Constructor>, Error> {
        self.types
            .get(&implementation.type_id())
            .map(|v| v.constructors.clone())
            .ok_or_else(|| Error::InstantiationFailure {
                type_name: implementation.type_name(),
                reason: "type is not registered for injection".into(),
            })
    }

    fn is_long_lived(&self, implementation: &Key) -> bool {
        self.types
            .get(&implementation.type_id())
            .is_some_and(|v| v.long_lived)
    }
}
