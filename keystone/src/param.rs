use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::{Container, Error, Handle, Instance, Key, LazyInstance, ResolutionContext};

/// Formal constructor parameter.
///
/// The shape is decided once, from the declared parameter type: `Handle<T>`
/// parameters are lazy, everything else is looked up directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Resolve the key immediately.
    Direct(Key),
    /// Produce a lazy handle resolving the key on first access.
    Handle(Key),
}

impl Parameter {
    pub fn direct<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self::Direct(Key::of::<T>())
    }

    pub fn handle<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self::Handle(Key::of::<T>())
    }

    pub fn key(&self) -> Key {
        match self {
            Self::Direct(key) | Self::Handle(key) => *key,
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Handle(_))
    }

    /// Returns `true` if the container can supply this parameter.
    ///
    /// Only the presence of a binding is checked, nothing is constructed.
    pub fn is_resolvable(&self, container: &Container) -> bool {
        container.has_binding(&self.key())
    }

    pub(crate) fn resolve(
        &self,
        container: &Container,
        ctx: &mut ResolutionContext,
    ) -> Result<Argument, Error> {
        match self {
            Self::Direct(key) => container.resolve_in(key, ctx).map(Argument::Instance),
            Self::Handle(key) => Ok(Argument::Handle(LazyInstance::new(container.clone(), *key))),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct(key) => write!(f, "{key}"),
            Self::Handle(key) => write!(f, "Handle<{key}>"),
        }
    }
}

/// Resolved constructor argument.
#[derive(Clone)]
pub enum Argument {
    Instance(Instance),
    Handle(LazyInstance),
}

/// Resolved arguments handed to a constructor factory, in parameter order.
pub struct Arguments {
    type_name: &'static str,
    values: std::vec::IntoIter<Argument>,
    position: usize,
}

impl Arguments {
    pub fn new(type_name: &'static str, values: Vec<Argument>) -> Self {
        Self {
            type_name,
            values: values.into_iter(),
            position: 0,
        }
    }

    pub(crate) fn resolve(
        type_name: &'static str,
        params: &[Parameter],
        container: &Container,
        ctx: &mut ResolutionContext,
    ) -> Result<Self, Error> {
        let mut values = Vec::with_capacity(params.len());
        for param in params {
            values.push(param.resolve(container, ctx)?);
        }
        Ok(Self::new(type_name, values))
    }

    /// Number of arguments not taken yet.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Takes the next argument as is.
    pub fn next_argument(&mut self) -> Result<Argument, Error> {
        self.position += 1;
        self.values.next().ok_or_else(|| Error::InstantiationFailure {
            type_name: self.type_name,
            reason: format!("missing argument #{}", self.position),
        })
    }

    /// Takes the next directly resolved argument.
    pub fn instance<T>(&mut self) -> Result<Arc<T>, Error>
    where
        T: Any + Send + Sync,
    {
        match self.next_argument()? {
            Argument::Instance(v) => v.downcast::<T>().map_err(|_| self.mismatch::<T>()),
            Argument::Handle(_) => Err(self.mismatch::<T>()),
        }
    }

    /// Takes the next lazy argument.
    pub fn handle<T>(&mut self) -> Result<Handle<T>, Error>
    where
        T: Any + Send + Sync,
    {
        match self.next_argument()? {
            Argument::Handle(v) => Ok(Handle::new(v)),
            Argument::Instance(_) => Err(self.mismatch::<Handle<T>>()),
        }
    }

    fn mismatch<T>(&self) -> Error {
        Error::InstantiationFailure {
            type_name: self.type_name,
            reason: format!("argument #{} is not {}", self.position, type_name::<T>()),
        }
    }
}
