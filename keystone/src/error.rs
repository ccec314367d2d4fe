use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

use crate::{AdapterId, Key, Signature};

/// Type alias for boxed errors that can be sent across threads.
///
/// This is the error type of user supplied factories, remap transforms and
/// injection listeners.
pub type StdError = Box<dyn std::error::Error + Send + Sync>;

/// Reserved control-flow signal.
///
/// A factory, remap transform or injection listener that fails with
/// `Cancelled` aborts the enclosing resolution: the signal is never logged or
/// wrapped and reaches the caller of `resolve` as [`Error::Cancelled`].
#[derive(Debug, Clone, Error)]
#[error("Cancelled: {reason}")]
pub struct Cancelled {
    reason: Cow<'static, str>,
}

impl Cancelled {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Chain of implementation types that form a construction cycle.
///
/// The trace starts at the adapter that was re-entered and grows while the
/// error unwinds through the frames that led back to it.
#[derive(Debug, Clone)]
pub struct CycleTrace {
    origin: AdapterId,
    chain: Vec<&'static str>,
    closed: bool,
}

impl CycleTrace {
    pub(crate) fn new(origin: AdapterId, type_name: &'static str) -> Self {
        Self {
            origin,
            chain: vec![type_name],
            closed: false,
        }
    }

    /// Records a frame the error unwinds through.
    pub(crate) fn unwind(&mut self, id: AdapterId, type_name: &'static str) {
        if self.closed {
            return;
        }
        if id == self.origin {
            self.closed = true;
            return;
        }
        self.chain.push(type_name);
    }

    /// Implementation types of the cycle, starting at the re-entered one.
    pub fn chain(&self) -> &[&'static str] {
        &self.chain
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.chain.iter().any(|v| *v == type_name)
    }
}

impl fmt::Display for CycleTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames were appended while unwinding, so the dependency order is
        // the origin followed by the remaining frames reversed.
        let Some((origin, frames)) = self.chain.split_first() else {
            return Ok(());
        };
        f.write_str(origin)?;
        for type_name in frames.iter().rev() {
            write!(f, " -> {type_name}")?;
        }
        write!(f, " -> {origin}")
    }
}

/// Errors raised while binding, resolving or constructing components.
#[derive(Debug, Error)]
pub enum Error {
    /// The builder already holds a binding point for this key.
    #[error("Duplicate binding for {0}")]
    DuplicateBinding(Key),
    /// The binding point was already configured by a `to_*` call.
    #[error("Binding for {0} is already configured")]
    AlreadyBound(Key),
    /// The operation requires a different kind of adapter.
    #[error("Binding for {key} is not {expected}")]
    WrongAdapterKind { key: Key, expected: &'static str },
    /// The builder was used after `build()`.
    #[error("Container builder has already been built")]
    BuilderConsumed,
    /// The operation is not available on the root container.
    #[error("Root container does not support {0}")]
    Unsupported(&'static str),
    /// Neither the container nor any of its parents binds the key.
    #[error("No binding for {0}")]
    UnboundKey(Key),
    /// No constructor of the implementation type can be satisfied.
    #[error(
        "Cannot satisfy dependency {unresolved} of {type_name}, rejected constructors: {}",
        list(.rejected)
    )]
    UnsatisfiableDependencies {
        type_name: &'static str,
        unresolved: Key,
        rejected: Vec<Signature>,
    },
    /// Several constructors of the same arity can be satisfied.
    #[error("Ambiguous constructors of {type_name}: {}", list(.candidates))]
    AmbiguousConstructors {
        type_name: &'static str,
        candidates: Vec<Signature>,
    },
    /// The implementation type declares no usable constructor.
    #[error("No matching constructor of {type_name}, declared: {}", list(.declared))]
    NoMatchingConstructor {
        type_name: &'static str,
        declared: Vec<Signature>,
    },
    /// The key resolved to an instance of another type.
    #[error("{key} does not resolve to {expected}")]
    TypeMismatch { key: Key, expected: &'static str },
    /// Construction re-entered an adapter on the same call chain.
    #[error("Cyclic dependency: {0}")]
    CyclicDependency(CycleTrace),
    /// The implementation type could not be introspected or instantiated.
    #[error("Cannot instantiate {type_name}: {reason}")]
    InstantiationFailure {
        type_name: &'static str,
        reason: String,
    },
    /// The constructor of the implementation type failed.
    #[error("Constructor of {type_name} failed: {source}")]
    ConstructorBodyFailure {
        type_name: &'static str,
        source: StdError,
    },
    /// Reserved control-flow signal, propagated unchanged.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl Error {
    /// Converts an error raised by user code while building `type_name`.
    ///
    /// Runtime errors and control-flow signals are unwrapped, everything else
    /// is wrapped as a constructor body failure.
    pub(crate) fn from_factory(type_name: &'static str, err: StdError) -> Self {
        let err = match err.downcast::<Error>() {
            Ok(v) => return *v,
            Err(v) => v,
        };
        match err.downcast::<Cancelled>() {
            Ok(v) => Error::Cancelled(*v),
            Err(source) => Error::ConstructorBodyFailure { type_name, source },
        }
    }

    /// Returns `true` for the reserved control-flow category.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Error::CyclicDependency(_))
    }
}

fn list(signatures: &[Signature]) -> String {
    signatures
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
