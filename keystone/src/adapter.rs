use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

use crate::{
    AdapterId, Arguments, Cancelled, Constructor, Container, CycleTrace, Diagnostic, Error,
    Instance, Key, ResolutionContext, StdError, select_constructor,
};

pub(crate) type Remap = Arc<dyn Fn(Instance) -> Result<Instance, StdError> + Send + Sync>;
pub(crate) type Listener = Arc<dyn Fn(Instant, &Instance) -> Result<(), StdError> + Send + Sync>;
pub(crate) type Supplier = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Produces, and optionally caches, the instance bound to a key.
pub trait ComponentAdapter: Send + Sync {
    fn id(&self) -> AdapterId;

    /// Contract key the adapter is bound to.
    fn key(&self) -> &Key;

    /// Implementation the adapter builds.
    fn implementation(&self) -> &Key;

    /// Returns the instance, constructing it if needed.
    fn instance(
        &self,
        container: &Container,
        ctx: &mut ResolutionContext,
    ) -> Result<Instance, Error>;

    /// Returns the cached instance without constructing anything.
    fn instance_if_created(&self) -> Option<Instance> {
        None
    }
}

/// Adapter returning a pre-built value.
pub struct ValueAdapter {
    id: AdapterId,
    key: Key,
    value: Instance,
}

impl ValueAdapter {
    pub(crate) fn new(key: Key, value: Instance) -> Self {
        Self {
            id: AdapterId::next(),
            key,
            value,
        }
    }
}

impl ComponentAdapter for ValueAdapter {
    fn id(&self) -> AdapterId {
        self.id
    }

    fn key(&self) -> &Key {
        &self.key
    }

    fn implementation(&self) -> &Key {
        &self.key
    }

    fn instance(&self, _: &Container, _: &mut ResolutionContext) -> Result<Instance, Error> {
        Ok(self.value.clone())
    }

    fn instance_if_created(&self) -> Option<Instance> {
        Some(self.value.clone())
    }
}

/// Adapter deferring to an external supplier on every request.
pub struct SupplierAdapter {
    id: AdapterId,
    key: Key,
    supplier: Supplier,
}

impl SupplierAdapter {
    pub(crate) fn new(key: Key, supplier: Supplier) -> Self {
        Self {
            id: AdapterId::next(),
            key,
            supplier,
        }
    }
}

impl ComponentAdapter for SupplierAdapter {
    fn id(&self) -> AdapterId {
        self.id
    }

    fn key(&self) -> &Key {
        &self.key
    }

    fn implementation(&self) -> &Key {
        &self.key
    }

    fn instance(&self, _: &Container, _: &mut ResolutionContext) -> Result<Instance, Error> {
        Ok((self.supplier)())
    }
}

struct InProgress {
    thread: ThreadId,
    chain: Vec<&'static str>,
}

/// Clears the creation marker on every exit path.
struct InProgressGuard<'a> {
    marker: &'a Mutex<Option<InProgress>>,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        *lock(self.marker) = None;
    }
}

/// Adapter building its implementation through a selected constructor.
///
/// Singletons are constructed at most once: readers hit the cached slot
/// without locking, while the first construction runs under the adapter's own
/// guard. A failed construction caches nothing, so the next request retries.
pub struct ConstructorAdapter {
    id: AdapterId,
    key: Key,
    implementation: Key,
    forced_singleton: bool,
    signature: Option<Constructor>,
    remap: Option<Remap>,
    listener: Option<Listener>,
    slot: OnceLock<Instance>,
    guard: Mutex<()>,
    in_progress: Mutex<Option<InProgress>>,
}

impl ConstructorAdapter {
    pub(crate) fn new(key: Key, implementation: Key) -> Self {
        Self {
            id: AdapterId::next(),
            key,
            implementation,
            forced_singleton: false,
            signature: None,
            remap: None,
            listener: None,
            slot: OnceLock::new(),
            guard: Mutex::new(()),
            in_progress: Mutex::new(None),
        }
    }

    pub(crate) fn retarget(&mut self, implementation: Key) {
        self.implementation = implementation;
    }

    pub(crate) fn force_singleton(&mut self) {
        self.forced_singleton = true;
    }

    pub(crate) fn set_remap(&mut self, remap: Remap) {
        self.remap = Some(remap);
    }

    pub(crate) fn set_listener(&mut self, listener: Listener) {
        self.listener = Some(listener);
    }

    pub(crate) fn set_signature(&mut self, constructor: Constructor) {
        self.signature = Some(constructor);
    }

    pub fn is_forced_singleton(&self) -> bool {
        self.forced_singleton
    }

    /// Reports a concurrent construction, or fails when this thread re-enters
    /// an adapter it is already constructing through a detached call chain.
    fn check_in_progress(
        &self,
        container: &Container,
        ctx: &ResolutionContext,
    ) -> Result<(), Error> {
        let marker = lock(&self.in_progress);
        let Some(in_progress) = marker.as_ref() else {
            return Ok(());
        };
        let type_name = self.implementation.type_name();
        if in_progress.thread == thread::current().id() {
            return Err(Error::CyclicDependency(CycleTrace::new(self.id, type_name)));
        }
        container
            .diagnostics()
            .report(&Diagnostic::ConcurrentCreation {
                type_name,
                in_progress: in_progress.chain.clone(),
                requested: ctx.chain(),
            });
        Ok(())
    }

    fn mark_in_progress(&self, ctx: &ResolutionContext) -> InProgressGuard<'_> {
        let mut chain = ctx.chain();
        chain.push(self.implementation.type_name());
        *lock(&self.in_progress) = Some(InProgress {
            thread: thread::current().id(),
            chain,
        });
        InProgressGuard {
            marker: &self.in_progress,
        }
    }

    fn construct(
        &self,
        container: &Container,
        ctx: &mut ResolutionContext,
    ) -> Result<Instance, Error> {
        let started = Instant::now();
        let type_name = self.implementation.type_name();
        let constructor = match &self.signature {
            Some(v) => v.clone(),
            None => select_constructor(&self.implementation, container)?,
        };
        let args = Arguments::resolve(type_name, constructor.params(), container, ctx)?;
        let instance = constructor
            .invoke(args)
            .map_err(|err| self.failed(container, Error::from_factory(type_name, err)))?;
        let instance = match &self.remap {
            Some(remap) => remap(instance)
                .map_err(|err| self.failed(container, Error::from_factory(type_name, err)))?,
            None => instance,
        };
        if let Some(listener) = &self.listener
            && let Err(err) = listener(started, &instance)
        {
            if let Some(cancelled) = control_flow(&err) {
                return Err(Error::Cancelled(cancelled));
            }
            container.diagnostics().report(&Diagnostic::ListenerFailed {
                type_name,
                error: err.to_string(),
            });
        }
        Ok(instance)
    }

    fn failed(&self, container: &Container, err: Error) -> Error {
        if let Error::ConstructorBodyFailure { type_name, .. }
        | Error::InstantiationFailure { type_name, .. } = &err
            && *type_name == self.implementation.type_name()
        {
            container
                .diagnostics()
                .report(&Diagnostic::ConstructionFailed {
                    type_name: *type_name,
                    error: err.to_string(),
                });
        }
        err
    }
}

impl ComponentAdapter for ConstructorAdapter {
    fn id(&self) -> AdapterId {
        self.id
    }

    fn key(&self) -> &Key {
        &self.key
    }

    fn implementation(&self) -> &Key {
        &self.implementation
    }

    fn instance(
        &self,
        container: &Container,
        ctx: &mut ResolutionContext,
    ) -> Result<Instance, Error> {
        if let Some(v) = self.slot.get() {
            return Ok(v.clone());
        }
        let type_name = self.implementation.type_name();
        if ctx.contains(self.id) {
            return Err(Error::CyclicDependency(CycleTrace::new(self.id, type_name)));
        }
        self.check_in_progress(container, ctx)?;
        let _guard = lock(&self.guard);
        if let Some(v) = self.slot.get() {
            return Ok(v.clone());
        }
        let long_lived = container.introspector().is_long_lived(&self.implementation);
        let singleton = self.forced_singleton || long_lived;
        let _marker = self.mark_in_progress(ctx);
        ctx.enter(self.id, type_name);
        let result = self.construct(container, ctx);
        ctx.leave(self.id);
        let instance = match result {
            Ok(v) => v,
            Err(Error::CyclicDependency(mut trace)) => {
                trace.unwind(self.id, type_name);
                return Err(Error::CyclicDependency(trace));
            }
            Err(err) => return Err(err),
        };
        if singleton {
            let _ = self.slot.set(instance.clone());
            if !long_lived {
                container
                    .diagnostics()
                    .report(&Diagnostic::SingletonMarkerMissing { type_name });
            }
        }
        tracing::trace!(key = %self.key, singleton, "Constructed {type_name}");
        Ok(instance)
    }

    fn instance_if_created(&self) -> Option<Instance> {
        self.slot.get().cloned()
    }
}

fn control_flow(err: &StdError) -> Option<Cancelled> {
    if let Some(v) = err.downcast_ref::<Cancelled>() {
        return Some(v.clone());
    }
    match err.downcast_ref::<Error>() {
        Some(Error::Cancelled(v)) => Some(v.clone()),
        _ => None,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
