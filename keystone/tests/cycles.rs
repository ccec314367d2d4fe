use std::any::type_name;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use keystone::{
    Container, ContainerBuilder, Diagnostic, Diagnostics, Error, Handle, Injectable, Key,
    TypeRegistry, injectable,
};

#[derive(Injectable)]
struct Left {
    right: Arc<Right>,
}

#[derive(Injectable)]
struct Right {
    left: Arc<Left>,
}

#[derive(Injectable)]
struct Ouroboros {
    tail: Arc<Ouroboros>,
}

#[derive(Injectable)]
#[singleton]
struct Parent {
    child: Arc<Child>,
}

#[derive(Injectable)]
struct Child {
    parent: Handle<Parent>,
}

#[derive(Injectable)]
struct Eager {
    probe: Arc<Probe>,
}

struct Probe;

#[injectable]
impl Probe {
    #[constructor]
    fn new(eager: Handle<Eager>) -> Result<Self, Error> {
        eager.get()?;
        Ok(Self)
    }
}

#[derive(Injectable)]
#[singleton]
struct Hub {
    worker: Handle<Worker>,
}

struct Worker;

#[injectable]
impl Worker {
    #[constructor]
    fn new(hub: Arc<Hub>) -> Result<Self, Error> {
        hub.worker.get()?;
        Ok(Self)
    }
}

#[derive(Default)]
struct Recorder {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics for Recorder {
    fn report(&self, diagnostic: &Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic.clone());
    }
}

fn build(configure: impl FnOnce(&mut ContainerBuilder)) -> Container {
    let registry = TypeRegistry::new()
        .with::<Left>()
        .with::<Right>()
        .with::<Ouroboros>()
        .with::<Parent>()
        .with::<Child>()
        .with::<Eager>()
        .with::<Probe>()
        .with::<Hub>()
        .with::<Worker>();
    let mut builder = ContainerBuilder::new(Arc::new(registry));
    configure(&mut builder);
    builder.build().unwrap()
}

#[test]
fn test_two_step_cycle() {
    let container = build(|b| {
        b.bind_type::<Left>().unwrap();
        b.bind_type::<Right>().unwrap();
    });

    for _ in 0..2 {
        let err = container.resolve::<Left>().err().unwrap();
        assert!(err.is_cyclic());
        let Error::CyclicDependency(trace) = &err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(trace.chain().len(), 2);
        assert!(trace.contains(type_name::<Left>()));
        assert!(trace.contains(type_name::<Right>()));
        assert_eq!(
            trace.to_string(),
            format!(
                "{} -> {} -> {}",
                type_name::<Left>(),
                type_name::<Right>(),
                type_name::<Left>()
            )
        );
    }
}

#[test]
fn test_self_cycle() {
    let container = build(|b| {
        b.bind_type::<Ouroboros>().unwrap();
    });
    let err = container.resolve::<Ouroboros>().err().unwrap();
    let Error::CyclicDependency(trace) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(trace.chain(), &[type_name::<Ouroboros>()]);
}

#[test]
fn test_handle_breaks_cycle() {
    let container = build(|b| {
        b.bind_type::<Parent>().unwrap();
        b.bind_type::<Child>().unwrap();
    });
    let parent = container.resolve::<Parent>().unwrap();
    assert!(!parent.child.parent.is_resolved());
    let back = parent.child.parent.get().unwrap();
    assert!(Arc::ptr_eq(&parent, &back));
}

#[test]
fn test_handle_dereferenced_during_construction() {
    let container = build(|b| {
        b.bind_type::<Eager>().unwrap();
        b.bind_type::<Probe>().unwrap();
    });
    let err = container.resolve::<Eager>().err().unwrap();
    let Error::CyclicDependency(trace) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(
        trace.chain(),
        &[type_name::<Eager>(), type_name::<Probe>()]
    );

    // The marker was cleared, so the adapter is usable again.
    assert!(container.resolve::<Probe>().is_err());
    assert!(
        container
            .instance_if_created(&Key::of::<Eager>())
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_handle_reentered_by_its_target() {
    let container = build(|b| {
        b.bind_type::<Hub>().unwrap();
        b.bind_type::<Worker>().unwrap();
    });
    let hub = container.resolve::<Hub>().unwrap();

    let (tx, rx) = mpsc::channel();
    let worker = hub.clone();
    thread::spawn(move || {
        let _ = tx.send(worker.worker.get().map(|_| ()));
    });
    let err = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("handle get did not return")
        .err()
        .unwrap();
    let Error::CyclicDependency(trace) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(trace.chain(), &[type_name::<Worker>()]);

    // The failed attempt keeps the handle attached for a retry.
    assert!(!hub.worker.is_resolved());
    assert!(hub.worker.as_lazy().is_attached());
}

struct Slow(usize);

#[test]
fn test_singleton_constructed_once_under_contention() {
    const THREADS: usize = 8;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let container = build(|b| {
        b.bind(Key::of::<Slow>())
            .unwrap()
            .with_constructor_signature(vec![], move |_| {
                thread::sleep(Duration::from_millis(20));
                Ok(Slow(counter.fetch_add(1, Ordering::SeqCst)))
            })
            .unwrap()
            .force_singleton()
            .unwrap();
    });

    let barrier = Barrier::new(THREADS);
    let instances: Vec<Arc<Slow>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.resolve::<Slow>().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|v| v.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|v| Arc::ptr_eq(v, &instances[0])));
    assert_eq!(instances[0].0, 0);
}

#[test]
fn test_prototypes_under_contention() {
    const THREADS: usize = 4;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let container = build(|b| {
        b.bind(Key::of::<Slow>())
            .unwrap()
            .with_constructor_signature(vec![], move |_| {
                Ok(Slow(counter.fetch_add(1, Ordering::SeqCst)))
            })
            .unwrap();
    });

    let barrier = Barrier::new(THREADS);
    let mut ids: Vec<usize> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    container.resolve::<Slow>().unwrap().0
                })
            })
            .collect();
        handles.into_iter().map(|v| v.join().unwrap()).collect()
    });
    ids.sort();
    assert_eq!(ids, (0..THREADS).collect::<Vec<_>>());
}

#[test]
fn test_concurrent_creation_is_reported() {
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let recorder = Arc::new(Recorder::default());
    let registry = Arc::new(TypeRegistry::new());
    let mut builder = ContainerBuilder::new(registry).with_diagnostics(recorder.clone());
    builder
        .bind(Key::of::<Slow>())
        .unwrap()
        .with_constructor_signature(vec![], move |_| {
            started_tx.lock().unwrap().send(()).unwrap();
            thread::sleep(Duration::from_millis(200));
            Ok(Slow(0))
        })
        .unwrap()
        .force_singleton()
        .unwrap();
    let container = builder.build().unwrap();

    let (first, second) = thread::scope(|s| {
        let first = s.spawn(|| container.resolve::<Slow>().unwrap());
        started_rx.recv().unwrap();
        let second = s.spawn(|| container.resolve::<Slow>().unwrap());
        (first.join().unwrap(), second.join().unwrap())
    });
    assert!(Arc::ptr_eq(&first, &second));

    let diagnostics = recorder.diagnostics.lock().unwrap();
    assert!(diagnostics.iter().any(|v| matches!(
        v,
        Diagnostic::ConcurrentCreation { in_progress, .. }
            if in_progress == &[type_name::<Slow>()]
    )));
}
