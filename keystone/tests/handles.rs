use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use keystone::{
    Container, ContainerBuilder, Error, Handle, Injectable, Key, Parameter, StdError,
    TypeRegistry,
};

#[derive(Injectable)]
struct Index;

#[derive(Injectable)]
struct Search {
    index: Handle<Index>,
}

struct Flaky;

fn registry() -> Arc<TypeRegistry> {
    Arc::new(TypeRegistry::new().with::<Index>().with::<Search>())
}

fn build(configure: impl FnOnce(&mut ContainerBuilder)) -> Container {
    let mut builder = ContainerBuilder::new(registry());
    configure(&mut builder);
    builder.build().unwrap()
}

#[test]
fn test_handle_resolves_once() {
    let container = build(|b| {
        b.bind_type::<Index>().unwrap();
        b.bind_type::<Search>().unwrap();
    });
    let search = container.resolve::<Search>().unwrap();
    assert!(!search.index.is_resolved());
    assert!(search.index.as_lazy().is_attached());
    assert_eq!(search.index.key(), Key::of::<Index>());

    let first = search.index.get().unwrap();
    let second = search.index.get().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(search.index.is_resolved());
    assert!(!search.index.as_lazy().is_attached());

    // Index is a prototype: the container builds a fresh one.
    let fresh = container.resolve::<Index>().unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));

    // Clones share the cached value.
    let clone = search.index.clone();
    assert!(Arc::ptr_eq(&clone.get().unwrap(), &first));
}

#[test]
fn test_handle_retries_after_failure() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let container = build(|b| {
        b.bind(Key::of::<Flaky>())
            .unwrap()
            .with_constructor_signature(vec![], move |_| -> Result<Flaky, StdError> {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err("warming up".into());
                }
                Ok(Flaky)
            })
            .unwrap();
        b.bind(Key::of::<String>())
            .unwrap()
            .with_constructor_signature(vec![Parameter::handle::<Flaky>()], |mut args| {
                let flaky = args.handle::<Flaky>()?;
                assert!(matches!(
                    flaky.get(),
                    Err(Error::ConstructorBodyFailure { .. })
                ));
                assert!(flaky.as_lazy().is_attached());
                flaky.get()?;
                assert!(!flaky.as_lazy().is_attached());
                Ok("recovered".to_string())
            })
            .unwrap();
    });
    assert_eq!(container.resolve::<String>().unwrap().as_str(), "recovered");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_handle_to_unbound_key() {
    let container = build(|b| {
        b.bind(Key::of::<Search>())
            .unwrap()
            .with_constructor_signature(vec![Parameter::handle::<Index>()], |mut args| {
                Ok(Search {
                    index: args.handle()?,
                })
            })
            .unwrap();
    });
    // Binding is checked on access, not on construction.
    let search = container.resolve::<Search>().unwrap();
    assert!(matches!(search.index.get(), Err(Error::UnboundKey(_))));
    assert!(matches!(search.index.get(), Err(Error::UnboundKey(_))));
    assert!(!search.index.is_resolved());
}

#[test]
fn test_handle_type_mismatch() {
    let container = build(|b| {
        b.bind(Key::of::<Index>()).unwrap().to_value(42u32).unwrap();
        b.bind_type::<Search>().unwrap();
    });
    let search = container.resolve::<Search>().unwrap();
    assert!(matches!(
        search.index.get(),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_handle_uses_its_scope() {
    let parent = build(|b| {
        b.bind(Key::of::<u32>()).unwrap().to_value(1u32).unwrap();
    });
    let mut builder = parent.child_builder();
    builder.bind(Key::of::<u32>()).unwrap().to_value(2u32).unwrap();
    builder
        .bind(Key::of::<String>())
        .unwrap()
        .with_constructor_signature(vec![Parameter::handle::<u32>()], |mut args| {
            let value = args.handle::<u32>()?;
            Ok(format!("value={}", value.get()?))
        })
        .unwrap();
    let child = builder.build().unwrap();

    assert_eq!(child.resolve::<String>().unwrap().as_str(), "value=2");
}
