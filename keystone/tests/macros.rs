use std::fmt;
use std::sync::Arc;

use keystone::{
    ContainerBuilder, Error, Handle, Injectable, Key, Parameter, TypeIntrospector as _,
    TypeRegistry, injectable,
};

#[derive(Injectable)]
#[singleton]
struct Settings;

#[derive(Injectable)]
struct Storage {
    #[named("primary")]
    primary: Arc<String>,
    #[named("replica")]
    replica: Handle<String>,
    settings: Arc<Settings>,
}

struct Mailer {
    via: &'static str,
}

#[injectable]
impl Mailer {
    #[constructor]
    fn local() -> Self {
        Self { via: "local" }
    }

    #[constructor]
    fn relayed(_relay: Arc<u16>) -> Self {
        Self { via: "relay" }
    }

    fn describe(&self) -> &'static str {
        self.via
    }
}

struct Metrics {
    via: &'static str,
}

#[injectable(singleton)]
impl Metrics {
    #[constructor]
    fn plain(_settings: Arc<Settings>) -> Arc<Self> {
        Arc::new(Self { via: "plain" })
    }

    #[constructor]
    #[inject]
    fn tagged(#[named("tag")] _tag: Arc<String>) -> Arc<Self> {
        Arc::new(Self { via: "tagged" })
    }
}

#[derive(Debug)]
struct PoolError(&'static str);

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool error: {}", self.0)
    }
}

impl std::error::Error for PoolError {}

struct Pool;

#[injectable]
impl Pool {
    #[constructor]
    fn connect(settings: Arc<Settings>) -> Result<Self, PoolError> {
        let _ = settings;
        Err(PoolError("unreachable host"))
    }
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new()
            .with::<Settings>()
            .with::<Storage>()
            .with::<Mailer>()
            .with::<Metrics>()
            .with::<Pool>(),
    )
}

#[test]
fn test_derive_signature() {
    let constructors = Storage::constructors();
    assert_eq!(constructors.len(), 1);
    assert_eq!(
        constructors[0].params(),
        &[
            Parameter::Direct(Key::named::<String>("primary")),
            Parameter::Handle(Key::named::<String>("replica")),
            Parameter::direct::<Settings>(),
        ]
    );
    assert!(!Storage::long_lived());
    assert!(Settings::long_lived());
    assert_eq!(Settings::constructors()[0].arity(), 0);
}

#[test]
fn test_derive_resolves_named_fields() {
    let mut builder = ContainerBuilder::new(registry());
    builder.bind_type::<Settings>().unwrap();
    builder.bind_type::<Storage>().unwrap();
    builder
        .bind(Key::named::<String>("primary"))
        .unwrap()
        .to_value("db1".to_string())
        .unwrap();
    builder
        .bind(Key::named::<String>("replica"))
        .unwrap()
        .to_value("db2".to_string())
        .unwrap();
    let container = builder.build().unwrap();

    let storage = container.resolve::<Storage>().unwrap();
    assert_eq!(storage.primary.as_str(), "db1");
    assert_eq!(storage.replica.get().unwrap().as_str(), "db2");
    assert!(Arc::ptr_eq(
        &storage.settings,
        &container.resolve::<Settings>().unwrap()
    ));
}

#[test]
fn test_injectable_constructor_order() {
    let constructors = Mailer::constructors();
    assert_eq!(constructors.len(), 2);
    assert_eq!(constructors[0].arity(), 0);
    assert_eq!(constructors[1].params(), &[Parameter::direct::<u16>()]);
    assert!(!constructors.iter().any(|v| v.is_designated()));
    assert!(!Mailer::long_lived());
}

#[test]
fn test_injectable_greediest() {
    let mut builder = ContainerBuilder::new(registry());
    builder.bind_type::<Mailer>().unwrap();
    let container = builder.build().unwrap();
    assert_eq!(container.resolve::<Mailer>().unwrap().via, "local");

    let mut builder = container.child_builder();
    builder.bind_type::<Mailer>().unwrap();
    builder.bind(Key::of::<u16>()).unwrap().to_value(25u16).unwrap();
    let child = builder.build().unwrap();
    assert_eq!(child.resolve::<Mailer>().unwrap().describe(), "relay");
}

#[test]
fn test_injectable_designated_and_singleton() {
    assert!(Metrics::long_lived());
    assert!(Metrics::constructors()[1].is_designated());

    let registry = registry();
    assert!(registry.is_long_lived(&Key::of::<Metrics>()));

    let mut builder = ContainerBuilder::new(registry);
    builder.bind_type::<Settings>().unwrap();
    builder.bind_type::<Metrics>().unwrap();
    builder
        .bind(Key::named::<String>("tag"))
        .unwrap()
        .to_value("svc".to_string())
        .unwrap();
    let container = builder.build().unwrap();

    let first = container.resolve::<Metrics>().unwrap();
    let second = container.resolve::<Metrics>().unwrap();
    assert_eq!(first.via, "tagged");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_injectable_result_error() {
    let mut builder = ContainerBuilder::new(registry());
    builder.bind_type::<Settings>().unwrap();
    builder.bind_type::<Pool>().unwrap();
    let container = builder.build().unwrap();

    let err = container.resolve::<Pool>().err().unwrap();
    let Error::ConstructorBodyFailure { source, .. } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(source.to_string(), "pool error: unreachable host");
    assert!(source.downcast_ref::<PoolError>().is_some());
}
