//! # keystone
//!
//! A constructor-injection container for Rust applications: declarative
//! bindings are turned into a live object graph on demand, with constructor
//! selection, cycle detection, at-most-once singletons and lazy handles.
//!
//! ## Core Concepts
//!
//! - **Key**: Identity of a bindable contract, optionally qualified
//! - **Binding Point**: Single-use configurator of the adapter bound to a key
//! - **Container**: Immutable registry of bindings chained to an optional parent
//! - **Component Adapter**: Produces and optionally caches the instance of a key
//! - **Injectable**: Compile-time description of the constructors of a type
//! - **Handle**: Deferred dependency resolved on first access
//!
//! ## Basic Usage
//!
//! ```rust
//! use keystone::{ContainerBuilder, Injectable, TypeRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[singleton]
//! struct Database;
//!
//! #[derive(Injectable)]
//! struct Repository {
//!     database: Arc<Database>,
//! }
//!
//! let registry = Arc::new(TypeRegistry::new().with::<Database>().with::<Repository>());
//! let mut builder = ContainerBuilder::new(registry);
//! builder.bind_type::<Database>()?;
//! builder.bind_type::<Repository>()?;
//! let container = builder.build()?;
//!
//! let first = container.resolve::<Repository>()?;
//! let second = container.resolve::<Repository>()?;
//! assert!(!Arc::ptr_eq(&first, &second));
//! assert!(Arc::ptr_eq(&first.database, &second.database));
//! # Ok::<(), keystone::Error>(())
//! ```
//!
//! ## Constructor Selection
//!
//! Types with several constructors are built through the greediest one whose
//! parameters are all bound; a constructor marked `#[inject]` always wins:
//!
//! ```rust
//! use keystone::{ContainerBuilder, Key, TypeRegistry, injectable};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     relay: Option<String>,
//! }
//!
//! #[injectable]
//! impl Mailer {
//!     #[constructor]
//!     fn local() -> Self {
//!         Self { relay: None }
//!     }
//!
//!     #[constructor]
//!     fn relayed(relay: Arc<String>) -> Self {
//!         Self { relay: Some(relay.to_string()) }
//!     }
//! }
//!
//! let registry = Arc::new(TypeRegistry::new().with::<Mailer>());
//! let mut builder = ContainerBuilder::new(registry);
//! builder.bind_type::<Mailer>()?;
//! builder.bind(Key::of::<String>())?.to_value("smtp.local".to_string())?;
//! let container = builder.build()?;
//!
//! assert_eq!(container.resolve::<Mailer>()?.relay.as_deref(), Some("smtp.local"));
//! # Ok::<(), keystone::Error>(())
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[derive(Injectable)]` and `#[injectable]`

mod adapter;
mod binding;
mod container;
mod context;
mod diagnostics;
mod error;
mod handle;
mod introspect;
mod key;
mod param;
mod select;

pub use adapter::*;
pub use binding::*;
pub use container::*;
pub use context::*;
pub use diagnostics::*;
pub use error::*;
pub use handle::*;
pub use introspect::*;
pub use key::*;
pub use param::*;

pub(crate) use select::select_constructor;

#[cfg(feature = "macros")]
pub use keystone_macros::*;
