//! # keystone-base
//!
//! Ambient services for applications built on the keystone container:
//! sectioned JSON configuration, tracing subscriber setup and a configurable
//! diagnostics sink.
//!
//! ## Core Components
//!
//! - **Configuration System**: Typed sections loaded, merged and bound into a container
//! - **Tracing Integration**: Structured logging with an `EnvFilter` from config
//! - **Diagnostics**: Per-kind filtering of the container's non-fatal reports
//!
//! ## Quick Start
//!
//! ```rust
//! use keystone::{ContainerBuilder, Injectable, TypeRegistry};
//! use keystone_base::{BindConfigExt, Config, ConfiguredDiagnostics, config_section};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[config_section("server")]
//! #[derive(Serialize, Deserialize)]
//! struct ServerConfig {
//!     port: u16,
//! }
//!
//! #[derive(Injectable)]
//! struct Server {
//!     config: Arc<ServerConfig>,
//! }
//!
//! let config = Config::new()
//!     .with("server", ServerConfig { port: 8080 })
//!     .with("diagnostics", serde_json::json!({"policy_mismatch": false}));
//!
//! let registry = Arc::new(TypeRegistry::new().with::<Server>());
//! let mut builder = ContainerBuilder::new(registry)
//!     .with_diagnostics(Arc::new(ConfiguredDiagnostics::from_config(&config)?));
//! builder.bind_section::<ServerConfig>(&config)?;
//! builder.bind_type::<Server>()?;
//! let container = builder.build()?;
//!
//! assert_eq!(container.resolve::<Server>()?.config.port, 8080);
//! # Ok::<(), keystone::StdError>(())
//! ```
//!
//! ## Features
//!
//! - `macros` (default): Enables `#[config_section("key")]`

mod config;
mod diagnostics;
mod tracing;

pub use self::tracing::*;
pub use config::*;
pub use diagnostics::*;

#[cfg(feature = "macros")]
pub use keystone_base_macros::*;
