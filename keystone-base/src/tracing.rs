use std::str::FromStr as _;
use std::sync::atomic::{AtomicBool, Ordering};

use keystone::StdError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::{Config, ConfigSection};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Global tracing subscriber driven by the `tracing` config section.
pub struct Tracing;

impl Tracing {
    /// Installs the global subscriber.
    ///
    /// Returns `false` without touching the subscriber when the config has no
    /// `tracing` section or when a subscriber was already installed.
    pub fn init(config: &Config) -> Result<bool, StdError> {
        let config = match config.get::<Option<TracingConfig>>(TracingConfig::key())? {
            Some(v) => v,
            None => return Ok(false),
        };
        let filter = config.env_filter()?;
        if INITIALIZED.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::Layer::default())
            .try_init()
            .is_ok();
        if installed {
            INITIALIZED.store(true, Ordering::SeqCst);
            tracing::debug!(level = %config.level, "Tracing initialized");
        }
        Ok(installed)
    }

    /// Returns `true` once [`init`](Tracing::init) has installed its subscriber.
    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level",
        default = "default_level"
    )]
    pub level: tracing::Level,
    #[serde(default)]
    pub directives: Vec<String>,
}

impl TracingConfig {
    /// Builds the filter of the configured directives and default level.
    pub fn env_filter(&self) -> Result<EnvFilter, StdError> {
        let mut directives = Vec::new();
        for directive in &self.directives {
            directives.push(directive.parse::<Directive>()?);
        }
        Ok(new_env_filter(&directives, self.level))
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Default::default(),
        }
    }
}

impl ConfigSection for TracingConfig {
    fn key() -> &'static str {
        "tracing"
    }
}

fn new_env_filter(directives: &[Directive], level: tracing::Level) -> EnvFilter {
    let mut filter = EnvFilter::default();
    for directive in directives {
        filter = filter.add_directive(directive.clone());
    }
    filter.add_directive(level.into())
}

fn serialize_level<S>(v: &tracing::Level, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(v.as_str())
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<tracing::Level, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    String::deserialize(deserializer)
        .and_then(|v| tracing::Level::from_str(&v).map_err(|v| Error::custom(format!("{v}"))))
}

fn default_level() -> tracing::Level {
    tracing::Level::DEBUG
}
