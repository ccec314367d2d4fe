use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use keystone::{ContainerBuilder, Key, StdError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// JSON-backed configuration split into named sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) configs: BTreeMap<String, serde_json::Value>,
}

/// Typed configuration section stored under a fixed key.
///
/// Usually implemented with `#[config_section("key")]`.
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes the named section; a missing section reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(
            self.configs
                .get(name.as_ref())
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        )?)
    }

    /// Deserializes the section of `T`.
    pub fn section<T>(&self) -> Result<T, StdError>
    where
        T: ConfigSection,
    {
        self.get(T::key())
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        self.configs
            .insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Stores the section and returns the config.
    ///
    /// A value that cannot be serialized is logged and skipped.
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Serialize,
    {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(v) => {
                self.configs.insert(name, v);
            }
            Err(err) => tracing::error!("Cannot serialize config section {name}: {err}"),
        }
        self
    }

    /// Deep merges `other` into this config.
    ///
    /// Objects are merged key by key, arrays are appended and every other
    /// value is replaced.
    pub fn merge_from(&mut self, other: Self) -> Result<(), StdError> {
        for (key, value) in other.configs {
            let entry = self.configs.entry(key);
            merge_json_from(entry.or_insert(serde_json::Value::Null), value)?;
        }
        Ok(())
    }

    pub fn parse<T>(text: T) -> Result<Self, StdError>
    where
        T: AsRef<str>,
    {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub async fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(text)?;
        tracing::debug!(path = %path.display(), sections = config.len(), "Config loaded");
        Ok(config)
    }

    /// Check if the config is empty
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Get the number of config sections
    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

/// Binds configuration into a container builder.
///
/// # Examples
///
/// ```rust
/// use keystone::{ContainerBuilder, TypeRegistry};
/// use keystone_base::{BindConfigExt, Config, config_section};
/// use serde::Deserialize;
/// use std::sync::Arc;
///
/// #[config_section("database")]
/// #[derive(Deserialize)]
/// struct DatabaseConfig {
///     host: String,
/// }
///
/// let config = Config::parse(r#"{"database": {"host": "localhost"}}"#)?;
/// let mut builder = ContainerBuilder::new(Arc::new(TypeRegistry::new()));
/// builder.bind_section::<DatabaseConfig>(&config)?;
/// builder.bind_config(config)?;
/// let container = builder.build()?;
///
/// assert_eq!(container.resolve::<DatabaseConfig>()?.host, "localhost");
/// assert_eq!(container.resolve::<Config>()?.len(), 1);
/// # Ok::<(), keystone::StdError>(())
/// ```
pub trait BindConfigExt {
    /// Binds the whole config as a value.
    fn bind_config(&mut self, config: Config) -> Result<&mut Self, StdError>;

    /// Deserializes the section of `T` and binds it as a value.
    fn bind_section<T>(&mut self, config: &Config) -> Result<&mut Self, StdError>
    where
        T: ConfigSection + Any + Send + Sync;
}

impl BindConfigExt for ContainerBuilder {
    fn bind_config(&mut self, config: Config) -> Result<&mut Self, StdError> {
        self.bind(Key::of::<Config>())?.to_value(config)?;
        Ok(self)
    }

    fn bind_section<T>(&mut self, config: &Config) -> Result<&mut Self, StdError>
    where
        T: ConfigSection + Any + Send + Sync,
    {
        let section = config
            .section::<T>()
            .map_err(|err| format!("Cannot read config section {}: {err}", T::key()))?;
        self.bind(Key::of::<T>())?.to_value(section)?;
        Ok(self)
    }
}

fn merge_json_from(lhs: &mut serde_json::Value, rhs: serde_json::Value) -> Result<(), StdError> {
    match lhs {
        serde_json::Value::Object(l) => match rhs {
            serde_json::Value::Object(r) => {
                for (key, value) in r {
                    let entry = l.entry(key);
                    merge_json_from(entry.or_insert(serde_json::Value::Null), value)?;
                }
            }
            _ => *lhs = rhs,
        },
        serde_json::Value::Array(l) => match rhs {
            serde_json::Value::Array(r) => {
                l.extend(r);
            }
            _ => *lhs = rhs,
        },
        _ => *lhs = rhs,
    }
    Ok(())
}
