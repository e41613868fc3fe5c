//! Engine configuration.
//!
//! Values are layered: built-in defaults, then an optional config file (any
//! format the [`config`] crate recognises from the extension), then
//! `FEED_SESSION_*` environment variables, e.g. `FEED_SESSION_PAGE_SIZE=10`.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Tunables shared by all three components.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Items per store query.
    pub page_size: usize,
    /// Minimum gap between scroll-triggered exposure passes.
    pub exposure_debounce_ms: u64,
    /// How long a surface may take to report "prepared".
    pub prepare_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            exposure_debounce_ms: 50,
            prepare_timeout_ms: 15_000,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `path` if given and present, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix("FEED_SESSION").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Message("page_size must be at least 1".into()));
        }
        if self.prepare_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "prepare_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn exposure_debounce(&self) -> Duration {
        Duration::from_millis(self.exposure_debounce_ms)
    }

    pub fn prepare_timeout(&self) -> Duration {
        Duration::from_millis(self.prepare_timeout_ms)
    }
}
