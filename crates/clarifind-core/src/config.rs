//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional config file, then
//! `CLARIFIND_*` environment variables (e.g. `CLARIFIND_FRESH_WINDOW_HOURS=48`).

use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::upload::{DEFAULT_ACCEPTED_MIME_TYPES, DEFAULT_MAX_UPLOAD_BYTES};

/// Storage key the web client used for the results collection.
pub const DEFAULT_STORAGE_KEY: &str = "clarifind_lab_results";

pub const DEFAULT_FRESH_WINDOW_HOURS: i64 = 24;

/// Upper bound for `fresh_window_hours` (ten years).
pub const MAX_FRESH_WINDOW_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Key the serialized results collection is stored under
    pub storage_key: String,
    pub max_upload_bytes: u64,
    pub accepted_mime_types: Vec<String>,
    /// How long a pending upload counts as "fresh"
    pub fresh_window_hours: i64,
    /// Dashboard polling interval for host UIs
    pub refresh_interval_secs: u64,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_mime_types: DEFAULT_ACCEPTED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fresh_window_hours: DEFAULT_FRESH_WINDOW_HOURS,
            refresh_interval_secs: 30,
            log_filter: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("CLARIFIND")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("accepted_mime_types")
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the store cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_FRESH_WINDOW_HOURS).contains(&self.fresh_window_hours) {
            return Err(ConfigError::Message(format!(
                "fresh_window_hours must be between 1 and {}, got {}",
                MAX_FRESH_WINDOW_HOURS, self.fresh_window_hours
            )));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::Message("storage_key must not be empty".into()));
        }
        Ok(())
    }

    /// The fresh window, clamped to the accepted range.
    pub fn fresh_window(&self) -> chrono::Duration {
        let hours = self.fresh_window_hours.clamp(0, MAX_FRESH_WINDOW_HOURS);
        chrono::Duration::try_hours(hours)
            .unwrap_or_else(|| chrono::Duration::hours(DEFAULT_FRESH_WINDOW_HOURS))
    }
}
