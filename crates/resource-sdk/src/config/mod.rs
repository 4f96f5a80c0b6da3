//! Process-level runtime settings.
//!
//! Resource configuration arrives on stdin as the request's `source`; this
//! module only covers how the process itself behaves, which the orchestrator
//! controls through environment variables on the resource container.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Variable naming the `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "RESOURCE_LOG_FILTER";
/// Variable naming the log output format.
pub const LOG_FORMAT_ENV: &str = "RESOURCE_LOG_FORMAT";

const DEFAULT_LOG_FILTER: &str = "info";

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Errors raised while reading runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The log format variable held an unknown value.
    #[error("invalid {variable} value '{value}': expected compact or json")]
    InvalidLogFormat {
        /// Variable that was read.
        variable: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Runtime settings for one resource process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    log_filter: String,
    log_format: LogFormat,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: LogFormat::default(),
        }
    }
}

impl RuntimeConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLogFormat`] for an unknown log format.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value. Unset and blank variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLogFormat`] for an unknown log format.
    ///
    /// # Example
    ///
    /// ```
    /// use resource_sdk::config::{LogFormat, RuntimeConfig};
    ///
    /// let config = RuntimeConfig::from_lookup(|name| {
    ///     (name == "RESOURCE_LOG_FORMAT").then(|| "json".to_owned())
    /// })
    /// .expect("valid settings");
    /// assert_eq!(config.log_format(), LogFormat::Json);
    /// assert_eq!(config.log_filter(), "info");
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let log_filter = read(LOG_FILTER_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());
        let log_format = read(LOG_FORMAT_ENV)
            .map_or_else(|| Ok(LogFormat::default()), |value| parse_format(&value))?;
        Ok(Self {
            log_filter,
            log_format,
        })
    }

    /// Returns the `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

fn parse_format(value: &str) -> Result<LogFormat, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidLogFormat {
            variable: LOG_FORMAT_ENV,
            value: value.to_owned(),
        })
}
