//! Store configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Parse an optional environment value, falling back to `default` when the
/// variable is unset or blank.
pub fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}

fn positive(var: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// PostgreSQL connection string; `None` selects the in-memory stores.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Bound on every individual store call.
    pub store_timeout: Duration,
    pub status_cas_attempts: u32,
    /// Extra attempts for a failed inventory delta after the first.
    pub compensation_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            store_timeout: Duration::from_millis(5_000),
            status_cas_attempts: 3,
            compensation_retries: 1,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let max_connections = positive(
            "DATABASE_MAX_CONNECTIONS",
            parse_var(&lookup, "DATABASE_MAX_CONNECTIONS", u64::from(defaults.max_connections))?,
        )?;
        let timeout_ms = positive(
            "STORE_TIMEOUT_MS",
            parse_var(&lookup, "STORE_TIMEOUT_MS", 5_000u64)?,
        )?;
        let cas_attempts = positive(
            "STATUS_CAS_ATTEMPTS",
            parse_var(&lookup, "STATUS_CAS_ATTEMPTS", u64::from(defaults.status_cas_attempts))?,
        )?;
        let compensation_retries =
            parse_var(&lookup, "COMPENSATION_RETRIES", defaults.compensation_retries)?;

        Ok(Self {
            database_url,
            max_connections: narrow("DATABASE_MAX_CONNECTIONS", max_connections)?,
            store_timeout: Duration::from_millis(timeout_ms),
            status_cas_attempts: narrow("STATUS_CAS_ATTEMPTS", cas_attempts)?,
            compensation_retries,
        })
    }
}

fn narrow(var: &'static str, value: u64) -> Result<u32, ConfigError> {
    u32::try_from(value).map_err(|e| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
