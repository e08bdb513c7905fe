//! Process configuration, read once at startup.

use std::net::SocketAddr;
use std::time::Duration;

use kitroom_infra::config::{ConfigError, StoreConfig, parse_var};
use kitroom_observability::LogFormat;

/// Secret used when `JWT_SECRET` is unset. Only fit for local runs.
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// `true` when `jwt_secret` fell back to [`DEV_JWT_SECRET`].
    pub jwt_secret_defaulted: bool,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub store: StoreConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = parse_var(&lookup, "KITROOM_BIND", SocketAddr::from(([0, 0, 0, 0], 8080)))?;
        let request_timeout_ms = parse_var(&lookup, "REQUEST_TIMEOUT_MS", 15_000u64)?;
        let log_format = parse_var(&lookup, "LOG_FORMAT", LogFormat::Json)?;

        let secret = lookup("JWT_SECRET").filter(|s| !s.trim().is_empty());
        let jwt_secret_defaulted = secret.is_none();

        Ok(Self {
            bind,
            jwt_secret: secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            jwt_secret_defaulted,
            request_timeout: Duration::from_millis(request_timeout_ms),
            log_format,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }

    /// In-memory stores, fixed secret, short timeouts. Used by tests.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: jwt_secret.to_string(),
            jwt_secret_defaulted: false,
            request_timeout: Duration::from_secs(5),
            log_format: LogFormat::Pretty,
            store: StoreConfig::default(),
        }
    }
}
