//! Server configuration read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use courier_core::retry::RetryPolicy;
use courier_dispatch::application::dispatcher::{DispatchConfig, UnknownKindPolicy};

use crate::error::AppError;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,
    /// Dispatch loop tunables.
    pub dispatch: DispatchConfig,
    /// Retry, backoff and lease policy for the ledger.
    pub retry: RetryPolicy,
    /// Period of the built-in trigger; `None` leaves triggering to callers
    /// of the dispatch endpoint.
    pub dispatch_interval: Option<Duration>,
    /// Root of the working blob area.
    pub blob_working_root: PathBuf,
    /// Root of the retention blob area.
    pub blob_archive_root: PathBuf,
    /// OTLP collector endpoint; tracing stays local when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which returns the raw value of
    /// a variable if set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any value
    /// fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let env = Env { lookup };

        let database_url = env
            .raw("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;

        let defaults = DispatchConfig::default();
        let handler_timeout_secs: u64 = env.parse_or(
            "HANDLER_TIMEOUT_SECS",
            defaults.handler_timeout.map_or(0, |t| t.as_secs()),
        )?;
        let dispatch = DispatchConfig {
            default_batch_size: env.parse_or("DISPATCH_BATCH_SIZE", defaults.default_batch_size)?,
            max_batch_size: env.parse_or("DISPATCH_MAX_BATCH_SIZE", defaults.max_batch_size)?,
            handler_timeout: (handler_timeout_secs > 0)
                .then(|| Duration::from_secs(handler_timeout_secs)),
            unknown_kind_policy: env
                .raw("UNKNOWN_KIND_POLICY")
                .map(|raw| raw.parse::<UnknownKindPolicy>())
                .transpose()
                .map_err(|e| AppError::Config(e.to_string()))?
                .unwrap_or_default(),
        };
        if dispatch.default_batch_size == 0 || dispatch.max_batch_size == 0 {
            return Err(AppError::Config("batch sizes must be at least 1".into()));
        }

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: env.parse_or("OUTBOX_MAX_ATTEMPTS", retry_defaults.max_attempts)?,
            base_delay: env.seconds_or("RETRY_BASE_DELAY_SECS", retry_defaults.base_delay)?,
            max_delay: env.seconds_or("RETRY_MAX_DELAY_SECS", retry_defaults.max_delay)?,
            jitter_ratio: retry_defaults.jitter_ratio,
            lease_timeout: env.seconds_or("LEASE_TIMEOUT_SECS", retry_defaults.lease_timeout)?,
        };
        retry
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let interval_secs: u64 = env.parse_or("DISPATCH_INTERVAL_SECS", 0)?;

        Ok(Self {
            database_url,
            host: env.raw("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env.parse_or("PORT", 3000)?,
            db_max_connections: env.parse_or("DB_MAX_CONNECTIONS", 10)?,
            dispatch,
            retry,
            dispatch_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            blob_working_root: env
                .raw("BLOB_WORKING_ROOT")
                .map_or_else(|| PathBuf::from("./data/working"), PathBuf::from),
            blob_archive_root: env
                .raw("BLOB_ARCHIVE_ROOT")
                .map_or_else(|| PathBuf::from("./data/archive"), PathBuf::from),
            otlp_endpoint: env.raw("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Returns the address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }

    /// Describes the misconfiguration when the largest batch an invocation may
    /// request can outlive its lease, letting another invocation reclaim
    /// events still in flight.
    #[must_use]
    pub fn lease_warning(&self) -> Option<String> {
        let timeout = self.dispatch.handler_timeout?;
        let worst_case = timeout.checked_mul(self.dispatch.max_batch_size)?;
        let lease = self.retry.lease_timeout.to_std().ok()?;
        (lease < worst_case).then(|| {
            format!(
                "lease timeout {}s is shorter than a maximum batch ({} events x {}s handler timeout)",
                lease.as_secs(),
                self.dispatch.max_batch_size,
                timeout.as_secs()
            )
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn parse_or<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.raw(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{name} is invalid ({raw:?}): {e}"))),
            None => Ok(default),
        }
    }

    fn seconds_or(&self, name: &str, default: TimeDelta) -> Result<TimeDelta, AppError> {
        let secs: i64 = self.parse_or(name, default.num_seconds())?;
        TimeDelta::try_seconds(secs)
            .ok_or_else(|| AppError::Config(format!("{name} is out of range: {secs}")))
    }
}
