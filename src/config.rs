use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "HealthPass";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BATCH_SIZE: usize = 500;
const DEFAULT_CONFLICT_RETRIES: u32 = 3;
const DEFAULT_NOTIFY_QUEUE: usize = 1024;

/// Log filter used when neither `HEALTHPASS_LOG` nor `RUST_LOG` is set.
pub fn default_log_filter() -> &'static str {
    "info,healthpass=debug,healthpass_lib=debug,tower_http=info"
}

/// Data directory: `<platform data dir>/HealthPass`, falling back to the
/// working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn default_database_path() -> PathBuf {
    app_data_dir().join("appointments.db")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Internal error detail is only returned to clients outside production.
    pub fn exposes_internal_errors(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite(PathBuf),
    Memory,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Runtime configuration, read from `HEALTHPASS_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub store: StoreKind,
    pub notify_webhook_url: Option<String>,
    pub notify_queue_capacity: usize,
    pub max_batch_size: usize,
    pub conflict_retries: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            environment: Environment::Development,
            store: StoreKind::Memory,
            notify_webhook_url: None,
            notify_queue_capacity: DEFAULT_NOTIFY_QUEUE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("HEALTHPASS_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| invalid("HEALTHPASS_BIND_ADDR", &bind_raw, e.to_string()))?;

        let environment = match get("HEALTHPASS_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(invalid(
                    "HEALTHPASS_ENV",
                    other,
                    "expected development or production",
                ))
            }
        };

        let store = match get("HEALTHPASS_STORE").as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite(
                get("HEALTHPASS_DATABASE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_database_path),
            ),
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(invalid("HEALTHPASS_STORE", other, "expected sqlite or memory"))
            }
        };

        let max_batch_size = parse_number(&get, "HEALTHPASS_MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE)?;
        if max_batch_size == 0 {
            return Err(invalid("HEALTHPASS_MAX_BATCH_SIZE", "0", "must be at least 1"));
        }

        Ok(Self {
            bind_addr,
            environment,
            store,
            notify_webhook_url: get("HEALTHPASS_NOTIFY_WEBHOOK_URL"),
            notify_queue_capacity: parse_number(
                &get,
                "HEALTHPASS_NOTIFY_QUEUE",
                DEFAULT_NOTIFY_QUEUE,
            )?
            .max(1),
            max_batch_size,
            conflict_retries: parse_number(
                &get,
                "HEALTHPASS_CONFLICT_RETRIES",
                DEFAULT_CONFLICT_RETRIES,
            )?,
        })
    }
}

fn parse_number<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, e.to_string())),
    }
}
