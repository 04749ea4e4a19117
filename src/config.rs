//! Runtime configuration: TOML file first, environment variables as
//! fallback/override for any field the file leaves unset, then hardcoded
//! defaults. Deserializes into an all-optional raw shape first so partial
//! files don't fail validation for fields they never mention.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::session::SessionConfig;

const DEFAULT_CONFIG_PATH: &str = "tarpon.toml";

#[derive(Debug, Clone)]
pub struct TarponConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub metrics_enabled: bool,
    pub session: SessionConfig,
}

impl Default for TarponConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 5000,
            log_level: "info".to_owned(),
            metrics_enabled: true,
            session: SessionConfig::default(),
        }
    }
}

impl TarponConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    server: Option<RawServer>,
    logging: Option<RawLogging>,
    metrics: Option<RawMetrics>,
    session: Option<RawSession>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetrics {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSession {
    write_wait_secs: Option<u64>,
    pong_wait_secs: Option<u64>,
    max_message_size: Option<usize>,
    queue_capacity: Option<usize>,
}

/// Loads config from `tarpon.toml` in the working directory if present,
/// else from environment variables alone; either way, any field left
/// unset by the file is still filled from its `TARPON_*` environment
/// variable before the documented default applies.
pub fn load() -> Result<TarponConfig, ConfigError> {
    load_from_path(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_from_path(path: &Path) -> Result<TarponConfig, ConfigError> {
    let raw = if path.exists() {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("reading config file '{}': {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
    } else {
        RawConfig::default()
    };
    finish(raw)
}

fn finish(raw: RawConfig) -> Result<TarponConfig, ConfigError> {
    let defaults = TarponConfig::default();

    let host = raw
        .server.as_ref().and_then(|s| s.host.clone())
        .or_else(|| env::var("TARPON_HOST").ok())
        .unwrap_or(defaults.host);

    let port = match raw.server.as_ref().and_then(|s| s.port) {
        Some(p) => p,
        None => match env::var("TARPON_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("TARPON_PORT is not a valid port: {v}")))?,
            Err(_) => defaults.port,
        },
    };

    let log_level = raw
        .logging.as_ref().and_then(|l| l.level.clone())
        .or_else(|| env::var("TARPON_LOGGING_LEVEL").ok())
        .unwrap_or(defaults.log_level);

    let metrics_enabled = match raw.metrics.as_ref().and_then(|m| m.enabled) {
        Some(v) => v,
        None => match env::var("TARPON_METRICS_ENABLED") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("TARPON_METRICS_ENABLED is not a bool: {v}")))?,
            Err(_) => defaults.metrics_enabled,
        },
    };

    let session = resolve_session(raw.session, defaults.session)?;

    Ok(TarponConfig { host, port, log_level, metrics_enabled, session })
}

fn resolve_session(raw: Option<RawSession>, defaults: SessionConfig) -> Result<SessionConfig, ConfigError> {
    let raw = raw.unwrap_or_default();

    let write_wait_secs = env_override("TARPON_SESSION_WRITE_WAIT_SECS", raw.write_wait_secs, defaults.write_wait.as_secs())?;
    let pong_wait_secs = env_override("TARPON_SESSION_PONG_WAIT_SECS", raw.pong_wait_secs, defaults.pong_wait.as_secs())?;
    let max_message_size = env_override("TARPON_SESSION_MAX_MESSAGE_SIZE", raw.max_message_size, defaults.max_message_size)?;
    let queue_capacity = env_override("TARPON_SESSION_QUEUE_CAPACITY", raw.queue_capacity, defaults.queue_capacity)?;

    if queue_capacity == 0 {
        return Err(ConfigError::InvalidValue("session.queue_capacity must be greater than zero".to_owned()));
    }
    if pong_wait_secs == 0 {
        return Err(ConfigError::InvalidValue("session.pong_wait_secs must be greater than zero".to_owned()));
    }

    let pong_wait = Duration::from_secs(pong_wait_secs);
    Ok(SessionConfig {
        write_wait: Duration::from_secs(write_wait_secs),
        pong_wait,
        ping_period: pong_wait.mul_f64(0.9),
        max_message_size,
        queue_capacity,
    })
}

fn env_override<T>(var: &str, file_value: Option<T>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    if let Some(v) = file_value {
        return Ok(v);
    }
    match env::var(var) {
        Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue(format!("{var} has an invalid value: {v}"))),
        Err(_) => Ok(default),
    }
}
