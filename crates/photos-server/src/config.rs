use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use photos_api::Settings;
use photos_db::PoolConfig;
use thiserror::Error;
use tracing::Level;

/// One year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub salt: String,
    pub log_level: Level,
    pub pretty_logs: bool,
    pub db_path: PathBuf,
    pub pool: PoolConfig,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let salt = get("SALT")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SALT"))?;

        let log_level = match get("LOG_LEVEL") {
            None => Level::INFO,
            Some(v) => parse_level(&v).ok_or_else(|| ConfigError::Invalid {
                key: "LOG_LEVEL",
                value: v,
                reason: "expected one of Debug, Info, Warn, Error".into(),
            })?,
        };

        let pool_size: usize = parse(&get, "PHOTOS_DB_POOL_SIZE", 10)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "PHOTOS_DB_POOL_SIZE",
                value: "0".into(),
                reason: "pool needs at least one connection".into(),
            });
        }
        let acquire_secs: u64 = parse(&get, "PHOTOS_DB_ACQUIRE_TIMEOUT_SECS", 30)?;
        let ttl_hours: i64 = parse(&get, "PHOTOS_SESSION_TTL_HOURS", 24)?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl_hours) {
            return Err(ConfigError::Invalid {
                key: "PHOTOS_SESSION_TTL_HOURS",
                value: ttl_hours.to_string(),
                reason: format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "localhost".into()),
            port: parse(&get, "PORT", 8080)?,
            salt,
            log_level,
            pretty_logs: get("PRETTY_LOGGER").is_some_and(|v| v == "true"),
            db_path: get("PHOTOS_DB_PATH")
                .unwrap_or_else(|| "photos.db".into())
                .into(),
            pool: PoolConfig {
                size: pool_size,
                acquire_timeout: Duration::from_secs(acquire_secs),
            },
            settings: Settings {
                upload_dir: get("PHOTOS_UPLOAD_DIR")
                    .unwrap_or_else(|| "uploads".into())
                    .into(),
                session_ttl: chrono::Duration::hours(ttl_hours),
                max_upload_bytes: parse(&get, "PHOTOS_MAX_UPLOAD_BYTES", 100 * 1024 * 1024)?,
            },
        })
    }
}

fn parse_level(value: &str) -> Option<Level> {
    match value.to_ascii_lowercase().as_str() {
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_salt_is_fatal() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("SALT"))));
        assert!(matches!(config(&[("SALT", "")]), Err(ConfigError::Missing("SALT"))));
    }

    #[test]
    fn defaults() {
        let c = config(&[("SALT", "s3cret")]).unwrap();
        assert_eq!(c.host, "localhost");
        assert_eq!(c.port, 8080);
        assert_eq!(c.log_level, Level::INFO);
        assert!(!c.pretty_logs);
        assert_eq!(c.pool.size, 10);
        assert_eq!(c.settings.session_ttl, chrono::Duration::hours(24));
        assert_eq!(c.settings.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn overrides() {
        let c = config(&[
            ("SALT", "s3cret"),
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("LOG_LEVEL", "Debug"),
            ("PRETTY_LOGGER", "true"),
            ("PHOTOS_DB_POOL_SIZE", "3"),
        ])
        .unwrap();
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 9000);
        assert_eq!(c.log_level, Level::DEBUG);
        assert!(c.pretty_logs);
        assert_eq!(c.pool.size, 3);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config(&[("SALT", "s"), ("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config(&[("SALT", "s"), ("LOG_LEVEL", "Chatty")]),
            Err(ConfigError::Invalid { key: "LOG_LEVEL", .. })
        ));
        assert!(matches!(
            config(&[("SALT", "s"), ("LOG_LEVEL", "Trace")]),
            Err(ConfigError::Invalid { key: "LOG_LEVEL", .. })
        ));
        for ttl in ["0", "-5", "9223372036854775807"] {
            assert!(matches!(
                config(&[("SALT", "s"), ("PHOTOS_SESSION_TTL_HOURS", ttl)]),
                Err(ConfigError::Invalid { key: "PHOTOS_SESSION_TTL_HOURS", .. })
            ));
        }
        assert!(matches!(
            config(&[("SALT", "s"), ("PHOTOS_DB_POOL_SIZE", "0")]),
            Err(ConfigError::Invalid { key: "PHOTOS_DB_POOL_SIZE", .. })
        ));
    }
}
