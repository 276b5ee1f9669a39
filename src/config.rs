//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// How long to wait for a pooled connection
    pub database_acquire_timeout: Duration,

    /// Idle connections are closed after this long
    pub database_idle_timeout: Duration,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Lifetime of a login session
    pub session_ttl_hours: i64,

    /// GPS positions older than this are no longer shown on a route
    pub gps_stale_after: chrono::Duration,

    /// Interval of the ordens de serviço expiry sweep
    pub ordens_sweep_interval: Duration,

    /// Interval of the expired session cleanup
    pub session_cleanup_interval: Duration,

    /// Observations older than this many hours are pruned
    pub observation_retention_hours: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 20)?;
        let database_acquire_timeout =
            Duration::from_secs(parse_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 2)?);
        let database_idle_timeout =
            Duration::from_secs(parse_or("DATABASE_IDLE_TIMEOUT_SECS", 30)?);

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_or("PORT", 3000)?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let session_ttl_hours: i64 = parse_or("SESSION_TTL_HOURS", 24)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::InvalidValue("SESSION_TTL_HOURS"));
        }

        let gps_stale_after = gps_stale_window(parse_or("GPS_STALE_AFTER_SECS", 300)?)?;
        let ordens_sweep_interval =
            Duration::from_secs(parse_or("ORDENS_SWEEP_INTERVAL_SECS", 60)?);
        let session_cleanup_interval =
            Duration::from_secs(parse_or("SESSION_CLEANUP_INTERVAL_SECS", 3600)?);
        if ordens_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue("ORDENS_SWEEP_INTERVAL_SECS"));
        }
        if session_cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidValue("SESSION_CLEANUP_INTERVAL_SECS"));
        }

        let observation_retention_hours: i64 = parse_or("OBSERVATION_RETENTION_HOURS", 24)?;

        Ok(Self {
            database_url,
            database_max_connections,
            database_acquire_timeout,
            database_idle_timeout,
            host,
            port,
            environment,
            session_ttl_hours,
            gps_stale_after,
            ordens_sweep_interval,
            session_cleanup_interval,
            observation_retention_hours,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Longest accepted GPS freshness window, one day
const MAX_GPS_STALE_SECS: i64 = 86_400;

/// Validate the GPS freshness window, in seconds
fn gps_stale_window(secs: i64) -> Result<chrono::Duration, ConfigError> {
    if !(1..=MAX_GPS_STALE_SECS).contains(&secs) {
        return Err(ConfigError::InvalidValue("GPS_STALE_AFTER_SECS"));
    }
    Ok(chrono::Duration::seconds(secs))
}

/// Read an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_unset() {
        let value: u32 = parse_or("GUARDA_FREIOS_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        env::set_var("GUARDA_FREIOS_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16, _> = parse_or("GUARDA_FREIOS_TEST_BAD_PORT", 3000);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("GUARDA_FREIOS_TEST_BAD_PORT"))
        ));
    }

    #[test]
    fn test_gps_stale_window_bounds() {
        assert_eq!(gps_stale_window(300).unwrap(), chrono::Duration::minutes(5));
        assert_eq!(gps_stale_window(86_400).unwrap(), chrono::Duration::days(1));

        for secs in [0, -1, 86_401, i64::MAX] {
            assert!(matches!(
                gps_stale_window(secs),
                Err(ConfigError::InvalidValue("GPS_STALE_AFTER_SECS"))
            ));
        }
    }
}
