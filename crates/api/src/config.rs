//! Runtime configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use warden_infra::CacheConfig;
use warden_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CACHE_CAPACITY: usize = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub cache: CacheConfig,
    /// Register the default catalog and system roles on startup.
    pub seed_defaults: bool,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            cache: CacheConfig::default(),
            seed_defaults: true,
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    /// Read `WARDEN_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_var(&lookup, "WARDEN_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;

        // 0 disables the TTL; entries then live until invalidated or evicted.
        let ttl_secs: u64 = parse_var(&lookup, "WARDEN_CACHE_TTL_SECS", Some(0))?;
        let capacity: usize = parse_var(&lookup, "WARDEN_CACHE_CAPACITY", Some(DEFAULT_CACHE_CAPACITY))?;
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "WARDEN_CACHE_CAPACITY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let seed_defaults = parse_var(&lookup, "WARDEN_SEED_DEFAULTS", Some(true))?;
        let log_format = parse_var(&lookup, "WARDEN_LOG_FORMAT", Some(LogFormat::Json))?;

        Ok(Self {
            bind_addr,
            cache: CacheConfig {
                ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
                capacity,
            },
            seed_defaults,
            log_format,
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            })
        }
        _ => default.ok_or_else(|| ConfigError::Invalid {
            var,
            value: String::new(),
            reason: "required".to_string(),
        }),
    }
}
