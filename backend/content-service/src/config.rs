/// Configuration management for Content Service
///
/// This module handles loading configuration from environment variables
/// (optionally seeded from a `.env` file by the binary).
use crate::moderation::ModerationPolicy;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Cache (Redis) configuration
    pub cache: CacheConfig,
    /// Moderation bus and review policy
    pub moderation: ModerationConfig,
    /// Content operation settings
    pub service: ServiceConfig,
    /// Startup connection retry
    pub bootstrap: BootstrapConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
}

/// Cache (Redis) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL
    pub url: String,
    /// Record time-to-live
    pub ttl_secs: u64,
}

/// Moderation configuration
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Redis URL of the moderation bus
    pub bus_url: String,
    /// Kinds that go through review
    pub policy: ModerationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Deadline for every content operation
    pub operation_timeout_ms: u64,
}

impl ServiceConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Connection attempts per dependency
    pub connect_attempts: u32,
    /// Fixed delay between attempts
    pub connect_backoff_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());
        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string());

        let policy = match lookup("MODERATION_REVIEW_KINDS") {
            Some(list) => ModerationPolicy::parse(&list)
                .map_err(|e| format!("Failed to parse MODERATION_REVIEW_KINDS='{}': {}", list, e))?,
            None => ModerationPolicy::default(),
        };

        let config = Config {
            app: AppConfig {
                env: app_env,
                host: lookup("CONTENT_SERVICE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or_default(&lookup, "CONTENT_SERVICE_PORT", 8081)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL")
                    .unwrap_or_else(|| "postgresql://localhost/dark_fantasy".to_string()),
                max_connections: parse_or_default(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            cache: CacheConfig {
                url: redis_url.clone(),
                ttl_secs: parse_or_default(
                    &lookup,
                    "CACHE_TTL_SECS",
                    crate::cache::DEFAULT_TTL_SECS,
                )?,
            },
            moderation: ModerationConfig {
                bus_url: lookup("MODERATION_BUS_URL").unwrap_or(redis_url),
                policy,
            },
            service: ServiceConfig {
                operation_timeout_ms: parse_or_default(
                    &lookup,
                    "CONTENT_OPERATION_TIMEOUT_MS",
                    crate::services::DEFAULT_OPERATION_TIMEOUT.as_millis() as u64,
                )?,
            },
            bootstrap: BootstrapConfig {
                connect_attempts: parse_or_default(&lookup, "BOOTSTRAP_CONNECT_ATTEMPTS", 3)?,
                connect_backoff_secs: parse_or_default(
                    &lookup,
                    "BOOTSTRAP_CONNECT_BACKOFF_SECS",
                    5,
                )?,
            },
        };

        if config.service.operation_timeout_ms == 0 {
            return Err("CONTENT_OPERATION_TIMEOUT_MS must be greater than zero".to_string());
        }
        if config.bootstrap.connect_attempts == 0 {
            return Err("BOOTSTRAP_CONNECT_ATTEMPTS must be at least 1".to_string());
        }

        Ok(config)
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}
