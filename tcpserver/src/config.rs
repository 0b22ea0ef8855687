//! Server environment configuration.
//!
//! Loads settings from a `.env` file when one is present, then from system
//! environment variables, falling back to defaults.

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

/// TCP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen host address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Manager endpoint host
    pub manager_host: String,
    /// Manager endpoint port
    pub manager_port: u16,
    /// Redis host for the counter store
    pub redis_host: String,
    /// Redis port for the counter store
    pub redis_port: u16,
    /// Client slot capacity of the multiplexer
    pub max_clients: usize,
    /// Readiness-wait timeout; idle timeouts trigger a checkpoint
    pub sync_interval_ms: u16,
}

impl ServerConfig {
    /// Loads the configuration.
    ///
    /// Load order:
    /// 1. `.env` in the parent, current or grandparent directory
    /// 2. system environment variables
    /// 3. defaults
    pub fn from_env() -> Result<Self> {
        Self::load_env_file();

        let config = Self {
            host: env_or("tcp_host", "0.0.0.0"),
            port: env_parse("tcp_port", 8081),
            manager_host: env_or("manager_host", "127.0.0.1"),
            manager_port: env_parse("manager_port", 8082),
            redis_host: env_or("redis_host", "127.0.0.1"),
            redis_port: env_parse("redis_port", 6379),
            max_clients: env_parse("max_clients", 32),
            sync_interval_ms: env_parse("sync_interval_ms", 3000),
        };

        info!("server configuration loaded: {:?}", config);
        Ok(config)
    }

    /// The TCP listen address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The manager handshake address.
    pub fn manager_address(&self) -> String {
        format!("{}:{}", self.manager_host, self.manager_port)
    }

    /// The redis connection URL for the counter store.
    pub fn redis_address(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }

    fn load_env_file() {
        let env_paths = ["../.env", ".env", "../../.env"];

        let mut loaded = false;
        for path in env_paths {
            if Path::new(path).exists() && dotenv::from_filename(path).is_ok() {
                info!(".env loaded from {}", path);
                loaded = true;
                break;
            }
        }

        if !loaded {
            warn!("no .env file found, using system environment and defaults");
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Validates a loaded configuration.
pub fn validate_config(config: &ServerConfig) -> Result<()> {
    if config.port == 0 {
        anyhow::bail!("invalid TCP port: {}", config.port);
    }
    if config.manager_port == 0 {
        anyhow::bail!("invalid manager port: {}", config.manager_port);
    }
    if config.redis_port == 0 {
        anyhow::bail!("invalid redis port: {}", config.redis_port);
    }
    if config.host.is_empty() {
        anyhow::bail!("TCP host address is empty");
    }
    if config.manager_host.is_empty() {
        anyhow::bail!("manager host address is empty");
    }
    if config.redis_host.is_empty() {
        anyhow::bail!("redis host address is empty");
    }
    if config.max_clients == 0 {
        anyhow::bail!("client capacity must be at least 1");
    }
    if config.sync_interval_ms == 0 {
        anyhow::bail!("sync interval must be at least 1ms");
    }
    Ok(())
}
