//! Server configuration loaded from environment variables.
//!
//! Every value has a default, so an empty environment starts an in-memory
//! server on `0.0.0.0:8080`.

use seat_inventory_runtime::EngineConfig;
use std::time::Duration;

/// Complete server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Storage settings
    pub database: DatabaseConfig,
    /// Hold, broadcast and rollback tuning
    pub engine: EngineConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (`HOST`)
    pub host: String,
    /// Port to bind to (`PORT`)
    pub port: u16,
    /// Time background tasks get to stop after the listener closes (`SHUTDOWN_TIMEOUT`, seconds)
    pub shutdown_timeout: Duration,
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `PostgreSQL` URL (`DATABASE_URL`). `None` selects in-memory storage.
    pub url: Option<String>,
    /// Pool size (`DATABASE_MAX_CONNECTIONS`)
    pub max_connections: u32,
    /// Pool acquire timeout (`DATABASE_CONNECT_TIMEOUT`, seconds)
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|value| value.trim().parse::<u64>().ok());

        Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("PORT")
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(8080),
                shutdown_timeout: Duration::from_secs(parsed("SHUTDOWN_TIMEOUT").unwrap_or(10)),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS")
                    .and_then(|value| u32::try_from(value).ok())
                    .filter(|value| *value > 0)
                    .unwrap_or(10),
                connect_timeout: Duration::from_secs(
                    parsed("DATABASE_CONNECT_TIMEOUT").unwrap_or(5),
                ),
            },
            engine: EngineConfig::from_lookup(&lookup),
        }
    }

    /// Address to bind the HTTP listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
