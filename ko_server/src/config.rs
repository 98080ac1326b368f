//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use knockout::db::{DatabaseConfig, DatabaseConfigError};
use std::net::SocketAddr;
use std::str::FromStr;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Entity store the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub storage: StorageBackend,
    /// Database configuration (used by the PostgreSQL backend)
    pub database: DatabaseConfig,
    /// Prometheus listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Fixed seed for the bracket draw
    pub draw_seed: Option<u64>,
}

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an invalid value
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(vars: F, overrides: Overrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_var(&vars, "SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let storage = if overrides.memory {
            StorageBackend::Memory
        } else {
            parse_var(&vars, "STORAGE_BACKEND")?.unwrap_or(StorageBackend::Postgres)
        };

        let database_url = overrides
            .database_url
            .or_else(|| vars("DATABASE_URL"))
            .unwrap_or_else(|| DatabaseConfig::development().database_url);
        let database = DatabaseConfig::from_env_with_url(database_url)?;

        Ok(ServerConfig {
            bind,
            storage,
            database,
            metrics_bind: parse_var(&vars, "METRICS_BIND")?,
            draw_seed: parse_var(&vars, "DRAW_SEED")?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage == StorageBackend::Postgres {
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if self.database.min_connections > self.database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        self.database.max_connections
                    ),
                });
            }
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid database configuration: {0}")]
    Database(#[from] DatabaseConfigError),
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse an optional variable; a set but unparsable value is an error
fn parse_var<F, T>(vars: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match vars(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("Cannot parse '{value}'"),
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_vars(vars(&[]), Overrides::default()).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert!(config.metrics_bind.is_none());
        assert!(config.draw_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_variables_are_read() {
        let config = ServerConfig::from_vars(
            vars(&[
                ("SERVER_BIND", "0.0.0.0:9000"),
                ("STORAGE_BACKEND", "Memory"),
                ("METRICS_BIND", "0.0.0.0:9090"),
                ("DRAW_SEED", "42"),
                ("DATABASE_URL", "postgres://bracket@db/knockout"),
            ]),
            Overrides::default(),
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.metrics_bind.unwrap().port(), 9090);
        assert_eq!(config.draw_seed, Some(42));
        assert_eq!(config.database.database_url, "postgres://bracket@db/knockout");
    }

    #[test]
    fn test_overrides_win() {
        let config = ServerConfig::from_vars(
            vars(&[("SERVER_BIND", "0.0.0.0:9000"), ("STORAGE_BACKEND", "postgres")]),
            Overrides {
                bind: Some("127.0.0.1:7000".parse().unwrap()),
                database_url: Some("postgres://override/db".to_string()),
                memory: true,
            },
        )
        .unwrap();

        assert_eq!(config.bind.port(), 7000);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.database.database_url, "postgres://override/db");
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = ServerConfig::from_vars(vars(&[("DRAW_SEED", "abc")]), Overrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DRAW_SEED"));

        let err = ServerConfig::from_vars(
            vars(&[("STORAGE_BACKEND", "redis")]),
            Overrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND"));
    }

    #[test]
    fn test_validation_metrics_bind_collision() {
        let mut config = ServerConfig::from_vars(vars(&[]), Overrides::default()).unwrap();
        config.metrics_bind = Some(config.bind);

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validation_pool_sizes() {
        let mut config = ServerConfig::from_vars(vars(&[]), Overrides::default()).unwrap();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(config.validate().is_err());

        // Pool sizes do not matter without PostgreSQL
        config.storage = StorageBackend::Memory;
        assert!(config.validate().is_ok());
    }
}
