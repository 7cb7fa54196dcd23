use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::types::{priv_level, ApiVersion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub tenancy: TenancyConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Upper bound on ancestor/descendant walks. Deeper trees are treated as corrupt.
    pub max_tree_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_version: ApiVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub admin_priv_level: i32,
    pub hidden_value: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_MAX_TREE_DEPTH") {
            self.tenancy.max_tree_depth = v.parse().unwrap_or(self.tenancy.max_tree_depth);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_VERSION") {
            self.api.default_version = v.parse().unwrap_or(self.api.default_version);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ADMIN_PRIV_LEVEL") {
            self.security.admin_priv_level = v.parse().unwrap_or(self.security.admin_priv_level);
        }
        if let Ok(v) = env::var("SECURITY_HIDDEN_VALUE") {
            self.security.hidden_value = v;
        }

        self
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self.environment {
            Environment::Development => "debug",
            Environment::Staging | Environment::Production => "info",
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig { max_tree_depth: 64 },
            api: ApiConfig {
                default_version: ApiVersion::new(4, 0),
            },
            security: SecurityConfig {
                admin_priv_level: priv_level::ADMIN,
                hidden_value: "********".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            tenancy: TenancyConfig { max_tree_depth: 64 },
            api: ApiConfig {
                default_version: ApiVersion::new(4, 0),
            },
            security: SecurityConfig {
                admin_priv_level: priv_level::ADMIN,
                hidden_value: "********".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            tenancy: TenancyConfig { max_tree_depth: 32 },
            api: ApiConfig {
                default_version: ApiVersion::new(4, 0),
            },
            security: SecurityConfig {
                admin_priv_level: priv_level::ADMIN,
                hidden_value: "********".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.tenancy.max_tree_depth, 64);
        assert!(config.database.enable_query_logging);
        assert_eq!(config.default_log_filter(), "debug");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.database.enable_query_logging);
        assert_eq!(config.security.admin_priv_level, priv_level::ADMIN);
        assert_eq!(config.api.default_version, ApiVersion::new(4, 0));
        assert_eq!(config.default_log_filter(), "info");
    }
}
