//! Application configuration management
//!
//! Loads and validates configuration from environment variables at startup.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_PATH, DEFAULT_HOST, DEFAULT_MAX_CHECKS,
    DEFAULT_PORT,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub judge: JudgeConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Security configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// HS256 signing key for admin session tokens
    pub secret_key: String,
    /// Argon2 hash of the administrator password
    pub admin_password_hash: String,
}

/// Judging configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Worker pool size; also the number of sandbox slots
    pub max_checks: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            security: SecurityConfig::from_env()?,
            judge: JudgeConfig::from_env()?,
        })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
            ),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_DATABASE_MAX_CONNECTIONS.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()))?,
        })
    }
}

impl SecurityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret_key: env::var("SECRET_KEY")
                .map_err(|_| ConfigError::Missing("SECRET_KEY".to_string()))?,
            admin_password_hash: env::var("ADMIN_PASSWORD")
                .map_err(|_| ConfigError::Missing("ADMIN_PASSWORD".to_string()))?,
        })
    }
}

impl JudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_checks: usize = env::var("MAX_CHECKS")
            .unwrap_or_else(|_| DEFAULT_MAX_CHECKS.to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("MAX_CHECKS".to_string()))?;

        if max_checks == 0 {
            return Err(ConfigError::InvalidValue("MAX_CHECKS".to_string()));
        }

        Ok(Self { max_checks })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let server = ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        };
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 5000);
    }
}
