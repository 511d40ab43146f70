use thiserror::Error;

use crate::utils::env::{get_list, get_parsed, get_string};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub mongo: MongoConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub workers: usize,
    // Timeouts in seconds
    pub write_timeout_seconds: u64,
    pub read_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub port: u16,
    pub ssl_mode: String,
    pub timezone: String,
    pub max_connections: usize,
}

/// Document store connection
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub url: String,
    pub db_name: String,
    /// Bounds server selection and connecting, in seconds.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            env: get_string("ENV", "development"),
            server: ServerConfig {
                address: get_string("HOST_ADDRESS", "127.0.0.1"),
                port: get_parsed("HOST_PORT", 8080)?,
                workers: get_parsed("WORKERS", 4)?,
                write_timeout_seconds: get_parsed("HOST_WRITE_TIMEOUT", 15)?,
                read_timeout_seconds: get_parsed("HOST_READ_TIMEOUT", 15)?,
                idle_timeout_seconds: get_parsed("HOST_IDLE_TIMEOUT", 60)?,
            },
            postgres: PostgresConfig {
                host: get_string("POSTGRES_DB_HOST", "127.0.0.1"),
                user: get_string("POSTGRES_DB_USER", "postgres"),
                password: get_string("POSTGRES_DB_PASSWORD", ""),
                name: get_string("POSTGRES_DB_NAME", "postgres"),
                port: get_parsed("POSTGRES_DB_PORT", 5432)?,
                ssl_mode: get_string("POSTGRES_SSL_MODE", "disable"),
                timezone: get_string("POSTGRES_TZ", "Asia/Jakarta"),
                max_connections: get_parsed("DB_MAX_CONNECTIONS", 10)?,
            },
            mongo: MongoConfig {
                url: get_string("MONGODB_URL", "mongodb://127.0.0.1:27017"),
                db_name: get_string("MONGODB_DB_NAME", "example"),
                timeout_seconds: get_parsed("MONGODB_TIMEOUT", 5)?,
            },
            cors: CorsConfig {
                allowed_origins: get_list("CORS_ALLOWED_ORIGINS", "*"),
            },
            logging: LoggingConfig {
                level: get_string("LOG_LEVEL", "info"),
            },
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.address.clone(), self.server.port)
    }
}
