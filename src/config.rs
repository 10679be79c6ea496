/// Configuration management for the clinic records service
use crate::error::{ClinicError, ClinicResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued identity tokens
    pub token_ttl_seconds: i64,
    /// Clock skew tolerated when checking expiry
    pub token_leeway_seconds: u64,
}

/// Defaults and bounds for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_count: u32,
    pub max_count: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_count: 20,
            max_count: 100,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ClinicResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CLINIC_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CLINIC_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| ClinicError::Validation("Invalid port number".to_string()))?;
        let version = env::var("CLINIC_VERSION")
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("CLINIC_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("CLINIC_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("clinic.sqlite"));
        let max_connections = env::var("CLINIC_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("CLINIC_JWT_SECRET")
            .map_err(|_| ClinicError::Validation("JWT secret required".to_string()))?;
        let token_ttl_seconds = env::var("CLINIC_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let token_leeway_seconds = env::var("CLINIC_TOKEN_LEEWAY_SECONDS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60);

        let pagination_defaults = PaginationConfig::default();
        let default_count = env::var("CLINIC_PAGE_DEFAULT_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(pagination_defaults.default_count);
        let max_count = env::var("CLINIC_PAGE_MAX_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(pagination_defaults.max_count);

        let log_level = env::var("CLINIC_LOG_LEVEL")
            .unwrap_or_else(|_| "clinic_records=debug,tower_http=debug".to_string());
        let log_format = match env::var("CLINIC_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let metrics_enabled = env::var("CLINIC_METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                max_connections,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_seconds,
                token_leeway_seconds,
            },
            pagination: PaginationConfig {
                default_count,
                max_count,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
            metrics: MetricsConfig {
                enabled: metrics_enabled,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ClinicResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ClinicError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(ClinicError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.token_ttl_seconds <= 0 {
            return Err(ClinicError::Validation(
                "Token TTL must be positive".to_string(),
            ));
        }

        let pagination = &self.pagination;
        if pagination.default_count == 0 || pagination.max_count == 0 {
            return Err(ClinicError::Validation(
                "Page sizes must be positive".to_string(),
            ));
        }
        if pagination.default_count > pagination.max_count {
            return Err(ClinicError::Validation(format!(
                "Default page size {} exceeds max page size {}",
                pagination.default_count, pagination.max_count
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 8080,
            version: "test".to_string(),
        },
        storage: StorageConfig {
            data_directory: PathBuf::from("./data"),
            database: PathBuf::from(":memory:"),
            max_connections: 1,
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-characters".to_string(),
            token_ttl_seconds: 3600,
            token_leeway_seconds: 0,
        },
        pagination: PaginationConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Text,
        },
        metrics: MetricsConfig { enabled: true },
    }
}
