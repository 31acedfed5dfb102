//! Clinic Configuration Management
//!
//! Handles configuration from environment variables and TOML files with
//! sensible defaults for development. Loaded once at startup; immutable
//! afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest token lifetime accepted at startup (ten years)
pub const MAX_JWT_EXPIRATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token signing
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|message| ConfigError::ParseError { path, message })
    }

    fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Check the invariants every token path relies on
    ///
    /// A missing signing secret is fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        let lifetime = self.auth.jwt_expiration_secs;
        if lifetime == 0 || lifetime > MAX_JWT_EXPIRATION_SECS {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRATION_SECS".to_string(),
                value: lifetime.to_string(),
            });
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            self.server.port = parse_env("API_PORT", port)?;
        }

        // CORS origins from environment variable (comma-separated)
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = split_origins(&origins);
        }
        for key in ["LOCAL_ALLOWED_ORIGIN", "REMOTE_ALLOWED_ORIGIN"] {
            if let Ok(origin) = std::env::var(key) {
                let origin = origin.trim();
                if !origin.is_empty() && !self.server.cors_origins.iter().any(|o| o == origin) {
                    self.server.cors_origins.push(origin.to_string());
                }
            }
        }

        // PostgreSQL
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = Some(url);
            }
        }
        if let Ok(max) = std::env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("DATABASE_MAX_CONNECTIONS", max)?;
        }

        // Token signing
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(secs) = std::env::var("JWT_EXPIRATION_SECS") {
            self.auth.jwt_expiration_secs = parse_env("JWT_EXPIRATION_SECS", secs)?;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn split_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![],
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; the in-memory store is used when unset
    pub url: Option<String>,

    /// PostgreSQL connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

/// Token signing configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for HS256 token signing
    pub jwt_secret: String,

    /// Token lifetime in seconds
    pub jwt_expiration_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expiration_secs: 86_400, // 24 hours
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert_eq!(config.auth.jwt_expiration_secs, 86_400);
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "JWT_SECRET"
        ));

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "   ".to_string();
        assert!(config.validate().is_err());

        config.auth.jwt_secret = "clinic-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_expiration_is_rejected() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "clinic-secret".to_string();
        config.auth.jwt_expiration_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_excessive_expiration_is_rejected() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "clinic-secret".to_string();

        config.auth.jwt_expiration_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "JWT_EXPIRATION_SECS"
        ));

        config.auth.jwt_expiration_secs = MAX_JWT_EXPIRATION_SECS + 1;
        assert!(config.validate().is_err());

        config.auth.jwt_expiration_secs = MAX_JWT_EXPIRATION_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_config() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9090
            cors_origins = ["http://localhost:5173"]

            [auth]
            jwt_secret = "from-file"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.jwt_expiration_secs, 86_400);
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins("http://a.test, ,http://b.test "),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let auth = AuthConfig {
            jwt_secret: "super-secret-value".to_string(),
            jwt_expiration_secs: 60,
        };
        assert!(!format!("{auth:?}").contains("super-secret-value"));
    }

    #[test]
    fn test_from_missing_file() {
        let result = AppConfig::from_file("/nonexistent/clinic.toml");
        assert!(matches!(result, Err(ConfigError::FileReadError { .. })));
    }
}
