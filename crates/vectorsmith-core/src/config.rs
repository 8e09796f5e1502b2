//! VectorSmith Configuration Management
//!
//! Per-backend connection settings, embedding provider settings, and logging
//! options. A backend section that is absent means that backend's adapter is
//! never constructed.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{DistanceMetric, EmbeddingProviderKind};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VectorSmithConfig {
    /// Storage backends
    pub adapters: AdapterConfig,

    /// Embedding providers
    pub embedding: EmbeddingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl VectorSmithConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }
}

/// Sparse set of backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdapterConfig {
    pub redis: Option<RedisConfig>,
    pub pgvector: Option<PgVectorConfig>,
    pub qdrant: Option<QdrantConfig>,
    pub sqlite: Option<SqliteConfig>,
}

impl AdapterConfig {
    /// True when no backend section is present
    pub fn is_empty(&self) -> bool {
        self.redis.is_none()
            && self.pgvector.is_none()
            && self.qdrant.is_none()
            && self.sqlite.is_none()
    }
}

/// Redis connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Full connection URL; takes precedence over the discrete fields
    pub url: Option<String>,

    pub host: String,

    pub port: u16,

    pub password: Option<String>,

    /// Logical database index
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            password: None,
            db: 0,
        }
    }
}

impl RedisConfig {
    /// Resolve the connection URL
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

/// PostgreSQL + pgvector connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PgVectorConfig {
    /// Full connection string; takes precedence over the discrete fields
    pub connection_string: Option<String>,

    pub host: String,

    pub port: u16,

    pub user: String,

    pub password: Option<String>,

    pub database: String,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for PgVectorConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            database: "postgres".to_string(),
            max_connections: 5,
        }
    }
}

impl PgVectorConfig {
    /// Resolve the connection URL
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.connection_string {
            return url.clone();
        }

        match &self.password {
            Some(password) => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, password, self.host, self.port, self.database
            ),
            None => format!(
                "postgres://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
        }
    }
}

/// Qdrant connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    /// Qdrant gRPC URL
    pub url: String,

    pub api_key: Option<String>,

    /// Client request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

/// SQLite + sqlite-vec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`
    pub path: String,

    /// Name or path of the native vector extension to load
    pub extension_path: String,

    /// Pool size (forced to 1 for in-memory databases)
    pub max_connections: u32,

    /// Table created on connect when present
    pub default_table: Option<SqliteTableConfig>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            extension_path: "vec0".to_string(),
            max_connections: 4,
            default_table: None,
        }
    }
}

impl SqliteConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

/// Declaration of a sqlite vector table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteTableConfig {
    pub name: String,

    pub dimension: usize,

    #[serde(default)]
    pub metric: DistanceMetric,
}

/// Embedding provider registry configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub jina: Option<EmbeddingProviderConfig>,

    pub openai: Option<EmbeddingProviderConfig>,

    /// Provider used when a caller does not name one
    pub default_provider: Option<EmbeddingProviderKind>,
}

/// Settings for one embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    pub api_key: String,

    pub model: String,

    #[serde(default)]
    pub options: EmbeddingOptions,
}

impl EmbeddingProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            options: EmbeddingOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EmbeddingOptions) -> Self {
        self.options = options;
        self
    }
}

/// Request options shared by embedding providers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOptions {
    /// Overrides the provider's default API base URL
    pub base_url: Option<String>,

    /// Per-request deadline in milliseconds
    pub timeout_ms: u64,

    /// When set, every returned vector must have exactly this length
    pub expected_dimensions: Option<usize>,
}

impl Default for EmbeddingOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
            expected_dimensions: None,
        }
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

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VectorSmithConfig::default();
        assert!(config.adapters.is_empty());
        assert!(config.embedding.jina.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_redis_url() {
        let config = RedisConfig::default();
        assert_eq!(config.connection_url(), "redis://localhost:6379/0");

        let config = RedisConfig {
            password: Some("secret".to_string()),
            db: 2,
            ..Default::default()
        };
        assert_eq!(config.connection_url(), "redis://:secret@localhost:6379/2");

        let config = RedisConfig {
            url: Some("redis://cache:6380".to_string()),
            ..Default::default()
        };
        assert_eq!(config.connection_url(), "redis://cache:6380");
    }

    #[test]
    fn test_pgvector_url() {
        let config = PgVectorConfig {
            password: Some("pw".to_string()),
            database: "vectors".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.connection_url(),
            "postgres://postgres:pw@localhost:5432/vectors"
        );
    }

    #[test]
    fn test_parse_toml() {
        let config = VectorSmithConfig::from_toml_str(
            r#"
            [adapters.qdrant]
            url = "http://qdrant:6334"

            [adapters.sqlite]
            path = "vectors.db"

            [adapters.sqlite.default_table]
            name = "docs"
            dimension = 3
            metric = "l2"

            [embedding]
            default_provider = "openai"

            [embedding.openai]
            api_key = "sk-test"
            model = "text-embedding-3-small"
            options = { timeout_ms = 500, expected_dimensions = 1536 }
            "#,
        )
        .unwrap();

        assert!(config.adapters.redis.is_none());
        assert!(config.adapters.pgvector.is_none());
        assert_eq!(config.adapters.qdrant.unwrap().url, "http://qdrant:6334");

        let sqlite = config.adapters.sqlite.unwrap();
        assert_eq!(sqlite.extension_path, "vec0");
        let table = sqlite.default_table.unwrap();
        assert_eq!(table.dimension, 3);
        assert_eq!(table.metric, DistanceMetric::L2);

        assert_eq!(
            config.embedding.default_provider,
            Some(EmbeddingProviderKind::OpenAI)
        );
        let openai = config.embedding.openai.unwrap();
        assert_eq!(openai.options.timeout_ms, 500);
        assert_eq!(openai.options.expected_dimensions, Some(1536));
        assert!(openai.options.base_url.is_none());
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = VectorSmithConfig::from_toml_str("adapters = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = VectorSmithConfig::from_file("/nonexistent/vectorsmith.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileReadError { .. }));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(
            "Jina".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::Jina
        );
        assert!("cohere".parse::<EmbeddingProviderKind>().is_err());
    }
}
