//! VectorSmith Core - Shared types, errors, and configuration
//!
//! This crate defines the abstractions shared by every VectorSmith crate:
//! - Common error type and result alias
//! - Vector records, search results, and distance metrics
//! - Backend and embedding provider identifiers
//! - Configuration management
//! - Lifecycle event sink and tracing setup
//! - SQL and vector encoding helpers
//!
//! Author: hephaex@gmail.com

pub mod config;
pub mod events;
pub mod telemetry;
pub mod vector;

pub use config::{
    AdapterConfig, ConfigError, EmbeddingConfig, EmbeddingOptions, EmbeddingProviderConfig,
    LoggingConfig, PgVectorConfig, QdrantConfig, RedisConfig, SqliteConfig, SqliteTableConfig,
    VectorSmithConfig,
};
pub use events::{AdapterEvent, AdapterEventKind, EventSink, TracingEventSink};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error type for VectorSmith operations
#[derive(Error, Debug)]
pub enum VectorSmithError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("{0} adapter is not connected")]
    NotConnected(BackendKind),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),

    #[error("Upstream HTTP error {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{backend} driver error: {source}")]
    Driver {
        backend: BackendKind,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VectorSmithError {
    /// Wrap a vendor driver error, keeping it as the error source
    pub fn driver(
        backend: BackendKind,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Driver {
            backend,
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VectorSmithError>;

// ============================================================================
// Identifiers
// ============================================================================

/// The fixed set of supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Redis,
    PgVector,
    Qdrant,
    Sqlite,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Redis => "redis",
            Self::PgVector => "pgvector",
            Self::Qdrant => "qdrant",
            Self::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported embedding API providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Jina,
    OpenAI,
}

impl EmbeddingProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jina => "jina",
            Self::OpenAI => "openai",
        }
    }
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jina" => Ok(Self::Jina),
            "openai" => Ok(Self::OpenAI),
            _ => Err(ConfigError::InvalidValue {
                key: "embedding.default_provider".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Vector Models
// ============================================================================

/// Distance function used to rank records against a query vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    #[serde(alias = "euclidean")]
    L2,
    #[serde(alias = "dot", alias = "ip")]
    InnerProduct,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::InnerProduct => "inner_product",
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = VectorSmithError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            "inner_product" | "ip" | "dot" => Ok(Self::InnerProduct),
            other => Err(VectorSmithError::UnsupportedMetric(other.to_string())),
        }
    }
}

/// Record identifier: integer for auto-increment backends, string for UUIDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VectorId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for VectorId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for VectorId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// Untyped key-value metadata attached to a record
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored vector with its identity and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: VectorId,
    pub embedding: Vec<f32>,
    pub metadata: Option<Metadata>,
}

/// A single similarity search hit
///
/// `score` is reported exactly as the backend computes it. pgvector and
/// sqlite return a distance (lower is closer); Qdrant returns a similarity
/// score (higher is closer for cosine and dot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: VectorId,

    /// Present only when the backend returns stored vectors
    pub embedding: Option<Vec<f32>>,

    pub metadata: Option<Metadata>,

    pub score: f32,
}

/// Options shared by relational similarity searches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,

    /// Distance metric to rank by
    pub metric: DistanceMetric,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            metric: DistanceMetric::Cosine,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
