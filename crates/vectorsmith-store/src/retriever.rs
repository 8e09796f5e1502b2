//! Retrievers
//!
//! Each retriever borrows one adapter and turns a typed query into a single
//! adapter call. Results are returned exactly as the adapter produces them.

use async_trait::async_trait;
use qdrant_client::qdrant::Filter;
use vectorsmith_core::{DistanceMetric, Result, SearchOptions, SearchResult};

use crate::{PgVectorAdapter, QdrantAdapter, QdrantSearchOptions, RedisAdapter, SqliteAdapter};

/// A typed query delegated to one backend
#[async_trait]
pub trait Retriever: Send + Sync {
    type Query: Send + Sync;
    type Output: Send;

    async fn retrieve(&self, query: &Self::Query) -> Result<Self::Output>;
}

// ============================================================================
// Queries
// ============================================================================

/// Key lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisQuery {
    pub key: String,
}

impl RedisQuery {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Nearest-neighbour query against a pgvector table
#[derive(Debug, Clone, PartialEq)]
pub struct PgVectorQuery {
    pub table: String,
    pub embedding: Vec<f32>,
    pub limit: usize,
    pub metric: DistanceMetric,
}

impl PgVectorQuery {
    pub fn new(table: impl Into<String>, embedding: Vec<f32>) -> Self {
        let defaults = SearchOptions::default();
        Self {
            table: table.into(),
            embedding,
            limit: defaults.limit,
            metric: defaults.metric,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Nearest-neighbour query against a sqlite vec0 table
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteQuery {
    pub table: String,
    pub embedding: Vec<f32>,
    pub limit: usize,
    /// Must match the metric the table was created with
    pub metric: DistanceMetric,
}

impl SqliteQuery {
    pub fn new(table: impl Into<String>, embedding: Vec<f32>) -> Self {
        let defaults = SearchOptions::default();
        Self {
            table: table.into(),
            embedding,
            limit: defaults.limit,
            metric: defaults.metric,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Similarity query against a Qdrant collection
#[derive(Debug, Clone)]
pub struct QdrantQuery {
    pub collection: String,
    pub vector: Vec<f32>,
    pub limit: usize,
    pub filter: Option<Filter>,
    pub score_threshold: Option<f32>,
    pub with_payload: bool,
}

impl QdrantQuery {
    pub fn new(collection: impl Into<String>, vector: Vec<f32>) -> Self {
        let defaults = QdrantSearchOptions::default();
        Self {
            collection: collection.into(),
            vector,
            limit: defaults.limit,
            filter: None,
            score_threshold: None,
            with_payload: defaults.with_payload,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_payload(mut self, with_payload: bool) -> Self {
        self.with_payload = with_payload;
        self
    }
}

// ============================================================================
// Retrievers
// ============================================================================

pub struct RedisRetriever<'a> {
    adapter: &'a RedisAdapter,
}

impl<'a> RedisRetriever<'a> {
    pub fn new(adapter: &'a RedisAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Retriever for RedisRetriever<'_> {
    type Query = RedisQuery;
    type Output = Option<String>;

    async fn retrieve(&self, query: &RedisQuery) -> Result<Option<String>> {
        self.adapter.get(&query.key).await
    }
}

pub struct PgVectorRetriever<'a> {
    adapter: &'a PgVectorAdapter,
}

impl<'a> PgVectorRetriever<'a> {
    pub fn new(adapter: &'a PgVectorAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Retriever for PgVectorRetriever<'_> {
    type Query = PgVectorQuery;
    type Output = Vec<SearchResult>;

    async fn retrieve(&self, query: &PgVectorQuery) -> Result<Vec<SearchResult>> {
        let options = SearchOptions::default()
            .with_limit(query.limit)
            .with_metric(query.metric);
        self.adapter
            .search(&query.table, &query.embedding, options)
            .await
    }
}

pub struct QdrantRetriever<'a> {
    adapter: &'a QdrantAdapter,
}

impl<'a> QdrantRetriever<'a> {
    pub fn new(adapter: &'a QdrantAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Retriever for QdrantRetriever<'_> {
    type Query = QdrantQuery;
    type Output = Vec<SearchResult>;

    async fn retrieve(&self, query: &QdrantQuery) -> Result<Vec<SearchResult>> {
        let options = QdrantSearchOptions {
            limit: query.limit,
            filter: query.filter.clone(),
            score_threshold: query.score_threshold,
            with_payload: query.with_payload,
        };
        self.adapter
            .search(&query.collection, &query.vector, options)
            .await
    }
}

pub struct SqliteRetriever<'a> {
    adapter: &'a SqliteAdapter,
}

impl<'a> SqliteRetriever<'a> {
    pub fn new(adapter: &'a SqliteAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl Retriever for SqliteRetriever<'_> {
    type Query = SqliteQuery;
    type Output = Vec<SearchResult>;

    async fn retrieve(&self, query: &SqliteQuery) -> Result<Vec<SearchResult>> {
        let options = SearchOptions::default()
            .with_limit(query.limit)
            .with_metric(query.metric);
        self.adapter
            .search(&query.table, &query.embedding, options)
            .await
    }
}
