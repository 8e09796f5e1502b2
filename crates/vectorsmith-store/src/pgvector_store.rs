//! PostgreSQL + pgvector adapter
//!
//! Tables are created as `(id BIGSERIAL, embedding vector(n), metadata JSONB)`.
//! Table names are quoted identifiers; vectors travel as `[v1,v2,...]` text
//! cast to `::vector`.
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use vectorsmith_core::events::default_sink;
use vectorsmith_core::vector::{
    ensure_dimension, ensure_finite, parse_vector_literal, quote_identifier, vector_literal,
};
use vectorsmith_core::{
    AdapterEvent, BackendKind, DistanceMetric, EventSink, Metadata, PgVectorConfig, Result,
    SearchOptions, SearchResult, VectorId, VectorRecord, VectorSmithError,
};

use crate::{require_handle, BackendAdapter};

/// pgvector operator for a metric
///
/// `<#>` yields the negative inner product so that ascending order ranks the
/// closest records first for every metric.
pub fn distance_operator(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "<=>",
        DistanceMetric::L2 => "<->",
        DistanceMetric::InnerProduct => "<#>",
    }
}

/// PostgreSQL + pgvector adapter
pub struct PgVectorAdapter {
    config: PgVectorConfig,
    pool: Option<PgPool>,
    /// Declared `vector(n)` dimension per table
    dimensions: RwLock<HashMap<String, usize>>,
    events: Arc<dyn EventSink>,
}

/// Stored row
#[derive(Debug, FromRow)]
struct VectorRow {
    id: i64,
    embedding: String,
    metadata: Option<serde_json::Value>,
}

/// Search hit row
#[derive(Debug, FromRow)]
struct ScoredRow {
    id: i64,
    embedding: String,
    metadata: Option<serde_json::Value>,
    score: f64,
}

fn into_metadata(value: Option<serde_json::Value>) -> Option<Metadata> {
    match value {
        Some(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

impl TryFrom<VectorRow> for VectorRecord {
    type Error = VectorSmithError;

    fn try_from(row: VectorRow) -> Result<Self> {
        Ok(VectorRecord {
            id: VectorId::Int(row.id),
            embedding: parse_vector_literal(&row.embedding)?,
            metadata: into_metadata(row.metadata),
        })
    }
}

impl TryFrom<ScoredRow> for SearchResult {
    type Error = VectorSmithError;

    fn try_from(row: ScoredRow) -> Result<Self> {
        Ok(SearchResult {
            id: VectorId::Int(row.id),
            embedding: Some(parse_vector_literal(&row.embedding)?),
            metadata: into_metadata(row.metadata),
            score: row.score as f32,
        })
    }
}

impl PgVectorAdapter {
    pub fn new(config: PgVectorConfig) -> Self {
        Self {
            config,
            pool: None,
            dimensions: RwLock::new(HashMap::new()),
            events: default_sink(),
        }
    }

    /// Route lifecycle events to a custom sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &PgVectorConfig {
        &self.config
    }

    /// Get the connection pool
    pub fn pool(&self) -> Result<&PgPool> {
        require_handle(self.pool.as_ref(), BackendKind::PgVector)
    }

    fn fail(&self, err: sqlx::Error) -> VectorSmithError {
        self.events
            .on_event(&AdapterEvent::error(BackendKind::PgVector, err.to_string()));
        VectorSmithError::driver(BackendKind::PgVector, err)
    }

    fn cached_dimension(&self, table: &str) -> Option<usize> {
        self.dimensions
            .read()
            .ok()
            .and_then(|dims| dims.get(table).copied())
    }

    fn remember_dimension(&self, table: &str, dimension: Option<usize>) {
        if let Ok(mut dims) = self.dimensions.write() {
            match dimension {
                Some(d) => {
                    dims.insert(table.to_string(), d);
                }
                None => {
                    dims.remove(table);
                }
            }
        }
    }

    /// Declared dimension of a table's `embedding` column
    ///
    /// Served from the local cache when the table was created through this
    /// adapter, otherwise read from `pg_attribute`.
    pub async fn table_dimension(&self, table: &str) -> Result<Option<usize>> {
        if let Some(dimension) = self.cached_dimension(table) {
            return Ok(Some(dimension));
        }

        let pool = self.pool()?;
        let typmod: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT a.atttypmod
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            WHERE c.relname = $1
              AND pg_table_is_visible(c.oid)
              AND a.attname = 'embedding'
              AND NOT a.attisdropped
            "#,
        )
        .bind(table)
        .fetch_optional(pool)
        .await
        .map_err(|e| self.fail(e))?;

        let dimension = typmod.filter(|t| *t > 0).map(|t| t as usize);
        if dimension.is_some() {
            self.remember_dimension(table, dimension);
        }
        Ok(dimension)
    }

    async fn check_vector(&self, table: &str, vector: &[f32]) -> Result<()> {
        ensure_finite(vector)?;
        if let Some(expected) = self.table_dimension(table).await? {
            ensure_dimension(expected, vector)?;
        }
        Ok(())
    }

    /// Create a vector table if it does not exist
    pub async fn create_table(&self, table: &str, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(VectorSmithError::InvalidInput(
                "Table dimension must be positive".to_string(),
            ));
        }
        let pool = self.pool()?;

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, embedding vector({}) NOT NULL, metadata JSONB)",
            quote_identifier(table),
            dimension
        );
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        tracing::debug!(table, dimension, "pgvector table ready");
        self.remember_dimension(table, Some(dimension));
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let pool = self.pool()?;
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        self.remember_dimension(table, None);
        Ok(())
    }

    /// Insert one vector, returning the generated id
    pub async fn insert(
        &self,
        table: &str,
        embedding: &[f32],
        metadata: Option<&Metadata>,
    ) -> Result<i64> {
        let pool = self.pool()?;
        self.check_vector(table, embedding).await?;

        let sql = format!(
            "INSERT INTO {} (embedding, metadata) VALUES ($1::vector, $2) RETURNING id",
            quote_identifier(table)
        );
        sqlx::query_scalar(&sql)
            .bind(vector_literal(embedding))
            .bind(metadata.map(|m| serde_json::Value::Object(m.clone())))
            .fetch_one(pool)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Insert several vectors in one transaction
    ///
    /// Every vector is validated before the transaction starts.
    pub async fn insert_many(
        &self,
        table: &str,
        records: &[(Vec<f32>, Option<Metadata>)],
    ) -> Result<Vec<i64>> {
        let pool = self.pool()?;
        for (embedding, _) in records {
            self.check_vector(table, embedding).await?;
        }

        let sql = format!(
            "INSERT INTO {} (embedding, metadata) VALUES ($1::vector, $2) RETURNING id",
            quote_identifier(table)
        );

        let mut tx = pool.begin().await.map_err(|e| self.fail(e))?;
        let mut ids = Vec::with_capacity(records.len());
        for (embedding, metadata) in records {
            let id: i64 = sqlx::query_scalar(&sql)
                .bind(vector_literal(embedding))
                .bind(metadata.clone().map(serde_json::Value::Object))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| self.fail(e))?;
            ids.push(id);
        }
        tx.commit().await.map_err(|e| self.fail(e))?;

        Ok(ids)
    }

    pub async fn get(&self, table: &str, id: i64) -> Result<Option<VectorRecord>> {
        let pool = self.pool()?;
        let sql = format!(
            "SELECT id, embedding::text AS embedding, metadata FROM {} WHERE id = $1",
            quote_identifier(table)
        );

        let row: Option<VectorRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| self.fail(e))?;

        row.map(VectorRecord::try_from).transpose()
    }

    /// Nearest neighbours of `query`, closest first
    ///
    /// `score` is the raw pgvector distance for the chosen metric.
    pub async fn search(
        &self,
        table: &str,
        query: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let pool = self.pool()?;
        self.check_vector(table, query).await?;

        let operator = distance_operator(options.metric);
        let sql = format!(
            r#"
            SELECT id, embedding::text AS embedding, metadata,
                   (embedding {op} $1::vector)::float8 AS score
            FROM {table}
            ORDER BY embedding {op} $1::vector
            LIMIT $2
            "#,
            op = operator,
            table = quote_identifier(table)
        );

        let rows: Vec<ScoredRow> = sqlx::query_as(&sql)
            .bind(vector_literal(query))
            .bind(options.limit as i64)
            .fetch_all(pool)
            .await
            .map_err(|e| self.fail(e))?;

        tracing::debug!(table, results = rows.len(), metric = %options.metric, "pgvector search");
        rows.into_iter().map(SearchResult::try_from).collect()
    }

    /// Delete by id, returning whether a row was removed
    pub async fn delete(&self, table: &str, id: i64) -> Result<bool> {
        let pool = self.pool()?;
        let sql = format!("DELETE FROM {} WHERE id = $1", quote_identifier(table));
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let pool = self.pool()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        sqlx::query_scalar(&sql)
            .fetch_one(pool)
            .await
            .map_err(|e| self.fail(e))
    }

    async fn ensure_extension(&self, pool: &PgPool) -> Result<()> {
        let installed: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(pool)
                .await
                .map_err(|e| self.fail(e))?;

        if installed.is_none() {
            tracing::info!("Installing pgvector extension");
            sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
                .execute(pool)
                .await
                .map_err(|e| self.fail(e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for PgVectorAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::PgVector
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .connect(&self.config.connection_url())
            .await
            .map_err(|e| self.fail(e))?;

        if let Err(e) = self.ensure_extension(&pool).await {
            pool.close().await;
            return Err(e);
        }

        self.pool = Some(pool);
        self.events
            .on_event(&AdapterEvent::connected(BackendKind::PgVector));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            self.events
                .on_event(&AdapterEvent::disconnected(BackendKind::PgVector));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }
}
