//! SQLite + sqlite-vec adapter
//!
//! The native `vec0` extension is loaded into every pooled connection. Each
//! table is a `vec0` virtual table holding little-endian `f32` blobs and a
//! JSON text metadata column; KNN search goes through the extension's
//! `MATCH ... AND k = ?` query. A table's metric is fixed at creation and a
//! search asking for a different one is rejected.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use vectorsmith_core::events::default_sink;
use vectorsmith_core::vector::{
    blob_to_vec, ensure_dimension, ensure_finite, quote_identifier, vec_to_blob,
};
use vectorsmith_core::{
    AdapterEvent, BackendKind, DistanceMetric, EventSink, Metadata, Result, SearchOptions,
    SearchResult, SqliteConfig, SqliteTableConfig, VectorId, VectorRecord, VectorSmithError,
};

use crate::{require_handle, BackendAdapter};

/// Declared shape of a vector table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub dimension: usize,
    pub metric: DistanceMetric,
}

/// vec0 `distance_metric` option value
fn vec0_metric(metric: DistanceMetric) -> Result<&'static str> {
    match metric {
        DistanceMetric::Cosine => Ok("cosine"),
        DistanceMetric::L2 => Ok("l2"),
        DistanceMetric::InnerProduct => Err(VectorSmithError::UnsupportedMetric(
            "sqlite-vec does not support inner_product".to_string(),
        )),
    }
}

/// Recover dimension and metric from a `CREATE VIRTUAL TABLE ... USING vec0(...)`
/// statement. vec0 defaults to L2 when no metric is declared.
pub fn parse_vec0_definition(sql: &str) -> Result<TableSpec> {
    // Only the column list counts; the table name may contain anything
    let lower = sql.to_lowercase();
    let columns = lower
        .rfind("using vec0(")
        .map(|pos| &lower[pos + "using vec0(".len()..])
        .ok_or_else(|| VectorSmithError::Configuration(format!("Not a vec0 table: {sql}")))?;

    let dimension = columns
        .split_once("float[")
        .and_then(|(_, rest)| rest.split_once(']'))
        .and_then(|(digits, _)| digits.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            VectorSmithError::Configuration(format!("No float[n] column in: {sql}"))
        })?;

    let metric = match columns.split_once("distance_metric") {
        Some((_, rest)) => {
            let value: String = rest
                .trim_start()
                .trim_start_matches('=')
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            match value.as_str() {
                "cosine" => DistanceMetric::Cosine,
                "l2" => DistanceMetric::L2,
                other => return Err(VectorSmithError::UnsupportedMetric(other.to_string())),
            }
        }
        None => DistanceMetric::L2,
    };

    Ok(TableSpec { dimension, metric })
}

/// A table answers only in the metric it was created with
fn ensure_metric(table: &str, spec: TableSpec, requested: DistanceMetric) -> Result<()> {
    if spec.metric != requested {
        return Err(VectorSmithError::UnsupportedMetric(format!(
            "table {table} was created with {}, search requested {}",
            spec.metric, requested
        )));
    }
    Ok(())
}

/// Stored row
#[derive(Debug, FromRow)]
struct VectorRow {
    id: i64,
    embedding: Vec<u8>,
    metadata: Option<String>,
}

/// KNN hit row
#[derive(Debug, FromRow)]
struct ScoredRow {
    id: i64,
    embedding: Vec<u8>,
    metadata: Option<String>,
    distance: f64,
}

fn parse_metadata(raw: Option<String>) -> Result<Option<Metadata>> {
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(VectorSmithError::from)
}

/// SQLite + sqlite-vec adapter
pub struct SqliteAdapter {
    config: SqliteConfig,
    pool: Option<SqlitePool>,
    tables: RwLock<HashMap<String, TableSpec>>,
    events: Arc<dyn EventSink>,
}

impl SqliteAdapter {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            pool: None,
            tables: RwLock::new(HashMap::new()),
            events: default_sink(),
        }
    }

    /// Route lifecycle events to a custom sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    pub fn pool(&self) -> Result<&SqlitePool> {
        require_handle(self.pool.as_ref(), BackendKind::Sqlite)
    }

    fn fail(&self, err: sqlx::Error) -> VectorSmithError {
        self.events
            .on_event(&AdapterEvent::error(BackendKind::Sqlite, err.to_string()));
        VectorSmithError::driver(BackendKind::Sqlite, err)
    }

    fn remember(&self, table: &str, spec: Option<TableSpec>) {
        if let Ok(mut tables) = self.tables.write() {
            match spec {
                Some(spec) => {
                    tables.insert(table.to_string(), spec);
                }
                None => {
                    tables.remove(table);
                }
            }
        }
    }

    /// Dimension and metric a table was created with
    pub async fn table_spec(&self, table: &str) -> Result<TableSpec> {
        if let Some(spec) = self
            .tables
            .read()
            .ok()
            .and_then(|tables| tables.get(table).copied())
        {
            return Ok(spec);
        }

        let pool = self.pool()?;
        let sql: Option<String> =
            sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(pool)
                .await
                .map_err(|e| self.fail(e))?;

        let sql = sql.ok_or_else(|| {
            VectorSmithError::Configuration(format!("sqlite table {table} does not exist"))
        })?;
        let spec = parse_vec0_definition(&sql)?;
        self.remember(table, Some(spec));
        Ok(spec)
    }

    async fn check(&self, table: &str, vector: &[f32]) -> Result<TableSpec> {
        ensure_finite(vector)?;
        let spec = self.table_spec(table).await?;
        ensure_dimension(spec.dimension, vector)?;
        Ok(spec)
    }

    /// Create a vec0 table if it does not exist
    pub async fn create_table(
        &self,
        table: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        let metric_name = vec0_metric(metric)?;
        if dimension == 0 {
            return Err(VectorSmithError::InvalidInput(
                "Table dimension must be positive".to_string(),
            ));
        }
        let pool = self.pool()?;

        let sql = format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {} USING vec0(embedding float[{}] distance_metric={}, +metadata text)",
            quote_identifier(table),
            dimension,
            metric_name
        );
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        tracing::debug!(table, dimension, metric = %metric, "sqlite vector table ready");
        self.remember(table, Some(TableSpec { dimension, metric }));
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let pool = self.pool()?;
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table));
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        self.remember(table, None);
        Ok(())
    }

    /// Insert one vector, returning its rowid
    pub async fn insert(
        &self,
        table: &str,
        embedding: &[f32],
        metadata: Option<&Metadata>,
    ) -> Result<i64> {
        let pool = self.pool()?;
        self.check(table, embedding).await?;

        let metadata = metadata.map(serde_json::to_string).transpose()?;
        let sql = format!(
            "INSERT INTO {} (embedding, metadata) VALUES (?, ?)",
            quote_identifier(table)
        );
        let result = sqlx::query(&sql)
            .bind(vec_to_blob(embedding))
            .bind(metadata)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get(&self, table: &str, id: i64) -> Result<Option<VectorRecord>> {
        let pool = self.pool()?;
        let sql = format!(
            "SELECT rowid AS id, embedding, metadata FROM {} WHERE rowid = ?",
            quote_identifier(table)
        );

        let row: Option<VectorRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| self.fail(e))?;

        row.map(|row| {
            Ok(VectorRecord {
                id: VectorId::Int(row.id),
                embedding: blob_to_vec(&row.embedding),
                metadata: parse_metadata(row.metadata)?,
            })
        })
        .transpose()
    }

    /// K nearest neighbours of `query`, closest first
    ///
    /// The requested metric must equal the table's declared metric.
    pub async fn search(
        &self,
        table: &str,
        query: &[f32],
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let pool = self.pool()?;
        let spec = self.check(table, query).await?;
        ensure_metric(table, spec, options.metric)?;

        let sql = format!(
            r#"
            SELECT rowid AS id, embedding, metadata, distance
            FROM {}
            WHERE embedding MATCH ? AND k = ?
            ORDER BY distance
            "#,
            quote_identifier(table)
        );

        let rows: Vec<ScoredRow> = sqlx::query_as(&sql)
            .bind(vec_to_blob(query))
            .bind(options.limit as i64)
            .fetch_all(pool)
            .await
            .map_err(|e| self.fail(e))?;

        rows.into_iter()
            .map(|row| {
                Ok(SearchResult {
                    id: VectorId::Int(row.id),
                    embedding: Some(blob_to_vec(&row.embedding)),
                    metadata: parse_metadata(row.metadata)?,
                    score: row.distance as f32,
                })
            })
            .collect()
    }

    /// Delete by rowid, returning whether a row was removed
    pub async fn delete(&self, table: &str, id: i64) -> Result<bool> {
        let pool = self.pool()?;
        let sql = format!("DELETE FROM {} WHERE rowid = ?", quote_identifier(table));
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(pool)
            .await
            .map_err(|e| self.fail(e))?;

        Ok(result.rows_affected() > 0)
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        let options = if self.config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| self.fail(e))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.config.path)
                .create_if_missing(true)
        };
        Ok(options.extension(self.config.extension_path.clone()))
    }

    async fn create_default_table(&self, table: &SqliteTableConfig) -> Result<()> {
        self.create_table(&table.name, table.dimension, table.metric)
            .await
    }
}

#[async_trait]
impl BackendAdapter for SqliteAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let options = self.connect_options()?;
        let pool_options = if self.config.is_in_memory() {
            // A single connection that never expires keeps the database alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(self.config.max_connections)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| self.fail(e))?;

        self.pool = Some(pool);

        if let Some(table) = self.config.default_table.clone() {
            if let Err(e) = self.create_default_table(&table).await {
                self.disconnect().await?;
                return Err(e);
            }
        }

        self.events
            .on_event(&AdapterEvent::connected(BackendKind::Sqlite));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Table specs belong to the database; an in-memory one is gone after close
        if let Ok(mut tables) = self.tables.write() {
            tables.clear();
        }
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            self.events
                .on_event(&AdapterEvent::disconnected(BackendKind::Sqlite));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }
}
