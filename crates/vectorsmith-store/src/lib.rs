//! VectorSmith Store - Backend adapters over vector-capable stores
//!
//! Provides one adapter per supported backend (Redis, PostgreSQL + pgvector,
//! Qdrant, SQLite + sqlite-vec), the [`VectorSmithAdapter`] aggregator that
//! owns and coordinates them, and retrievers that delegate typed queries to a
//! single adapter.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use vectorsmith_core::{BackendKind, Result, VectorSmithError};

pub mod adapter;
pub mod pgvector_store;
pub mod qdrant_store;
pub mod redis_store;
pub mod retriever;
pub mod sqlite_store;

pub use adapter::VectorSmithAdapter;
pub use pgvector_store::PgVectorAdapter;
pub use qdrant_store::{QdrantAdapter, QdrantPoint, QdrantSearchOptions};
pub use redis_store::RedisAdapter;
pub use retriever::{
    PgVectorQuery, PgVectorRetriever, QdrantQuery, QdrantRetriever, RedisQuery, RedisRetriever,
    Retriever, SqliteQuery, SqliteRetriever,
};
pub use sqlite_store::SqliteAdapter;

/// Lifecycle shared by every backend adapter
///
/// `connect` and `disconnect` are idempotent. Data operations live on the
/// concrete adapter types and fail with `NotConnected` until `connect`
/// succeeds.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Which backend this adapter wraps
    fn kind(&self) -> BackendKind;

    /// Open the vendor connection, returning immediately if already open
    async fn connect(&mut self) -> Result<()>;

    /// Close the vendor connection; a no-op when never connected
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether a live handle is held
    fn is_connected(&self) -> bool;
}

/// Borrow the live handle or fail with `NotConnected`
pub(crate) fn require_handle<T>(handle: Option<&T>, backend: BackendKind) -> Result<&T> {
    handle.ok_or(VectorSmithError::NotConnected(backend))
}
