//! Redis key-value adapter
//!
//! GET / SET (with optional TTL) / DEL / EXISTS / KEYS over a multiplexed
//! async connection.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use vectorsmith_core::events::default_sink;
use vectorsmith_core::{AdapterEvent, BackendKind, EventSink, RedisConfig, Result, VectorSmithError};

use crate::{require_handle, BackendAdapter};

/// Redis adapter
pub struct RedisAdapter {
    config: RedisConfig,
    connection: Option<MultiplexedConnection>,
    events: Arc<dyn EventSink>,
}

impl RedisAdapter {
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            connection: None,
            events: default_sink(),
        }
    }

    /// Route lifecycle events to a custom sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn connection(&self) -> Result<MultiplexedConnection> {
        require_handle(self.connection.as_ref(), BackendKind::Redis).cloned()
    }

    fn fail(&self, err: redis::RedisError) -> VectorSmithError {
        self.events
            .on_event(&AdapterEvent::error(BackendKind::Redis, err.to_string()));
        VectorSmithError::driver(BackendKind::Redis, err)
    }

    /// Fetch a string value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        conn.get(key).await.map_err(|e| self.fail(e))
    }

    /// Store a string value, expiring after `ttl_secs` when given
    pub async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self.connection()?;
        match ttl_secs {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl)
                .await
                .map_err(|e| self.fail(e)),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| self.fail(e)),
        }
    }

    /// Fetch and deserialize a JSON value
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a JSON value
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl_secs).await
    }

    /// Delete a key, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        let removed: i64 = conn.del(key).await.map_err(|e| self.fail(e))?;
        Ok(removed > 0)
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection()?;
        conn.exists(key).await.map_err(|e| self.fail(e))
    }

    /// List keys matching a glob-style pattern
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection()?;
        conn.keys(pattern).await.map_err(|e| self.fail(e))
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for RedisAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let client =
            redis::Client::open(self.config.connection_url()).map_err(|e| self.fail(e))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| self.fail(e))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.fail(e))?;

        self.connection = Some(conn);
        self.events
            .on_event(&AdapterEvent::connected(BackendKind::Redis));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Dropping the last clone closes the multiplexed connection
        if self.connection.take().is_some() {
            self.events
                .on_event(&AdapterEvent::disconnected(BackendKind::Redis));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}
