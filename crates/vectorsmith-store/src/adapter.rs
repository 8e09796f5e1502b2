//! Multi-backend aggregator
//!
//! [`VectorSmithAdapter`] owns one optional slot per backend. A slot is filled
//! only when its configuration section is present. Lifecycle calls fan out
//! concurrently to the filled slots.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use futures::future::join_all;
use vectorsmith_core::events::default_sink;
use vectorsmith_core::{AdapterConfig, BackendKind, EventSink, Result, VectorSmithError};

use crate::retriever::{PgVectorRetriever, QdrantRetriever, RedisRetriever, SqliteRetriever};
use crate::{BackendAdapter, PgVectorAdapter, QdrantAdapter, RedisAdapter, SqliteAdapter};

/// Aggregator over the configured backend adapters
pub struct VectorSmithAdapter {
    redis: Option<RedisAdapter>,
    pgvector: Option<PgVectorAdapter>,
    qdrant: Option<QdrantAdapter>,
    sqlite: Option<SqliteAdapter>,
}

fn not_configured(backend: BackendKind) -> VectorSmithError {
    VectorSmithError::NotConfigured(format!("{backend} backend"))
}

/// Collapse per-backend outcomes into one result
///
/// The first failure (in backend order) is returned; the rest are logged.
fn first_failure(outcomes: Vec<(BackendKind, Result<()>)>) -> Result<()> {
    let mut first = None;
    for (backend, outcome) in outcomes {
        if let Err(e) = outcome {
            if first.is_none() {
                first = Some(e);
            } else {
                tracing::warn!(backend = %backend, error = %e, "Additional backend failure");
            }
        }
    }
    first.map_or(Ok(()), Err)
}

impl VectorSmithAdapter {
    /// Build adapters for every configured backend using the tracing event sink
    pub fn new(config: AdapterConfig) -> Self {
        Self::with_event_sink(config, default_sink())
    }

    /// Build adapters that report lifecycle events to `events`
    pub fn with_event_sink(config: AdapterConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            redis: config
                .redis
                .map(|c| RedisAdapter::new(c).with_event_sink(events.clone())),
            pgvector: config
                .pgvector
                .map(|c| PgVectorAdapter::new(c).with_event_sink(events.clone())),
            qdrant: config
                .qdrant
                .map(|c| QdrantAdapter::new(c).with_event_sink(events.clone())),
            sqlite: config
                .sqlite
                .map(|c| SqliteAdapter::new(c).with_event_sink(events)),
        }
    }

    /// Backends that have a configured adapter
    pub fn configured_backends(&self) -> Vec<BackendKind> {
        self.slots().iter().map(|a| a.kind()).collect()
    }

    fn slots(&self) -> Vec<&dyn BackendAdapter> {
        let mut slots: Vec<&dyn BackendAdapter> = Vec::new();
        if let Some(a) = &self.redis {
            slots.push(a);
        }
        if let Some(a) = &self.pgvector {
            slots.push(a);
        }
        if let Some(a) = &self.qdrant {
            slots.push(a);
        }
        if let Some(a) = &self.sqlite {
            slots.push(a);
        }
        slots
    }

    fn slots_mut(&mut self) -> Vec<&mut dyn BackendAdapter> {
        let mut slots: Vec<&mut dyn BackendAdapter> = Vec::new();
        if let Some(a) = &mut self.redis {
            slots.push(a);
        }
        if let Some(a) = &mut self.pgvector {
            slots.push(a);
        }
        if let Some(a) = &mut self.qdrant {
            slots.push(a);
        }
        if let Some(a) = &mut self.sqlite {
            slots.push(a);
        }
        slots
    }

    /// Connect every configured backend concurrently
    ///
    /// Fails with `Configuration` when no backend is configured. When any
    /// backend fails the call fails, but backends that did connect stay
    /// connected; call [`disconnect`](Self::disconnect) to release them.
    pub async fn connect(&mut self) -> Result<()> {
        let slots = self.slots_mut();
        if slots.is_empty() {
            return Err(VectorSmithError::Configuration(
                "At least one backend must be configured".to_string(),
            ));
        }

        tracing::info!(backends = slots.len(), "Connecting backends");
        let outcomes = join_all(slots.into_iter().map(|adapter| async move {
            let kind = adapter.kind();
            (kind, adapter.connect().await)
        }))
        .await;

        first_failure(outcomes)
    }

    /// Disconnect every backend that is currently connected
    pub async fn disconnect(&mut self) -> Result<()> {
        let connected: Vec<&mut dyn BackendAdapter> = self
            .slots_mut()
            .into_iter()
            .filter(|a| a.is_connected())
            .collect();

        let outcomes = join_all(connected.into_iter().map(|adapter| async move {
            let kind = adapter.kind();
            (kind, adapter.disconnect().await)
        }))
        .await;

        first_failure(outcomes)
    }

    /// True when at least one configured backend is connected
    pub fn is_connected(&self) -> bool {
        self.slots().iter().any(|a| a.is_connected())
    }

    pub fn redis(&self) -> Result<&RedisAdapter> {
        self.redis
            .as_ref()
            .ok_or_else(|| not_configured(BackendKind::Redis))
    }

    pub fn redis_mut(&mut self) -> Result<&mut RedisAdapter> {
        self.redis
            .as_mut()
            .ok_or_else(|| not_configured(BackendKind::Redis))
    }

    pub fn pgvector(&self) -> Result<&PgVectorAdapter> {
        self.pgvector
            .as_ref()
            .ok_or_else(|| not_configured(BackendKind::PgVector))
    }

    pub fn pgvector_mut(&mut self) -> Result<&mut PgVectorAdapter> {
        self.pgvector
            .as_mut()
            .ok_or_else(|| not_configured(BackendKind::PgVector))
    }

    pub fn qdrant(&self) -> Result<&QdrantAdapter> {
        self.qdrant
            .as_ref()
            .ok_or_else(|| not_configured(BackendKind::Qdrant))
    }

    pub fn qdrant_mut(&mut self) -> Result<&mut QdrantAdapter> {
        self.qdrant
            .as_mut()
            .ok_or_else(|| not_configured(BackendKind::Qdrant))
    }

    pub fn sqlite(&self) -> Result<&SqliteAdapter> {
        self.sqlite
            .as_ref()
            .ok_or_else(|| not_configured(BackendKind::Sqlite))
    }

    pub fn sqlite_mut(&mut self) -> Result<&mut SqliteAdapter> {
        self.sqlite
            .as_mut()
            .ok_or_else(|| not_configured(BackendKind::Sqlite))
    }

    pub fn redis_retriever(&self) -> Result<RedisRetriever<'_>> {
        self.redis().map(RedisRetriever::new)
    }

    pub fn pgvector_retriever(&self) -> Result<PgVectorRetriever<'_>> {
        self.pgvector().map(PgVectorRetriever::new)
    }

    pub fn qdrant_retriever(&self) -> Result<QdrantRetriever<'_>> {
        self.qdrant().map(QdrantRetriever::new)
    }

    pub fn sqlite_retriever(&self) -> Result<SqliteRetriever<'_>> {
        self.sqlite().map(SqliteRetriever::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vectorsmith_core::{
        AdapterEvent, AdapterEventKind, QdrantConfig, RedisConfig, SqliteConfig,
    };

    #[derive(Default)]
    struct Recorder(Mutex<Vec<AdapterEvent>>);

    impl EventSink for Recorder {
        fn on_event(&self, event: &AdapterEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_connect_without_backends_is_configuration_error() {
        let mut adapter = VectorSmithAdapter::new(AdapterConfig::default());
        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(err, VectorSmithError::Configuration(_)));
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_without_backends_is_noop() {
        let mut adapter = VectorSmithAdapter::new(AdapterConfig::default());
        adapter.disconnect().await.unwrap();
    }

    #[test]
    fn test_getters_follow_configuration() {
        let adapter = VectorSmithAdapter::new(AdapterConfig {
            qdrant: Some(QdrantConfig::default()),
            ..Default::default()
        });

        assert!(adapter.qdrant().is_ok());
        assert!(adapter.qdrant_retriever().is_ok());
        assert_eq!(adapter.configured_backends(), vec![BackendKind::Qdrant]);

        let err = adapter.redis().err().unwrap();
        assert!(matches!(&err, VectorSmithError::NotConfigured(name) if name.contains("redis")));
        assert!(matches!(
            adapter.pgvector().err().unwrap(),
            VectorSmithError::NotConfigured(_)
        ));
        assert!(matches!(
            adapter.sqlite_retriever().err().unwrap(),
            VectorSmithError::NotConfigured(_)
        ));
    }

    #[test]
    fn test_not_connected_before_connect() {
        let adapter = VectorSmithAdapter::new(AdapterConfig {
            redis: Some(RedisConfig::default()),
            sqlite: Some(SqliteConfig::default()),
            ..Default::default()
        });

        assert!(!adapter.is_connected());
        assert_eq!(
            adapter.configured_backends(),
            vec![BackendKind::Redis, BackendKind::Sqlite]
        );
    }

    #[tokio::test]
    async fn test_failed_connect_reports_driver_error() {
        let recorder = Arc::new(Recorder::default());
        let mut adapter = VectorSmithAdapter::with_event_sink(
            AdapterConfig {
                redis: Some(RedisConfig {
                    host: "127.0.0.1".to_string(),
                    port: 1,
                    ..Default::default()
                }),
                ..Default::default()
            },
            recorder.clone(),
        );

        let err = adapter.connect().await.unwrap_err();
        assert!(matches!(
            err,
            VectorSmithError::Driver {
                backend: BackendKind::Redis,
                ..
            }
        ));
        assert!(!adapter.is_connected());

        let events = recorder.0.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| e.backend == BackendKind::Redis
                && matches!(e.kind, AdapterEventKind::Error(_))));
    }

    #[test]
    fn test_first_failure_keeps_order() {
        let outcomes = vec![
            (BackendKind::Redis, Ok(())),
            (
                BackendKind::PgVector,
                Err(VectorSmithError::Configuration("pg".to_string())),
            ),
            (
                BackendKind::Qdrant,
                Err(VectorSmithError::Configuration("qdrant".to_string())),
            ),
        ];
        let err = first_failure(outcomes).unwrap_err();
        assert!(matches!(err, VectorSmithError::Configuration(m) if m == "pg"));
        assert!(first_failure(vec![(BackendKind::Redis, Ok(()))]).is_ok());
    }
}
