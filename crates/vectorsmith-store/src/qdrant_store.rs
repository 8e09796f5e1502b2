//! Qdrant adapter
//!
//! Collection management, point upsert/delete, and similarity search. The
//! distance metric is fixed when a collection is created; searches always use
//! the collection's metric.
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId, PointStruct,
    PointsIdsList, ScoredPoint, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use uuid::Uuid;
use vectorsmith_core::events::default_sink;
use vectorsmith_core::vector::ensure_finite;
use vectorsmith_core::{
    AdapterEvent, BackendKind, DistanceMetric, EventSink, Metadata, QdrantConfig, Result,
    SearchResult, VectorId, VectorSmithError,
};

use crate::{require_handle, BackendAdapter};

/// A point to upsert; the id is chosen by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantPoint {
    /// Unsigned integer or UUID string
    pub id: VectorId,
    pub vector: Vec<f32>,
    pub payload: Option<Metadata>,
}

impl QdrantPoint {
    pub fn new(id: impl Into<VectorId>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Metadata) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Search knobs for Qdrant
#[derive(Debug, Clone)]
pub struct QdrantSearchOptions {
    pub limit: usize,

    pub filter: Option<Filter>,

    /// Drop hits scoring below this value
    pub score_threshold: Option<f32>,

    pub with_payload: bool,
}

impl Default for QdrantSearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            filter: None,
            score_threshold: None,
            with_payload: true,
        }
    }
}

impl QdrantSearchOptions {
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

/// Map a metric onto Qdrant's collection distance
pub fn qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::L2 => Distance::Euclid,
        DistanceMetric::InnerProduct => Distance::Dot,
    }
}

fn to_point_id(id: &VectorId) -> Result<PointId> {
    match id {
        VectorId::Int(n) => u64::try_from(*n).map(PointId::from).map_err(|_| {
            VectorSmithError::InvalidInput(format!("Qdrant point id must be unsigned: {n}"))
        }),
        VectorId::Text(s) => {
            Uuid::parse_str(s).map_err(|e| {
                VectorSmithError::InvalidInput(format!("Qdrant point id must be a UUID: {e}"))
            })?;
            Ok(PointId::from(s.clone()))
        }
    }
}

fn from_point_id(id: PointId) -> Result<VectorId> {
    match id.point_id_options {
        Some(PointIdOptions::Num(n)) => i64::try_from(n).map(VectorId::Int).map_err(|_| {
            VectorSmithError::InvalidResponse(format!("Qdrant point id {n} exceeds i64 range"))
        }),
        Some(PointIdOptions::Uuid(u)) => Ok(VectorId::Text(u)),
        None => Err(VectorSmithError::InvalidResponse(
            "Qdrant point id has no value".to_string(),
        )),
    }
}

/// Convert a payload value back to JSON
fn payload_value_to_json(value: QdrantValue) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::IntegerValue(i)) => serde_json::Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => serde_json::Value::Array(
            list.values.into_iter().map(payload_value_to_json).collect(),
        ),
        Some(Kind::StructValue(st)) => serde_json::Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, payload_value_to_json(v)))
                .collect(),
        ),
    }
}

fn payload_to_map(payload: HashMap<String, QdrantValue>) -> Metadata {
    payload
        .into_iter()
        .map(|(k, v)| (k, payload_value_to_json(v)))
        .collect()
}

fn into_search_result(point: ScoredPoint) -> Result<SearchResult> {
    let id = point
        .id
        .ok_or_else(|| VectorSmithError::InvalidResponse("Qdrant hit without id".to_string()))
        .and_then(from_point_id)?;
    let metadata = if point.payload.is_empty() {
        None
    } else {
        Some(payload_to_map(point.payload))
    };

    Ok(SearchResult {
        id,
        embedding: None,
        metadata,
        score: point.score,
    })
}

/// Qdrant adapter
pub struct QdrantAdapter {
    config: QdrantConfig,
    client: Option<Qdrant>,
    events: Arc<dyn EventSink>,
}

impl QdrantAdapter {
    pub fn new(config: QdrantConfig) -> Self {
        Self {
            config,
            client: None,
            events: default_sink(),
        }
    }

    /// Route lifecycle events to a custom sink
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }

    /// The underlying client, for calls this adapter does not wrap
    pub fn client(&self) -> Result<&Qdrant> {
        require_handle(self.client.as_ref(), BackendKind::Qdrant)
    }

    fn fail(&self, err: QdrantError) -> VectorSmithError {
        self.events
            .on_event(&AdapterEvent::error(BackendKind::Qdrant, err.to_string()));
        VectorSmithError::driver(BackendKind::Qdrant, err)
    }

    /// Create a collection with a fixed vector size and metric
    pub async fn create_collection(
        &self,
        collection: &str,
        size: u64,
        metric: DistanceMetric,
    ) -> Result<()> {
        let client = self.client()?;
        client
            .create_collection(
                CreateCollectionBuilder::new(collection)
                    .vectors_config(VectorParamsBuilder::new(size, qdrant_distance(metric))),
            )
            .await
            .map_err(|e| self.fail(e))?;

        tracing::debug!(collection, size, metric = %metric, "Qdrant collection created");
        Ok(())
    }

    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        let client = self.client()?;
        client
            .delete_collection(collection)
            .await
            .map_err(|e| self.fail(e))?;
        Ok(())
    }

    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let client = self.client()?;
        let response = client
            .list_collections()
            .await
            .map_err(|e| self.fail(e))?;

        Ok(response
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    pub async fn collection_exists(&self, collection: &str) -> Result<bool> {
        let client = self.client()?;
        client
            .collection_exists(collection)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Insert or replace points, waiting for the write to be applied
    pub async fn upsert(&self, collection: &str, points: Vec<QdrantPoint>) -> Result<()> {
        let client = self.client()?;

        let mut structs = Vec::with_capacity(points.len());
        for point in points {
            ensure_finite(&point.vector)?;
            let payload: HashMap<String, QdrantValue> = point
                .payload
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect();
            structs.push(PointStruct::new(
                to_point_id(&point.id)?,
                point.vector,
                payload,
            ));
        }

        client
            .upsert_points(UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(|e| self.fail(e))?;
        Ok(())
    }

    /// Similarity search using the collection's metric, best match first
    pub async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        options: QdrantSearchOptions,
    ) -> Result<Vec<SearchResult>> {
        let client = self.client()?;
        ensure_finite(vector)?;

        let mut request =
            SearchPointsBuilder::new(collection, vector.to_vec(), options.limit as u64)
                .with_payload(options.with_payload);
        if let Some(filter) = options.filter {
            request = request.filter(filter);
        }
        if let Some(threshold) = options.score_threshold {
            request = request.score_threshold(threshold);
        }

        let response = client
            .search_points(request)
            .await
            .map_err(|e| self.fail(e))?;

        response
            .result
            .into_iter()
            .map(into_search_result)
            .collect()
    }

    /// Delete points by id
    pub async fn delete_points(&self, collection: &str, ids: &[VectorId]) -> Result<()> {
        let client = self.client()?;
        let ids = ids.iter().map(to_point_id).collect::<Result<Vec<_>>>()?;

        client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids })
                    .wait(true),
            )
            .await
            .map_err(|e| self.fail(e))?;
        Ok(())
    }
}

#[async_trait]
impl BackendAdapter for QdrantAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    async fn connect(&mut self) -> Result<()> {
        if self.client.is_some() {
            return Ok(());
        }

        let mut builder = Qdrant::from_url(&self.config.url);
        if let Some(key) = &self.config.api_key {
            builder = builder.api_key(key.clone());
        }
        if let Some(secs) = self.config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| self.fail(e))?;

        // The builder is lazy; a health check proves the server is reachable
        client.health_check().await.map_err(|e| self.fail(e))?;

        self.client = Some(client);
        self.events
            .on_event(&AdapterEvent::connected(BackendKind::Qdrant));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.client.take().is_some() {
            self.events
                .on_event(&AdapterEvent::disconnected(BackendKind::Qdrant));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}
