//! Jina embedding provider

use async_trait::async_trait;
use serde::Serialize;
use vectorsmith_core::{EmbeddingProviderConfig, EmbeddingProviderKind, Result};

use crate::http::{validate_input, EmbeddingHttp};
use crate::EmbeddingProvider;

pub const JINA_BASE_URL: &str = "https://api.jina.ai/v1";

/// Jina embedding API client
pub struct JinaEmbedding {
    http: EmbeddingHttp,
    model: String,
    task: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct JinaEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl JinaEmbedding {
    /// Create from provider config
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self> {
        let http = EmbeddingHttp::new(
            EmbeddingProviderKind::Jina,
            JINA_BASE_URL,
            &config.api_key,
            &config.options,
        )?;

        Ok(Self {
            http,
            model: config.model.clone(),
            task: None,
            dimensions: None,
        })
    }

    /// Downstream task hint, e.g. `retrieval.query` or `retrieval.passage`
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Matryoshka truncation requested from the API
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }
}

#[async_trait]
impl EmbeddingProvider for JinaEmbedding {
    fn kind(&self) -> EmbeddingProviderKind {
        EmbeddingProviderKind::Jina
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        validate_input(texts)?;

        let request = JinaEmbeddingRequest {
            model: &self.model,
            input: texts,
            task: self.task.as_deref(),
            dimensions: self.dimensions,
        };
        self.http.embed(&request, texts.len()).await
    }
}
