//! OpenAI embedding provider
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use serde::Serialize;
use vectorsmith_core::{EmbeddingProviderConfig, EmbeddingProviderKind, Result};

use crate::http::{validate_input, EmbeddingHttp};
use crate::EmbeddingProvider;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    http: EmbeddingHttp,
    model: String,
    dimensions: Option<usize>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl OpenAiEmbedding {
    /// Create from provider config
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self> {
        let http = EmbeddingHttp::new(
            EmbeddingProviderKind::OpenAI,
            OPENAI_BASE_URL,
            &config.api_key,
            &config.options,
        )?;

        Ok(Self {
            http,
            model: config.model.clone(),
            dimensions: None,
        })
    }

    /// Ask the API to shorten vectors (text-embedding-3 models only)
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.http.endpoint()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn kind(&self) -> EmbeddingProviderKind {
        EmbeddingProviderKind::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        validate_input(texts)?;

        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        self.http.embed(&request, texts.len()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vectorsmith_core::VectorSmithError;

    #[test]
    fn test_request_shape() {
        let input = vec!["a".to_string(), "b".to_string()];
        let request = OpenAiEmbeddingRequest {
            model: "text-embedding-3-small",
            input: &input,
            dimensions: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "text-embedding-3-small", "input": ["a", "b"]})
        );
    }

    #[test]
    fn test_default_endpoint() {
        let client =
            OpenAiEmbedding::new(&EmbeddingProviderConfig::new("sk-test", "text-embedding-3-small"))
                .unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/embeddings");
        assert_eq!(client.model(), "text-embedding-3-small");
        assert_eq!(client.kind(), EmbeddingProviderKind::OpenAI);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_without_request() {
        let client =
            OpenAiEmbedding::new(&EmbeddingProviderConfig::new("sk-test", "text-embedding-3-small"))
                .unwrap();
        let err = client.embed(&[]).await.unwrap_err();
        assert!(matches!(err, VectorSmithError::InvalidInput(_)));
    }
}
