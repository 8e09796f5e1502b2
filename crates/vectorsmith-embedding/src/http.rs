//! Shared HTTP plumbing for `POST {base_url}/embeddings` APIs
//!
//! Both supported providers speak the same request/response shape: bearer
//! auth, `{model, input}` in, `{data: [{embedding, index}]}` out.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use vectorsmith_core::{EmbeddingOptions, EmbeddingProviderKind, Result, VectorSmithError};

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Reject batches the APIs would refuse anyway
pub(crate) fn validate_input(texts: &[String]) -> Result<()> {
    if texts.is_empty() {
        return Err(VectorSmithError::InvalidInput(
            "At least one text is required".to_string(),
        ));
    }
    Ok(())
}

pub(crate) struct EmbeddingHttp {
    client: Client,
    provider: EmbeddingProviderKind,
    endpoint: String,
    api_key: String,
    timeout_ms: u64,
    expected_dimensions: Option<usize>,
}

impl EmbeddingHttp {
    pub(crate) fn new(
        provider: EmbeddingProviderKind,
        default_base_url: &str,
        api_key: &str,
        options: &EmbeddingOptions,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(VectorSmithError::Configuration(format!(
                "{provider} API key required"
            )));
        }
        if options.timeout_ms == 0 {
            return Err(VectorSmithError::Configuration(format!(
                "{provider} timeout_ms must be positive"
            )));
        }
        if options.expected_dimensions == Some(0) {
            return Err(VectorSmithError::Configuration(format!(
                "{provider} expected_dimensions must be positive"
            )));
        }

        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(default_base_url)
            .trim_end_matches('/');

        Ok(Self {
            client: Client::new(),
            provider,
            endpoint: format!("{base_url}/embeddings"),
            api_key: api_key.to_string(),
            timeout_ms: options.timeout_ms,
            expected_dimensions: options.expected_dimensions,
        })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> VectorSmithError {
        if err.is_timeout() {
            VectorSmithError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            VectorSmithError::Http(format!("{} embedding request failed: {err}", self.provider))
        }
    }

    async fn send<B: Serialize + Sync>(&self, body: &B) -> Result<EmbeddingResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VectorSmithError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                VectorSmithError::InvalidResponse(format!(
                    "Failed to parse {} embedding response: {e}",
                    self.provider
                ))
            }
        })
    }

    /// Issue one request for the whole batch and validate the vectors
    ///
    /// The deadline covers sending, the status line, and reading the body.
    pub(crate) async fn embed<B: Serialize + Sync>(
        &self,
        body: &B,
        input_len: usize,
    ) -> Result<Vec<Vec<f32>>> {
        tracing::debug!(provider = %self.provider, inputs = input_len, "Requesting embeddings");

        let deadline = Duration::from_millis(self.timeout_ms);
        let response = tokio::time::timeout(deadline, self.send(body))
            .await
            .map_err(|_| VectorSmithError::Timeout {
                timeout_ms: self.timeout_ms,
            })??;

        let mut data = response.data;
        if data.len() != input_len {
            return Err(VectorSmithError::InvalidResponse(format!(
                "{} returned {} embeddings for {} inputs",
                self.provider,
                data.len(),
                input_len
            )));
        }
        data.sort_by_key(|d| d.index);

        if let Some(expected) = self.expected_dimensions {
            if let Some(bad) = data.iter().find(|d| d.embedding.len() != expected) {
                return Err(VectorSmithError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
