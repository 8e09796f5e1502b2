//! VectorSmith Embedding - Embedding API providers
//!
//! Supports the Jina and OpenAI embedding APIs behind the
//! [`EmbeddingProvider`] trait, plus the [`VectorSmithEmbedding`] registry
//! that resolves a provider by kind with a default-provider fallback.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use vectorsmith_core::{EmbeddingProviderKind, Result, VectorSmithError};

mod http;
pub mod jina;
pub mod openai;
pub mod registry;

pub use jina::JinaEmbedding;
pub use openai::OpenAiEmbedding;
pub use registry::VectorSmithEmbedding;

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Which API this provider talks to
    fn kind(&self) -> EmbeddingProviderKind;

    /// Model name sent with every request
    fn model(&self) -> &str;

    /// Embed a batch of texts in a single request
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed one text
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VectorSmithError::InvalidResponse("No embedding returned".to_string()))
    }
}
