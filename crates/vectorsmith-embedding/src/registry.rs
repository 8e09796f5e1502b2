//! Embedding provider registry
//!
//! Author: hephaex@gmail.com

use std::collections::HashMap;
use std::sync::Arc;

use vectorsmith_core::{EmbeddingConfig, EmbeddingProviderKind, Result, VectorSmithError};

use crate::{EmbeddingProvider, JinaEmbedding, OpenAiEmbedding};

/// Providers keyed by kind, with an optional default
pub struct VectorSmithEmbedding {
    providers: HashMap<EmbeddingProviderKind, Arc<dyn EmbeddingProvider>>,
    requested_default: Option<EmbeddingProviderKind>,
    default: Option<EmbeddingProviderKind>,
}

impl VectorSmithEmbedding {
    /// Build every provider present in the config
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let mut providers: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();
        if let Some(jina) = &config.jina {
            providers.push(Arc::new(JinaEmbedding::new(jina)?));
        }
        if let Some(openai) = &config.openai {
            providers.push(Arc::new(OpenAiEmbedding::new(openai)?));
        }
        Self::from_providers(providers, config.default_provider)
    }

    /// Build from already constructed providers
    ///
    /// A later provider of the same kind replaces an earlier one.
    pub fn from_providers(
        providers: Vec<Arc<dyn EmbeddingProvider>>,
        default_provider: Option<EmbeddingProviderKind>,
    ) -> Result<Self> {
        if providers.is_empty() {
            return Err(VectorSmithError::Configuration(
                "At least one embedding provider must be configured".to_string(),
            ));
        }

        let mut registry = Self {
            providers: HashMap::new(),
            requested_default: default_provider,
            default: None,
        };
        for provider in providers {
            registry.providers.insert(provider.kind(), provider);
        }
        registry.resolve_default();

        tracing::info!(
            providers = registry.providers.len(),
            default = ?registry.default,
            "Embedding registry ready"
        );
        Ok(registry)
    }

    fn resolve_default(&mut self) {
        self.default = match self.requested_default {
            Some(kind) if self.providers.contains_key(&kind) => Some(kind),
            requested => {
                if let Some(kind) = requested {
                    tracing::warn!(provider = %kind, "Default embedding provider is not configured");
                }
                if self.providers.len() == 1 {
                    self.providers.keys().next().copied()
                } else {
                    None
                }
            }
        };
    }

    /// Add or replace a provider; the default is re-resolved
    pub fn register(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.providers.insert(provider.kind(), provider);
        self.resolve_default();
    }

    /// Resolve `kind`, or the default provider when `None`
    pub fn provider(
        &self,
        kind: Option<EmbeddingProviderKind>,
    ) -> Result<Arc<dyn EmbeddingProvider>> {
        let kind = kind.or(self.default).ok_or_else(|| {
            VectorSmithError::Configuration(
                "No embedding provider requested and no default provider set".to_string(),
            )
        })?;

        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| VectorSmithError::NotConfigured(format!("{kind} embedding provider")))
    }

    pub async fn embed(
        &self,
        texts: &[String],
        kind: Option<EmbeddingProviderKind>,
    ) -> Result<Vec<Vec<f32>>> {
        self.provider(kind)?.embed(texts).await
    }

    pub async fn embed_one(
        &self,
        text: &str,
        kind: Option<EmbeddingProviderKind>,
    ) -> Result<Vec<f32>> {
        self.provider(kind)?.embed_one(text).await
    }

    /// Configured provider kinds, sorted
    pub fn kinds(&self) -> Vec<EmbeddingProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    pub fn default_kind(&self) -> Option<EmbeddingProviderKind> {
        self.default
    }
}
