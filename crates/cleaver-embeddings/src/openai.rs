use std::sync::Arc;

use async_trait::async_trait;
use cleaver_core::{CleaverError, Embeddings};
use cleaver_models::{ProviderBackend, ProviderRequest};
use serde_json::json;

pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Embeddings client for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddings {
    config: OpenAiEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    fn build_request(&self, input: Vec<String>) -> ProviderRequest {
        ProviderRequest {
            url: format!("{}/embeddings", self.config.base_url),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body: json!({
                "model": self.config.model,
                "input": input,
            }),
        }
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<Vec<Vec<f32>>, CleaverError> {
        let data = body.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
            CleaverError::Provider("missing 'data' field in embeddings response".to_string())
        })?;

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(data.len());
        for item in data {
            let embedding: Vec<f32> = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| CleaverError::Provider("missing 'embedding' field".to_string()))?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            // Vectors must come back in input order with uniform dimensionality.
            if let Some(first) = embeddings.first() {
                if first.len() != embedding.len() {
                    return Err(CleaverError::Provider(format!(
                        "non-uniform embedding dimensions: {} vs {}",
                        first.len(),
                        embedding.len()
                    )));
                }
            }
            embeddings.push(embedding);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError> {
        let input: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let request = self.build_request(input);
        let response = self.backend.send(request).await?;

        if response.status != 200 {
            return Err(CleaverError::Provider(format!(
                "embeddings API error ({}): {}",
                response.status, response.body
            )));
        }

        let embeddings = self.parse_response(&response.body)?;
        if embeddings.len() != texts.len() {
            return Err(CleaverError::Provider(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CleaverError> {
        let mut results = self.embed_documents(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| CleaverError::Provider("empty embeddings response".to_string()))
    }
}
