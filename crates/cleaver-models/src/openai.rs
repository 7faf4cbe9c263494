use std::sync::Arc;

use async_trait::async_trait;
use cleaver_core::{CleaverError, CompletionModel, CompletionParams};
use serde_json::json;

use crate::backend::{ProviderBackend, ProviderRequest};

pub struct OpenAiCompletionsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiCompletionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
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

/// Chat-completions client for any OpenAI-compatible endpoint.
///
/// `enable_thinking` is forwarded through `chat_template_kwargs`, the
/// convention vLLM-style servers use for toggling reasoning output.
pub struct OpenAiCompletions {
    config: OpenAiCompletionsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiCompletions {
    pub fn new(config: OpenAiCompletionsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    fn build_request(&self, system: &str, prompt: &str, params: &CompletionParams) -> ProviderRequest {
        let model = params.model.as_deref().unwrap_or(&self.config.model);
        let mut body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": prompt},
            ],
            "temperature": params.temperature,
            "chat_template_kwargs": {"enable_thinking": params.enable_thinking},
        });
        if let Some(max_tokens) = params.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        ProviderRequest {
            url: format!("{}/chat/completions", self.config.base_url),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompletions {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CleaverError> {
        let request = self.build_request(system, prompt, params);
        let response = self.backend.send(request).await?;

        if response.status != 200 {
            return Err(CleaverError::Provider(format!(
                "completions API error ({}): {}",
                response.status, response.body
            )));
        }

        let content = response
            .body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                CleaverError::Parsing("missing 'choices[0].message.content' in response".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}
