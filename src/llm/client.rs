use crate::config::LlmSettings;
use crate::error::{AssistantError, Result};
use crate::llm::{CompletionModel, StreamAssembler};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Streaming client for a llama.cpp-style `/completion` endpoint.
pub struct LlamaClient {
    client: reqwest::Client,
    url: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AssistantError::ModelTransport(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            url: settings.completion_url(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CompletionModel for LlamaClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "prompt": prompt,
            "temperature": self.temperature,
            "n_predict": self.max_tokens,
            "stream": true,
        });

        let mut response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::ModelTransport(format!("request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::ModelTransport(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let mut assembler = StreamAssembler::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AssistantError::ModelTransport(format!("stream interrupted: {}", e)))?
        {
            assembler.push(&chunk);
            if assembler.is_finished() {
                break;
            }
        }

        let text = assembler.finish();
        tracing::debug!("model returned {} characters", text.len());
        Ok(text)
    }
}
