//! OpenAI chat-completions backend.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{http_client, missing_text, send_json, RankingBackend, Sampling};
use crate::config::TransportFallback;
use crate::error::Result;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that returns only valid JSON arrays.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub sampling: Sampling,
    pub fallback: TransportFallback,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl RankingBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn transport_fallback(&self) -> TransportFallback {
        self.config.fallback
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.config.sampling.temperature,
            "max_tokens": self.config.sampling.max_output_tokens,
        });
        let request = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload);

        let body = send_json(self.name(), request).await?;
        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing_text(self.name(), &body))
    }
}
