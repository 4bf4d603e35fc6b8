//! Google Gemini backends: direct API calls and calls through a relay.
//!
//! Both send the same `generateContent` request body. The relay variant posts
//! `{model, body}` to a trusted intermediary that holds the API key and
//! forwards the request unchanged, for runtimes that must not carry the key
//! or cannot call the API origin directly.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{http_client, missing_text, send_json, RankingBackend, Sampling};
use crate::config::TransportFallback;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub sampling: Sampling,
    pub fallback: TransportFallback,
}

pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl RankingBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn transport_fallback(&self) -> TransportFallback {
        self.config.fallback
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let request = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&generate_content_body(prompt, &self.config.sampling));

        let body = send_json(self.name(), request).await?;
        candidate_text(&body).ok_or_else(|| missing_text(self.name(), &body))
    }
}

#[derive(Debug, Clone)]
pub struct GeminiRelayConfig {
    /// Absolute URL of the relay endpoint.
    pub relay_url: String,
    pub model: String,
    pub sampling: Sampling,
    pub fallback: TransportFallback,
}

pub struct GeminiRelayBackend {
    client: reqwest::Client,
    config: GeminiRelayConfig,
}

impl GeminiRelayBackend {
    pub fn new(config: GeminiRelayConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl RankingBackend for GeminiRelayBackend {
    fn name(&self) -> &str {
        "gemini_relay"
    }

    fn transport_fallback(&self) -> TransportFallback {
        self.config.fallback
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "body": generate_content_body(prompt, &self.config.sampling),
        });
        let request = self.client.post(&self.config.relay_url).json(&payload);

        let body = send_json(self.name(), request).await?;
        candidate_text(&body).ok_or_else(|| missing_text(self.name(), &body))
    }
}

/// `generateContent` request body for a single-turn prompt.
pub fn generate_content_body(prompt: &str, sampling: &Sampling) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "temperature": sampling.temperature,
            "maxOutputTokens": sampling.max_output_tokens,
        }
    })
}

/// `candidates[0].content.parts[0].text`, if present.
pub fn candidate_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}
