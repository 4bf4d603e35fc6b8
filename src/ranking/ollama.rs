//! Ollama backend for a locally running model server.
//!
//! Calls `POST /api/generate` with streaming off. If nothing is listening,
//! the default fallback is an empty ranking rather than the full catalog.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{http_client, missing_text, send_json, RankingBackend, Sampling};
use crate::config::TransportFallback;
use crate::error::{Result, ScoutError};

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    pub model: String,
    pub sampling: Sampling,
    pub fallback: TransportFallback,
}

pub struct OllamaBackend {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl RankingBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn transport_fallback(&self) -> TransportFallback {
        self.config.fallback
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": self.config.sampling.temperature,
                "num_predict": self.config.sampling.max_output_tokens,
            }
        });
        let request = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&payload);

        let body = send_json(self.name(), request).await.map_err(|e| match e {
            ScoutError::Transport {
                status: None,
                message,
                backend,
            } => ScoutError::Transport {
                message: format!(
                    "{} (is Ollama running at {}?)",
                    message, self.config.base_url
                ),
                backend,
                status: None,
            },
            other => other,
        })?;

        body.get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| missing_text(self.name(), &body))
    }
}
