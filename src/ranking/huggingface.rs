//! Hugging Face Inference API backend.
//!
//! Text-generation models reply with either `[{"generated_text": ...}]` or a
//! bare `{"generated_text": ...}`; both are accepted.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{http_client, missing_text, send_json, RankingBackend, Sampling};
use crate::config::TransportFallback;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Models root, e.g. `https://api-inference.huggingface.co/models`.
    pub base_url: String,
    /// Repository id, e.g. `mistralai/Mixtral-8x7B-Instruct-v0.1`.
    pub model: String,
    pub token: String,
    pub sampling: Sampling,
    pub fallback: TransportFallback,
}

pub struct HuggingFaceBackend {
    client: reqwest::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceBackend {
    pub fn new(config: HuggingFaceConfig, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl RankingBackend for HuggingFaceBackend {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn transport_fallback(&self) -> TransportFallback {
        self.config.fallback
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": self.config.sampling.max_output_tokens,
                "temperature": self.config.sampling.temperature,
                "return_full_text": false,
            }
        });
        let request = self
            .client
            .post(format!("{}/{}", self.config.base_url, self.config.model))
            .header("Authorization", format!("Bearer {}", self.config.token))
            .json(&payload);

        let body = send_json(self.name(), request).await?;
        generated_text(&body).ok_or_else(|| missing_text(self.name(), &body))
    }
}

fn generated_text(body: &Value) -> Option<String> {
    let first = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    first
        .get("generated_text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_list_and_object_replies() {
        let list = json!([{ "generated_text": "[1]" }]);
        let object = json!({ "generated_text": "[2]" });
        assert_eq!(generated_text(&list).as_deref(), Some("[1]"));
        assert_eq!(generated_text(&object).as_deref(), Some("[2]"));
    }

    #[test]
    fn loading_model_reply_has_no_text() {
        let body = json!({ "error": "Model is currently loading", "estimated_time": 20.0 });
        assert!(generated_text(&body).is_none());
        assert!(generated_text(&json!([])).is_none());
    }
}
