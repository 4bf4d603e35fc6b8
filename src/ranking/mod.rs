//! Relevance ranking over interchangeable LLM backends.
//!
//! A [`RankingBackend`] knows one thing: how to send a prompt to its service
//! and get free-form text back. [`Ranker`] owns the rest of the contract and
//! is identical for every backend:
//!
//! 1. No candidates → no call, empty result.
//! 2. Number the candidates and build one prompt (see [`protocol`]).
//! 3. Send exactly one request.
//! 4. Transport failure → the backend's [`TransportFallback`]: the full
//!    unscored candidate list for hosted APIs, nothing for a local server.
//! 5. Reply received → parse it; an unreadable reply ranks nothing.
//!
//! # Backends
//!
//! | `ranking.provider` | Backend | Transport |
//! |--------------------|---------|-----------|
//! | `gemini` | [`GeminiBackend`] | `models/{model}:generateContent?key=...` |
//! | `gemini_relay` | [`GeminiRelayBackend`] | `POST relay_url` with `{model, body}` |
//! | `ollama` | [`OllamaBackend`] | `POST /api/generate` |
//! | `huggingface` | [`HuggingFaceBackend`] | `POST /models/{model}` with bearer token |
//! | `openai` | [`OpenAiBackend`] | `POST /chat/completions` with bearer token |
//!
//! Use [`create_backend`] to build the backend named in the config, or
//! construct one directly from its own config struct.

pub mod gemini;
pub mod huggingface;
pub mod ollama;
pub mod openai;
pub mod protocol;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{ProviderKind, RankingConfig, TransportFallback};
use crate::error::ScoutError;
use crate::models::Document;

pub use gemini::{GeminiBackend, GeminiConfig, GeminiRelayBackend, GeminiRelayConfig};
pub use huggingface::{HuggingFaceBackend, HuggingFaceConfig};
pub use ollama::{OllamaBackend, OllamaConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use protocol::PromptProfile;

/// Candidate count above which a single prompt is likely to be truncated
/// or refused by the model.
pub const LARGE_CATALOG_WARN: usize = 500;

/// Generation settings shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 200,
        }
    }
}

/// A service that turns a prompt into free-form text.
#[async_trait]
pub trait RankingBackend: Send + Sync {
    /// Backend label used in logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// What [`Ranker::rank`] returns when [`complete`](Self::complete) fails.
    fn transport_fallback(&self) -> TransportFallback;

    /// Send one prompt and return the model's text.
    ///
    /// Every error is a transport-class failure: network, non-2xx, or a
    /// success body that does not carry any text.
    async fn complete(&self, prompt: &str) -> crate::error::Result<String>;
}

/// Ranks candidate documents against a query using a [`RankingBackend`].
pub struct Ranker {
    backend: Box<dyn RankingBackend>,
    profile: PromptProfile,
}

impl Ranker {
    pub fn new(backend: Box<dyn RankingBackend>) -> Self {
        Self {
            backend,
            profile: PromptProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: PromptProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Build the backend named in `[ranking]`, with its prompt profile.
    pub fn from_config(config: &RankingConfig) -> Result<Self> {
        let backend = create_backend(config)?;
        let mut profile = PromptProfile::default();
        if let Some(ref persona) = config.persona {
            profile.persona = persona.clone();
        }
        if let Some(ref hints) = config.hints {
            profile.hints = hints.clone();
        }
        Ok(Self::new(backend).with_profile(profile))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Rank `candidates` against `query`, most relevant first.
    ///
    /// Never fails. Returned documents carry a `relevance_score` unless the
    /// backend was unreachable and fell back to the full candidate list.
    pub async fn rank(&self, query: &str, candidates: &[Document]) -> Vec<Document> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() > LARGE_CATALOG_WARN {
            tracing::warn!(
                candidates = candidates.len(),
                "ranking a large catalog in one prompt; the model may truncate it"
            );
        }

        let listing = protocol::numbered_listing(candidates);
        let prompt = protocol::build_prompt(query, &listing, &self.profile);

        tracing::debug!(
            backend = self.backend.name(),
            candidates = candidates.len(),
            prompt_chars = prompt.len(),
            "sending ranking request"
        );

        match self.backend.complete(&prompt).await {
            Ok(reply) => {
                let ranked = protocol::interpret_reply(&reply, candidates);
                tracing::info!(
                    backend = self.backend.name(),
                    ranked = ranked.len(),
                    "ranking complete"
                );
                ranked
            }
            Err(e) => match self.backend.transport_fallback() {
                TransportFallback::AllCandidates => {
                    tracing::error!(
                        backend = self.backend.name(),
                        error = %e,
                        "ranking backend failed; returning unranked catalog"
                    );
                    candidates.to_vec()
                }
                TransportFallback::Empty => {
                    tracing::error!(
                        backend = self.backend.name(),
                        error = %e,
                        "ranking backend unreachable; returning no results"
                    );
                    Vec::new()
                }
            },
        }
    }
}

/// Create the backend selected by `config.provider`.
///
/// Credentials are read from the environment here, once, and stored in the
/// backend's own config.
///
/// # Errors
///
/// Returns an error if the provider needs a credential that is not set, or
/// if `gemini_relay` is selected without a `relay_url`.
pub fn create_backend(config: &RankingConfig) -> Result<Box<dyn RankingBackend>> {
    let sampling = Sampling {
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
    };
    let timeout = Duration::from_secs(config.timeout_secs);
    let fallback = config.transport_fallback();
    let model = config.model();

    let backend: Box<dyn RankingBackend> = match config.provider {
        ProviderKind::Gemini => Box::new(GeminiBackend::new(
            GeminiConfig {
                base_url: required_base_url(config)?,
                model,
                api_key: required_key(config)?,
                sampling,
                fallback,
            },
            timeout,
        )?),
        ProviderKind::GeminiRelay => {
            let relay_url = match config.relay_url {
                Some(ref url) => url.clone(),
                None => bail!("ranking.relay_url required for gemini_relay provider"),
            };
            Box::new(GeminiRelayBackend::new(
                GeminiRelayConfig {
                    relay_url,
                    model,
                    sampling,
                    fallback,
                },
                timeout,
            )?)
        }
        ProviderKind::Ollama => Box::new(OllamaBackend::new(
            OllamaConfig {
                base_url: required_base_url(config)?,
                model,
                sampling,
                fallback,
            },
            timeout,
        )?),
        ProviderKind::Huggingface => Box::new(HuggingFaceBackend::new(
            HuggingFaceConfig {
                base_url: required_base_url(config)?,
                model,
                token: required_key(config)?,
                sampling,
                fallback,
            },
            timeout,
        )?),
        ProviderKind::Openai => Box::new(OpenAiBackend::new(
            OpenAiConfig {
                base_url: required_base_url(config)?,
                model,
                api_key: required_key(config)?,
                sampling,
                fallback,
            },
            timeout,
        )?),
    };

    Ok(backend)
}

/// Whether the credential for a provider is available in the environment.
pub fn credential_present(config: &RankingConfig, kind: ProviderKind) -> Option<bool> {
    let env = if kind == config.provider {
        config.key_env()
    } else {
        kind.default_key_env().map(str::to_string)
    }?;
    Some(std::env::var(env).is_ok())
}

fn required_base_url(config: &RankingConfig) -> Result<String> {
    match config.base_url() {
        Some(url) => Ok(url),
        None => bail!("ranking.base_url required for {} provider", config.provider),
    }
}

fn required_key(config: &RankingConfig) -> Result<String> {
    let env = match config.key_env() {
        Some(env) => env,
        None => bail!("ranking.api_key_env required for {} provider", config.provider),
    };
    match std::env::var(&env) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => bail!("{} environment variable not set", env),
    }
}

/// Send a JSON request and decode a JSON reply, mapping every failure onto
/// [`ScoutError::Transport`].
pub(crate) async fn send_json(
    backend: &str,
    request: reqwest::RequestBuilder,
) -> crate::error::Result<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| ScoutError::from_reqwest(backend, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ScoutError::http_status(backend, status.as_u16(), &body));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| ScoutError::from_reqwest(backend, e))
}

/// Build the HTTP client used by a backend.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Error for a success body that lacks the expected text field.
pub(crate) fn missing_text(backend: &str, body: &Value) -> ScoutError {
    let shown: String = body.to_string().chars().take(300).collect();
    ScoutError::transport(backend, format!("unexpected response format: {}", shown))
}
