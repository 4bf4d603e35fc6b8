//! TOML configuration.
//!
//! Credentials never live in the file. Each section names the environment
//! variable that holds its secret; the value is read once, when the client or
//! ranking backend is constructed, and carried explicitly from then on.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub drive: DriveConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    pub root_folder_id: String,
    #[serde(default = "default_drive_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_drive_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub catalog_strategy: CatalogStrategy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_drive_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}
fn default_drive_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}
fn default_max_depth() -> usize {
    3
}
fn default_mime_type() -> String {
    "application/pdf".to_string()
}
fn default_page_size() -> usize {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}

/// How the catalog builder queries for documents.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStrategy {
    /// One query scoped to every known folder (`'a' in parents or 'b' in parents ...`).
    #[default]
    ParentSet,
    /// One query per folder, for stores without a parent-set filter.
    PerFolder,
}

/// The interchangeable ranking backends.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    GeminiRelay,
    Ollama,
    Huggingface,
    Openai,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Gemini,
        ProviderKind::GeminiRelay,
        ProviderKind::Ollama,
        ProviderKind::Huggingface,
        ProviderKind::Openai,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::GeminiRelay => "gemini_relay",
            ProviderKind::Ollama => "ollama",
            ProviderKind::Huggingface => "huggingface",
            ProviderKind::Openai => "openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini | ProviderKind::GeminiRelay => "gemini-pro",
            ProviderKind::Ollama => "llama3.1",
            ProviderKind::Huggingface => "mistralai/Mixtral-8x7B-Instruct-v0.1",
            ProviderKind::Openai => "gpt-3.5-turbo",
        }
    }

    /// Base URL used when `ranking.base_url` is not set. The relay has none:
    /// it is addressed through `ranking.relay_url`.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Gemini => Some("https://generativelanguage.googleapis.com/v1"),
            ProviderKind::GeminiRelay => None,
            ProviderKind::Ollama => Some("http://localhost:11434"),
            ProviderKind::Huggingface => Some("https://api-inference.huggingface.co/models"),
            ProviderKind::Openai => Some("https://api.openai.com/v1"),
        }
    }

    /// Environment variable holding the credential, if the backend needs one.
    pub fn default_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::Huggingface => Some("HUGGINGFACE_TOKEN"),
            ProviderKind::Openai => Some("OPENAI_API_KEY"),
            ProviderKind::GeminiRelay | ProviderKind::Ollama => None,
        }
    }

    /// What `rank` returns when the backend cannot be reached.
    ///
    /// Hosted APIs are expected to be up, so an outage degrades to the
    /// unranked catalog. A local server that is not running yields nothing.
    pub fn default_transport_fallback(&self) -> TransportFallback {
        match self {
            ProviderKind::Ollama => TransportFallback::Empty,
            _ => TransportFallback::AllCandidates,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TransportFallback {
    /// Return every candidate, unscored, in catalog order.
    #[serde(rename = "all")]
    AllCandidates,
    /// Return no candidates.
    #[serde(rename = "empty")]
    Empty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_ranking_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub on_transport_error: Option<TransportFallback>,
    /// Replaces the opening line of the ranking prompt.
    #[serde(default)]
    pub persona: Option<String>,
    /// Replaces the domain vocabulary listed in the ranking prompt.
    #[serde(default)]
    pub hints: Option<Vec<String>>,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            relay_url: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_ranking_timeout_secs(),
            on_transport_error: None,
            persona: None,
            hints: None,
        }
    }
}

fn default_temperature() -> f32 {
    0.3
}
fn default_max_output_tokens() -> u32 {
    200
}
fn default_ranking_timeout_secs() -> u64 {
    60
}

impl RankingConfig {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
            .map(|u| u.trim_end_matches('/').to_string())
    }

    pub fn key_env(&self) -> Option<String> {
        self.api_key_env
            .clone()
            .or_else(|| self.provider.default_key_env().map(str::to_string))
    }

    pub fn transport_fallback(&self) -> TransportFallback {
        self.on_transport_error
            .unwrap_or_else(|| self.provider.default_transport_fallback())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: default_top_k(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_preview_chars() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Check the semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.drive.root_folder_id.trim().is_empty() {
            bail!("drive.root_folder_id must not be empty");
        }
        if self.drive.page_size == 0 {
            bail!("drive.page_size must be > 0");
        }
        if self.drive.mime_type.trim().is_empty() {
            bail!("drive.mime_type must not be empty");
        }

        if !(0.0..=2.0).contains(&self.ranking.temperature) {
            bail!("ranking.temperature must be in [0.0, 2.0]");
        }
        if self.ranking.max_output_tokens == 0 {
            bail!("ranking.max_output_tokens must be > 0");
        }
        if self.ranking.provider == ProviderKind::GeminiRelay && self.ranking.relay_url.is_none() {
            bail!("ranking.relay_url must be set when provider is 'gemini_relay'");
        }

        if self.enrichment.enabled {
            if self.enrichment.top_k == 0 {
                bail!("enrichment.top_k must be > 0 when enrichment is enabled");
            }
            if self.enrichment.preview_chars == 0 {
                bail!("enrichment.preview_chars must be > 0 when enrichment is enabled");
            }
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;

    Ok(config)
}
