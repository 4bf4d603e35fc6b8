//! Error types for drivescout.
//!
//! Most of these never reach the caller: the crawler, the ranking engine and
//! enrichment recover from them locally and log. They exist so that each
//! recovery site can match on what actually went wrong.

use thiserror::Error;

use crate::extract::ExtractError;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// Network failure, timeout, non-2xx status or an unusable success
    /// envelope from a remote call.
    #[error("Transport error ({backend}{}): {message}", status_suffix(.status))]
    Transport {
        backend: String,
        status: Option<u16>,
        message: String,
    },

    /// A ranking reply was received but could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Listing the children of one folder failed mid-crawl.
    #[error("Partial traversal: listing children of {folder_id} failed: {message}")]
    PartialTraversal { folder_id: String, message: String },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScoutError {
    pub fn transport(backend: &str, message: impl Into<String>) -> Self {
        ScoutError::Transport {
            backend: backend.to_string(),
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(backend: &str, status: u16, body: &str) -> Self {
        ScoutError::Transport {
            backend: backend.to_string(),
            status: Some(status),
            message: body.chars().take(500).collect(),
        }
    }

    /// Map a `reqwest` failure onto a transport error for `backend`.
    pub fn from_reqwest(backend: &str, err: reqwest::Error) -> Self {
        ScoutError::Transport {
            backend: backend.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(", HTTP {}", code),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
