//! `scout providers`: every ranking backend, the model it would use, and
//! whether its credential is present in the environment.

use anyhow::Result;

use crate::config::{Config, ProviderKind};
use crate::ranking::credential_present;

/// One row of the `scout providers` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub kind: ProviderKind,
    pub selected: bool,
    pub model: String,
    /// `None` when the provider needs no credential.
    pub credential: Option<bool>,
}

impl ProviderStatus {
    pub fn ready(&self) -> bool {
        self.credential.unwrap_or(true)
    }

    fn credential_label(&self) -> &'static str {
        match self.credential {
            None => "not needed",
            Some(true) => "set",
            Some(false) => "missing",
        }
    }
}

pub fn provider_statuses(config: &Config) -> Vec<ProviderStatus> {
    ProviderKind::ALL
        .iter()
        .map(|&kind| {
            let selected = kind == config.ranking.provider;
            let model = if selected {
                config.ranking.model()
            } else {
                kind.default_model().to_string()
            };
            ProviderStatus {
                kind,
                selected,
                model,
                credential: credential_present(&config.ranking, kind),
            }
        })
        .collect()
}

pub fn list_providers(config: &Config) -> Result<()> {
    println!(
        "{:<2}{:<14} {:<40} {:<12} READY",
        "", "PROVIDER", "MODEL", "CREDENTIAL"
    );
    for status in provider_statuses(config) {
        let marker = if status.selected { "*" } else { "" };
        println!(
            "{:<2}{:<14} {:<40} {:<12} {}",
            marker,
            status.kind.as_str(),
            status.model,
            status.credential_label(),
            status.ready()
        );
    }

    Ok(())
}
