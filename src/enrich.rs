//! Content enrichment for top-ranked results.
//!
//! Downloads the first `top_k` documents of a ranking, extracts a short text
//! preview from each, and stores it in [`Document::excerpt`]. Downloads run
//! concurrently; each one touches only its own document. A failed download or
//! extraction is logged and leaves that document's excerpt unset.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

use crate::config::EnrichmentConfig;
use crate::drive::DriveClient;
use crate::error::{Result, ScoutError};
use crate::extract::{self, ExtractError};
use crate::models::Document;

/// Fetches the raw bytes of a document.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, doc: &Document) -> Result<Vec<u8>>;
}

#[async_trait]
impl ContentSource for DriveClient {
    async fn fetch(&self, doc: &Document) -> Result<Vec<u8>> {
        self.get_bytes(&doc.download_link).await
    }
}

/// Turns document bytes into a bounded text preview.
///
/// Called on a blocking thread; implementations may be CPU-heavy.
pub trait PreviewExtractor: Send + Sync {
    fn preview(&self, bytes: &[u8], max_chars: usize) -> std::result::Result<String, ExtractError>;
}

/// Extracts previews for a single content type via [`extract::extract_preview`].
pub struct MimePreviewExtractor {
    content_type: String,
}

impl MimePreviewExtractor {
    pub fn new(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
        }
    }
}

impl PreviewExtractor for MimePreviewExtractor {
    fn preview(&self, bytes: &[u8], max_chars: usize) -> std::result::Result<String, ExtractError> {
        extract::extract_preview(bytes, &self.content_type, max_chars)
    }
}

pub struct Enricher {
    source: Arc<dyn ContentSource>,
    extractor: Arc<dyn PreviewExtractor>,
    top_k: usize,
    preview_chars: usize,
}

impl Enricher {
    pub fn new(
        source: Arc<dyn ContentSource>,
        extractor: Arc<dyn PreviewExtractor>,
        top_k: usize,
        preview_chars: usize,
    ) -> Self {
        Self {
            source,
            extractor,
            top_k,
            preview_chars,
        }
    }

    pub fn from_config(
        config: &EnrichmentConfig,
        source: Arc<dyn ContentSource>,
        content_type: &str,
    ) -> Self {
        Self::new(
            source,
            Arc::new(MimePreviewExtractor::new(content_type)),
            config.top_k,
            config.preview_chars,
        )
    }

    /// Attach previews to the first `top_k` documents. Returns how many
    /// documents received one.
    pub async fn enrich(&self, docs: &mut [Document]) -> usize {
        let k = self.top_k.min(docs.len());
        let outcomes = join_all(docs[..k].iter_mut().map(|doc| self.enrich_one(doc))).await;
        let enriched = outcomes.into_iter().filter(|ok| *ok).count();

        tracing::info!(attempted = k, enriched, "enrichment finished");
        enriched
    }

    async fn enrich_one(&self, doc: &mut Document) -> bool {
        match self.preview_for(doc).await {
            Ok(preview) => {
                doc.excerpt = Some(preview);
                true
            }
            Err(e) => {
                tracing::warn!(document = %doc.name, error = %e, "failed to extract preview");
                false
            }
        }
    }

    async fn preview_for(&self, doc: &Document) -> Result<String> {
        let bytes = self.source.fetch(doc).await?;
        let extractor = Arc::clone(&self.extractor);
        let max_chars = self.preview_chars;

        let preview = tokio::task::spawn_blocking(move || extractor.preview(&bytes, max_chars))
            .await
            .map_err(|e| ScoutError::Extract(ExtractError::Aborted(e.to_string())))??;

        Ok(preview)
    }
}
