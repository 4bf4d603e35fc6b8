//! End-to-end search: crawl → catalog → rank → (optionally) enrich.
//!
//! [`SearchEngine`] owns the store, the ranker and the enricher. The folder
//! index is built on first use and reused for the engine's lifetime once a
//! crawl finishes with no failed listings. A partial crawl serves the search
//! that ran it and the next search crawls again. The catalog is fetched
//! fresh for every search.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::catalog::build_catalog;
use crate::config::{CatalogStrategy, Config};
use crate::crawl::crawl_folders;
use crate::drive::{DriveClient, RemoteStore};
use crate::enrich::Enricher;
use crate::models::{Document, FolderIndex};
use crate::ranking::Ranker;

/// Where and what to crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub root_folder_id: String,
    pub max_depth: usize,
    pub mime_type: String,
    pub strategy: CatalogStrategy,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Override the configured enrichment default.
    pub enrich: Option<bool>,
    /// Keep at most this many ranked results.
    pub limit: Option<usize>,
}

/// Ranked documents plus bookkeeping for display.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub documents: Vec<Document>,
    pub total_found: usize,
    pub search_time_ms: u128,
}

impl SearchResponse {
    fn empty(elapsed: Duration) -> Self {
        Self {
            documents: Vec::new(),
            total_found: 0,
            search_time_ms: elapsed.as_millis(),
        }
    }
}

pub struct SearchEngine {
    store: Arc<dyn RemoteStore>,
    ranker: Ranker,
    enricher: Option<Enricher>,
    enrich_by_default: bool,
    settings: CrawlSettings,
    folders: OnceCell<Arc<FolderIndex>>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn RemoteStore>, ranker: Ranker, settings: CrawlSettings) -> Self {
        Self {
            store,
            ranker,
            enricher: None,
            enrich_by_default: false,
            settings,
            folders: OnceCell::new(),
        }
    }

    /// Attach an enricher. `by_default` decides whether searches enrich
    /// when the caller does not say.
    pub fn with_enricher(mut self, enricher: Enricher, by_default: bool) -> Self {
        self.enricher = Some(enricher);
        self.enrich_by_default = by_default;
        self
    }

    /// Wire up Drive, the configured ranking backend and enrichment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let drive = Arc::new(DriveClient::from_config(&config.drive)?);
        let ranker = Ranker::from_config(&config.ranking)
            .with_context(|| format!("Failed to set up '{}' ranking", config.ranking.provider))?;
        let enricher = Enricher::from_config(&config.enrichment, drive.clone(), &config.drive.mime_type);

        let settings = CrawlSettings {
            root_folder_id: config.drive.root_folder_id.clone(),
            max_depth: config.drive.max_depth,
            mime_type: config.drive.mime_type.clone(),
            strategy: config.drive.catalog_strategy,
        };

        Ok(Self::new(drive, ranker, settings).with_enricher(enricher, config.enrichment.enabled))
    }

    pub fn ranker(&self) -> &Ranker {
        &self.ranker
    }

    /// The folder index. Crawls until one crawl completes cleanly, then
    /// keeps that one.
    pub async fn folder_index(&self) -> Arc<FolderIndex> {
        if let Some(index) = self.folders.get() {
            return index.clone();
        }

        let report = crawl_folders(
            self.store.as_ref(),
            &self.settings.root_folder_id,
            self.settings.max_depth,
        )
        .await;
        let complete = report.is_complete();
        let index = Arc::new(report.index);

        if complete {
            // Fails only when a concurrent search cached first.
            let _ = self.folders.set(index.clone());
        } else {
            tracing::warn!(
                failed_listings = report.failed_listings,
                folders = index.len(),
                "partial folder crawl, not caching"
            );
        }
        index
    }

    /// Every candidate document under the root.
    pub async fn catalog(&self) -> Result<Vec<Document>> {
        let index = self.folder_index().await;
        build_catalog(
            self.store.as_ref(),
            &index,
            &self.settings.mime_type,
            self.settings.strategy,
        )
        .await
    }

    /// Run one search.
    ///
    /// # Errors
    ///
    /// Only when the catalog cannot be fetched at all. Ranking and
    /// enrichment failures degrade inside the pipeline.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResponse> {
        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResponse::empty(started.elapsed()));
        }

        let candidates = self.catalog().await?;
        if candidates.is_empty() {
            tracing::info!("no candidate documents found");
            return Ok(SearchResponse::empty(started.elapsed()));
        }

        let mut ranked = self.ranker.rank(query, &candidates).await;
        let total_found = ranked.len();
        if let Some(limit) = options.limit {
            ranked.truncate(limit);
        }

        if options.enrich.unwrap_or(self.enrich_by_default) {
            match self.enricher {
                Some(ref enricher) => {
                    enricher.enrich(&mut ranked).await;
                }
                None => tracing::warn!("enrichment requested but no enricher configured"),
            }
        }

        Ok(SearchResponse {
            documents: ranked,
            total_found,
            search_time_ms: started.elapsed().as_millis(),
        })
    }
}

/// `scout search`: run the pipeline once and print the results.
pub async fn run_search(
    config: &Config,
    query: &str,
    enrich: bool,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let engine = SearchEngine::from_config(config)?;
    let options = SearchOptions {
        enrich: if enrich { Some(true) } else { None },
        limit,
    };
    let response = engine
        .search(query, options)
        .await
        .context("search failed, check configuration")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    if response.documents.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, doc) in response.documents.iter().enumerate() {
        let score = doc
            .relevance_score
            .map(|s| format!("{:>3}", s))
            .unwrap_or_else(|| "  -".to_string());
        println!("{:>3}. [{}] {}", i + 1, score, doc.full_path);
        println!("       {}", doc.view_link);
        if let Some(ref excerpt) = doc.excerpt {
            println!("       {}", excerpt);
        }
    }
    println!();
    println!(
        "{} result(s) of {} ranked in {} ms via {}",
        response.documents.len(),
        response.total_found,
        response.search_time_ms,
        engine.ranker().backend_name()
    );

    Ok(())
}
