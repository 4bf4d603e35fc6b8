//! Document catalog builder.
//!
//! Lists every item of the target MIME type whose parent folder is in the
//! [`FolderIndex`], and stitches each one to its folder path.
//!
//! Two query strategies:
//!
//! - **Parent set**: one query scoped to every indexed folder. Used whenever
//!   the store accepts multiple parents per call. A failure here fails the
//!   catalog: there is nothing partial to return.
//! - **Per folder**: one query per indexed folder. Used when configured, or
//!   when the store only supports single-parent filters. A failed folder is
//!   logged and skipped.
//!
//! Items whose parent cannot be resolved are kept under [`ROOT_LABEL`].

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::config::{CatalogStrategy, Config};
use crate::crawl::build_folder_index;
use crate::drive::{self, DriveClient, ListFilter, RemoteStore};
use crate::models::{join_path, Document, FolderIndex, RemoteItem, ROOT_LABEL};

pub async fn build_catalog(
    store: &dyn RemoteStore,
    index: &FolderIndex,
    mime_type: &str,
    strategy: CatalogStrategy,
) -> Result<Vec<Document>> {
    let strategy = if strategy == CatalogStrategy::ParentSet && !store.supports_parent_set() {
        tracing::debug!(
            store = store.name(),
            "store lacks parent-set filter, listing per folder"
        );
        CatalogStrategy::PerFolder
    } else {
        strategy
    };

    let items = match strategy {
        CatalogStrategy::ParentSet => {
            let filter = ListFilter {
                parent_ids: index.ids().map(str::to_string).collect(),
                mime_type: Some(mime_type.to_string()),
            };
            store.list(&filter).await.with_context(|| {
                format!("Failed to list documents across {} folder(s)", index.len())
            })?
        }
        CatalogStrategy::PerFolder => {
            let mut items = Vec::new();
            for folder_id in index.ids() {
                match store.list(&ListFilter::children_of(folder_id, mime_type)).await {
                    Ok(batch) => items.extend(batch),
                    Err(e) => {
                        tracing::warn!(folder_id, error = %e, "skipping folder in catalog");
                    }
                }
            }
            items
        }
    };

    let mut seen = HashSet::new();
    let documents: Vec<Document> = items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .map(|item| to_document(item, index))
        .collect();

    tracing::info!(documents = documents.len(), mime_type, "catalog built");

    Ok(documents)
}

/// Materialized path of an item's first parent; empty at the root or when
/// the parent is not indexed.
fn folder_path<'a>(item: &RemoteItem, index: &'a FolderIndex) -> &'a str {
    item.parents
        .first()
        .and_then(|p| index.path_of(p))
        .unwrap_or("")
}

/// Resolve the folder label for an item's first parent.
pub fn folder_label(item: &RemoteItem, index: &FolderIndex) -> String {
    match folder_path(item, index) {
        "" => ROOT_LABEL.to_string(),
        path => path.to_string(),
    }
}

fn to_document(item: RemoteItem, index: &FolderIndex) -> Document {
    let full_path = join_path(folder_path(&item, index), &item.name);
    let folder = folder_label(&item, index);
    Document {
        full_path,
        view_link: item
            .web_view_link
            .unwrap_or_else(|| drive::view_link(&item.id)),
        download_link: drive::download_link(&item.id),
        size_bytes: item.size_bytes.unwrap_or(0),
        modified_at: item.modified_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        relevance_score: None,
        excerpt: None,
        folder,
        id: item.id,
        name: item.name,
    }
}

/// `scout catalog`: crawl, then print every candidate document.
pub async fn run_catalog(config: &Config) -> Result<()> {
    let drive = DriveClient::from_config(&config.drive)?;
    let index =
        build_folder_index(&drive, &config.drive.root_folder_id, config.drive.max_depth).await;
    let documents = build_catalog(
        &drive,
        &index,
        &config.drive.mime_type,
        config.drive.catalog_strategy,
    )
    .await?;

    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!("{:<32} {:<40} {:>10}  MODIFIED", "FOLDER", "NAME", "SIZE");
    for doc in &documents {
        println!(
            "{:<32} {:<40} {:>10}  {}",
            doc.folder,
            doc.name,
            doc.size_bytes,
            doc.modified_at.format("%Y-%m-%d")
        );
    }
    println!();
    println!("{} document(s) in {} folder(s)", documents.len(), index.len());

    Ok(())
}
