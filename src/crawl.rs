//! Folder index builder.
//!
//! Breadth-first, depth-bounded walk of the folder tree under a root. The
//! result is a flat [`FolderIndex`] of folder id → materialized path.
//!
//! Folders at exactly `max_depth` are recorded but never expanded, so the
//! number of listing calls is bounded by the tree shape above that depth.
//! A folder id that shows up twice (duplicate parent references, cycles) is
//! kept at its first BFS position and not walked again.
//!
//! Listing calls run one at a time. A failed call is logged and treated as
//! "no children"; the walk continues with the rest of the queue. The
//! [`CrawlReport`] counts those failures so callers can tell a complete
//! index from a partial one.

use std::collections::VecDeque;

use crate::config::Config;
use crate::drive::{DriveClient, ListFilter, RemoteStore};
use crate::error::ScoutError;
use crate::models::{join_path, FolderIndex, FolderNode};

/// A finished crawl and how many folder listings failed along the way.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub index: FolderIndex,
    pub failed_listings: usize,
}

impl CrawlReport {
    /// True when every folder that was due for expansion got listed.
    pub fn is_complete(&self) -> bool {
        self.failed_listings == 0
    }
}

/// Crawl the folder tree under `root_id` down to `max_depth` hops.
pub async fn build_folder_index(
    store: &dyn RemoteStore,
    root_id: &str,
    max_depth: usize,
) -> FolderIndex {
    crawl_folders(store, root_id, max_depth).await.index
}

/// Like [`build_folder_index`], but also reports failed listings.
pub async fn crawl_folders(
    store: &dyn RemoteStore,
    root_id: &str,
    max_depth: usize,
) -> CrawlReport {
    let mut index = FolderIndex::with_root(root_id);
    let mut queue: VecDeque<FolderNode> = index.iter().cloned().collect();
    let mut failures = 0usize;

    while let Some(current) = queue.pop_front() {
        if current.depth >= max_depth {
            continue;
        }

        let children = match store.list(&ListFilter::subfolders_of(&current.id)).await {
            Ok(children) => children,
            Err(e) => {
                let err = ScoutError::PartialTraversal {
                    folder_id: current.id.clone(),
                    message: e.to_string(),
                };
                tracing::warn!(folder_id = %current.id, error = %err, "skipping folder");
                failures += 1;
                continue;
            }
        };

        for child in children {
            let node = FolderNode {
                path: join_path(&current.path, &child.name),
                id: child.id,
                depth: current.depth + 1,
            };
            if index.insert(node.clone()) {
                queue.push_back(node);
            } else {
                tracing::debug!(folder_id = %node.id, "folder already indexed");
            }
        }
    }

    tracing::info!(
        folders = index.len(),
        failed_listings = failures,
        max_depth,
        store = store.name(),
        "folder crawl finished"
    );

    CrawlReport {
        index,
        failed_listings: failures,
    }
}

/// `scout crawl`: print the folder index.
pub async fn run_crawl(config: &Config) -> anyhow::Result<()> {
    let drive = DriveClient::from_config(&config.drive)?;
    let report =
        crawl_folders(&drive, &config.drive.root_folder_id, config.drive.max_depth).await;

    println!("{:<6} {:<36} PATH", "DEPTH", "FOLDER_ID");
    for node in report.index.iter() {
        println!("{:<6} {:<36} {}", node.depth, node.id, node.display_path());
    }
    println!();
    if report.is_complete() {
        println!("{} folder(s)", report.index.len());
    } else {
        println!(
            "{} folder(s), {} listing(s) failed",
            report.index.len(),
            report.failed_listings
        );
    }

    Ok(())
}
