//! Core data models used throughout drivescout.
//!
//! These types represent the folder tree discovered by the crawler, the raw
//! items returned by the remote store, and the documents that flow through
//! ranking and enrichment.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Display label for documents that live directly in the root folder, or
/// whose parent could not be resolved against the folder index.
pub const ROOT_LABEL: &str = "Root";

/// A folder discovered during a crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderNode {
    /// Opaque remote identifier.
    pub id: String,
    /// `/`-joined names from the root. Empty for the root itself.
    pub path: String,
    /// Hops from the root. The root has depth 0.
    pub depth: usize,
}

impl FolderNode {
    /// Path shown to users: the root sentinel for the root, else `path`.
    pub fn display_path(&self) -> &str {
        if self.path.is_empty() {
            ROOT_LABEL
        } else {
            &self.path
        }
    }
}

/// Join a parent folder path with a child name.
///
/// The root has an empty path, so its children are addressed by bare name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Flat lookup table of folder id → [`FolderNode`], built once per crawl.
///
/// Insertion order is BFS order. Ids are unique: a second insert with a
/// known id is ignored.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderIndex {
    nodes: Vec<FolderNode>,
    #[serde(skip)]
    by_id: HashMap<String, usize>,
}

impl FolderIndex {
    /// Create an index holding only the root node.
    pub fn with_root(root_id: &str) -> Self {
        let mut index = Self::default();
        index.insert(FolderNode {
            id: root_id.to_string(),
            path: String::new(),
            depth: 0,
        });
        index
    }

    /// Insert a node. Returns `false` if the id was already present.
    pub fn insert(&mut self, node: FolderNode) -> bool {
        if self.by_id.contains_key(&node.id) {
            return false;
        }
        self.by_id.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn get(&self, id: &str) -> Option<&FolderNode> {
        self.by_id.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Materialized path for a folder id, if known.
    pub fn path_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|n| n.path.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Raw item metadata as returned by the remote store.
#[derive(Debug, Clone, Default)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub web_view_link: Option<String>,
    pub size_bytes: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// A candidate document, stitched to its folder path.
///
/// `relevance_score` is set by the ranking engine and `excerpt` by
/// enrichment; both are absent straight out of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// Folder path, or [`ROOT_LABEL`].
    pub folder: String,
    pub full_path: String,
    pub view_link: String,
    pub download_link: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}
