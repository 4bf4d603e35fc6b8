//! Remote hierarchical store.
//!
//! [`RemoteStore`] is the seam between the crawler/catalog and whatever holds
//! the documents. [`DriveClient`] implements it over the Google Drive v3 REST
//! API using an API key, which is enough for publicly shared folder trees.
//!
//! # Queries
//!
//! | Purpose | `q` |
//! |---------|-----|
//! | Child folders | `'<id>' in parents and mimeType='application/vnd.google-apps.folder' and trashed=false` |
//! | Documents | `('<a>' in parents or '<b>' in parents) and mimeType='application/pdf' and trashed=false` |
//!
//! # Paging
//!
//! Each call requests a single page of up to `page_size` items. Cursor
//! following is not implemented; when the store reports more pages a warning
//! is logged and the first page is used.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::config::DriveConfig;
use crate::error::{Result, ScoutError};
use crate::models::RemoteItem;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

const BACKEND: &str = "drive";

/// Filter for a single listing call. Trashed items are always excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Items whose parent is any of these ids. Empty means unscoped.
    pub parent_ids: Vec<String>,
    pub mime_type: Option<String>,
}

impl ListFilter {
    pub fn children_of(parent_id: &str, mime_type: &str) -> Self {
        Self {
            parent_ids: vec![parent_id.to_string()],
            mime_type: Some(mime_type.to_string()),
        }
    }

    pub fn subfolders_of(parent_id: &str) -> Self {
        Self::children_of(parent_id, FOLDER_MIME)
    }
}

/// A store that can list items by parent and type.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Whether one `list` call may carry several parent ids.
    ///
    /// Stores that return `false` are only ever called with a single parent.
    fn supports_parent_set(&self) -> bool {
        true
    }

    /// List items matching `filter`. Returns at most one page.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<RemoteItem>>;
}

/// Download link for a Drive file id. Needs no extra round trip.
pub fn download_link(id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={}", id)
}

/// Browser view link for a Drive file id.
pub fn view_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view", id)
}

/// Build the Drive `q` expression for a filter.
pub fn build_query(filter: &ListFilter) -> String {
    let mut clauses = Vec::new();

    match filter.parent_ids.len() {
        0 => {}
        1 => clauses.push(format!("'{}' in parents", escape(&filter.parent_ids[0]))),
        _ => {
            let parents = filter
                .parent_ids
                .iter()
                .map(|id| format!("'{}' in parents", escape(id)))
                .collect::<Vec<_>>()
                .join(" or ");
            clauses.push(format!("({})", parents));
        }
    }

    if let Some(ref mime) = filter.mime_type {
        clauses.push(format!("mimeType='{}'", escape(mime)));
    }
    clauses.push("trashed=false".to_string());

    clauses.join(" and ")
}

/// Escape a literal for a Drive query string.
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Google Drive v3 client.
#[derive(Clone)]
pub struct DriveClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    page_size: usize,
}

impl DriveClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        page_size: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            page_size,
        })
    }

    /// Build a client from `[drive]`, reading the API key from the
    /// configured environment variable.
    ///
    /// A missing key is not an error: unauthenticated requests work against
    /// stores that do not require one (and fail loudly against Drive).
    pub fn from_config(config: &DriveConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        if api_key.is_none() {
            tracing::warn!(
                env = %config.api_key_env,
                "Drive API key not set; requests will be unauthenticated"
            );
        }
        Self::new(
            &config.base_url,
            api_key,
            config.page_size,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// GET a URL with the API key attached, returning the raw body.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let mut req = self.client.get(url);
        if let Some(ref key) = self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ScoutError::from_reqwest(BACKEND, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoutError::http_status(BACKEND, status.as_u16(), &body));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ScoutError::from_reqwest(BACKEND, e))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    web_view_link: Option<String>,
    /// Drive reports sizes as decimal strings.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
}

impl From<DriveFile> for RemoteItem {
    fn from(file: DriveFile) -> Self {
        RemoteItem {
            size_bytes: file.size.as_deref().and_then(|s| s.parse::<u64>().ok()),
            modified_at: file
                .modified_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            parents: file.parents,
            web_view_link: file.web_view_link,
        }
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<RemoteItem>> {
        let query = build_query(filter);
        let page_size = self.page_size.to_string();
        let mut params = vec![
            ("q", query.as_str()),
            (
                "fields",
                "nextPageToken,files(id,name,mimeType,parents,webViewLink,size,modifiedTime)",
            ),
            ("pageSize", page_size.as_str()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("key", key.as_str()));
        }

        tracing::debug!(q = %query, "listing drive files");

        let resp = self
            .client
            .get(format!("{}/files", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| ScoutError::from_reqwest(BACKEND, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoutError::http_status(BACKEND, status.as_u16(), &body));
        }

        let list: FileList = resp
            .json()
            .await
            .map_err(|e| ScoutError::from_reqwest(BACKEND, e))?;

        if list.next_page_token.is_some() {
            tracing::warn!(
                q = %query,
                returned = list.files.len(),
                "drive listing truncated to first page"
            );
        }

        Ok(list.files.into_iter().map(RemoteItem::from).collect())
    }
}
