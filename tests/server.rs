//! HTTP API tests: `/health`, `/search`, and the error contract.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use drivescout::config::{CatalogStrategy, TransportFallback};
use drivescout::drive::{ListFilter, RemoteStore, FOLDER_MIME};
use drivescout::error::{Result, ScoutError};
use drivescout::extract::MIME_PDF;
use drivescout::models::RemoteItem;
use drivescout::ranking::{Ranker, RankingBackend};
use drivescout::search::{CrawlSettings, SearchEngine};
use drivescout::server::router;

struct TreeStore {
    items: Vec<RemoteItem>,
    failing: HashSet<String>,
}

#[async_trait]
impl RemoteStore for TreeStore {
    fn name(&self) -> &str {
        "tree"
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<RemoteItem>> {
        if filter.parent_ids.iter().any(|p| self.failing.contains(p)) {
            return Err(ScoutError::http_status("tree", 500, "backend error"));
        }
        Ok(self
            .items
            .iter()
            .filter(|i| i.parents.iter().any(|p| filter.parent_ids.contains(p)))
            .filter(|i| filter.mime_type.as_deref() == Some(i.mime_type.as_str()))
            .cloned()
            .collect())
    }
}

fn item(id: &str, name: &str, mime: &str, parent: &str) -> RemoteItem {
    RemoteItem {
        id: id.into(),
        name: name.into(),
        mime_type: mime.into(),
        parents: vec![parent.into()],
        size_bytes: Some(2048),
        modified_at: Some(Utc::now()),
        ..Default::default()
    }
}

struct Fixed(&'static str);

#[async_trait]
impl RankingBackend for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn transport_fallback(&self) -> TransportFallback {
        TransportFallback::AllCandidates
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Serve an engine over a tree whose document listing may fail.
async fn start(failing: &[&str]) -> String {
    let store = TreeStore {
        items: vec![
            item("nat", "Nativity", FOLDER_MIME, "root"),
            item("d1", "Royal Hours.pdf", MIME_PDF, "nat"),
            item("d2", "Kontakion.pdf", MIME_PDF, "root"),
        ],
        failing: failing.iter().map(|s| s.to_string()).collect(),
    };
    let engine = SearchEngine::new(
        Arc::new(store),
        Ranker::new(Box::new(Fixed("[2, 1]"))),
        CrawlSettings {
            root_folder_id: "root".into(),
            max_depth: 3,
            mime_type: MIME_PDF.into(),
            strategy: CatalogStrategy::ParentSet,
        },
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(engine));
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn health_reports_version() {
    let base = start(&[]).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn search_returns_ranked_documents() {
    let base = start(&[]).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({ "query": "nativity hours" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total_found"], 2);
    assert!(body["search_time_ms"].is_u64());

    let docs = body["documents"].as_array().unwrap();
    // Catalog order is [Royal Hours, Kontakion]; the reply flips it.
    assert_eq!(docs[0]["name"], "Kontakion.pdf");
    assert_eq!(docs[0]["folder"], "Root");
    assert_eq!(docs[0]["full_path"], "Kontakion.pdf");
    assert_eq!(docs[0]["relevance_score"], 100);
    assert_eq!(docs[1]["full_path"], "Nativity/Royal Hours.pdf");
    assert_eq!(docs[1]["relevance_score"], 95);
    assert!(docs[0].get("excerpt").is_none());
}

#[tokio::test]
async fn search_honours_limit() {
    let base = start(&[]).await;
    let body: Value = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({ "query": "anything", "limit": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_found"], 2);
}

#[tokio::test]
async fn empty_query_is_bad_request() {
    let base = start(&[]).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({ "query": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["message"], "query must not be empty");
}

#[tokio::test]
async fn catalog_failure_is_internal_error() {
    let base = start(&["nat"]).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "internal");
    assert!(body["error"]["message"].as_str().unwrap().contains("folder"));
}
