//! Wire-level tests for the Drive client and every ranking backend.
//!
//! Each test starts a throwaway axum server on `127.0.0.1:0` that records
//! the request and answers with a canned status and JSON body.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drivescout::config::TransportFallback;
use drivescout::drive::{DriveClient, ListFilter, RemoteStore};
use drivescout::error::ScoutError;
use drivescout::models::Document;
use drivescout::ranking::{
    GeminiBackend, GeminiConfig, GeminiRelayBackend, GeminiRelayConfig, HuggingFaceBackend,
    HuggingFaceConfig, OllamaBackend, OllamaConfig, OpenAiBackend, OpenAiConfig, Ranker,
    RankingBackend, Sampling,
};

// ─── Mock server ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Captured {
    method: String,
    uri: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Mock {
    status: StatusCode,
    reply: Value,
    seen: Arc<Mutex<Vec<Captured>>>,
}

async fn record(
    State(mock): State<Mock>,
    method: axum::http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    mock.seen.lock().unwrap().push(Captured {
        method: method.to_string(),
        uri: uri.to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (mock.status, Json(mock.reply.clone()))
}

/// Start a mock that answers every request with `status` and `reply`.
/// Returns its base URL and the request log.
async fn mock_server(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Captured>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mock = Mock {
        status,
        reply,
        seen: seen.clone(),
    };
    let app = Router::new().fallback(record).with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}", addr), seen)
}

/// A URL nothing listens on.
fn dead_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

fn timeout() -> Duration {
    Duration::from_secs(5)
}

fn candidates() -> Vec<Document> {
    ["Vespers.pdf", "Matins.pdf", "Liturgy.pdf"]
        .iter()
        .enumerate()
        .map(|(i, name)| Document {
            id: format!("id{}", i + 1),
            name: name.to_string(),
            folder: "Sunday".into(),
            full_path: format!("Sunday/{}", name),
            view_link: String::new(),
            download_link: String::new(),
            size_bytes: 0,
            modified_at: Utc::now(),
            relevance_score: None,
            excerpt: None,
        })
        .collect()
}

fn gemini_reply(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

// ─── Drive ──────────────────────────────────────────────────────────

#[tokio::test]
async fn drive_list_sends_query_and_parses_files() {
    let (base, seen) = mock_server(
        StatusCode::OK,
        json!({
            "files": [{
                "id": "f1",
                "name": "Akathist.pdf",
                "mimeType": "application/pdf",
                "parents": ["p1"],
                "webViewLink": "https://drive.google.com/file/d/f1/view?usp=drivesdk",
                "size": "4096",
                "modifiedTime": "2024-04-05T08:30:00.000Z"
            }]
        }),
    )
    .await;
    let client = DriveClient::new(&base, Some("drive-key".into()), 1000, timeout()).unwrap();

    let items = client
        .list(&ListFilter::children_of("p1", "application/pdf"))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Akathist.pdf");
    assert_eq!(items[0].size_bytes, Some(4096));
    assert!(items[0].web_view_link.as_deref().unwrap().contains("f1"));

    let seen = seen.lock().unwrap();
    let req = &seen[0];
    assert_eq!(req.method, "GET");
    assert!(req.uri.starts_with("/files?"), "uri: {}", req.uri);
    assert!(req.uri.contains("key=drive-key"));
    assert!(req.uri.contains("pageSize=1000"));
    assert!(req.uri.contains("trashed%3Dfalse"), "uri: {}", req.uri);
}

#[tokio::test]
async fn drive_error_status_is_transport_error() {
    let (base, _) = mock_server(
        StatusCode::FORBIDDEN,
        json!({ "error": { "message": "The caller does not have permission" } }),
    )
    .await;
    let client = DriveClient::new(&base, None, 1000, timeout()).unwrap();

    let err = client
        .list(&ListFilter::subfolders_of("root"))
        .await
        .unwrap_err();

    match err {
        ScoutError::Transport { status, message, .. } => {
            assert_eq!(status, Some(403));
            assert!(message.contains("permission"));
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn drive_get_bytes_returns_body() {
    let (base, seen) = mock_server(StatusCode::OK, json!({ "ok": true })).await;
    let client = DriveClient::new(&base, Some("k".into()), 10, timeout()).unwrap();

    let bytes = client
        .get_bytes(&format!("{}/uc?export=download&id=f1", base))
        .await
        .unwrap();

    assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap()["ok"], true);
    let uri = seen.lock().unwrap()[0].uri.clone();
    assert!(uri.contains("id=f1"));
    assert!(uri.contains("key=k"));
}

// ─── Gemini ─────────────────────────────────────────────────────────

#[tokio::test]
async fn gemini_posts_generate_content_with_key() {
    let (base, seen) = mock_server(StatusCode::OK, gemini_reply("[2, 1]")).await;
    let backend = GeminiBackend::new(
        GeminiConfig {
            base_url: format!("{}/v1", base),
            model: "gemini-pro".into(),
            api_key: "gem-key".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();

    let text = backend.complete("rank these").await.unwrap();
    assert_eq!(text, "[2, 1]");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].uri, "/v1/models/gemini-pro:generateContent?key=gem-key");
    assert_eq!(seen[0].body["contents"][0]["parts"][0]["text"], "rank these");
    assert_eq!(seen[0].body["generationConfig"]["maxOutputTokens"], 200);
}

#[tokio::test]
async fn gemini_server_error_falls_back_to_full_catalog() {
    let (base, _) = mock_server(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "backend exploded" }),
    )
    .await;
    let backend = GeminiBackend::new(
        GeminiConfig {
            base_url: base,
            model: "gemini-pro".into(),
            api_key: "k".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();
    let ranker = Ranker::new(Box::new(backend));

    let docs = candidates();
    let ranked = ranker.rank("vespers", &docs).await;

    assert_eq!(ranked, docs);
}

#[tokio::test]
async fn gemini_envelope_without_text_is_transport_failure() {
    let (base, _) = mock_server(
        StatusCode::OK,
        json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
    )
    .await;
    let backend = GeminiBackend::new(
        GeminiConfig {
            base_url: base,
            model: "gemini-pro".into(),
            api_key: "k".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();

    let err = backend.complete("q").await.unwrap_err();
    assert!(matches!(err, ScoutError::Transport { .. }));

    let ranked = Ranker::new(Box::new(backend)).rank("q", &candidates()).await;
    assert_eq!(ranked.len(), 3);
}

#[tokio::test]
async fn gemini_relay_wraps_model_and_body() {
    let (base, seen) = mock_server(StatusCode::OK, gemini_reply("[3]")).await;
    let backend = GeminiRelayBackend::new(
        GeminiRelayConfig {
            relay_url: format!("{}/api/gemini-proxy", base),
            model: "gemini-pro".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();
    let ranker = Ranker::new(Box::new(backend));

    let ranked = ranker.rank("liturgy", &candidates()).await;
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].name, "Liturgy.pdf");
    assert_eq!(ranked[0].relevance_score, Some(100));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri, "/api/gemini-proxy");
    assert_eq!(seen[0].body["model"], "gemini-pro");
    let prompt = seen[0].body["body"]["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.contains("3. \"Liturgy.pdf\" in folder \"Sunday\""));
    assert!(seen[0].authorization.is_none());
}

// ─── Ollama ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ollama_generate_request_shape() {
    let (base, seen) = mock_server(StatusCode::OK, json!({ "response": "[1, 3]", "done": true })).await;
    let backend = OllamaBackend::new(
        OllamaConfig {
            base_url: base,
            model: "llama3.1".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::Empty,
        },
        timeout(),
    )
    .unwrap();

    assert_eq!(backend.complete("p").await.unwrap(), "[1, 3]");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri, "/api/generate");
    assert_eq!(seen[0].body["model"], "llama3.1");
    assert_eq!(seen[0].body["prompt"], "p");
    assert_eq!(seen[0].body["stream"], false);
    assert_eq!(seen[0].body["options"]["num_predict"], 200);
}

#[tokio::test]
async fn ollama_not_running_returns_nothing() {
    let base = dead_url();
    let backend = OllamaBackend::new(
        OllamaConfig {
            base_url: base.clone(),
            model: "llama3.1".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::Empty,
        },
        timeout(),
    )
    .unwrap();

    let err = backend.complete("p").await.unwrap_err();
    assert!(err.to_string().contains("is Ollama running"), "{}", err);

    let ranked = Ranker::new(Box::new(backend)).rank("q", &candidates()).await;
    assert!(ranked.is_empty());
}

// ─── OpenAI ─────────────────────────────────────────────────────────

#[tokio::test]
async fn openai_chat_completion_with_bearer() {
    let (base, seen) = mock_server(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "role": "assistant", "content": "[2]" } }] }),
    )
    .await;
    let backend = OpenAiBackend::new(
        OpenAiConfig {
            base_url: format!("{}/v1", base),
            model: "gpt-3.5-turbo".into(),
            api_key: "sk-test".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();

    let ranked = Ranker::new(Box::new(backend)).rank("matins", &candidates()).await;
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].name, "Matins.pdf");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri, "/v1/chat/completions");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(seen[0].body["messages"][0]["role"], "system");
    assert_eq!(seen[0].body["messages"][1]["role"], "user");
    assert_eq!(seen[0].body["max_tokens"], 200);
}

#[tokio::test]
async fn openai_prose_reply_ranks_nothing() {
    let (base, _) = mock_server(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "content": "None of these look relevant." } }] }),
    )
    .await;
    let backend = OpenAiBackend::new(
        OpenAiConfig {
            base_url: base,
            model: "gpt-3.5-turbo".into(),
            api_key: "sk-test".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();

    let ranked = Ranker::new(Box::new(backend)).rank("q", &candidates()).await;
    assert!(ranked.is_empty());
}

// ─── Hugging Face ───────────────────────────────────────────────────

#[tokio::test]
async fn huggingface_posts_to_model_path() {
    let (base, seen) = mock_server(
        StatusCode::OK,
        json!([{ "generated_text": " [3, 2, 1]" }]),
    )
    .await;
    let backend = HuggingFaceBackend::new(
        HuggingFaceConfig {
            base_url: format!("{}/models", base),
            model: "mistralai/Mixtral-8x7B-Instruct-v0.1".into(),
            token: "hf-token".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::AllCandidates,
        },
        timeout(),
    )
    .unwrap();

    let ranked = Ranker::new(Box::new(backend)).rank("q", &candidates()).await;
    let scores: Vec<Option<u32>> = ranked.iter().map(|d| d.relevance_score).collect();
    assert_eq!(scores, vec![Some(100), Some(95), Some(90)]);
    assert_eq!(ranked[0].name, "Liturgy.pdf");

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].uri, "/models/mistralai/Mixtral-8x7B-Instruct-v0.1");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer hf-token"));
    assert_eq!(seen[0].body["parameters"]["return_full_text"], false);
    assert_eq!(seen[0].body["parameters"]["max_new_tokens"], 200);
}

#[tokio::test]
async fn huggingface_loading_model_uses_fallback() {
    let (base, _) = mock_server(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "error": "Model is currently loading", "estimated_time": 20.0 }),
    )
    .await;
    let backend = HuggingFaceBackend::new(
        HuggingFaceConfig {
            base_url: base,
            model: "m".into(),
            token: "t".into(),
            sampling: Sampling::default(),
            fallback: TransportFallback::Empty,
        },
        timeout(),
    )
    .unwrap();

    let ranked = Ranker::new(Box::new(backend)).rank("q", &candidates()).await;
    assert!(ranked.is_empty());
}
