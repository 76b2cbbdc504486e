use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::json;

use affinity_recs::api::{create_router, AppState};
use affinity_recs::db::InMemoryResponseCache;
use affinity_recs::services::{BackendError, ModelBackend};

/// Replies with a scripted answer or failure and counts calls
struct ScriptedBackend {
    reply: Mutex<Result<String, BackendError>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok(text.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Err(error)),
            calls: AtomicUsize::new(0),
        })
    }

    fn set_reply(&self, text: &str) {
        *self.reply.lock().unwrap() = Ok(text.to_string());
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _model_id: &str,
        _timeout: Duration,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.lock().unwrap().clone()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn create_test_server(backend: Arc<ScriptedBackend>) -> TestServer {
    let state = AppState::new(
        backend,
        Arc::new(InMemoryResponseCache::new()),
        "test-model".to_string(),
        Duration::from_secs(5),
        Duration::from_secs(300),
    );
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn ranked_answer() -> String {
    json!({
        "recommendations": [
            { "id": "D", "score": 0.62, "rationale": "(62% match) Shares the pacing of A." },
            { "id": "C", "score": 0.91, "rationale": "(91% match) Same director as A. Similar tone." },
            { "id": "E", "score": 0.7, "rationale": "(70% match) Close in theme to B." }
        ]
    })
    .to_string()
}

async fn seed_preferences(server: &TestServer) {
    server
        .put("/api/v1/users/u1/preferences/A")
        .json(&json!({ "affinity": "strong" }))
        .await
        .assert_status_ok();
    server
        .put("/api/v1/users/u1/preferences/B")
        .json(&json!({ "affinity": "moderate" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(ScriptedBackend::replying("{}"));
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_upsert_list_and_clear_preference() {
    let server = create_test_server(ScriptedBackend::replying("{}"));

    let response = server
        .put("/api/v1/users/u1/preferences/A")
        .json(&json!({ "affinity": "low" }))
        .await;
    response.assert_status_ok();
    let created: serde_json::Value = response.json();
    assert_eq!(created["item"], "A");
    assert_eq!(created["affinity"], "low");

    // Second upsert of the same item updates in place
    server
        .put("/api/v1/users/u1/preferences/A")
        .json(&json!({ "affinity": "STRONG" }))
        .await
        .assert_status_ok();

    let response = server.get("/api/v1/users/u1/preferences").await;
    response.assert_status_ok();
    let signals: Vec<serde_json::Value> = response.json();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0]["affinity"], "strong");

    server
        .delete("/api/v1/users/u1/preferences/A")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/api/v1/users/u1/preferences/A")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upsert_rejects_unknown_affinity() {
    let server = create_test_server(ScriptedBackend::replying("{}"));
    let response = server
        .put("/api/v1/users/u1/preferences/A")
        .json(&json!({ "affinity": "lukewarm" }))
        .await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_cold_start_returns_empty_without_model_call() {
    let backend = ScriptedBackend::replying(&ranked_answer());
    let server = create_test_server(backend.clone());

    let response = server
        .post("/api/v1/users/nobody/recommendations")
        .json(&json!({ "k": 3, "candidates": ["C", "D"] }))
        .await;
    response.assert_status_ok();
    let records: Vec<serde_json::Value> = response.json();
    assert!(records.is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_recommend_then_top_k() {
    let backend = ScriptedBackend::replying(&ranked_answer());
    let server = create_test_server(backend.clone());
    seed_preferences(&server).await;

    let response = server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 3, "candidates": ["A", "B", "C", "D", "E"] }))
        .await;
    response.assert_status_ok();
    let records: Vec<serde_json::Value> = response.json();
    let items: Vec<&str> = records.iter().filter_map(|r| r["item"].as_str()).collect();
    assert_eq!(items, vec!["C", "E", "D"]);
    assert_eq!(records[0]["model_version"], "test-model");
    assert_eq!(backend.calls(), 1);

    let response = server.get("/api/v1/users/u1/recommendations?k=2").await;
    response.assert_status_ok();
    let top: Vec<serde_json::Value> = response.json();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["item"], "C");
    assert_eq!(top[1]["item"], "E");
    assert!(top[0]["rationale"]
        .as_str()
        .unwrap()
        .starts_with("(91% match) "));

    // Identical request is answered from the response cache
    server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 3, "candidates": ["A", "B", "C", "D", "E"] }))
        .await
        .assert_status_ok();
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_validation_failure_keeps_previous_results() {
    let backend = ScriptedBackend::replying(&ranked_answer());
    let server = create_test_server(backend.clone());
    seed_preferences(&server).await;
    server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 3, "candidates": ["C", "D", "E"] }))
        .await
        .assert_status_ok();

    backend.set_reply(
        &json!({
            "recommendations": [
                { "id": "C", "score": 0.9, "rationale": "(90% match) A strong fit for A." }
            ]
        })
        .to_string(),
    );

    let response = server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 3, "candidates": ["C", "D"] }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("VALIDATION_FAILURE"));
    assert_eq!(backend.calls(), 2);

    let top: Vec<serde_json::Value> = server
        .get("/api/v1/users/u1/recommendations")
        .await
        .json();
    let items: Vec<&str> = top.iter().filter_map(|r| r["item"].as_str()).collect();
    assert_eq!(items, vec!["C", "E", "D"]);
}

#[tokio::test]
async fn test_permanent_outage_maps_to_bad_gateway() {
    let backend = ScriptedBackend::failing(BackendError::Permanent("invalid api key".to_string()));
    let server = create_test_server(backend.clone());
    seed_preferences(&server).await;

    let response = server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 2, "candidates": ["C", "D"] }))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_zero_k_is_rejected() {
    let backend = ScriptedBackend::replying(&ranked_answer());
    let server = create_test_server(backend.clone());
    seed_preferences(&server).await;

    server
        .post("/api/v1/users/u1/recommendations")
        .json(&json!({ "k": 0, "candidates": ["C"] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/api/v1/users/u1/recommendations?k=0")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(ScriptedBackend::replying("{}"));
    let id = "6f1c3e0a-8d4b-4b1e-9a57-2f3c9d1e7b42";

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;
    assert_eq!(response.headers().get("x-request-id").unwrap(), id);

    let response = server.get("/health").await;
    let generated = response.headers().get("x-request-id").unwrap();
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());
}
