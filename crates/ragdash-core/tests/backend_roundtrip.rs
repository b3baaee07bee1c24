use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ragdash_core::chat::{self, ChatSession};
use ragdash_core::{
    ApiError, BackendClient, ChatRole, ConversationStore, Fetch, PipelineConfig, Remote,
    TRANSPORT_FAILURE,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct MockState {
    chat_bodies: Arc<Mutex<Vec<Value>>>,
    config_bodies: Arc<Mutex<Vec<Value>>>,
}

/// Replies depend on the message text so one server covers every outcome
async fn chat_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    state.chat_bodies.lock().expect("chat bodies lock").push(body.clone());
    let message = body["message"].as_str().unwrap_or_default().to_string();

    match message.as_str() {
        "reject" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"status": "error", "message": "not found"})),
        )
            .into_response(),
        "garbage" => (StatusCode::OK, "<html>upstream proxy error</html>").into_response(),
        "no page" => Json(json!({
            "status": "success",
            "response": {"text": "Answer", "sources": [{"file_source": "b.pdf"}]}
        }))
        .into_response(),
        "ok status" => Json(json!({"status": "ok", "response": {"text": "Answer"}})).into_response(),
        "bare error" => (StatusCode::BAD_REQUEST, Json(json!({"status": "error"}))).into_response(),
        "array" => Json(json!([])).into_response(),
        "odd sources" => Json(json!({
            "status": "success",
            "response": {"text": "Answer", "sources": ["a.pdf", {"file_source": "b.pdf"}]}
        }))
        .into_response(),
        "null text" => Json(json!({"status": "success", "response": {"text": null, "sources": []}})).into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(400)).await;
            Json(json!({"status": "success", "response": {"text": "Late answer"}})).into_response()
        }
        _ => Json(json!({
            "status": "success",
            "response": {
                "text": "Answer",
                "sources": [{"file_source": "a.pdf", "page_num": 3, "distance": 0.12}],
                "usage": {"input": 120, "output": 30, "total": 150, "processing_time": 1.5}
            }
        }))
        .into_response(),
    }
}

async fn status_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "library": {"library_name": "rag_assistant_v1", "documents": 4},
        "config": {"embedding_model": "mini-lm-sbert", "vector_db": "sqlite", "llm_model": "bling-phi-3-gguf"}
    }))
}

async fn clusters_handler() -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": {"clusters": [
            {"id": 0, "count": 12, "sample_text": "quarterly revenue grew", "top_source": "q3.pdf"},
            {"id": 1, "count": 5, "sample_text": "headcount plan", "top_source": "hr.docx"}
        ]}
    }))
}

async fn sentiment_handler() -> Json<Value> {
    Json(json!({"status": "success", "data": {"positive": 6, "neutral": 3, "negative": 1}}))
}

async fn timeseries_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "error", "message": "no dates extracted"})),
    )
}

async fn ingest_handler(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    match body["path"].as_str() {
        Some(path) if !path.is_empty() => (
            StatusCode::OK,
            Json(json!({"status": "success", "stats": {"docs_added": 2}})),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "Path is required"})),
        ),
    }
}

async fn config_handler(State(state): State<MockState>, Json(body): Json<Value>) -> Json<Value> {
    state.config_bodies.lock().expect("config bodies lock").push(body.clone());
    Json(json!({"status": "success", "config": body}))
}

async fn spawn_mock_backend() -> (BackendClient, MockState) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/status", get(status_handler))
        .route("/api/analytics/clusters", get(clusters_handler))
        .route("/api/analytics/sentiment", get(sentiment_handler))
        .route("/api/analytics/timeseries", get(timeseries_handler))
        .route("/api/ingest", post(ingest_handler))
        .route("/api/config", post(config_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("run mock backend");
    });

    (BackendClient::new(&format!("http://{address}")), state)
}

/// A client pointed at a port nothing listens on
async fn unreachable_client() -> BackendClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind probe listener");
    let address = listener.local_addr().expect("probe local addr");
    drop(listener);
    BackendClient::new(&format!("http://{address}"))
}

#[tokio::test]
async fn submit_success_appends_answer_with_citations() {
    let (client, _) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();
    let mut input = "What changed in Q3?".to_string();

    assert!(chat::submit(&mut store, &client, &mut input, false).await);

    assert!(input.is_empty());
    assert!(!store.is_pending());
    assert_eq!(store.len(), 2);
    let answer = &store.messages()[1];
    assert_eq!(answer.role, ChatRole::Assistant);
    assert_eq!(answer.content, "Answer");
    let lines: Vec<String> = answer.citations().iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["a.pdf (p. 3)"]);
}

#[tokio::test]
async fn missing_page_number_renders_page_one() {
    let (client, _) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();
    let mut input = "no page".to_string();

    chat::submit(&mut store, &client, &mut input, false).await;
    assert_eq!(store.messages()[1].citations()[0].to_string(), "b.pdf (p. 1)");
}

#[tokio::test]
async fn rejection_is_shown_verbatim_despite_http_500() {
    let (client, _) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();
    let mut input = "reject".to_string();

    chat::submit(&mut store, &client, &mut input, false).await;
    assert_eq!(store.len(), 2);
    assert_eq!(store.messages()[1].content, "Error: not found");
    assert!(!store.is_pending());
}

#[tokio::test]
async fn non_json_body_is_a_transport_failure() {
    let (client, _) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();
    let mut input = "garbage".to_string();

    chat::submit(&mut store, &client, &mut input, false).await;
    assert_eq!(store.messages()[1].content, TRANSPORT_FAILURE);
    assert!(!store.is_pending());
}

async fn reply_to(client: &BackendClient, text: &str) -> String {
    let mut store = ConversationStore::new();
    let mut input = text.to_string();
    assert!(chat::submit(&mut store, client, &mut input, false).await);
    assert_eq!(store.len(), 2);
    assert!(!store.is_pending());
    store.messages()[1].content.clone()
}

#[tokio::test]
async fn chat_accepts_only_success_status() {
    let (client, _) = spawn_mock_backend().await;
    assert_eq!(reply_to(&client, "ok status").await, "Error: unknown error");
}

#[tokio::test]
async fn rejection_without_message_reads_unknown_error() {
    let (client, _) = spawn_mock_backend().await;
    assert_eq!(reply_to(&client, "bare error").await, "Error: unknown error");
}

#[tokio::test]
async fn non_object_json_is_a_transport_failure() {
    let (client, _) = spawn_mock_backend().await;
    assert_eq!(reply_to(&client, "array").await, TRANSPORT_FAILURE);
}

#[tokio::test]
async fn loose_reply_fields_keep_the_answer() {
    let (client, _) = spawn_mock_backend().await;

    let mut store = ConversationStore::new();
    let mut input = "odd sources".to_string();
    chat::submit(&mut store, &client, &mut input, false).await;
    let answer = &store.messages()[1];
    assert_eq!(answer.content, "Answer");
    let cited: Vec<String> = answer.citations().iter().map(ToString::to_string).collect();
    assert_eq!(cited, vec!["b.pdf (p. 1)"]);

    assert_eq!(reply_to(&client, "null text").await, "");
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let client = unreachable_client().await;
    let mut store = ConversationStore::new();
    let mut input = "hello".to_string();

    assert!(chat::submit(&mut store, &client, &mut input, false).await);
    assert_eq!(store.len(), 2);
    assert_eq!(store.messages()[1].content, "Failed to connect to backend.");
    assert!(!store.is_pending());
}

#[tokio::test]
async fn blank_input_issues_no_request() {
    let (client, state) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();
    let mut input = "   ".to_string();

    assert!(!chat::submit(&mut store, &client, &mut input, false).await);
    assert!(store.is_empty());
    assert!(state.chat_bodies.lock().unwrap().is_empty());
}

#[tokio::test]
async fn history_sent_excludes_the_current_turn() {
    let (client, state) = spawn_mock_backend().await;
    let mut store = ConversationStore::new();

    let mut input = "first".to_string();
    chat::submit(&mut store, &client, &mut input, false).await;
    let mut input = "second".to_string();
    chat::submit(&mut store, &client, &mut input, true).await;

    assert_eq!(store.len(), 4);
    let bodies = state.chat_bodies.lock().unwrap();
    assert_eq!(bodies.len(), 2);

    assert_eq!(bodies[0]["message"], "first");
    assert_eq!(bodies[0]["history"], json!([]));
    assert!(bodies[0].get("use_hyde").is_none());

    assert_eq!(bodies[1]["message"], "second");
    let history = bodies[1]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], json!({"role": "user", "content": "first"}));
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["sources"][0]["file_source"], "a.pdf");
    assert_eq!(bodies[1]["use_hyde"], true);
}

#[tokio::test]
async fn session_pending_only_while_in_flight() {
    let (client, _) = spawn_mock_backend().await;
    let mut session = ChatSession::new(client, false);
    assert!(!session.is_pending());

    let mut input = "slow".to_string();
    assert!(session.submit(&mut input));
    assert!(session.is_pending());
    assert_eq!(session.store().len(), 1);
    assert_eq!(session.store().submit_label(), "Thinking…");

    // A second submission while pending is refused
    let mut again = "another".to_string();
    assert!(!session.submit(&mut again));
    assert!(!session.poll().await);

    session.wait().await;
    assert!(!session.is_pending());
    assert_eq!(session.store().len(), 2);
    assert_eq!(session.store().messages()[1].content, "Late answer");
    assert_eq!(session.store().submit_label(), "Send");
}

#[tokio::test]
async fn timeout_counts_as_transport_failure() {
    let (client, _) = spawn_mock_backend().await;
    let client = BackendClient::with_timeout(client.base_url(), Some(Duration::from_millis(50)))
        .expect("build client with timeout");
    let mut store = ConversationStore::new();
    let mut input = "slow".to_string();

    chat::submit(&mut store, &client, &mut input, false).await;
    assert_eq!(store.messages()[1].content, TRANSPORT_FAILURE);
    assert!(!store.is_pending());
}

#[tokio::test]
async fn analytics_endpoints_decode() {
    let (client, _) = spawn_mock_backend().await;

    let clusters = client.clusters().await.expect("clusters");
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].count, 12);
    assert_eq!(clusters[1].top_source, "hr.docx");

    let sentiment = client.sentiment().await.expect("sentiment");
    assert_eq!(sentiment.total(), 10.0);
    assert_eq!(sentiment.percent(sentiment.positive), 60.0);

    let err = client.timeseries().await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { ref message } if message == "no dates extracted"));
}

#[tokio::test]
async fn fetch_maps_failures_to_view_text() {
    let (client, _) = spawn_mock_backend().await;
    let mut timeseries = Fetch::spawn({
        let client = client.clone();
        async move { client.timeseries().await }
    });
    timeseries.wait().await;
    assert_eq!(timeseries.state(), &Remote::Failed("Error: no dates extracted".to_string()));

    let offline = unreachable_client().await;
    let mut status = Fetch::spawn(async move { offline.status().await });
    status.wait().await;
    assert_eq!(status.state(), &Remote::Failed(TRANSPORT_FAILURE.to_string()));
}

#[tokio::test]
async fn status_ingest_and_config_roundtrip() {
    let (client, state) = spawn_mock_backend().await;

    let status = client.status().await.expect("status");
    assert_eq!(status.config.vector_db.as_deref(), Some("sqlite"));
    assert!(status
        .library_rows()
        .contains(&("documents".to_string(), "4".to_string())));

    let report = client.ingest("/data/reports").await.expect("ingest");
    assert_eq!(report.summary().as_deref(), Some("docs_added: 2"));

    let err = client.ingest("").await.unwrap_err();
    assert_eq!(err.user_message(), "Error: Path is required");

    let wanted = PipelineConfig {
        embedding_model: Some("nomic-embed-text-v1.5".to_string()),
        vector_db: Some("chromadb".to_string()),
        llm_model: None,
    };
    let applied = client.update_config(&wanted).await.expect("update config");
    assert_eq!(applied, wanted);
    let bodies = state.config_bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({"embedding_model": "nomic-embed-text-v1.5", "vector_db": "chromadb"})
    );
}
