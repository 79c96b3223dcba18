//! Integration tests for the HTTP API
//!
//! Tests decision, call lifecycle and statistics endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use callbot::core::{create_router, AppState, ControllerSettings, DecisionEngine, SessionStore, SqliteStore};

fn test_state() -> Arc<AppState> {
    state_with(ControllerSettings::default())
}

fn state_with(settings: ControllerSettings) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(DecisionEngine::with_defaults()),
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        settings,
    ))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn new_call(app: &Router) -> String {
    let (status, json) = send(app, "POST", "/call/new", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    json["call_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(test_state());
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["decider"], "rules");
    assert_eq!(json["calls_active"], 0);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_decide_endpoint() {
    let app = create_router(test_state());
    let (status, json) = send(
        &app,
        "POST",
        "/decide",
        Some(json!({
            "transcript": "Bonjour",
            "emotion": {"label": "NEUTRAL", "score": 0.5},
            "audio": {"silence_ratio": 0.0, "clipping_ratio": 0.0}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"]["intent"], "greeting");
    assert_eq!(json["decision"]["action"], "rag_query");
    assert_eq!(json["decision"]["confidence"], 0.85);
    assert_eq!(json["route"]["kind"], "respond");
    assert_eq!(json["observation"]["emotion_label"], "NEUTRAL");
}

#[tokio::test]
async fn test_decide_escalation_carries_reason() {
    let app = create_router(test_state());
    let (status, json) = send(
        &app,
        "POST",
        "/decide",
        Some(json!({"transcript": "je veux parler à mon avocat"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"]["action"], "escalate");
    assert_eq!(json["route"]["kind"], "escalate");
    assert_eq!(json["route"]["reason"]["code"], "R105_SENSITIVE_KEYWORD");
    assert_eq!(json["route"]["reason"]["message"], "sensitive keyword: avocat");
}

#[tokio::test]
async fn test_decide_accepts_empty_body() {
    let app = create_router(test_state());
    let (status, json) = send(&app, "POST", "/decide", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"]["intent"], "unknown");
}

#[tokio::test]
async fn test_call_lifecycle() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));

    let (status, json) = send(&app, "POST", "/call/new", Some(json!({"call_id": "tel-42"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["call_id"], "tel-42");
    assert_eq!(json["state"], "AWAITING_INPUT");
    assert!(json["greeting"].as_str().unwrap().starts_with("Bonjour"));
    let interaction_id = json["interaction_id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        "POST",
        "/call/tel-42/turn",
        Some(json!({"transcript": "où en est mon dossier"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["turn_number"], 1);
    assert_eq!(json["state"], "AWAITING_INPUT");
    assert_eq!(json["decision"]["intent"], "check_status");

    let (status, json) = send(&app, "GET", "/call/tel-42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["turn_number"], 1);
    assert_eq!(json["has_said_goodbye"], false);
    assert_eq!(json["last_decision"]["intent"], "check_status");
    // welcome + caller + bot
    assert_eq!(json["history"].as_array().unwrap().len(), 3);

    let (_, json) = send(&app, "POST", "/call/tel-42/turn", Some(json!({"transcript": "au revoir"}))).await;
    assert_eq!(json["state"], "FEEDBACK_PENDING");

    let (_, json) = send(&app, "POST", "/call/tel-42/turn", Some(json!({"transcript": "oui"}))).await;
    assert_eq!(json["state"], "ENDED");
    assert_eq!(json["satisfaction"], "satisfied");

    // ended calls are released
    let (status, _) = send(&app, "GET", "/call/tel-42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(state.sessions.is_empty());

    let row = state.store.interaction(&interaction_id).unwrap().unwrap();
    assert_eq!(row.status, "completed");
    assert_eq!(row.satisfaction_score, Some(1));
}

#[tokio::test]
async fn test_duplicate_call_id_conflicts() {
    let app = create_router(test_state());
    send(&app, "POST", "/call/new", Some(json!({"call_id": "dup"}))).await;

    let (status, json) = send(&app, "POST", "/call/new", Some(json!({"call_id": "dup"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("dup"));
}

#[tokio::test]
async fn test_generated_call_ids_are_unique() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));

    let a = new_call(&app).await;
    let b = new_call(&app).await;
    assert!(a != b);
    assert_eq!(state.sessions.len(), 2);
}

#[tokio::test]
async fn test_escalation_ends_call() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));
    let id = new_call(&app).await;

    let (status, json) = send(
        &app,
        "POST",
        &format!("/call/{id}/turn"),
        Some(json!({"transcript": "j'ai eu un accident grave, urgence, ambulance"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "ENDED");
    assert_eq!(json["route"]["kind"], "escalate");
    assert!(state.sessions.get(&id).is_none());
}

#[tokio::test]
async fn test_unknown_call_is_not_found() {
    let app = create_router(test_state());

    let (status, _) = send(&app, "GET", "/call/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&app, "POST", "/call/nope/turn", Some(json!({"transcript": "bonjour"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = send(&app, "DELETE", "/call/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hang_up_abandons_call() {
    let state = test_state();
    let app = create_router(Arc::clone(&state));
    let id = new_call(&app).await;
    send(&app, "POST", &format!("/call/{id}/turn"), Some(json!({"transcript": "quelles garanties"}))).await;

    let (status, json) = send(&app, "DELETE", &format!("/call/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "abandoned");
    assert_eq!(json["turn_number"], 1);
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn test_satisfaction_stats_endpoint() {
    let app = create_router(test_state());
    let id = new_call(&app).await;
    for text in ["quelles sont mes garanties", "au revoir", "non"] {
        send(&app, "POST", &format!("/call/{id}/turn"), Some(json!({"transcript": text}))).await;
    }
    new_call(&app).await;

    let (status, json) = send(&app, "GET", "/stats/satisfaction?days=30", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["days"], 30);
    assert_eq!(json["overall"]["total_calls"], 2);
    assert_eq!(json["overall"]["feedbacks"], 1);
    assert_eq!(json["overall"]["unsatisfied"], 1);
    assert_eq!(json["overall"]["satisfaction_rate"], 0.0);
    assert_eq!(json["overall"]["feedback_rate"], 50.0);
    assert_eq!(json["by_intent"][0]["intent"], "general_info");
}

#[tokio::test]
async fn test_feedback_wait_times_out() {
    let state = state_with(ControllerSettings {
        feedback_timeout: Duration::from_millis(50),
        ..ControllerSettings::default()
    });
    let app = create_router(Arc::clone(&state));

    let (_, json) = send(&app, "POST", "/call/new", Some(json!({"call_id": "quiet"}))).await;
    let interaction_id = json["interaction_id"].as_str().unwrap().to_string();
    send(&app, "POST", "/call/quiet/turn", Some(json!({"transcript": "quelles garanties"}))).await;
    let (_, json) = send(&app, "POST", "/call/quiet/turn", Some(json!({"transcript": "au revoir"}))).await;
    assert_eq!(json["state"], "FEEDBACK_PENDING");

    tokio::time::sleep(Duration::from_millis(500)).await;

    let (status, _) = send(&app, "GET", "/call/quiet", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(state.sessions.is_empty());

    let row = state.store.interaction(&interaction_id).unwrap().unwrap();
    assert_eq!(row.status, "completed");
    assert_eq!(row.satisfaction_score, None);
    assert_eq!(row.final_intent.as_deref(), Some("general_info"));
}

#[tokio::test]
async fn test_feedback_answer_before_timeout_wins() {
    let state = state_with(ControllerSettings {
        feedback_timeout: Duration::from_millis(200),
        ..ControllerSettings::default()
    });
    let app = create_router(Arc::clone(&state));

    let (_, json) = send(&app, "POST", "/call/new", Some(json!({"call_id": "quick"}))).await;
    let interaction_id = json["interaction_id"].as_str().unwrap().to_string();
    send(&app, "POST", "/call/quick/turn", Some(json!({"transcript": "au revoir"}))).await;
    let (_, json) = send(&app, "POST", "/call/quick/turn", Some(json!({"transcript": "oui"}))).await;
    assert_eq!(json["state"], "ENDED");

    // a new call reusing the id must survive the first call's timer
    send(&app, "POST", "/call/new", Some(json!({"call_id": "quick"}))).await;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let (status, json) = send(&app, "GET", "/call/quick", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "AWAITING_INPUT");

    let row = state.store.interaction(&interaction_id).unwrap().unwrap();
    assert_eq!(row.satisfaction_score, Some(1));
}

#[tokio::test]
async fn test_huge_stats_window_is_not_an_error() {
    let app = create_router(test_state());
    new_call(&app).await;

    let (status, json) = send(&app, "GET", "/stats/satisfaction?days=4000000000", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overall"]["total_calls"], 1);
}
