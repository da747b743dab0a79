// tests/test_http_api.rs

mod test_helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use persona_chat::services::chat::FALLBACK_GREETING;
use persona_chat::state::{LoadedResources, ServiceContext};
use test_helpers::{care_worker_biography, create_test_app, ready_context, test_settings};

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_chat(app: &axum::Router, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_get_persona_returns_full_record() {
    let app = create_test_app(ready_context(None));

    let (status, body) = get(&app, "/personas/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["occupation"], "介護福祉士");
    assert_eq!(body["age"], 72);
    // Columns the service never reads are passed through untouched
    assert_eq!(body["prefecture"], "東京都");
    assert_eq!(body["sex"], "女性");
}

#[tokio::test]
async fn test_every_valid_index_resolves_and_the_next_is_404() {
    let app = create_test_app(ready_context(None));

    for i in 0..4 {
        let (status, _) = get(&app, &format!("/personas/{}", i)).await;
        assert_eq!(status, StatusCode::OK, "persona {}", i);
    }

    let (status, body) = get(&app, "/personas/4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
    assert_eq!(body["error_code"], "PERSONA_NOT_FOUND");

    let (status, _) = get(&app, "/personas/-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_rejects_out_of_range_persona() {
    let app = create_test_app(ready_context(None));

    let (status, body) = post_chat(
        &app,
        json!({"messages": [{"role": "user", "content": "こんにちは"}], "persona_index": 99}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_PERSONA_INDEX");
    assert!(body["message"].as_str().unwrap().contains("99"));
}

#[tokio::test]
async fn test_chat_rejects_negative_persona_index() {
    let app = create_test_app(ready_context(None));

    let (status, body) = post_chat(
        &app,
        json!({"messages": [{"role": "user", "content": "こんにちは"}], "persona_index": -1}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["error_code"], "INVALID_PERSONA_INDEX");
}

#[tokio::test]
async fn test_chat_rejects_invalid_sampling_parameters() {
    let app = create_test_app(ready_context(None));

    let (status, body) = post_chat(
        &app,
        json!({"messages": [{"role": "user", "content": "hi"}], "temperature": 1.5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_chat_without_model_uses_fallback_reply() {
    let app = create_test_app(ready_context(None));

    let (status, body) = post_chat(
        &app,
        json!({
            "messages": [{"role": "user", "content": "自己紹介をお願いします。"}],
            "persona_index": 0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let biography = care_worker_biography();
    assert!(biography.chars().count() > 200);
    let quoted: String = biography.chars().take(100).collect();
    assert_eq!(body["reply"], format!("{}... {}", quoted, FALLBACK_GREETING));

    let summary: String = biography.chars().take(200).collect();
    assert_eq!(body["persona_info"]["persona"], summary);
    assert_eq!(body["persona_info"]["occupation"], "介護福祉士");
    assert_eq!(body["persona_info"]["age"], 72);
    assert_eq!(body["persona_info"]["region"], "関東地方");
}

#[tokio::test]
async fn test_chat_with_malformed_body_is_client_error() {
    let app = create_test_app(ready_context(None));

    let (status, _) = post_chat(&app, json!({"persona_index": 0})).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_stats_is_idempotent() {
    let app = create_test_app(ready_context(None));

    let (status, first) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get(&app, "/stats").await;
    assert_eq!(first, second);

    assert_eq!(first["total_personas"], 4);
    assert_eq!(first["top_occupations"][0], json!(["教師", 2]));
    assert_eq!(first["regions"]["不明"], 1);
    assert_eq!(first["age_groups"]["70代"], 1);
}

#[tokio::test]
async fn test_health_and_root_when_ready_without_model() {
    let app = create_test_app(ready_context(None));

    let (status, health) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], false);
    assert_eq!(health["personas_loaded"], true);
    assert_eq!(health["total_personas"], 4);
    assert_eq!(health["startup_error"], Value::Null);
    assert!(health["model_error"].as_str().unwrap().starts_with("Model load error"));
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let (status, root) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["status"], "running");
    assert!(root["message"].as_str().unwrap().contains(root["model"].as_str().unwrap()));
}

#[tokio::test]
async fn test_endpoints_answer_503_while_loading() {
    let app = create_test_app(ServiceContext::new(test_settings()));

    let (status, body) = get(&app, "/personas/0").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "LOADING");

    let (status, _) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = post_chat(
        &app,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, health) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "starting");
}

#[tokio::test]
async fn test_failed_startup_reports_unhealthy() {
    let context = ServiceContext::with_resources(
        test_settings(),
        LoadedResources {
            startup_error: Some("Startup error: dataset missing".into()),
            ..Default::default()
        },
    );
    let app = create_test_app(context);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["startup_error"], "Startup error: dataset missing");

    let (_, root) = get(&app, "/").await;
    assert_eq!(root["status"], "error");

    let (status, body) = get(&app, "/stats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "PERSONAS_NOT_LOADED");

    let (status, body) = post_chat(
        &app,
        json!({"messages": [{"role": "user", "content": "hi"}]}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_code"], "STARTUP_FAILED");
}
