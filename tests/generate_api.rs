//! The `/generate` HTTP surface, driven through the router with a mocked upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use reelgen_lib::config::UpstreamConfig;
use reelgen_lib::server::router::create_router;
use reelgen_lib::upstream::InferenceClient;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(server: &MockServer, timeout_secs: u64) -> Router {
    let config = UpstreamConfig {
        endpoint: format!("{}/chat/completions", server.uri()),
        timeout_secs,
        ..UpstreamConfig::default()
    };
    create_router(Arc::new(InferenceClient::new(config).unwrap()))
}

async fn post_generate(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn chat_reply(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

#[tokio::test]
async fn invalid_bodies_never_reach_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("x")))
        .expect(0)
        .mount(&server)
        .await;

    let bodies = [
        json!({"prompt": ""}).to_string(),
        json!({"prompt": "   \n"}).to_string(),
        json!({"duration": 5}).to_string(),
        json!({"prompt": 7}).to_string(),
        json!({"prompt": "a".repeat(1001)}).to_string(),
        "{not json".to_string(),
    ];
    for body in bodies {
        let (status, value) = post_generate(app(&server, 5), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(value["error"]["type"], "validation_error");
        assert!(value["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn oversized_prompt_message() {
    let server = MockServer::start().await;
    let (status, value) =
        post_generate(app(&server, 5), json!({"prompt": "a".repeat(1001)}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"]["message"], "Prompt must be less than 1000 characters");
}

#[tokio::test]
async fn successful_generation_returns_completed_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("Here it is: https://cdn.example.com/v/lake.mp4")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (status, value) = post_generate(
        app(&server, 5),
        json!({"prompt": "A calm lake at sunset", "duration": 8, "style": "cinematic"}).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["success"], true);
    let video = &value["video"];
    assert_eq!(video["status"], "completed");
    assert_eq!(video["videoUrl"], "https://cdn.example.com/v/lake.mp4");
    assert_eq!(video["prompt"], "A calm lake at sunset");
    assert_eq!(video["duration"], 8);
    assert_eq!(video["quality"], "standard");
    assert_eq!(video["style"], "cinematic");
    assert!(video["id"].as_str().unwrap().starts_with("video_"));
    assert!(video["thumbnailUrl"].is_string());
    assert!(video["createdAt"].is_string());
    let size = video["metadata"]["fileSize"].as_u64().unwrap();
    assert!((10..60).contains(&size));
}

#[tokio::test]
async fn reply_without_link_still_yields_a_video_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Done.")))
        .mount(&server)
        .await;

    let (status, value) =
        post_generate(app(&server, 5), json!({"prompt": "fog"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!value["video"]["videoUrl"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn upstream_failures_map_to_status_codes() {
    for (upstream, expected, kind) in [
        (429u16, StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        (500, StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable"),
        (502, StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(upstream))
            .expect(1)
            .mount(&server)
            .await;

        let (status, value) =
            post_generate(app(&server, 5), json!({"prompt": "x"}).to_string()).await;
        assert_eq!(status, expected);
        assert_eq!(value["error"]["type"], kind);
    }
}

#[tokio::test]
async fn slow_upstream_is_a_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (status, value) =
        post_generate(app(&server, 1), json!({"prompt": "x"}).to_string()).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(value["error"]["type"], "timeout");
}

#[tokio::test]
async fn malformed_upstream_body_is_an_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (status, value) =
        post_generate(app(&server, 5), json!({"prompt": "x"}).to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(value["error"]["message"].is_string());
}

#[tokio::test]
async fn service_info_and_health() {
    let server = MockServer::start().await;

    let (status, info) = get_json(app(&server, 5), "/generate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["message"], "AI Video Generation API");
    assert_eq!(info["model"], "replicate/google/veo-3");
    assert!(info["endpoints"]["POST"].is_string());
    assert!(info["endpoints"]["GET"].is_string());

    let (status, health) = get_json(app(&server, 5), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}
