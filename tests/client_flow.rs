//! Full round trip: controller -> HTTP API -> router -> mocked upstream, with
//! results persisted to SQLite and downloaded back.

use std::sync::Arc;
use std::time::Duration;

use reelgen_lib::client::{
    download_video, GenerationController, GenerationOptions, HttpGenerationApi, NoticeLevel,
};
use reelgen_lib::config::UpstreamConfig;
use reelgen_lib::server::router::create_router;
use reelgen_lib::storage::SqliteSlots;
use reelgen_lib::upstream::InferenceClient;
use reelgen_lib::{AppError, GenerationStatus, VideoLibrary};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    base_url: String,
    shutdown: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn spawn_server(upstream: &MockServer) -> Harness {
    let config = UpstreamConfig {
        endpoint: format!("{}/chat/completions", upstream.uri()),
        ..UpstreamConfig::default()
    };
    let app = create_router(Arc::new(InferenceClient::new(config).unwrap()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let stop = shutdown.clone();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop.cancelled_owned())
            .await
            .unwrap();
    });
    Harness {
        base_url: format!("http://{}", addr),
        shutdown,
    }
}

async fn open_library(dir: &TempDir) -> VideoLibrary {
    let slots = SqliteSlots::open(&dir.path().join("library.db")).await.unwrap();
    VideoLibrary::new(Arc::new(slots))
}

#[tokio::test]
async fn generated_video_is_persisted_and_survives_reopen() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant",
                "content": "Your clip: https://cdn.example.com/clips/lake.mp4"}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let harness = spawn_server(&upstream).await;
    let dir = TempDir::new().unwrap();

    let api = Arc::new(HttpGenerationApi::new(&harness.base_url, Duration::from_secs(10)));
    let mut controller = GenerationController::new(api, open_library(&dir).await)
        .await
        .with_progress_tick(Duration::from_millis(10));
    controller.set_prompt("A calm lake at sunset");
    controller.set_options(GenerationOptions {
        duration: 10,
        ..GenerationOptions::default()
    });

    let video = controller.submit().await.unwrap();
    assert_eq!(video.status, GenerationStatus::Completed);
    assert_eq!(video.video_url, "https://cdn.example.com/clips/lake.mp4");
    assert_eq!(video.duration, 10);
    assert_eq!(controller.status(), GenerationStatus::Completed);
    assert_eq!(controller.state().progress, 100);
    assert_eq!(controller.prompt(), "");
    assert_eq!(controller.videos().len(), 1);
    assert!(controller
        .take_notices()
        .iter()
        .any(|n| n.level == NoticeLevel::Success));
    drop(controller);

    let reopened = open_library(&dir).await.load().await;
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened[0].id, video.id);
    assert_eq!(reopened[0].prompt, "A calm lake at sunset");
}

#[tokio::test]
async fn server_error_message_reaches_the_controller() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&upstream)
        .await;
    let harness = spawn_server(&upstream).await;
    let dir = TempDir::new().unwrap();

    let api = Arc::new(HttpGenerationApi::new(&harness.base_url, Duration::from_secs(10)));
    let mut controller = GenerationController::new(api, open_library(&dir).await)
        .await
        .with_progress_tick(Duration::from_millis(10));
    controller.set_prompt("Neon city streets");

    let err = controller.submit().await.unwrap_err();
    match &err {
        AppError::Api { status, .. } => assert_eq!(*status, 429),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(controller.status(), GenerationStatus::Failed);
    assert_eq!(controller.prompt(), "Neon city streets");
    assert!(controller.videos().is_empty());
    assert!(open_library(&dir).await.load().await.is_empty());
}

#[tokio::test]
async fn service_info_over_http() {
    let upstream = MockServer::start().await;
    let harness = spawn_server(&upstream).await;

    let api = HttpGenerationApi::new(&harness.base_url, Duration::from_secs(10));
    let info = api.service_info().await.unwrap();
    assert_eq!(info["message"], "AI Video Generation API");
}

#[tokio::test]
async fn download_writes_named_file() {
    let media = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/clips/lake.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .expect(1)
        .mount(&media)
        .await;
    let dir = TempDir::new().unwrap();

    let written = download_video(
        &reqwest::Client::new(),
        &format!("{}/clips/lake.mp4", media.uri()),
        "A calm lake at sunset",
        dir.path(),
    )
    .await
    .unwrap();

    assert_eq!(written, dir.path().join("ai-video-A-calm-lake-at-sunset.mp4"));
    assert_eq!(tokio::fs::read(&written).await.unwrap().len(), 4096);
}

#[tokio::test]
async fn download_of_missing_media_fails() {
    let media = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&media)
        .await;
    let dir = TempDir::new().unwrap();

    let err = download_video(
        &reqwest::Client::new(),
        &format!("{}/gone.mp4", media.uri()),
        "gone",
        dir.path(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Api { status: 404, .. }));
    assert!(!dir.path().join("ai-video-gone.mp4").exists());
}
