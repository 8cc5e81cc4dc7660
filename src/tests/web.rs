use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::fake::FakeRenderer;
use crate::app::{PreviewService, ScrapeSettings};
use crate::config::Config;
use crate::web::{router, SharedState};

const PAGE: &str = r#"<html><head>
    <meta property="og:title" content="Hello">
    <meta property="og:image" content="https://img.example.com/og.jpg">
</head><body>
    <img src="/a.png"><img src="data:image/png;base64,AAAA"><img src="/b.jpg">
</body></html>"#;

const IMAGELESS: &str = "<html><head><title>Nothing to see</title></head><body></body></html>";

fn state(renderer: &Arc<FakeRenderer>) -> SharedState {
    let service = PreviewService::new(renderer.clone(), ScrapeSettings::from(&Config::default()));
    SharedState::new(service, 2)
}

async fn get(renderer: &Arc<FakeRenderer>, uri: &str) -> (StatusCode, Value) {
    let resp = router(state(renderer))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

fn renderer() -> Arc<FakeRenderer> {
    Arc::new(
        FakeRenderer::new()
            .page("https://example.com/", PAGE)
            .page("https://example.com/empty", IMAGELESS)
            .redirect("https://short.example/x", "https://example.com/", PAGE)
            .timeout("https://slow.example.com/"),
    )
}

#[tokio::test]
async fn test_preview() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/preview?url=https%3A%2F%2Fexample.com%2F").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "url": "https://example.com/",
            "title": "Hello",
            "description": null,
            "image": "https://img.example.com/og.jpg",
        })
    );
    assert_eq!(renderer.closed(), 1);
}

#[tokio::test]
async fn test_preview_requires_url() {
    let renderer = renderer();

    for uri in ["/preview", "/preview?url=", "/preview?url=%20"] {
        let (status, body) = get(&renderer, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({"error": "URL parameter is required"}));
    }

    assert_eq!(renderer.opened(), 0);
}

#[tokio::test]
async fn test_preview_timeout() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/preview?url=https%3A%2F%2Fslow.example.com%2F").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Could not generate preview"}));
    assert_eq!((renderer.opened(), renderer.closed()), (1, 1));
}

#[tokio::test]
async fn test_all_images() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/all-images?url=https%3A%2F%2Fshort.example%2Fx").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"images": ["https://example.com/a.png", "https://example.com/b.jpg"]})
    );
    assert_eq!(renderer.closed(), 1);
}

#[tokio::test]
async fn test_all_images_failures() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/all-images").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "URL parameter is required"}));
    assert_eq!(renderer.opened(), 0);

    let (status, body) = get(&renderer, "/all-images?url=https%3A%2F%2Fexample.com%2Fempty").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No images found"}));

    let (status, _) = get(&renderer, "/all-images?url=https%3A%2F%2Fslow.example.com%2F").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!((renderer.opened(), renderer.closed()), (2, 2));
}

#[tokio::test]
async fn test_all_images_launch_failure() {
    let renderer = Arc::new(FakeRenderer::new().fail_launch());

    let (status, body) = get(&renderer, "/all-images?url=https%3A%2F%2Fexample.com%2F").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_original_url() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/original-url?url=https%3A%2F%2Fshort.example%2Fx").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"original_url": "https://example.com/"}));

    let (status, body) =
        get(&renderer, "/original-url?url=https%3A%2F%2Fslow.example.com%2F").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"original_url": null}));

    assert_eq!((renderer.opened(), renderer.closed()), (2, 2));
}

#[tokio::test]
async fn test_original_url_without_url() {
    let renderer = renderer();

    let (status, body) = get(&renderer, "/original-url").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"original_url": null}));
    assert_eq!(renderer.opened(), 0);
}
