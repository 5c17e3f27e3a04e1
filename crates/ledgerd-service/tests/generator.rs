//! HTTP image generator client tests.

use ledgerd_service::{GeneratorError, HttpImageGenerator, ImageGenerator};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn edit_posts_model_and_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .and(body_partial_json(serde_json::json!({
            "model": "gemini-2.5-flash-image",
            "prompt": "make it teal"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://images.example/out.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = HttpImageGenerator::new(&server.uri(), None);
    let image = generator
        .edit("gemini-2.5-flash-image", "make it teal", None)
        .await
        .unwrap();

    assert_eq!(image.url, "https://images.example/out.png");
    assert_eq!(image.model, "gemini-2.5-flash-image");
}

#[tokio::test]
async fn edit_sends_bearer_auth_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://images.example/out.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = HttpImageGenerator::new(&server.uri(), Some("secret-key".into()));
    generator
        .edit("gemini-2.5-flash-image", "sharpen", Some("https://in.example/src.png"))
        .await
        .unwrap();
}

#[tokio::test]
async fn backend_error_is_surfaced_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/images/edits"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let generator = HttpImageGenerator::new(&server.uri(), None);
    let err = generator
        .edit("gemini-2.5-flash-image", "sharpen", None)
        .await
        .unwrap_err();

    match err {
        GeneratorError::Backend { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        GeneratorError::Request(_) => panic!("expected backend error"),
    }
}
