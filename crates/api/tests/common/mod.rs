#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use faceverify_api::config::{EncoderConfig, ServerConfig, VerificationConfig};
use faceverify_api::router::build_app_router;
use faceverify_api::state::AppState;

pub const BOUNDARY: &str = "faceverify-test-boundary";

/// A router plus the temporary upload root it writes into.
pub struct TestApp {
    pub router: Router,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` rooted at `upload_dir`.
///
/// The face encoder is `sh -c 'cat "$1"'`: test "images" are JSON
/// descriptor lists and the encoder echoes them back, so no model is needed.
pub fn test_config(upload_dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 10 * 1024 * 1024,
        verification: VerificationConfig::default(),
        encoder: EncoderConfig::command(
            "sh",
            vec!["-c".into(), "cat \"$1\"".into(), "encoder".into()],
        ),
    }
}

/// Build the full application router, with the production middleware stack,
/// using the given database pool and a fresh upload directory.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = test_config(upload_dir.path());
    let encoder = config.encoder.build().unwrap();
    let state = AppState::new(pool, config.clone(), encoder);

    TestApp {
        router: build_app_router(state, &config),
        upload_dir,
    }
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// A multipart body with one file part per `(field, filename, bytes)`.
pub fn multipart_body(parts: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (field, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart body built from `parts`.
pub async fn post_multipart(app: Router, uri: &str, parts: &[(&str, &str, &[u8])]) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
