//! Common test utilities for API testing with a mock engine.
//!
//! This module provides a test fixture that creates an in-process server
//! backed by [`MockEngine`], so drops can be converted without ffmpeg.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dropconvert_core::{
    testing::MockEngine, Config, ConversionOrchestrator, ConversionStatus, StatusSnapshot,
};
use dropconvert_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use dropconvert_core::testing::fixtures;

const BOUNDARY: &str = "dropconvert-test-boundary";

/// Test fixture with an in-process router and a controllable engine.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_drop() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.drop_files(&[("clip.avi", b"data")], None).await;
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock engine - configure listing, exit code, progress
    pub engine: MockEngine,
    /// Orchestrator shared with the router
    pub orchestrator: ConversionOrchestrator,
}

/// Response from a test request, parsed as JSON
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response from a test request, kept as bytes
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a fixture whose engine has finished loading.
    pub async fn new() -> Self {
        let fixture = Self::loading(Config::default());
        fixture
            .orchestrator
            .start("ffmpeg", "")
            .await
            .expect("Mock engine should load");
        fixture
    }

    /// Create a fixture whose engine has not been started.
    pub fn loading(config: Config) -> Self {
        let engine = MockEngine::new();
        let orchestrator =
            ConversionOrchestrator::new(config.orchestrator.clone(), Arc::new(engine.clone()));
        let state = Arc::new(AppState::new(config, orchestrator.clone()));
        let router = create_router(state);

        Self {
            router,
            engine,
            orchestrator,
        }
    }

    /// Create a started fixture with a custom configuration.
    pub async fn with_config(config: Config) -> Self {
        let fixture = Self::loading(config);
        fixture
            .orchestrator
            .start("ffmpeg", "")
            .await
            .expect("Mock engine should load");
        fixture
    }

    /// Send a GET request and parse the body as JSON.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        Self::into_json(self.send(request).await)
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST a multipart drop with the given files and optional format.
    pub async fn drop_files(&self, files: &[(&str, &[u8])], format: Option<&str>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/drop")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(files, format)))
            .unwrap();
        Self::into_json(self.send(request).await)
    }

    /// Wait until the orchestrator publishes `status`.
    pub async fn wait_for_status(&self, status: ConversionStatus) -> StatusSnapshot {
        let mut rx = self.orchestrator.subscribe_status();
        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                let snapshot = rx.borrow_and_update().clone();
                if snapshot.status == status {
                    return snapshot;
                }
                rx.changed().await.expect("Status channel closed");
            }
        })
        .await
        .expect("Timed out waiting for status")
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            headers,
            bytes,
        }
    }

    fn into_json(raw: RawResponse) -> TestResponse {
        let body: Value = if raw.bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw.bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status: raw.status,
            body,
        }
    }
}

/// Build a `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(files: &[(&str, &[u8])], format: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    if let Some(format) = format {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\n{}\r\n",
                BOUNDARY, format
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
