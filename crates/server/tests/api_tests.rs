//! API tests with the mock engine.
//!
//! These tests run the full router in-process and drive conversions through
//! the HTTP surface.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use dropconvert_core::{Config, ConversionStatus};

use common::{fixtures, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["engine"], "mock");
    assert_eq!(response.body["converter"], "loaded");
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["server"]["port"], 8080);
    assert_eq!(response.body["engine"]["core_location"], "ffmpeg");
    assert_eq!(response.body["orchestrator"]["default_output_format"], "mp4");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get_raw("/api/v1/metrics").await;
    assert_eq!(response.status, StatusCode::OK);

    let text = String::from_utf8(response.bytes).unwrap();
    assert!(text.contains("dropconvert_converter_status"));
    assert!(text.contains("status=\"loaded\"} 1"));
}

#[tokio::test]
async fn test_status_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/status").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "loaded");
    assert_eq!(response.body["format_count"], 9);
    assert_eq!(response.body["progress_percent"], 0.0);
}

#[tokio::test]
async fn test_formats_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/formats").await;
    assert_status!(response, StatusCode::OK);

    let formats = response.body["formats"].as_array().unwrap();
    assert_eq!(formats.len(), 9);
    assert_eq!(formats[0]["abbreviation"], "gif");
    assert_eq!(formats[0]["muxing_supported"], true);
    assert_eq!(formats[0]["demuxing_supported"], false);
    assert_eq!(response.body["demuxer_count"], 6);
    assert_eq!(response.body["muxer_count"], 7);
}

#[tokio::test]
async fn test_loading_state() {
    let fixture = TestFixture::loading(Config::default());

    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["status"], "loading");

    let formats = fixture.get("/api/v1/formats").await;
    assert_status!(formats, StatusCode::SERVICE_UNAVAILABLE);

    let response = fixture
        .drop_files(&[("clip.avi", b"data".as_slice())], None)
        .await;
    assert_status!(response, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["error"], "The engine is still loading");
}

// =============================================================================
// Drop and Download Tests
// =============================================================================

#[tokio::test]
async fn test_output_missing_before_conversion() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/output").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_drop_and_download() {
    let fixture = TestFixture::new().await;
    fixture.engine.set_progress_samples(vec![0.2, 0.6]).await;

    let response = fixture
        .drop_files(&[("holiday.avi", b"avi-data".as_slice())], None)
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["job"]["input_name"], "holiday.avi");
    assert_eq!(response.body["job"]["output_name"], "output.mp4");
    assert_eq!(response.body["job"]["input_size_bytes"], 8);

    let snapshot = fixture.wait_for_status(ConversionStatus::Done).await;
    assert_eq!(snapshot.progress_percent, 100.0);

    let download = fixture.get_raw("/api/v1/output").await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        download.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"output.mp4\""
    );
    assert_eq!(download.bytes, fixtures::output_bytes());

    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["status"], "convert.done");
    assert_eq!(status.body["output"]["file_name"], "output.mp4");
}

#[tokio::test]
async fn test_drop_with_requested_format() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .drop_files(&[("song.wav", b"riff".as_slice())], Some("mp3"))
        .await;
    assert_status!(response, StatusCode::ACCEPTED);
    assert_eq!(response.body["job"]["output_format"], "mp3");

    fixture.wait_for_status(ConversionStatus::Done).await;
    let download = fixture.get_raw("/api/v1/output").await;
    assert_eq!(download.headers[header::CONTENT_TYPE], "audio/mpeg");
}

#[tokio::test]
async fn test_drop_rejections() {
    let fixture = TestFixture::new().await;

    let none = fixture.drop_files(&[], None).await;
    assert_status!(none, StatusCode::BAD_REQUEST);
    assert_eq!(none.body["error"], "No file was dropped");

    let two = fixture
        .drop_files(
            &[("a.avi", b"a".as_slice()), ("b.avi", b"b".as_slice())],
            None,
        )
        .await;
    assert_status!(two, StatusCode::BAD_REQUEST);
    assert_eq!(two.body["error"], "Only one file is allowed");

    let unsupported = fixture
        .drop_files(&[("notes.xyz", b"?".as_slice())], None)
        .await;
    assert_status!(unsupported, StatusCode::BAD_REQUEST);
    assert_eq!(unsupported.body["error"], "Unsupported input format \"xyz\"");

    let bad_output = fixture
        .drop_files(&[("clip.avi", b"a".as_slice())], Some("flac"))
        .await;
    assert_status!(bad_output, StatusCode::BAD_REQUEST);

    // State is untouched and the last message is visible
    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["status"], "loaded");
    assert!(status.body["error"].as_str().unwrap().contains("flac"));
}

#[tokio::test]
async fn test_drop_while_converting_conflicts() {
    let fixture = TestFixture::new().await;
    fixture
        .engine
        .set_execution_delay(Duration::from_millis(300))
        .await;

    let first = fixture
        .drop_files(&[("first.avi", b"1".as_slice())], None)
        .await;
    assert_status!(first, StatusCode::ACCEPTED);

    let second = fixture
        .drop_files(&[("second.avi", b"2".as_slice())], None)
        .await;
    assert_status!(second, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "A conversion is already in progress");

    let snapshot = fixture.wait_for_status(ConversionStatus::Done).await;
    assert_eq!(snapshot.job.unwrap().input_name, "first.avi");
}

#[tokio::test]
async fn test_failed_conversion_has_no_output() {
    let fixture = TestFixture::new().await;
    fixture.engine.set_exit_code(1).await;

    let response = fixture
        .drop_files(&[("clip.avi", b"data".as_slice())], None)
        .await;
    assert_status!(response, StatusCode::ACCEPTED);

    let snapshot = fixture.wait_for_status(ConversionStatus::Failed).await;
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Conversion failed with exit code 1")
    );

    let download = fixture.get("/api/v1/output").await;
    assert_status!(download, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_limit() {
    let mut config = Config::default();
    config.server.max_upload_bytes = 1024;
    let fixture = TestFixture::with_config(config).await;

    let big = vec![0u8; 8 * 1024];
    let response = fixture
        .drop_files(&[("big.avi", big.as_slice())], None)
        .await;
    assert!(
        response.status.is_client_error(),
        "Expected a client error, got {:?}",
        response.status
    );

    let status = fixture.get("/api/v1/status").await;
    assert_eq!(status.body["status"], "loaded");
}

// =============================================================================
// Static UI Tests
// =============================================================================

#[tokio::test]
async fn test_static_dir_is_served() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Drop a file</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('ready')").unwrap();

    let mut config = Config::default();
    config.server.static_dir = Some(dir.path().to_path_buf());
    let fixture = TestFixture::with_config(config).await;

    let index = fixture.get_raw("/").await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.bytes, b"<h1>Drop a file</h1>");

    let script = fixture.get_raw("/app.js").await;
    assert_eq!(script.status, StatusCode::OK);
    assert_eq!(script.bytes, b"console.log('ready')");

    // Unknown paths fall back to the UI entry point
    let fallback = fixture.get_raw("/convert/recent").await;
    assert_eq!(fallback.status, StatusCode::OK);
    assert_eq!(fallback.bytes, b"<h1>Drop a file</h1>");

    // The API keeps its own routes
    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.body["status"], "ok");
}

#[tokio::test]
async fn test_no_static_dir_returns_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture.get_raw("/").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
