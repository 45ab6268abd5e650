//! Tests for the HTTP transport against a scripted local server.
//!
//! These tests verify:
//! - Paths, methods and bodies sent for each endpoint family
//! - Error detail extraction and decode failures
//! - Event-stream decoding over a real connection
//! - A streamed scene driven end to end through the workflow manager

mod common;

use common::http_server::{serve, CannedResponse};
use common::*;
use pretty_assertions::assert_eq;
use sk_core::config::ClientConfig;
use sk_core::streaming::StreamOutcome;
use sk_core::transport::{Backend, HttpTransport, SourceFile, StreamError, TransportError};
use sk_core::workflow::WorkflowManager;
use sk_protocol::{ExportFormat, ExportOutput, WorkflowStep};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

fn transport(base_url: &str) -> HttpTransport {
    HttpTransport::new(ClientConfig::with_base_url(base_url)).unwrap()
}

fn request_line(raw: &str) -> &str {
    raw.lines().next().unwrap_or_default()
}

#[tokio::test]
async fn test_list_projects_unwraps_envelope() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        r#"{"projects": [{"id": "p1", "name": "Fener", "created_at": null, "progress": 40.0}]}"#,
    )])
    .await;

    let projects = transport(&url).list_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Fener");

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "GET /api/v1/projects HTTP/1.1");
}

#[tokio::test]
async fn test_string_detail_becomes_message() {
    let (url, _server) = serve(vec![CannedResponse::json(
        "404 Not Found",
        r#"{"detail": "Project not found"}"#,
    )])
    .await;

    let err = transport(&url).get_project("missing").await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Http {
            status: 404,
            detail: "Project not found".to_string()
        }
    );
    assert_eq!(err.to_string(), "Project not found");
}

#[tokio::test]
async fn test_validation_detail_list_is_joined() {
    let (url, _server) = serve(vec![CannedResponse::json(
        "422 Unprocessable Entity",
        r#"{"detail": [{"loc": ["body", "name"], "msg": "field required"}]}"#,
    )])
    .await;

    let request = sk_protocol::CreateProjectRequest {
        name: String::new(),
        target_duration_minutes: 30,
        methodology: "save_the_cat".to_string(),
        language: "tr".to_string(),
    };
    let err = transport(&url).create_project(&request).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "field required");
}

#[tokio::test]
async fn test_missing_detail_falls_back_to_status() {
    let (url, _server) = serve(vec![CannedResponse::json(
        "502 Bad Gateway",
        "<html>upstream down</html>",
    )])
    .await;

    let err = transport(&url).analyze("p1").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 502");
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let (url, _server) = serve(vec![CannedResponse::json("200 OK", "{\"concepts\": 3")]).await;

    let err = transport(&url).analyze("p1").await.unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_beat_sheet_request_carries_methodology() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        &serde_json::json!({ "beat_sheet": beat_sheet() }).to_string(),
    )])
    .await;

    let response = transport(&url)
        .create_beat_sheet("p1", "hero_journey")
        .await
        .unwrap();
    assert_eq!(response.beat_sheet.beats.len(), 3);

    let requests = server.await.unwrap();
    assert_eq!(
        request_line(&requests[0]),
        "POST /api/v1/projects/p1/senaryo/beat-sheet HTTP/1.1"
    );
    assert!(requests[0].contains(r#"{"methodology":"hero_journey"}"#));
}

#[tokio::test]
async fn test_revise_uses_put_on_scene_path() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        &serde_json::json!({ "scene": scene(4) }).to_string(),
    )])
    .await;

    let request = sk_protocol::ReviseSceneRequest {
        scene_number: 4,
        revision_notes: "Daha kisa".to_string(),
    };
    let response = transport(&url).revise_scene("p1", &request).await.unwrap();
    assert_eq!(response.scene.scene_number, 4);

    let requests = server.await.unwrap();
    assert_eq!(
        request_line(&requests[0]),
        "PUT /api/v1/projects/p1/senaryo/scenes/4 HTTP/1.1"
    );
    assert!(requests[0].contains("\"revision_notes\":\"Daha kisa\""));
}

#[tokio::test]
async fn test_upload_sends_multipart_file_field() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        r#"{"file_name": "roman.txt", "file_uri": "files/p1/roman.txt", "message": "ok"}"#,
    )])
    .await;

    let source = SourceFile::new("roman.txt", b"Bir varmis bir yokmus".to_vec());
    let response = transport(&url).upload_source("p1", source).await.unwrap();
    assert_eq!(response.file_uri, "files/p1/roman.txt");

    let requests = server.await.unwrap();
    let raw = &requests[0];
    assert_eq!(request_line(raw), "POST /api/v1/projects/p1/source HTTP/1.1");
    assert!(raw.to_lowercase().contains("content-type: multipart/form-data"));
    assert!(raw.contains(r#"name="file"; filename="roman.txt""#));
    assert!(raw.contains("text/plain"));
    assert!(raw.contains("Bir varmis bir yokmus"));
}

#[tokio::test]
async fn test_markdown_export_sends_format_query() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        r##"{"markdown": "# Fener\n\nINT. LIGHTHOUSE - NIGHT"}"##,
    )])
    .await;

    let output = transport(&url)
        .export("p1", ExportFormat::Markdown)
        .await
        .unwrap();
    assert_eq!(
        output,
        ExportOutput::Markdown("# Fener\n\nINT. LIGHTHOUSE - NIGHT".to_string())
    );

    let requests = server.await.unwrap();
    assert_eq!(
        request_line(&requests[0]),
        "GET /api/v1/projects/p1/senaryo/export?format=markdown HTTP/1.1"
    );
}

#[tokio::test]
async fn test_health_is_outside_api_prefix() {
    let (url, server) = serve(vec![CannedResponse::json(
        "200 OK",
        r#"{"status": "healthy", "api_key_configured": true, "projects_count": 2}"#,
    )])
    .await;

    let health = transport(&url).health().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.projects_count, 2);

    let requests = server.await.unwrap();
    assert_eq!(request_line(&requests[0]), "GET /health HTTP/1.1");
}

#[tokio::test]
async fn test_event_stream_is_decoded_across_chunks() {
    let (url, server) = serve(vec![CannedResponse::event_stream(&[
        ": keep-alive\n\n",
        "data: INT. \n\n",
        "data: HO",
        "USE\n\ndata: Ku",
        "ş\n\ndata: [DONE]\n\n",
    ])])
    .await;

    let Ok(stream) = transport(&url).stream_next_scene("p1").await else {
        panic!("stream should open");
    };
    let payloads: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
    assert_eq!(payloads, vec!["INT. ", "HOUSE", "Kuş", "[DONE]"]);

    let requests = server.await.unwrap();
    let raw = requests[0].to_lowercase();
    assert!(raw.starts_with("get /api/v1/projects/p1/senaryo/scenes/next/stream http/1.1"));
    assert!(raw.contains("accept: text/event-stream"));
}

#[tokio::test]
async fn test_stream_error_status_is_connection_error() {
    let (url, _server) = serve(vec![CannedResponse::json(
        "500 Internal Server Error",
        r#"{"detail": "model overloaded"}"#,
    )])
    .await;

    let Err(err) = transport(&url).stream_next_scene("p1").await else {
        panic!("stream should not open");
    };
    assert!(matches!(err, StreamError::Connection { .. }));
    assert_eq!(err.to_string(), "Streaming error");
}

#[tokio::test]
async fn test_streamed_scene_through_workflow_manager() {
    let before = project_detail("p1", Some(screenplay(2, &[1])));
    let after = project_detail("p1", Some(screenplay(2, &[1, 2])));
    let (url, server) = serve(vec![
        CannedResponse::json("200 OK", &serde_json::to_string(&before).unwrap()),
        CannedResponse::event_stream(&["data: INT. \n\n", "data: HOUSE\n\n", "data: [DONE]\n\n"]),
        CannedResponse::json("200 OK", &serde_json::to_string(&after).unwrap()),
    ])
    .await;

    let (events_tx, _events) = mpsc::unbounded_channel();
    let manager = WorkflowManager::new(
        Arc::new(transport(&url)),
        ClientConfig::with_base_url(&url),
        events_tx,
    );

    manager.select_project("p1").await.unwrap();
    let outcome = manager.stream_next_scene().await.unwrap().finished().await;
    assert_eq!(outcome, StreamOutcome::Completed("INT. HOUSE".to_string()));

    let state = manager.snapshot().await;
    assert_eq!(state.scenes_written(), 2);
    assert_eq!(state.step, WorkflowStep::Writing);
    assert_eq!(state.error, None);

    let requests = server.await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(request_line(&requests[2]).starts_with("GET /api/v1/projects/p1 "));
}

/// Runs against a live backend at `SCREENPLAY_API_URL`.
#[cfg(feature = "integration-tests")]
#[tokio::test]
async fn test_live_backend_health() {
    let url = std::env::var("SCREENPLAY_API_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string());
    let health = transport(&url).health().await.unwrap();
    assert!(health.is_healthy());
}
