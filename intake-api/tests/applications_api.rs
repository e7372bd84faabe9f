//! Integration tests for the franchise application endpoints
//!
//! Drives the router with in-memory SQLite and a recording upload sink.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use intake_api::upload::{SinkError, StoredObject, UploadParams, UploadPolicy, UploadSink};
use intake_api::AppState;
use intake_common::FileBlob;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt;

// ============================================================================
// Helpers
// ============================================================================

/// Sink that records every upload and answers with a CDN-style URL
#[derive(Default)]
struct RecordingSink {
    uploads: Mutex<Vec<UploadParams>>,
}

impl RecordingSink {
    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl UploadSink for RecordingSink {
    async fn upload(&self, params: &UploadParams, file: &FileBlob) -> Result<StoredObject, SinkError> {
        self.uploads.lock().unwrap().push(params.clone());
        let public_id = format!("{}/{}", params.folder, params.public_id);
        Ok(StoredObject {
            url: format!("https://cdn.test/{}", public_id),
            public_id,
            format: params.format.clone(),
            resource_type: params.resource_type,
            bytes: file.bytes.len() as u64,
        })
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

/// Sink whose provider always refuses
struct FailingSink;

#[async_trait]
impl UploadSink for FailingSink {
    async fn upload(&self, _params: &UploadParams, _file: &FileBlob) -> Result<StoredObject, SinkError> {
        Err(SinkError::Rejected {
            status: 401,
            message: "Invalid Signature".to_string(),
        })
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    intake_api::db::init_tables(&pool)
        .await
        .expect("Failed to initialize database schema");
    pool
}

/// Test helper: create test app with in-memory database and recording sink
async fn create_test_app() -> (Router, SqlitePool, Arc<RecordingSink>) {
    let pool = test_pool().await;
    let sink = Arc::new(RecordingSink::default());
    let state = AppState::new(pool.clone(), sink.clone(), UploadPolicy::default());
    (intake_api::build_router(state), pool, sink)
}

/// Hand-built multipart/form-data body
struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    fn new() -> Self {
        Self {
            boundary: "----intake-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, file_name: &str, media_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, media_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/applications")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Flat fields for an application that passes every check, with overrides
fn application(overrides: &[(&str, &str)]) -> MultipartBody {
    let defaults = [
        ("purposeAcknowledged", "true"),
        ("instructionsAcknowledged", "true"),
        ("fullName", "Asha Rao"),
        ("age", "29"),
        ("gender", "female"),
        ("mobileNumber", "9876543210"),
        ("email", "asha@example.com"),
        ("currentAddress", "12 MG Road, Pune"),
        ("highestQualification", "M.Sc"),
        ("targetCity", "Pune"),
    ];
    let mut body = MultipartBody::new();
    for (name, value) in defaults {
        let value = overrides
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, v)| *v)
            .unwrap_or(value);
        body = body.text(name, value);
    }
    for (name, value) in overrides {
        if !defaults.iter().any(|(key, _)| key == name) {
            body = body.text(name, value);
        }
    }
    body
}

fn valid_fields() -> MultipartBody {
    application(&[])
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn stored_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM applications")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ============================================================================
// Submission
// ============================================================================

#[tokio::test]
async fn test_submit_flat_fields() {
    // Given: an application sent as flat fields only
    let (app, pool, _sink) = create_test_app().await;

    // When: it is submitted
    let (status, body) = send(&app, valid_fields().into_request()).await;

    // Then: it is stored and the id is returned
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Application submitted successfully!");
    let id = body["applicationId"].as_str().unwrap();

    let (status, body) = get(&app, &format!("/api/applications/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["fullName"], "Asha Rao");
    assert_eq!(body["data"]["age"], 29);
    assert_eq!(body["data"]["mobileNumber"], "9876543210");
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["submittedAt"].is_string());
    assert_eq!(stored_count(&pool).await, 1);
}

#[tokio::test]
async fn test_submit_snapshot_with_five_documents() {
    // Given: a snapshot with nulled file placeholders plus five file parts
    let (app, _pool, sink) = create_test_app().await;
    let snapshot = json!({
        "purposeAcknowledged": true,
        "instructionsAcknowledged": true,
        "fullName": "Asha Rao",
        "age": 29,
        "gender": "prefer-not-to-say",
        "mobileNumber": "9876543210",
        "email": "asha@example.com",
        "currentAddress": "12 MG Road, Pune",
        "highestQualification": "M.Sc",
        "marketing": {"hasBudget": true, "budget": 40000},
        "documents": {
            "idProof": null,
            "addressProof": null,
            "bankStatement": null,
            "experienceCertificate": null,
            "premisesPhoto": null
        }
    });
    let slots = [
        ("idProof", "aadhaar.png", "image/png", "image"),
        ("addressProof", "bill.jpg", "image/jpeg", "image"),
        ("bankStatement", "statement.pdf", "application/pdf", "raw"),
        ("experienceCertificate", "letter.doc", "application/msword", "raw"),
        ("premisesPhoto", "front.jpeg", "image/jpeg", "image"),
    ];
    let mut request = MultipartBody::new().text("formData", &snapshot.to_string());
    for (slot, file_name, media_type, _) in slots {
        request = request.file(&format!("documents[{slot}]"), file_name, media_type, b"file-bytes");
    }

    // When: it is submitted
    let (status, body) = send(&app, request.into_request()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["applicationId"].as_str().unwrap();

    // Then: every slot holds storage metadata classified by media type
    let (_, body) = get(&app, &format!("/api/applications/{id}")).await;
    let documents = &body["data"]["documents"];
    for (slot, _, media_type, resource_type) in slots {
        let document = &documents[slot];
        assert!(!document["url"].as_str().unwrap().is_empty(), "{slot}");
        assert_eq!(document["resource_type"], resource_type, "{slot}");
        assert_eq!(document["size"], 10, "{slot}");
        assert!(document["format"].is_string(), "{slot} {media_type}");
    }
    assert_eq!(body["data"]["gender"], "prefer-not-to-say");
    assert_eq!(body["data"]["marketing"]["budget"], 40000);

    let uploads = sink.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 5);
    assert!(uploads[0].public_id.starts_with("documents_idProof_-"));
    assert!(uploads.iter().all(|p| p.folder == "franchise-applications"));
}

#[tokio::test]
async fn test_motivation_normalized_to_list() {
    let (app, _pool, _sink) = create_test_app().await;

    // Bare string
    let (_, body) = send(&app, application(&[("motivation", "passion")]).into_request()).await;
    let id = body["applicationId"].as_str().unwrap().to_string();
    let (_, body) = get(&app, &format!("/api/applications/{id}")).await;
    assert_eq!(body["data"]["motivation"], json!(["passion"]));

    // Indexed list
    let request = application(&[("motivation[0]", "business"), ("motivation[1]", "community")])
        .into_request();
    let (_, body) = send(&app, request).await;
    let id = body["applicationId"].as_str().unwrap().to_string();
    let (_, body) = get(&app, &format!("/api/applications/{id}")).await;
    assert_eq!(body["data"]["motivation"], json!(["business", "community"]));
}

// ============================================================================
// Failure exits
// ============================================================================

#[tokio::test]
async fn test_missing_email_rejected() {
    let (app, pool, _sink) = create_test_app().await;
    let request = MultipartBody::new()
        .text("fullName", "Asha Rao")
        .text("mobileNumber", "9876543210")
        .into_request();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Missing required fields");
    assert_eq!(body["missing"], json!(["email"]));
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_missing_mobile_and_phone_reported_as_mobile_number() {
    let (app, _pool, _sink) = create_test_app().await;

    let request = MultipartBody::new()
        .text("fullName", "Asha Rao")
        .text("email", "asha@example.com")
        .into_request();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["missing"], json!(["mobileNumber"]));
}

#[tokio::test]
async fn test_phone_number_passes_required_field_gate() {
    // Given: a phone number in place of the mobile number
    let (app, pool, _sink) = create_test_app().await;
    let request = MultipartBody::new()
        .text("fullName", "Asha Rao")
        .text("email", "asha@example.com")
        .text("phoneNumber", "9876543210")
        .into_request();

    // When: it is submitted
    let (status, body) = send(&app, request).await;

    // Then: the required-field gate lets it through and the schema pass,
    // which stores only mobileNumber, is what rejects it
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("missing").is_none());
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Application validation failed: "), "{message}");
    assert!(message.contains("mobileNumber: Please enter your mobile number"), "{message}");
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_non_multipart_body_is_json_server_error() {
    let (app, pool, _sink) = create_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/applications")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"fullName": "Asha Rao"}"#))
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Malformed submission: "));
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_truncated_multipart_body_is_server_error() {
    // Given: a body that stops in the middle of its first part
    let (app, pool, _sink) = create_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/applications")
        .header("content-type", "multipart/form-data; boundary=cut-short")
        .body(Body::from(
            "--cut-short\r\nContent-Disposition: form-data; name=\"fullName\"\r\n\r\nAsha",
        ))
        .unwrap();

    // When: it is submitted
    let (status, body) = send(&app, request).await;

    // Then: the stream failure is a server error in the JSON envelope
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Malformed multipart body: "));
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_oversized_file_rejected() {
    let (app, pool, sink) = create_test_app().await;
    let six_mib = vec![0u8; 6 * 1024 * 1024];
    let request = valid_fields()
        .file("documents[bankStatement]", "statement.pdf", "application/pdf", &six_mib)
        .into_request();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "One or more files exceed the 5MB size limit");
    assert_eq!(stored_count(&pool).await, 0);
    assert_eq!(sink.upload_count(), 0);
}

#[tokio::test]
async fn test_disallowed_file_type_rejected() {
    let (app, pool, sink) = create_test_app().await;
    let request = valid_fields()
        .file("documents[idProof]", "scan.gif", "image/gif", b"GIF89a")
        .into_request();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Only .jpeg, .jpg, .png, .pdf, .doc, and .docx files allowed!"
    );
    assert_eq!(stored_count(&pool).await, 0);
    assert_eq!(sink.upload_count(), 0);
}

#[tokio::test]
async fn test_schema_violation_is_server_error() {
    let (app, pool, _sink) = create_test_app().await;
    let request = application(&[("age", "16")]).into_request();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Application validation failed: "), "{message}");
    assert!(message.contains("age: You must be at least 18 years old"));
    assert_eq!(stored_count(&pool).await, 0);
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let pool = test_pool().await;
    let state = AppState::new(pool.clone(), Arc::new(FailingSink), UploadPolicy::default());
    let app = intake_api::build_router(state);
    let request = valid_fields()
        .file("documents[idProof]", "id.png", "image/png", b"png")
        .into_request();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Upload rejected (401): Invalid Signature");
    assert_eq!(stored_count(&pool).await, 0);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_list_newest_first() {
    let (app, _pool, _sink) = create_test_app().await;
    for name in ["First Applicant", "Second Applicant"] {
        let (status, _) = send(&app, application(&[("fullName", name)]).into_request()).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get(&app, "/api/applications").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["fullName"], "Second Applicant");
    assert_eq!(body["data"][1]["fullName"], "First Applicant");
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_not_found() {
    let (app, _pool, _sink) = create_test_app().await;

    for uri in [
        "/api/applications/0b4e7a0e-6f0c-4d7a-9a53-2f1d8c4b9e11",
        "/api/applications/not-a-uuid",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body, json!({"success": false, "message": "Application not found"}));
    }
}

#[tokio::test]
async fn test_stats() {
    // Given: two pending and one approved application in two cities
    let (app, _pool, _sink) = create_test_app().await;
    for (city, status) in [("Pune", "pending"), ("Nagpur", "pending"), ("Pune", "approved")] {
        let request = application(&[("targetCity", city), ("status", status)]).into_request();
        let (code, _) = send(&app, request).await;
        assert_eq!(code, StatusCode::CREATED);
    }

    // When: stats are requested
    let (status, body) = get(&app, "/api/applications/stats").await;

    // Then: totals, per-status counts and distinct cities
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"total": 3, "cities": 2, "byStatus": {"approved": 1, "pending": 2}})
    );
}

#[tokio::test]
async fn test_raw_upload_check() {
    let (app, _pool, sink) = create_test_app().await;

    let (status, body) = get(&app, "/api/applications/cloudinary-raw-test").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["result"]["resource_type"], "raw");
    let uploads = sink.uploads.lock().unwrap().clone();
    assert_eq!(uploads[0].folder, "franchise-applications/test");
}

#[tokio::test]
async fn test_health_and_banner() {
    let (app, _pool, _sink) = create_test_app().await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "intake-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("running"));
}
