//! End-to-end: the form controller submits to a live intake-api router

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use intake_api::upload::{SinkError, StoredObject, UploadParams, UploadPolicy, UploadSink};
use intake_api::AppState;
use intake_client::{ChangeEvent, ClientError, IntakeClient, Phase, WizardController};
use intake_common::FileBlob;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;

/// Sink that stores nothing and reports a CDN-style URL
struct EchoSink;

#[async_trait]
impl UploadSink for EchoSink {
    async fn upload(&self, params: &UploadParams, file: &FileBlob) -> Result<StoredObject, SinkError> {
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
        "echo".to_string()
    }
}

/// Serve the real router on an ephemeral port
async fn start_server() -> SocketAddr {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    intake_api::db::init_tables(&pool).await.unwrap();

    let state = AppState::new(pool, Arc::new(EchoSink), UploadPolicy::default());
    let app = intake_api::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Walk every step the way an applicant would
fn filled_wizard(email: &str) -> WizardController {
    let mut wizard = WizardController::new();

    wizard.handle_change(ChangeEvent::checkbox("purposeAcknowledged", true));
    assert!(wizard.next());
    wizard.handle_change(ChangeEvent::checkbox("instructionsAcknowledged", true));
    assert!(wizard.next());

    for (name, value) in [
        ("fullName", "Asha Rao"),
        ("age", "29"),
        ("gender", "female"),
        ("mobileNumber", "09876543210"),
        ("email", email),
        ("currentAddress", "12 MG Road, Pune"),
        ("highestQualification", "M.Sc"),
    ] {
        wizard.handle_change(ChangeEvent::value(name, value));
    }
    assert!(wizard.next());

    wizard.handle_change(ChangeEvent::value("targetCity", "Pune"));
    wizard.set_nested("proposedPremises.floor", "Ground Floor");
    wizard.toggle_target_class("JEE");
    wizard.toggle_target_class("NEET");
    wizard.handle_change(ChangeEvent::value("managementType", "self"));
    assert!(wizard.next());

    wizard.handle_change(ChangeEvent::checkbox("hybridModel", true));
    assert!(wizard.next());

    wizard.handle_change(ChangeEvent::checkbox("marketing.hasBudget", true));
    wizard.handle_change(ChangeEvent::value("marketing.budget", "40000"));
    assert!(wizard.next());

    for (name, value) in [
        ("timeframe", "3 months"),
        ("motivation", "passion"),
        ("educationGoal", "holistic"),
        ("learningModel", "blended"),
        ("trainingAdoption", "yes"),
        ("communicationStyle", "weekly"),
        ("classroomEnvironment", "friendly"),
    ] {
        wizard.handle_change(ChangeEvent::value(name, value));
    }
    wizard.handle_change(ChangeEvent::checkbox("fullTimeDedication", true));
    wizard.handle_change(ChangeEvent::file("idProof", FileBlob::new("id.png", "image/png", vec![7; 64])));
    wizard.handle_change(ChangeEvent::file("addressProof", FileBlob::new("bill.jpg", "image/jpeg", vec![7; 32])));
    wizard.handle_change(ChangeEvent::file(
        "bankStatement",
        FileBlob::new("statement.pdf", "application/pdf", vec![7; 16]),
    ));
    wizard.handle_change(ChangeEvent::checkbox("termsAccepted", true));
    wizard
}

#[tokio::test]
async fn test_wizard_submission_is_stored() {
    // Given: a live service and a completed form
    let addr = start_server().await;
    let client = IntakeClient::new(format!("http://{addr}"));
    let mut wizard = filled_wizard("Asha@Example.com");

    // When: the form is submitted
    let receipt = client.submit_form(&mut wizard).await.unwrap();

    // Then: the controller is done and the stored record mirrors the form
    assert!(receipt.success);
    assert_eq!(receipt.message, "Application submitted successfully!");
    assert_eq!(wizard.phase(), Phase::Submitted);
    assert!(!wizard.back());

    let stored: Value = reqwest::get(format!("{}/{}", client.applications_url(), receipt.application_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let data = &stored["data"];
    assert_eq!(data["fullName"], "Asha Rao");
    assert_eq!(data["email"], "asha@example.com");
    assert_eq!(data["mobileNumber"], "09876543210");
    assert_eq!(data["age"], 29);
    assert_eq!(data["targetClasses"], serde_json::json!(["JEE", "NEET"]));
    assert_eq!(data["managementType"], "self");
    assert_eq!(data["hybridModel"], true);
    assert_eq!(data["marketing"]["hasBudget"], true);
    assert_eq!(data["marketing"]["budget"], 40000);
    assert_eq!(data["motivation"], serde_json::json!(["passion"]));
    assert_eq!(data["documents"]["idProof"]["resource_type"], "image");
    assert_eq!(data["documents"]["idProof"]["size"], 64);
    assert_eq!(data["documents"]["bankStatement"]["resource_type"], "raw");
    assert!(data["documents"].get("premisesPhoto").is_none());
    assert!(data.get("termsAccepted").is_none(), "unknown keys are dropped");
}

#[tokio::test]
async fn test_server_rejection_returns_to_editing() {
    // Given: a form whose email was never filled in
    let addr = start_server().await;
    let client = IntakeClient::new(format!("http://{addr}"));
    let mut wizard = filled_wizard("");

    // When: it is submitted
    let err = client.submit_form(&mut wizard).await.unwrap_err();

    // Then: the server message is surfaced and editing resumes
    assert!(matches!(err, ClientError::Rejected { status: 400, ref message } if message == "Missing required fields"));
    assert_eq!(wizard.phase(), Phase::Editing);
    assert_eq!(wizard.submit_error(), Some("Missing required fields"));
    assert!(wizard.back());
}
