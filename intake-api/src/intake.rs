//! Submission pipeline
//!
//! A multipart request moves through
//! `received → transcoded → merged → validated → persisted`; any stage
//! before `persisted` can exit with an [`IntakeError`]. Files are uploaded
//! as they stream in, so a later failure leaves them in storage.

use std::fmt;

use axum::extract::Multipart;
use chrono::Utc;
use intake_common::keypath::document_slot_key;
use intake_common::model::{read_submission, DocumentRef, RecordStamp};
use intake_common::transcode::{reconstruct, FlatFields};
use intake_common::FileBlob;
use serde_json::{Map, Number, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::applications::insert_application;
use crate::error::IntakeError;
use crate::upload::{StoredObject, UploadError, UploadParams, UploadPolicy, UploadSink};

/// Pipeline stage reached by a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    Transcoded,
    Merged,
    Validated,
    Persisted,
}

impl fmt::Display for IntakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntakeStage::Received => "received",
            IntakeStage::Transcoded => "transcoded",
            IntakeStage::Merged => "merged",
            IntakeStage::Validated => "validated",
            IntakeStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// A file that passed the accept filter and reached storage
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field_name: String,
    pub slot_key: String,
    pub media_type: String,
    pub size: usize,
    pub stored: StoredObject,
}

impl ReceivedUpload {
    /// Document metadata stored in the slot
    pub fn document_ref(&self) -> DocumentRef {
        DocumentRef {
            url: self.stored.url.clone(),
            public_id: self.stored.public_id.clone(),
            format: self
                .stored
                .format
                .clone()
                .or_else(|| Some(self.media_type.clone()).filter(|m| !m.is_empty())),
            size: Some(Number::from(self.size)),
            resource_type: self.stored.resource_type,
        }
    }
}

/// Everything read off the wire
#[derive(Debug, Default)]
pub struct ReceivedSubmission {
    pub fields: FlatFields,
    pub uploads: Vec<ReceivedUpload>,
}

/// Run a multipart request through every stage and return the stored id
pub async fn submit(
    multipart: Multipart,
    db: &SqlitePool,
    policy: &UploadPolicy,
    sink: &dyn UploadSink,
) -> Result<Uuid, IntakeError> {
    let received = receive(multipart, policy, sink).await?;
    log_stage(IntakeStage::Received);

    let reconstruction = reconstruct(&received.fields);
    debug!(
        source = ?reconstruction.source,
        conflicts = reconstruction.conflicts.len(),
        "Record reconstructed"
    );
    let mut record = reconstruction.record;
    log_stage(IntakeStage::Transcoded);

    merge_documents(&mut record, &received.uploads);
    log_stage(IntakeStage::Merged);

    check_required(&record)?;
    log_stage(IntakeStage::Validated);

    let id = persist(db, &record, RecordStamp::now()).await?;
    log_stage(IntakeStage::Persisted);

    Ok(id)
}

fn log_stage(stage: IntakeStage) {
    debug!(%stage, "Submission stage reached");
}

/// Stream every part: text fields are collected, files are filtered,
/// size-checked and uploaded in receipt order
pub async fn receive(
    mut multipart: Multipart,
    policy: &UploadPolicy,
    sink: &dyn UploadSink,
) -> Result<ReceivedSubmission, IntakeError> {
    let mut received = ReceivedSubmission::default();

    while let Some(mut field) = multipart.next_field().await.map_err(UploadError::from)? {
        let field_name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let text = field.text().await.map_err(UploadError::from)?;
            received.fields.push(field_name, text);
            continue;
        };
        // Browsers send an empty file part for an untouched file input
        if file_name.is_empty() {
            continue;
        }

        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        policy.check_type(&file_name, &media_type)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(UploadError::from)? {
            bytes.extend_from_slice(&chunk);
            policy.check_size(&field_name, bytes.len())?;
        }

        let file = FileBlob::new(file_name, media_type, bytes);
        let params = UploadParams::for_file(&policy.folder, &field_name, &file, Utc::now().timestamp_millis());
        let stored = sink.upload(&params, &file).await?;
        info!(field = %field_name, public_id = %stored.public_id, "File uploaded");

        received.uploads.push(ReceivedUpload {
            slot_key: document_slot_key(&field_name),
            field_name,
            media_type: file.media_type,
            size: file.bytes.len(),
            stored,
        });
    }

    Ok(received)
}

/// Write each upload's metadata into `documents[<slot>]`
///
/// Existing `documents` entries (snapshot placeholders) are kept unless an
/// upload replaces them.
pub fn merge_documents(record: &mut Map<String, Value>, uploads: &[ReceivedUpload]) {
    let documents = record
        .entry("documents")
        .or_insert_with(|| Value::Object(Map::new()));
    if !documents.is_object() {
        *documents = Value::Object(Map::new());
    }
    if let Value::Object(documents) = documents {
        for upload in uploads {
            let document = serde_json::to_value(upload.document_ref()).unwrap_or(Value::Null);
            documents.insert(upload.slot_key.clone(), document);
        }
    }
}

/// `fullName`, `email`, and a mobile or phone number must be truthy
pub fn check_required(record: &Map<String, Value>) -> Result<(), IntakeError> {
    let present = |key: &str| record.get(key).map(is_truthy).unwrap_or(false);

    let mut missing: Vec<String> = ["fullName", "email"]
        .into_iter()
        .filter(|key| !present(*key))
        .map(str::to_string)
        .collect();
    if !present("mobileNumber") && !present("phoneNumber") {
        missing.push("mobileNumber".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(IntakeError::MissingFields(missing))
    }
}

/// Build the submission through the schema pass and store it
pub async fn persist(
    db: &SqlitePool,
    record: &Map<String, Value>,
    stamp: RecordStamp,
) -> Result<Uuid, IntakeError> {
    let submission = read_submission(record, stamp)?;
    insert_application(db, &submission).await?;
    info!(application_id = %submission.id, "Application stored");
    Ok(submission.id)
}

/// JavaScript truthiness over JSON
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
