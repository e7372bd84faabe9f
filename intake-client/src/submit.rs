//! Multipart submission to the intake service

use intake_common::transcode::{FlatContent, FlatEntry};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::controller::{FieldError, Phase, Step, WizardController};

/// Submit failures
#[derive(Debug, Error)]
pub enum ClientError {
    /// Final-step checks failed; nothing was sent
    #[error("Form incomplete: {}", join_errors(.0))]
    Incomplete(Vec<FieldError>),

    /// Submission is only offered on the final step
    #[error("Form can only be submitted from the {} step", Step::FinalStep)]
    NotAtFinalStep(Step),

    /// The form is already submitting or has been submitted
    #[error("Form is not editable")]
    NotEditable,

    /// Server answered with a non-success status
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Transport or encoding failure
    #[error("Failed to submit form: {0}")]
    Http(#[from] reqwest::Error),
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Success body of `POST /api/applications`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub success: bool,
    pub message: String,
    pub application_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// HTTP client for the intake service
#[derive(Debug, Clone)]
pub struct IntakeClient {
    http: reqwest::Client,
    base_url: String,
}

impl IntakeClient {
    /// `base_url` is the service root, e.g. `http://localhost:5000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn applications_url(&self) -> String {
        format!("{}/api/applications", self.base_url)
    }

    /// POST flat entries as one multipart request
    pub async fn submit_entries(&self, entries: Vec<FlatEntry>) -> Result<SubmitReceipt, ClientError> {
        let form = build_form(entries)?;
        let response = self.http.post(self.applications_url()).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            let message = body
                .message
                .unwrap_or_else(|| format!("Server returned {}", status.as_u16()));
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: SubmitReceipt = response.json().await?;
        info!(application_id = %receipt.application_id, "Application accepted");
        Ok(receipt)
    }

    /// Validate, send and record the outcome on the controller
    pub async fn submit_form(&self, wizard: &mut WizardController) -> Result<SubmitReceipt, ClientError> {
        if wizard.phase() != Phase::Editing {
            return Err(ClientError::NotEditable);
        }
        if wizard.step() != Step::FinalStep {
            return Err(ClientError::NotAtFinalStep(wizard.step()));
        }
        wizard.validate_final().map_err(ClientError::Incomplete)?;
        if !wizard.begin_submit() {
            return Err(ClientError::NotEditable);
        }

        match self.submit_entries(wizard.submission_entries()).await {
            Ok(receipt) => {
                wizard.submit_succeeded();
                Ok(receipt)
            }
            Err(e) => {
                wizard.submit_failed(e.to_string());
                Err(e)
            }
        }
    }
}

/// Turn flat entries into a multipart form, preserving order
pub fn build_form(entries: Vec<FlatEntry>) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for entry in entries {
        form = match entry.content {
            FlatContent::Text(text) => form.text(entry.name, text),
            FlatContent::File(file) => {
                debug!(field = %entry.name, file = %file.file_name, "Attaching file");
                let part = Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.media_type)?;
                form.part(entry.name, part)
            }
        };
    }
    Ok(form)
}
