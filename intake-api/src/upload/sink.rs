//! Object-storage sink interface

use async_trait::async_trait;
use intake_common::model::ResourceKind;
use intake_common::FileBlob;
use serde::Serialize;
use thiserror::Error;

use super::params::UploadParams;

/// What the sink reports for a stored file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub resource_type: ResourceKind,
    pub bytes: u64,
}

/// Sink failures; all surface as server errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Credentials were not provided at startup
    #[error("Cloud storage not configured (missing {0})")]
    NotConfigured(String),

    /// Transport-level failure talking to the provider
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Provider answered with an error
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Stores one file and reports where it went
#[async_trait]
pub trait UploadSink: Send + Sync {
    async fn upload(&self, params: &UploadParams, file: &FileBlob) -> Result<StoredObject, SinkError>;

    /// Short description for the startup banner
    fn describe(&self) -> String;
}
