//! Cloudinary upload API client
//!
//! Signed uploads: the request parameters (minus the file and key) are
//! sorted, joined as `k=v&...`, suffixed with the API secret and hashed
//! with SHA-256.

use async_trait::async_trait;
use chrono::Utc;
use intake_common::model::ResourceKind;
use intake_common::FileBlob;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::params::UploadParams;
use super::sink::{SinkError, StoredObject, UploadSink};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Account credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl CloudinaryCredentials {
    /// Credentials from optional parts; reports the first missing one
    pub fn from_parts(
        cloud_name: Option<String>,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Result<Self, SinkError> {
        let require = |value: Option<String>, name: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SinkError::NotConfigured(name.to_string()))
        };
        Ok(Self {
            cloud_name: require(cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: require(api_key, "CLOUDINARY_API_KEY")?,
            api_secret: require(api_secret, "CLOUDINARY_API_SECRET")?,
        })
    }
}

/// Production upload sink
pub struct CloudinarySink {
    client: reqwest::Client,
    credentials: Result<CloudinaryCredentials, String>,
    api_base: String,
}

impl CloudinarySink {
    pub fn new(credentials: Result<CloudinaryCredentials, SinkError>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials: credentials.map_err(|e| match e {
                SinkError::NotConfigured(missing) => missing,
                other => other.to_string(),
            }),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point at a different API host (staging, local fake)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_ok()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    resource_type: Option<ResourceKind>,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl UploadSink for CloudinarySink {
    async fn upload(&self, params: &UploadParams, file: &FileBlob) -> Result<StoredObject, SinkError> {
        let credentials = self
            .credentials
            .as_ref()
            .map_err(|missing| SinkError::NotConfigured(missing.clone()))?;

        let timestamp = Utc::now().timestamp().to_string();
        let mut signed: Vec<(&str, &str)> = vec![
            ("folder", params.folder.as_str()),
            ("public_id", params.public_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        if let Some(format) = params.format.as_deref() {
            signed.push(("format", format));
        }
        let signature = sign(&signed, &credentials.api_secret);

        let mut form = Form::new()
            .text("api_key", credentials.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in &signed {
            form = form.text(key.to_string(), value.to_string());
        }
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)?;
        form = form.part("file", part);

        let url = format!(
            "{}/{}/{}/upload",
            self.api_base,
            credentials.cloud_name,
            params.resource_type.as_str()
        );
        debug!(public_id = %params.public_id, %url, "Uploading file");

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        Ok(StoredObject {
            url: body.secure_url,
            public_id: body.public_id,
            format: body.format.or_else(|| params.format.clone()),
            resource_type: body.resource_type.unwrap_or(params.resource_type),
            bytes: body.bytes,
        })
    }

    fn describe(&self) -> String {
        match &self.credentials {
            Ok(credentials) => format!("cloudinary ({})", credentials.cloud_name),
            Err(missing) => format!("cloudinary (not configured, missing {missing})"),
        }
    }
}

/// Hex SHA-256 over the sorted `k=v` pairs followed by the secret
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}
