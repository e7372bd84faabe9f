//! Accept filter and size ceiling for uploaded files

use std::path::Path;

use axum::extract::multipart::MultipartError;
use thiserror::Error;

/// Per-file size ceiling
pub const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;

/// Folder uploads land in unless configured otherwise
pub const DEFAULT_UPLOAD_FOLDER: &str = "franchise-applications";

const ALLOWED_EXTENSIONS: [&str; 6] = ["jpeg", "jpg", "png", "pdf", "doc", "docx"];

const ALLOWED_MEDIA_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Failures while receiving a file part
#[derive(Debug, Error)]
pub enum UploadError {
    /// Extension or media type outside the accepted set
    #[error("Only .jpeg, .jpg, .png, .pdf, .doc, and .docx files allowed!")]
    RejectedType { file_name: String, media_type: String },

    /// File exceeded the size ceiling while streaming
    #[error("One or more files exceed the 5MB size limit")]
    TooLarge { field: String, limit: usize },

    /// Body could not be read as multipart
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

/// Where and how uploads are accepted
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Object-storage folder for every accepted file
    pub folder: String,
    /// Per-file size ceiling in bytes
    pub max_file_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            folder: DEFAULT_UPLOAD_FOLDER.to_string(),
            max_file_bytes: MAX_FILE_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn with_folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// Both the extension and the declared media type must be accepted
    pub fn check_type(&self, file_name: &str, media_type: &str) -> Result<(), UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let media_type = media_type.to_ascii_lowercase();

        if ALLOWED_EXTENSIONS.contains(&extension.as_str())
            && ALLOWED_MEDIA_TYPES.contains(&media_type.as_str())
        {
            Ok(())
        } else {
            Err(UploadError::RejectedType {
                file_name: file_name.to_string(),
                media_type,
            })
        }
    }

    /// Fail once `received` bytes exceed the ceiling
    pub fn check_size(&self, field: &str, received: usize) -> Result<(), UploadError> {
        if received > self.max_file_bytes {
            Err(UploadError::TooLarge {
                field: field.to_string(),
                limit: self.max_file_bytes,
            })
        } else {
            Ok(())
        }
    }
}
