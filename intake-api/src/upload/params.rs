//! Per-file object-storage parameters

use std::path::Path;

use intake_common::model::ResourceKind;
use intake_common::FileBlob;
use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("Invalid regex"));

/// How one file is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadParams {
    pub folder: String,
    pub public_id: String,
    pub resource_type: ResourceKind,
    pub format: Option<String>,
}

impl UploadParams {
    /// Parameters for a file received under `field_name`
    ///
    /// `uploaded_at_ms` keeps keys unique across submissions.
    pub fn for_file(folder: &str, field_name: &str, file: &FileBlob, uploaded_at_ms: i64) -> Self {
        Self {
            folder: folder.to_string(),
            public_id: storage_key(field_name, uploaded_at_ms),
            resource_type: ResourceKind::for_media_type(&file.media_type),
            format: file_format(&file.file_name, &file.media_type),
        }
    }
}

/// Field name with non-word characters replaced, suffixed by the upload time
pub fn storage_key(field_name: &str, uploaded_at_ms: i64) -> String {
    let safe = if field_name.is_empty() {
        "file".to_string()
    } else {
        NON_WORD.replace_all(field_name, "_").into_owned()
    };
    format!("{safe}-{uploaded_at_ms}")
}

/// Extension of the original file name, else the media subtype
pub fn file_format(file_name: &str, media_type: &str) -> Option<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase);

    extension.or_else(|| {
        media_type
            .split_once('/')
            .map(|(_, subtype)| subtype.split('+').next().unwrap_or_default().to_string())
            .filter(|subtype| !subtype.is_empty())
    })
}
