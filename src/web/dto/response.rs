//! Response DTOs for the Sharebox API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::share::EntryMetadata;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// One file or folder.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryResponse {
    pub name: String,
    /// Path relative to the share root.
    pub path: String,
    /// Size in bytes (0 for folders).
    pub size: u64,
    /// Last modification time (RFC 3339).
    pub modified: String,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
    /// `folder`, or the MIME type of the file.
    #[serde(rename = "type")]
    pub media_type: String,
}

impl From<EntryMetadata> for EntryResponse {
    fn from(entry: EntryMetadata) -> Self {
        Self {
            name: entry.name,
            path: entry.relative_path,
            size: entry.size,
            modified: entry.modified.to_rfc3339(),
            is_directory: entry.is_directory,
            media_type: entry.media_type,
        }
    }
}

/// Contents of one directory.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingResponse {
    /// Normalized directory path ("" for the root).
    pub path: String,
    pub entries: Vec<EntryResponse>,
}

/// Result for one uploaded file.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub name: String,
    /// Stored path relative to the share root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Why this file was not stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadedFile {
    pub fn stored(name: String, path: String, size: u64, media_type: String) -> Self {
        Self {
            name,
            path: Some(path),
            size: Some(size),
            media_type: Some(media_type),
            error: None,
        }
    }

    pub fn failed(name: String, error: impl Into<String>) -> Self {
        Self {
            name,
            path: None,
            size: None,
            media_type: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a multipart upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub files: Vec<UploadedFile>,
}
