//! Drive file descriptors and upload inputs.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use orgshare_common::{Error, Result};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Fields requested on every call that returns a file.
pub const FILE_FIELDS: &str =
    "id,name,mimeType,webViewLink,thumbnailLink,createdTime,modifiedTime,description,size";

/// Google Drive file metadata from API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    pub id: String,
    /// File name.
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Link to open the file in the Drive UI.
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// Short-lived thumbnail (videos and images).
    #[serde(default)]
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: Option<String>,
    /// File size in bytes (only for files, not folders).
    #[serde(default)]
    pub size: Option<String>,
}

impl DriveFile {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Response from listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A binary payload with known length and content type.
#[derive(Debug, Clone)]
pub struct UploadSource {
    /// The payload's own name, used when no title is given.
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadSource {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a local file.
    ///
    /// # Errors
    /// - `InvalidInput` if the path has no file name
    /// - `Io` if the file cannot be read
    pub async fn from_path(path: impl AsRef<Path>, content_type: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Path has no file name: {}", path.display()))
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;

        Ok(Self::new(name, content_type, data))
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Optional metadata attached to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UploadMetadata {
    /// Name the uploaded file gets: the title, or the source's own name.
    pub fn file_name<'a>(&'a self, source: &'a UploadSource) -> &'a str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => &source.name,
        }
    }
}
