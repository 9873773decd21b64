//! Google Drive API client.

use bytes::Bytes;
use futures::stream;
use reqwest::{header, Body, Client, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use orgshare_common::{Error, Result, Secret, Service};

use super::model::{
    DriveFile, FileListResponse, UploadMetadata, UploadSource, FILE_FIELDS, FOLDER_MIME_TYPE,
};
use super::progress::{ProgressFn, ProgressTracker};
use crate::http::{build_client, check, decode, error_message, transport_error};
use crate::retry::RetryPolicy;

/// Google Drive API base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Google Drive upload API base URL.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Size of the pieces the upload body is streamed in (256 KiB).
pub const UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Where the Drive API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveEndpoints {
    pub api_base: String,
    pub upload_base: String,
}

impl DriveEndpoints {
    /// Endpoints under another host, laid out like Google's.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_base: format!("{}/drive/v3", base),
            upload_base: format!("{}/upload/drive/v3", base),
        }
    }
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self {
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: DRIVE_UPLOAD_BASE.to_string(),
        }
    }
}

/// Google Drive API client bound to one bearer token.
///
/// The client does not know where its token came from; build a new one
/// when the token is refreshed.
pub struct DriveClient {
    http: Client,
    token: Secret,
    endpoints: DriveEndpoints,
    share_retry: RetryPolicy,
}

impl DriveClient {
    /// Create a new Drive client.
    ///
    /// # Errors
    /// - `NoToken` if `token` is empty
    pub fn new(token: impl Into<Secret>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::NoToken);
        }

        Ok(Self {
            http: build_client()?,
            token,
            endpoints: DriveEndpoints::default(),
            share_retry: RetryPolicy::default(),
        })
    }

    /// Use other API endpoints.
    pub fn with_endpoints(mut self, endpoints: DriveEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Retry policy for sharing folders (5xx failures only).
    pub fn with_share_retry(mut self, policy: RetryPolicy) -> Self {
        self.share_retry = policy;
        self
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose())
    }

    /// Upload a file into a folder with the resumable protocol.
    ///
    /// Phase one opens an upload session, phase two PUTs the whole payload to
    /// the session URL. `on_progress` receives percentages as the body is
    /// streamed and 100 once Drive confirms the upload.
    ///
    /// # Errors
    /// - `Upload` if the session cannot be opened (including a missing
    ///   `Location` header) or the transfer is rejected; nothing is resumed,
    ///   callers retry the whole upload
    pub async fn upload(
        &self,
        source: &UploadSource,
        folder_id: &str,
        metadata: &UploadMetadata,
        on_progress: Option<ProgressFn>,
    ) -> Result<DriveFile> {
        let name = metadata.file_name(source);
        info!(
            filename = name,
            folder_id,
            size = source.size(),
            "Starting resumable upload"
        );

        let session_url = self
            .start_upload_session(source, name, folder_id, metadata)
            .await?;
        debug!(folder_id, "Upload session established");

        let tracker = on_progress.map(|callback| Arc::new(ProgressTracker::new(source.size(), callback)));
        let file = self
            .transfer(&session_url, source, name, folder_id, tracker.clone())
            .await?;

        if let Some(tracker) = tracker {
            tracker.finish();
        }
        info!(file_id = %file.id, folder_id, "Upload complete");

        Ok(file)
    }

    async fn start_upload_session(
        &self,
        source: &UploadSource,
        name: &str,
        folder_id: &str,
        metadata: &UploadMetadata,
    ) -> Result<String> {
        let url = format!("{}/files", self.endpoints.upload_base);

        let mut body = serde_json::json!({
            "name": name,
            "parents": [folder_id]
        });
        if let Some(description) = &metadata.description {
            body["description"] = serde_json::json!(description);
        }

        let upload_error = |status: Option<u16>, message: String| Error::Upload {
            status,
            filename: name.to_string(),
            folder_id: folder_id.to_string(),
            message,
        };

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .header("X-Upload-Content-Type", &source.content_type)
            .header("X-Upload-Content-Length", source.size().to_string())
            .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
            .json(&body)
            .send()
            .await
            .map_err(|e| upload_error(None, format!("Failed to start resumable upload: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(upload_error(
                Some(status.as_u16()),
                format!("Failed to start resumable upload: {}", message),
            ));
        }

        // Extract upload URI from Location header
        let session_url = response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| upload_error(None, "Failed to get upload URL".to_string()))?
            .to_str()
            .map_err(|e| upload_error(None, format!("Invalid upload URL: {}", e)))?
            .to_string();

        Ok(session_url)
    }

    async fn transfer(
        &self,
        session_url: &str,
        source: &UploadSource,
        name: &str,
        folder_id: &str,
        tracker: Option<Arc<ProgressTracker>>,
    ) -> Result<DriveFile> {
        let upload_error = |status: Option<u16>, message: String| Error::Upload {
            status,
            filename: name.to_string(),
            folder_id: folder_id.to_string(),
            message,
        };

        let body = match tracker {
            Some(tracker) => {
                let chunks = split_chunks(&source.data, UPLOAD_CHUNK_SIZE);
                let chunks = chunks.into_iter().map(move |chunk| {
                    tracker.advance(chunk.len() as u64);
                    Ok::<Bytes, std::io::Error>(chunk)
                });
                Body::wrap_stream(stream::iter(chunks))
            }
            None => Body::from(source.data.clone()),
        };

        let response = self
            .http
            .put(session_url)
            .header(header::CONTENT_TYPE, &source.content_type)
            .header(header::CONTENT_LENGTH, source.size().to_string())
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(None, format!("Failed to upload file: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let message = error_message(response).await;
            return Err(upload_error(
                Some(status.as_u16()),
                format!("Failed to upload file: {}", message),
            ));
        }

        response.json().await.map_err(|e| {
            upload_error(
                Some(status.as_u16()),
                format!("Failed to parse upload response: {}", e),
            )
        })
    }

    /// List the immediate children of a folder, following every result page.
    pub async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", self.endpoints.api_base);
        let query = format!("'{}' in parents", folder_id);
        let fields = format!("files({}),nextPageToken", FILE_FIELDS);

        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .header(header::AUTHORIZATION, self.bearer())
                .query(&[
                    ("q", query.as_str()),
                    ("fields", fields.as_str()),
                    ("pageSize", "1000"),
                ]);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| transport_error(Service::Drive, "list_files", Some(folder_id), e))?;
            let response = check(response, Service::Drive, "list_files", Some(folder_id)).await?;
            let page: FileListResponse =
                decode(response, Service::Drive, "list_files", Some(folder_id)).await?;
            all_files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(folder_id, count = all_files.len(), "Listed folder");
        Ok(all_files)
    }

    /// Get file metadata by ID.
    pub async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!("{}/files/{}", self.endpoints.api_base, file_id);

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(|e| transport_error(Service::Drive, "get_file", Some(file_id), e))?;

        let response = check(response, Service::Drive, "get_file", Some(file_id)).await?;
        decode(response, Service::Drive, "get_file", Some(file_id)).await
    }

    /// Delete a file.
    ///
    /// Deleting an id that is already gone surfaces Drive's 404.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        let url = format!("{}/files/{}", self.endpoints.api_base, file_id);

        let response = self
            .http
            .delete(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| transport_error(Service::Drive, "delete_file", Some(file_id), e))?;

        check(response, Service::Drive, "delete_file", Some(file_id)).await?;
        debug!(file_id, "Deleted file");
        Ok(())
    }

    /// Delete a folder's children one by one, then the folder.
    ///
    /// Not transactional: the first failure is returned as is, leaving the
    /// remaining children and the folder in place.
    pub async fn delete_folder(&self, folder_id: &str) -> Result<()> {
        let children = self.list_files(folder_id).await?;
        info!(folder_id, children = children.len(), "Deleting folder");

        for child in &children {
            if let Err(e) = self.delete_file(&child.id).await {
                warn!(folder_id, file_id = %child.id, "Folder deletion stopped: {}", e);
                return Err(e);
            }
        }

        self.delete_file(folder_id).await
    }

    /// Grant `email` writer access to a folder.
    ///
    /// Only 5xx answers are retried, per the client's share retry policy.
    pub async fn share_folder_with_account(&self, folder_id: &str, email: &str) -> Result<()> {
        let permission = serde_json::json!({
            "type": "user",
            "role": "writer",
            "emailAddress": email
        });

        self.share_retry
            .execute_with_condition(
                || self.create_permission(folder_id, &permission, "share_folder"),
                Error::is_server_error,
            )
            .await?;

        info!(folder_id, "Folder shared with {}", email);
        Ok(())
    }

    /// Make a file readable by anyone with the link.
    pub async fn set_file_public(&self, file_id: &str) -> Result<()> {
        let permission = serde_json::json!({
            "type": "anyone",
            "role": "reader"
        });

        self.create_permission(file_id, &permission, "set_file_public")
            .await?;
        info!(file_id, "File made public");
        Ok(())
    }

    async fn create_permission(
        &self,
        file_id: &str,
        permission: &serde_json::Value,
        operation: &'static str,
    ) -> Result<()> {
        let url = format!("{}/files/{}/permissions", self.endpoints.api_base, file_id);

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .json(permission)
            .send()
            .await
            .map_err(|e| transport_error(Service::Drive, operation, Some(file_id), e))?;

        check(response, Service::Drive, operation, Some(file_id)).await?;
        Ok(())
    }

    /// Create a folder.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let url = format!("{}/files", self.endpoints.api_base);

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE
        });

        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer())
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| transport_error(Service::Drive, "create_folder", Some(name), e))?;

        let response = check(response, Service::Drive, "create_folder", Some(name)).await?;
        let folder: DriveFile = decode(response, Service::Drive, "create_folder", Some(name)).await?;
        info!(folder_id = %folder.id, "Created folder {}", name);
        Ok(folder)
    }
}

/// Split a payload into zero-copy chunks of at most `size` bytes.
fn split_chunks(data: &Bytes, size: usize) -> Vec<Bytes> {
    (0..data.len())
        .step_by(size.max(1))
        .map(|start| data.slice(start..(start + size).min(data.len())))
        .collect()
}
