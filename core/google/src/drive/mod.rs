//! Google Drive: resumable uploads and folder management.

mod client;
mod model;
mod progress;

pub use client::{DriveClient, DriveEndpoints, DRIVE_API_BASE, DRIVE_UPLOAD_BASE, UPLOAD_CHUNK_SIZE};
pub use model::{DriveFile, UploadMetadata, UploadSource, FILE_FIELDS, FOLDER_MIME_TYPE};
pub use progress::{percent_of, ProgressFn, ProgressTracker};
