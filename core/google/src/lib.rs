//! Google API plumbing for OrgShare.
//!
//! This crate provides:
//! - OAuth2 access tokens refreshed from a long-lived refresh token, with a
//!   single in-flight refresh per credential set
//! - Drive resumable uploads with progress reporting, listing, deletion and sharing
//! - YouTube playlist management
//! - One-shot provisioning of an organization's folders and playlists
//!
//! # Error Handling
//! All operations return `orgshare_common::Result`. Nothing is retried
//! implicitly except folder sharing, which retries server errors.

pub mod drive;
pub mod oauth;
pub mod provision;
pub mod retry;
pub mod youtube;

mod http;

pub use drive::{DriveClient, DriveEndpoints, DriveFile, UploadMetadata, UploadSource};
pub use oauth::{ConsentFlow, OAuthCredentials, StaticToken, TokenCache, TokenSource};
pub use provision::{FolderPair, PlaylistPair, Provisioned, Provisioner};
pub use retry::RetryPolicy;
pub use youtube::{PlaylistVideo, PrivacyStatus, YouTubeClient};
