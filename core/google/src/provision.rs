//! Provisioning Drive folders and YouTube playlists for a new organization.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use orgshare_common::{Error, Organization, Result};

use crate::drive::{DriveClient, DriveEndpoints};
use crate::oauth::TokenSource;
use crate::retry::RetryPolicy;
use crate::youtube::{PrivacyStatus, YouTubeClient};

/// The two Drive folders of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderPair {
    pub raw_folder_id: String,
    pub processed_folder_id: String,
}

/// The two playlists of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistPair {
    pub unlisted_id: String,
    pub public_id: String,
}

/// Everything created for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub folders: FolderPair,
    pub playlists: PlaylistPair,
}

/// Creates an organization's folders and playlists.
///
/// Steps run in order and stop at the first failure. Resources created by
/// earlier steps are left in place.
pub struct Provisioner {
    drive_tokens: Arc<dyn TokenSource>,
    drive_endpoints: DriveEndpoints,
    share_retry: RetryPolicy,
    youtube: YouTubeClient,
}

impl Provisioner {
    pub fn new(drive_tokens: Arc<dyn TokenSource>, youtube: YouTubeClient) -> Self {
        Self {
            drive_tokens,
            drive_endpoints: DriveEndpoints::default(),
            share_retry: RetryPolicy::default(),
            youtube,
        }
    }

    pub fn with_drive_endpoints(mut self, endpoints: DriveEndpoints) -> Self {
        self.drive_endpoints = endpoints;
        self
    }

    pub fn with_share_retry(mut self, policy: RetryPolicy) -> Self {
        self.share_retry = policy;
        self
    }

    async fn drive(&self) -> Result<DriveClient> {
        let token = self.drive_tokens.token().await?;
        Ok(DriveClient::new(token)?
            .with_endpoints(self.drive_endpoints.clone())
            .with_share_retry(self.share_retry.clone()))
    }

    /// Create the raw and processed folders and give `share_with` writer access.
    pub async fn provision_folders(
        &self,
        org: &Organization,
        share_with: &str,
    ) -> Result<FolderPair> {
        info!(org = org.name(), "Creating organization folders");
        let drive = self.drive().await?;

        let raw = drive.create_folder(&org.raw_folder_name(), None).await?;
        let processed = drive
            .create_folder(&org.processed_folder_name(), None)
            .await?;

        drive.share_folder_with_account(&raw.id, share_with).await?;
        drive
            .share_folder_with_account(&processed.id, share_with)
            .await?;

        Ok(FolderPair {
            raw_folder_id: raw.id,
            processed_folder_id: processed.id,
        })
    }

    /// Create the unlisted raw playlist and the public playlist.
    pub async fn provision_playlists(&self, org: &Organization) -> Result<PlaylistPair> {
        info!(org = org.name(), "Creating organization playlists");

        let unlisted_id = self
            .youtube
            .create_playlist(
                &org.raw_playlist_title(),
                &format!("Raw content and uploaded footage from {}", org.name()),
                PrivacyStatus::Unlisted,
            )
            .await?;
        let public_id = self
            .youtube
            .create_playlist(
                &org.public_playlist_title(),
                &format!("Finished social media content for {}", org.name()),
                PrivacyStatus::Public,
            )
            .await?;

        Ok(PlaylistPair {
            unlisted_id,
            public_id,
        })
    }

    /// Folders first, then playlists.
    pub async fn provision(&self, org: &Organization, share_with: &str) -> Result<Provisioned> {
        let result = async {
            let folders = self.provision_folders(org, share_with).await?;
            let playlists = self.provision_playlists(org).await?;
            Ok::<_, Error>(Provisioned { folders, playlists })
        }
        .await;

        match &result {
            Ok(provisioned) => info!(
                org = org.name(),
                raw_folder_id = %provisioned.folders.raw_folder_id,
                public_playlist_id = %provisioned.playlists.public_id,
                "Organization provisioned"
            ),
            Err(e) => error!(org = org.name(), "Provisioning failed: {}", e),
        }
        result
    }
}
