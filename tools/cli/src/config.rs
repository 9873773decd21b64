//! CLI settings: an optional JSON file overridden by environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use orgshare_common::Secret;
use orgshare_google::oauth::OAuthCredentials;

/// Redirect URL registered for the consent flow.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/callback";

/// OAuth client and refresh token for one Google account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub client_id: String,
    pub client_secret: Secret,
    pub refresh_token: Secret,
}

impl CredentialSettings {
    fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
    }

    pub fn to_credentials(&self) -> OAuthCredentials {
        OAuthCredentials::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.refresh_token.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account owning the Drive folders.
    pub drive: CredentialSettings,
    /// Account owning the playlists; the Drive account when absent.
    pub youtube: Option<CredentialSettings>,
    /// Account that receives writer access to provisioned folders.
    pub share_with: Option<String>,
    pub redirect_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drive: CredentialSettings::default(),
            youtube: None,
            share_with: None,
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("orgshare").join("config.json"))
    }

    /// Load settings from `path` (or the default location) and the environment.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading settings from {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Override fields from environment-style variables; blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("GOOGLE_CLIENT_ID") {
            self.drive.client_id = value;
        }
        if let Some(value) = get("GOOGLE_CLIENT_SECRET") {
            self.drive.client_secret = value.into();
        }
        if let Some(value) = get("GOOGLE_REFRESH_TOKEN") {
            self.drive.refresh_token = value.into();
        }

        let youtube_id = get("YOUTUBE_CLIENT_ID");
        let youtube_secret = get("YOUTUBE_CLIENT_SECRET");
        let youtube_refresh = get("YOUTUBE_REFRESH_TOKEN");
        if youtube_id.is_some() || youtube_secret.is_some() || youtube_refresh.is_some() {
            let youtube = self.youtube.get_or_insert_with(CredentialSettings::default);
            if let Some(value) = youtube_id {
                youtube.client_id = value;
            }
            if let Some(value) = youtube_secret {
                youtube.client_secret = value.into();
            }
            if let Some(value) = youtube_refresh {
                youtube.refresh_token = value.into();
            }
        }

        if let Some(value) = get("ORGSHARE_SHARE_WITH") {
            self.share_with = Some(value);
        }
        if let Some(value) = get("ORGSHARE_REDIRECT_URL") {
            self.redirect_url = value;
        }
    }

    pub fn drive_credentials(&self) -> OAuthCredentials {
        self.drive.to_credentials()
    }

    pub fn youtube_credentials(&self) -> OAuthCredentials {
        match &self.youtube {
            Some(youtube) if youtube.is_configured() => youtube.to_credentials(),
            _ => self.drive.to_credentials(),
        }
    }
}
