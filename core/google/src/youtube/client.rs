//! YouTube Data API client.

use reqwest::{header, Client, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, info, warn};

use orgshare_common::{Error, Result, Service};

use super::model::{CreatedResource, PlaylistItemsResponse, PlaylistVideo, PrivacyStatus};
use crate::http::{build_client, check, decode, transport_error};
use crate::oauth::TokenSource;

/// YouTube Data API base URL.
pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Default and maximum page size of `playlistItems`.
const DEFAULT_MAX_RESULTS: u32 = 50;

/// YouTube client; asks its token source for a token on every call.
pub struct YouTubeClient {
    http: Client,
    tokens: Arc<dyn TokenSource>,
    api_base: String,
}

impl YouTubeClient {
    pub fn new(tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            tokens,
            api_base: YOUTUBE_API_BASE.to_string(),
        })
    }

    /// Use another API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.tokens.token().await?))
    }

    /// A rejected token is dropped so the next call refreshes it.
    async fn forget_rejected_token(&self, response: &Response) {
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("YouTube rejected the access token, invalidating it");
            self.tokens.invalidate().await;
        }
    }

    /// Create a playlist and return its id.
    ///
    /// # Errors
    /// - `Api` if YouTube rejects the request or answers without an id
    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<String> {
        let url = format!("{}/playlists", self.api_base);
        let body = serde_json::json!({
            "snippet": {
                "title": title,
                "description": description
            },
            "status": {
                "privacyStatus": privacy.as_str()
            }
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("part", "snippet,status")])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(Service::YouTube, "create_playlist", Some(title), e))?;

        self.forget_rejected_token(&response).await;
        let response = check(response, Service::YouTube, "create_playlist", Some(title)).await?;
        let created: CreatedResource =
            decode(response, Service::YouTube, "create_playlist", Some(title)).await?;

        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::Api {
                service: Service::YouTube,
                operation: "create_playlist",
                status: None,
                target: Some(title.to_string()),
                message: "Response did not include a playlist id".to_string(),
            })?;

        info!(playlist_id = %id, privacy = privacy.as_str(), "Created playlist {}", title);
        Ok(id)
    }

    /// Append a video to a playlist.
    pub async fn add_video_to_playlist(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        let url = format!("{}/playlistItems", self.api_base);
        let body = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video_id
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[("part", "snippet")])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                transport_error(Service::YouTube, "add_video_to_playlist", Some(playlist_id), e)
            })?;

        self.forget_rejected_token(&response).await;
        check(
            response,
            Service::YouTube,
            "add_video_to_playlist",
            Some(playlist_id),
        )
        .await?;

        info!(playlist_id, video_id, "Added video to playlist");
        Ok(())
    }

    /// First page of a playlist's videos, `max_results` defaulting to 50.
    pub async fn playlist_videos(
        &self,
        playlist_id: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<PlaylistVideo>> {
        let url = format!("{}/playlistItems", self.api_base);
        let max_results = max_results
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(1, DEFAULT_MAX_RESULTS)
            .to_string();

        let response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, self.bearer().await?)
            .query(&[
                ("part", "snippet,contentDetails,status"),
                ("playlistId", playlist_id),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(Service::YouTube, "playlist_videos", Some(playlist_id), e))?;

        self.forget_rejected_token(&response).await;
        let response = check(response, Service::YouTube, "playlist_videos", Some(playlist_id)).await?;
        let page: PlaylistItemsResponse =
            decode(response, Service::YouTube, "playlist_videos", Some(playlist_id)).await?;

        let videos: Vec<PlaylistVideo> = page
            .items
            .into_iter()
            .filter_map(|item| item.into_video())
            .collect();

        debug!(playlist_id, count = videos.len(), "Fetched playlist videos");
        Ok(videos)
    }
}
