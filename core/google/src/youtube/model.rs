//! YouTube Data API wire types.

use serde::{Deserialize, Serialize};

/// Embed URL prefix for a video id.
pub const EMBED_URL_BASE: &str = "https://www.youtube.com/embed/";

/// Who can see a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Public => "public",
        }
    }
}

/// A video in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideo {
    /// Video id (not the playlist item id).
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
    pub thumbnail_url: Option<String>,
    pub embed_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedResource {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemsResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    pub snippet: ItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ItemSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    pub resource_id: ResourceId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub standard: Option<Thumbnail>,
    pub maxres: Option<Thumbnail>,
}

impl Thumbnails {
    /// Largest available thumbnail.
    fn best(&self) -> Option<&Thumbnail> {
        self.maxres
            .as_ref()
            .or(self.standard.as_ref())
            .or(self.high.as_ref())
            .or(self.medium.as_ref())
            .or(self.default.as_ref())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourceId {
    #[serde(default)]
    pub video_id: Option<String>,
}

impl PlaylistItem {
    /// Flatten into a `PlaylistVideo`; items without a video id are skipped.
    pub(crate) fn into_video(self) -> Option<PlaylistVideo> {
        let snippet = self.snippet;
        let id = snippet.resource_id.video_id.filter(|id| !id.is_empty())?;
        let thumbnail_url = snippet.thumbnails.best().map(|t| t.url.clone());

        Some(PlaylistVideo {
            embed_url: format!("{}{}", EMBED_URL_BASE, id),
            id,
            title: snippet.title,
            description: snippet.description,
            published_at: snippet.published_at,
            thumbnail_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_status_wire_names() {
        assert_eq!(PrivacyStatus::Unlisted.as_str(), "unlisted");
        assert_eq!(
            serde_json::to_value(PrivacyStatus::Public).unwrap(),
            serde_json::json!("public")
        );
    }

    #[test]
    fn test_item_into_video() {
        let item: PlaylistItem = serde_json::from_value(serde_json::json!({
            "snippet": {
                "title": "Gala",
                "description": "Opening",
                "publishedAt": "2024-05-01T12:00:00Z",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/vi/abc/default.jpg" },
                    "high": { "url": "https://i.ytimg.com/vi/abc/hqdefault.jpg" }
                },
                "resourceId": { "kind": "youtube#video", "videoId": "abc" }
            }
        }))
        .unwrap();

        let video = item.into_video().unwrap();
        assert_eq!(video.id, "abc");
        assert_eq!(video.embed_url, "https://www.youtube.com/embed/abc");
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc/hqdefault.jpg")
        );
    }

    #[test]
    fn test_item_without_video_id_skipped() {
        let item: PlaylistItem = serde_json::from_value(serde_json::json!({
            "snippet": { "title": "Deleted video", "resourceId": { "kind": "youtube#video" } }
        }))
        .unwrap();
        assert!(item.into_video().is_none());
    }
}
